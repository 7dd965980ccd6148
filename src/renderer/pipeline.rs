use gfx_hal::{pass::Subpass, prelude::*, pso, Backend};
use std::iter;
use std::mem::{self, ManuallyDrop};
use std::ptr;

use super::vertex::Vertex;
use crate::Error;

const ENTRY_NAME: &str = "main";

pub const PUSH_CONSTANT_SIZE: u32 = 16;

pub struct Pipeline<'a, B: Backend> {
    device: &'a B::Device,
    pub pipeline: ManuallyDrop<B::GraphicsPipeline>,
    pub pipeline_layout: ManuallyDrop<B::PipelineLayout>,
}

impl<'a, B: Backend> Pipeline<'a, B> {
    pub fn new(
        device: &'a B::Device,
        vs_spirv: &[u32],
        fs_spirv: &[u32],
        render_pass: &B::RenderPass,
    ) -> Result<Self, Error> {
        let pipeline_layout = unsafe {
            device.create_pipeline_layout(
                iter::empty::<B::DescriptorSetLayout>(),
                &[(pso::ShaderStageFlags::FRAGMENT, 0..PUSH_CONSTANT_SIZE)],
            )
        }
        .map_err(Error::Layout)?;

        let result = Self::create_graphics_pipeline(
            device,
            vs_spirv,
            fs_spirv,
            render_pass,
            &pipeline_layout,
        );
        match result {
            Ok(pipeline) => Ok(Pipeline {
                device,
                pipeline: ManuallyDrop::new(pipeline),
                pipeline_layout: ManuallyDrop::new(pipeline_layout),
            }),
            Err(err) => {
                unsafe { device.destroy_pipeline_layout(pipeline_layout) };
                Err(err)
            }
        }
    }

    fn create_graphics_pipeline(
        device: &B::Device,
        vs_spirv: &[u32],
        fs_spirv: &[u32],
        render_pass: &B::RenderPass,
        pipeline_layout: &B::PipelineLayout,
    ) -> Result<B::GraphicsPipeline, Error> {
        let vs_module = unsafe { device.create_shader_module(vs_spirv) }.map_err(Error::Module)?;
        let fs_module = match unsafe { device.create_shader_module(fs_spirv) } {
            Ok(module) => module,
            Err(err) => {
                unsafe { device.destroy_shader_module(vs_module) };
                return Err(Error::Module(err));
            }
        };

        let result = {
            let (vs_entry, fs_entry) = (
                pso::EntryPoint {
                    entry: ENTRY_NAME,
                    module: &vs_module,
                    specialization: pso::Specialization::default(),
                },
                pso::EntryPoint {
                    entry: ENTRY_NAME,
                    module: &fs_module,
                    specialization: pso::Specialization::default(),
                },
            );

            let shader_entries = pso::GraphicsShaderSet {
                vertex: vs_entry,
                hull: None,
                domain: None,
                geometry: None,
                fragment: Some(fs_entry),
            };

            let subpass = Subpass {
                index: 0,
                main_pass: render_pass,
            };

            let mut pipeline_desc = pso::GraphicsPipelineDesc::new(
                shader_entries,
                pso::Primitive::TriangleList,
                pso::Rasterizer::FILL,
                pipeline_layout,
                subpass,
            );
            pipeline_desc.blender.targets.push(pso::ColorBlendDesc {
                mask: pso::ColorMask::ALL,
                blend: Some(pso::BlendState::ALPHA),
            });

            pipeline_desc.vertex_buffers.push(pso::VertexBufferDesc {
                binding: 0,
                stride: mem::size_of::<Vertex>() as u32,
                rate: pso::VertexInputRate::Vertex,
            });

            pipeline_desc.attributes.push(pso::AttributeDesc {
                location: 0,
                binding: 0,
                element: pso::Element {
                    format: Vertex::POSITION_FORMAT,
                    offset: 0,
                },
            });

            unsafe { device.create_graphics_pipeline(&pipeline_desc, None) }
                .map_err(Error::Link)
        };

        // Modules are only needed until the pipeline is built.
        unsafe {
            device.destroy_shader_module(vs_module);
            device.destroy_shader_module(fs_module);
        }

        result
    }
}

impl<'a, B: Backend> Drop for Pipeline<'a, B> {
    fn drop(&mut self) {
        unsafe {
            self.device
                .destroy_graphics_pipeline(ManuallyDrop::into_inner(ptr::read(&self.pipeline)));
            self.device
                .destroy_pipeline_layout(ManuallyDrop::into_inner(ptr::read(
                    &self.pipeline_layout,
                )));
        }
    }
}
