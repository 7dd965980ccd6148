use gfx_hal::{
    adapter, buffer as b, command, format as f, image as i, pass, pool,
    prelude::*,
    pso,
    queue::{family::QueueFamilyId, Submission},
    Backend,
};

use std::borrow::Borrow;
use std::iter;
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod buffer;
mod memory;
mod pipeline;
mod swapchain;
mod vbo;
mod vertex;

use crate::sample::{FrameClock, Sample, Shading, VertexSource};
use crate::shader;
use crate::Error;
use buffer::Buffer;
use memory::Memory;
use pipeline::Pipeline;
use swapchain::Swapchain;
pub use vbo::Vbo;
pub use vertex::{Vertex, TRIANGLE};

const FRAMES_IN_FLIGHT: usize = 2;
const FPS_LOG_INTERVAL: usize = 60;
const IDLE_POLL: Duration = Duration::from_millis(16);

/// Fill used when the sample's own program does not link.
const FALLBACK_SHADING: Shading = Shading::Flat([1.0, 1.0, 1.0]);

fn fallback_shading(shading: Shading) -> Shading {
    match shading {
        Shading::Flat(_) => shading,
        Shading::Pattern(_) => FALLBACK_SHADING,
    }
}

fn link_failure_message(err: &Error) -> String {
    format!("ERROR::SHADER::PROGRAM::LINKING_FAILED\n{}", err)
}

enum Vertices<'a, B: Backend> {
    Streamed(Vec<Memory<'a, B, Vertex>>),
    Uploaded(Memory<'a, B, Vertex>),
    Managed(Vbo<'a, B, Vertex>),
}

impl<'a, B: Backend> Vertices<'a, B> {
    fn new(
        source: VertexSource,
        device: &'a B::Device,
        adapter: &adapter::Adapter<B>,
        frames_in_flight: usize,
    ) -> Self {
        let memory_types = adapter.physical_device.memory_properties().memory_types;
        let limits = adapter.physical_device.limits();

        match source {
            VertexSource::ClientArray => Vertices::Streamed(
                (0..frames_in_flight)
                    .map(|_| {
                        let vertex_buffer = Buffer::new(device, &TRIANGLE, &limits);
                        Memory::new(vertex_buffer, &memory_types)
                    })
                    .collect(),
            ),
            VertexSource::BufferObject => {
                let vertex_buffer = Buffer::new(device, &TRIANGLE, &limits);
                Vertices::Uploaded(Memory::new(vertex_buffer, &memory_types))
            }
            VertexSource::LibraryBuffer => {
                Vertices::Managed(Vbo::from_slice(device, adapter, &TRIANGLE))
            }
        }
    }

    fn prepare(&self, frame_idx: usize) {
        if let Vertices::Streamed(memories) = self {
            memories[frame_idx].write();
        }
    }

    unsafe fn draw(&self, cmd_buffer: &mut B::CommandBuffer, frame_idx: usize) {
        match self {
            Vertices::Streamed(memories) => Self::draw_memory(cmd_buffer, &memories[frame_idx]),
            Vertices::Uploaded(memory) => Self::draw_memory(cmd_buffer, memory),
            Vertices::Managed(vbo) => vbo.draw(cmd_buffer),
        }
    }

    unsafe fn draw_memory(cmd_buffer: &mut B::CommandBuffer, memory: &Memory<'a, B, Vertex>) {
        cmd_buffer.bind_vertex_buffers(
            0,
            iter::once((&*memory.buffer.buf, b::SubRange::WHOLE)),
        );
        cmd_buffer.draw(0..memory.buffer.vertex_count(), 0..1);
    }
}

pub struct Renderer<'a, B: Backend> {
    frame: usize,
    device: &'a B::Device,
    frames_in_flight: usize,
    clear_color: [f32; 4],
    shading: Shading,
    clock: FrameClock,
    fps_counter: fps_counter::FPSCounter,
    resized: Arc<AtomicBool>,
    command_buffers: Vec<B::CommandBuffer>,
    framebuffers: Vec<Option<B::Framebuffer>>,
    submission_complete_semaphores: Vec<B::Semaphore>,
    submission_complete_fences: Vec<B::Fence>,
    command_pool: ManuallyDrop<B::CommandPool>,
    vertices: ManuallyDrop<Vertices<'a, B>>,
    swapchain: ManuallyDrop<Swapchain<'a, B>>,
    render_pass: ManuallyDrop<B::RenderPass>,
    pipeline: ManuallyDrop<Pipeline<'a, B>>,
}

impl<'a, B> Renderer<'a, B>
where
    B: Backend,
{
    pub fn new(
        surface: &'a mut B::Surface,
        adapter: &'a adapter::Adapter<B>,
        device: &'a B::Device,
        family: QueueFamilyId,
        sample: &Sample,
        resized: Arc<AtomicBool>,
    ) -> Self {
        let frames_in_flight = FRAMES_IN_FLIGHT;

        let vertices = Vertices::new(sample.vertex_source, device, adapter, frames_in_flight);
        let swapchain = Swapchain::new(device, surface, adapter, sample.size);
        let render_pass = Self::create_render_pass(device, swapchain.format);
        let (pipeline, shading) = Self::create_pipeline(device, &render_pass, sample.shading);

        let mut command_pool = Self::create_command_pool(&device, family);

        let command_buffers = Self::allocate_command_buffer(&mut command_pool, frames_in_flight);
        let submission_complete_semaphores = Self::create_semaphores(&device, frames_in_flight);
        let submission_complete_fences = Self::create_fences(&device, frames_in_flight);

        Renderer {
            device,
            submission_complete_semaphores,
            submission_complete_fences,
            frames_in_flight,
            clear_color: sample.clear_color,
            shading,
            clock: FrameClock::new(),
            fps_counter: fps_counter::FPSCounter::new(),
            resized,
            command_pool: ManuallyDrop::new(command_pool),
            vertices: ManuallyDrop::new(vertices),
            swapchain: ManuallyDrop::new(swapchain),
            render_pass,
            pipeline: ManuallyDrop::new(pipeline),
            command_buffers,
            framebuffers: (0..frames_in_flight).map(|_| None).collect(),
            frame: 0,
        }
    }

    /// Builds the pipeline for `shading`. A programmable pipeline that fails
    /// to compile or link is reported and replaced by a flat white fill.
    fn create_pipeline(
        device: &'a B::Device,
        render_pass: &B::RenderPass,
        shading: Shading,
    ) -> (Pipeline<'a, B>, Shading) {
        if let Shading::Pattern(program) = shading {
            let linked = program
                .compile()
                .and_then(|(vs, fs)| Pipeline::new(device, &vs, &fs, render_pass));
            match linked {
                Ok(pipeline) => {
                    log::debug!("pattern program linked");
                    return (pipeline, shading);
                }
                Err(err) => log::error!("{}", link_failure_message(&err)),
            }
        }

        let shading = fallback_shading(shading);
        let (vs, fs) = shader::flat_spirv();
        let pipeline = Pipeline::new(device, &vs, &fs, render_pass)
            .unwrap_or_else(|err| panic!("Built-in flat pipeline failed: {}", err));
        (pipeline, shading)
    }

    pub fn render(&mut self, queue: &mut B::CommandQueue) {
        let pending = self.resized.swap(false, Ordering::Relaxed) || !self.swapchain.configured;
        if pending && !self.recreate_swapchain() {
            thread::sleep(IDLE_POLL);
            return;
        }

        let frame_idx = self.frame % self.frames_in_flight;

        unsafe {
            self.device
                .wait_for_fence(&self.submission_complete_fences[frame_idx], !0)
                .expect("Can't wait for fence");
        }

        let surface_image = unsafe {
            match self.swapchain.surface.acquire_image(!0) {
                Ok((image, _)) => image,
                Err(err) => {
                    // The fence stays signalled, so the next attempt won't block on it.
                    log::debug!("acquire failed ({:?}), recreating swapchain", err);
                    self.recreate_swapchain();
                    return;
                }
            }
        };

        unsafe {
            self.device
                .reset_fence(&self.submission_complete_fences[frame_idx])
                .expect("Can't reset fence");
            if let Some(framebuffer) = self.framebuffers[frame_idx].take() {
                self.device.destroy_framebuffer(framebuffer);
            }
        }

        let framebuffer = unsafe {
            self.device.create_framebuffer(
                &self.render_pass,
                iter::once(surface_image.borrow()),
                i::Extent {
                    width: self.swapchain.dims.width,
                    height: self.swapchain.dims.height,
                    depth: 1,
                },
            )
        }
        .expect("Could not create frame buffer");

        self.vertices.prepare(frame_idx);
        let constants = self.shading.push_constants(self.clock.time());

        let cmd_buffer = &mut self.command_buffers[frame_idx];
        unsafe {
            cmd_buffer.reset(false);
            cmd_buffer.begin_primary(command::CommandBufferFlags::ONE_TIME_SUBMIT);
            cmd_buffer.set_viewports(0, &[self.swapchain.viewport.clone()]);
            cmd_buffer.set_scissors(0, &[self.swapchain.viewport.rect]);
            cmd_buffer.bind_graphics_pipeline(&self.pipeline.pipeline);
            cmd_buffer.push_graphics_constants(
                &self.pipeline.pipeline_layout,
                pso::ShaderStageFlags::FRAGMENT,
                0,
                &constants,
            );
            cmd_buffer.begin_render_pass(
                &self.render_pass,
                &framebuffer,
                self.swapchain.viewport.rect,
                &[command::ClearValue {
                    color: command::ClearColor {
                        float32: self.clear_color,
                    },
                }],
                command::SubpassContents::Inline,
            );
            self.vertices.draw(cmd_buffer, frame_idx);
            cmd_buffer.end_render_pass();
            cmd_buffer.finish();

            let submission = Submission {
                command_buffers: iter::once(&*cmd_buffer),
                wait_semaphores: None,
                signal_semaphores: iter::once(&self.submission_complete_semaphores[frame_idx]),
            };

            queue.submit(
                submission,
                Some(&self.submission_complete_fences[frame_idx]),
            );

            let result = queue.present_surface(
                &mut self.swapchain.surface,
                surface_image,
                Some(&self.submission_complete_semaphores[frame_idx]),
            );

            self.framebuffers[frame_idx] = Some(framebuffer);
            if result.is_err() {
                log::debug!("present failed, recreating swapchain");
                self.recreate_swapchain();
            }
        }

        self.clock.tick();
        self.frame += 1;

        let fps = self.fps_counter.tick();
        if self.frame % FPS_LOG_INTERVAL == 0 {
            log::debug!("frame {}: {} fps", self.frame, fps);
        }
    }

    fn recreate_swapchain(&mut self) -> bool {
        if let Err(err) = self.device.wait_idle() {
            log::error!("wait before swapchain recreation failed: {:?}", err);
        }
        for framebuffer in self.framebuffers.iter_mut().filter_map(Option::take) {
            unsafe { self.device.destroy_framebuffer(framebuffer) };
        }
        let ready = self.swapchain.recreate();
        if !ready {
            // Retried on the next frame until the window has an area again.
            self.resized.store(true, Ordering::Relaxed);
        }
        ready
    }

    fn create_render_pass(device: &B::Device, format: f::Format) -> ManuallyDrop<B::RenderPass> {
        let attachment = pass::Attachment {
            format: Some(format),
            samples: 1,
            ops: pass::AttachmentOps::new(
                pass::AttachmentLoadOp::Clear,
                pass::AttachmentStoreOp::Store,
            ),
            stencil_ops: pass::AttachmentOps::DONT_CARE,
            layouts: i::Layout::Undefined..i::Layout::Present,
        };

        let subpass = pass::SubpassDesc {
            colors: &[(0, i::Layout::ColorAttachmentOptimal)],
            depth_stencil: None,
            inputs: &[],
            resolves: &[],
            preserves: &[],
        };

        ManuallyDrop::new(
            unsafe { device.create_render_pass(&[attachment], &[subpass], &[]) }
                .expect("Can't create render pass"),
        )
    }

    fn create_command_pool(device: &B::Device, family: QueueFamilyId) -> B::CommandPool {
        unsafe { device.create_command_pool(family, pool::CommandPoolCreateFlags::RESET_INDIVIDUAL) }
            .expect("Can't create command pool")
    }

    fn allocate_command_buffer(
        command_pool: &mut B::CommandPool,
        frames_in_flight: usize,
    ) -> Vec<B::CommandBuffer> {
        (0..frames_in_flight)
            .map(|_| unsafe { command_pool.allocate_one(command::Level::Primary) })
            .collect()
    }

    fn create_semaphores(device: &B::Device, frames_in_flight: usize) -> Vec<B::Semaphore> {
        (0..frames_in_flight)
            .map(|_| {
                device
                    .create_semaphore()
                    .expect("Could not create semaphore")
            })
            .collect()
    }

    fn create_fences(device: &B::Device, frames_in_flight: usize) -> Vec<B::Fence> {
        (0..frames_in_flight)
            .map(|_| device.create_fence(true).expect("Could not create fence"))
            .collect()
    }
}

impl<'a, B: Backend> Drop for Renderer<'a, B> {
    fn drop(&mut self) {
        let device = &self.device;
        if let Err(err) = device.wait_idle() {
            log::error!("device lost before teardown: {:?}", err);
        }
        unsafe {
            for framebuffer in self.framebuffers.drain(..).flatten() {
                device.destroy_framebuffer(framebuffer);
            }
            ManuallyDrop::drop(&mut self.vertices);
            device.destroy_command_pool(ManuallyDrop::into_inner(ptr::read(&self.command_pool)));
            for s in self.submission_complete_semaphores.drain(..) {
                device.destroy_semaphore(s);
            }

            for f in self.submission_complete_fences.drain(..) {
                device.destroy_fence(f);
            }

            device.destroy_render_pass(ManuallyDrop::into_inner(ptr::read(&self.render_pass)));
            ManuallyDrop::drop(&mut self.swapchain);
            ManuallyDrop::drop(&mut self.pipeline);
        }
        log::debug!("renderer resources released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{Program, Stage};

    #[test]
    fn failed_pattern_falls_back_to_white() {
        match fallback_shading(Shading::Pattern(Program::PATTERN)) {
            Shading::Flat(color) => assert_eq!(color, [1.0, 1.0, 1.0]),
            Shading::Pattern(_) => panic!("pattern shading survived a failed link"),
        }
    }

    #[test]
    fn flat_shading_is_kept() {
        match fallback_shading(Shading::Flat([0.29, 0.71, 1.0])) {
            Shading::Flat(color) => assert_eq!(color, [0.29, 0.71, 1.0]),
            Shading::Pattern(_) => panic!("flat shading became a pattern"),
        }
    }

    #[test]
    fn link_failure_is_tagged_program() {
        let err = Error::Compile {
            stage: Stage::Fragment,
            log: "bad".to_owned(),
        };
        assert_eq!(
            link_failure_message(&err),
            "ERROR::SHADER::PROGRAM::LINKING_FAILED\nfragment shader failed to compile:\nbad"
        );
    }
}
