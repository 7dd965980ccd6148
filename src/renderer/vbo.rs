use gfx_hal::{adapter::Adapter, buffer as b, prelude::*, Backend};
use std::iter;

use super::buffer::Buffer;
use super::memory::Memory;

pub struct Vbo<'a, B: Backend, T> {
    memory: Memory<'a, B, T>,
}

impl<'a, B: Backend, T> Vbo<'a, B, T> {
    pub fn from_slice(device: &'a B::Device, adapter: &Adapter<B>, content: &'a [T]) -> Self {
        let memory_types = adapter.physical_device.memory_properties().memory_types;
        let limits = adapter.physical_device.limits();
        let buffer = Buffer::new(device, content, &limits);
        Vbo {
            memory: Memory::new(buffer, &memory_types),
        }
    }

    pub fn draw(&self, cmd_buffer: &mut B::CommandBuffer) {
        unsafe {
            cmd_buffer.bind_vertex_buffers(
                0,
                iter::once((&*self.memory.buffer.buf, b::SubRange::WHOLE)),
            );
            cmd_buffer.draw(0..self.memory.buffer.vertex_count(), 0..1);
        }
    }
}
