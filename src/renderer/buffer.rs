use gfx_hal::{buffer, prelude::*, Backend, Limits};
use std::mem::{self, ManuallyDrop};
use std::ptr;

pub struct Buffer<'a, B: Backend, T> {
    pub device: &'a B::Device,
    pub buf: ManuallyDrop<B::Buffer>,
    pub content: &'a [T],
    pub len: u64,
}

impl<'a, B: Backend, T> Buffer<'a, B, T> {
    pub fn new(device: &'a B::Device, content: &'a [T], limits: &Limits) -> Self {
        let buffer_len = byte_len(content);
        assert_ne!(buffer_len, 0);
        let memory_size = aligned_size(buffer_len, limits.non_coherent_atom_size as u64);

        Buffer {
            device,
            buf: ManuallyDrop::new({
                unsafe {
                    device
                        .create_buffer(memory_size, buffer::Usage::VERTEX)
                        .expect("Can't create vertex buffer")
                }
            }),
            content,
            len: buffer_len,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.content.len() as u32
    }
}

fn byte_len<T>(content: &[T]) -> u64 {
    content.len() as u64 * mem::size_of::<T>() as u64
}

pub fn aligned_size(len: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return len;
    }
    ((len + alignment - 1) / alignment) * alignment
}

impl<'a, B: Backend, T> Drop for Buffer<'a, B, T> {
    fn drop(&mut self) {
        unsafe {
            self.device
                .destroy_buffer(ManuallyDrop::into_inner(ptr::read(&self.buf)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::vertex::TRIANGLE;

    #[test]
    fn triangle_is_36_bytes() {
        assert_eq!(byte_len(&TRIANGLE), 36);
    }

    #[test]
    fn rounds_up_to_atom() {
        assert_eq!(aligned_size(36, 64), 64);
        assert_eq!(aligned_size(64, 64), 64);
        assert_eq!(aligned_size(65, 64), 128);
        assert_eq!(aligned_size(36, 4), 36);
    }

    #[test]
    fn unit_alignment_keeps_length() {
        assert_eq!(aligned_size(36, 1), 36);
        assert_eq!(aligned_size(36, 0), 36);
    }
}
