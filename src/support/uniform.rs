use crate::padded_size;
use std::{marker::PhantomData, mem, num::NonZeroU64};
use wgpu::{BindGroup, BindGroupLayout, Buffer, Device, Queue, ShaderStages};

/// Uniform buffers are sized in multiples of this many bytes.
pub const UNIFORM_ALIGNMENT: u64 = 16;

pub struct UniformBinding<T> {
    pub buffer: Buffer,
    pub bind_group: BindGroup,
    pub bind_group_layout: BindGroupLayout,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> UniformBinding<T> {
    pub fn new(device: &Device, visibility: ShaderStages, initial: &T) -> Self {
        let size = uniform_size::<T>();

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Buffer"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: true,
        });
        {
            let mut mapped = buffer.slice(..).get_mapped_range_mut();
            mapped[..mem::size_of::<T>()].copy_from_slice(bytemuck::bytes_of(initial));
        }
        buffer.unmap();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(size),
                },
                count: None,
            }],
            label: Some("uniform_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        Self {
            buffer,
            bind_group,
            bind_group_layout,
            _marker: PhantomData,
        }
    }

    pub fn update(&self, queue: &Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

pub fn uniform_size<T>() -> u64 {
    padded_size(mem::size_of::<T>().max(1), UNIFORM_ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size() {
        assert_eq!(uniform_size::<f32>(), 16);
        assert_eq!(uniform_size::<[f32; 4]>(), 16);
        assert_eq!(uniform_size::<[f32; 5]>(), 32);
        assert_eq!(uniform_size::<[[f32; 4]; 4]>(), 64);
        assert_eq!(uniform_size::<()>(), 16);
    }
}
