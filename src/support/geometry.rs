use crate::Mesh;
use anyhow::{ensure, Result};
use wgpu::{
    util::{align_to, BufferInitDescriptor, DeviceExt},
    Buffer, BufferAddress, Device, Queue,
};

pub struct Geometry {
    pub vertex_buffer: Buffer,
    pub index_buffer: Buffer,
    pub index_count: u32,
}

impl Geometry {
    pub fn new<T: bytemuck::Pod>(device: &Device, vertices: &[T], indices: &[u16]) -> Self {
        Self {
            vertex_buffer: Self::create_vertex_buffer(device, vertices),
            index_buffer: Self::create_index_buffer(device, indices),
            index_count: indices.len() as _,
        }
    }

    pub fn from_mesh<T: bytemuck::Pod>(device: &Device, mesh: &Mesh<T>) -> Self {
        Self::new(device, &mesh.vertices, &mesh.indices)
    }

    pub fn slices(&self) -> (wgpu::BufferSlice, wgpu::BufferSlice) {
        (self.vertex_buffer.slice(..), self.index_buffer.slice(..))
    }

    /// Uploads edited vertices over the existing vertex buffer.
    pub fn update_vertices<T: bytemuck::Pod>(&self, queue: &Queue, vertices: &[T]) -> Result<()> {
        let contents: &[u8] = bytemuck::cast_slice(vertices);
        ensure!(
            contents.len() as BufferAddress <= self.vertex_buffer.size(),
            "{} bytes of vertices do not fit a {} byte vertex buffer",
            contents.len(),
            self.vertex_buffer.size()
        );
        ensure!(
            contents.len() as BufferAddress % wgpu::COPY_BUFFER_ALIGNMENT == 0,
            "Vertex data must be a multiple of {} bytes",
            wgpu::COPY_BUFFER_ALIGNMENT
        );
        queue.write_buffer(&self.vertex_buffer, 0, contents);
        Ok(())
    }

    fn create_vertex_buffer(device: &Device, vertices: &[impl bytemuck::Pod]) -> Buffer {
        device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        })
    }

    fn create_index_buffer(device: &Device, indices: &[u16]) -> Buffer {
        // An odd number of u16 indices is padded up to the copy alignment
        let mut contents = bytemuck::cast_slice::<_, u8>(indices).to_vec();
        contents.resize(
            padded_size(contents.len(), wgpu::COPY_BUFFER_ALIGNMENT) as usize,
            0,
        );
        device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: &contents,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        })
    }
}

pub fn padded_size(bytes: usize, alignment: BufferAddress) -> BufferAddress {
    align_to(bytes as BufferAddress, alignment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_size() {
        assert_eq!(padded_size(0, 4), 0);
        assert_eq!(padded_size(6, 4), 8);
        assert_eq!(padded_size(8, 4), 8);
        assert_eq!(padded_size(4, 16), 16);
        assert_eq!(padded_size(68, 16), 80);
    }
}
