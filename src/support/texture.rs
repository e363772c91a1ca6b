use image::{Rgba, RgbaImage};
use wgpu::util::DeviceExt;

pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &RgbaImage,
        label: &str,
    ) -> Self {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            image.as_raw(),
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// A depth attachment sized to the surface.
pub struct DepthTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthTexture {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&depth_texture_descriptor(width, height, format));
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Depth Texture View"),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        });
        Self { texture, view }
    }
}

pub fn depth_texture_descriptor(
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    }
}

/// Generates a two-color checkerboard with square cells of `cell` pixels.
pub fn checkerboard(size: u32, cell: u32, light: [u8; 4], dark: [u8; 4]) -> RgbaImage {
    let cell = cell.max(1);
    RgbaImage::from_fn(size, size, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgba(light)
        } else {
            Rgba(dark)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHT: [u8; 4] = [230, 230, 230, 255];
    const DARK: [u8; 4] = [40, 40, 40, 255];

    #[test]
    fn test_checkerboard_cells() {
        let image = checkerboard(64, 8, LIGHT, DARK);
        assert_eq!(image.dimensions(), (64, 64));
        assert_eq!(image.get_pixel(0, 0).0, LIGHT);
        assert_eq!(image.get_pixel(7, 7).0, LIGHT);
        assert_eq!(image.get_pixel(8, 0).0, DARK);
        assert_eq!(image.get_pixel(8, 8).0, LIGHT);
        assert_eq!(image.as_raw().len(), 64 * 64 * 4);
    }

    #[test]
    fn test_depth_texture_is_attachment_only() {
        let descriptor = depth_texture_descriptor(1024, 768, Texture::DEPTH_FORMAT);
        assert_eq!(descriptor.size.width, 1024);
        assert_eq!(descriptor.size.height, 768);
        assert_eq!(descriptor.format, wgpu::TextureFormat::Depth24Plus);
        assert_eq!(descriptor.usage, wgpu::TextureUsages::RENDER_ATTACHMENT);
    }

    #[test]
    fn test_checkerboard_zero_cell() {
        let image = checkerboard(2, 0, LIGHT, DARK);
        assert_eq!(image.get_pixel(0, 0).0, LIGHT);
        assert_eq!(image.get_pixel(1, 0).0, DARK);
    }
}
