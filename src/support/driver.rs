use crate::{DepthTexture, Mesh, MeshVertex, Texture};
use anyhow::{bail, Context, Result};
use image::RgbaImage;
use std::{borrow::Cow, path::Path};
use wgpu::{
    BindGroup, BindGroupLayout, Device, Queue, RenderPipeline, ShaderModule, TextureFormat,
    TextureView, VertexBufferLayout,
};

pub struct PipelineDescription<'a> {
    pub label: &'a str,
    pub shader: &'a ShaderModule,
    pub vertex_layout: VertexBufferLayout<'a>,
    pub bind_group_layouts: &'a [&'a BindGroupLayout],
    pub color_format: TextureFormat,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DepthExtent {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

impl DepthExtent {
    /// Whether a depth target of this extent can be reused for `wanted`.
    pub fn matches(current: Option<&DepthExtent>, wanted: &DepthExtent) -> bool {
        current == Some(wanted)
    }
}

struct DepthTarget {
    extent: DepthExtent,
    texture: DepthTexture,
}

pub struct TextureBinding {
    pub texture: Texture,
    pub bind_group: BindGroup,
    pub bind_group_layout: BindGroupLayout,
}

/// Owns the device and queue, and creates the resources drawn with them.
pub struct Driver {
    pub device: Device,
    pub queue: Queue,
    depth_format: Option<TextureFormat>,
    depth: Option<DepthTarget>,
}

impl Driver {
    pub fn new(device: Device, queue: Queue, depth_format: Option<TextureFormat>) -> Self {
        Self {
            device,
            queue,
            depth_format,
            depth: None,
        }
    }

    /// Makes sure the depth target matches the surface size, recreating it if not.
    pub fn prepare_depth(&mut self, width: u32, height: u32) {
        let format = match self.depth_format {
            Some(format) => format,
            None => return,
        };

        let wanted = DepthExtent {
            width,
            height,
            format,
        };
        let current = self.depth.as_ref().map(|depth| &depth.extent);
        if DepthExtent::matches(current, &wanted) {
            return;
        }

        log::trace!("Depth texture created: {:?} {}x{}", format, width, height);
        self.depth = Some(DepthTarget {
            extent: wanted,
            texture: DepthTexture::new(&self.device, width, height, format),
        });
    }

    pub fn depth_view(&self) -> Option<&TextureView> {
        self.depth.as_ref().map(|depth| &depth.texture.view)
    }

    pub fn load_shader_module(&self, path: impl AsRef<Path>) -> Result<ShaderModule> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open shader: {}", path.display()))?;
        log::trace!("Shader file opened: {}", path.display());

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: path.file_name().and_then(|name| name.to_str()),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            bail!("Failed to compile shader {}: {}", path.display(), error);
        }

        log::info!("Shader module loaded: {}", path.display());
        Ok(module)
    }

    pub fn load_mesh<V: MeshVertex>(&self, path: impl AsRef<Path>) -> Result<Mesh<V>> {
        let mesh = Mesh::<V>::from_file(path.as_ref())?;
        log::info!(
            "Mesh loaded: {} ({} vertices, {} indices)",
            path.as_ref().display(),
            mesh.vertex_count(),
            mesh.index_count()
        );
        Ok(mesh)
    }

    pub fn create_pipeline(&self, description: &PipelineDescription) -> RenderPipeline {
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(description.label),
                bind_group_layouts: description.bind_group_layouts,
                push_constant_ranges: &[],
            });

        let depth_stencil = self.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(description.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: description.shader,
                    entry_point: "vs_main",
                    buffers: &[description.vertex_layout.clone()],
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                    unclipped_depth: false,
                },
                depth_stencil,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module: description.shader,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: description.color_format,
                        blend: Some(blend_state()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
            });

        log::info!("Pipeline created: {}", description.label);
        pipeline
    }

    pub fn create_texture_binding(&self, image: &RgbaImage, label: &str) -> TextureBinding {
        let texture = Texture::from_image(&self.device, &self.queue, image, label);

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                multisampled: false,
                                view_dimension: wgpu::TextureViewDimension::D2,
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                    label: Some("texture_bind_group_layout"),
                });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some("texture_bind_group"),
        });

        TextureBinding {
            texture,
            bind_group,
            bind_group_layout,
        }
    }
}

/// Straight alpha blending that keeps the destination alpha.
pub fn blend_state() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::Zero,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> DepthExtent {
        DepthExtent {
            width,
            height,
            format: Texture::DEPTH_FORMAT,
        }
    }

    #[test]
    fn test_depth_created_on_first_use() {
        assert!(!DepthExtent::matches(None, &extent(800, 600)));
    }

    #[test]
    fn test_depth_reused_at_same_size() {
        assert!(DepthExtent::matches(Some(&extent(800, 600)), &extent(800, 600)));
    }

    #[test]
    fn test_depth_recreated_on_resize() {
        assert!(!DepthExtent::matches(
            Some(&extent(800, 600)),
            &extent(1024, 600)
        ));
        assert!(!DepthExtent::matches(
            Some(&extent(800, 600)),
            &extent(800, 768)
        ));
    }

    #[test]
    fn test_depth_recreated_on_format_change() {
        let wanted = DepthExtent {
            format: wgpu::TextureFormat::Depth32Float,
            ..extent(800, 600)
        };
        assert!(!DepthExtent::matches(Some(&extent(800, 600)), &wanted));
    }

    #[test]
    fn test_blend_state_keeps_destination_alpha() {
        let blend = blend_state();
        assert_eq!(blend.alpha.src_factor, wgpu::BlendFactor::Zero);
        assert_eq!(blend.alpha.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
    }
}
