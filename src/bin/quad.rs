use anyhow::Result;
use std::mem;
use support::{
    begin_scene_pass, checkerboard, edit_components, resource_path, run, vertex_panel, AppConfig,
    Application, Driver, FrameClock, FrameTargets, Geometry, MeshVertex, PipelineDescription,
    Renderer, TextureBinding,
};
use wgpu::{vertex_attr_array, RenderPass, RenderPipeline, TextureFormat, VertexAttribute};

const TEXTURE_SIZE: u32 = 256;
const TEXTURE_CELL: u32 = 32;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    tex_coords: [f32; 2],
}

impl Vertex {
    pub fn vertex_attributes() -> Vec<VertexAttribute> {
        vertex_attr_array![0 => Float32x2, 1 => Float32x2].to_vec()
    }

    pub fn description<'a>(attributes: &'a [VertexAttribute]) -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

impl MeshVertex for Vertex {
    const COMPONENTS: usize = 4;

    fn from_components(components: &[f32]) -> Self {
        Self {
            position: [components[0], components[1]],
            tex_coords: [components[2], components[3]],
        }
    }
}

struct Scene {
    geometry: Geometry,
    pipeline: RenderPipeline,
    texture: TextureBinding,
    vertices: Vec<Vertex>,
    dirty: bool,
}

impl Scene {
    pub fn new(driver: &Driver, surface_format: TextureFormat) -> Result<Self> {
        let mesh = driver.load_mesh::<Vertex>(resource_path("geometry/quad.txt"))?;
        let geometry = Geometry::from_mesh(&driver.device, &mesh);

        let image = checkerboard(
            TEXTURE_SIZE,
            TEXTURE_CELL,
            [235, 225, 200, 255],
            [60, 90, 140, 255],
        );
        let texture = driver.create_texture_binding(&image, "checkerboard");

        let shader = driver.load_shader_module(resource_path("shaders/quad.wgsl"))?;
        let attributes = Vertex::vertex_attributes();
        let pipeline = driver.create_pipeline(&PipelineDescription {
            label: "Quad Pipeline",
            shader: &shader,
            vertex_layout: Vertex::description(&attributes),
            bind_group_layouts: &[&texture.bind_group_layout],
            color_format: surface_format,
        });

        Ok(Self {
            geometry,
            pipeline,
            texture,
            vertices: mesh.vertices,
            dirty: false,
        })
    }

    pub fn render<'rpass>(&'rpass self, renderpass: &mut RenderPass<'rpass>) {
        renderpass.set_pipeline(&self.pipeline);
        renderpass.set_bind_group(0, &self.texture.bind_group, &[]);

        let (vertex_slice, index_slice) = self.geometry.slices();
        renderpass.set_vertex_buffer(0, vertex_slice);
        renderpass.set_index_buffer(index_slice, wgpu::IndexFormat::Uint16);

        renderpass.draw_indexed(0..self.geometry.index_count, 0, 0..1);
    }
}

#[derive(Default)]
struct App {
    scene: Option<Scene>,
}

impl Application for App {
    fn initialize(&mut self, renderer: &mut Renderer) -> Result<()> {
        self.scene = Some(Scene::new(
            &renderer.driver,
            renderer.context.surface_format(),
        )?);
        Ok(())
    }

    fn update(&mut self, renderer: &mut Renderer, _clock: &FrameClock) -> Result<()> {
        if let Some(scene) = self.scene.as_mut().filter(|scene| scene.dirty) {
            scene
                .geometry
                .update_vertices(&renderer.driver.queue, &scene.vertices)?;
            scene.dirty = false;
        }
        Ok(())
    }

    fn update_gui(&mut self, context: &mut egui::Context) -> Result<()> {
        if let Some(scene) = self.scene.as_mut() {
            let changed = vertex_panel(context, "Vertex Data", &mut scene.vertices, |ui, vertex| {
                edit_components(ui, "Position", &mut vertex.position, (-1.0, 1.0))
                    | edit_components(ui, "UV", &mut vertex.tex_coords, (-2.0, 2.0))
            });
            scene.dirty |= changed;
        }
        Ok(())
    }

    fn render(&mut self, targets: &FrameTargets, encoder: &mut wgpu::CommandEncoder) -> Result<()> {
        let mut renderpass = begin_scene_pass(
            encoder,
            targets,
            wgpu::Color {
                r: 0.1,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
        );

        if let Some(scene) = self.scene.as_ref() {
            scene.render(&mut renderpass);
        }

        Ok(())
    }
}

fn main() -> Result<()> {
    run(
        App::default(),
        AppConfig {
            title: "Textured Quad".to_string(),
            width: 800,
            height: 600,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use support::Mesh;

    #[test]
    fn test_bundled_quad_mesh() {
        let mesh = Mesh::<Vertex>::from_file(resource_path("geometry/quad.txt")).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.vertices[2].tex_coords, [1.0, 0.0]);
    }
}
