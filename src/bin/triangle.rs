use anyhow::Result;
use std::mem;
use support::{
    begin_scene_pass, edit_color, edit_components, resource_path, run, vertex_panel, AppConfig,
    Application, Driver, FrameClock, FrameTargets, Geometry, MeshVertex, PipelineDescription,
    Renderer,
};
use wgpu::{vertex_attr_array, RenderPass, RenderPipeline, TextureFormat, VertexAttribute};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    color: [f32; 3],
}

impl Vertex {
    pub fn vertex_attributes() -> Vec<VertexAttribute> {
        vertex_attr_array![0 => Float32x2, 1 => Float32x3].to_vec()
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
    const COMPONENTS: usize = 5;

    fn from_components(components: &[f32]) -> Self {
        Self {
            position: [components[0], components[1]],
            color: [components[2], components[3], components[4]],
        }
    }
}

struct Scene {
    geometry: Geometry,
    pipeline: RenderPipeline,
    vertices: Vec<Vertex>,
    dirty: bool,
}

impl Scene {
    pub fn new(driver: &Driver, surface_format: TextureFormat) -> Result<Self> {
        let mesh = driver.load_mesh::<Vertex>(resource_path("geometry/triangle.txt"))?;
        let geometry = Geometry::from_mesh(&driver.device, &mesh);

        let shader = driver.load_shader_module(resource_path("shaders/triangle.wgsl"))?;
        let attributes = Vertex::vertex_attributes();
        let pipeline = driver.create_pipeline(&PipelineDescription {
            label: "Triangle Pipeline",
            shader: &shader,
            vertex_layout: Vertex::description(&attributes),
            bind_group_layouts: &[],
            color_format: surface_format,
        });

        Ok(Self {
            geometry,
            pipeline,
            vertices: mesh.vertices,
            dirty: false,
        })
    }

    pub fn render<'rpass>(&'rpass self, renderpass: &mut RenderPass<'rpass>) {
        renderpass.set_pipeline(&self.pipeline);

        let (vertex_buffer_slice, index_buffer_slice) = self.geometry.slices();
        renderpass.set_vertex_buffer(0, vertex_buffer_slice);
        renderpass.set_index_buffer(index_buffer_slice, wgpu::IndexFormat::Uint16);

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
                    | edit_color(ui, "Color", &mut vertex.color)
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
                g: 0.1,
                b: 0.1,
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
            title: "Triangle".to_string(),
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
    fn test_bundled_triangle_mesh() {
        let mesh = Mesh::<Vertex>::from_file(resource_path("geometry/triangle.txt")).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(mesh.vertices[0].color, [1.0, 0.0, 0.0]);
    }
}
