use anyhow::Result;
use nalgebra_glm as glm;
use std::mem;
use support::{
    begin_scene_pass, edit_color, edit_components, resource_path, run, vertex_panel, AppConfig,
    Application, Driver, FrameClock, FrameTargets, Geometry, MeshVertex, PipelineDescription,
    Renderer, Texture, UniformBinding,
};
use wgpu::{
    vertex_attr_array, Queue, RenderPass, RenderPipeline, ShaderStages, TextureFormat,
    VertexAttribute,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
}

impl Vertex {
    pub fn vertex_attributes() -> Vec<VertexAttribute> {
        vertex_attr_array![0 => Float32x3, 1 => Float32x3].to_vec()
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
    const COMPONENTS: usize = 6;

    fn from_components(components: &[f32]) -> Self {
        Self {
            position: [components[0], components[1], components[2]],
            color: [components[3], components[4], components[5]],
        }
    }
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    mvp: glm::Mat4,
    time: f32,
    _padding: [f32; 3],
}

impl Uniforms {
    fn new(aspect_ratio: f32, angle: f32, time: f32) -> Self {
        // z is up in the pyramid mesh
        let projection = glm::perspective_rh_zo(aspect_ratio, 45_f32.to_radians(), 0.1, 100.0);
        let view = glm::look_at(
            &glm::vec3(0.0, -2.5, 1.2),
            &glm::vec3(0.0, 0.0, 0.1),
            &glm::Vec3::z(),
        );
        let model = glm::rotation(angle, &glm::Vec3::z());
        Self {
            mvp: projection * view * model,
            time,
            _padding: [0.0; 3],
        }
    }
}

struct Scene {
    geometry: Geometry,
    pipeline: RenderPipeline,
    uniform: UniformBinding<Uniforms>,
    vertices: Vec<Vertex>,
    dirty: bool,
}

impl Scene {
    pub fn new(driver: &Driver, surface_format: TextureFormat) -> Result<Self> {
        let mesh = driver.load_mesh::<Vertex>(resource_path("geometry/pyramid.txt"))?;
        let geometry = Geometry::from_mesh(&driver.device, &mesh);
        let uniform = UniformBinding::new(
            &driver.device,
            ShaderStages::VERTEX_FRAGMENT,
            &Uniforms::default(),
        );

        let shader = driver.load_shader_module(resource_path("shaders/pyramid.wgsl"))?;
        let attributes = Vertex::vertex_attributes();
        let pipeline = driver.create_pipeline(&PipelineDescription {
            label: "Pyramid Pipeline",
            shader: &shader,
            vertex_layout: Vertex::description(&attributes),
            bind_group_layouts: &[&uniform.bind_group_layout],
            color_format: surface_format,
        });

        Ok(Self {
            geometry,
            pipeline,
            uniform,
            vertices: mesh.vertices,
            dirty: false,
        })
    }

    pub fn update(&mut self, queue: &Queue, uniforms: &Uniforms) -> Result<()> {
        self.uniform.update(queue, uniforms);
        if self.dirty {
            self.geometry.update_vertices(queue, &self.vertices)?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn render<'rpass>(&'rpass self, renderpass: &mut RenderPass<'rpass>) {
        renderpass.set_pipeline(&self.pipeline);
        renderpass.set_bind_group(0, &self.uniform.bind_group, &[]);

        let (vertex_slice, index_slice) = self.geometry.slices();
        renderpass.set_vertex_buffer(0, vertex_slice);
        renderpass.set_index_buffer(index_slice, wgpu::IndexFormat::Uint16);

        renderpass.draw_indexed(0..self.geometry.index_count, 0, 0..1);
    }
}

struct App {
    scene: Option<Scene>,
    angle: f32,
    rotation_speed: f32,
    frames_per_second: f64,
}

impl Default for App {
    fn default() -> Self {
        Self {
            scene: None,
            angle: 0.0,
            rotation_speed: 0.8,
            frames_per_second: 0.0,
        }
    }
}

impl Application for App {
    fn initialize(&mut self, renderer: &mut Renderer) -> Result<()> {
        self.scene = Some(Scene::new(
            &renderer.driver,
            renderer.context.surface_format(),
        )?);
        Ok(())
    }

    fn depth_format(&self) -> Option<TextureFormat> {
        Some(Texture::DEPTH_FORMAT)
    }

    fn update(&mut self, renderer: &mut Renderer, clock: &FrameClock) -> Result<()> {
        self.angle += self.rotation_speed * clock.delta_time as f32;
        self.frames_per_second = clock.frames_per_second();

        let uniforms = Uniforms::new(renderer.aspect_ratio(), self.angle, clock.elapsed as f32);
        if let Some(scene) = self.scene.as_mut() {
            scene.update(&renderer.driver.queue, &uniforms)?;
        }
        Ok(())
    }

    fn update_gui(&mut self, context: &mut egui::Context) -> Result<()> {
        egui::Window::new("Pyramid")
            .resizable(false)
            .default_pos((600.0, 10.0))
            .show(context, |ui| {
                ui.label(format!("{:.0} fps", self.frames_per_second));
                ui.add(
                    egui::Slider::new(&mut self.rotation_speed, -3.0..=3.0).text("Rotation speed"),
                );
            });

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
                r: 0.05,
                g: 0.05,
                b: 0.08,
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
            title: "Pyramid".to_string(),
            width: 800,
            height: 600,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use support::{uniform_size, Mesh};

    #[test]
    fn test_bundled_pyramid_mesh() {
        let mesh = Mesh::<Vertex>::from_file(resource_path("geometry/pyramid.txt")).unwrap();
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.index_count(), 18);
        assert_eq!(mesh.vertices[4].position, [0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_uniforms_match_shader_layout() {
        assert_eq!(mem::size_of::<Uniforms>(), 80);
        assert_eq!(uniform_size::<Uniforms>(), 80);
    }

    #[test]
    fn test_uniforms_project_tip_inside_clip_space() {
        let uniforms = Uniforms::new(4.0 / 3.0, 0.0, 0.0);
        let clip = uniforms.mvp * glm::vec4(0.0, 0.0, 0.5, 1.0);
        let ndc = clip.xyz() / clip.w;
        assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
