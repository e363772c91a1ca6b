use anyhow::Result;
use egui::{
    epaint::ImageDelta, ClippedPrimitive, Context as GuiContext, FullOutput, TextureId,
    TexturesDelta, Ui,
};
use egui_wgpu::{renderer::ScreenDescriptor, Renderer};
use egui_winit::{EventResponse, State};
use wgpu::{CommandBuffer, CommandEncoder, Device, Queue};
use winit::{event::WindowEvent, event_loop::EventLoopWindowTarget, window::Window};

pub struct Gui {
    pub state: State,
    pub context: GuiContext,
}

impl Gui {
    pub fn new<T>(window: &Window, event_loop: &EventLoopWindowTarget<T>) -> Self {
        let state = State::new(event_loop);
        let context = GuiContext::default();
        context.set_pixels_per_point(window.scale_factor() as f32);
        Self { state, context }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> EventResponse {
        let Gui { state, context } = self;
        state.on_event(context, event)
    }

    pub fn create_frame(
        &mut self,
        window: &Window,
        mut action: impl FnMut(&mut GuiContext) -> Result<()>,
    ) -> Result<FullOutput> {
        self.begin_frame(window);
        action(&mut self.context)?;
        Ok(self.end_frame())
    }

    fn begin_frame(&mut self, window: &Window) {
        let gui_input = self.state.take_egui_input(window);
        self.context.begin_frame(gui_input);
    }

    fn end_frame(&mut self) -> FullOutput {
        self.context.end_frame()
    }
}

/// Everything the overlay pass needs for one frame.
pub struct GuiFrame {
    pub textures_delta: TexturesDelta,
    pub paint_jobs: Vec<ClippedPrimitive>,
    pub screen_descriptor: ScreenDescriptor,
}

impl GuiFrame {
    /// The overlay is only drawn onto a surface of the size it was laid out for.
    pub fn fits(&self, surface_size: [u32; 2]) -> bool {
        self.screen_descriptor.size_in_pixels == surface_size
    }
}

/// Texture uploads egui handed out that have not reached the GPU yet.
///
/// egui sends each texture delta only once, so deltas from frames that were
/// skipped are kept until a frame is drawn.
#[derive(Default)]
pub struct PendingTextures {
    uploads: Vec<(TextureId, ImageDelta)>,
}

impl PendingTextures {
    pub fn queue(&mut self, textures_delta: &TexturesDelta) {
        for (id, image_delta) in &textures_delta.set {
            // A full image supersedes everything queued for the same texture
            if image_delta.is_whole() {
                self.uploads.retain(|(queued, _)| queued != id);
            }
            self.uploads.push((*id, image_delta.clone()));
        }
    }

    pub fn forget(&mut self, freed: &[TextureId]) {
        self.uploads.retain(|(id, _)| !freed.contains(id));
    }

    pub fn take(&mut self) -> Vec<(TextureId, ImageDelta)> {
        std::mem::take(&mut self.uploads)
    }

    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }
}

#[derive(Default)]
pub struct GuiRender {
    renderer: Option<Renderer>,
    pending: PendingTextures,
}

impl GuiRender {
    pub fn initialize(
        &mut self,
        device: &Device,
        target_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
        msaa_samples: u32,
    ) {
        self.renderer = Some(Renderer::new(
            device,
            target_format,
            depth_format,
            msaa_samples,
        ));
        log::info!("GUI initialized");
    }

    pub fn initialized(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn queue_textures(&mut self, textures_delta: &TexturesDelta) {
        self.pending.queue(textures_delta);
    }

    /// Sends every queued texture upload to the GPU.
    pub fn upload_textures(&mut self, device: &Device, queue: &Queue) {
        let renderer = match self.renderer.as_mut() {
            Some(renderer) => renderer,
            None => return,
        };

        for (id, image_delta) in self.pending.take() {
            renderer.update_texture(device, queue, id, &image_delta);
        }
    }

    /// Frees textures egui no longer needs, whether or not this frame was drawn.
    pub fn free_textures(&mut self, textures_delta: &TexturesDelta) {
        self.pending.forget(&textures_delta.free);

        let renderer = match self.renderer.as_mut() {
            Some(renderer) => renderer,
            None => return,
        };

        for id in &textures_delta.free {
            renderer.free_texture(id);
        }
    }

    pub fn update_buffers(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        screen_descriptor: &ScreenDescriptor,
        paint_jobs: &[ClippedPrimitive],
    ) -> Vec<CommandBuffer> {
        let renderer = match self.renderer.as_mut() {
            Some(renderer) => renderer,
            None => return Vec::new(),
        };

        renderer.update_buffers(device, queue, encoder, paint_jobs, screen_descriptor)
    }

    pub fn render<'rp>(
        &'rp self,
        render_pass: &mut wgpu::RenderPass<'rp>,
        screen_descriptor: &ScreenDescriptor,
        paint_jobs: &'rp [ClippedPrimitive],
    ) {
        let renderer = match self.renderer.as_ref() {
            Some(renderer) => renderer,
            None => return,
        };

        renderer.render(render_pass, paint_jobs, screen_descriptor);
    }
}

pub fn create_screen_descriptor(window: &Window) -> ScreenDescriptor {
    let window_size = window.inner_size();
    ScreenDescriptor {
        size_in_pixels: [window_size.width, window_size.height],
        pixels_per_point: window.scale_factor() as f32,
    }
}

/// Shows one collapsible editor per vertex. Returns whether any vertex changed.
pub fn vertex_panel<V>(
    context: &GuiContext,
    title: &str,
    vertices: &mut [V],
    mut edit: impl FnMut(&mut Ui, &mut V) -> bool,
) -> bool {
    let mut changed = false;
    egui::Window::new(title)
        .resizable(false)
        .default_pos((10.0, 10.0))
        .show(context, |ui| {
            for (index, vertex) in vertices.iter_mut().enumerate() {
                egui::CollapsingHeader::new(format!("Vertex {}", index)).show(ui, |ui| {
                    changed |= edit(ui, vertex);
                });
            }
        });
    changed
}

pub fn edit_components(ui: &mut Ui, label: &str, values: &mut [f32], range: (f32, f32)) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        for value in values.iter_mut() {
            changed |= ui
                .add(egui::DragValue::new(value).speed(0.01).clamp_range(range.0..=range.1))
                .changed();
        }
    });
    changed
}

pub fn edit_color(ui: &mut Ui, label: &str, color: &mut [f32; 3]) -> bool {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.color_edit_button_rgb(color).changed()
    })
    .inner
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{Color32, ColorImage, TextureOptions};

    fn image(color: Color32) -> ColorImage {
        ColorImage::new([2, 2], color)
    }

    fn full(id: u64, color: Color32) -> (TextureId, ImageDelta) {
        (
            TextureId::Managed(id),
            ImageDelta::full(image(color), TextureOptions::LINEAR),
        )
    }

    fn partial(id: u64) -> (TextureId, ImageDelta) {
        (
            TextureId::Managed(id),
            ImageDelta::partial([0, 0], image(Color32::RED), TextureOptions::LINEAR),
        )
    }

    fn delta(set: Vec<(TextureId, ImageDelta)>, free: Vec<TextureId>) -> TexturesDelta {
        TexturesDelta { set, free }
    }

    #[test]
    fn test_overlay_fits() {
        let frame = GuiFrame {
            textures_delta: TexturesDelta::default(),
            paint_jobs: Vec::new(),
            screen_descriptor: ScreenDescriptor {
                size_in_pixels: [800, 600],
                pixels_per_point: 1.0,
            },
        };
        assert!(frame.fits([800, 600]));
        assert!(!frame.fits([1024, 600]));
        assert!(!frame.fits([800, 0]));
    }

    #[test]
    fn test_skipped_uploads_are_kept() {
        let mut pending = PendingTextures::default();
        pending.queue(&delta(vec![full(0, Color32::WHITE)], vec![]));
        pending.queue(&delta(vec![partial(0)], vec![]));
        assert_eq!(pending.len(), 2);

        let uploads = pending.take();
        assert!(uploads[0].1.is_whole());
        assert!(!uploads[1].1.is_whole());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_full_upload_replaces_queued_ones() {
        let mut pending = PendingTextures::default();
        pending.queue(&delta(vec![full(0, Color32::WHITE), partial(0)], vec![]));
        pending.queue(&delta(vec![full(1, Color32::WHITE)], vec![]));
        pending.queue(&delta(vec![full(0, Color32::BLACK)], vec![]));

        let uploads = pending.take();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].0, TextureId::Managed(1));
        assert_eq!(uploads[1].0, TextureId::Managed(0));
        assert!(uploads[1].1 == full(0, Color32::BLACK).1);
    }

    #[test]
    fn test_freed_textures_are_not_uploaded() {
        let mut pending = PendingTextures::default();
        pending.queue(&delta(
            vec![full(0, Color32::WHITE), full(1, Color32::WHITE)],
            vec![],
        ));
        pending.forget(&[TextureId::Managed(0)]);

        let uploads = pending.take();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, TextureId::Managed(1));
    }
}
