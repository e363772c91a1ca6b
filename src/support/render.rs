use crate::{mark_frame, Context, Driver, GuiFrame, GuiRender};
use anyhow::Result;
use std::cmp::max;
use wgpu::{CommandEncoder, RenderPass, TextureFormat, TextureView};

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / max(self.height, 1) as f32
    }
}

/// The views a scene renders into for the current frame.
pub struct FrameTargets<'a> {
    pub color: &'a TextureView,
    pub depth: Option<&'a TextureView>,
}

pub struct Renderer {
    pub context: Context,
    pub driver: Driver,
    pub gui: GuiRender,
}

impl Renderer {
    pub fn new<W>(
        window_handle: &W,
        viewport: &Viewport,
        depth_format: Option<TextureFormat>,
    ) -> Result<Self>
    where
        W: raw_window_handle::HasRawWindowHandle + raw_window_handle::HasRawDisplayHandle,
    {
        let (context, driver) =
            pollster::block_on(Context::new(window_handle, viewport, depth_format))?;
        Ok(Self {
            context,
            driver,
            gui: GuiRender::default(),
        })
    }

    pub fn resize(&mut self, dimensions: [u32; 2]) {
        log::info!(
            "Resizing renderer surface to: ({}, {})",
            dimensions[0],
            dimensions[1]
        );
        self.context
            .configure_surface(dimensions[0], dimensions[1], &self.driver.device);
    }

    /// Records, submits and presents one frame.
    ///
    /// Returns `false` when the frame was skipped, either because the surface is
    /// suspended or because no surface texture could be acquired. GUI texture
    /// uploads of a skipped frame are kept for the next drawn one, and textures
    /// the GUI freed are released on every path.
    pub fn render_frame(
        &mut self,
        overlay: &GuiFrame,
        action: impl FnMut(&FrameTargets, &mut CommandEncoder) -> Result<()>,
    ) -> Result<bool> {
        let _span = tracing::trace_span!("frame").entered();

        self.gui.queue_textures(&overlay.textures_delta);
        let drawn = self.draw_frame(overlay, action);
        self.gui.free_textures(&overlay.textures_delta);

        if let Ok(true) = drawn {
            mark_frame();
        }
        drawn
    }

    fn draw_frame(
        &mut self,
        overlay: &GuiFrame,
        mut action: impl FnMut(&FrameTargets, &mut CommandEncoder) -> Result<()>,
    ) -> Result<bool> {
        if self.context.is_suspended() {
            return Ok(false);
        }

        let frame = match self.context.next_frame(&self.driver.device)? {
            Some(frame) => frame,
            None => return Ok(false),
        };

        let [width, height] = self.context.size();
        self.driver.prepare_depth(width, height);

        let mut encoder = self
            .driver
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if !self.gui.initialized() {
            self.gui
                .initialize(&self.driver.device, self.context.surface_format(), None, 1);
        }

        let gui_commands = {
            let _span = tracing::trace_span!("frame.update_buffers").entered();
            self.gui
                .upload_textures(&self.driver.device, &self.driver.queue);
            self.gui.update_buffers(
                &self.driver.device,
                &self.driver.queue,
                &mut encoder,
                &overlay.screen_descriptor,
                &overlay.paint_jobs,
            )
        };

        {
            let _span = tracing::trace_span!("frame.scene_pass").entered();
            let targets = FrameTargets {
                color: &frame.view,
                depth: self.driver.depth_view(),
            };
            action(&targets, &mut encoder)?;
        }

        let fits = {
            let _span = tracing::trace_span!("frame.overlay_size_check").entered();
            overlay.fits(self.context.size())
        };
        if fits {
            let _span = tracing::trace_span!("frame.overlay_pass").entered();
            encoder.insert_debug_marker("Render overlay");
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.gui.render(
                &mut render_pass,
                &overlay.screen_descriptor,
                &overlay.paint_jobs,
            );
        }

        {
            let _span = tracing::trace_span!("frame.present").entered();
            self.driver.queue.submit(
                gui_commands
                    .into_iter()
                    .chain(std::iter::once(encoder.finish())),
            );

            let suboptimal = frame.suboptimal();
            frame.present();

            if suboptimal {
                self.context.reconfigure(&self.driver.device);
            }
        }
        self.context.poll(&self.driver.device);

        Ok(true)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.context.aspect_ratio()
    }
}

/// Begins a pass that clears the color target and, when present, the depth target.
pub fn begin_scene_pass<'a>(
    encoder: &'a mut CommandEncoder,
    targets: &FrameTargets<'a>,
    clear_color: wgpu::Color,
) -> RenderPass<'a> {
    encoder.insert_debug_marker("Render scene");

    let depth_stencil_attachment =
        targets
            .depth
            .map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: true,
                }),
                stencil_ops: None,
            });

    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: targets.color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear_color),
                store: true,
            },
        })],
        depth_stencil_attachment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio() {
        let viewport = Viewport {
            width: 800,
            height: 600,
            ..Default::default()
        };
        assert!((viewport.aspect_ratio() - 4.0 / 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_aspect_ratio_zero_height() {
        let viewport = Viewport {
            width: 800,
            height: 0,
            ..Default::default()
        };
        assert_eq!(viewport.aspect_ratio(), 800.0);
    }
}
