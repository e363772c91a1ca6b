use crate::{Driver, Viewport};
use anyhow::{bail, Context as _, Result};
use wgpu::{
    Adapter, CompositeAlphaMode, Device, Instance, PresentMode, Surface, SurfaceConfiguration,
    SurfaceError, SurfaceTexture, TextureFormat, TextureView, TextureViewDescriptor,
};

/// What to do when the surface refuses to hand out a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AcquireAction {
    /// Surface must be configured again; the frame is skipped.
    Reconfigure,
    /// Transient failure; skip the frame.
    Skip,
    /// The device is out of memory; the frame fails with an error.
    Fatal,
}

/// Maps an acquisition error to the action the frame loop takes.
///
/// Variants this mapping does not know about are treated as transient.
#[allow(unreachable_patterns)]
pub fn acquire_action(error: &SurfaceError) -> AcquireAction {
    match error {
        SurfaceError::Lost | SurfaceError::Outdated => AcquireAction::Reconfigure,
        SurfaceError::Timeout => AcquireAction::Skip,
        SurfaceError::OutOfMemory => AcquireAction::Fatal,
        // Guards variants added by newer wgpu releases
        _ => AcquireAction::Skip,
    }
}

/// An acquired surface texture and its render target view.
pub struct SurfaceFrame {
    pub texture: SurfaceTexture,
    pub view: TextureView,
}

impl SurfaceFrame {
    pub fn suboptimal(&self) -> bool {
        self.texture.suboptimal
    }

    pub fn present(self) {
        let Self { texture, view } = self;
        drop(view);
        texture.present();
    }
}

/// Owns the instance, the window surface and the adapter it was negotiated with.
pub struct Context {
    pub instance: Instance,
    pub surface: Surface,
    pub adapter: Adapter,
    pub config: SurfaceConfiguration,
    suspended: bool,
}

impl Context {
    /// Requests an adapter and a device for the window, then configures its surface.
    ///
    /// The device and queue are handed to the returned [`Driver`].
    pub async fn new<W>(
        window_handle: &W,
        viewport: &Viewport,
        depth_format: Option<TextureFormat>,
    ) -> Result<(Self, Driver)>
    where
        W: raw_window_handle::HasRawWindowHandle + raw_window_handle::HasRawDisplayHandle,
    {
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: Self::backends(),
            ..Default::default()
        });
        log::trace!("WebGPU instance created");

        // The window is owned by the event loop and outlives the renderer
        let surface = unsafe { instance.create_surface(window_handle) }
            .context("Failed to create a surface for the window!")?;

        log::trace!("Adapter requested");
        let adapter = Self::request_adapter(&instance, &surface)
            .await
            .context("No suitable adapter found for the window surface!")?;
        log::info!("Adapter: {:?}", adapter.get_info());

        log::trace!("Device requested");
        let (device, queue) = Self::request_device(&adapter).await?;
        log::trace!("Device and queue acquired");

        let capabilities = surface.get_capabilities(&adapter);
        let config = negotiate(
            &capabilities.formats,
            &capabilities.present_modes,
            &capabilities.alpha_modes,
            viewport.width,
            viewport.height,
        )?;
        surface.configure(&device, &config);
        log::trace!(
            "Surface configured: {:?} {}x{}",
            config.format,
            config.width,
            config.height
        );

        log::info!("Renderer context initialized");

        Ok((
            Self {
                instance,
                surface,
                adapter,
                config,
                suspended: false,
            },
            Driver::new(device, queue, depth_format),
        ))
    }

    /// Reconfigures the surface for a new size.
    ///
    /// A zero-sized surface cannot be configured; the context is suspended until
    /// a non-zero size arrives and `false` is returned.
    pub fn configure_surface(&mut self, width: u32, height: u32, device: &Device) -> bool {
        self.suspended = !resize_config(&mut self.config, width, height);
        if self.suspended {
            log::trace!("Surface suspended at {}x{}", width, height);
            return false;
        }
        self.surface.configure(device, &self.config);
        log::trace!("Surface configured: {}x{}", width, height);
        true
    }

    pub fn reconfigure(&mut self, device: &Device) {
        if !self.suspended {
            self.surface.configure(device, &self.config);
        }
    }

    /// Acquires the next surface texture, or `None` when this frame should be skipped.
    pub fn next_frame(&mut self, device: &Device) -> Result<Option<SurfaceFrame>> {
        if self.suspended {
            return Ok(None);
        }

        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(error) => {
                return match acquire_action(&error) {
                    AcquireAction::Reconfigure => {
                        log::warn!("Surface {:?}, reconfiguring", error);
                        self.reconfigure(device);
                        Ok(None)
                    }
                    AcquireAction::Skip => {
                        log::warn!("Skipping frame: {}", error);
                        Ok(None)
                    }
                    AcquireAction::Fatal => {
                        bail!("Failed to acquire the next surface texture: {}", error)
                    }
                };
            }
        };

        let view = texture.texture.create_view(&TextureViewDescriptor {
            label: Some("Surface texture view"),
            ..Default::default()
        });

        Ok(Some(SurfaceFrame { texture, view }))
    }

    pub fn poll(&self, device: &Device) {
        let _ = device.poll(wgpu::Maintain::Poll);
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> [u32; 2] {
        [self.config.width, self.config.height]
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.config.width as f32 / std::cmp::max(1, self.config.height) as f32
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn backends() -> wgpu::Backends {
        wgpu::util::backend_bits_from_env().unwrap_or_else(wgpu::Backends::all)
    }

    fn required_limits(adapter: &Adapter) -> wgpu::Limits {
        wgpu::Limits::default()
            // Use the texture resolution limits from the adapter
            // to support images the size of the surface
            .using_resolution(adapter.limits())
    }

    fn required_features() -> wgpu::Features {
        wgpu::Features::empty()
    }

    fn optional_features() -> wgpu::Features {
        wgpu::Features::empty()
    }

    async fn request_adapter(instance: &Instance, surface: &Surface) -> Option<Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
    }

    async fn request_device(adapter: &Adapter) -> Result<(Device, wgpu::Queue)> {
        log::debug!("Adapter features: {:?}", adapter.features());

        adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: (Self::optional_features() & adapter.features())
                        | Self::required_features(),
                    limits: Self::required_limits(adapter),
                    label: Some("Render Device"),
                },
                None,
            )
            .await
            .context("Failed to request a device!")
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        log::trace!("Renderer context released");
    }
}

/// Applies a new window size to the surface configuration.
///
/// Returns `false` and leaves the configuration untouched when either side is
/// zero, in which case the surface stays suspended.
pub fn resize_config(config: &mut SurfaceConfiguration, width: u32, height: u32) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    config.width = width;
    config.height = height;
    true
}

/// Picks a surface configuration out of the capabilities the adapter reports.
pub fn negotiate(
    formats: &[TextureFormat],
    present_modes: &[PresentMode],
    alpha_modes: &[CompositeAlphaMode],
    width: u32,
    height: u32,
) -> Result<SurfaceConfiguration> {
    // This assumes an sRGB surface texture
    let format = match formats.iter().copied().find(|format| format.is_srgb()) {
        Some(format) => format,
        None => *formats
            .first()
            .context("The surface reports no supported formats!")?,
    };

    if !present_modes.is_empty() && !present_modes.contains(&PresentMode::Fifo) {
        log::warn!("Surface does not list Fifo presentation, using it anyway");
    }

    let alpha_mode = if alpha_modes.contains(&CompositeAlphaMode::Auto) {
        CompositeAlphaMode::Auto
    } else {
        alpha_modes
            .first()
            .copied()
            .unwrap_or(CompositeAlphaMode::Auto)
    };

    Ok(SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: PresentMode::Fifo,
        alpha_mode,
        view_formats: vec![],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiate_prefers_srgb() {
        let config = negotiate(
            &[TextureFormat::Bgra8Unorm, TextureFormat::Bgra8UnormSrgb],
            &[PresentMode::Fifo, PresentMode::Mailbox],
            &[CompositeAlphaMode::Opaque],
            800,
            600,
        )
        .unwrap();
        assert_eq!(config.format, TextureFormat::Bgra8UnormSrgb);
        assert_eq!(config.present_mode, PresentMode::Fifo);
        assert_eq!(config.alpha_mode, CompositeAlphaMode::Opaque);
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.view_formats.is_empty());
    }

    #[test]
    fn test_negotiate_falls_back_to_first_format() {
        let config = negotiate(
            &[TextureFormat::Rgba16Float, TextureFormat::Bgra8Unorm],
            &[PresentMode::Fifo],
            &[CompositeAlphaMode::Opaque, CompositeAlphaMode::Auto],
            1,
            1,
        )
        .unwrap();
        assert_eq!(config.format, TextureFormat::Rgba16Float);
        assert_eq!(config.alpha_mode, CompositeAlphaMode::Auto);
    }

    #[test]
    fn test_negotiate_without_formats() {
        assert!(negotiate(&[], &[PresentMode::Fifo], &[], 800, 600).is_err());
    }

    #[test]
    fn test_negotiate_clamps_zero_size() {
        let config = negotiate(&[TextureFormat::Bgra8UnormSrgb], &[], &[], 0, 0).unwrap();
        assert_eq!((config.width, config.height), (1, 1));
        assert_eq!(config.alpha_mode, CompositeAlphaMode::Auto);
    }

    fn surface_config() -> SurfaceConfiguration {
        negotiate(
            &[TextureFormat::Bgra8UnormSrgb],
            &[PresentMode::Fifo],
            &[CompositeAlphaMode::Opaque],
            800,
            600,
        )
        .unwrap()
    }

    #[test]
    fn test_zero_width_suspends() {
        let mut config = surface_config();
        assert!(!resize_config(&mut config, 0, 600));
        assert_eq!((config.width, config.height), (800, 600));
    }

    #[test]
    fn test_zero_height_suspends() {
        let mut config = surface_config();
        assert!(!resize_config(&mut config, 800, 0));
        assert!(!resize_config(&mut config, 0, 0));
        assert_eq!((config.width, config.height), (800, 600));
    }

    #[test]
    fn test_resize_resumes_after_suspension() {
        let mut config = surface_config();
        assert!(!resize_config(&mut config, 0, 0));
        assert!(resize_config(&mut config, 1024, 768));
        assert_eq!((config.width, config.height), (1024, 768));
        assert_eq!(config.format, TextureFormat::Bgra8UnormSrgb);
    }

    #[test]
    fn test_acquire_action() {
        assert_eq!(acquire_action(&SurfaceError::Lost), AcquireAction::Reconfigure);
        assert_eq!(
            acquire_action(&SurfaceError::Outdated),
            AcquireAction::Reconfigure
        );
        assert_eq!(acquire_action(&SurfaceError::Timeout), AcquireAction::Skip);
        assert_eq!(
            acquire_action(&SurfaceError::OutOfMemory),
            AcquireAction::Fatal
        );
    }
}
