use anyhow::Result;
use egui::{Context as GuiContext, FullOutput};
use wgpu::CommandEncoder;
use winit::{
	dpi::PhysicalSize,
	event::{ElementState, Event, VirtualKeyCode, WindowEvent},
	event_loop::{ControlFlow, EventLoop},
	window::{Window, WindowBuilder},
};

use crate::{
	create_screen_descriptor, init_profiling, AppConfig, FrameClock, FrameTargets, Gui, GuiFrame,
	Renderer, Viewport,
};

pub struct Resources<'a> {
	pub application: &'a mut (dyn Application + 'static),
	pub gui: &'a mut Gui,
	pub clock: &'a mut FrameClock,
	pub renderer: &'a mut Renderer,
	pub window: &'a mut Window,
}

pub trait Application {
	fn initialize(&mut self, _renderer: &mut Renderer) -> Result<()> {
		Ok(())
	}

	fn update(&mut self, _renderer: &mut Renderer, _clock: &FrameClock) -> Result<()> {
		Ok(())
	}

	fn update_gui(&mut self, _context: &mut GuiContext) -> Result<()> {
		Ok(())
	}

	fn resize(&mut self, _renderer: &mut Renderer) -> Result<()> {
		Ok(())
	}

	fn depth_format(&self) -> Option<wgpu::TextureFormat> {
		None
	}

	fn render(&mut self, _targets: &FrameTargets, _encoder: &mut CommandEncoder) -> Result<()> {
		Ok(())
	}

	fn cleanup(&mut self) -> Result<()> {
		Ok(())
	}

	fn on_key(&mut self, _keycode: &VirtualKeyCode, _keystate: &ElementState) -> Result<()> {
		Ok(())
	}
}

pub fn run(mut application: impl Application + 'static, config: AppConfig) -> Result<()> {
	init_logging();
	init_profiling();
	log::info!("App started");

	let event_loop = EventLoop::new();
	let mut window = WindowBuilder::new()
		.with_title(config.title)
		.with_inner_size(PhysicalSize::new(config.width, config.height))
		.build(&event_loop)?;
	log::trace!("Window created: {}x{}", config.width, config.height);

	let window_size = window.inner_size();
	let mut renderer = Renderer::new(
		&window,
		&Viewport {
			width: window_size.width,
			height: window_size.height,
			..Default::default()
		},
		application.depth_format(),
	)?;

	let mut gui = Gui::new(&window, &event_loop);
	let mut clock = FrameClock::default();

	application.initialize(&mut renderer)?;
	log::info!("Application initialized");

	event_loop.run(move |event, _, control_flow| {
		let mut resources = Resources {
			application: &mut application,
			gui: &mut gui,
			clock: &mut clock,
			renderer: &mut renderer,
			window: &mut window,
		};
		if let Err(error) = run_loop(&mut resources, &event, control_flow) {
			log::error!("Application error: {:#}", error);
		}
	});
}

fn init_logging() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn run_loop(
	resources: &mut Resources,
	event: &Event<()>,
	control_flow: &mut ControlFlow,
) -> Result<()> {
	let Resources {
		application,
		gui,
		clock,
		renderer,
		window,
	} = resources;

	if let Event::WindowEvent { event, window_id } = event {
		if *window_id == window.id() && gui.handle_window_event(event).consumed {
			return Ok(());
		}
	}

	match event {
		Event::MainEventsCleared => {
			clock.tick();

			let output = gui.create_frame(window, |context| application.update_gui(context))?;
			let FullOutput {
				textures_delta,
				shapes,
				..
			} = output;
			let overlay = GuiFrame {
				textures_delta,
				paint_jobs: gui.context.tessellate(shapes),
				screen_descriptor: create_screen_descriptor(window),
			};

			application.update(renderer, clock)?;

			renderer.render_frame(&overlay, |targets, encoder| {
				application.render(targets, encoder)
			})?;
		}
		Event::WindowEvent { event, window_id } if *window_id == window.id() => match event {
			WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
			WindowEvent::KeyboardInput { input, .. } => {
				if let (Some(VirtualKeyCode::Escape), ElementState::Pressed) =
					(input.virtual_keycode, input.state)
				{
					*control_flow = ControlFlow::Exit;
				}

				if let Some(keycode) = input.virtual_keycode.as_ref() {
					application.on_key(keycode, &input.state)?;
				}
			}
			WindowEvent::Resized(physical_size) => {
				renderer.resize([physical_size.width, physical_size.height]);
				application.resize(renderer)?;
			}
			WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
				renderer.resize([new_inner_size.width, new_inner_size.height]);
				application.resize(renderer)?;
			}
			_ => {}
		},
		Event::LoopDestroyed => {
			application.cleanup()?;
			log::info!("Application terminated");
		}
		_ => {}
	}

	Ok(())
}
