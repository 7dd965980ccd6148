#[cfg(feature = "metal")]
use gfx_backend_metal as back;

#[cfg(feature = "vulkan")]
use gfx_backend_vulkan as back;

mod error;
pub mod renderer;
pub mod sample;
pub mod shader;

pub use error::Error;
pub use sample::{FrameClock, Sample, Shading, VertexSource};

use renderer::Renderer;

use gfx_hal::{prelude::*, Features};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    // A second sample in the same process keeps the first logger.
    let _ = env_logger::Builder::from_env(env).try_init();
}

pub fn run(sample: Sample) {
    init_logging();

    let event_loop = winit::event_loop::EventLoop::new();
    let wb = winit::window::WindowBuilder::new()
        .with_title(sample.title)
        .with_inner_size(winit::dpi::Size::Physical(winit::dpi::PhysicalSize::new(
            sample.size.width,
            sample.size.height,
        )))
        .with_min_inner_size(winit::dpi::Size::Logical(winit::dpi::LogicalSize::new(
            64.0, 64.0,
        )));
    let window = wb.build(&event_loop).expect("failed to create window");
    log::info!("opened \"{}\"", sample.title);

    let should_quit = Arc::new(AtomicBool::new(false));
    let resized = Arc::new(AtomicBool::new(false));

    let should_quit_cloned = Arc::clone(&should_quit);
    let resized_cloned = Arc::clone(&resized);
    let handler = thread::spawn(move || {
        let instance =
            back::Instance::create(sample.title, 1).expect("failed to create an instance of gfx");
        let mut adapters = instance.enumerate_adapters();
        let mut surface = unsafe {
            instance
                .create_surface(&window)
                .expect("failed to create a surface")
        };
        let adapter = adapters.remove(0);
        log::info!("using adapter: {}", adapter.info.name);

        let family = adapter
            .queue_families
            .iter()
            .find(|family| {
                surface.supports_queue_family(family) && family.queue_type().supports_graphics()
            })
            .expect("no graphics queue family can present to the window");
        let mut gpu = unsafe {
            adapter
                .physical_device
                .open(&[(&family, &[1.0])], Features::empty())
                .expect("failed to open the device")
        };

        let mut queue_group = gpu
            .queue_groups
            .pop()
            .expect("device opened without a queue group");
        let queue = &mut queue_group.queues[0];
        let device = gpu.device;

        {
            let mut renderer = Renderer::new(
                &mut surface,
                &adapter,
                &device,
                queue_group.family,
                &sample,
                resized_cloned,
            );

            while !should_quit_cloned.load(Ordering::Relaxed) {
                renderer.render(queue);
            }
        }

        unsafe {
            instance.destroy_surface(surface);
        }
    });

    let mut handler = Some(handler);

    event_loop.run(move |event, _, control_flow| {
        if let winit::event::Event::WindowEvent { event, .. } = event {
            match event {
                winit::event::WindowEvent::CloseRequested
                | winit::event::WindowEvent::KeyboardInput {
                    input:
                        winit::event::KeyboardInput {
                            virtual_keycode: Some(winit::event::VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => {
                    should_quit.store(true, Ordering::Relaxed);
                    log::info!("quit requested");
                    if let Some(handler) = handler.take() {
                        if handler.join().is_err() {
                            log::error!("render thread panicked");
                        }
                    }
                    *control_flow = winit::event_loop::ControlFlow::Exit;
                }
                winit::event::WindowEvent::Resized(_) => {
                    resized.store(true, Ordering::Relaxed);
                }
                _ => {}
            }
        }
    });
}
