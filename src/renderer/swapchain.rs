use gfx_hal::{adapter::Adapter, format as f, prelude::*, pso, window, Backend};

pub struct Swapchain<'a, B: Backend> {
    device: &'a B::Device,
    adapter: &'a Adapter<B>,
    pub viewport: pso::Viewport,
    pub dims: window::Extent2D,
    pub surface: &'a mut B::Surface,
    pub format: f::Format,
    pub configured: bool,
}

impl<'a, B: Backend> Swapchain<'a, B> {
    pub fn new(
        device: &'a B::Device,
        surface: &'a mut B::Surface,
        adapter: &'a Adapter<B>,
        dims: window::Extent2D,
    ) -> Self {
        let formats = surface.supported_formats(&adapter.physical_device);
        let format = formats.map_or(f::Format::Bgra8Unorm, |formats| {
            pick_format(&formats).unwrap_or(formats[0])
        });
        log::debug!("swapchain format: {:?}", format);

        let viewport = pso::Viewport {
            rect: pso::Rect {
                x: 0,
                y: 0,
                w: dims.width as _,
                h: dims.height as _,
            },
            depth: 0.0..1.0,
        };

        let mut swapchain = Swapchain {
            device,
            surface,
            adapter,
            viewport,
            format,
            dims,
            configured: false,
        };

        swapchain.recreate();
        swapchain
    }

    /// Returns `false` without touching the surface while it has no area,
    /// e.g. when the window is minimised.
    pub fn recreate(&mut self) -> bool {
        let caps = self.surface.capabilities(&self.adapter.physical_device);

        let mut swap_config = window::SwapchainConfig::from_caps(&caps, self.format, self.dims);
        swap_config.present_mode = window::PresentMode::FIFO;
        let extent = swap_config.extent;
        if !is_drawable(extent) {
            log::debug!("surface is {}x{}, not configuring", extent.width, extent.height);
            return false;
        }
        unsafe {
            self.surface
                .configure_swapchain(&self.device, swap_config)
                .expect("Can't create swapchain");
        }
        log::debug!("swapchain configured at {}x{}", extent.width, extent.height);

        self.dims = extent;
        self.viewport.rect.w = extent.width as _;
        self.viewport.rect.h = extent.height as _;
        self.configured = true;
        true
    }
}

fn is_drawable(extent: window::Extent2D) -> bool {
    extent.width > 0 && extent.height > 0
}

/// Prefers a linear (unorm) colour format so clear and fill colours land in
/// the framebuffer unconverted.
fn pick_format(formats: &[f::Format]) -> Option<f::Format> {
    formats
        .iter()
        .find(|format| format.base_format().1 == f::ChannelType::Unorm)
        .copied()
}

impl<'a, B: Backend> Drop for Swapchain<'a, B> {
    fn drop(&mut self) {
        if self.configured {
            unsafe { self.surface.unconfigure_swapchain(&self.device) }
        }
    }
}
