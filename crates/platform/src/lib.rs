//! Platform layer: windowing & event loop.
//!
//! Design goals:
//! - No busy loop: static lessons redraw on demand, not every tick.
//! - Proper handling of resize/scale/close.
//! - Window/surface setup comes in through an explicit [`WindowConfig`],
//!   not process-global state.

use std::sync::Arc;

use anyhow::Result;
use renderer::{GpuState, Lesson};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

/// Explicit window/surface configuration passed to [`run`].
#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub backends: wgpu::Backends,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "GPU Lessons".to_string(),
            width: 1280,
            height: 720,
            backends: wgpu::Backends::all(),
        }
    }
}

struct App {
    config: WindowConfig,
    // Consumed once when the window comes up.
    lesson: Option<Lesson>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.width.max(1),
                self.config.height.max(1),
            ));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let lesson = self.lesson.take().expect("lesson already consumed");
        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.config.backends,
            lesson,
        ));
        self.gpu = Some(gpu);
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
                if let Some(window) = self.window.as_ref() {
                    window.request_redraw();
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                // A Resized event with the new physical size follows.
                log::info!("Scale factor changed: {scale_factor:.3}");
            }
            WindowEvent::RedrawRequested => {
                let Some(gpu) = self.gpu.as_mut() else {
                    return;
                };
                match gpu.render() {
                    Ok(()) => {}
                    Err(err) if GpuState::is_surface_lost(&err) => {
                        log::warn!("Surface lost/outdated, reconfiguring");
                        gpu.recreate_surface();
                        if let Some(window) = self.window.as_ref() {
                            window.request_redraw();
                        }
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Surface out of memory, exiting");
                        event_loop.exit();
                    }
                    Err(err) => {
                        log::warn!("Frame dropped: {err:?}");
                    }
                }
            }
            _ => {}
        }
    }
}

/// Open a window and drive one lesson until the window is closed.
pub fn run(config: WindowConfig, lesson: Lesson) -> Result<()> {
    let event_loop: EventLoop<()> =
        EventLoop::new().map_err(|e| anyhow::anyhow!("Failed to create event loop: {e}"))?;

    let mut app = App {
        config,
        lesson: Some(lesson),
        window: None,
        gpu: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_720p() {
        let cfg = WindowConfig::default();
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert_eq!(cfg.backends, wgpu::Backends::all());
    }
}
