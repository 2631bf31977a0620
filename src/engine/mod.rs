// src/engine/mod.rs - window, event pump and the fixed-rate frame loop
pub mod shell;
pub mod timer;

pub use shell::{FrameStatus, Shell};
pub use timer::FrameTimer;

use std::rc::Rc;
use glam::Vec2;
use std::time::Instant;
use winit::{
    dpi::{LogicalPosition, LogicalSize},
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Window, WindowBuilder},
};

use crate::{
    errors::TentacleError,
    input::{InputManager, InputSnapshot},
    renderer::{FrameCommands, Renderer},
    vfs::VirtualFs,
};

pub struct TentacleEngine {
    window: Window,
    renderer: Renderer,
    input: InputManager,

    shell: Shell,
    last_frame: FrameCommands,
    running: bool,
}

impl TentacleEngine {
    pub async fn new(vfs: VirtualFs, event_loop: &EventLoop<()>) -> Result<Self, TentacleError> {
        log::info!("Initializing Tentacle...");
        let shell = Shell::new(Rc::new(vfs), Instant::now())?;
        let (width, height) = (shell.settings().width, shell.settings().height);

        let window = WindowBuilder::new()
            .with_title(shell.settings().name.as_str())
            .with_inner_size(LogicalSize::new(width, height))
            .build(event_loop)
            .map_err(|e| TentacleError::RenderError(format!("Window creation failed: {}", e)))?;

        let renderer = Renderer::new(&window, (width, height)).await?;

        let mut engine = Self {
            window,
            renderer,
            input: InputManager::new(),
            shell,
            last_frame: FrameCommands::default(),
            running: true,
        };

        engine.reset_render_window();
        Ok(engine)
    }

    fn reset_render_window(&mut self) {
        let settings = self.shell.settings();
        let (width, height) = (settings.width, settings.height);
        self.window.set_title(&settings.name);
        self.window.set_inner_size(LogicalSize::new(width, height));
        self.renderer.set_view(width, height);
        self.shell.game_mut().set_view(width, height);

        let center = LogicalPosition::new(width as f64 / 2.0, height as f64 / 2.0);
        if let Err(e) = self.window.set_cursor_position(center) {
            log::warn!("Could not warp the mouse: {}", e);
        }
    }

    pub fn run(mut self, event_loop: EventLoop<()>) -> ! {
        event_loop.run(move |event, _, control_flow| match event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == self.window.id() => match event {
                WindowEvent::CloseRequested => {
                    log::info!("Window close requested");
                    self.running = false;
                    *control_flow = ControlFlow::Exit;
                }
                WindowEvent::Resized(physical_size) => {
                    self.renderer.resize(*physical_size);
                }
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    self.renderer.resize(**new_inner_size);
                }
                _ => {
                    self.input.handle_window_event(event);
                }
            },
            Event::MainEventsCleared => {
                let now = Instant::now();
                if let Some(delta_time) = self.shell.tick(now) {
                    let input = self.view_input();
                    match self.shell.frame(delta_time, now, &input) {
                        FrameStatus::Quit => self.running = false,
                        FrameStatus::Reloaded => self.reset_render_window(),
                        FrameStatus::Running => {}
                    }
                    self.last_frame = self.shell.take_frame();
                    self.window.request_redraw();
                    self.input.update();
                }

                *control_flow = if self.running {
                    ControlFlow::WaitUntil(self.shell.timer().next_deadline())
                } else {
                    ControlFlow::Exit
                };
            }
            Event::RedrawRequested(window_id) if window_id == self.window.id() => {
                if let Err(e) = self.renderer.render(&self.last_frame) {
                    log::error!("Render error: {}", e);
                }
            }
            Event::LoopDestroyed => {
                let timer = self.shell.timer();
                log::info!(
                    "Shutting down after {} frames ({:.1}s)",
                    timer.frames(),
                    timer.elapsed().as_secs_f64()
                );
            }
            _ => {}
        })
    }

    /// Input with the cursor moved from window pixels into view pixels.
    fn view_input(&self) -> InputSnapshot {
        let mut input = self.input.snapshot();
        let size = self.renderer.size();
        let settings = self.shell.settings();
        if size.width > 0 && size.height > 0 {
            input.mouse_position *= Vec2::new(
                settings.width as f32 / size.width as f32,
                settings.height as f32 / size.height as f32,
            );
        }
        input
    }
}
