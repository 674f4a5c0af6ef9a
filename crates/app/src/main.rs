//! Lumen demo - Main Entry Point
//!
//! The winit event loop runs on the main thread and forwards host events to a
//! render thread, which owns the renderer and drives frames as fast as the
//! present mode allows.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use glam::{Quat, Vec3};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event_loop::ControlFlow;

use lumen_core::{Config, Timer};
use lumen_platform::{
    ActiveEventLoop, EventForwarder, EventLoop, HostEvent, SurfaceProvider, Window, WindowEvent,
    WindowId, WindowSurface, create_window, host_channel,
};
use lumen_renderer::{
    FrameInfo, FrameUniforms, GlobalUbo, Mesh, MeshData, PointLightSystem, Renderer,
    RendererSettings, SimpleRenderSystem, VulkanBackend,
};
use lumen_rhi::command::CommandBuffer;
use lumen_rhi::device::Device;
use lumen_scene::{Camera, DrawableRegistry, KeyboardMovementController, TransformComponent};

/// Config file read when no path is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "lumen.toml";

/// How often the event loop checks whether the render thread has finished.
const RENDER_THREAD_POLL: Duration = Duration::from_millis(50);

/// Radians per second the point lights orbit at.
const LIGHT_ORBIT_SPEED: f32 = 0.8;

struct App {
    config: Config,
    window: Option<Arc<Window>>,
    forwarder: Option<EventForwarder>,
    render_thread: Option<JoinHandle<Result<()>>>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            forwarder: None,
            render_thread: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = create_window(event_loop, &self.config.window)?;
        let (forwarder, events) = host_channel();

        let thread_window = window.clone();
        let config = self.config.clone();
        let handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || run_renderer(thread_window, events, config))
            .context("failed to spawn the render thread")?;

        self.window = Some(window);
        self.forwarder = Some(forwarder);
        self.render_thread = Some(handle);
        Ok(())
    }

    /// Disconnects the render thread and waits for it.
    fn stop(&mut self) {
        // Dropping the sender makes the render thread see a close.
        self.forwarder = None;

        if let Some(handle) = self.render_thread.take() {
            match handle.join() {
                Ok(Ok(())) => info!("Render thread finished"),
                Ok(Err(e)) => error!("Render thread failed: {:?}", e),
                Err(_) => error!("Render thread panicked"),
            }
        }
        self.window = None;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            error!("Failed to start: {:?}", e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(forwarder) = &self.forwarder
            && !forwarder.forward(&event)
        {
            warn!("Render thread stopped listening for events");
        }

        if let WindowEvent::CloseRequested = event {
            info!("Close requested, shutting down");
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let finished = self
            .render_thread
            .as_ref()
            .is_some_and(|handle| handle.is_finished());
        if finished {
            event_loop.exit();
        } else {
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + RENDER_THREAD_POLL));
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.stop();
    }
}

/// Render thread body: builds the renderer and the scene, then runs frames
/// until the window closes.
fn run_renderer(window: Arc<Window>, events: Receiver<HostEvent>, config: Config) -> Result<()> {
    info!("Render thread started");

    let surface = WindowSurface::new(window, events);
    let backend = VulkanBackend::new(&surface, config.renderer.validation)?;
    let mut renderer = Renderer::new(backend, surface, RendererSettings::from(&config.renderer))?;

    // Everything below holds the device and drops before the renderer.
    let device = renderer.backend().device().clone();
    let uniforms = FrameUniforms::new(device.clone(), renderer.settings().frames_in_flight)?;
    let shader_dir = &config.renderer.shader_dir;
    let simple_system = SimpleRenderSystem::new(
        device.clone(),
        renderer.render_pass(),
        uniforms.layout(),
        shader_dir,
    )?;
    let point_light_system = PointLightSystem::new(
        device.clone(),
        renderer.render_pass(),
        uniforms.layout(),
        shader_dir,
    )?;
    let mut drawables = build_scene(&device)?;

    let systems = Systems {
        uniforms: &uniforms,
        simple: &simple_system,
        point_lights: &point_light_system,
    };
    let result = run_frames(&mut renderer, &device, &systems, &mut drawables);

    if let Err(e) = renderer.wait_idle() {
        error!("Failed to wait for device idle: {:?}", e);
    }
    result
}

struct Systems<'a> {
    uniforms: &'a FrameUniforms,
    simple: &'a SimpleRenderSystem,
    point_lights: &'a PointLightSystem,
}

fn run_frames(
    renderer: &mut Renderer<VulkanBackend, WindowSurface>,
    device: &Arc<Device>,
    systems: &Systems<'_>,
    drawables: &mut DrawableRegistry<Mesh>,
) -> Result<()> {
    let mut camera = Camera::new();
    let mut viewer = TransformComponent::new().with_translation(Vec3::new(0.0, -1.0, -3.0));
    let controller = KeyboardMovementController::new();
    let mut timer = Timer::new();

    info!("Initialization complete, entering main loop");

    loop {
        let window = renderer.window_mut();
        window.begin_input_frame();
        window.poll_events();
        if window.close_requested() {
            info!("Close requested, leaving the frame loop");
            return Ok(());
        }

        let frame_time = timer.frame_time();
        controller.move_in_plane_xz(renderer.window().input(), frame_time, &mut viewer);
        camera.set_view_yxz(viewer.translation, viewer.rotation);
        camera.set_perspective_projection(50f32.to_radians(), renderer.aspect_ratio(), 0.1, 100.0);

        orbit_lights(drawables, frame_time);

        let Some(cmd) = renderer.begin_frame()? else {
            continue;
        };
        let frame_index = renderer.frame_index();

        let mut ubo = GlobalUbo::new(camera.projection_view());
        systems.point_lights.update(drawables, &mut ubo);
        systems.uniforms.update(frame_index, &ubo)?;

        let recorder = CommandBuffer::from_handle(device.clone(), cmd);
        let frame = FrameInfo {
            frame_index,
            frame_time,
            command_buffer: &recorder,
            camera: &camera,
            global_descriptor_set: systems.uniforms.descriptor_set(frame_index),
        };

        renderer.begin_pass(cmd);
        systems.simple.render(&frame, drawables);
        systems.point_lights.render(&frame, drawables);
        renderer.end_pass(cmd);
        renderer.end_frame()?;
    }
}

/// Two cubes on a floor, lit by a ring of colored point lights.
fn build_scene(device: &Arc<Device>) -> Result<DrawableRegistry<Mesh>> {
    let cube = Arc::new(Mesh::new(device.clone(), &MeshData::cube())?);
    let floor = Arc::new(Mesh::new(device.clone(), &MeshData::quad(1.0))?);

    let mut drawables = DrawableRegistry::new();

    for x in [-0.75, 0.75] {
        drawables.spawn().with_mesh(cube.clone()).with_transform(
            TransformComponent::new()
                .with_translation(Vec3::new(x, 0.0, 0.5))
                .with_scale(Vec3::splat(0.5))
                .with_rotation(Vec3::new(0.0, x, 0.0)),
        );
    }

    drawables.spawn().with_mesh(floor).with_transform(
        TransformComponent::new()
            .with_translation(Vec3::new(0.0, 0.25, 0.5))
            .with_scale(Vec3::new(4.0, 1.0, 4.0)),
    );

    let colors = [
        Vec3::new(1.0, 0.1, 0.1),
        Vec3::new(0.1, 0.1, 1.0),
        Vec3::new(0.1, 1.0, 0.1),
        Vec3::new(1.0, 1.0, 0.1),
    ];
    for (i, color) in colors.into_iter().enumerate() {
        let angle = i as f32 * std::f32::consts::TAU / colors.len() as f32;
        let position = Quat::from_rotation_y(angle) * Vec3::new(1.5, -1.0, 0.0);
        drawables
            .spawn_point_light(0.8, 0.05, color)
            .transform
            .translation = position + Vec3::new(0.0, 0.0, 0.5);
    }

    info!("Scene built with {} drawables", drawables.len());
    Ok(drawables)
}

/// Rotates every point light about the vertical axis through the scene center.
fn orbit_lights(drawables: &mut DrawableRegistry<Mesh>, frame_time: f32) {
    let center = Vec3::new(0.0, 0.0, 0.5);
    let rotation = Quat::from_rotation_y(LIGHT_ORBIT_SPEED * frame_time);
    for drawable in drawables.iter_mut() {
        if drawable.point_light.is_some() {
            let offset = drawable.transform.translation - center;
            drawable.transform.translation = center + rotation * offset;
        }
    }
}

fn main() -> Result<()> {
    lumen_core::init_logging();
    info!("Starting lumen");

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow!("event loop failed: {}", e))?;

    Ok(())
}
