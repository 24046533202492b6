use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use portal_runtime::panel::DebugPanel;
use portal_runtime::{
    advance_frame, assign_materials, decode_obj, portal_assignments, BakedTexture, FireflyField,
    Material, MeshData, OrbitControls, PortalArchive, Renderer, SceneGraph, SceneUniforms,
    TweakHandle, Viewport,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let archive = PortalArchive::open(&options.path)
        .with_context(|| format!("failed to open archive {}", options.path))?;

    let seed = options.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    });
    info!("firefly field seed: {seed}");
    let fireflies = FireflyField::portal_default(seed);

    let assets = load_scene_assets(&archive);

    if options.summary_only {
        let assets = assets?;
        print_summary(&assets.graph, &fireflies);
        return Ok(());
    }

    // A broken archive payload is non-fatal in interactive mode; the
    // background and fireflies still render.
    let assets = match assets {
        Ok(assets) => Some(assets),
        Err(err) => {
            warn!("scene model unavailable: {err:?}");
            None
        }
    };

    let event_loop = EventLoop::new()
        .context("failed to create event loop (no display? try --summary-only)")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(assets, fireflies);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.error.take() {
        return Err(err);
    }
    Ok(())
}

/// Everything pulled out of the archive that the renderer needs.
struct SceneAssets {
    graph: SceneGraph,
    meshes: HashMap<String, MeshData>,
    texture: BakedTexture,
}

fn load_scene_assets(archive: &PortalArchive) -> Result<SceneAssets> {
    let mut graph =
        SceneGraph::from_xml(archive.manifest_xml()).context("failed to parse scene manifest")?;
    assign_materials(&mut graph, &portal_assignments())
        .context("failed to bind scene materials")?;

    let mut meshes = HashMap::new();
    for node in &graph.nodes {
        let Some(mesh_name) = node.mesh.as_deref() else {
            continue;
        };
        if meshes.contains_key(mesh_name) {
            continue;
        }
        let bytes = archive
            .read_entry(mesh_name)
            .with_context(|| format!("unable to extract mesh {mesh_name}"))?;
        let text = String::from_utf8(bytes)
            .with_context(|| format!("mesh {mesh_name} is not valid UTF-8"))?;
        let mesh = decode_obj(&text).with_context(|| format!("failed to decode {mesh_name}"))?;
        meshes.insert(mesh_name.to_string(), mesh);
    }

    let texture_entry = graph.nodes.iter().find_map(|node| match &node.material {
        Some(Material::Baked { texture }) => Some(texture.clone()),
        _ => None,
    });
    let texture = match texture_entry {
        Some(entry) => {
            let bytes = archive
                .read_entry(&entry)
                .with_context(|| format!("unable to extract texture {entry}"))?;
            BakedTexture::decode(&bytes)
                .with_context(|| format!("failed to decode texture {entry}"))?
        }
        None => {
            warn!("no baked material in scene; using fallback texture");
            BakedTexture::fallback()
        }
    };

    Ok(SceneAssets {
        graph,
        meshes,
        texture,
    })
}

fn print_summary(graph: &SceneGraph, fireflies: &FireflyField) {
    println!("Loaded scene with {} nodes", graph.nodes.len());
    for node in &graph.nodes {
        let material = match &node.material {
            Some(Material::Baked { .. }) => "baked",
            Some(Material::Flat { .. }) => "flat",
            Some(Material::Portal) => "portal",
            None => "unassigned",
        };
        println!(" - {} ({material})", node.name);
    }
    println!("Fireflies: {} particles", fireflies.len());
}

struct App {
    assets: Option<SceneAssets>,
    fireflies: FireflyField,
    tweaks: TweakHandle,
    uniforms: SceneUniforms,
    controls: OrbitControls,
    viewport: Viewport,

    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    panel: Option<DebugPanel>,

    start: Instant,
    last_frame: Instant,
    dragging: bool,
    cursor: Option<(f64, f64)>,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(assets: Option<SceneAssets>, fireflies: FireflyField) -> Self {
        Self {
            assets,
            fireflies,
            tweaks: TweakHandle::new(),
            uniforms: SceneUniforms::default(),
            controls: OrbitControls::portal_default(),
            viewport: Viewport::default(),
            window: None,
            renderer: None,
            panel: None,
            start: Instant::now(),
            last_frame: Instant::now(),
            dragging: false,
            cursor: None,
            error: None,
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };

        let now = Instant::now();
        let elapsed = self.start.elapsed().as_secs_f32();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;

        let tweaks = self.tweaks.snapshot();
        self.uniforms.apply_tweaks(&tweaks);
        renderer.set_clear_color(tweaks.clear_color);

        advance_frame(elapsed, dt, &mut self.uniforms, &mut self.controls);

        let camera = self.controls.camera_params(self.viewport.aspect());
        renderer.update_uniforms(&camera, &self.uniforms, &self.viewport);

        let window = self.window.as_ref().expect("window outlives renderer");
        let result = match self.panel.as_mut() {
            Some(panel) => {
                let window = Arc::clone(window);
                let mut paint = move |device: &wgpu::Device,
                                      queue: &wgpu::Queue,
                                      encoder: &mut wgpu::CommandEncoder,
                                      view: &wgpu::TextureView,
                                      size: [u32; 2]| {
                    panel.paint(&window, device, queue, encoder, view, size);
                };
                renderer.render(Some(&mut paint))
            }
            None => renderer.render(None),
        };
        if let Err(err) = result {
            match err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    let size = renderer.window().inner_size();
                    renderer.resize(size);
                }
                wgpu::SurfaceError::OutOfMemory => {
                    return Err(anyhow!("GPU is out of memory"));
                }
                other => {
                    info!("surface error: {other:?}; retrying next frame");
                }
            }
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title("Portal Runtime")
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.error = Some(anyhow!(err).context("failed to create window"));
                event_loop.exit();
                return;
            }
        };

        let empty_graph = SceneGraph::default();
        let empty_meshes = HashMap::new();
        let fallback = BakedTexture::fallback();
        let (graph, meshes, texture) = match &self.assets {
            Some(assets) => (&assets.graph, &assets.meshes, &assets.texture),
            None => (&empty_graph, &empty_meshes, &fallback),
        };

        let renderer = match block_on(Renderer::new(
            Arc::clone(&window),
            graph,
            meshes,
            texture,
            &self.fireflies,
        )) {
            Ok(renderer) => renderer,
            Err(err) => {
                self.error = Some(err.context("failed to initialize renderer"));
                event_loop.exit();
                return;
            }
        };

        let panel = DebugPanel::new(
            &window,
            renderer.device(),
            renderer.surface_format(),
            self.tweaks.clone(),
        );

        let size = window.inner_size();
        self.viewport = Viewport::new(size.width, size.height, window.scale_factor());
        self.start = Instant::now();
        self.last_frame = self.start;

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.panel = Some(panel);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if id != window.id() {
            return;
        }

        let consumed = self
            .panel
            .as_mut()
            .map(|panel| panel.on_window_event(&window, &event))
            .unwrap_or(false);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.viewport.resize(size.width, size.height);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(size);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                // A Resized event with the new physical size follows.
                self.viewport.set_scale_factor(scale_factor);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = state == ElementState::Pressed && !consumed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                let last = self.cursor.replace((position.x, position.y));
                if self.dragging && !consumed {
                    if let Some((x, y)) = last {
                        self.controls.handle_drag(
                            (position.x - x) as f32,
                            (position.y - y) as f32,
                        );
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !consumed {
                    let amount = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(position) => position.y as f32 * 0.05,
                    };
                    self.controls.handle_scroll(amount);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.error = Some(err);
                    event_loop.exit();
                    return;
                }
                window.request_redraw();
            }
            _ => {}
        }
    }
}

struct CliOptions {
    path: String,
    summary_only: bool,
    seed: Option<u64>,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: portal-runtime <scene.portal> [--summary-only] [--seed N]"
            ));
        };
        let mut summary_only = false;
        let mut seed = None;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--seed" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--seed requires a value"))?;
                    seed = Some(
                        value
                            .parse::<u64>()
                            .with_context(|| format!("invalid seed: {value}"))?,
                    );
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --summary-only or --seed N"
                    ));
                }
            }
        }
        Ok(Self {
            path,
            summary_only,
            seed,
        })
    }
}
