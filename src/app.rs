use std::path::{Path, PathBuf};
use std::time;

use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};
use threadpool::ThreadPool;

use soft_renderer::config::{load_scene_config, ObjectConfig, SceneConfig};
use soft_renderer::{FrameBuffer, FrameStats, Pipeline, RenderError, Scene, ZBuffer};

/// Time step used when rendering without a window.
const HEADLESS_DT: f32 = 1.0 / 30.0;

pub struct Params {
    pub width: u32,
    pub height: u32,
    pub print_fps: bool,
    /// Mesh shown instead of the configured objects.
    pub asset_path: Option<PathBuf>,
    pub scene_path: Option<PathBuf>,
    /// Render without a window and save the last frame here.
    pub output: Option<PathBuf>,
    pub frames: u32,
    /// Transform threads, 0 renders on the main thread only.
    pub threads: usize,
    /// Show the z-buffer instead of the colors.
    pub depth_view: bool,
}

struct Renderer {
    scene: Scene,
    pipeline: Pipeline,
    pixels: FrameBuffer,
    zbuffer: ZBuffer,
    pool: Option<ThreadPool>,
}

impl Renderer {
    fn new(params: &Params, config: &SceneConfig) -> Result<Renderer, RenderError> {
        let pool = match params.threads {
            0 => None,
            n => Some(ThreadPool::new(n)),
        };
        return Ok(Renderer {
            scene: config.build(params.width, params.height)?,
            pipeline: Pipeline::new(config.pipeline),
            pixels: FrameBuffer::new(params.width, params.height),
            zbuffer: ZBuffer::new(params.width, params.height),
            pool,
        });
    }

    fn frame(&mut self, dt: f32) -> Result<FrameStats, RenderError> {
        self.scene.update(dt);
        return match &self.pool {
            Some(pool) => self.scene.render_parallel(pool, &mut self.pipeline, &mut self.pixels, &mut self.zbuffer),
            None => self.scene.render(&mut self.pipeline, &mut self.pixels, &mut self.zbuffer),
        };
    }
}

fn scene_config(params: &Params) -> Result<SceneConfig, RenderError> {
    let mut config = match &params.scene_path {
        Some(path) => load_scene_config(path)?,
        None => SceneConfig::default(),
    };
    if let Some(asset) = &params.asset_path {
        let mesh = asset
            .canonicalize()
            .map_err(|source| RenderError::Io { path: asset.clone(), source })?;
        config.objects = vec![ObjectConfig { mesh: Some(mesh), spin: [0.0, 0.6, 0.0], ..Default::default() }];
    }
    return Ok(config);
}

/// Helper, defining exit event to be an Escape key press.
fn is_exit_event(window_event: event::WindowEvent) -> bool {
    if let event::WindowEvent::KeyboardInput(event) = window_event {
        if event.input.key_code == Some(event::VirtualKeyCode::Escape) && event.input.state.is_released() {
            return true;
        }
    }

    return false;
}

fn run_headless(renderer: &mut Renderer, params: &Params, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut stats = FrameStats::default();
    for _ in 0..params.frames.max(1) {
        stats = renderer.frame(HEADLESS_DT)?;
    }
    if params.depth_view {
        renderer.zbuffer.to_depth_image().save(path)?;
    } else {
        renderer.pixels.save(path)?;
    }
    log::info!(
        "wrote '{}': {} facets, {} triangles, {} pixels in the last frame",
        path.display(),
        stats.facets_drawn,
        stats.triangles_rasterized,
        stats.pixels_written
    );
    return Ok(());
}

/// Actualy launches the window, showing images.
fn run_window(renderer: &mut Renderer, params: &Params) -> Result<(), Box<dyn std::error::Error>> {
    let window_options: WindowOptions = WindowOptions {
        size: Some([params.width, params.height]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let event_channel = window.event_channel()?;

    let mut exit = false;
    let mut last_frame = time::Instant::now();
    let mut frame_counter_time_begin = time::Instant::now();
    let mut frame_counter: u32 = 0;
    while !exit {
        let now = time::Instant::now();
        let dt = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;
        renderer.frame(dt)?;

        if params.depth_view {
            let depth = renderer.zbuffer.to_depth_image();
            let image_data = ImageView::new(ImageInfo::mono8(params.width, params.height), depth.as_raw());
            window.set_image("image", image_data)?;
        } else {
            let render_data = renderer.pixels.as_render_data();
            let image_data = ImageView::new(ImageInfo::rgb8(params.width, params.height), &render_data);
            window.set_image("image", image_data)?;
        }

        // Unloading all the garbage from event channel, that has piled up, looking for exit event.
        exit = event_channel
            .try_iter()
            .map(is_exit_event)
            .fold(false, |was_exit_event, is_exit_event| was_exit_event || is_exit_event);

        if params.print_fps {
            // Counting frames to log stats every second.
            frame_counter += 1;
            if time::Instant::now().duration_since(frame_counter_time_begin).as_secs_f32() > 1.0 {
                log::info!("FPS --- {}", frame_counter);
                frame_counter_time_begin = time::Instant::now();
                frame_counter = 0;
            }
        }
    }

    return Ok(());
}

/// Builds the scene and either opens a window or renders straight to a file.
pub fn run(params: Params) -> Result<(), Box<dyn std::error::Error>> {
    let config = scene_config(&params)?;
    let mut renderer = Renderer::new(&params, &config)?;
    return match &params.output {
        Some(path) => run_headless(&mut renderer, &params, path),
        None => run_window(&mut renderer, &params),
    };
}
