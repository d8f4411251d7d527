mod app;

use std::env;
use std::path::PathBuf;

const WIDTH: u32  = 800;
const HEIGHT: u32 = 800;

fn flag_value<T: std::str::FromStr>(args: &[String], i: usize) -> Result<T, Box<dyn std::error::Error>> {
    let raw = args.get(i + 1).ok_or_else(|| format!("missing value after {}", args[i]))?;
    return raw.parse::<T>().map_err(|_| format!("bad value '{}' for {}", raw, args[i]).into());
}

#[show_image::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Default values.
    let mut params = app::Params {
        width: WIDTH,
        height: HEIGHT,
        print_fps: false,
        asset_path: None,
        scene_path: None,
        output: None,
        frames: 1,
        threads: 0,
        depth_view: false,
    };

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-p" => { params.asset_path = Some(flag_value::<PathBuf>(&args, i)?); i += 1; }
            "-c" => { params.scene_path = Some(flag_value::<PathBuf>(&args, i)?); i += 1; }
            "-o" => { params.output = Some(flag_value::<PathBuf>(&args, i)?); i += 1; }
            "-n" => { params.frames = flag_value(&args, i)?; i += 1; }
            "-t" => { params.threads = flag_value(&args, i)?; i += 1; }
            "-w" => { params.width = flag_value(&args, i)?; i += 1; }
            "-h" => { params.height = flag_value(&args, i)?; i += 1; }
            "-f" => { params.print_fps = true; }
            "-d" => { params.depth_view = true; }
            other => { log::warn!("ignoring unknown argument '{}'", other); }
        }
        i += 1;
    }

    app::run(params)?;

    return Ok(());
}
