use clap::Parser;
use lumen::demos::{self, RenderConfig, ScenePreset};
use lumen::world::World;
use lumen::{output, viewer};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

/// lumen — a progressive path tracer for your terminal
#[derive(Parser, Debug)]
#[command(
    name = "lumen",
    version,
    about = "Progressive Monte Carlo path tracing with live terminal display",
    long_about = "Renders physically-motivated 3D scenes by progressive Monte Carlo \
                  path tracing. Batch mode accumulates a fixed number of passes and \
                  writes an image; interactive mode displays every pass in the \
                  terminal and lets you fly the camera while the image converges.",
    after_help = "EXAMPLES:\n  \
                  lumen --scene spheres --passes 64 --output spheres.png\n  \
                  lumen --scene spheres --interactive\n  \
                  lumen --scene teapot --stl teapot.stl --threads 8 -W 240 -H 240\n  \
                  lumen --scene march --march-data fluid.bin --march-t-min 1.1"
)]
struct Cli {
    /// Scene preset to render
    #[arg(short, long, value_enum, default_value_t = ScenePreset::Spheres)]
    scene: ScenePreset,

    /// Framebuffer width in pixels
    #[arg(short = 'W', long, default_value_t = 160)]
    width: usize,

    /// Framebuffer height in pixels (interactive mode shows two pixels
    /// per terminal row)
    #[arg(short = 'H', long, default_value_t = 160)]
    height: usize,

    /// Worker thread count
    #[arg(short, long, default_value_t = 4)]
    threads: usize,

    /// Passes to accumulate in batch mode
    #[arg(short, long, default_value_t = 16)]
    passes: u32,

    /// Primary rays per pixel per pass
    #[arg(long, default_value_t = 4)]
    shoot: u32,

    /// Recursion budget — mirror/refraction bounces cost 0.3, diffuse 1.0
    #[arg(long, default_value_t = 3.0)]
    max_bounce: f32,

    /// Master seed for the per-thread random streams; omitted means a
    /// fresh one (reruns with the same seed reproduce the same frame)
    #[arg(long)]
    seed: Option<u64>,

    /// Write the final frame here; `.ppm` selects PPM, anything else PNG
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fly the camera live in the terminal instead of batch rendering
    #[arg(short, long)]
    interactive: bool,

    /// Binary STL mesh for the teapot scene
    #[arg(long)]
    stl: Option<PathBuf>,

    /// Marching-cubes stream for the march scene
    #[arg(long)]
    march_data: Option<PathBuf>,

    /// Skip marching-cubes frames before this simulation time
    #[arg(long, default_value_t = 1.1)]
    march_t_min: f32,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let seed = cli.seed.unwrap_or_else(rand::random);
    let config = RenderConfig {
        width: cli.width,
        height: cli.height,
        threads: cli.threads,
        seed,
        shoot_count: cli.shoot,
        max_bounce: cli.max_bounce,
    };
    log::info!("seed {seed}");

    let result = match cli.scene {
        ScenePreset::Spheres => demos::spheres(&config, |world| drive(world, &cli)),
        ScenePreset::Teapot => {
            let Some(stl) = cli.stl.as_deref() else {
                eprintln!("error: --scene teapot requires --stl <FILE>");
                return ExitCode::FAILURE;
            };
            match demos::teapot(&config, stl, |world| drive(world, &cli)) {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        ScenePreset::March => {
            let Some(data) = cli.march_data.as_deref() else {
                eprintln!("error: --scene march requires --march-data <FILE>");
                return ExitCode::FAILURE;
            };
            match demos::march(&config, data, cli.march_t_min, |world| drive(world, &cli)) {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn drive(world: &mut World<'_>, cli: &Cli) -> io::Result<()> {
    if cli.interactive {
        viewer::run(world, cli.output.as_deref())
    } else {
        batch(world, cli)
    }
}

fn batch(world: &mut World<'_>, cli: &Cli) -> io::Result<()> {
    eprintln!(
        "  {:?}: {}x{} pixels, {} threads, {} rays/pixel/pass",
        cli.scene,
        world.width(),
        world.height(),
        world.thread_count(),
        world.shoot_count,
    );

    let start = Instant::now();
    for pass in 1..=cli.passes {
        world.render();
        world.rebalance();
        eprint!(
            "\r  pass {pass:>3}/{} ({:.1}s)  ",
            cli.passes,
            start.elapsed().as_secs_f32()
        );
    }
    eprintln!();

    if let Some(path) = &cli.output {
        if path.extension().is_some_and(|ext| ext == "ppm") {
            output::save_ppm(world, path)?;
        } else {
            output::save_png(world, path).map_err(io::Error::other)?;
        }
        eprintln!("  saved {}", path.display());
    }
    Ok(())
}

fn init_logging(cli: &Cli) {
    // The interactive viewer owns the terminal; keep the logger quiet there
    // unless verbosity was asked for explicitly.
    let level = if cli.interactive && cli.verbose == 0 {
        LevelFilter::Off
    } else {
        match cli.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}
