//! vexsim CLI - headless robot simulator
//!
//! Runs a simulation session from a config file and an input script,
//! optionally dumping every render frame as JSON lines.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vexsim::physics::ActorKind;
use vexsim::robot::{wheel_layout, MAX_HELD};
use vexsim::{InputSnapshot, NullRenderer, Renderer, Session, SimConfig};

mod dump;
mod script;

use dump::JsonLinesRenderer;
use script::Script;

#[derive(Parser)]
#[command(name = "vexsim")]
#[command(about = "Headless wheeled-robot simulator", long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation session
    Run {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// JSON input script
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Number of frames to run (default: until the script ends, or 600)
        #[arg(short, long)]
        frames: Option<u64>,
        /// Real time per frame in seconds
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f32,
        /// Write render frames as JSON lines to this file
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show robot layout and collision filter table
    Info {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            script,
            frames,
            dt,
            dump,
        } => {
            run(config.as_deref(), script.as_deref(), frames, dt, dump.as_deref())?;
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
        }
        Commands::Info { config } => {
            show_info(&load_config(config.as_deref())?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let config = match path {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SimConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn run(
    config: Option<&Path>,
    script: Option<&Path>,
    frames: Option<u64>,
    dt: f32,
    dump: Option<&Path>,
) -> Result<()> {
    if !(dt.is_finite() && dt >= 0.0) {
        anyhow::bail!("Frame time must be a non-negative number, got {}", dt);
    }

    let config = load_config(config)?;
    let script = match script {
        Some(path) => Script::load(path)?,
        None => Script::default(),
    };
    let frames = frames.unwrap_or_else(|| script.last_frame().map_or(600, |last| last + 1));

    let mut session = Session::new(config)?;
    let mut player = script.player();

    match dump {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut renderer = JsonLinesRenderer::new(BufWriter::new(file));
            drive(&mut session, frames, dt, |frame| player.input(frame), &mut renderer);
            renderer
                .finish()
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} frames to {}", frames, path.display());
        }
        None => drive(&mut session, frames, dt, |frame| player.input(frame), &mut NullRenderer),
    }

    println!("{}", serde_json::to_string_pretty(&session.stats())?);
    Ok(())
}

fn drive(
    session: &mut Session,
    frames: u64,
    dt: f32,
    mut input: impl FnMut(u64) -> InputSnapshot,
    renderer: &mut dyn Renderer,
) {
    for frame in 0..frames {
        let outcome = session.frame(&input(frame), dt, renderer);
        if outcome.intaken.is_some() || outcome.ejected.is_some() || !outcome.spawned.is_empty() {
            tracing::debug!(frame, ?outcome, "frame events");
        }
    }
}

fn show_info(config: &SimConfig) {
    let drivetrain = &config.drivetrain;
    println!("Robot:");
    println!(
        "  Chassis:    {:.3} x {:.3} m, half height {:.3} m",
        drivetrain.width, drivetrain.length, drivetrain.chassis_half_height
    );
    println!(
        "  Wheels:     radius {:.3} m, max {:.1} rad/s, torque limit {:.1}",
        drivetrain.wheel_radius, drivetrain.max_wheel_speed, drivetrain.drive_torque
    );
    for (i, mount) in wheel_layout(drivetrain).iter().enumerate() {
        println!(
            "    [{}] {:<5} ({:+.3}, {:+.3}, {:+.3})",
            i,
            format!("{:?}", mount.side),
            mount.offset.x,
            mount.offset.y,
            mount.offset.z
        );
    }

    let manipulator = &config.manipulator;
    println!();
    println!("Manipulator:");
    println!("  Capacity:   {} (max {})", manipulator.capacity, MAX_HELD);
    println!("  Intake:     within {:.3} m of front point (inclusive)", manipulator.intake_range);
    println!(
        "  Eject:      {:.3} m past front face at {:.2} m/s",
        manipulator.eject_clearance, manipulator.eject_speed
    );

    println!();
    println!("Collision filters:");
    for kind in ActorKind::ALL {
        println!("  {:<9} collides with {:?}", format!("{:?}", kind), kind.filter().mask);
    }

    println!();
    println!(
        "Physics:      step {:.5} s, gravity {:?}",
        config.physics.timestep, config.physics.gravity
    );
}
