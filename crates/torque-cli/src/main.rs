//! `torque-cli` – Torque Command Line Interface
//!
//! Runs the standard mecanum robot against the in-process simulation:
//!
//! 1. Loads `~/.torque/config.toml` (or `--config <path>`); falls back to
//!    defaults when the file is absent.
//! 2. Builds the robot on [`SimHardware`] and runs the chosen routine
//!    (`navigate` or `square`) one control tick at a time.
//! 3. Intercepts **Ctrl-C** and emergency-stops the robot before exiting.
//!
//! `torque init` writes the default configuration so it can be edited.

mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use torque_hal::{ManualClock, SimHardware, SimPlant};
use torque_kernel::{ControlMode, LogSink};
use torque_runtime::{CourseProgress, CourseRunner, Robot, SquarePathTiming};
use torque_types::{Gamepads, Pose};

use config::Config;

#[derive(Parser)]
#[command(name = "torque", author, version)]
#[command(about = "Run mecanum robot routines against the simulated base")]
struct Args {
    /// Config file (default: ~/.torque/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sleep one tick period between ticks instead of running flat out
    #[arg(long)]
    realtime: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive to a target pose, then through any extra waypoints
    Navigate {
        /// Target x (mm)
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        /// Target y (mm)
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
        /// Target heading (degrees)
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        heading: f64,
        /// Extra waypoint as `x,y[,heading]`; repeatable
        #[arg(long = "then", value_parser = parse_waypoint, allow_hyphen_values = true)]
        then: Vec<Pose>,
    },
    /// Timed open-loop square: forward, pause, turn right, pause, four times
    Square {
        /// Wheel power for the forward and turn segments
        #[arg(long, default_value = "0.5")]
        power: f64,
    },
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let _tracing = torque_runtime::init_tracing("torque");
    let args = Args::parse();

    print_banner();

    let path = args.config.clone().unwrap_or_else(config::config_path);

    let routine = match args.command {
        Command::Init { force } => std::process::exit(match init_config(&path, force) {
            Ok(()) => 0,
            Err(e) => {
                println!("{}: {}", "Config error".red(), e);
                1
            }
        }),
        Command::Navigate { x, y, heading, then } => {
            let mut waypoints = vec![Pose::new(x, y, heading)];
            waypoints.extend(then);
            Routine::Course(CourseRunner::new(waypoints))
        }
        Command::Square { power } => Routine::Square(SquarePathTiming {
            power,
            ..SquarePathTiming::default()
        }),
    };

    let cfg = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            println!(
                "  No config at {}; using defaults.  Run `{}` to create one.",
                path.display().to_string().dimmed(),
                "torque init".bold()
            );
            Config::default()
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            Config::default()
        }
    };

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – emergency stop …".yellow().bold());
        stop_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; emergency stop on Ctrl-C will not be available");
    }

    match run(&cfg, routine, args.realtime, &stop) {
        Ok(outcome) => print_outcome(&outcome),
        Err(e) => {
            println!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Control loop
// ─────────────────────────────────────────────────────────────────────────────

enum Routine {
    Course(CourseRunner),
    Square(SquarePathTiming),
}

#[derive(Debug, Clone, PartialEq)]
enum Ending {
    Finished,
    Aborted,
    TickLimit,
    Interrupted,
}

#[derive(Debug, Clone, PartialEq)]
struct Outcome {
    ending: Ending,
    ticks: u64,
    pose: Pose,
}

/// Build the simulated robot and tick it until the routine ends.
fn run(
    cfg: &Config,
    routine: Routine,
    realtime: bool,
    stop: &AtomicBool,
) -> Result<Outcome, String> {
    let settings = cfg.robot_settings();
    let plant = SimPlant::new(cfg.plant_config());
    let mut hardware = SimHardware::builder(&plant)
        .with_mecanum_base(settings.drive.motor_names())
        .with_odometry(settings.odometry_device.clone())
        .build();
    let clock = ManualClock::new();
    let mut robot = Robot::build(settings, &mut hardware, clock.clone(), Box::new(LogSink))
        .map_err(|e| format!("startup failed: {e}"))?;

    let mut course = match routine {
        Routine::Course(runner) => {
            robot.orchestrator_mut().set_mode(ControlMode::Autonomous);
            Some(runner)
        }
        Routine::Square(timing) => {
            robot
                .start_square_path(timing)
                .map_err(|e| format!("square path unavailable: {e}"))?;
            None
        }
    };

    let period = cfg.tick_period();
    let pads = Gamepads::default();
    let mut ending = Ending::TickLimit;

    for _ in 0..cfg.max_ticks {
        if stop.load(Ordering::SeqCst) {
            robot.emergency_stop("operator Ctrl-C");
            ending = Ending::Interrupted;
            break;
        }

        if let Some(runner) = course.as_mut() {
            let nav = robot
                .navigation_mut()
                .ok_or_else(|| "navigation is not registered".to_string())?;
            match runner.poll(nav) {
                CourseProgress::Waypoint(_) => {}
                CourseProgress::Finished => {
                    ending = Ending::Finished;
                    break;
                }
                CourseProgress::Aborted => {
                    ending = Ending::Aborted;
                    break;
                }
            }
        } else if robot.square_path().is_some_and(|p| p.is_finished()) {
            ending = Ending::Finished;
            break;
        }

        clock.advance(period);
        robot.tick(&pads).map_err(|e| e.to_string())?;
        if realtime {
            std::thread::sleep(period);
        }
    }

    let ticks = robot.orchestrator().tick_count();
    let pose = robot.pose();
    robot.shutdown();
    info!(ticks, ending = ?ending, "run complete");
    Ok(Outcome {
        ending,
        ticks,
        pose,
    })
}

fn init_config(path: &std::path::Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    config::save_to(&Config::default(), path)?;
    println!(
        "\n  {} Config saved to {}\n",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_outcome(outcome: &Outcome) {
    let label = match outcome.ending {
        Ending::Finished => "finished".green().bold(),
        Ending::Aborted => "aborted".yellow().bold(),
        Ending::TickLimit => "tick limit reached".yellow().bold(),
        Ending::Interrupted => "emergency stopped".red().bold(),
    };
    println!();
    println!("  Routine {} after {} ticks", label, outcome.ticks);
    println!(
        "  Final pose: x = {:.1} mm, y = {:.1} mm, heading = {:.1}°",
        outcome.pose.x(),
        outcome.pose.y(),
        outcome.pose.heading()
    );
    println!();
}

fn print_banner() {
    println!();
    println!("{}", r#"  ______                         "#.bold().cyan());
    println!("{}", r#" /_  __/__  ________ ___ _____ "#.bold().cyan());
    println!("{}", r#"  / / / _ \/ __/ _ `/ // / -_)"#.bold().cyan());
    println!("{}", r#" /_/  \___/_/  \_, /\_,_/\__/ "#.bold().cyan());
    println!("{}", r#"                /_/           "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Torque".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Mecanum Robot Control Framework");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Parse `x,y` or `x,y,heading`.
fn parse_waypoint(raw: &str) -> Result<Pose, String> {
    fn num(s: &str) -> Result<f64, String> {
        s.parse::<f64>().map_err(|_| format!("'{s}' is not a number"))
    }

    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [x, y] => Ok(Pose::new(num(x)?, num(y)?, 0.0)),
        [x, y, h] => Ok(Pose::new(num(x)?, num(y)?, num(h)?)),
        _ => Err(format!("expected x,y[,heading], got '{raw}'")),
    }
}
