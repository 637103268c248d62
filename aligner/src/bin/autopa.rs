// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use canonical_error::{CanonicalError, failed_precondition_error};
use chrono::{DateTime, NaiveDateTime};
use clap::{Parser, ValueEnum};
use log::info;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry, EnvFilter};

use autopa_aligner::mover::{ActuatorLimits, AxisMover, DryRunMover,
                            ScriptMover, execute_moves, plan_moves};
use autopa_aligner::polar_analyzer::PolarAnalyzer;
use autopa_elements::astro_util::{format_dms, format_hms};
use autopa_elements::horizon_trait::{EquatorialCoordinates,
                                     HorizonTransformTrait, ObserverLocation};
use autopa_elements::horizon_transform::{
    ApparentHorizonTransform, Atmosphere, EarthOrientation, InputEpoch,
    TerrestrialHorizonTransform};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Frame {
    /// Star positions are celestial (RA/Dec).
    Celestial,
    /// Star positions are Earth-fixed; no sidereal rotation is applied.
    Terrestrial,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Epoch {
    /// Mean equator and equinox of J2000.0, as plate solvers report.
    J2000,
    /// True equator and equinox of the observing time.
    OfDate,
}

/// Computes polar alignment error from three plate solutions taken while
/// rotating the RA axis, then moves the AutoPA actuators to correct it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None,
          allow_negative_numbers = true, rename_all = "snake_case")]
struct Args {
    /// Observer latitude, degrees north.
    latitude: f64,

    /// Observer longitude, degrees east.
    longitude: f64,

    /// Observer elevation, meters.
    elevation: f64,

    /// Observing time (UTC), 'YYYY-MM-DD HH:MM:SS' or RFC 3339.
    #[arg(value_parser = parse_time)]
    time: SystemTime,

    /// First position right ascension, degrees.
    p1_ra: f64,
    /// First position declination, degrees.
    p1_dec: f64,
    /// Second position right ascension, degrees.
    p2_ra: f64,
    /// Second position declination, degrees.
    p2_dec: f64,
    /// Third position right ascension, degrees.
    p3_ra: f64,
    /// Third position declination, degrees.
    p3_dec: f64,

    /// Serial port of the AutoPA motor controller.
    #[arg(default_value = "/dev/ttyACM0")]
    serial_port: String,

    #[arg(long, value_enum, default_value_t = Frame::Celestial)]
    frame: Frame,

    #[arg(long, value_enum, default_value_t = Epoch::J2000)]
    epoch: Epoch,

    /// UT1-UTC, seconds.
    #[arg(long, default_value_t = 0.0)]
    dut1: f64,

    /// Apply refraction for a standard atmosphere at the observer's
    /// elevation.
    #[arg(long)]
    refraction: bool,

    /// Apply refraction for this air pressure, hPa.
    #[arg(long)]
    pressure: Option<f64>,

    /// Air temperature for refraction, Celsius.
    #[arg(long, default_value_t = 10.0)]
    temperature: f64,

    /// Script that moves an actuator.
    #[arg(long, default_value = "./altaz.py")]
    mover_script: PathBuf,

    /// Run the mover script directly instead of under sudo.
    #[arg(long)]
    no_sudo: bool,

    /// Report the moves without making them.
    #[arg(long)]
    dry_run: bool,

    /// Make out-of-range moves without asking.
    #[arg(long)]
    yes: bool,

    /// Directory for a daily rolling log file. No file log if omitted.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[arg(long, default_value = "autopa_log.txt")]
    log_file: String,
}

fn parse_time(arg: &str) -> Result<SystemTime, String> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(arg, "%Y-%m-%d %H:%M:%S") {
        return Ok(SystemTime::from(naive.and_utc()));
    }
    match DateTime::parse_from_rfc3339(arg) {
        Ok(dt) => Ok(SystemTime::from(dt)),
        Err(e) => Err(format!(
            "expected 'YYYY-MM-DD HH:MM:SS' (UTC) or RFC 3339, got {:?}: {}",
            arg, e)),
    }
}

// The returned guards must be held until exit so buffered log lines are
// flushed.
fn setup_logging(args: &Args) -> Result<Vec<WorkerGuard>, CanonicalError> {
    let mut guards = Vec::new();
    let (non_blocking_stderr, guard) = NonBlockingBuilder::default()
        .lossy(false)
        .finish(io::stderr());
    guards.push(guard);

    let file_layer = match &args.log_dir {
        Some(log_dir) => {
            let file_appender = match RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(&args.log_file)
                .max_log_files(10)
                .build(log_dir)
            {
                Ok(a) => a,
                Err(e) => {
                    return Err(failed_precondition_error(
                        format!("Could not log to {:?}: {:?}", log_dir, e)
                            .as_str()));
                }
            };
            let (non_blocking_file, guard) = NonBlockingBuilder::default()
                .lossy(false)
                .finish(file_appender);
            guards.push(guard);
            Some(fmt::layer().with_ansi(false).with_writer(non_blocking_file))
        },
        None => None,
    };
    registry()
        .with(EnvFilter::try_from_default_env()
              .unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(non_blocking_stderr))
        .with(file_layer)
        .init();
    Ok(guards)
}

fn make_transform(args: &Args)
                  -> Result<Box<dyn HorizonTransformTrait + Send + Sync>,
                            CanonicalError> {
    match args.frame {
        Frame::Terrestrial => Ok(Box::new(TerrestrialHorizonTransform)),
        Frame::Celestial => {
            let epoch = match args.epoch {
                Epoch::J2000 => InputEpoch::J2000,
                Epoch::OfDate => InputEpoch::OfDate,
            };
            let mut transform = ApparentHorizonTransform::new(
                EarthOrientation{dut1: args.dut1}, epoch)?;
            let atmosphere = match args.pressure {
                Some(pressure_hpa) => Some(Atmosphere{
                    pressure_hpa, temperature_celsius: args.temperature}),
                None if args.refraction => Some(Atmosphere::standard(
                    args.elevation, args.temperature)),
                None => None,
            };
            if let Some(atmosphere) = atmosphere {
                info!("Refraction for {:.1} hPa, {:.1}C",
                      atmosphere.pressure_hpa, atmosphere.temperature_celsius);
                transform = transform.with_refraction(atmosphere);
            }
            Ok(Box::new(transform))
        },
    }
}

// Asks on the terminal; anything but y/yes is a no.
fn ask_operator(description: &str) -> bool {
    print!("{}. Move anyway? (y/N): ", description);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn main() -> Result<(), CanonicalError> {
    let args = Args::parse();
    let _guards = setup_logging(&args)?;

    let location =
        ObserverLocation::new(args.latitude, args.longitude, args.elevation)?;
    let stars = [EquatorialCoordinates::new(args.p1_ra, args.p1_dec)?,
                 EquatorialCoordinates::new(args.p2_ra, args.p2_dec)?,
                 EquatorialCoordinates::new(args.p3_ra, args.p3_dec)?];
    let analyzer = PolarAnalyzer::new(make_transform(&args)?);
    let alignment =
        analyzer.compute_alignment_error(&location, &args.time, &stars)?;

    println!("Current pole: RA {} Dec {} ({:.2} arcmin from the pole)",
             format_hms(alignment.current_pole.ra),
             format_dms(alignment.current_pole.dec),
             alignment.separation_arcmin);
    println!("True pole:    Az {:.4} Alt {:.4}",
             alignment.true_pole_horizon.azimuth,
             alignment.true_pole_horizon.altitude);
    println!("Current pole: Az {:.4} Alt {:.4}",
             alignment.current_pole_horizon.azimuth,
             alignment.current_pole_horizon.altitude);
    println!("Azimuth error:  {:.4} arcmin", alignment.error.azimuth_arcmin);
    println!("Altitude error: {:.4} arcmin", alignment.error.altitude_arcmin);

    let moves = plan_moves(&alignment.error, &ActuatorLimits::default(),
                           &mut |description: &str| {
                               args.yes || ask_operator(description)
                           });
    if moves.is_empty() {
        info!("No moves to make");
        return Ok(());
    }
    let mut mover: Box<dyn AxisMover> = if args.dry_run {
        Box::new(DryRunMover)
    } else {
        Box::new(ScriptMover::new(args.mover_script.clone(),
                                  &args.serial_port, !args.no_sudo))
    };
    execute_moves(mover.as_mut(), &moves)?;
    info!("Alignment moves complete");
    Ok(())
}

// mod tests.
