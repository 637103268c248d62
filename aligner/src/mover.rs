// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

// Drives the AutoPA azimuth/altitude actuators to remove a measured polar
// alignment error. The actuators are moved by an external script (which
// talks to the motor controller over a serial port), one axis per
// invocation.

use std::path::PathBuf;
use std::process::Command;

use canonical_error::{CanonicalError, failed_precondition_error};
use log::{info, warn};

use crate::polar_analyzer::AlignmentError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Axis {
    Azimuth,
    Altitude,
}

impl Axis {
    // Axis name as understood by the mover script.
    pub fn script_name(&self) -> &'static str {
        match self {
            Axis::Azimuth => "az",
            Axis::Altitude => "alt",
        }
    }
}

// Travel available to the actuators from their centered position,
// arcminutes. Moves beyond these need the operator's go-ahead.
#[derive(Debug, Clone, Copy)]
pub struct ActuatorLimits {
    pub azimuth_arcmin: f64,  // +/-
    pub altitude_min_arcmin: f64,
    pub altitude_max_arcmin: f64,
}

impl Default for ActuatorLimits {
    fn default() -> Self {
        ActuatorLimits{
            azimuth_arcmin: 120.0,
            altitude_min_arcmin: -432.0,
            altitude_max_arcmin: 168.0,
        }
    }
}

impl ActuatorLimits {
    pub fn within(&self, axis: Axis, arcmin: f64) -> bool {
        match axis {
            Axis::Azimuth => arcmin.abs() <= self.azimuth_arcmin,
            Axis::Altitude => arcmin >= self.altitude_min_arcmin &&
                arcmin <= self.altitude_max_arcmin,
        }
    }
}

// Decides which moves to make for `error`. An axis with no error is
// skipped. A move outside `limits` is included only if `confirm` (given a
// description of the problem) returns true.
pub fn plan_moves(error: &AlignmentError,
                  limits: &ActuatorLimits,
                  confirm: &mut dyn FnMut(&str) -> bool) -> Vec<(Axis, f64)> {
    let mut moves = Vec::with_capacity(2);
    for (axis, arcmin) in [(Axis::Azimuth, error.azimuth_arcmin),
                           (Axis::Altitude, error.altitude_arcmin)] {
        if arcmin == 0.0 {
            continue;
        }
        if !limits.within(axis, arcmin) {
            let description = format!(
                "{} move of {:.2} arcmin is beyond the actuator's range",
                axis.script_name(), arcmin);
            warn!("{}", description);
            if !confirm(&description) {
                info!("Skipping {} move", axis.script_name());
                continue;
            }
        }
        moves.push((axis, arcmin));
    }
    moves
}

pub trait AxisMover {
    // Returns once the move has completed.
    fn move_axis(&mut self, axis: Axis, arcmin: f64)
                 -> Result<(), CanonicalError>;
}

// Performs the moves in order, stopping at the first failure.
pub fn execute_moves(mover: &mut dyn AxisMover, moves: &[(Axis, f64)])
                     -> Result<(), CanonicalError> {
    for (axis, arcmin) in moves {
        mover.move_axis(*axis, *arcmin)?;
    }
    Ok(())
}

// Runs `<script> <az|alt> <arcmin> <serial_port>`, optionally under sudo
// (the serial device is usually root owned).
#[derive(Debug, Clone)]
pub struct ScriptMover {
    script: PathBuf,
    serial_port: String,
    use_sudo: bool,
}

impl ScriptMover {
    pub fn new(script: PathBuf, serial_port: &str, use_sudo: bool) -> Self {
        ScriptMover{script, serial_port: serial_port.to_string(), use_sudo}
    }

    fn command(&self, axis: Axis, arcmin: f64) -> Command {
        let mut command = if self.use_sudo {
            let mut sudo = Command::new("sudo");
            sudo.arg(&self.script);
            sudo
        } else {
            Command::new(&self.script)
        };
        command.arg(axis.script_name())
            .arg(format!("{}", arcmin))
            .arg(&self.serial_port);
        command
    }
}

impl AxisMover for ScriptMover {
    fn move_axis(&mut self, axis: Axis, arcmin: f64)
                 -> Result<(), CanonicalError> {
        info!("Moving {} by {:.3} arcmin via {:?}",
              axis.script_name(), arcmin, self.script);
        let output = match self.command(axis, arcmin).output() {
            Ok(o) => o,
            Err(e) => {
                return Err(failed_precondition_error(
                    format!("Could not run {:?}: {:?}", self.script, e).as_str()));
            }
        };
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!("{}: {}", axis.script_name(), line);
        }
        if !output.status.success() {
            let error_str = String::from_utf8_lossy(&output.stderr);
            warn!("{} move failed: {}", axis.script_name(), error_str);
            return Err(failed_precondition_error(
                format!("{:?} {} error ({}): {:?}", self.script,
                        axis.script_name(), output.status, error_str).as_str()));
        }
        Ok(())
    }
}

// Logs the moves instead of making them.
#[derive(Debug, Default)]
pub struct DryRunMover;

impl AxisMover for DryRunMover {
    fn move_axis(&mut self, axis: Axis, arcmin: f64)
                 -> Result<(), CanonicalError> {
        info!("Dry run: would move {} by {:.3} arcmin",
              axis.script_name(), arcmin);
        Ok(())
    }
}

// mod tests.
