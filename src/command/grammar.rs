//! Command grammar - turns a command body into a typed intent
//!
//! Rules are tried in a fixed order and the first match wins:
//! Hover > Circle > V-Formation > Surround > Reset. A body that matches no
//! rule becomes `Intent::Unrecognized`, which feeds code synthesis.
//!
//! Matching is case-insensitive; captured ids and numbers keep the text as
//! spoken.

use crate::core::error::{BridgeError, Result};
use regex::{Captures, Regex};

/// Structured interpretation of one command body
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Hover the listed drones, optionally for a duration and at a height
    Hover {
        /// Drone ids as spoken ("1, 2 and 3"), display only
        drones: String,
        /// Seconds as spoken, only when it reads as a whole number
        duration: Option<String>,
        /// Meters as spoken, only when it reads as a decimal number
        height: Option<String>,
    },
    /// Fly the circle demo
    Circle,
    /// V formation led by the given drone number
    VFormation { leader: String },
    /// Surround the given drone number
    Surround { target: String },
    /// Reset a single drone
    ResetOne { drone: String },
    /// Reset every drone in the drone config
    ResetAll,
    /// No rule matched; carries the body for code synthesis
    Unrecognized { body: String },
}

impl Intent {
    /// Short rule name used in logs
    pub fn rule_name(&self) -> &'static str {
        match self {
            Intent::Hover { .. } => "hover",
            Intent::Circle => "circle",
            Intent::VFormation { .. } => "v-formation",
            Intent::Surround { .. } => "surround",
            Intent::ResetOne { .. } | Intent::ResetAll => "reset",
            Intent::Unrecognized { .. } => "fallback",
        }
    }
}

const HOVER_PATTERN: &str = r"(?i)(?:make\s+)?drones?\s+(\d[\d,\s]*(?:and\s+\d+)?)\s+hover(?:\s+for\s+(\d+)\s+seconds?)?(?:\s+at\s+(?:a\s+)?height\s+(?:of\s+)?([\d.]+)\s+meters?)?";
const CIRCLE_PATTERN: &str = r"(?i)fly in a circle";
const V_FORMATION_PATTERN: &str = r"(?i)v[\s-]formation\s+with\s+drone\s+(\d+)";
const SURROUND_PATTERN: &str = r"(?i)surround\s+drone\s+(\d+)";
const RESET_PATTERN: &str = r"(?i)reset(?:\s+all)?\s+drones?";
const RESET_ALL_PATTERN: &str = r"(?i)\ball\b";
const DRONE_ID_PATTERN: &str = r"(?i)drone\s+(\d+)";

/// Compiled command grammar
#[derive(Debug, Clone)]
pub struct Grammar {
    hover: Regex,
    circle: Regex,
    v_formation: Regex,
    surround: Regex,
    reset: Regex,
    reset_all: Regex,
    drone_id: Regex,
}

impl Grammar {
    pub fn new() -> Result<Self> {
        Ok(Self {
            hover: Regex::new(HOVER_PATTERN)?,
            circle: Regex::new(CIRCLE_PATTERN)?,
            v_formation: Regex::new(V_FORMATION_PATTERN)?,
            surround: Regex::new(SURROUND_PATTERN)?,
            reset: Regex::new(RESET_PATTERN)?,
            reset_all: Regex::new(RESET_ALL_PATTERN)?,
            drone_id: Regex::new(DRONE_ID_PATTERN)?,
        })
    }

    /// Match a command body against the grammar
    ///
    /// Only a reset that names neither "all" nor a drone number is an
    /// error; everything else yields an intent.
    pub fn parse(&self, body: &str) -> Result<Intent> {
        if let Some(caps) = self.hover.captures(body) {
            return Ok(Intent::Hover {
                drones: capture(&caps, 1).unwrap_or_default().trim().to_string(),
                duration: capture(&caps, 2)
                    .filter(|d| d.parse::<u32>().is_ok())
                    .map(str::to_string),
                height: capture(&caps, 3)
                    .filter(|h| h.parse::<f64>().is_ok())
                    .map(str::to_string),
            });
        }

        if self.circle.is_match(body) {
            return Ok(Intent::Circle);
        }

        if let Some(leader) = self.v_formation.captures(body).and_then(|c| capture(&c, 1)) {
            return Ok(Intent::VFormation {
                leader: leader.to_string(),
            });
        }

        if let Some(target) = self.surround.captures(body).and_then(|c| capture(&c, 1)) {
            return Ok(Intent::Surround {
                target: target.to_string(),
            });
        }

        if self.reset.is_match(body) {
            if self.reset_all.is_match(body) {
                return Ok(Intent::ResetAll);
            }
            return match self.drone_id.captures(body).and_then(|c| capture(&c, 1)) {
                Some(drone) => Ok(Intent::ResetOne {
                    drone: drone.to_string(),
                }),
                None => Err(BridgeError::MalformedCommand(format!(
                    "reset needs \"all\" or a drone number: \"{}\"",
                    body
                ))),
            };
        }

        Ok(Intent::Unrecognized {
            body: body.to_string(),
        })
    }
}

fn capture<'h>(caps: &Captures<'h>, group: usize) -> Option<&'h str> {
    caps.get(group).map(|m| m.as_str())
}
