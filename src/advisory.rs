//! Utility business rules checked by the caller before quoting a system.
//!
//! These do not feed into category resolution. The resolver answers from the
//! reference data alone; an advisory only tells the user the answer may not
//! be installable as requested.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::models::{PhaseType, VoltageClass};

/// Voltage classes where a grid-tied inverter needs at least two phases
const MIN_DUAL_PHASE_VOLTAGES: &[&str] = &["220/127"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// The requested connection is below what the inverter needs at this voltage
    MinimumPhase {
        voltage: VoltageClass,
        requested: PhaseType,
        required: PhaseType,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::MinimumPhase {
                voltage,
                requested,
                required,
            } => write!(
                f,
                "solar inverter requires at least a {} connection at {} V (requested {})",
                required, voltage, requested
            ),
        }
    }
}

pub fn phase_advisories(voltage: &VoltageClass, phase: PhaseType) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    if phase == PhaseType::Single && MIN_DUAL_PHASE_VOLTAGES.iter().any(|v| voltage.as_str().contains(v)) {
        let advisory = Advisory::MinimumPhase {
            voltage: voltage.clone(),
            requested: phase,
            required: PhaseType::Dual,
        };
        warn!("{}", advisory);
        advisories.push(advisory);
    }

    advisories
}
