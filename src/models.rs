//! Data models for grid connection reference data and resolution results

use std::fmt;

use serde::Serialize;

use crate::normalize::normalize;

/// Canonical grid voltage tier, e.g. `220/127`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VoltageClass(String);

impl VoltageClass {
    /// `"220 / 127 "` and `"220/127"` produce the same class.
    pub fn new(raw: &str) -> Self {
        VoltageClass(normalize(raw).replace("_/", "/").replace("/_", "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoltageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Regulatory equipment tier such as `M1` or `T3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryCode(String);

impl CategoryCode {
    pub fn new(raw: &str) -> Self {
        CategoryCode(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_uppercase())
    }
}

/// Connection configuration declared by the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    #[value(aliases = ["mono", "monofasico"])]
    Single,
    #[value(aliases = ["bi", "bifasico"])]
    Dual,
    #[value(aliases = ["tri", "trifasico"])]
    Triple,
}

const SINGLE_PHASE_CODES: &[&str] = &["m1", "m2", "m3"];
const DUAL_PHASE_CODES: &[&str] = &["b1", "b2", "b3"];
const TRIPLE_PHASE_CODES: &[&str] = &["t1", "t2", "t3", "t4", "t5", "t6"];

impl PhaseType {
    pub const ALL: [PhaseType; 3] = [PhaseType::Single, PhaseType::Dual, PhaseType::Triple];

    /// Normalized category codes reachable by this connection type.
    /// The three sets are disjoint.
    pub fn codes(self) -> &'static [&'static str] {
        match self {
            PhaseType::Single => SINGLE_PHASE_CODES,
            PhaseType::Dual => DUAL_PHASE_CODES,
            PhaseType::Triple => TRIPLE_PHASE_CODES,
        }
    }

    pub fn allows(self, code: &CategoryCode) -> bool {
        self.codes().contains(&code.as_str())
    }

    /// The phase type whose code set contains `code`, if any
    pub fn for_code(code: &CategoryCode) -> Option<PhaseType> {
        Self::ALL.into_iter().find(|phase| phase.allows(code))
    }
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PhaseType::Single => "single-phase",
            PhaseType::Dual => "two-phase",
            PhaseType::Triple => "three-phase",
        };
        f.write_str(label)
    }
}

/// Closed load interval in kW. `(0, 0)` is the "no usable range" sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadRange {
    pub min: f64,
    pub max: f64,
}

impl LoadRange {
    pub const UNSET: LoadRange = LoadRange { min: 0.0, max: 0.0 };

    pub fn new(min: f64, max: f64) -> Self {
        LoadRange { min, max }
    }

    /// Inclusive on both ends
    pub fn contains(&self, load: f64) -> bool {
        self.min <= load && load <= self.max
    }

    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    pub fn overlaps(&self, other: &LoadRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl fmt::Display for LoadRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            write!(f, "-")
        } else {
            write!(f, "{}-{} kW", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Location {
    pub name: String,
    pub voltage: VoltageClass,
}

/// One row of the load -> category schedule
#[derive(Debug, Clone)]
pub struct LoadBreakerEntry {
    pub voltage: VoltageClass,
    pub category: CategoryCode,
    pub range: LoadRange,
    pub breaker: String,
}

/// One row of the category -> generation ceiling schedule
#[derive(Debug, Clone)]
pub struct PowerCeilingEntry {
    pub voltage: VoltageClass,
    pub category: CategoryCode,
    pub max_power_kwp: Option<f64>, // None = no defined ceiling
}

/// Maximum generation power for a category
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "kwp", rename_all = "lowercase")]
pub enum PowerLimit {
    Limited(f64),
    Unbounded,
}

impl PowerLimit {
    pub fn kwp(&self) -> Option<f64> {
        match self {
            PowerLimit::Limited(v) => Some(*v),
            PowerLimit::Unbounded => None,
        }
    }
}

impl From<Option<f64>> for PowerLimit {
    fn from(value: Option<f64>) -> Self {
        value.map_or(PowerLimit::Unbounded, PowerLimit::Limited)
    }
}

impl fmt::Display for PowerLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerLimit::Limited(v) => write!(f, "{} kWp", v),
            PowerLimit::Unbounded => write!(f, "no defined ceiling"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KitVerdict {
    Approved,
    Rejected,
}

impl fmt::Display for KitVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KitVerdict::Approved => write!(f, "approved"),
            KitVerdict::Rejected => write!(f, "rejected"),
        }
    }
}

/// Result of resolving a (voltage, phase, load) triple.
/// `category == None` means no schedule row matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    pub category: Option<CategoryCode>,
    pub breaker: Option<String>,
    pub limit: PowerLimit,
}
