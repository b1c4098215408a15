//! Immutable snapshot of the three reference tables

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::models::{
    LoadBreakerEntry, LoadRange, Location, PhaseType, PowerCeilingEntry, VoltageClass,
};
use crate::normalize::normalize;

/// Location, load schedule and ceiling schedule, in authored row order.
///
/// Built once at startup and only ever read. To refresh, build a new value
/// and replace the old one.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    locations: BTreeMap<String, Location>,
    load_schedule: Vec<LoadBreakerEntry>,
    power_ceilings: Vec<PowerCeilingEntry>,
}

/// Two schedule rows whose ranges intersect within one voltage / phase code set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlap {
    pub voltage: String,
    pub phase: PhaseType,
    pub first_row: usize,
    pub first_category: String,
    pub second_row: usize,
    pub second_category: String,
}

impl ReferenceTables {
    /// Duplicate location names (after normalization) keep their first row.
    pub fn new(
        locations: Vec<Location>,
        load_schedule: Vec<LoadBreakerEntry>,
        power_ceilings: Vec<PowerCeilingEntry>,
    ) -> Self {
        let mut by_name = BTreeMap::new();
        for location in locations {
            let key = normalize(&location.name);
            if by_name.contains_key(&key) {
                warn!(location = %location.name, "duplicate location, keeping first occurrence");
                continue;
            }
            by_name.insert(key, location);
        }

        ReferenceTables {
            locations: by_name,
            load_schedule,
            power_ceilings,
        }
    }

    /// Look up a location by name as typed by a user
    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.get(&normalize(name))
    }

    pub fn voltage_for(&self, name: &str) -> Option<&VoltageClass> {
        self.location(name).map(|l| &l.voltage)
    }

    /// Locations sorted by normalized name
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn load_schedule(&self) -> &[LoadBreakerEntry] {
        &self.load_schedule
    }

    pub fn power_ceilings(&self) -> &[PowerCeilingEntry] {
        &self.power_ceilings
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.load_schedule.is_empty() && self.power_ceilings.is_empty()
    }

    /// Schedule rows that apply to one voltage and connection type, with
    /// their row index, in authored order.
    pub fn schedule_for(
        &self,
        voltage: &VoltageClass,
        phase: PhaseType,
    ) -> impl Iterator<Item = (usize, &LoadBreakerEntry)> {
        self.load_schedule
            .iter()
            .enumerate()
            .filter(move |(_, e)| &e.voltage == voltage && phase.allows(&e.category))
    }

    /// Find schedule rows that would make category resolution depend on row
    /// order. Rows with the unset range are skipped.
    pub fn overlaps(&self) -> Vec<Overlap> {
        let mut voltages: Vec<&VoltageClass> = self.load_schedule.iter().map(|e| &e.voltage).collect();
        voltages.sort();
        voltages.dedup();

        let mut found = Vec::new();
        for voltage in voltages {
            for phase in PhaseType::ALL {
                let rows: Vec<(usize, &LoadBreakerEntry)> = self
                    .schedule_for(voltage, phase)
                    .filter(|(_, e)| !e.range.is_unset())
                    .collect();

                for (i, (row_a, a)) in rows.iter().enumerate() {
                    for (row_b, b) in &rows[i + 1..] {
                        if a.range.overlaps(&b.range) {
                            found.push(Overlap {
                                voltage: voltage.to_string(),
                                phase,
                                first_row: *row_a,
                                first_category: a.category.to_string(),
                                second_row: *row_b,
                                second_category: b.category.to_string(),
                            });
                        }
                    }
                }
            }
        }
        found
    }

    /// Load span covered by a voltage / phase combination, for guidance
    /// when nothing matched.
    pub fn covered_span(&self, voltage: &VoltageClass, phase: PhaseType) -> Option<LoadRange> {
        self.schedule_for(voltage, phase)
            .map(|(_, e)| e.range)
            .filter(|r| !r.is_unset())
            .reduce(|acc, r| LoadRange::new(acc.min.min(r.min), acc.max.max(r.max)))
    }
}
