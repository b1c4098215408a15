//! Category, breaker and generation ceiling resolution

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::advisory::{self, Advisory};
use crate::models::{
    CategoryCode, KitVerdict, LoadBreakerEntry, PhaseType, PowerLimit, ResolutionResult,
    VoltageClass,
};
use crate::tables::ReferenceTables;

/// Find the schedule row for a load at a voltage and connection type.
///
/// Rows are restricted to the voltage and to the category codes reachable by
/// `phase`; the first row in authored order whose range contains `load`
/// (both bounds inclusive) wins. `None` means no category applies.
pub fn resolve_category<'a>(
    tables: &'a ReferenceTables,
    voltage: &VoltageClass,
    phase: PhaseType,
    load_kw: f64,
) -> Option<&'a LoadBreakerEntry> {
    let found = tables
        .schedule_for(voltage, phase)
        .find(|(_, e)| e.range.contains(load_kw))
        .map(|(_, e)| e);

    debug!(
        voltage = %voltage,
        phase = %phase,
        load_kw,
        category = ?found.map(|e| e.category.as_str()),
        "category lookup"
    );
    found
}

/// Generation ceiling for a category. A missing ceiling row, or one whose
/// power cell had no value, is unbounded.
pub fn limit_for(
    tables: &ReferenceTables,
    voltage: &VoltageClass,
    category: &CategoryCode,
) -> PowerLimit {
    tables
        .power_ceilings()
        .iter()
        .find(|e| &e.voltage == voltage && &e.category == category)
        .and_then(|e| e.max_power_kwp)
        .into()
}

/// Equality passes; only a defined ceiling can reject a kit.
pub fn validate_kit(kit_power_kwp: f64, limit: PowerLimit) -> KitVerdict {
    match limit {
        PowerLimit::Limited(max) if kit_power_kwp > max => KitVerdict::Rejected,
        _ => KitVerdict::Approved,
    }
}

/// Category, breaker and ceiling for one installation
pub fn resolve(
    tables: &ReferenceTables,
    voltage: &VoltageClass,
    phase: PhaseType,
    load_kw: f64,
) -> ResolutionResult {
    match resolve_category(tables, voltage, phase, load_kw) {
        Some(entry) => ResolutionResult {
            category: Some(entry.category.clone()),
            breaker: Some(entry.breaker.clone()),
            limit: limit_for(tables, voltage, &entry.category),
        },
        None => ResolutionResult {
            category: None,
            breaker: None,
            limit: PowerLimit::Unbounded,
        },
    }
}

/// Caller-supplied inputs for one proposed installation
#[derive(Debug, Clone)]
pub struct ProjectRequest {
    pub client: Option<String>,
    pub location: String,
    pub phase: PhaseType,
    pub installed_load_kw: f64,
    /// Zero means no kit was proposed
    pub kit_power_kwp: f64,
}

/// Everything a report renderer needs: the inputs echoed back plus results
#[derive(Debug, Clone, Serialize)]
pub struct ProjectReport {
    pub client: Option<String>,
    pub location: String,
    pub voltage: VoltageClass,
    pub phase: PhaseType,
    pub installed_load_kw: f64,
    pub kit_power_kwp: Option<f64>,
    pub result: ResolutionResult,
    pub verdict: Option<KitVerdict>,
    pub advisories: Vec<Advisory>,
}

impl ProjectReport {
    /// Returns `None` when the location is unknown.
    ///
    /// Without a kit the verdict is left out instead of auto-approving.
    /// Advisories are informational and never change the resolution.
    pub fn build(tables: &ReferenceTables, request: ProjectRequest) -> Option<Self> {
        let location = tables.location(&request.location)?;
        let voltage = location.voltage.clone();
        let result = resolve(tables, &voltage, request.phase, request.installed_load_kw);

        let kit_power_kwp = (request.kit_power_kwp > 0.0).then_some(request.kit_power_kwp);
        let verdict = match (&result.category, kit_power_kwp) {
            (Some(_), Some(kit)) => Some(validate_kit(kit, result.limit)),
            _ => None,
        };

        Some(ProjectReport {
            client: request.client,
            location: location.name.clone(),
            advisories: advisory::phase_advisories(&voltage, request.phase),
            voltage,
            phase: request.phase,
            installed_load_kw: request.installed_load_kw,
            kit_power_kwp,
            result,
            verdict,
        })
    }
}

impl fmt::Display for ProjectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Solar Connection Summary ===")?;
        if let Some(client) = &self.client {
            writeln!(f, "Client:   {}", client)?;
        }
        writeln!(f, "Location: {}", self.location)?;
        writeln!(f, "Voltage:  {}", self.voltage)?;
        writeln!(f, "Phase:    {}", self.phase)?;
        writeln!(f, "Load:     {:.2} kW", self.installed_load_kw)?;
        writeln!(f)?;

        match &self.result.category {
            Some(category) => {
                writeln!(f, "Category:        {}", category)?;
                if let Some(breaker) = &self.result.breaker {
                    writeln!(f, "Minimum breaker: {} A", breaker)?;
                }
                writeln!(f, "Max generation:  {}", self.result.limit)?;
            }
            None => {
                writeln!(f, "No category found for this voltage, phase and load.")?;
                writeln!(f, "Check the installed load or the connection type.")?;
            }
        }

        if let (Some(kit), Some(verdict)) = (self.kit_power_kwp, self.verdict) {
            writeln!(f)?;
            writeln!(f, "Kit: {:.2} kWp -> {}", kit, verdict)?;
        }

        if !self.advisories.is_empty() {
            writeln!(f)?;
            writeln!(f, "Warnings:")?;
            for advisory in &self.advisories {
                writeln!(f, "  ! {}", advisory)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoadRange, Location, PowerCeilingEntry};

    fn row(code: &str, min: f64, max: f64, breaker: &str) -> LoadBreakerEntry {
        LoadBreakerEntry {
            voltage: VoltageClass::new("220/127"),
            category: CategoryCode::new(code),
            range: LoadRange::new(min, max),
            breaker: breaker.to_string(),
        }
    }

    fn ceiling(code: &str, kwp: Option<f64>) -> PowerCeilingEntry {
        PowerCeilingEntry {
            voltage: VoltageClass::new("220/127"),
            category: CategoryCode::new(code),
            max_power_kwp: kwp,
        }
    }

    fn sample_tables() -> ReferenceTables {
        ReferenceTables::new(
            vec![Location {
                name: "Goiânia".to_string(),
                voltage: VoltageClass::new("220/127"),
            }],
            vec![
                row("M1", 0.0, 5.0, "40"),
                row("M2", 5.1, 8.0, "63"),
                row("B1", 0.0, 10.0, "50"),
                row("B2", 10.1, 15.0, "63"),
                row("T1", 0.0, 15.0, "40"),
                row("T2", 15.1, 25.0, "63"),
                row("T3", 25.1, 38.0, "100"),
            ],
            vec![
                ceiling("M1", Some(5.0)),
                ceiling("M2", Some(8.0)),
                ceiling("B1", Some(10.0)),
                ceiling("B2", None),
                ceiling("T1", Some(15.0)),
                ceiling("T2", Some(25.0)),
            ],
        )
    }

    fn v() -> VoltageClass {
        VoltageClass::new("220/127")
    }

    #[test]
    fn test_resolve_inclusive_bounds() {
        let tables = sample_tables();
        for load in [0.0, 2.5, 5.0] {
            let e = resolve_category(&tables, &v(), PhaseType::Single, load).unwrap();
            assert_eq!(e.category.as_str(), "m1");
        }
        let e = resolve_category(&tables, &v(), PhaseType::Dual, 10.0).unwrap();
        assert_eq!(e.category.as_str(), "b1");
        assert_eq!(e.breaker, "50");
    }

    #[test]
    fn test_resolve_switches_at_boundary() {
        let tables = sample_tables();
        let low = resolve_category(&tables, &v(), PhaseType::Triple, 15.0).unwrap();
        let high = resolve_category(&tables, &v(), PhaseType::Triple, 15.1).unwrap();
        assert_eq!(low.category.as_str(), "t1");
        assert_eq!(high.category.as_str(), "t2");
    }

    #[test]
    fn test_resolve_filters_by_phase_and_voltage() {
        let tables = sample_tables();
        // 9 kW is in B1 but outside every single-phase row.
        assert!(resolve_category(&tables, &v(), PhaseType::Single, 9.0).is_none());
        assert!(
            resolve_category(&tables, &VoltageClass::new("380/220"), PhaseType::Dual, 9.0)
                .is_none()
        );
    }

    #[test]
    fn test_gap_between_rows_is_not_found() {
        let tables = sample_tables();
        assert!(resolve_category(&tables, &v(), PhaseType::Single, 5.05).is_none());
    }

    #[test]
    fn test_unset_range_row_matches_only_zero_load() {
        let tables = ReferenceTables::new(
            vec![],
            vec![row("B3", 0.0, 0.0, "80"), row("B1", 0.0, 10.0, "50")],
            vec![],
        );
        assert!(tables.load_schedule()[0].range.is_unset());

        let zero = resolve_category(&tables, &v(), PhaseType::Dual, 0.0).unwrap();
        assert_eq!(zero.category, CategoryCode::new("B3"));
        let small = resolve_category(&tables, &v(), PhaseType::Dual, 0.5).unwrap();
        assert_eq!(small.category, CategoryCode::new("B1"));

        let only_unset = ReferenceTables::new(vec![], vec![row("B3", 0.0, 0.0, "80")], vec![]);
        assert!(resolve_category(&only_unset, &v(), PhaseType::Dual, 0.5).is_none());
        assert_eq!(resolve(&only_unset, &v(), PhaseType::Dual, 0.0).breaker.as_deref(), Some("80"));
    }

    #[test]
    fn test_overlapping_rows_first_match_wins() {
        let tables = ReferenceTables::new(
            vec![],
            vec![row("B2", 5.0, 12.0, "63"), row("B1", 0.0, 10.0, "50")],
            vec![],
        );
        let e = resolve_category(&tables, &v(), PhaseType::Dual, 7.0).unwrap();
        assert_eq!(e.category.as_str(), "b2");
    }

    #[test]
    fn test_limit_for() {
        let tables = sample_tables();
        assert_eq!(limit_for(&tables, &v(), &CategoryCode::new("T2")), PowerLimit::Limited(25.0));
        assert_eq!(limit_for(&tables, &v(), &CategoryCode::new("B2")), PowerLimit::Unbounded);
        assert_eq!(limit_for(&tables, &v(), &CategoryCode::new("T3")), PowerLimit::Unbounded);
        assert_eq!(
            limit_for(&tables, &VoltageClass::new("380/220"), &CategoryCode::new("T2")),
            PowerLimit::Unbounded
        );
    }

    #[test]
    fn test_duplicate_ceiling_first_match_wins() {
        let tables = ReferenceTables::new(
            vec![],
            vec![],
            vec![ceiling("T1", Some(12.0)), ceiling("T1", Some(20.0))],
        );
        assert_eq!(limit_for(&tables, &v(), &CategoryCode::new("T1")), PowerLimit::Limited(12.0));
    }

    #[test]
    fn test_validate_kit() {
        assert_eq!(validate_kit(5.0, PowerLimit::Limited(5.0)), KitVerdict::Approved);
        assert_eq!(validate_kit(6.0, PowerLimit::Limited(5.0)), KitVerdict::Rejected);
        assert_eq!(validate_kit(1000.0, PowerLimit::Unbounded), KitVerdict::Approved);
        assert_eq!(validate_kit(0.1, PowerLimit::Limited(0.0)), KitVerdict::Rejected);
    }

    #[test]
    fn test_category_without_ceiling_is_unbounded() {
        let tables = sample_tables();
        let result = resolve(&tables, &v(), PhaseType::Triple, 30.0);
        assert_eq!(result.category, Some(CategoryCode::new("T3")));
        assert_eq!(result.breaker.as_deref(), Some("100"));
        assert_eq!(result.limit, PowerLimit::Unbounded);
        assert_eq!(validate_kit(10.0, result.limit), KitVerdict::Approved);
    }

    #[test]
    fn test_resolve_not_found() {
        let tables = sample_tables();
        let result = resolve(&tables, &v(), PhaseType::Triple, 500.0);
        assert_eq!(result.category, None);
        assert_eq!(result.breaker, None);
    }

    fn request(phase: PhaseType, load: f64, kit: f64) -> ProjectRequest {
        ProjectRequest {
            client: Some("Ana".to_string()),
            location: "goiania".to_string(),
            phase,
            installed_load_kw: load,
            kit_power_kwp: kit,
        }
    }

    #[test]
    fn test_report_skips_verdict_without_kit() {
        let tables = sample_tables();
        let report = ProjectReport::build(&tables, request(PhaseType::Dual, 4.0, 0.0)).unwrap();
        assert_eq!(report.location, "Goiânia");
        assert_eq!(report.kit_power_kwp, None);
        assert_eq!(report.verdict, None);

        let report = ProjectReport::build(&tables, request(PhaseType::Dual, 4.0, 12.0)).unwrap();
        assert_eq!(report.verdict, Some(KitVerdict::Rejected));
        assert!(report.to_string().contains("rejected"));
    }

    #[test]
    fn test_report_not_found_guidance() {
        let tables = sample_tables();
        let report = ProjectReport::build(&tables, request(PhaseType::Triple, 50.0, 5.0)).unwrap();
        assert_eq!(report.verdict, None);
        assert!(report.to_string().contains("No category found"));
    }

    #[test]
    fn test_report_unknown_location() {
        let tables = sample_tables();
        let mut req = request(PhaseType::Dual, 4.0, 0.0);
        req.location = "Atlantis".to_string();
        assert!(ProjectReport::build(&tables, req).is_none());
    }
}
