//! Reference table extraction from CSV exports
//!
//! Reads the location, load schedule and generation ceiling sheets, checks
//! them against a fixed column contract, and parses the free-form numeric
//! cells into typed rows.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use rusqlite::Connection;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::db;
use crate::error::{LoadError, LoadResult};
use crate::models::{CategoryCode, LoadBreakerEntry, LoadRange, Location, PowerCeilingEntry, VoltageClass};
use crate::normalize::normalize_strict;
use crate::parse::{parse_bound, parse_power, parse_range};
use crate::tables::ReferenceTables;

/// A required column and the header spellings accepted for it.
/// Headers are compared after [`normalize_strict`].
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl Column {
    const fn new(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Column { name, aliases }
    }

    fn matches(&self, header: &str) -> bool {
        header == self.name || self.aliases.contains(&header)
    }
}

const LOCATION_NAME: Column = Column::new("municipio", &["cidade", "city", "location"]);
const VOLTAGE: Column = Column::new("tensao", &["tensao_disponivel", "voltage"]);
const CATEGORY: Column = Column::new("faixa", &["categoria", "category"]);
const LOAD_RANGE: Column = Column::new("carga", &["faixa_de_carga", "load", "load_range"]);
const LOAD_MIN: Column = Column::new("carga_min_kw", &["carga_min", "load_min"]);
const LOAD_MAX: Column = Column::new("carga_max_kw", &["carga_max", "load_max"]);
const BREAKER: Column = Column::new("disjuntor_a", &["disjuntor", "breaker"]);
const MAX_POWER: Column = Column::new("potencia_max_kwp", &["potencia_max", "potencia_maxima", "max_power"]);

/// File names of the three reference sheets, matched case-insensitively
/// anywhere below the data directory
#[derive(Debug, Clone)]
pub struct SourceFiles {
    pub locations: String,
    pub load_schedule: String,
    pub power_ceilings: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        SourceFiles {
            locations: "municipios_tensao.csv".to_string(),
            load_schedule: "tabela_disjuntores.csv".to_string(),
            power_ceilings: "tabela_potencia_maxima.csv".to_string(),
        }
    }
}

/// One CSV sheet with normalized headers
struct RawTable {
    name: &'static str,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl RawTable {
    fn read(name: &'static str, path: &Path) -> LoadResult<Self> {
        let csv_err = |source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;

        let headers = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(normalize_strict)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            if record.iter().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(record);
        }

        if rows.is_empty() {
            return Err(LoadError::EmptyTable(name));
        }

        Ok(RawTable { name, headers, rows })
    }

    fn find(&self, column: Column) -> Option<usize> {
        self.headers.iter().position(|h| column.matches(h))
    }

    fn require(&self, column: Column) -> LoadResult<usize> {
        self.find(column).ok_or_else(|| LoadError::MissingColumn {
            table: self.name,
            column: column.name.to_string(),
            found: self.headers.join(", "),
        })
    }
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

/// Locate the three reference files below `data_dir`
pub fn find_reference_files(data_dir: &Path, files: &SourceFiles) -> LoadResult<[PathBuf; 3]> {
    let wanted = [&files.locations, &files.load_schedule, &files.power_ceilings];
    let mut found: [Option<PathBuf>; 3] = [None, None, None];

    for entry in WalkDir::new(data_dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().to_lowercase();
        for (slot, name) in found.iter_mut().zip(wanted) {
            if slot.is_none() && filename == name.to_lowercase() {
                *slot = Some(entry.path().to_path_buf());
            }
        }
    }

    let [locations, schedule, ceilings] = found;
    let missing = |file: &String| LoadError::SourceNotFound {
        file: file.clone(),
        dir: data_dir.to_path_buf(),
    };
    Ok([
        locations.ok_or_else(|| missing(&files.locations))?,
        schedule.ok_or_else(|| missing(&files.load_schedule))?,
        ceilings.ok_or_else(|| missing(&files.power_ceilings))?,
    ])
}

fn extract_locations(table: &RawTable, stats: &mut ExtractStats) -> LoadResult<Vec<Location>> {
    let name_col = table.require(LOCATION_NAME)?;
    let voltage_col = table.require(VOLTAGE)?;

    let mut locations = Vec::new();
    for record in &table.rows {
        let name = cell(record, name_col);
        let voltage = cell(record, voltage_col);
        if name.is_empty() || voltage.is_empty() {
            warn!(table = table.name, name, voltage, "skipping incomplete location row");
            stats.skipped += 1;
            continue;
        }
        locations.push(Location {
            name: name.to_string(),
            voltage: VoltageClass::new(voltage),
        });
    }
    Ok(locations)
}

fn extract_load_schedule(table: &RawTable, stats: &mut ExtractStats) -> LoadResult<Vec<LoadBreakerEntry>> {
    let voltage_col = table.require(VOLTAGE)?;
    let category_col = table.require(CATEGORY)?;
    let breaker_col = table.require(BREAKER)?;

    // Either one range cell ("5,1-10") or split min/max cells.
    #[derive(Clone, Copy)]
    enum RangeSource {
        Text(usize),
        Split(usize, usize),
    }
    let range_source = match (table.find(LOAD_RANGE), table.find(LOAD_MIN), table.find(LOAD_MAX)) {
        (Some(col), _, _) => RangeSource::Text(col),
        (None, Some(min), Some(max)) => RangeSource::Split(min, max),
        _ => {
            return Err(LoadError::MissingColumn {
                table: table.name,
                column: format!("{} (or {} + {})", LOAD_RANGE.name, LOAD_MIN.name, LOAD_MAX.name),
                found: table.headers.join(", "),
            });
        }
    };

    let mut entries = Vec::new();
    for record in &table.rows {
        let voltage = cell(record, voltage_col);
        let category = cell(record, category_col);
        let breaker = cell(record, breaker_col);
        if voltage.is_empty() || category.is_empty() || breaker.is_empty() {
            warn!(table = table.name, voltage, category, breaker, "skipping incomplete schedule row");
            stats.skipped += 1;
            continue;
        }

        // A split row is only a range when both bounds are present.
        let range = match range_source {
            RangeSource::Text(col) => parse_range(cell(record, col)),
            RangeSource::Split(min, max) => match (parse_bound(cell(record, min)), parse_bound(cell(record, max))) {
                (Some(min), Some(max)) => LoadRange::new(min, max),
                _ => LoadRange::UNSET,
            },
        };
        if range.is_unset() {
            stats.unset_ranges += 1;
        }

        entries.push(LoadBreakerEntry {
            voltage: VoltageClass::new(voltage),
            category: CategoryCode::new(category),
            range,
            breaker: breaker.to_string(),
        });
    }
    Ok(entries)
}

fn extract_power_ceilings(table: &RawTable, stats: &mut ExtractStats) -> LoadResult<Vec<PowerCeilingEntry>> {
    let voltage_col = table.require(VOLTAGE)?;
    let category_col = table.require(CATEGORY)?;
    let power_col = table.require(MAX_POWER)?;

    let mut entries = Vec::new();
    for record in &table.rows {
        let voltage = cell(record, voltage_col);
        let category = cell(record, category_col);
        if voltage.is_empty() || category.is_empty() {
            warn!(table = table.name, voltage, category, "skipping incomplete ceiling row");
            stats.skipped += 1;
            continue;
        }

        let max_power_kwp = parse_power(cell(record, power_col));
        if max_power_kwp.is_none() {
            stats.unbounded_ceilings += 1;
        }

        entries.push(PowerCeilingEntry {
            voltage: VoltageClass::new(voltage),
            category: CategoryCode::new(category),
            max_power_kwp,
        });
    }
    Ok(entries)
}

/// Read and validate the reference sheets into an immutable snapshot.
/// Any missing file or column aborts the whole load.
pub fn read_reference_tables(data_dir: &Path, files: &SourceFiles) -> Result<(ReferenceTables, ExtractStats)> {
    let mut stats = ExtractStats::default();

    info!(dir = %data_dir.display(), "scanning for reference tables");
    let [locations_path, schedule_path, ceilings_path] = find_reference_files(data_dir, files)?;

    let locations = RawTable::read("locations", &locations_path)?;
    let schedule = RawTable::read("load_schedule", &schedule_path)?;
    let ceilings = RawTable::read("power_ceilings", &ceilings_path)?;

    let locations = extract_locations(&locations, &mut stats)
        .with_context(|| format!("extracting {}", locations_path.display()))?;
    let schedule = extract_load_schedule(&schedule, &mut stats)
        .with_context(|| format!("extracting {}", schedule_path.display()))?;
    let ceilings = extract_power_ceilings(&ceilings, &mut stats)
        .with_context(|| format!("extracting {}", ceilings_path.display()))?;

    let tables = ReferenceTables::new(locations, schedule, ceilings);

    stats.locations = tables.locations().count();
    stats.schedule_rows = tables.load_schedule().len();
    stats.ceilings = tables.power_ceilings().len();

    for overlap in tables.overlaps() {
        warn!(
            voltage = %overlap.voltage,
            phase = %overlap.phase,
            first_row = overlap.first_row,
            second_row = overlap.second_row,
            "overlapping load ranges {} and {}; first row wins",
            overlap.first_category,
            overlap.second_category
        );
        stats.overlaps += 1;
    }

    Ok((tables, stats))
}

/// Extract reference tables from `data_dir` and store them in the database
pub fn extract_to_database(conn: &mut Connection, data_dir: &Path, files: &SourceFiles) -> Result<ExtractStats> {
    let (tables, stats) = read_reference_tables(data_dir, files)?;
    db::store_tables(conn, &tables).context("storing reference tables")?;
    info!(%stats, "reference tables imported");
    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ExtractStats {
    pub locations: usize,
    pub schedule_rows: usize,
    pub ceilings: usize,
    pub unset_ranges: usize,
    pub unbounded_ceilings: usize,
    pub overlaps: usize,
    pub skipped: usize,
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Extracted {} locations, {} schedule rows ({} without range), {} ceilings ({} unbounded). Overlaps: {}, Skipped: {}",
            self.locations,
            self.schedule_rows,
            self.unset_ranges,
            self.ceilings,
            self.unbounded_ceilings,
            self.overlaps,
            self.skipped
        )
    }
}
