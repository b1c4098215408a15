//! Solar Grid Calculator
//!
//! Category, breaker and generation ceiling lookup for grid-tied solar kits.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;

use solar_grid_calculator::calculator::{self, ProjectReport, ProjectRequest};
use solar_grid_calculator::extract::{self, SourceFiles};
use solar_grid_calculator::models::{
    CategoryCode, LoadBreakerEntry, LoadRange, Location, PhaseType, PowerCeilingEntry, VoltageClass,
};
use solar_grid_calculator::tables::ReferenceTables;
use solar_grid_calculator::{db, logging};

#[derive(Parser)]
#[command(name = "solar-grid-calculator")]
#[command(about = "Grid connection category and generation ceiling calculator for small solar installations")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, env = "SOLAR_GRID_DB", default_value = "solar_grid.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import reference tables from a directory of CSV exports
    Import {
        /// Directory containing the reference CSV files
        data_dir: PathBuf,

        /// Location -> voltage sheet
        #[arg(long, default_value = "municipios_tensao.csv")]
        locations_file: String,

        /// Load -> category/breaker sheet
        #[arg(long, default_value = "tabela_disjuntores.csv")]
        schedule_file: String,

        /// Category -> generation ceiling sheet
        #[arg(long, default_value = "tabela_potencia_maxima.csv")]
        ceilings_file: String,

        /// Validate the files without writing to the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve category, breaker and generation ceiling for an installation
    Calc {
        /// Installation location (city name, accents and case ignored)
        location: String,

        /// Connection type
        #[arg(short, long, value_enum)]
        phase: PhaseType,

        /// Installed load in kW
        #[arg(short, long)]
        load: f64,

        /// Proposed kit peak power in kWp (0 = no kit to validate)
        #[arg(short, long, default_value = "0")]
        kit_power: f64,

        /// Client name echoed in the report
        #[arg(long)]
        client: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all locations in the database
    ListLocations,

    /// Show the voltage and schedule for a location
    Location {
        /// Location name
        name: String,
    },

    /// Report overlapping load ranges in the stored schedule
    Check,

    /// Initialize empty database with schema
    Init,

    /// Load sample data for testing (without CSV exports)
    LoadSample,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let mut conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import {
            data_dir,
            locations_file,
            schedule_file,
            ceilings_file,
            dry_run,
        } => {
            let files = SourceFiles {
                locations: locations_file,
                load_schedule: schedule_file,
                power_ceilings: ceilings_file,
            };

            if dry_run {
                let (_, stats) = extract::read_reference_tables(&data_dir, &files)?;
                println!("{}", stats);
                println!("Dry run: database not modified.");
            } else {
                let stats = extract::extract_to_database(&mut conn, &data_dir, &files)?;
                println!("{}", stats);
            }
        }

        Commands::Calc {
            location,
            phase,
            load,
            kit_power,
            client,
            json,
        } => {
            if load < 0.0 || kit_power < 0.0 {
                return Err(anyhow!("load and kit power must not be negative"));
            }

            let tables = db::load_tables(&conn)?;
            let request = ProjectRequest {
                client,
                location: location.clone(),
                phase,
                installed_load_kw: load,
                kit_power_kwp: kit_power,
            };
            let report = ProjectReport::build(&tables, request)
                .ok_or_else(|| anyhow!("location '{}' not found; see 'list-locations'", location))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
                if report.result.category.is_none() {
                    if let Some(span) = tables.covered_span(&report.voltage, phase) {
                        println!("Schedule for {} at {} V covers {}.", phase, report.voltage, span);
                    } else {
                        println!("No {} schedule exists at {} V.", phase, report.voltage);
                    }
                }
            }
        }

        Commands::ListLocations => {
            let tables = db::load_tables(&conn)?;
            println!("{:<35} {:>10}", "Location", "Voltage");
            println!("{}", "-".repeat(46));
            for l in tables.locations() {
                println!("{:<35} {:>10}", l.name, l.voltage);
            }
        }

        Commands::Location { name } => {
            let tables = db::load_tables(&conn)?;
            match tables.location(&name) {
                Some(l) => {
                    println!("Location: {}", l.name);
                    println!("  Voltage: {}", l.voltage);
                    for phase in PhaseType::ALL {
                        let rows: Vec<_> = tables.schedule_for(&l.voltage, phase).collect();
                        if rows.is_empty() {
                            continue;
                        }
                        println!("  {}:", phase);
                        for (_, e) in rows {
                            println!(
                                "    {:<4} {:<16} breaker {:>4} A, max {}",
                                e.category.to_string(),
                                e.range.to_string(),
                                e.breaker,
                                calculator::limit_for(&tables, &l.voltage, &e.category)
                            );
                        }
                    }
                }
                None => println!("Location '{}' not found", name),
            }
        }

        Commands::Check => {
            let tables = db::load_tables(&conn)?;
            let overlaps = tables.overlaps();
            if overlaps.is_empty() {
                println!("No overlapping load ranges.");
            } else {
                println!("Overlapping load ranges (the earlier row wins):");
                for o in &overlaps {
                    println!(
                        "  {} {}: row {} ({}) overlaps row {} ({})",
                        o.voltage, o.phase, o.first_row, o.first_category, o.second_row, o.second_category
                    );
                }
            }
        }

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            load_sample_data(&mut conn)?;
            println!("Sample data loaded successfully!");
        }
    }

    Ok(())
}

/// Load a small sample data set for trying the calculator without CSV exports
fn load_sample_data(conn: &mut Connection) -> Result<()> {
    let location = |name: &str, voltage: &str| Location {
        name: name.to_string(),
        voltage: VoltageClass::new(voltage),
    };
    let row = |voltage: &str, code: &str, min: f64, max: f64, breaker: &str| LoadBreakerEntry {
        voltage: VoltageClass::new(voltage),
        category: CategoryCode::new(code),
        range: LoadRange::new(min, max),
        breaker: breaker.to_string(),
    };
    let ceiling = |voltage: &str, code: &str, kwp: Option<f64>| PowerCeilingEntry {
        voltage: VoltageClass::new(voltage),
        category: CategoryCode::new(code),
        max_power_kwp: kwp,
    };

    let locations = vec![
        location("Goiânia", "220/127"),
        location("Anápolis", "220/127"),
        location("Rio Verde", "380/220"),
    ];

    let mut schedule = Vec::new();
    let mut ceilings = Vec::new();
    for voltage in ["220/127", "380/220"] {
        schedule.extend([
            row(voltage, "M1", 0.0, 5.0, "40"),
            row(voltage, "M2", 5.1, 8.0, "63"),
            row(voltage, "B1", 0.0, 10.0, "50"),
            row(voltage, "B2", 10.1, 15.0, "63"),
            row(voltage, "T1", 0.0, 15.0, "40"),
            row(voltage, "T2", 15.1, 25.0, "63"),
            row(voltage, "T3", 25.1, 38.0, "100"),
            row(voltage, "T4", 38.1, 47.0, "125"),
        ]);
        ceilings.extend([
            ceiling(voltage, "M1", Some(5.0)),
            ceiling(voltage, "M2", Some(8.0)),
            ceiling(voltage, "B1", Some(10.0)),
            ceiling(voltage, "B2", Some(15.0)),
            ceiling(voltage, "T1", Some(15.0)),
            ceiling(voltage, "T2", Some(25.0)),
            ceiling(voltage, "T4", None),
        ]);
    }

    let tables = ReferenceTables::new(locations, schedule, ceilings);
    db::store_tables(conn, &tables)?;

    info!(
        locations = tables.locations().count(),
        schedule_rows = tables.load_schedule().len(),
        "sample data stored"
    );
    Ok(())
}
