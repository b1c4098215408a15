//! CSV export -> SQLite store -> snapshot -> resolution

use std::fs;
use std::path::Path;

use rusqlite::Connection;
use tempfile::TempDir;

use solar_grid_calculator::calculator::{ProjectReport, ProjectRequest};
use solar_grid_calculator::extract::{self, SourceFiles};
use solar_grid_calculator::models::{CategoryCode, KitVerdict, PhaseType, PowerLimit, VoltageClass};
use solar_grid_calculator::{db, limit_for, logging, resolve, resolve_category, validate_kit};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn import_sample() -> Connection {
    logging::init_test();

    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "municipios_tensao.csv",
        "Municipio,Tensao\nGoiânia,220/127\nRio Verde,380/220\n",
    );
    write(
        dir.path(),
        "tabela_disjuntores.csv",
        "Tensao,Faixa,Carga (kW),Disjuntor (A)\n\
         220/127,M1,0-5,40\n\
         220/127,M2,\"5,1-8\",63\n\
         220/127,B1,0-10,50\n\
         220/127,B2,\"10,1-15\",63\n\
         220/127,T1,0-15,40\n\
         220/127,T2,\"15,1-25\",63\n\
         220/127,T3,\"25,1-38\",100\n\
         380/220,M1,0-8,40\n",
    );
    write(
        dir.path(),
        "tabela_potencia_maxima.csv",
        "Tensao,Faixa,Potencia Max (kWp)\n\
         220/127,M1,5 kWp\n\
         220/127,M2,8 kWp\n\
         220/127,B1,10 kWp\n\
         220/127,B2,\"12,5 kWp\"\n\
         220/127,T1,15 kWp\n\
         220/127,T2,25 kWp\n\
         380/220,M1,8 kWp\n",
    );

    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let stats = extract::extract_to_database(&mut conn, dir.path(), &SourceFiles::default()).unwrap();
    assert_eq!(stats.schedule_rows, 8);
    assert_eq!(stats.overlaps, 0);
    conn
}

#[test]
fn boundary_switches_category_at_lower_row_max() {
    let conn = import_sample();
    let tables = db::load_tables(&conn).unwrap();
    let voltage = VoltageClass::new("220/127");

    let at_max = resolve_category(&tables, &voltage, PhaseType::Dual, 10.0).unwrap();
    let past_max = resolve_category(&tables, &voltage, PhaseType::Dual, 10.1).unwrap();
    assert_eq!(at_max.category, CategoryCode::new("B1"));
    assert_eq!(past_max.category, CategoryCode::new("B2"));

    assert_eq!(
        limit_for(&tables, &voltage, &past_max.category),
        PowerLimit::Limited(12.5)
    );
}

#[test]
fn single_phase_at_220_127_still_resolves() {
    let conn = import_sample();
    let tables = db::load_tables(&conn).unwrap();

    let result = resolve(&tables, &VoltageClass::new("220/127"), PhaseType::Single, 4.0);
    assert_eq!(result.category, Some(CategoryCode::new("M1")));
    assert_eq!(result.breaker.as_deref(), Some("40"));
    assert_eq!(result.limit, PowerLimit::Limited(5.0));

    let report = ProjectReport::build(
        &tables,
        ProjectRequest {
            client: Some("Maria".to_string()),
            location: "GOIANIA".to_string(),
            phase: PhaseType::Single,
            installed_load_kw: 4.0,
            kit_power_kwp: 5.0,
        },
    )
    .unwrap();
    assert_eq!(report.result, result);
    assert_eq!(report.verdict, Some(KitVerdict::Approved));
    assert_eq!(report.advisories.len(), 1);
}

#[test]
fn category_without_ceiling_approves_any_kit() {
    let conn = import_sample();
    let tables = db::load_tables(&conn).unwrap();
    let voltage = VoltageClass::new("220/127");

    let result = resolve(&tables, &voltage, PhaseType::Triple, 30.0);
    assert_eq!(result.category, Some(CategoryCode::new("T3")));
    assert_eq!(result.limit, PowerLimit::Unbounded);
    assert_eq!(validate_kit(10.0, result.limit), KitVerdict::Approved);
}

#[test]
fn voltage_of_location_drives_lookup() {
    let conn = import_sample();
    let tables = db::load_tables(&conn).unwrap();

    let voltage = tables.voltage_for("rio verde").unwrap();
    let result = resolve(&tables, voltage, PhaseType::Single, 7.5);
    assert_eq!(result.category, Some(CategoryCode::new("M1")));
    assert_eq!(result.limit, PowerLimit::Limited(8.0));

    let report = ProjectReport::build(
        &tables,
        ProjectRequest {
            client: None,
            location: "Rio Verde".to_string(),
            phase: PhaseType::Triple,
            installed_load_kw: 7.5,
            kit_power_kwp: 6.0,
        },
    )
    .unwrap();
    assert_eq!(report.result.category, None);
    assert_eq!(report.verdict, None);
    assert!(report.advisories.is_empty());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["voltage"], "380/220");
    assert_eq!(json["result"]["limit"]["kind"], "unbounded");
}
