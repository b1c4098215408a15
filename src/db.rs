//! Database schema and operations

use anyhow::Result;
use rusqlite::Connection;

use crate::error::LoadError;
use crate::models::{
    CategoryCode, LoadBreakerEntry, LoadRange, Location, PowerCeilingEntry, VoltageClass,
};
use crate::normalize::normalize;
use crate::tables::ReferenceTables;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Location -> available voltage
        CREATE TABLE IF NOT EXISTS locations (
            name_key TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            voltage TEXT NOT NULL
        );

        -- Load -> category schedule; seq keeps authored row order
        CREATE TABLE IF NOT EXISTS load_schedule (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            voltage TEXT NOT NULL,
            category TEXT NOT NULL,
            load_min_kw REAL NOT NULL,
            load_max_kw REAL NOT NULL,
            breaker TEXT NOT NULL
        );

        -- Category -> generation ceiling; NULL = no defined ceiling
        CREATE TABLE IF NOT EXISTS power_ceilings (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            voltage TEXT NOT NULL,
            category TEXT NOT NULL,
            max_power_kwp REAL
        );

        CREATE INDEX IF NOT EXISTS idx_load_schedule_voltage ON load_schedule(voltage);
        CREATE INDEX IF NOT EXISTS idx_power_ceilings_key ON power_ceilings(voltage, category);
        "#,
    )?;
    Ok(())
}

/// Clear all reference data (for re-import)
pub fn clear_reference_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM power_ceilings;
        DELETE FROM load_schedule;
        DELETE FROM locations;
        DELETE FROM sqlite_sequence WHERE name IN ('load_schedule', 'power_ceilings');
        "#,
    )?;
    Ok(())
}

/// Replace the stored reference data with `tables` in one transaction
pub fn store_tables(conn: &mut Connection, tables: &ReferenceTables) -> Result<()> {
    let tx = conn.transaction()?;
    clear_reference_data(&tx)?;

    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO locations (name_key, name, voltage) VALUES (?1, ?2, ?3)",
        )?;
        for location in tables.locations() {
            stmt.execute((normalize(&location.name), &location.name, location.voltage.as_str()))?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO load_schedule (voltage, category, load_min_kw, load_max_kw, breaker)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for entry in tables.load_schedule() {
            stmt.execute((
                entry.voltage.as_str(),
                entry.category.as_str(),
                entry.range.min,
                entry.range.max,
                &entry.breaker,
            ))?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO power_ceilings (voltage, category, max_power_kwp) VALUES (?1, ?2, ?3)",
        )?;
        for entry in tables.power_ceilings() {
            stmt.execute((entry.voltage.as_str(), entry.category.as_str(), entry.max_power_kwp))?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Load one immutable snapshot of the reference data
pub fn load_tables(conn: &Connection) -> Result<ReferenceTables> {
    let mut stmt = conn.prepare("SELECT name, voltage FROM locations ORDER BY name_key")?;
    let rows = stmt.query_map([], |row| {
        Ok(Location {
            name: row.get(0)?,
            voltage: VoltageClass::new(&row.get::<_, String>(1)?),
        })
    })?;
    let mut locations = Vec::new();
    for row in rows {
        locations.push(row?);
    }

    let mut stmt = conn.prepare(
        "SELECT voltage, category, load_min_kw, load_max_kw, breaker FROM load_schedule ORDER BY seq",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(LoadBreakerEntry {
            voltage: VoltageClass::new(&row.get::<_, String>(0)?),
            category: CategoryCode::new(&row.get::<_, String>(1)?),
            range: LoadRange::new(row.get(2)?, row.get(3)?),
            breaker: row.get(4)?,
        })
    })?;
    let mut schedule = Vec::new();
    for row in rows {
        schedule.push(row?);
    }

    let mut stmt =
        conn.prepare("SELECT voltage, category, max_power_kwp FROM power_ceilings ORDER BY seq")?;
    let rows = stmt.query_map([], |row| {
        Ok(PowerCeilingEntry {
            voltage: VoltageClass::new(&row.get::<_, String>(0)?),
            category: CategoryCode::new(&row.get::<_, String>(1)?),
            max_power_kwp: row.get(2)?,
        })
    })?;
    let mut ceilings = Vec::new();
    for row in rows {
        ceilings.push(row?);
    }

    let tables = ReferenceTables::new(locations, schedule, ceilings);
    if tables.is_empty() {
        return Err(LoadError::EmptyStore.into());
    }
    Ok(tables)
}
