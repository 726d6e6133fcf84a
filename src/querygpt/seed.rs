// SPDX-License-Identifier: MIT

//! Demo data: the trips/drivers database and its knowledge base

use indexmap::IndexMap;
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

use crate::adk::error::Result;
use crate::querygpt::knowledge::{
    JsonKnowledgeBase, KnowledgeDocument, TableKnowledge, WorkspaceKnowledge,
};

type TripRow = (i64, i64, &'static str, f64, f64, &'static str, &'static str);
type DriverRow = (
    i64,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    i64,
    f64,
    f64,
);

const TRIPS: [TripRow; 10] = [
    (1, 101, "Seattle", 5.2, 15.50, "completed", "2025-10-23"),
    (2, 102, "SF", 12.1, 32.00, "completed", "2025-10-23"),
    (3, 101, "Seattle", 3.5, 10.25, "completed", "2025-10-24"),
    (4, 103, "NY", 8.9, 20.00, "cancelled", "2025-10-24"),
    (5, 102, "SF", 1.1, 7.50, "completed", "2025-10-23"),
    (6, 101, "Seattle", 7.8, 18.99, "completed", "2025-10-24"),
    (7, 104, "NY", 4.0, 11.00, "completed", "2025-10-23"),
    (8, 105, "SF", 15.0, 45.00, "completed", "2025-10-24"),
    (9, 103, "NY", 2.5, 9.99, "completed", "2025-10-24"),
    (10, 105, "Seattle", 6.7, 16.00, "completed", "2025-10-23"),
];

const DRIVERS: [DriverRow; 5] = [
    (101, "Alice", "active", "Toyota", "2024-01-15", 500, 4.8, 0.95),
    (102, "Bob", "active", "Honda", "2023-05-20", 600, 4.5, 0.88),
    (103, "Charlie", "suspended", "Ford", "2025-01-01", 300, 3.9, 0.45),
    (104, "Dana", "active", "Tesla", "2024-11-11", 800, 4.9, 0.99),
    (105, "Eve", "active", "Nissan", "2023-10-10", 500, 4.6, 0.90),
];

const SCHEMA: &str = "
CREATE TABLE trips (
    trip_id INTEGER PRIMARY KEY,
    driver_id INTEGER NOT NULL,
    city TEXT NOT NULL,
    distance_miles REAL NOT NULL,
    fare_usd REAL NOT NULL,
    trip_status TEXT NOT NULL,
    trip_date DATE NOT NULL
);
CREATE TABLE drivers (
    driver_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    license_status TEXT NOT NULL,
    vehicle_make TEXT NOT NULL,
    hire_date DATE NOT NULL,
    annual_bonus_target INTEGER NOT NULL,
    current_rating REAL NOT NULL,
    long_term_retention_score REAL NOT NULL
);
";

/// Create the demo database at `path`, replacing any existing file
pub fn seed_database<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        log::info!("Removing existing database {}", path.display());
        fs::remove_file(path)?;
    }

    let mut conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    for (id, driver, city, distance, fare, status, date) in TRIPS {
        tx.execute(
            "INSERT INTO trips (trip_id, driver_id, city, distance_miles, fare_usd, trip_status, trip_date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, driver, city, distance, fare, status, date],
        )?;
    }
    for (id, name, license, vehicle, hired, bonus, rating, retention) in DRIVERS {
        tx.execute(
            "INSERT INTO drivers (driver_id, name, license_status, vehicle_make, hire_date, \
             annual_bonus_target, current_rating, long_term_retention_score) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![id, name, license, vehicle, hired, bonus, rating, retention],
        )?;
    }
    tx.commit()?;

    log::info!(
        "Seeded {} with {} trips and {} drivers",
        path.display(),
        TRIPS.len(),
        DRIVERS.len()
    );
    Ok(())
}

fn table(schema: &str, rules: &str, sample_query: &str) -> TableKnowledge {
    TableKnowledge {
        schema: schema.to_string(),
        rules: rules.to_string(),
        sample_query: Some(sample_query.to_string()),
    }
}

fn workspace(description: &str, tables: Vec<(&str, TableKnowledge)>) -> WorkspaceKnowledge {
    WorkspaceKnowledge {
        description: description.to_string(),
        tables: tables
            .into_iter()
            .map(|(name, t)| (name.to_string(), t))
            .collect(),
    }
}

/// Knowledge document describing the demo database
pub fn demo_knowledge() -> KnowledgeDocument {
    let mut doc = IndexMap::new();
    doc.insert(
        "Mobility".to_string(),
        workspace(
            "Contains data related to rides, vehicles, and real-time trip details.",
            vec![(
                "trips",
                table(
                    "trip_id (INT), driver_id (INT), city (VARCHAR), distance_miles (FLOAT), \
                     fare_usd (FLOAT), trip_status (VARCHAR), trip_date (DATE)",
                    "The column `trip_status` must be 'completed' to count a successful trip. \
                     Always filter by `trip_date` when a time frame is provided.",
                    "SELECT count(trip_id) FROM trips WHERE trip_date = '2025-10-24' \
                     AND trip_status = 'completed';",
                ),
            )],
        ),
    );
    doc.insert(
        "Core Services".to_string(),
        workspace(
            "Contains HR, payroll, and static user/driver data.",
            vec![(
                "drivers",
                table(
                    "driver_id (INT), name (VARCHAR), license_status (VARCHAR), \
                     vehicle_make (VARCHAR), hire_date (DATE), annual_bonus_target (INT), \
                     current_rating (FLOAT), long_term_retention_score (FLOAT)",
                    "To check for an active driver, filter on `license_status` = 'active'. \
                     The `long_term_retention_score` column is rarely needed.",
                    "SELECT name, current_rating FROM drivers WHERE license_status = 'active';",
                ),
            )],
        ),
    );
    doc
}

/// Write the demo database and knowledge base
pub fn seed<P: AsRef<Path>, Q: AsRef<Path>>(database: P, knowledge_base: Q) -> Result<()> {
    seed_database(database)?;
    JsonKnowledgeBase::write(knowledge_base.as_ref(), &demo_knowledge())?;
    log::info!("Knowledge base written to {}", knowledge_base.as_ref().display());
    Ok(())
}
