//! GeoFlow store maintenance
//!
//! Usage:
//!   geoflow_db migrate   # drop and recreate `packets` (destroys data)
//!   geoflow_db upgrade   # rewrite legacy HH:MM:SS times to today's date, ensure idx_time
//!   geoflow_db check     # coordinate coverage and the last 5 rows
//!
//! Options:
//!   --db <path>          # overrides GEOFLOW_DB_PATH (default: packets.db)
//!
//! Run while the runtime is stopped.

use geoflow::sqlite_pragma::apply_optimized_pragmas;
use geoflow::store::maintenance::{reset_schema, summarize, upgrade_legacy_timestamps};
use geoflow::store::schema::ensure_schema;
use log::info;
use rusqlite::Connection;

enum Command {
    Migrate,
    Upgrade,
    Check,
}

fn parse_command_from_args(args: &[String]) -> Result<Command, String> {
    match args.get(1).map(|s| s.as_str()) {
        Some("migrate") => Ok(Command::Migrate),
        Some("upgrade") => Ok(Command::Upgrade),
        Some("check") => Ok(Command::Check),
        Some(other) => Err(format!("Unknown command '{}'. Usage: geoflow_db <migrate|upgrade|check> [--db <path>]", other)),
        None => Err("Missing command. Usage: geoflow_db <migrate|upgrade|check> [--db <path>]".to_string()),
    }
}

fn parse_db_path_from_args(args: &[String]) -> String {
    args.windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].clone())
        .or_else(|| std::env::var("GEOFLOW_DB_PATH").ok())
        .unwrap_or_else(|| "packets.db".to_string())
}

fn print_check(conn: &Connection) -> Result<(), Box<dyn std::error::Error>> {
    let summary = summarize(conn, 5)?;

    println!("Rows with coordinates: {} / {}", summary.rows_with_coordinates, summary.total_rows);
    println!("Last {} rows:", summary.recent.len());
    for row in &summary.recent {
        println!(
            "  {} | {} ({}, {}) [{:?}, {:?}] → {} ({}, {}) [{:?}, {:?}]",
            row.time.as_deref().unwrap_or("?"),
            row.src.as_deref().unwrap_or("?"),
            row.src_country.as_deref().unwrap_or("-"),
            row.src_city.as_deref().unwrap_or("-"),
            row.src_lat,
            row.src_lon,
            row.dst.as_deref().unwrap_or("?"),
            row.dst_country.as_deref().unwrap_or("-"),
            row.dst_city.as_deref().unwrap_or("-"),
            row.dst_lat,
            row.dst_lon,
        );
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_command_from_args(&args)?;
    let db_path = parse_db_path_from_args(&args);

    info!("🔧 Opening store: {}", db_path);
    let mut conn = Connection::open(&db_path)?;
    apply_optimized_pragmas(&conn)?;

    match command {
        Command::Migrate => reset_schema(&mut conn)?,
        Command::Upgrade => {
            ensure_schema(&conn)?;
            let today = chrono::Local::now().date_naive();
            upgrade_legacy_timestamps(&mut conn, today)?;
        }
        Command::Check => print_check(&conn)?,
    }

    Ok(())
}
