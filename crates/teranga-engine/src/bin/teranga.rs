//! # Teranga Admin CLI
//!
//! Maintenance commands for a Teranga database.
//!
//! ## Usage
//! ```bash
//! # Create / upgrade the database
//! cargo run -p teranga-engine --bin teranga -- migrate
//!
//! # Show numbering counters
//! cargo run -p teranga-engine --bin teranga -- --db ./data/teranga.db sequences
//!
//! # Stock of a product in a warehouse, with recent movements
//! cargo run -p teranga-engine --bin teranga -- stock RIZ-25 DKR-01
//!
//! # Verify every journal entry balances
//! cargo run -p teranga-engine --bin teranga -- --config ./teranga.toml journal-check
//! ```
//!
//! Logging follows `RUST_LOG` (default `info,teranga=debug,sqlx=warn`).

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use teranga_core::numbering::fiscal_year_of;
use teranga_core::{Money, CURRENCY_CODE};
use teranga_db::migrations::migration_status;
use teranga_engine::stock::DEFAULT_HISTORY_LIMIT;
use teranga_engine::{Engine, EngineConfig};
use tracing_subscriber::EnvFilter;

enum Command {
    Migrate,
    Sequences,
    Stock { product_id: String, warehouse_id: String },
    JournalCheck,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,teranga=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_help() {
    println!("Teranga ERP administration");
    println!();
    println!("Usage: teranga [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  migrate                         Open the database and apply migrations");
    println!("  sequences                       List numbering counters");
    println!("  stock <PRODUCT> <WAREHOUSE>     Current stock and recent movements");
    println!("  journal-check                   Verify every journal entry balances");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>    Configuration file (default: platform config dir)");
    println!("  -d, --db <PATH>        Database file, overrides the configuration");
    println!("  -h, --help             Show this help message");
}

fn money(amount: Money) -> String {
    format!("{} {}", amount, CURRENCY_CODE)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = match positional.as_slice() {
        [cmd] if cmd == "migrate" => Command::Migrate,
        [cmd] if cmd == "sequences" => Command::Sequences,
        [cmd, product, warehouse] if cmd == "stock" => Command::Stock {
            product_id: product.clone(),
            warehouse_id: warehouse.clone(),
        },
        [cmd] if cmd == "journal-check" => Command::JournalCheck,
        _ => {
            print_help();
            std::process::exit(2);
        }
    };

    let mut config = EngineConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let engine = Engine::open(config).await?;

    match command {
        Command::Migrate => {
            let (total, applied) = migration_status(engine.db().pool()).await?;
            println!("Database: {}", engine.config().database.path.display());
            println!("✓ Migrations applied: {}/{}", applied, total);
        }

        Command::Sequences => {
            let year = fiscal_year_of(Utc::now().date_naive());
            println!("{:<16} {:<6} {:>6} {:>8}  {}", "TYPE", "PREFIX", "YEAR", "CURRENT", "NEXT");
            for state in engine.db().sequences().list().await? {
                let next = state
                    .preview_next(year)
                    .unwrap_or_else(|| "(closed year)".to_string());
                println!(
                    "{:<16} {:<6} {:>6} {:>8}  {}",
                    state.sequence_type.as_str(),
                    state.prefix,
                    state.fiscal_year,
                    state.current_value,
                    next
                );
            }
        }

        Command::Stock {
            product_id,
            warehouse_id,
        } => {
            let stock = engine.stock();
            let record = stock.current_state(&product_id, &warehouse_id).await?;
            println!("{} @ {}", record.product_id, record.warehouse_id);
            println!("  On hand:       {}", record.quantity_on_hand);
            println!("  Average cost:  {}", money(record.weighted_average_cost));
            println!("  Stock value:   {}", money(record.stock_value));
            println!();

            let movements = stock
                .movements(&product_id, &warehouse_id, DEFAULT_HISTORY_LIMIT)
                .await?;
            if movements.is_empty() {
                println!("No movements.");
            }
            for m in movements {
                println!(
                    "  {}  {:<10} {:>6}  {:>6} -> {:<6} {}",
                    m.created_at.format("%Y-%m-%d %H:%M"),
                    m.kind.as_str(),
                    m.quantity,
                    m.quantity_before,
                    m.quantity_after,
                    m.document_id.as_deref().unwrap_or("")
                );
            }
        }

        Command::JournalCheck => {
            let journal = engine.db().journal();
            let total = journal.count().await?;
            let unbalanced = journal.unbalanced_entries().await?;

            if unbalanced.is_empty() {
                println!("✓ {} journal entries, all balanced", total);
            } else {
                for entry in &unbalanced {
                    println!(
                        "✗ {}  debit {}  credit {}",
                        entry.entry_id,
                        money(Money::from_minor(entry.debit)),
                        money(Money::from_minor(entry.credit))
                    );
                }
                println!("{} of {} journal entries are unbalanced", unbalanced.len(), total);
                std::process::exit(1);
            }
        }
    }

    engine.db().close().await;
    Ok(())
}
