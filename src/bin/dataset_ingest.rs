use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use matchday::config::{self, Settings, flag_value};
use matchday::{dataset, logging};

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();
    let settings = Settings::from_env();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let csv_path = flag_value(&args, "--csv")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: dataset_ingest --csv <stats.csv> [--db <stats.sqlite>]"))?;

    let settings = settings.apply_args(&args)?;
    let db_path = settings
        .db_path
        .or_else(dataset::default_db_path)
        .context("unable to resolve sqlite path")?;

    let mut conn = dataset::open_db(&db_path)?;
    let summary = dataset::ingest_csv(&mut conn, db_path.clone(), &csv_path)?;

    println!("Dataset ingest complete");
    println!("CSV: {}", csv_path.display());
    println!("DB: {}", summary.db_path.display());
    println!("Rows read: {}", summary.rows_read);
    println!("Rows upserted: {}", summary.rows_upserted);
    println!("Rows skipped: {}", summary.rows_skipped);
    if !summary.errors.is_empty() {
        println!("  errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            println!("   - {err}");
        }
    }

    Ok(())
}
