use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use matchday::config::{self, Settings, flag_value};
use matchday::evaluation::{self, EvalFixture};
use matchday::{Predictor, logging};

const DEFAULT_BINS: usize = 10;

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();
    let settings = Settings::from_env();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let fixtures_path = flag_value(&args, "--fixtures")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: evaluate --fixtures <played.json> [--bins N] [--json]"))?;
    let bins = match flag_value(&args, "--bins") {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid value for --bins: {raw:?}"))?,
        None => DEFAULT_BINS,
    };
    let as_json = args.iter().any(|a| a == "--json");

    let settings = settings.apply_args(&args)?;
    let predictor = Predictor::load(&settings)?;

    let raw = fs::read_to_string(&fixtures_path)
        .with_context(|| format!("read fixtures {}", fixtures_path.display()))?;
    let fixtures: Vec<EvalFixture> =
        serde_json::from_str(&raw).context("parse fixtures json")?;

    let report = evaluation::evaluate_fixtures(&predictor, &fixtures, bins);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let m = report.metrics;
    println!("Fixtures: {} scored, {} skipped", m.samples, report.skipped.len());
    println!("Accuracy: {:.1}%", m.accuracy * 100.0);
    println!("Brier:    {:.4}", m.brier);
    println!("Log loss: {:.4}", m.log_loss);
    println!("Home-win calibration:");
    for bin in report.home_bins.iter().filter(|b| b.count > 0) {
        println!(
            "  {:.2}-{:.2}  n={:<4} pred={:.3} actual={:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }
    for skip in report.skipped.iter().take(6) {
        println!(
            "  skipped #{} {} vs {}: {}",
            skip.index, skip.home_team, skip.away_team, skip.reason
        );
    }

    Ok(())
}
