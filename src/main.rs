use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use matchday::api::{self, ApiResponse, PredictRequest};
use matchday::config::{self, Settings, flag_value};
use matchday::{Predictor, logging};

const USAGE: &str = "usage:
  matchday predict --home <team> --away <team> [--season N] [--seed N]
  matchday teams
  matchday serve            (JSON lines on stdin/stdout)
common flags: --model <bundle.json> --db <stats.sqlite>";

fn main() -> Result<()> {
    config::load_dotenv();
    logging::init();
    let settings = Settings::from_env();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = args.first().cloned() else {
        eprintln!("{USAGE}");
        return Err(anyhow!("missing command"));
    };
    let settings = settings.apply_args(&args)?;

    if command == "help" || command == "--help" || command == "-h" {
        println!("{USAGE}");
        return Ok(());
    }

    // Models and dataset are loaded once, before any request is handled.
    let predictor = Predictor::load(&settings).context("startup failed")?;

    match command.as_str() {
        "predict" => run_predict(&predictor, &settings, &args),
        "teams" => print_json(&api::teams(&predictor)),
        "serve" => run_serve(&predictor, &settings),
        other => {
            eprintln!("{USAGE}");
            Err(anyhow!("unknown command {other:?}"))
        }
    }
}

fn run_predict(predictor: &Predictor, settings: &Settings, args: &[String]) -> Result<()> {
    let request = PredictRequest {
        home_team: flag_value(args, "--home"),
        away_team: flag_value(args, "--away"),
        season: Some(settings.default_season),
        seed: settings.seed,
    };
    let response = api::predict(predictor, settings, request);
    print_json(&response)?;
    if !response.is_success() {
        std::process::exit(2);
    }
    Ok(())
}

fn run_serve(predictor: &Predictor, settings: &Settings) -> Result<()> {
    info!("serving JSON lines on stdin");
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut handled = 0usize;

    for line in stdin.lock().lines() {
        let line = line.context("read request line")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = api::handle_json(predictor, settings, &line);
        if !response.is_success() {
            warn!(line = handled + 1, "request returned an error");
        }
        let body = serde_json::to_string(&response).context("serialize response")?;
        writeln!(stdout, "{body}").context("write response")?;
        stdout.flush().ok();
        handled += 1;
    }

    info!(handled, "stdin closed, shutting down");
    Ok(())
}

fn print_json(response: &ApiResponse) -> Result<()> {
    let body = serde_json::to_string_pretty(response).context("serialize response")?;
    println!("{body}");
    Ok(())
}
