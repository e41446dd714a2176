mod error;
mod logging;
mod report;
mod scenario;
mod settings;

use clap::Parser;
use error::CliError;
use report::Report;
use scenario::{Replay, Scenario};
use settings::Settings;
use std::process::ExitCode;
use trail_network_lib::PathNetwork;

fn main() -> ExitCode {
    let settings = Settings::parse();
    let _guard = logging::setup_logging(settings.log_level.as_deref());

    tracing::info!(
        "Starting {} v{} on {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        settings.scenario.display()
    );

    match run(&settings) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Replay the scenario and print the report
///
/// The report is printed even when an operation fails; `Ok(false)` then
/// signals the failure.
fn run(settings: &Settings) -> Result<bool, CliError> {
    let scenario = Scenario::load(&settings.scenario)?;
    let mut replay = Replay::new(PathNetwork::new(settings.to_config()));

    let outcome = replay.run(&scenario);
    if let Err(e) = &outcome {
        tracing::error!("{e}");
    }

    let report = Report::build(&replay);
    if !report.audit.is_clean() {
        tracing::warn!(
            crossings = report.audit.crossings.len(),
            overlaps = report.audit.overlaps.len(),
            invalid_fractions = report.audit.invalid_fractions.len(),
            broken_orders = report.audit.broken_orders.len(),
            "network audit found problems"
        );
    }
    println!("{}", report.to_json(settings.pretty)?);

    Ok(outcome.is_ok())
}
