// Entrypoint for the simulator.
// - Keeps `main` small: load config, probe the API, hand over to the menu.
// - Exit codes: 0 on quit or Ctrl-C, 1 when the API is down or startup
//   fails.

use anyhow::Context;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use ussd_simulator::{api::ApiClient, config::SimConfig, ui};

fn main() -> ExitCode {
    // Logs go to stderr and default to warnings so the phone display
    // stays readable. Override with RUST_LOG.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(e) = ui::install_interrupt_handler() {
        tracing::warn!(error = %e, "Ctrl-C will use the default handler");
    }

    match run() {
        Ok(code) => code,
        Err(e) if ui::is_interrupt(&e) => {
            ui::print_interrupted();
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let config = SimConfig::load().context("Failed to load configuration")?;
    let api = ApiClient::new(&config)?;

    ui::print_header()?;
    ui::print_checking();
    if !api.health_check() {
        ui::print_startup_failure(&config);
        return Ok(ExitCode::FAILURE);
    }
    ui::print_api_ready();
    std::thread::sleep(std::time::Duration::from_secs(1));

    // Blocks until the user quits from the top-level menu.
    ui::main_menu(&api, &config)?;
    Ok(ExitCode::SUCCESS)
}
