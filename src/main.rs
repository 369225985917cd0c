use std::process::ExitCode;

use clap::Parser;

use smartcondo_console::commands::{self, Cli};
use smartcondo_console::config::Config;
use smartcondo_console::routes::Route;
use smartcondo_console::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // Shares VITE_* vars with the web console when run from its checkout.
    let _ = dotenvy::dotenv();

    env_logger::init();

    let cli = Cli::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(retries) = cli.retries {
        config.retries = retries;
    }
    log::debug!("Using backend {} and AI service {}", config.api_prefix(), config.ai_service_base);

    let state = AppState::new(&config);

    match commands::run(&state, cli.command).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if e.needs_login() {
                eprintln!("Redirecting to {}", Route::Login.path());
            }
            ExitCode::FAILURE
        }
    }
}
