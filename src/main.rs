mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::info;
use transbox::api;
use transbox::config::Config;
use transbox::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let log_level = init_tracing("info");

    let cli = Cli::parse();

    let config = Config::load_with(cli.config)
        .map_err(|e| format!("Failed to load config: {}", e))?;

    if let Some(handle) = log_level {
        handle.set_level(&config.telemetry.log_level);
    }

    match cli.command {
        Commands::Serve(args) => {
            let address = args.address.unwrap_or(config.server.bind_addr);
            api::run(config, address).await?;
        }
        Commands::CheckConfig => {
            info!(
                provider_id = %config.provider.id,
                model_path = ?config.loader.resolved_model_path(),
                device = ?config.loader.device,
                "Configuration is valid"
            );
            // Secrets are not serialized
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
