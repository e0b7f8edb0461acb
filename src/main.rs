use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mongo_console::cli::{Cli, Commands};
use mongo_console::core::{Console, OperationResult};
use mongo_console::utils::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mongo_console=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_env_overrides();

    match cli.command {
        #[cfg(feature = "server")]
        None => {
            use mongo_console::utils::{DEFAULT_HOST, DEFAULT_PORT};
            handle_serve(config, DEFAULT_HOST.to_string(), DEFAULT_PORT, false).await?;
        }
        #[cfg(not(feature = "server"))]
        None => {
            println!("Built without the server feature. Run 'mongo-console --help' for commands.");
        }
        #[cfg(feature = "server")]
        Some(Commands::Serve { port, host, cors }) => {
            handle_serve(config, host, port, cors).await?;
        }
        Some(Commands::Status) => handle_status(&config).await?,
        Some(Commands::Deploy) => {
            let console = Console::from_config(&config)?;
            report(console.deploy().await)?;
        }
        Some(Commands::Logs) => {
            let console = Console::from_config(&config)?;
            report(console.logs().await)?;
        }
        Some(Commands::Backup { output }) => handle_backup(&config, &output).await?,
        Some(Commands::Restore { file }) => handle_restore(&config, &file).await?,
        Some(Commands::AddRule { ip }) => {
            let console = Console::from_config(&config)?;
            report(console.add_network_rule(Some(&ip)).await?)?;
        }
        Some(Commands::Check) => handle_check(&config).await?,
        #[cfg(feature = "server")]
        Some(Commands::GenerateToken) => {
            println!("{}", mongo_console::server::auth::generate_token());
        }
        #[cfg(not(feature = "server"))]
        Some(Commands::GenerateToken) => {
            println!("{}", mongo_console::utils::generate_hex_string(32));
        }
    }

    Ok(())
}

#[cfg(feature = "server")]
async fn handle_serve(config: AppConfig, host: String, port: u16, cors: bool) -> Result<()> {
    use mongo_console::server::{self, AppState};

    let console = Console::from_config(&config)?;
    console.guard().warn_if_unsafe().await;

    let state = AppState::new(console, config.api_token.clone(), config.upload_limit());
    server::run(state, host, port, cors).await
}

async fn handle_status(config: &AppConfig) -> Result<()> {
    let console = Console::from_config(config)?;
    let status = console.status().await;

    println!("Container: {}", console.container_name());
    println!("Status:    {}", status.status);
    if let Some(error) = &status.error {
        println!("Error:     {}", error);
    }

    if !status.success {
        bail!("status inspection failed");
    }
    Ok(())
}

async fn handle_backup(config: &AppConfig, output: &std::path::Path) -> Result<()> {
    let console = Console::from_config(config)?;
    console.guard().warn_if_unsafe().await;

    let archive = console.backup().await?;
    let written = archive
        .persist_to(output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✓ Backup written to {} ({} bytes)", output.display(), written);
    Ok(())
}

async fn handle_restore(config: &AppConfig, file: &std::path::Path) -> Result<()> {
    if !file.is_file() {
        bail!("{} not found", file.display());
    }

    let console = Console::from_config(config)?;
    console.guard().warn_if_unsafe().await;

    let staged = console.stage_local_file(file).await?;
    report(console.restore(staged).await?)
}

async fn handle_check(config: &AppConfig) -> Result<()> {
    let console = Console::from_config(config)?;
    let guard = console.guard();

    println!("Compose file: {}", guard.compose_path().display());
    println!("Service:      {}", console.compose().service());
    println!("Credential:   {}", config.credential_state());

    match guard.check().await {
        Ok(()) => {
            println!("✓ No default password found");
            Ok(())
        }
        Err(violation) => bail!("{}", violation),
    }
}

/// Print a command outcome; a failed outcome becomes a non-zero exit
fn report(result: OperationResult) -> Result<()> {
    if !result.output.is_empty() {
        print!("{}", result.output);
        if !result.output.ends_with('\n') {
            println!();
        }
    }

    if result.success {
        Ok(())
    } else {
        bail!("{}", result.error.trim())
    }
}
