use anyhow::Result;
use clap::Parser;
use tracing::error;

use cap_client::api::HttpTransport;
use cap_client::cli::{run, validate_cli, Cli};
use cap_client::credentials::{prompt_token, CredentialsManager};
use cap_client::validations::validate_credentials;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // argument checks fail before credentials are touched
    if let Err(e) = validate_cli(&cli) {
        error!(error = %e, "invalid arguments");
        std::process::exit(1);
    }

    // token precedence: command line, then secrets file, then prompt
    let mut credentials = match CredentialsManager::new(cli.username.as_deref(), &cli.secrets) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!(error = %e, "could not read secrets");
            std::process::exit(1);
        }
    };
    if let Some(token) = &cli.token {
        credentials.set_token(token);
    }
    if let Err(e) = validate_credentials(&mut credentials, prompt_token) {
        error!(error = %e, "could not resolve credentials");
        std::process::exit(1);
    }

    let username = credentials.username().unwrap_or_default().to_string();
    let token = credentials.token().unwrap_or_default();
    let transport = HttpTransport::new(&cli.api, &token);

    match run(&cli, &transport, &username).await {
        Ok(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        Err(e) => {
            error!(error = %e, "command failed");
            std::process::exit(1);
        }
    }

    if cli.save_secrets {
        credentials.save()?;
    }
    Ok(())
}
