use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use api_gateway::config::load_config;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the API gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:9001")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List compiled routes
    Routes,
    /// Show circuit breaker states
    Breakers,
    /// Validate a configuration file without starting the gateway
    Validate { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let endpoint = match &cli.command {
        Commands::Status => "status",
        Commands::Routes => "routes",
        Commands::Breakers => "breakers",
        Commands::Validate { path } => {
            match load_config(path) {
                Ok(config) => println!(
                    "{}: OK ({} routes, {} breakers, {} fallbacks)",
                    path.display(),
                    config.routes.len(),
                    config.breakers.len(),
                    config.fallbacks.len()
                ),
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    std::process::exit(1);
                }
            }
            return Ok(());
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = reqwest::Client::new()
        .get(format!("{}/admin/{}", cli.url.trim_end_matches('/'), endpoint))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
