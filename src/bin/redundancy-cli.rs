use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "redundancy-cli")]
#[command(about = "Operator CLI for the database redundancy manager", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// API key, when the service requires one.
    #[arg(short, long, env = "DB_ADMIN_API_KEY")]
    key: Option<String>,

    /// Operator identity recorded with every action.
    #[arg(short, long, env = "USER", default_value = "cli")]
    operator: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show store health, the active store and sync status
    Health,
    /// Copy the active store's rows to the other store now
    Sync,
    /// Switch to the secondary store now
    Failover,
    /// Switch back to the primary store now
    Failback,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    }

    let action = match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            return print_response(res).await;
        }
        Commands::Sync => "db-sync",
        Commands::Failover => "db-failover",
        Commands::Failback => "db-failback",
    };

    let res = client
        .post(format!("{}/{action}", cli.url))
        .headers(headers)
        .json(&json!({ "operatorId": cli.operator }))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{body}");
        Ok(())
    } else {
        eprintln!("Error: redundancy API returned status {status}");
        eprintln!("{body}");
        std::process::exit(1);
    }
}
