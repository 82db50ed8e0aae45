use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "sentinel-cli")]
#[command(about = "Operator CLI for sentinel-rpc", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8545")]
    url: String,

    /// Admin API key
    #[arg(short, long, env = "SENTINEL_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show gate status and policy
    Status,
    /// List staged transactions
    Pending,
    /// List cached intents
    Intents,
    /// Record an intent for this machine's next transaction
    Intent {
        /// What the next transaction is meant to do
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Status => admin_get(&client, &cli.url, "status", headers).await?,
        Commands::Pending => admin_get(&client, &cli.url, "pending", headers).await?,
        Commands::Intents => admin_get(&client, &cli.url, "intents", headers).await?,
        Commands::Intent { text } => {
            client
                .post(format!("{}/intents", cli.url))
                .json(&json!({ "intent": text }))
                .send()
                .await?
        }
    };
    print_response(res).await
}

async fn admin_get(
    client: &reqwest::Client,
    base: &str,
    path: &str,
    headers: HeaderMap,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .get(format!("{}/admin/{}", base, path))
        .headers(headers)
        .send()
        .await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: sentinel returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
