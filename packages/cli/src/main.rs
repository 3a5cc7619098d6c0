use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cap_server::config::Config;

#[derive(Parser)]
#[command(name = "cap-server")]
#[command(about = "Critical Action Point records server")]
#[command(version)]
struct Cli {
    #[arg(
        long,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Port to listen on (overrides PORT)"
    )]
    port: Option<u16>,

    #[arg(long, help = "SQLite database file (overrides CAP_DATABASE_PATH)")]
    database_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(path) = cli.database_path {
        config.database_path = path;
    }

    cap_server::run_server(config).await
}
