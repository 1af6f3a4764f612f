use clap::Parser;
use env_logger::Env;

use serial_terminal::app::{self, Cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    app::run(cli).await?;
    Ok(())
}
