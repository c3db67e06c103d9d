use clap::Parser;
use color_eyre::eyre::Result;
use raffle_entrance::{
    cli::Args,
    client,
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    logging::init_tracing(&args.log_dir)?;
    tracing::info!("starting raffle-entrance client");
    let app_config = args.into_config()?;
    client::run_app(app_config).await
}
