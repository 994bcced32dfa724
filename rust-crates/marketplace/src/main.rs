use anyhow::Context;
use clap::Parser;
use marketplace::app::{
    App,
    RunState,
    actix_market_api::ActixMarketApi,
    init_tracing,
    sled_storage::SledMarketStorage,
};
use std::{
    env::current_dir,
    fs,
    path::PathBuf,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port for the HTTP API; an ephemeral port is picked when omitted.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for the sled database; defaults to ./marketplace_data.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(short, long, default_value = "false")]
    tracing: bool,
}

async fn handle_interupt() {
    let res = tokio::signal::ctrl_c().await;
    match res {
        Ok(_) => {
            tracing::info!("Received interrupt, exiting");
        }
        Err(_) => {
            tracing::warn!("Received interrupt error, exiting anyway");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.tracing {
        init_tracing();
    }

    let storage_path = match &args.data_dir {
        Some(path) => path.clone(),
        None => current_dir()
            .context("determine process working directory")?
            .join("marketplace_data"),
    };
    fs::create_dir_all(&storage_path)?;
    tracing::info!("Using sled storage directory: {}", storage_path.display());

    let storage = SledMarketStorage::open(&storage_path)?;
    let api = ActixMarketApi::new(args.port).await?;
    let mut app = App::new(api, storage);

    tracing::info!("Starting marketplace service");
    loop {
        let interrupt = handle_interupt();
        match app.run(interrupt).await? {
            RunState::Continue => continue,
            RunState::Exit => {
                tracing::info!("Exiting marketplace service");
                return Ok(());
            }
        }
    }
}
