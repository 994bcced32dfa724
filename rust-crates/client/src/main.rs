use clap::{
    Parser,
    Subcommand,
};
use client::{
    controller::LedgerController,
    remote::{
        DEFAULT_MARKETPLACE_URL,
        MarketplaceClient,
    },
    store::LocalStore,
};
use color_eyre::eyre::Result;
use game_core::default_catalog;
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::{
    env::current_dir,
    fs,
    path::PathBuf,
    time::Duration,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Marketplace endpoint to sync against.
    #[arg(long, default_value = DEFAULT_MARKETPLACE_URL)]
    server_url: String,

    /// Directory for the local player cache; defaults to ./booba_data.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Seed for the case-opening RNG, useful for reproducible sessions.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long, default_value = "false")]
    tracing: bool,

    /// Skip the case-opening suspense delays.
    #[arg(long, default_value = "false")]
    fast: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open one or more cases.
    Open {
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Show the collection, rarest first.
    Collection,
    /// Collection statistics.
    Stats,
    /// Browse the marketplace listings.
    Listings,
    /// List one owned item for sale.
    Sell { booba_id: String, price: u64 },
    /// Buy a listing by id.
    Buy { listing_id: u64 },
    /// Cancel one of your listings and reclaim the item.
    Cancel { listing_id: u64 },
    /// Push the local ledger to the server.
    Sync,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    if args.tracing {
        init_tracing();
    }

    let data_dir = match &args.data_dir {
        Some(path) => path.clone(),
        None => current_dir()?.join("booba_data"),
    };
    fs::create_dir_all(&data_dir)?;

    let store = LocalStore::open(&data_dir)?;
    let remote = MarketplaceClient::new(args.server_url)?;
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut controller =
        LedgerController::new(store, remote, default_catalog().to_vec(), rng)?;

    controller.load_state().await?;
    tracing::info!("{}", controller.status);

    match args.command {
        Command::Open { count } => open_cases(&mut controller, count, args.fast).await?,
        Command::Collection => print_collection(&controller),
        Command::Stats => print_stats(&controller),
        Command::Listings => {
            controller.refresh_listings().await?;
            print_listings(&controller);
        }
        Command::Sell { booba_id, price } => {
            let listing_id = controller.sell_item(&booba_id, price).await?;
            println!("Listed {booba_id} as listing #{listing_id} for {price} bubix");
        }
        Command::Buy { listing_id } => {
            let booba_id = controller.buy_listing(listing_id).await?;
            println!(
                "Bought {booba_id}; balance is now {} bubix",
                controller.state().bubix
            );
        }
        Command::Cancel { listing_id } => {
            controller.cancel_listing(listing_id).await?;
            println!("Cancelled listing #{listing_id}; the item is back in your collection");
        }
        Command::Sync => {
            controller.sync_now().await?;
            println!("Pushed state for {}", controller.player_id);
        }
    }

    Ok(())
}

async fn open_cases(
    controller: &mut LedgerController,
    count: u32,
    fast: bool,
) -> Result<()> {
    for opened in 0..count {
        if opened > 0 && !fast {
            tokio::time::sleep(Duration::from_millis(800)).await;
        }
        println!("Opening case ({} bubix)...", game_core::CASE_COST);
        if !fast {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let opening = controller.open_case().await?;
        let sign = if opening.item.reward < 0 { "" } else { "+" };
        println!(
            "  {} [{}] {}{} bubix (balance {})",
            opening.item.name,
            opening.item.rarity.label(),
            sign,
            opening.item.reward,
            opening.balance,
        );
    }
    Ok(())
}

fn print_collection(controller: &LedgerController) {
    let state = controller.state();
    println!(
        "Collection of {} ({} bubix):",
        controller.player_id, state.bubix
    );
    let entries = state.sorted_entries();
    if entries.is_empty() {
        println!("  nothing unpacked yet");
        return;
    }
    for (id, entry) in entries {
        println!(
            "  x{:<3} {} [{}] ({})",
            entry.count,
            entry.name,
            entry.rarity.label(),
            id,
        );
    }
}

fn print_stats(controller: &LedgerController) {
    let state = controller.state();
    let stats = controller.stats();
    println!("Balance:       {} bubix", state.bubix);
    println!("Cases opened:  {}", state.total_opened);
    println!("Total items:   {}", stats.total_items);
    println!("Unique items:  {}", stats.unique_items);
    println!("Legendary:     {}", stats.legendary);
    println!("Rare:          {}", stats.rare);
    println!("Common:        {}", stats.common);
}

fn print_listings(controller: &LedgerController) {
    let listings = controller.listings();
    if listings.is_empty() {
        println!("No active listings");
        return;
    }
    println!("Active listings:");
    for listing in listings {
        let owner = if listing.is_mine { " (yours)" } else { "" };
        println!(
            "  #{:<4} {} for {} bubix by {}{}",
            listing.listing_id,
            listing.name,
            listing.price,
            listing.seller_id,
            owner,
        );
    }
}
