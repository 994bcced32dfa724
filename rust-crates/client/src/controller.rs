use crate::{
    remote::{
        MarketplaceClient,
        RemoteError,
        RemoteInventory,
        RemoteListing,
    },
    store::LocalStore,
};
use chrono::Utc;
use color_eyre::eyre::Result;
use game_core::{
    CASE_COST,
    CatalogItem,
    CollectionEntry,
    CollectionStats,
    LedgerError,
    PlayerState,
    find_item,
};
use rand::rngs::StdRng;
use std::collections::HashMap;
use tracing::{
    debug,
    warn,
};

/// Outcome of one case opening.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseOpening {
    pub item: CatalogItem,
    pub balance: i64,
}

/// A listing as shown to the player, with ownership resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingView {
    pub listing_id: u64,
    pub seller_id: String,
    pub booba_id: String,
    pub name: String,
    pub price: u64,
    pub is_mine: bool,
}

/// Drives the player's ledger: every mutation commits locally first, then gets
/// pushed to the marketplace server on a best-effort basis. Marketplace trades
/// go the other way round, since the server owns listings and escrow.
pub struct LedgerController {
    pub player_id: String,
    pub status: String,
    state: PlayerState,
    catalog: Vec<CatalogItem>,
    store: LocalStore,
    remote: MarketplaceClient,
    rng: StdRng,
    cached_listings: Vec<RemoteListing>,
}

impl LedgerController {
    pub fn new(
        store: LocalStore,
        remote: MarketplaceClient,
        catalog: Vec<CatalogItem>,
        mut rng: StdRng,
    ) -> Result<Self> {
        let player_id = store.player_id(&mut rng)?;
        let state = store.load()?;
        Ok(Self {
            player_id,
            status: String::new(),
            state,
            catalog,
            store,
            remote,
            rng,
            cached_listings: Vec::new(),
        })
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn stats(&self) -> CollectionStats {
        self.state.stats()
    }

    /// Most recent listings snapshot, freshest first with ownership marked.
    pub fn listings(&self) -> Vec<ListingView> {
        self.cached_listings
            .iter()
            .map(|listing| ListingView {
                listing_id: listing.listing_id,
                seller_id: listing.seller_id.clone(),
                booba_id: listing.booba_id.clone(),
                name: find_item(&self.catalog, &listing.booba_id)
                    .map(|item| item.name.to_string())
                    .unwrap_or_else(|| listing.booba_id.clone()),
                price: listing.price,
                is_mine: listing.seller_id == self.player_id,
            })
            .collect()
    }

    /// Open one case: pay the cost, draw an item, bank its reward, persist,
    /// then push the new state to the server.
    pub async fn open_case(&mut self) -> Result<CaseOpening> {
        if !self.state.can_open() {
            return Err(LedgerError::InsufficientBubix {
                balance: self.state.bubix,
                cost: CASE_COST,
            }
            .into());
        }

        let item = game_core::resolver::draw(&self.catalog, &mut self.rng).clone();
        self.state.record_opening(&item, Utc::now());
        self.store.persist(&self.state)?;
        self.push_sync().await;

        self.set_status(format!("Unpacked {}", item.name));
        Ok(CaseOpening {
            balance: self.state.bubix,
            item,
        })
    }

    /// List one owned copy for sale. The server escrows the copy, so it leaves
    /// the local collection only once the server acknowledges the listing.
    pub async fn sell_item(&mut self, booba_id: &str, price: u64) -> Result<u64> {
        if price < 1 {
            return Err(LedgerError::PriceTooLow.into());
        }

        let listing_id = self.remote.sell(&self.player_id, booba_id, price).await?;
        if self.state.remove_one(booba_id) {
            self.store.persist(&self.state)?;
        }
        if let Err(e) = self.refresh_listings().await {
            warn!("listing refresh after sell failed: {e:#}");
        }
        self.set_status(format!("Listed for {price} bubix"));
        Ok(listing_id)
    }

    /// Buy a listing. The balance check runs locally first so an obviously
    /// unaffordable purchase never reaches the server.
    pub async fn buy_listing(&mut self, listing_id: u64) -> Result<String> {
        if self.cached_listing(listing_id).is_none() {
            self.refresh_listings().await?;
        }
        let Some(listing) = self.cached_listing(listing_id).cloned() else {
            return Err(RemoteError::Rejected("Listing not found".to_string()).into());
        };
        if self.state.bubix < listing.price as i64 {
            return Err(LedgerError::CannotAfford {
                price: listing.price,
                balance: self.state.bubix,
            }
            .into());
        }

        let booba_id = self.remote.buy(&self.player_id, listing_id).await?;
        self.state.bubix -= listing.price as i64;
        if let Some(item) = find_item(&self.catalog, &booba_id) {
            self.state.grant(item, Utc::now());
        } else {
            warn!("bought unknown item {booba_id}; it will not appear in the collection");
        }
        self.store.persist(&self.state)?;
        self.push_sync().await;

        if let Err(e) = self.refresh_listings().await {
            warn!("listing refresh after purchase failed: {e:#}");
        }
        self.set_status("Purchase complete");
        Ok(booba_id)
    }

    /// Take a listing down again; the server returns the escrowed copy.
    pub async fn cancel_listing(&mut self, listing_id: u64) -> Result<()> {
        if self.cached_listing(listing_id).is_none() {
            self.refresh_listings().await?;
        }
        let cached = self.cached_listing(listing_id).cloned();
        self.remote.cancel(&self.player_id, listing_id).await?;

        if let Some(listing) = cached {
            if let Some(item) = find_item(&self.catalog, &listing.booba_id) {
                self.state.grant(item, Utc::now());
            } else {
                warn!(
                    "cancelled listing for unknown item {}; nothing restored locally",
                    listing.booba_id
                );
            }
            self.store.persist(&self.state)?;
            self.push_sync().await;
        }

        if let Err(e) = self.refresh_listings().await {
            warn!("listing refresh after cancellation failed: {e:#}");
        }
        self.set_status("Listing cancelled");
        Ok(())
    }

    /// Merge server state into the local ledger. A populated server inventory
    /// wins wholesale; otherwise the local ledger stands and is pushed up if it
    /// has anything to say. A failed request leaves the local state untouched.
    pub async fn load_state(&mut self) -> Result<()> {
        match self.remote.inventory(&self.player_id).await {
            Ok(remote) if !remote.items.is_empty() => {
                self.adopt_server_state(remote);
                self.store.persist(&self.state)?;
                self.set_status("Loaded state from server");
            }
            Ok(_) => {
                if !self.state.collection.is_empty() {
                    self.push_sync().await;
                }
                self.set_status("Server had no state; kept local ledger");
            }
            Err(e) => {
                warn!("state load failed, continuing with the local ledger: {e}");
                self.set_status("Offline; using local ledger");
            }
        }
        Ok(())
    }

    pub async fn refresh_listings(&mut self) -> Result<()> {
        let listings = self.remote.listings().await?;
        self.cached_listings = listings;
        Ok(())
    }

    /// Explicit push of the local ledger, surfacing any failure.
    pub async fn sync_now(&mut self) -> Result<()> {
        let inventory = self.inventory_counts();
        self.remote
            .sync(&self.player_id, self.state.bubix, &inventory)
            .await?;
        self.set_status("Ledger pushed to server");
        Ok(())
    }

    fn adopt_server_state(&mut self, remote: RemoteInventory) {
        let now = Utc::now();
        let mut collection = HashMap::new();
        for (booba_id, count) in remote.items {
            let Some(item) = find_item(&self.catalog, &booba_id) else {
                debug!("server reported unknown item {booba_id}; skipping");
                continue;
            };
            // Keep the locally recorded unlock time so re-loading is a no-op.
            let first_unlocked = self
                .state
                .collection
                .get(&booba_id)
                .map(|entry| entry.first_unlocked)
                .unwrap_or(now);
            collection.insert(
                booba_id,
                CollectionEntry {
                    name: item.name.to_string(),
                    rarity: item.rarity,
                    image: item.image.map(str::to_string),
                    count,
                    first_unlocked,
                },
            );
        }
        self.state.collection = collection;
        self.state.bubix = remote.bubix;
    }

    /// Best effort: the local ledger is authoritative, so a failed push only
    /// warns.
    async fn push_sync(&self) {
        let inventory = self.inventory_counts();
        if let Err(e) = self
            .remote
            .sync(&self.player_id, self.state.bubix, &inventory)
            .await
        {
            warn!("state sync failed: {e}");
        }
    }

    fn inventory_counts(&self) -> HashMap<String, u32> {
        self.state
            .collection
            .iter()
            .map(|(id, entry)| (id.clone(), entry.count))
            .collect()
    }

    fn cached_listing(&self, listing_id: u64) -> Option<&RemoteListing> {
        self.cached_listings
            .iter()
            .find(|listing| listing.listing_id == listing_id)
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }
}
