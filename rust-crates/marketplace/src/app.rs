use crate::{
    Result,
    app::{
        market_api::{
            BuyRequest,
            CancelRequest,
            InventoryRequest,
            MarketAPI,
            Request,
            SellRequest,
            SyncRequest,
        },
        storage::MarketStorage,
    },
};
use chrono::Utc;
use tokio::sync::oneshot;

pub mod actix_market_api;
pub mod in_memory_storage;
pub mod market_api;
pub mod sled_storage;
pub mod storage;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Continue,
    Exit,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

pub struct App<API, Storage> {
    api: API,
    storage: Storage,
}

impl<API, Storage> App<API, Storage> {
    pub fn new(api: API, storage: Storage) -> Self {
        Self { api, storage }
    }
}

impl<API: MarketAPI, Storage: MarketStorage> App<API, Storage> {
    /// Serve one request or exit on interrupt. Every storage mutation funnels
    /// through here one at a time, so compound updates never interleave.
    pub async fn run(
        &mut self,
        interrupt: impl Future<Output = ()>,
    ) -> Result<RunState> {
        tokio::select! {
            request = self.api.request() => {
                match request {
                    Ok(request) => {
                        if let Err(e) = self.handle_request(request) {
                            tracing::error!("request handling failed: {e:#}");
                        }
                        Ok(RunState::Continue)
                    }
                    Err(e) => {
                        tracing::warn!("request channel closed: {e:#}");
                        Ok(RunState::Exit)
                    }
                }
            }
            _ = interrupt => {
                Ok(RunState::Exit)
            }
        }
    }

    // A failed storage call drops the responder, which the HTTP edge reports
    // as an internal error.
    fn handle_request(&mut self, request: Request) -> Result<()> {
        match request {
            Request::Inventory(InventoryRequest { player_id, reply }) => {
                let overview = self.storage.player_overview(&player_id)?;
                respond(reply, overview);
            }
            Request::Listings(reply) => {
                let listings = self.storage.listings()?;
                respond(reply, listings);
            }
            Request::Sync(SyncRequest {
                player_id,
                bubix,
                inventory,
                reply,
            }) => {
                self.storage.ensure_player(&player_id)?;
                self.storage.sync(&player_id, bubix, &inventory)?;
                tracing::debug!("synced state for {player_id}");
                respond(reply, ());
            }
            Request::Sell(SellRequest {
                player_id,
                booba_id,
                price,
                reply,
            }) => {
                self.storage.ensure_player(&player_id)?;
                let outcome =
                    self.storage.sell(&player_id, &booba_id, price, Utc::now())?;
                respond(reply, outcome);
            }
            Request::Buy(BuyRequest {
                player_id,
                listing_id,
                reply,
            }) => {
                self.storage.ensure_player(&player_id)?;
                let outcome = self.storage.buy(&player_id, listing_id)?;
                respond(reply, outcome);
            }
            Request::Cancel(CancelRequest {
                player_id,
                listing_id,
                reply,
            }) => {
                let outcome = self.storage.cancel(&player_id, listing_id)?;
                respond(reply, outcome);
            }
        }
        Ok(())
    }
}

fn respond<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        tracing::warn!("requester dropped before the reply was sent");
    }
}
