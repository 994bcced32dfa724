use crate::market::{
    BuyOutcome,
    CancelOutcome,
    ListingRecord,
    PlayerOverview,
    SellOutcome,
};
use std::collections::HashMap;
use tokio::sync::oneshot;

pub trait MarketAPI {
    fn request(&mut self) -> impl Future<Output = crate::Result<Request>>;
}

/// One decoded HTTP request, paired with the channel its reply goes back on.
#[derive(Debug)]
pub enum Request {
    Inventory(InventoryRequest),
    Listings(oneshot::Sender<Vec<ListingRecord>>),
    Sync(SyncRequest),
    Sell(SellRequest),
    Buy(BuyRequest),
    Cancel(CancelRequest),
}

#[derive(Debug)]
pub struct InventoryRequest {
    pub player_id: String,
    pub reply: oneshot::Sender<PlayerOverview>,
}

#[derive(Debug)]
pub struct SyncRequest {
    pub player_id: String,
    pub bubix: i64,
    pub inventory: HashMap<String, u32>,
    pub reply: oneshot::Sender<()>,
}

#[derive(Debug)]
pub struct SellRequest {
    pub player_id: String,
    pub booba_id: String,
    pub price: u64,
    pub reply: oneshot::Sender<SellOutcome>,
}

#[derive(Debug)]
pub struct BuyRequest {
    pub player_id: String,
    pub listing_id: u64,
    pub reply: oneshot::Sender<BuyOutcome>,
}

#[derive(Debug)]
pub struct CancelRequest {
    pub player_id: String,
    pub listing_id: u64,
    pub reply: oneshot::Sender<CancelOutcome>,
}
