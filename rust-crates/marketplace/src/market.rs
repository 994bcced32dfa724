use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

/// An active sale offer. The listed copy is escrowed: it left the seller's
/// inventory when the listing was created and only returns on cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingRecord {
    pub listing_id: u64,
    pub seller_id: String,
    pub booba_id: String,
    pub price: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryRow {
    pub booba_id: String,
    pub count: u32,
}

/// Everything the server knows about one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOverview {
    pub inventory: Vec<InventoryRow>,
    pub bubix: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SellOutcome {
    Listed { listing_id: u64 },
    NotEnoughItems,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuyOutcome {
    Bought { booba_id: String },
    ListingNotFound,
    OwnListing,
    NotEnoughBubix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    NotFound,
    NotYours,
}
