use crate::market::{
    BuyOutcome,
    CancelOutcome,
    ListingRecord,
    PlayerOverview,
    SellOutcome,
};
use chrono::{
    DateTime,
    Utc,
};
use std::collections::HashMap;

/// Authoritative market state. The app loop serializes calls, so
/// implementations never see compound mutations interleave.
pub trait MarketStorage {
    /// create the player row with the starting balance when absent
    fn ensure_player(&mut self, player_id: &str) -> crate::Result<()>;

    /// inventory rows plus balance; unknown players read as empty and broke
    fn player_overview(&self, player_id: &str) -> crate::Result<PlayerOverview>;

    /// all active listings, newest first
    fn listings(&self) -> crate::Result<Vec<ListingRecord>>;

    /// adopt client-reported state: overwrite the balance and upsert every
    /// positive count. Zero counts are skipped, never deleted.
    fn sync(
        &mut self,
        player_id: &str,
        bubix: i64,
        inventory: &HashMap<String, u32>,
    ) -> crate::Result<()>;

    /// escrow one copy out of the seller's inventory and create a listing
    fn sell(
        &mut self,
        player_id: &str,
        booba_id: &str,
        price: u64,
        created_at: DateTime<Utc>,
    ) -> crate::Result<SellOutcome>;

    /// transfer the price to the seller and the item to the buyer
    fn buy(&mut self, player_id: &str, listing_id: u64) -> crate::Result<BuyOutcome>;

    /// delete the listing and return the escrowed copy to the seller
    fn cancel(
        &mut self,
        player_id: &str,
        listing_id: u64,
    ) -> crate::Result<CancelOutcome>;
}
