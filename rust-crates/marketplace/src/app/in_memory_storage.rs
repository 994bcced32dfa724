use crate::{
    app::storage::MarketStorage,
    market::{
        BuyOutcome,
        CancelOutcome,
        InventoryRow,
        ListingRecord,
        PlayerOverview,
        SellOutcome,
    },
};
use chrono::{
    DateTime,
    Utc,
};
use game_core::STARTING_BUBIX;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
};

#[derive(Clone)]
pub struct InMemoryMarketStorage {
    players: Arc<Mutex<HashMap<String, i64>>>,
    inventory: Arc<Mutex<HashMap<String, HashMap<String, u32>>>>,
    listings: Arc<Mutex<Vec<ListingRecord>>>,
    last_listing_id: Arc<Mutex<u64>>,
}

impl InMemoryMarketStorage {
    pub fn new() -> Self {
        Self {
            players: Arc::new(Mutex::new(HashMap::new())),
            inventory: Arc::new(Mutex::new(HashMap::new())),
            listings: Arc::new(Mutex::new(Vec::new())),
            last_listing_id: Arc::new(Mutex::new(0)),
        }
    }
}

impl Default for InMemoryMarketStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketStorage for InMemoryMarketStorage {
    fn ensure_player(&mut self, player_id: &str) -> crate::Result<()> {
        self.players
            .lock()
            .unwrap()
            .entry(player_id.to_string())
            .or_insert(STARTING_BUBIX);
        Ok(())
    }

    fn player_overview(&self, player_id: &str) -> crate::Result<PlayerOverview> {
        let mut inventory: Vec<InventoryRow> = self
            .inventory
            .lock()
            .unwrap()
            .get(player_id)
            .map(|counts| {
                counts
                    .iter()
                    .map(|(booba_id, count)| InventoryRow {
                        booba_id: booba_id.clone(),
                        count: *count,
                    })
                    .collect()
            })
            .unwrap_or_default();
        inventory.sort_by(|a, b| a.booba_id.cmp(&b.booba_id));

        let bubix = self
            .players
            .lock()
            .unwrap()
            .get(player_id)
            .copied()
            .unwrap_or(0);
        Ok(PlayerOverview { inventory, bubix })
    }

    fn listings(&self) -> crate::Result<Vec<ListingRecord>> {
        let mut records = self.listings.lock().unwrap().clone();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.listing_id.cmp(&a.listing_id))
        });
        Ok(records)
    }

    fn sync(
        &mut self,
        player_id: &str,
        bubix: i64,
        inventory: &HashMap<String, u32>,
    ) -> crate::Result<()> {
        self.players
            .lock()
            .unwrap()
            .insert(player_id.to_string(), bubix);

        let mut guard = self.inventory.lock().unwrap();
        let counts = guard.entry(player_id.to_string()).or_default();
        for (booba_id, count) in inventory {
            if *count == 0 {
                continue;
            }
            counts.insert(booba_id.clone(), *count);
        }
        Ok(())
    }

    fn sell(
        &mut self,
        player_id: &str,
        booba_id: &str,
        price: u64,
        created_at: DateTime<Utc>,
    ) -> crate::Result<SellOutcome> {
        {
            let mut guard = self.inventory.lock().unwrap();
            let counts = guard.entry(player_id.to_string()).or_default();
            let count = counts.get(booba_id).copied().unwrap_or(0);
            if count < 1 {
                return Ok(SellOutcome::NotEnoughItems);
            }
            if count == 1 {
                counts.remove(booba_id);
            } else {
                counts.insert(booba_id.to_string(), count - 1);
            }
        }

        let listing_id = {
            let mut last = self.last_listing_id.lock().unwrap();
            *last += 1;
            *last
        };
        self.listings.lock().unwrap().push(ListingRecord {
            listing_id,
            seller_id: player_id.to_string(),
            booba_id: booba_id.to_string(),
            price,
            created_at,
        });
        Ok(SellOutcome::Listed { listing_id })
    }

    fn buy(&mut self, player_id: &str, listing_id: u64) -> crate::Result<BuyOutcome> {
        let listing = {
            let guard = self.listings.lock().unwrap();
            match guard.iter().find(|record| record.listing_id == listing_id) {
                Some(record) => record.clone(),
                None => return Ok(BuyOutcome::ListingNotFound),
            }
        };
        if listing.seller_id == player_id {
            return Ok(BuyOutcome::OwnListing);
        }

        let price = listing.price as i64;
        {
            let mut players = self.players.lock().unwrap();
            let balance = players.get(player_id).copied().unwrap_or(0);
            if balance < price {
                return Ok(BuyOutcome::NotEnoughBubix);
            }
            players.insert(player_id.to_string(), balance - price);
            // A seller without a balance row keeps none; the sale still completes.
            if let Some(seller_balance) = players.get_mut(&listing.seller_id) {
                *seller_balance += price;
            }
        }

        {
            let mut guard = self.inventory.lock().unwrap();
            let counts = guard.entry(player_id.to_string()).or_default();
            *counts.entry(listing.booba_id.clone()).or_insert(0) += 1;
        }

        self.listings
            .lock()
            .unwrap()
            .retain(|record| record.listing_id != listing_id);
        Ok(BuyOutcome::Bought {
            booba_id: listing.booba_id,
        })
    }

    fn cancel(
        &mut self,
        player_id: &str,
        listing_id: u64,
    ) -> crate::Result<CancelOutcome> {
        let listing = {
            let guard = self.listings.lock().unwrap();
            match guard.iter().find(|record| record.listing_id == listing_id) {
                Some(record) => record.clone(),
                None => return Ok(CancelOutcome::NotFound),
            }
        };
        if listing.seller_id != player_id {
            return Ok(CancelOutcome::NotYours);
        }

        {
            let mut guard = self.inventory.lock().unwrap();
            let counts = guard.entry(player_id.to_string()).or_default();
            *counts.entry(listing.booba_id).or_insert(0) += 1;
        }

        self.listings
            .lock()
            .unwrap()
            .retain(|record| record.listing_id != listing_id);
        Ok(CancelOutcome::Cancelled)
    }
}
