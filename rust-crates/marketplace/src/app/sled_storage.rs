// Sled-backed storage implementation for players, inventories and listings.
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
use anyhow::{
    Context,
    anyhow,
};
use chrono::{
    DateTime,
    Utc,
};
use game_core::STARTING_BUBIX;
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use sled::{
    Config,
    Db,
    Tree,
};
use std::{
    collections::HashMap,
    path::Path,
};

const LAST_LISTING_ID_KEY: &[u8] = b"last_listing_id";

#[derive(Clone)]
pub struct SledMarketStorage {
    players_tree: Tree,
    inventory_tree: Tree,
    listings_tree: Tree,
    listings_meta: Tree,
}

impl SledMarketStorage {
    pub fn new(db: &Db) -> crate::Result<Self> {
        let players_tree = db.open_tree("players").context("open players tree")?;
        let inventory_tree = db.open_tree("inventory").context("open inventory tree")?;
        let listings_tree = db.open_tree("listings").context("open listings tree")?;
        let listings_meta = db
            .open_tree("listings_meta")
            .context("open listings_meta tree")?;

        Ok(Self {
            players_tree,
            inventory_tree,
            listings_tree,
            listings_meta,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let config = Config::default().path(path);
        let db = config.open().context("open sled database")?;
        Self::new(&db)
    }

    fn bubix(&self, player_id: &str) -> crate::Result<Option<i64>> {
        match self.players_tree.get(player_id.as_bytes())? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .context("player balance should be 8 bytes")?;
                Ok(Some(i64::from_be_bytes(arr)))
            }
            None => Ok(None),
        }
    }

    fn set_bubix(&self, player_id: &str, bubix: i64) -> crate::Result<()> {
        self.players_tree
            .insert(player_id.as_bytes(), bubix.to_be_bytes().as_slice())
            .context("write player balance")?;
        self.players_tree.flush().context("flush players tree")?;
        Ok(())
    }

    fn inventory_key(player_id: &str, booba_id: &str) -> Vec<u8> {
        format!("{player_id}|{booba_id}").into_bytes()
    }

    fn inventory_count(&self, player_id: &str, booba_id: &str) -> crate::Result<u32> {
        let key = Self::inventory_key(player_id, booba_id);
        match self.inventory_tree.get(key)? {
            Some(bytes) => {
                let arr: [u8; 4] = bytes
                    .as_ref()
                    .try_into()
                    .context("inventory count should be 4 bytes")?;
                Ok(u32::from_be_bytes(arr))
            }
            None => Ok(0),
        }
    }

    fn set_inventory_count(
        &self,
        player_id: &str,
        booba_id: &str,
        count: u32,
    ) -> crate::Result<()> {
        let key = Self::inventory_key(player_id, booba_id);
        if count == 0 {
            self.inventory_tree
                .remove(key)
                .context("remove empty inventory entry")?;
        } else {
            self.inventory_tree
                .insert(key, count.to_be_bytes().as_slice())
                .context("write inventory count")?;
        }
        self.inventory_tree.flush().context("flush inventory tree")?;
        Ok(())
    }

    fn listing(&self, listing_id: u64) -> crate::Result<Option<ListingRecord>> {
        let key = listing_id.to_be_bytes();
        let value = match self.listings_tree.get(key)? {
            Some(value) => value,
            None => return Ok(None),
        };
        let record = deserialize::<ListingRecord>(value.as_ref())?;
        Ok(Some(record))
    }

    fn allocate_listing_id(&self) -> crate::Result<u64> {
        let last = match self.listings_meta.get(LAST_LISTING_ID_KEY)? {
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_ref()
                    .try_into()
                    .context("last listing id should be 8 bytes")?;
                u64::from_be_bytes(arr)
            }
            None => 0,
        };
        let next = last
            .checked_add(1)
            .ok_or_else(|| anyhow!("listing id counter overflowed"))?;
        self.listings_meta
            .insert(LAST_LISTING_ID_KEY, next.to_be_bytes().as_slice())
            .context("write last listing id")?;
        self.listings_meta.flush().context("flush listings_meta tree")?;
        Ok(next)
    }

    fn remove_listing(&self, listing_id: u64) -> crate::Result<()> {
        self.listings_tree
            .remove(listing_id.to_be_bytes())
            .context("remove listing")?;
        self.listings_tree.flush().context("flush listings tree")?;
        Ok(())
    }

    fn serialize_record<T: Serialize>(value: &T, label: &str) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(value).with_context(|| format!("serialize {label}"))
    }
}

impl MarketStorage for SledMarketStorage {
    fn ensure_player(&mut self, player_id: &str) -> crate::Result<()> {
        if self.bubix(player_id)?.is_none() {
            self.set_bubix(player_id, STARTING_BUBIX)?;
        }
        Ok(())
    }

    fn player_overview(&self, player_id: &str) -> crate::Result<PlayerOverview> {
        let prefix = format!("{player_id}|");
        let mut inventory = Vec::new();
        for entry in self.inventory_tree.scan_prefix(prefix.as_bytes()) {
            let (key, value) = entry.context("iterate inventory entries")?;
            let key_str = std::str::from_utf8(key.as_ref())
                .context("inventory key is not valid UTF-8")?;
            let booba_id = key_str
                .strip_prefix(&prefix)
                .ok_or_else(|| anyhow!("inventory key missing player prefix: {key_str}"))?;
            let arr: [u8; 4] = value
                .as_ref()
                .try_into()
                .context("inventory count should be 4 bytes")?;
            inventory.push(InventoryRow {
                booba_id: booba_id.to_string(),
                count: u32::from_be_bytes(arr),
            });
        }

        let bubix = self.bubix(player_id)?.unwrap_or(0);
        Ok(PlayerOverview { inventory, bubix })
    }

    fn listings(&self) -> crate::Result<Vec<ListingRecord>> {
        let mut records = Vec::new();
        for entry in self.listings_tree.iter() {
            let (_, value) = entry.context("iterate listings")?;
            let record = deserialize::<ListingRecord>(value.as_ref())?;
            records.push(record);
        }
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
        self.set_bubix(player_id, bubix)?;
        for (booba_id, count) in inventory {
            if *count == 0 {
                continue;
            }
            self.set_inventory_count(player_id, booba_id, *count)?;
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
        let count = self.inventory_count(player_id, booba_id)?;
        if count < 1 {
            return Ok(SellOutcome::NotEnoughItems);
        }

        self.set_inventory_count(player_id, booba_id, count - 1)?;
        let listing_id = self.allocate_listing_id()?;
        let record = ListingRecord {
            listing_id,
            seller_id: player_id.to_string(),
            booba_id: booba_id.to_string(),
            price,
            created_at,
        };
        let bytes = Self::serialize_record(&record, "listing record")?;
        self.listings_tree
            .insert(listing_id.to_be_bytes(), bytes)
            .context("persist listing")?;
        self.listings_tree.flush().context("flush listings tree")?;
        Ok(SellOutcome::Listed { listing_id })
    }

    fn buy(&mut self, player_id: &str, listing_id: u64) -> crate::Result<BuyOutcome> {
        let Some(listing) = self.listing(listing_id)? else {
            return Ok(BuyOutcome::ListingNotFound);
        };
        if listing.seller_id == player_id {
            return Ok(BuyOutcome::OwnListing);
        }

        let price = listing.price as i64;
        let balance = self.bubix(player_id)?.unwrap_or(0);
        if balance < price {
            return Ok(BuyOutcome::NotEnoughBubix);
        }

        self.set_bubix(player_id, balance - price)?;
        // A seller without a balance row keeps none; the sale still completes.
        if let Some(seller_balance) = self.bubix(&listing.seller_id)? {
            self.set_bubix(&listing.seller_id, seller_balance + price)?;
        }
        let count = self.inventory_count(player_id, &listing.booba_id)?;
        self.set_inventory_count(player_id, &listing.booba_id, count + 1)?;
        self.remove_listing(listing_id)?;
        Ok(BuyOutcome::Bought {
            booba_id: listing.booba_id,
        })
    }

    fn cancel(
        &mut self,
        player_id: &str,
        listing_id: u64,
    ) -> crate::Result<CancelOutcome> {
        let Some(listing) = self.listing(listing_id)? else {
            return Ok(CancelOutcome::NotFound);
        };
        if listing.seller_id != player_id {
            return Ok(CancelOutcome::NotYours);
        }

        let count = self.inventory_count(player_id, &listing.booba_id)?;
        self.set_inventory_count(player_id, &listing.booba_id, count + 1)?;
        self.remove_listing(listing_id)?;
        Ok(CancelOutcome::Cancelled)
    }
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(bytes).context("deserialize sled record")
}
