use crate::catalog::{
    CASE_COST,
    CatalogItem,
    Rarity,
    STARTING_BUBIX,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashMap;
use thiserror::Error;

/// Rejections raised before any state is touched. These are the messages the
/// presentation layer shows the player.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("not enough bubix to open a case (balance {balance}, cost {cost})")]
    InsufficientBubix { balance: i64, cost: i64 },
    #[error("ask price must be at least 1 bubix")]
    PriceTooLow,
    #[error("listing costs {price} bubix but balance is {balance}")]
    CannotAfford { price: u64, balance: i64 },
}

/// One owned item in the player's collection. `count` is at least 1; an entry
/// is removed outright when its last copy goes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionEntry {
    pub name: String,
    pub rarity: Rarity,
    pub image: Option<String>,
    pub count: u32,
    pub first_unlocked: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
    pub bubix: i64,
    pub total_opened: u32,
    pub collection: HashMap<String, CollectionEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionStats {
    pub total_items: u32,
    pub unique_items: usize,
    pub legendary: usize,
    pub rare: usize,
    pub common: usize,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            bubix: STARTING_BUBIX,
            total_opened: 0,
            collection: HashMap::new(),
        }
    }

    pub fn can_open(&self) -> bool {
        self.bubix >= CASE_COST
    }

    /// Apply a case opening: pay the cost, bank the reward, record the pull.
    /// The caller checks `can_open` first; the balance may still end up
    /// negative through a negative reward.
    pub fn record_opening(&mut self, item: &CatalogItem, now: DateTime<Utc>) {
        self.bubix += item.reward - CASE_COST;
        self.total_opened += 1;
        self.grant(item, now);
    }

    /// Add one copy of `item`, starting a new entry on the first copy.
    pub fn grant(&mut self, item: &CatalogItem, now: DateTime<Utc>) {
        self.collection
            .entry(item.id.to_string())
            .and_modify(|entry| entry.count += 1)
            .or_insert_with(|| CollectionEntry {
                name: item.name.to_string(),
                rarity: item.rarity,
                image: item.image.map(str::to_string),
                count: 1,
                first_unlocked: now,
            });
    }

    /// Remove one copy of `item_id`, dropping the entry entirely at zero.
    /// Returns `false` when the item is not in the collection.
    pub fn remove_one(&mut self, item_id: &str) -> bool {
        let Some(entry) = self.collection.get_mut(item_id) else {
            return false;
        };
        if entry.count > 1 {
            entry.count -= 1;
        } else {
            self.collection.remove(item_id);
        }
        true
    }

    pub fn stats(&self) -> CollectionStats {
        let total_items = self.collection.values().map(|entry| entry.count).sum();
        let by_rarity = |rarity: Rarity| {
            self.collection
                .values()
                .filter(|entry| entry.rarity == rarity)
                .count()
        };
        CollectionStats {
            total_items,
            unique_items: self.collection.len(),
            legendary: by_rarity(Rarity::Legendary),
            rare: by_rarity(Rarity::Rare),
            common: by_rarity(Rarity::Common),
        }
    }

    /// Collection entries ordered rarest first for display, name as tiebreak so
    /// the order is stable across hash-map iteration.
    pub fn sorted_entries(&self) -> Vec<(&str, &CollectionEntry)> {
        let mut entries: Vec<(&str, &CollectionEntry)> = self
            .collection
            .iter()
            .map(|(id, entry)| (id.as_str(), entry))
            .collect();
        entries.sort_by(|a, b| {
            a.1.rarity
                .cmp(&b.1.rarity)
                .then_with(|| a.1.name.cmp(&b.1.name))
        });
        entries
    }
}
