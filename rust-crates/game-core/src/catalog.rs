use serde::{
    Deserialize,
    Serialize,
};

/// Price of opening a single case, in bubix.
pub const CASE_COST: i64 = 50;

/// Balance granted to a brand-new player.
pub const STARTING_BUBIX: i64 = 200;

/// Variants are declared in display order, rarest first, so the derived `Ord`
/// is the sort order for collection views.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Legendary,
    Rare,
    Common,
    Invisible,
}

impl Rarity {
    pub fn label(&self) -> &'static str {
        match self {
            Rarity::Legendary => "legendary",
            Rarity::Rare => "rare",
            Rarity::Common => "common",
            Rarity::Invisible => "invisible",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: &'static str,
    pub name: &'static str,
    pub rarity: Rarity,
    pub image: Option<&'static str>,
    /// Draw weight in percentage points.
    pub chance: f64,
    /// Bubix credited when the item is pulled. May be negative.
    pub reward: i64,
}

pub const DEFAULT_CATALOG: [CatalogItem; 6] = [
    CatalogItem {
        id: "cool-booba",
        name: "Cool Booba",
        rarity: Rarity::Legendary,
        image: Some(
            "https://cdn.poehali.dev/files/bbc52363-7edd-421d-b704-16291f10f9b4.jpg",
        ),
        chance: 5.0,
        reward: 500,
    },
    CatalogItem {
        id: "laughing-booba",
        name: "Laughing Booba",
        rarity: Rarity::Rare,
        image: Some(
            "https://cdn.poehali.dev/files/328f4730-f1e2-45c6-bc03-ca94d18b5ffd.jpg",
        ),
        chance: 13.0,
        reward: 150,
    },
    CatalogItem {
        id: "sad-booba",
        name: "Sad Booba",
        rarity: Rarity::Rare,
        image: Some(
            "https://cdn.poehali.dev/files/5f53971d-d15f-4de0-9a09-f5a52d8991c5.jpg",
        ),
        chance: 10.0,
        reward: 150,
    },
    CatalogItem {
        id: "invisible-booba",
        name: "Invisible Booba",
        rarity: Rarity::Invisible,
        image: None,
        chance: 7.0,
        reward: -30,
    },
    CatalogItem {
        id: "regular-booba",
        name: "Regular Booba",
        rarity: Rarity::Common,
        image: Some(
            "https://cdn.poehali.dev/files/506d5ba0-644a-4c64-a200-0715bb43c72b.jpg",
        ),
        chance: 45.0,
        reward: 90,
    },
    CatalogItem {
        id: "sleepy-booba",
        name: "Sleepy Booba",
        rarity: Rarity::Common,
        image: Some(
            "https://cdn.poehali.dev/files/559f0072-6940-41a7-b372-f0dd81de24e5.jpg",
        ),
        chance: 20.0,
        reward: 90,
    },
];

pub fn default_catalog() -> &'static [CatalogItem] {
    &DEFAULT_CATALOG
}

pub fn find_item<'a>(catalog: &'a [CatalogItem], id: &str) -> Option<&'a CatalogItem> {
    catalog.iter().find(|item| item.id == id)
}
