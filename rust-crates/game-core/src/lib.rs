pub mod catalog;

pub mod ledger;

pub mod resolver;

pub use catalog::{
    CASE_COST,
    CatalogItem,
    DEFAULT_CATALOG,
    Rarity,
    STARTING_BUBIX,
    default_catalog,
    find_item,
};
pub use ledger::{
    CollectionEntry,
    CollectionStats,
    LedgerError,
    PlayerState,
};
