#![allow(non_snake_case)]

use chrono::Utc;
use client::{
    controller::LedgerController,
    remote::MarketplaceClient,
    store::LocalStore,
};
use game_core::{
    catalog::default_catalog,
    ledger::PlayerState,
};
use marketplace::{
    app::storage::MarketStorage,
    market::InventoryRow,
    test_helpers::TestMarket,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::collections::HashMap;
use tempdir::TempDir;

fn controller_for(market: &TestMarket, dir: &TempDir, seed: u64) -> LedgerController {
    let store = LocalStore::open(dir.path()).unwrap();
    let remote = MarketplaceClient::new(market.base_url()).unwrap();
    LedgerController::new(
        store,
        remote,
        default_catalog().to_vec(),
        StdRng::seed_from_u64(seed),
    )
    .unwrap()
}

#[tokio::test]
async fn load_state__server_inventory_wins_over_local() {
    let market = TestMarket::new().await;
    let dir = TempDir::new("state-sync").unwrap();
    let mut controller = controller_for(&market, &dir, 11);

    // given: the server already holds state for this player
    let inventory = HashMap::from([("cool-booba".to_string(), 3u32)]);
    let mut storage = market.storage();
    storage.sync(&controller.player_id, 575, &inventory).unwrap();

    // when
    controller.load_state().await.unwrap();

    // then
    assert_eq!(controller.state().bubix, 575);
    let entry = &controller.state().collection["cool-booba"];
    assert_eq!(entry.count, 3);
    assert_eq!(entry.name, "Cool Booba");
}

#[tokio::test]
async fn load_state__pushes_a_local_ledger_to_an_empty_server() {
    let market = TestMarket::new().await;
    let dir = TempDir::new("state-sync").unwrap();

    // given: a ledger built up while the server knew nothing
    let catalog = default_catalog();
    let store = LocalStore::open(dir.path()).unwrap();
    let mut state = PlayerState::new();
    state.record_opening(&catalog[0], Utc::now());
    store.persist(&state).unwrap();
    drop(store);

    let mut controller = controller_for(&market, &dir, 5);

    // when
    controller.load_state().await.unwrap();

    // then
    let overview = market
        .storage()
        .player_overview(&controller.player_id)
        .unwrap();
    assert_eq!(overview.bubix, state.bubix);
    assert_eq!(
        overview.inventory,
        vec![InventoryRow {
            booba_id: "cool-booba".to_string(),
            count: 1,
        }],
    );
}

#[tokio::test]
async fn load_state__reloading_is_a_no_op() {
    let market = TestMarket::new().await;
    let dir = TempDir::new("state-sync").unwrap();
    let mut controller = controller_for(&market, &dir, 17);

    // given
    let inventory = HashMap::from([("sad-booba".to_string(), 2u32)]);
    let mut storage = market.storage();
    storage.sync(&controller.player_id, 300, &inventory).unwrap();
    controller.load_state().await.unwrap();
    let first_pass = controller.state().clone();

    // when
    controller.load_state().await.unwrap();

    // then: unlock stamps included, nothing moved
    assert_eq!(controller.state(), &first_pass);
}
