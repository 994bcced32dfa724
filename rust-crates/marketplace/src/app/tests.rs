#![allow(non_snake_case)]

use super::*;
use crate::{
    app::in_memory_storage::InMemoryMarketStorage,
    market::{
        BuyOutcome,
        CancelOutcome,
        SellOutcome,
    },
};
use anyhow::Result;

use game_core::STARTING_BUBIX;
use std::{
    collections::HashMap,
    future::pending,
};

pub struct FakeMarketApi {
    recv: tokio::sync::mpsc::Receiver<Request>,
}

impl FakeMarketApi {
    pub fn new_with_sender() -> (Self, tokio::sync::mpsc::Sender<Request>) {
        let (send, recv) = tokio::sync::mpsc::channel(10);
        let recv = FakeMarketApi { recv };
        (recv, send)
    }
}

impl MarketAPI for FakeMarketApi {
    async fn request(&mut self) -> Result<Request> {
        match self.recv.recv().await {
            Some(request) => Ok(request),
            None => Err(anyhow::anyhow!("no more requests")),
        }
    }
}

fn counts(pairs: &[(&str, u32)]) -> HashMap<String, u32> {
    pairs
        .iter()
        .map(|(id, count)| (id.to_string(), *count))
        .collect()
}

#[tokio::test]
async fn run__sync_request__provisions_and_overwrites_state() {
    // given
    let (api, request_sender) = FakeMarketApi::new_with_sender();
    let storage = InMemoryMarketStorage::new();
    let storage_copy = storage.clone();
    let mut app = App::new(api, storage);

    let (reply, reply_receiver) = oneshot::channel();
    let request = Request::Sync(SyncRequest {
        player_id: "player_aaa0aaa0a".to_string(),
        bubix: 135,
        inventory: counts(&[("cool-booba", 2)]),
        reply,
    });

    // when
    request_sender.send(request).await.unwrap();
    let state = app.run(pending()).await.unwrap();

    // then
    assert_eq!(state, RunState::Continue);
    reply_receiver.await.unwrap();

    let overview = storage_copy.player_overview("player_aaa0aaa0a").unwrap();
    assert_eq!(overview.bubix, 135);
    assert_eq!(overview.inventory[0].booba_id, "cool-booba");
    assert_eq!(overview.inventory[0].count, 2);
}

#[tokio::test]
async fn run__sell_request__escrows_the_copy_and_replies() {
    // given
    let (api, request_sender) = FakeMarketApi::new_with_sender();
    let mut storage = InMemoryMarketStorage::new();
    storage
        .sync("player_aaa0aaa0a", 200, &counts(&[("sad-booba", 1)]))
        .unwrap();
    let storage_copy = storage.clone();
    let mut app = App::new(api, storage);

    let (reply, reply_receiver) = oneshot::channel();
    let request = Request::Sell(SellRequest {
        player_id: "player_aaa0aaa0a".to_string(),
        booba_id: "sad-booba".to_string(),
        price: 40,
        reply,
    });

    // when
    request_sender.send(request).await.unwrap();
    app.run(pending()).await.unwrap();

    // then
    let outcome = reply_receiver.await.unwrap();
    assert_eq!(outcome, SellOutcome::Listed { listing_id: 1 });

    let overview = storage_copy.player_overview("player_aaa0aaa0a").unwrap();
    assert!(overview.inventory.is_empty());
    assert_eq!(storage_copy.listings().unwrap().len(), 1);
}

#[tokio::test]
async fn run__buy_request__moves_funds_between_players() {
    // given
    let (api, request_sender) = FakeMarketApi::new_with_sender();
    let mut storage = InMemoryMarketStorage::new();
    storage
        .sync("player_seller000", 200, &counts(&[("cool-booba", 1)]))
        .unwrap();
    storage
        .sell("player_seller000", "cool-booba", 60, Utc::now())
        .unwrap();
    let storage_copy = storage.clone();
    let mut app = App::new(api, storage);

    let (reply, reply_receiver) = oneshot::channel();
    let request = Request::Buy(BuyRequest {
        player_id: "player_buyer0000".to_string(),
        listing_id: 1,
        reply,
    });

    // when
    request_sender.send(request).await.unwrap();
    app.run(pending()).await.unwrap();

    // then the buyer was provisioned on first contact, then debited
    let outcome = reply_receiver.await.unwrap();
    assert_eq!(
        outcome,
        BuyOutcome::Bought {
            booba_id: "cool-booba".to_string(),
        }
    );

    let buyer = storage_copy.player_overview("player_buyer0000").unwrap();
    assert_eq!(buyer.bubix, STARTING_BUBIX - 60);
    assert_eq!(buyer.inventory[0].count, 1);

    let seller = storage_copy.player_overview("player_seller000").unwrap();
    assert_eq!(seller.bubix, 260);
}

#[tokio::test]
async fn run__cancel_request__returns_the_escrowed_copy() {
    // given
    let (api, request_sender) = FakeMarketApi::new_with_sender();
    let mut storage = InMemoryMarketStorage::new();
    storage
        .sync("player_aaa0aaa0a", 200, &counts(&[("sleepy-booba", 1)]))
        .unwrap();
    storage
        .sell("player_aaa0aaa0a", "sleepy-booba", 25, Utc::now())
        .unwrap();
    let storage_copy = storage.clone();
    let mut app = App::new(api, storage);

    let (reply, reply_receiver) = oneshot::channel();
    let request = Request::Cancel(CancelRequest {
        player_id: "player_aaa0aaa0a".to_string(),
        listing_id: 1,
        reply,
    });

    // when
    request_sender.send(request).await.unwrap();
    app.run(pending()).await.unwrap();

    // then
    let outcome = reply_receiver.await.unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);

    let overview = storage_copy.player_overview("player_aaa0aaa0a").unwrap();
    assert_eq!(overview.inventory[0].count, 1);
    assert!(storage_copy.listings().unwrap().is_empty());
}

#[tokio::test]
async fn run__interrupt__exits_cleanly() {
    // given
    let (api, _request_sender) = FakeMarketApi::new_with_sender();
    let storage = InMemoryMarketStorage::new();
    let mut app = App::new(api, storage);

    // when
    let state = app.run(std::future::ready(())).await.unwrap();

    // then
    assert_eq!(state, RunState::Exit);
}

#[tokio::test]
async fn run__closed_request_channel__exits() {
    // given
    let (api, request_sender) = FakeMarketApi::new_with_sender();
    let storage = InMemoryMarketStorage::new();
    let mut app = App::new(api, storage);
    drop(request_sender);

    // when
    let state = app.run(pending()).await.unwrap();

    // then
    assert_eq!(state, RunState::Exit);
}
