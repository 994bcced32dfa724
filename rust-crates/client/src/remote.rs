use chrono::{
    DateTime,
    Utc,
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    fmt,
};
use thiserror::Error;

/// Production marketplace endpoint. Override with `--server-url` to point the
/// client at a locally running server.
pub const DEFAULT_MARKETPLACE_URL: &str =
    "https://functions.poehali.dev/eb27b962-8c84-415e-afc2-2225a4581d70";

#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server understood the request and turned it down.
    #[error("{0}")]
    Rejected(String),
    #[error("marketplace request failed")]
    Transport(#[source] reqwest::Error),
    #[error("invalid marketplace payload")]
    InvalidPayload(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteInventory {
    pub items: HashMap<String, u32>,
    pub bubix: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteListing {
    pub listing_id: u64,
    pub seller_id: String,
    pub booba_id: String,
    pub price: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MarketplaceClient {
    base_url: String,
    http: reqwest::Client,
}

impl MarketplaceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .map_err(RemoteError::Transport)?;
        Ok(Self { base_url, http })
    }

    pub async fn inventory(
        &self,
        player_id: &str,
    ) -> Result<RemoteInventory, RemoteError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[("action", "inventory"), ("player_id", player_id)])
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        let dto: InventoryDto = parse_response(res).await?;
        Ok(dto.into())
    }

    pub async fn listings(&self) -> Result<Vec<RemoteListing>, RemoteError> {
        let res = self
            .http
            .get(&self.base_url)
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        let dto: ListingsDto = parse_response(res).await?;
        Ok(dto.listings.into_iter().map(Into::into).collect())
    }

    pub async fn sync(
        &self,
        player_id: &str,
        bubix: i64,
        inventory: &HashMap<String, u32>,
    ) -> Result<(), RemoteError> {
        let res = self
            .http
            .post(&self.base_url)
            .json(&SyncBody {
                action: "sync",
                player_id,
                bubix,
                inventory,
            })
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        let _: AckDto = parse_response(res).await?;
        Ok(())
    }

    /// Returns the id of the freshly created listing.
    pub async fn sell(
        &self,
        player_id: &str,
        booba_id: &str,
        price: u64,
    ) -> Result<u64, RemoteError> {
        let res = self
            .http
            .post(&self.base_url)
            .json(&SellBody {
                action: "sell",
                player_id,
                booba_id,
                price,
            })
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        let dto: SellAckDto = parse_response(res).await?;
        Ok(dto.listing_id)
    }

    /// Returns the id of the item that changed hands.
    pub async fn buy(
        &self,
        player_id: &str,
        listing_id: u64,
    ) -> Result<String, RemoteError> {
        let res = self
            .http
            .post(&self.base_url)
            .json(&BuyBody {
                action: "buy",
                player_id,
                listing_id,
            })
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        let dto: BuyAckDto = parse_response(res).await?;
        Ok(dto.booba_id)
    }

    pub async fn cancel(
        &self,
        player_id: &str,
        listing_id: u64,
    ) -> Result<(), RemoteError> {
        let res = self
            .http
            .delete(&self.base_url)
            .json(&CancelBody {
                player_id,
                listing_id,
            })
            .send()
            .await
            .map_err(RemoteError::Transport)?;
        let _: AckDto = parse_response(res).await?;
        Ok(())
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    res: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = res.status();
    let bytes = res.bytes().await.map_err(RemoteError::Transport)?;
    if !status.is_success() {
        return Err(RemoteError::Rejected(rejection_message(status, &bytes)));
    }
    serde_json::from_slice(&bytes).map_err(RemoteError::InvalidPayload)
}

fn rejection_message(status: StatusCode, bytes: &[u8]) -> String {
    serde_json::from_slice::<ErrorDto>(bytes)
        .map(|dto| dto.error)
        .unwrap_or_else(|_| format!("marketplace responded with {status}"))
}

#[derive(Serialize)]
struct SyncBody<'a> {
    action: &'static str,
    player_id: &'a str,
    bubix: i64,
    inventory: &'a HashMap<String, u32>,
}

#[derive(Serialize)]
struct SellBody<'a> {
    action: &'static str,
    player_id: &'a str,
    booba_id: &'a str,
    price: u64,
}

#[derive(Serialize)]
struct BuyBody<'a> {
    action: &'static str,
    player_id: &'a str,
    listing_id: u64,
}

#[derive(Serialize)]
struct CancelBody<'a> {
    player_id: &'a str,
    listing_id: u64,
}

#[derive(Deserialize)]
struct InventoryDto {
    inventory: Vec<InventoryRowDto>,
    bubix: i64,
}

#[derive(Deserialize)]
struct InventoryRowDto {
    booba_id: String,
    count: u32,
}

#[derive(Deserialize)]
struct ListingsDto {
    listings: Vec<ListingDto>,
}

#[derive(Deserialize)]
struct ListingDto {
    listing_id: u64,
    seller_id: String,
    booba_id: String,
    price: u64,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct AckDto {
    #[allow(dead_code)]
    success: bool,
}

#[derive(Deserialize)]
struct SellAckDto {
    listing_id: u64,
}

#[derive(Deserialize)]
struct BuyAckDto {
    booba_id: String,
}

#[derive(Deserialize)]
struct ErrorDto {
    error: String,
}

impl From<InventoryDto> for RemoteInventory {
    fn from(dto: InventoryDto) -> Self {
        RemoteInventory {
            items: dto
                .inventory
                .into_iter()
                .map(|row| (row.booba_id, row.count))
                .collect(),
            bubix: dto.bubix,
        }
    }
}

impl From<ListingDto> for RemoteListing {
    fn from(dto: ListingDto) -> Self {
        RemoteListing {
            listing_id: dto.listing_id,
            seller_id: dto.seller_id,
            booba_id: dto.booba_id,
            price: dto.price,
            created_at: dto.created_at,
        }
    }
}

impl fmt::Display for MarketplaceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}
