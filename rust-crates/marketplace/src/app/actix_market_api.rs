use crate::{
    Result,
    app::market_api::{
        BuyRequest,
        CancelRequest,
        InventoryRequest,
        MarketAPI,
        Request,
        SellRequest,
        SyncRequest,
    },
    market::{
        BuyOutcome,
        CancelOutcome,
        InventoryRow,
        ListingRecord,
        SellOutcome,
    },
};
use actix_cors::Cors;
use actix_web::{
    App,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    error::ErrorInternalServerError,
    web,
};
use anyhow::{
    Context,
    anyhow,
};
use game_core::STARTING_BUBIX;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    net::TcpListener,
    thread::JoinHandle,
};
use tokio::sync::{
    mpsc,
    oneshot,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ListingsDto {
    listings: Vec<ListingRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct InventoryDto {
    inventory: Vec<InventoryRow>,
    bubix: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct AckDto {
    success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct SellAckDto {
    success: bool,
    listing_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct BuyAckDto {
    success: bool,
    booba_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ErrorDto {
    error: String,
}

#[derive(Debug, Deserialize)]
struct GetParams {
    action: Option<String>,
    player_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MutationBody {
    action: Option<String>,
    player_id: Option<String>,
    booba_id: Option<String>,
    price: Option<i64>,
    listing_id: Option<u64>,
    bubix: Option<i64>,
    #[serde(default)]
    inventory: HashMap<String, u32>,
}

#[derive(Debug, Deserialize)]
struct CancelBody {
    listing_id: Option<u64>,
    player_id: Option<String>,
}

pub struct ActixMarketApi {
    receiver: mpsc::Receiver<Request>,
    base_url: String,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl ActixMarketApi {
    pub async fn new(port: Option<u16>) -> Result<Self> {
        let (sender, receiver) = mpsc::channel(16);

        let listener = TcpListener::bind(("127.0.0.1", port.unwrap_or(0)))
            .context("failed to bind HTTP listener for market API")?;
        let address = listener
            .local_addr()
            .context("failed to read listener address")?;
        let base_url = format!("http://{}", address);

        tracing::info!("market API listening on {}", base_url);

        let server_sender = sender.clone();
        let server = HttpServer::new(move || {
            let sender = server_sender.clone();

            App::new()
                .app_data(web::Data::new(sender))
                .wrap(Cors::permissive())
                .route("/", web::get().to(handle_get))
                .route("/", web::post().to(handle_post))
                .route("/", web::delete().to(handle_delete))
                .default_service(web::route().to(handle_unknown_method))
        })
        .listen(listener)
        .context("failed to start Actix server")?
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Ok(Self {
            receiver,
            base_url,
            server_handle,
            server_thread: Some(server_thread),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl MarketAPI for ActixMarketApi {
    async fn request(&mut self) -> Result<Request> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| anyhow!("market server closed"))
    }
}

impl Drop for ActixMarketApi {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorDto {
        error: message.to_string(),
    })
}

fn not_found(message: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorDto {
        error: message.to_string(),
    })
}

fn forbidden(message: &str) -> HttpResponse {
    HttpResponse::Forbidden().json(ErrorDto {
        error: message.to_string(),
    })
}

fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(ErrorDto {
        error: "Method not allowed".to_string(),
    })
}

async fn forward(
    sender: &web::Data<mpsc::Sender<Request>>,
    request: Request,
) -> actix_web::Result<()> {
    sender
        .get_ref()
        .clone()
        .send(request)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward market request"))
}

async fn handle_get(
    sender: web::Data<mpsc::Sender<Request>>,
    params: web::Query<GetParams>,
) -> actix_web::Result<HttpResponse> {
    match params.action.as_deref().unwrap_or("listings") {
        "listings" => {
            let (response_sender, response_receiver) = oneshot::channel();
            forward(&sender, Request::Listings(response_sender)).await?;

            let listings = response_receiver
                .await
                .map_err(|_| ErrorInternalServerError("listings responder dropped"))?;
            Ok(HttpResponse::Ok().json(ListingsDto { listings }))
        }
        "inventory" => {
            let player_id = params.player_id.clone().unwrap_or_default();
            if player_id.is_empty() {
                return Ok(bad_request("player_id required"));
            }

            let (response_sender, response_receiver) = oneshot::channel();
            let request = Request::Inventory(InventoryRequest {
                player_id,
                reply: response_sender,
            });
            forward(&sender, request).await?;

            let overview = response_receiver
                .await
                .map_err(|_| ErrorInternalServerError("inventory responder dropped"))?;
            Ok(HttpResponse::Ok().json(InventoryDto {
                inventory: overview.inventory,
                bubix: overview.bubix,
            }))
        }
        _ => Ok(method_not_allowed()),
    }
}

async fn handle_post(
    sender: web::Data<mpsc::Sender<Request>>,
    body: web::Json<MutationBody>,
) -> actix_web::Result<HttpResponse> {
    let body = body.into_inner();
    let player_id = body.player_id.unwrap_or_default();
    if player_id.is_empty() {
        return Ok(bad_request("player_id required"));
    }

    match body.action.as_deref() {
        Some("sync") => {
            let (response_sender, response_receiver) = oneshot::channel();
            let request = Request::Sync(SyncRequest {
                player_id,
                bubix: body.bubix.unwrap_or(STARTING_BUBIX),
                inventory: body.inventory,
                reply: response_sender,
            });
            forward(&sender, request).await?;

            response_receiver
                .await
                .map_err(|_| ErrorInternalServerError("sync responder dropped"))?;
            Ok(HttpResponse::Ok().json(AckDto { success: true }))
        }
        Some("sell") => {
            let booba_id = body.booba_id.unwrap_or_default();
            let price = body.price.unwrap_or(0);
            if booba_id.is_empty() || price < 1 {
                return Ok(bad_request("booba_id and price required"));
            }

            let (response_sender, response_receiver) = oneshot::channel();
            let request = Request::Sell(SellRequest {
                player_id,
                booba_id,
                price: price as u64,
                reply: response_sender,
            });
            forward(&sender, request).await?;

            let outcome = response_receiver
                .await
                .map_err(|_| ErrorInternalServerError("sell responder dropped"))?;
            match outcome {
                SellOutcome::Listed { listing_id } => {
                    Ok(HttpResponse::Ok().json(SellAckDto {
                        success: true,
                        listing_id,
                    }))
                }
                SellOutcome::NotEnoughItems => Ok(bad_request("Not enough items")),
            }
        }
        Some("buy") => {
            let Some(listing_id) = body.listing_id.filter(|id| *id != 0) else {
                return Ok(bad_request("listing_id required"));
            };

            let (response_sender, response_receiver) = oneshot::channel();
            let request = Request::Buy(BuyRequest {
                player_id,
                listing_id,
                reply: response_sender,
            });
            forward(&sender, request).await?;

            let outcome = response_receiver
                .await
                .map_err(|_| ErrorInternalServerError("buy responder dropped"))?;
            match outcome {
                BuyOutcome::Bought { booba_id } => Ok(HttpResponse::Ok().json(BuyAckDto {
                    success: true,
                    booba_id,
                })),
                BuyOutcome::ListingNotFound => Ok(not_found("Listing not found")),
                BuyOutcome::OwnListing => Ok(bad_request("Cannot buy your own listing")),
                BuyOutcome::NotEnoughBubix => Ok(bad_request("Not enough bubix")),
            }
        }
        _ => Ok(method_not_allowed()),
    }
}

async fn handle_delete(
    sender: web::Data<mpsc::Sender<Request>>,
    body: web::Json<CancelBody>,
) -> actix_web::Result<HttpResponse> {
    let body = body.into_inner();
    let player_id = body.player_id.unwrap_or_default();
    let listing_id = body.listing_id.unwrap_or(0);
    if listing_id == 0 || player_id.is_empty() {
        return Ok(bad_request("listing_id and player_id required"));
    }

    let (response_sender, response_receiver) = oneshot::channel();
    let request = Request::Cancel(CancelRequest {
        player_id,
        listing_id,
        reply: response_sender,
    });
    forward(&sender, request).await?;

    let outcome = response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("cancel responder dropped"))?;
    match outcome {
        CancelOutcome::Cancelled => Ok(HttpResponse::Ok().json(AckDto { success: true })),
        CancelOutcome::NotFound => Ok(not_found("Listing not found")),
        CancelOutcome::NotYours => Ok(forbidden("Not your listing")),
    }
}

async fn handle_unknown_method() -> actix_web::Result<HttpResponse> {
    Ok(method_not_allowed())
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn request__serves_listings_on_plain_get() {
        // given
        let mut api = ActixMarketApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = api.base_url().to_string();
        let record = ListingRecord {
            listing_id: 7,
            seller_id: "player_seller000".to_string(),
            booba_id: "cool-booba".to_string(),
            price: 120,
            created_at: Utc::now(),
        };
        let expected = ListingsDto {
            listings: vec![record.clone()],
        };

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            response.json::<ListingsDto>().await.unwrap()
        });

        // when
        let request = api.request().await.unwrap();
        if let Request::Listings(sender) = request {
            sender.send(vec![record]).unwrap();
        } else {
            panic!("expected listings request got {:?}", request);
        }

        // then
        let response = client_task.await.unwrap();
        assert_eq!(response, expected);
    }

    #[tokio::test]
    async fn request__inventory_requires_a_player_id() {
        // given
        let api = ActixMarketApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/?action=inventory", api.base_url());

        // when
        let response = client.get(url).send().await.unwrap();

        // then
        assert_eq!(response.status().as_u16(), 400);
        let body = response.json::<ErrorDto>().await.unwrap();
        assert_eq!(body.error, "player_id required");
    }

    #[tokio::test]
    async fn request__sell_rejections_map_to_error_payloads() {
        // given
        let mut api = ActixMarketApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = api.base_url().to_string();

        // when a sell arrives without a price
        let response = client
            .post(&url)
            .json(&serde_json::json!({
                "action": "sell",
                "player_id": "player_aaa0aaa0a",
                "booba_id": "sad-booba",
            }))
            .send()
            .await
            .unwrap();

        // then the edge rejects it without consulting the app
        assert_eq!(response.status().as_u16(), 400);
        let body = response.json::<ErrorDto>().await.unwrap();
        assert_eq!(body.error, "booba_id and price required");

        // when a well-formed sell is rejected by the app
        let post = client
            .post(&url)
            .json(&serde_json::json!({
                "action": "sell",
                "player_id": "player_aaa0aaa0a",
                "booba_id": "sad-booba",
                "price": 30,
            }))
            .send();
        let client_task = tokio::spawn(async move {
            let response = post.await.unwrap();
            (
                response.status().as_u16(),
                response.json::<ErrorDto>().await.unwrap(),
            )
        });

        let request = api.request().await.unwrap();
        if let Request::Sell(inner) = request {
            assert_eq!(inner.player_id, "player_aaa0aaa0a");
            assert_eq!(inner.booba_id, "sad-booba");
            assert_eq!(inner.price, 30);
            inner.reply.send(SellOutcome::NotEnoughItems).unwrap();
        } else {
            panic!("expected sell request got {:?}", request);
        }

        // then
        let (status, body) = client_task.await.unwrap();
        assert_eq!(status, 400);
        assert_eq!(body.error, "Not enough items");
    }

    #[tokio::test]
    async fn request__unknown_actions_and_methods_are_rejected() {
        // given
        let api = ActixMarketApi::new(None).await.unwrap();
        let client = reqwest::Client::new();
        let url = api.base_url().to_string();

        // when / then
        let response = client
            .post(&url)
            .json(&serde_json::json!({
                "action": "jackpot",
                "player_id": "player_aaa0aaa0a",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 405);
        let body = response.json::<ErrorDto>().await.unwrap();
        assert_eq!(body.error, "Method not allowed");

        let response = client.put(&url).send().await.unwrap();
        assert_eq!(response.status().as_u16(), 405);
    }
}
