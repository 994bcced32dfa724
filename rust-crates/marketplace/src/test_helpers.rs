use crate::app::{
    App,
    RunState,
    actix_market_api::ActixMarketApi,
    in_memory_storage::InMemoryMarketStorage,
};
use tokio::task::JoinHandle;

/// An in-process marketplace on an ephemeral port, serving until dropped.
pub struct TestMarket {
    base_url: String,
    storage: InMemoryMarketStorage,
    server: JoinHandle<()>,
}

impl TestMarket {
    pub async fn new() -> Self {
        let api = ActixMarketApi::new(None)
            .await
            .expect("failed to start market api");
        let base_url = api.base_url().to_string();
        let storage = InMemoryMarketStorage::new();
        let mut app = App::new(api, storage.clone());
        let server = tokio::spawn(async move {
            loop {
                match app.run(std::future::pending::<()>()).await {
                    Ok(RunState::Continue) => continue,
                    Ok(RunState::Exit) | Err(_) => break,
                }
            }
        });

        Self {
            base_url,
            storage,
            server,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Handle onto the live store. Clones share state with the server.
    pub fn storage(&self) -> InMemoryMarketStorage {
        self.storage.clone()
    }
}

impl Drop for TestMarket {
    fn drop(&mut self) {
        self.server.abort();
    }
}
