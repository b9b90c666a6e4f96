use std::sync::Arc;

use chainsync::Synchronizer;
use royalty::JsonFileStore;

use crate::ledger_http::HttpLedgerClient;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub sync: Synchronizer<HttpLedgerClient, JsonFileStore>,
}

impl AppState {
    pub fn new(ledger: HttpLedgerClient, store: JsonFileStore) -> Self {
        Self {
            sync: Synchronizer::new(ledger, store),
        }
    }
}
