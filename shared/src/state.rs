//! Per-cold-start application state shared across invocations.

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use std::sync::Arc;

use crate::store::{DynamoStore, ItemStore};
use crate::Config;

/// Application state
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn ItemStore>, config: Config) -> Self {
        Self { store, config }
    }

    /// Build a DynamoDB-backed state from the Lambda environment.
    pub async fn from_env() -> Self {
        let config = Config::from_env();
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .load()
            .await;
        let client = aws_sdk_dynamodb::Client::new(&aws_config);

        Self::new(Arc::new(DynamoStore::new(client)), config)
    }

    pub fn store(&self) -> &dyn ItemStore {
        self.store.as_ref()
    }
}
