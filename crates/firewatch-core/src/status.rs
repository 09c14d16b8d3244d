use serde::{Deserialize, Serialize};

use crate::error::FetchError;
use crate::feeds::{map_key_status_url, redact_credentials, MapKey};
use crate::fetch::ContentFetcher;

/// Transaction accounting FIRMS reports for a map key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapKeyStatus {
    #[serde(default)]
    pub map_key: Option<String>,
    pub current_transactions: u64,
    pub transaction_limit: u64,
    #[serde(default)]
    pub transaction_interval: Option<String>,
}

impl MapKeyStatus {
    pub fn transactions_since(&self, earlier: &MapKeyStatus) -> u64 {
        self.current_transactions
            .saturating_sub(earlier.current_transactions)
    }

    pub fn remaining(&self) -> u64 {
        self.transaction_limit
            .saturating_sub(self.current_transactions)
    }
}

pub async fn fetch_map_key_status(
    fetcher: &dyn ContentFetcher,
    key: &MapKey,
) -> Result<MapKeyStatus, FetchError> {
    let url = map_key_status_url(key);
    let body = fetcher.fetch(&url).await?;
    serde_json::from_str(&body).map_err(|err| FetchError::Decode {
        target: redact_credentials(&url),
        message: err.to_string(),
    })
}
