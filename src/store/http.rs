//! Ledger store backed by the local overlay server (`/api/scores`).

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::{LedgerStore, StoreError};
use crate::scoring::TeamScoreEntry;

const SCORES_ENDPOINT: &str = "/api/scores";

pub struct HttpLedgerStore {
    client: Client,
    url: String,
}

impl HttpLedgerStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Http(format!("build client: {}", e)))?;
        Ok(Self {
            client,
            url: scores_url(base_url),
        })
    }
}

fn scores_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), SCORES_ENDPOINT)
}

impl LedgerStore for HttpLedgerStore {
    fn load(&self) -> Result<Vec<TeamScoreEntry>, StoreError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| StoreError::Http(format!("GET {}: {}", self.url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(StoreError::Http(format!("GET {} returned {}", self.url, status)));
        }

        let body = response
            .text()
            .map_err(|e| StoreError::Http(format!("GET {}: {}", self.url, e)))?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).map_err(|e| StoreError::Corrupt(format!("{}: {}", self.url, e)))
    }

    fn save(&self, entries: &[TeamScoreEntry]) -> Result<(), StoreError> {
        let response = self
            .client
            .post(&self.url)
            .json(entries)
            .send()
            .map_err(|e| StoreError::Http(format!("POST {}: {}", self.url, e)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Http(format!("POST {} returned {}", self.url, status)))
        }
    }

    fn describe(&self) -> String {
        format!("server {}", self.url)
    }
}
