// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_lock::Mutex;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use url::Url;

use crate::{
    client::{EthereumClient, JsonRpcClient},
    common::EthereumServiceError,
};

/// The default timeout of a single JSON-RPC request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A JSON-RPC transport posting requests to an HTTP endpoint.
pub struct HttpJsonRpc {
    pub url: Url,
    pub id: Mutex<u64>,
    client: Client,
}

#[async_trait]
impl JsonRpcClient for HttpJsonRpc {
    async fn get_id(&self) -> u64 {
        let mut id = self.id.lock().await;
        *id += 1;
        *id
    }

    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, EthereumServiceError> {
        let response = self
            .client
            .post(self.url.clone())
            .body(payload)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("could not get response text: {error}"));
            return Err(EthereumServiceError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

impl HttpJsonRpc {
    /// Creates a transport for the node at `url`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, EthereumServiceError> {
        let url = Url::parse(url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            id: Mutex::new(0),
            client,
        })
    }
}

/// An [`EthereumClient`] talking to a node over HTTP.
pub type HttpEthereumClient = EthereumClient<HttpJsonRpc>;

impl EthereumClient<HttpJsonRpc> {
    /// Connects to the JSON-RPC endpoint at `url` with the default timeout.
    pub fn connect(url: &str) -> Result<Self, EthereumServiceError> {
        Self::connect_with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn connect_with_timeout(url: &str, timeout: Duration) -> Result<Self, EthereumServiceError> {
        Ok(EthereumClient::new(HttpJsonRpc::new(url, timeout)?))
    }
}
