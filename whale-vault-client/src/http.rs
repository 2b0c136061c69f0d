// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! The relay backend reached over HTTP.
//!
//! Responses are loosely shaped JSON. Each one goes through a decoding function below
//! that produces a strict value or an [`Error`]; the accepted alternatives are listed on
//! each function.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, instrument};
use url::Url;
use whale_vault_base::ActivationCode;

use crate::{
    backend::Backend,
    data_types::{BindingRecord, LeaderboardEntry, MintRequest, Role, StatusReport, TxStatus},
    error::fallback_message,
    Error,
};

const VERIFY_PATH: &str = "/verify";
const GET_BINDING_PATH: &str = "/get-binding";
const MINT_PATH: &str = "/mint";
const TRANSACTION_STATUS_PATH: &str = "/transaction-status";
const RECHARGE_PATH: &str = "/admin/usdt/recharge";
const SAVE_CODE_PATH: &str = "/relay/save-code";
const REWARD_PATH: &str = "/relay/reward";
const STATS_PATH: &str = "/relay/stats";

/// Server error pages are cut to this many characters in messages.
const MAX_BODY_PREVIEW: usize = 200;

/// A response with its body parsed as JSON, or kept as a string when it is not JSON.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RawResponse {
    pub status: u16,
    pub body: Value,
}

impl RawResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body carries an explicit `ok: false`.
    fn is_refused(&self) -> bool {
        self.body.get("ok").and_then(Value::as_bool) == Some(false)
    }

    /// The explanation given by the server, from `error`, then `message`, then a raw body.
    fn message(&self) -> Option<String> {
        for key in ["error", "message"] {
            if let Some(message) = self.body.get(key).and_then(non_empty_string) {
                return Some(message);
            }
        }
        match &self.body {
            Value::String(text) if !text.trim().is_empty() => {
                Some(text.trim().chars().take(MAX_BODY_PREVIEW).collect())
            }
            _ => None,
        }
    }

    fn message_or(&self, action: &str) -> String {
        self.message()
            .unwrap_or_else(|| fallback_message(action, self.status))
    }

    /// The `data` object of the body, or the body itself when there is none.
    fn data(&self) -> &Value {
        self.body.get("data").unwrap_or(&self.body)
    }
}

/// Reads a non-empty string, or a number written as a string.
fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(non_empty_string))
}

fn body_or_data_field(response: &RawResponse, keys: &[&str]) -> Option<String> {
    field(&response.body, keys).or_else(|| field(response.data(), keys))
}

/// Decodes `GET /verify`. HTTP 403 and 404 and `ok: false` mean the code is unknown or
/// expired. Other failing statuses are network errors.
pub(crate) fn decode_verify(response: &RawResponse) -> Result<Role, Error> {
    if matches!(response.status, 403 | 404) || response.is_refused() {
        return Err(Error::InvalidCode {
            message: response
                .message()
                .unwrap_or_else(|| "unknown or expired activation code".to_string()),
        });
    }
    if !response.is_success() {
        return Err(Error::Network(response.message_or("verification")));
    }
    let role = field(&response.body, &["role"]).ok_or(Error::MissingField("role"))?;
    role.parse()
}

/// Decodes `GET /get-binding`. The reader address is read from `address` or
/// `reader_address`, the book from `book_address` or `bookAddress`, at the top level or
/// inside `data`. Empty strings count as missing.
pub(crate) fn decode_binding(response: &RawResponse) -> Result<BindingRecord, Error> {
    if !response.is_success() {
        return Err(Error::Network(response.message_or("binding lookup")));
    }
    if response.is_refused() {
        return Err(Error::Rejected(response.message_or("binding lookup")));
    }
    Ok(BindingRecord {
        reader_address: body_or_data_field(response, &["address", "reader_address"]),
        book_address: body_or_data_field(response, &["book_address", "bookAddress"]),
    })
}

/// Decodes `POST /mint`, which must carry `data.tx_hash`.
pub(crate) fn decode_mint(response: &RawResponse) -> Result<String, Error> {
    if !response.is_success() || response.is_refused() {
        return Err(Error::MintRequestRejected(response.message_or("mint request")));
    }
    let data = response.body.get("data").unwrap_or(&Value::Null);
    field(data, &["tx_hash"]).ok_or_else(|| {
        Error::MintRequestRejected(
            response
                .message()
                .unwrap_or_else(|| "the relay returned no transaction hash".to_string()),
        )
    })
}

/// Decodes `GET /transaction-status`. `data.tokenId` may be a string or a number.
pub(crate) fn decode_status(response: &RawResponse) -> Result<StatusReport, Error> {
    if !response.is_success() || response.is_refused() {
        return Err(Error::Network(response.message_or("status query")));
    }
    let data = response
        .body
        .get("data")
        .ok_or(Error::MissingField("data"))?;
    let status = field(data, &["status"]).ok_or(Error::MissingField("status"))?;
    Ok(StatusReport {
        status: TxStatus::from_backend(&status),
        token_id: field(data, &["tokenId", "token_id"]),
        reader: field(data, &["reader"]),
        error: field(data, &["error", "message"]),
    })
}

/// Decodes `POST /admin/usdt/recharge`. The hash is read from `txHash`, or from
/// `data.txHash` / `data.tx_hash`.
pub(crate) fn decode_recharge(response: &RawResponse) -> Result<String, Error> {
    if !response.is_success() || response.is_refused() {
        return Err(Error::Rejected(response.message_or("recharge")));
    }
    body_or_data_field(response, &["txHash", "tx_hash"]).ok_or(Error::MissingField("txHash"))
}

/// Decodes a plain acknowledgement.
pub(crate) fn decode_ack(response: &RawResponse, action: &str) -> Result<(), Error> {
    if !response.is_success() || response.is_refused() {
        return Err(Error::Rejected(response.message_or(action)));
    }
    Ok(())
}

/// Decodes `POST /relay/reward`, whose transaction hash is optional.
pub(crate) fn decode_reward(response: &RawResponse) -> Result<Option<String>, Error> {
    decode_ack(response, "reward claim")?;
    Ok(body_or_data_field(response, &["txHash", "tx_hash"]))
}

/// Decodes `GET /relay/stats?address=`: `count`, `data.count`, or the entry of `address`
/// in `all_stats`.
pub(crate) fn decode_referral_count(
    response: &RawResponse,
    address: &str,
) -> Result<Option<String>, Error> {
    decode_ack(response, "referral count")?;
    let from_stats = || {
        let stats = response.body.get("all_stats")?.as_object()?;
        stats
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(address))
            .and_then(|(_, count)| non_empty_string(count))
    };
    Ok(body_or_data_field(response, &["count"]).or_else(from_stats))
}

/// Decodes `GET /relay/stats`: an `all_stats` object mapping addresses to counts written
/// as strings or numbers. Entries with a count that is not a non-negative integer are
/// skipped. The result is sorted by decreasing count, then by address.
pub(crate) fn decode_leaderboard(response: &RawResponse) -> Result<Vec<LeaderboardEntry>, Error> {
    decode_ack(response, "leaderboard")?;
    let stats = response
        .body
        .get("all_stats")
        .and_then(Value::as_object)
        .ok_or(Error::MissingField("all_stats"))?;
    let mut entries = Vec::with_capacity(stats.len());
    for (address, count) in stats {
        let count = non_empty_string(count).and_then(|count| count.parse::<u64>().ok());
        match count {
            Some(count) => entries.push(LeaderboardEntry {
                address: address.clone(),
                count,
            }),
            None => debug!(%address, "skipping leaderboard entry without a valid count"),
        }
    }
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.address.cmp(&b.address)));
    Ok(entries)
}

/// The relay backend at a base URL.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
    admin_api_key: Option<String>,
}

impl HttpBackend {
    /// Creates a client for the backend at `base_url`. The admin key, if any, is only sent
    /// with administrative requests.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        admin_api_key: Option<String>,
    ) -> Result<Self, Error> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|error| Error::Config(format!("invalid backend URL {base_url:?}: {error}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            client,
            admin_api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<RawResponse, Error> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text))
        };
        debug!(status, "backend answered");
        Ok(RawResponse::new(status, body))
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<RawResponse, Error> {
        debug!(path, "GET");
        self.send(self.client.get(self.url(path)).query(query)).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<RawResponse, Error> {
        debug!(path, "POST");
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn post_admin(&self, path: &str, body: &Value) -> Result<RawResponse, Error> {
        debug!(path, "POST (admin)");
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(key) = &self.admin_api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }
        self.send(request).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self, code), fields(code_hash = %code.hash()))]
    async fn verify(&self, code: &ActivationCode, address: Option<&str>) -> Result<Role, Error> {
        let mut query = vec![("codeHash", code.hash())];
        if let Some(address) = address {
            query.push(("address", address));
        }
        decode_verify(&self.get(VERIFY_PATH, &query).await?)
    }

    #[instrument(skip(self, code), fields(code_hash = %code.hash()))]
    async fn get_binding(&self, code: &ActivationCode) -> Result<BindingRecord, Error> {
        decode_binding(&self.get(GET_BINDING_PATH, &[("codeHash", code.hash())]).await?)
    }

    #[instrument(skip(self))]
    async fn mint(&self, request: &MintRequest) -> Result<String, Error> {
        let body = serde_json::to_value(request)
            .map_err(|error| Error::MalformedResponse(error.to_string()))?;
        decode_mint(&self.post(MINT_PATH, &body).await?)
    }

    #[instrument(skip(self))]
    async fn transaction_status(&self, tx_hash: &str) -> Result<StatusReport, Error> {
        decode_status(&self.get(TRANSACTION_STATUS_PATH, &[("hash", tx_hash)]).await?)
    }

    #[instrument(skip(self))]
    async fn recharge(&self, to: &str, amount: u64) -> Result<String, Error> {
        let body = json!({ "to": to, "amount": amount });
        decode_recharge(&self.post_admin(RECHARGE_PATH, &body).await?)
    }

    #[instrument(skip(self))]
    async fn save_code(&self, code_hash: &str, wallet_address: &str) -> Result<(), Error> {
        let body = json!({ "address": wallet_address, "codeHash": code_hash });
        decode_ack(&self.post(SAVE_CODE_PATH, &body).await?, "saving the code")
    }

    #[instrument(skip(self, codes))]
    async fn claim_reward(&self, dest: &str, codes: &[String]) -> Result<Option<String>, Error> {
        let body = json!({ "dest": dest, "codes": codes });
        decode_reward(&self.post(REWARD_PATH, &body).await?)
    }

    #[instrument(skip(self))]
    async fn referral_count(&self, address: &str) -> Result<Option<String>, Error> {
        let response = self.get(STATS_PATH, &[("address", address)]).await?;
        decode_referral_count(&response, address)
    }

    #[instrument(skip(self))]
    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Error> {
        decode_leaderboard(&self.get(STATS_PATH, &[]).await?)
    }
}
