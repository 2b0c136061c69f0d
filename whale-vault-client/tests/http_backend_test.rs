// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use assert_matches::assert_matches;
use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri},
    Json, Router,
};
use serde_json::{json, Value};
use whale_vault_base::ActivationCode;
use whale_vault_client::{
    backend::Backend,
    data_types::{LeaderboardEntry, MintRequest, Role, TxStatus},
    http::HttpBackend,
    Error,
};

const ADMIN_KEY: &str = "admin-secret";
const WALLET: &str = "0x00000000000000000000000000000000000000aa";

/// A request as seen by the relay.
#[derive(Clone, Debug)]
struct Received {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    authorization: Option<String>,
    body: Value,
}

/// A local relay answering scripted responses in order and recording every request.
#[derive(Clone, Default)]
struct FakeRelay {
    received: Arc<Mutex<Vec<Received>>>,
    responses: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
}

impl FakeRelay {
    fn respond(&self, status: StatusCode, body: Value) -> &Self {
        self.responses.lock().unwrap().push_back((status, body));
        self
    }

    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    fn single(&self) -> Received {
        let received = self.received();
        assert_eq!(received.len(), 1, "expected one request, got {received:?}");
        received[0].clone()
    }

    /// Serves on an ephemeral port and returns a backend pointed at it.
    async fn start(&self) -> anyhow::Result<HttpBackend> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let app = Router::new().fallback(handle).with_state(self.clone());
        tokio::spawn(async move { axum::serve(listener, app).await });
        Ok(HttpBackend::new(
            &format!("http://{address}/"),
            Duration::from_secs(5),
            Some(ADMIN_KEY.to_string()),
        )?)
    }
}

async fn handle(
    State(relay): State<FakeRelay>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    relay.received.lock().unwrap().push(Received {
        method,
        path: uri.path().to_string(),
        query,
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });
    let response = relay.responses.lock().unwrap().pop_front();
    let (status, body) = response.unwrap_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "no scripted response" }),
    ));
    (status, Json(body))
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[tokio::test]
async fn test_verify_sends_code_hash_and_address() -> anyhow::Result<()> {
    let relay = FakeRelay::default();
    relay.respond(StatusCode::OK, json!({ "ok": true, "role": "author" }));
    let backend = relay.start().await?;
    let code = ActivationCode::parse("abc12345")?;

    let role = backend.verify(&code, Some(WALLET)).await?;

    assert_eq!(role, Role::Author);
    let request = relay.single();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/verify");
    assert_eq!(request.query, query(&[("codeHash", code.hash()), ("address", WALLET)]));
    assert_eq!(request.authorization, None);
    Ok(())
}

#[tokio::test]
async fn test_forbidden_verification_is_an_invalid_code() -> anyhow::Result<()> {
    let relay = FakeRelay::default();
    relay.respond(StatusCode::FORBIDDEN, json!({ "error": "code expired" }));
    let backend = relay.start().await?;
    let code = ActivationCode::parse("abc12345")?;

    let result = backend.verify(&code, None).await;

    assert_matches!(result, Err(Error::InvalidCode { message }) if message == "code expired");
    assert_eq!(relay.single().query, query(&[("codeHash", code.hash())]));
    Ok(())
}

#[tokio::test]
async fn test_binding_lookup_request() -> anyhow::Result<()> {
    let relay = FakeRelay::default();
    relay.respond(
        StatusCode::OK,
        json!({ "ok": true, "data": { "reader_address": "0xReader", "bookAddress": "0xBook" } }),
    );
    let backend = relay.start().await?;
    let code = ActivationCode::parse("abc12345")?;

    let record = backend.get_binding(&code).await?;

    assert_eq!(record.reader_address.as_deref(), Some("0xReader"));
    assert_eq!(record.book_address.as_deref(), Some("0xBook"));
    let request = relay.single();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/get-binding");
    assert_eq!(request.query, query(&[("codeHash", code.hash())]));
    Ok(())
}

#[tokio::test]
async fn test_mint_posts_both_addresses() -> anyhow::Result<()> {
    let relay = FakeRelay::default();
    relay
        .respond(StatusCode::OK, json!({ "ok": true, "data": { "tx_hash": "0xAAA" } }))
        .respond(StatusCode::OK, json!({ "ok": true, "data": {} }));
    let backend = relay.start().await?;
    let request = MintRequest::new("0xBook", "0xReader");

    assert_eq!(backend.mint(&request).await?, "0xAAA");
    assert_matches!(backend.mint(&request).await, Err(Error::MintRequestRejected(_)));

    let received = relay.received();
    assert_eq!(received.len(), 2);
    for request in received {
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/mint");
        assert_eq!(
            request.body,
            json!({ "bookAddress": "0xBook", "readerAddress": "0xReader" })
        );
        assert_eq!(request.authorization, None);
    }
    Ok(())
}

#[tokio::test]
async fn test_status_query_by_hash() -> anyhow::Result<()> {
    let relay = FakeRelay::default();
    relay.respond(
        StatusCode::OK,
        json!({ "ok": true, "data": { "status": "SUCCESS", "tokenId": "42" } }),
    );
    let backend = relay.start().await?;

    let report = backend.transaction_status("0xAAA").await?;

    assert_eq!(report.status, TxStatus::Success);
    assert_eq!(report.token_id.as_deref(), Some("42"));
    let request = relay.single();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/transaction-status");
    assert_eq!(request.query, query(&[("hash", "0xAAA")]));
    Ok(())
}

#[tokio::test]
async fn test_recharge_carries_the_admin_key() -> anyhow::Result<()> {
    let relay = FakeRelay::default();
    relay.respond(StatusCode::OK, json!({ "ok": true, "txHash": "0xBBB" }));
    let backend = relay.start().await?;

    assert_eq!(backend.recharge(WALLET, 1_000_000).await?, "0xBBB");

    let request = relay.single();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/admin/usdt/recharge");
    assert_eq!(request.body, json!({ "to": WALLET, "amount": 1_000_000 }));
    assert_eq!(
        request.authorization.as_deref(),
        Some(format!("Bearer {ADMIN_KEY}").as_str())
    );
    Ok(())
}

#[tokio::test]
async fn test_reward_requests() -> anyhow::Result<()> {
    let relay = FakeRelay::default();
    relay
        .respond(StatusCode::OK, json!({ "ok": true }))
        .respond(StatusCode::OK, json!({ "ok": true, "txHash": "0xCCC" }))
        .respond(StatusCode::OK, json!({ "ok": true, "count": 3 }))
        .respond(StatusCode::OK, json!({ "ok": true, "all_stats": { "0xa": "2", "0xb": 5 } }));
    let backend = relay.start().await?;
    let codes = vec!["h1".to_string(), "h2".to_string()];

    backend.save_code("h1", WALLET).await?;
    assert_eq!(
        backend.claim_reward(WALLET, &codes).await?.as_deref(),
        Some("0xCCC")
    );
    assert_eq!(backend.referral_count(WALLET).await?.as_deref(), Some("3"));
    assert_eq!(
        backend.leaderboard().await?,
        vec![
            LeaderboardEntry {
                address: "0xb".to_string(),
                count: 5,
            },
            LeaderboardEntry {
                address: "0xa".to_string(),
                count: 2,
            },
        ]
    );

    let received = relay.received();
    assert_eq!(received.len(), 4);
    let requests = received
        .iter()
        .map(|request| (request.method.clone(), request.path.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        requests,
        [
            (Method::POST, "/relay/save-code"),
            (Method::POST, "/relay/reward"),
            (Method::GET, "/relay/stats"),
            (Method::GET, "/relay/stats"),
        ]
    );
    assert_eq!(received[0].body, json!({ "address": WALLET, "codeHash": "h1" }));
    assert_eq!(received[1].body, json!({ "dest": WALLET, "codes": ["h1", "h2"] }));
    assert_eq!(received[2].query, query(&[("address", WALLET)]));
    assert!(received[3].query.is_empty());
    assert!(received.iter().all(|request| request.authorization.is_none()));
    Ok(())
}
