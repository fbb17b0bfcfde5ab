//! # Integration Tests for erc7231-api
//!
//! Drives the full router through `tower::ServiceExt::oneshot`: health
//! probes, minting, root commitment, both verification paths, claim
//! digests, the audit log, authentication, metrics, and the OpenAPI spec.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use erc7231_api::auth::SecretToken;
use erc7231_api::state::{AppConfig, AppState};
use erc7231_core::{DigestAlgorithm, Hash256, TokenId};
use erc7231_crypto::Secp256k1KeyPair;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Helper: build the test app with auth disabled.
fn test_app() -> (AppState, axum::Router) {
    let state = AppState::new();
    (state.clone(), erc7231_api::app(state))
}

/// Helper: build the test app with auth enabled.
fn test_app_with_auth(token: &str) -> axum::Router {
    let config = AppConfig {
        auth_token: Some(SecretToken::new(token)),
        ..AppConfig::default()
    };
    erc7231_api::app(AppState::with_config(config, None))
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn claims_json() -> Value {
    json!([
        {"userID": "openID2:steam:a1", "verifierUri1": "https://verify/a1", "memo": "memo1"},
        {"userID": "did:polygonId:b2", "verifierUri1": "https://verify/b2", "memo": "memo1"}
    ])
}

/// Mint for `holder`, digest the claims, sign, and commit. Returns the token id and root.
async fn bind(app: &axum::Router, holder: &Secp256k1KeyPair) -> (String, Hash256) {
    let (status, minted) = send(
        app,
        "POST",
        "/v1/tokens",
        Some(json!({"owner": holder.address().to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token_id = minted["token_id"].as_str().unwrap().to_string();

    let (status, digest) = send(app, "POST", "/v1/claims/digest", Some(json!({"claims": claims_json()}))).await;
    assert_eq!(status, StatusCode::OK);
    let root: Hash256 = digest["digest"].as_str().unwrap().parse().unwrap();

    let (status, set) = put_root(app, holder, &token_id, 0, &root).await;
    assert_eq!(status, StatusCode::OK, "{set}");
    (token_id, root)
}

/// Sign a write authorization for `(token_id, nonce, root)` and PUT it.
async fn put_root(
    app: &axum::Router,
    signer: &Secp256k1KeyPair,
    token_id: &str,
    nonce: u64,
    root: &Hash256,
) -> (StatusCode, Value) {
    let token: TokenId = token_id.parse().unwrap();
    let sig = signer
        .sign_root_write(&token, nonce, root, DigestAlgorithm::Keccak256)
        .unwrap();
    put_signed(app, token_id, nonce, root, &sig.to_hex()).await
}

async fn put_signed(
    app: &axum::Router,
    token_id: &str,
    nonce: u64,
    root: &Hash256,
    signature: &str,
) -> (StatusCode, Value) {
    send(
        app,
        "PUT",
        &format!("/v1/tokens/{token_id}/identities-root"),
        Some(json!({"root": root.to_string(), "nonce": nonce, "signature": signature})),
    )
    .await
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let (_, app) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health/liveness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let (_, app) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health/readiness").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ready");
}

// -- Tokens -------------------------------------------------------------------

#[tokio::test]
async fn test_mint_and_lookup_owner() {
    let (_, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (status, minted) = send(
        &app,
        "POST",
        "/v1/tokens",
        Some(json!({"owner": holder.address().to_string()})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token_id = minted["token_id"].as_str().unwrap();

    let (status, owner) = send(&app, "GET", &format!("/v1/tokens/{token_id}/owner"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(owner["owner"], holder.address().to_string());
}

#[tokio::test]
async fn test_double_mint_conflicts() {
    let (_, app) = test_app();
    let body = json!({"owner": Secp256k1KeyPair::generate().address().to_string()});
    let (status, _) = send(&app, "POST", "/v1/tokens", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, err) = send(&app, "POST", "/v1/tokens", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_unknown_token_owner_is_404_and_bad_id_is_422() {
    let (_, app) = test_app();
    let (status, _) = send(&app, "GET", "/v1/tokens/42/owner", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/v1/tokens/forty-two/owner", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_malformed_json_is_422() {
    let (_, app) = test_app();
    let (status, err) = send(&app, "POST", "/v1/tokens", Some(json!({"owner": "0x1234"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "BAD_REQUEST");
}

// -- Identities Root ----------------------------------------------------------

#[tokio::test]
async fn test_root_absent_before_commit() {
    let (_, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    send(&app, "POST", "/v1/tokens", Some(json!({"owner": holder.address().to_string()}))).await;
    let token = TokenId::from_owner(&holder.address());
    let (status, _) = send(&app, "GET", &format!("/v1/tokens/{token}/identities-root"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_commit_and_read_root() {
    let (_, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (token_id, root) = bind(&app, &holder).await;

    let (status, body) = send(&app, "GET", &format!("/v1/tokens/{token_id}/identities-root"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["root"], root.to_string());
    assert_eq!(body["nonce"], 1);

    let hex_id = TokenId::from_owner(&holder.address()).to_hex();
    let (status, body) = send(&app, "GET", &format!("/v1/tokens/{hex_id}/identities-root"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_id"], token_id);
}

#[tokio::test]
async fn test_commit_by_non_controller_is_403() {
    let (state, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (token_id, root) = bind(&app, &holder).await;

    let intruder = Secp256k1KeyPair::generate();
    let evil = erc7231_core::keccak256(b"evil");
    let (status, err) = put_root(&app, &intruder, &token_id, 1, &evil).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["error"]["code"], "FORBIDDEN");

    let token = token_id.parse().unwrap();
    assert_eq!(state.registry.get_identities_root(&token), Some(root));
}

#[tokio::test]
async fn test_commit_with_malformed_signature_is_422() {
    let (_, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (token_id, root) = bind(&app, &holder).await;
    let zero_sig = format!("0x{}", "00".repeat(65));
    let (status, _) = put_signed(&app, &token_id, 1, &root, &zero_sig).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_replayed_write_cannot_roll_back_root() {
    let (state, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (token_id, h1) = bind(&app, &holder).await;
    let token: TokenId = token_id.parse().unwrap();
    let sig1 = holder
        .sign_root_write(&token, 0, &h1, DigestAlgorithm::Keccak256)
        .unwrap()
        .to_hex();

    let h2 = erc7231_core::keccak256(b"second");
    let (status, body) = put_root(&app, &holder, &token_id, 1, &h2).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["nonce"], 2);

    // Same request bytes as the first write.
    let (status, err) = put_signed(&app, &token_id, 0, &h1, &sig1).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFLICT");

    // Relabelling the old authorization with the current nonce recovers a stranger.
    let (status, _) = put_signed(&app, &token_id, 2, &h1, &sig1).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, current) = send(&app, "GET", &format!("/v1/tokens/{token_id}/identities-root"), None).await;
    assert_eq!(current["root"], h2.to_string());
    assert_eq!(state.registry.get_identities_root(&token), Some(h2));
    assert_eq!(state.audit_log.len(), 2);
}

#[tokio::test]
async fn test_binding_signature_cannot_write() {
    let (_, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (token_id, root) = bind(&app, &holder).await;
    let binding = holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
    let other = erc7231_core::keccak256(b"other");
    let (status, _) = put_signed(&app, &token_id, 1, &other, &binding.to_hex()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_write_authorization_is_bound_to_token() {
    let (state, app) = test_app();
    let operator = Secp256k1KeyPair::generate();
    let alice = Secp256k1KeyPair::generate();
    let bob = Secp256k1KeyPair::generate();
    let (alice_token, _) = bind(&app, &alice).await;
    let (bob_token, bob_root) = bind(&app, &bob).await;
    state
        .ledger
        .set_approval_for_all(alice.address(), operator.address(), true);
    state
        .ledger
        .set_approval_for_all(bob.address(), operator.address(), true);

    let root = erc7231_core::keccak256(b"operator");
    let alice_id: TokenId = alice_token.parse().unwrap();
    let sig = operator
        .sign_root_write(&alice_id, 1, &root, DigestAlgorithm::Keccak256)
        .unwrap();
    let (status, _) = put_signed(&app, &bob_token, 1, &root, &sig.to_hex()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let bob_id: TokenId = bob_token.parse().unwrap();
    assert_eq!(state.registry.get_identities_root(&bob_id), Some(bob_root));

    let (status, _) = put_signed(&app, &alice_token, 1, &root, &sig.to_hex()).await;
    assert_eq!(status, StatusCode::OK);
}

// -- Verification -------------------------------------------------------------

#[tokio::test]
async fn test_verify_with_user_ids_and_claims() {
    let (_, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (token_id, root) = bind(&app, &holder).await;
    let sig = holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
    let uri = format!("/v1/tokens/{token_id}/verify");

    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({
            "claimant": holder.address().to_string(),
            "user_ids": ["openID2:steam:a1", "did:polygonId:b2"],
            "root": root.to_string(),
            "signature": sig.to_hex(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (_, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({
            "claimant": holder.address().to_string(),
            "claims": claims_json(),
            "root": root.to_string(),
            "signature": sig.to_hex(),
        })),
    )
    .await;
    assert_eq!(body["valid"], true);

    let mut edited = claims_json();
    edited[0]["memo"] = json!("memo2");
    let (status, body) = send(
        &app,
        "POST",
        &uri,
        Some(json!({
            "claimant": holder.address().to_string(),
            "claims": edited,
            "root": root.to_string(),
            "signature": sig.to_hex(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_verify_wrong_claimant_is_false() {
    let (_, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (token_id, root) = bind(&app, &holder).await;
    let sig = holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
    let (_, body) = send(
        &app,
        "POST",
        &format!("/v1/tokens/{token_id}/verify"),
        Some(json!({
            "claimant": Secp256k1KeyPair::generate().address().to_string(),
            "user_ids": ["openID2:steam:a1"],
            "root": root.to_string(),
            "signature": sig.to_hex(),
        })),
    )
    .await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_verify_requires_exactly_one_claim_form() {
    let (_, app) = test_app();
    let holder = Secp256k1KeyPair::generate();
    let (token_id, root) = bind(&app, &holder).await;
    let sig = holder.sign_root(&root, DigestAlgorithm::Keccak256).unwrap();
    let uri = format!("/v1/tokens/{token_id}/verify");

    for extra in [json!({}), json!({"user_ids": ["a"], "claims": claims_json()})] {
        let mut body = json!({
            "claimant": holder.address().to_string(),
            "root": root.to_string(),
            "signature": sig.to_hex(),
        });
        for (k, v) in extra.as_object().unwrap() {
            body[k] = v.clone();
        }
        let (status, err) = send(&app, "POST", &uri, Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err["error"]["code"], "VALIDATION_ERROR");
    }
}

// -- Claims -------------------------------------------------------------------

#[tokio::test]
async fn test_digest_returns_canonical_json() {
    let (_, app) = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/claims/digest",
        Some(json!({"claims": [{"userID": "u", "verifierURI": "v", "memo": "m"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canonical"], r#"[{"userID":"u","verifierUri1":"v","memo":"m"}]"#);
    assert_eq!(body["encoding"], "compact");
    assert_eq!(body["algorithm"], "keccak256");
    let digest: Hash256 = body["digest"].as_str().unwrap().parse().unwrap();
    let msg: Hash256 = body["message_digest"].as_str().unwrap().parse().unwrap();
    assert_eq!(msg, erc7231_core::message_digest(&digest, DigestAlgorithm::Keccak256));
}

#[tokio::test]
async fn test_digest_requires_memo() {
    let (_, app) = test_app();
    let (status, err) = send(
        &app,
        "POST",
        "/v1/claims/digest",
        Some(json!({"claims": [{"userID": "u", "verifierUri1": "v"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["error"]["code"], "BAD_REQUEST");
}

// -- Events -------------------------------------------------------------------

#[tokio::test]
async fn test_events_record_commits() {
    let (_, app) = test_app();
    let alice = Secp256k1KeyPair::generate();
    let bob = Secp256k1KeyPair::generate();
    let (alice_token, alice_root) = bind(&app, &alice).await;
    bind(&app, &bob).await;

    let (status, all) = send(&app, "GET", "/v1/events", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["sequence"], 1);

    let (_, mine) = send(&app, "GET", &format!("/v1/events?token_id={alice_token}"), None).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["event"], "SetIdentitiesRoot");
    assert_eq!(mine[0]["root"], alice_root.to_string());

    let (status, _) = send(&app, "GET", "/v1/events?token_id=zz", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_auth_rejects_unauthorized() {
    let app = test_app_with_auth("secret-token");
    let (status, err) = send(&app, "GET", "/v1/events", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_accepts_valid_token() {
    let app = test_app_with_auth("secret-token");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/events")
                .header("authorization", "Bearer secret-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_bypasses_auth() {
    let app = test_app_with_auth("secret-token");
    let (status, _) = send(&app, "GET", "/health/liveness", None).await;
    assert_eq!(status, StatusCode::OK);
}

// -- Metrics & OpenAPI --------------------------------------------------------

#[tokio::test]
async fn test_metrics_served_when_handle_present() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let app = erc7231_api::app(AppState::with_config(AppConfig::default(), Some(handle)));
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_absent_when_disabled() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let config = AppConfig {
        metrics_enabled: false,
        ..AppConfig::default()
    };
    let app = erc7231_api::app(AppState::with_config(config, Some(handle)));
    let (status, _) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_spec_served() {
    let (_, app) = test_app();
    let (status, spec) = send(&app, "GET", "/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(spec["paths"]["/v1/tokens/{token_id}/verify"].is_object());
}
