mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{signed_in, with_transport, ACCESS, REFRESH};
use futures::future::join_all;
use parking_lot::Mutex;
use wagerline::testing::{json_response, profile_body, ScriptedTransport};
use wagerline::transport::{CredentialStore, FileCredentialStore};
use wagerline::{AccountPhase, AccountState, ApiClient, CasinoApi, CredentialPair, Error};

const REFRESH_PATH: &str = "/auth/refresh/";

#[tokio::test]
async fn test_concurrent_expiry_triggers_one_refresh() {
    let transport = ScriptedTransport::new(|request| {
        Ok(match (request.path.as_str(), request.bearer.as_deref()) {
            (REFRESH_PATH, _) => json_response(200, r#"{"access":"access-2"}"#),
            ("/profile/", Some("access-2")) => json_response(200, &profile_body("alice", 250, false)),
            _ => json_response(401, r#"{"detail":"Given token not valid for any token type"}"#),
        })
    })
    .with_latency(Duration::from_millis(20));
    let (transport, account) = with_transport(transport, Some(CredentialPair::new(ACCESS, REFRESH)));

    let api = account.api();
    let results = join_all((0..8).map(|_| api.profile())).await;

    assert!(results.iter().all(|r| matches!(r, Ok(profile) if profile.coins == 250)));
    assert_eq!(transport.count_path(REFRESH_PATH), 1);
    assert_eq!(api.client().stats().refreshes(), 1);
    // Every call was retried exactly once with the new token
    let retried = transport
        .requests()
        .iter()
        .filter(|r| r.path == "/profile/" && r.bearer.as_deref() == Some("access-2"))
        .count();
    assert_eq!(retried, 8);
}

#[tokio::test]
async fn test_concurrent_expiry_shares_failed_refresh() {
    let authority_up = Arc::new(AtomicBool::new(false));
    let up = authority_up.clone();
    let transport = ScriptedTransport::new(move |request| {
        match (request.path.as_str(), request.bearer.as_deref()) {
            (REFRESH_PATH, _) if !up.load(Ordering::SeqCst) => {
                Err(Error::Network("connection reset".into()))
            }
            (REFRESH_PATH, _) => Ok(json_response(200, r#"{"access":"access-2"}"#)),
            ("/profile/", Some("access-2")) => {
                Ok(json_response(200, &profile_body("alice", 250, false)))
            }
            _ => Ok(json_response(401, r#"{"detail":"Token expired"}"#)),
        }
    })
    .with_latency(Duration::from_millis(20));
    let (transport, account) = with_transport(transport, Some(CredentialPair::new(ACCESS, REFRESH)));

    let api = account.api();
    let results = join_all((0..8).map(|_| api.profile())).await;

    // Every waiter gets the outcome of the single attempt
    assert!(results.iter().all(|r| matches!(r, Err(Error::Network(_)))));
    assert_eq!(transport.count_path(REFRESH_PATH), 1);
    assert!(api.is_authenticated());

    // A request made after the failure tries again
    authority_up.store(true, Ordering::SeqCst);
    let profile = api.profile().await.unwrap();
    assert_eq!(profile.coins, 250);
    assert_eq!(transport.count_path(REFRESH_PATH), 2);
}

#[tokio::test]
async fn test_rejected_refresh_expires_session_everywhere() {
    let (transport, account) = signed_in(|request| {
        Ok(match request.path.as_str() {
            REFRESH_PATH => json_response(401, r#"{"detail":"Token is blacklisted"}"#),
            _ => json_response(401, r#"{"detail":"Token expired"}"#),
        })
    });

    let err = account.refresh().await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired));
    assert!(err.requires_login());
    assert!(!account.api().is_authenticated());
    assert_eq!(account.phase(), AccountPhase::Anonymous);
    assert_eq!(account.api().client().stats().sessions_expired(), 1);

    let sent = transport.request_count();
    assert!(matches!(account.api().history().await, Err(Error::SessionExpired)));
    assert!(matches!(account.api().my_coin_requests().await, Err(Error::SessionExpired)));
    // Required-auth calls fail fast without touching the wire
    assert_eq!(transport.request_count(), sent);
}

#[tokio::test]
async fn test_refresh_network_failure_keeps_credentials() {
    let (transport, account) = signed_in(|request| match request.path.as_str() {
        REFRESH_PATH => Err(Error::Network("connection refused".into())),
        _ => Ok(json_response(401, r#"{"detail":"Token expired"}"#)),
    });

    let err = account.refresh().await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(err.is_retryable());
    assert!(account.api().is_authenticated());
    assert_eq!(transport.count_path(REFRESH_PATH), 1);
}

#[tokio::test]
async fn test_optional_auth_survives_missing_session() {
    let education = r#"{"title":"Why the house always wins","sections":[],"math_breakdown":{"roulette":{"base_house_edge":"2.7%","our_house_edge":"5.4%","expected_loss_per_100_bets":"5.4 coins"}}}"#;
    let (transport, account) = with_transport(
        ScriptedTransport::new(move |_| Ok(json_response(200, education))),
        None,
    );

    let content = account.education().await.unwrap();
    assert_eq!(content.math_breakdown.len(), 1);
    assert!(transport.last_request().unwrap().bearer.is_none());
}

#[tokio::test]
async fn test_expiry_notifies_account_listener_once() {
    let (_, account) = signed_in(|request| {
        Ok(match request.path.as_str() {
            "/profile/" if request.bearer.as_deref() == Some(ACCESS) => {
                json_response(200, &profile_body("alice", 40, false))
            }
            REFRESH_PATH => json_response(400, r#"{"refresh":["This field is required."]}"#),
            _ => json_response(401, "{}"),
        })
    });
    account.refresh().await.unwrap();
    assert_eq!(account.phase(), AccountPhase::Ready);

    // The next call sees a 401 on another endpoint
    assert!(matches!(account.history().await, Err(Error::SessionExpired)));
    assert!(account.profile().is_none());
    assert_eq!(account.phase(), AccountPhase::Anonymous);
}

#[tokio::test]
async fn test_session_persists_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let authority = || {
        ScriptedTransport::new(|request| {
            Ok(match (request.path.as_str(), request.bearer.as_deref()) {
                ("/auth/login/", _) => {
                    json_response(200, r#"{"access":"fresh-access","refresh":"fresh-refresh"}"#)
                }
                (REFRESH_PATH, _) => json_response(200, r#"{"access":"rotated","refresh":"rotated-refresh"}"#),
                ("/profile/", Some("fresh-access")) => {
                    json_response(401, r#"{"detail":"Token expired"}"#)
                }
                ("/profile/", Some("rotated")) => json_response(200, &profile_body("bob", 75, false)),
                _ => json_response(401, "{}"),
            })
        })
    };

    {
        let store = Arc::new(FileCredentialStore::new(&path));
        let client = Arc::new(ApiClient::new(Arc::new(authority()), store.clone()));
        let api = CasinoApi::new(client);
        api.login("bob", "hunter22").await.unwrap();
        assert_eq!(
            store.load().unwrap(),
            Some(CredentialPair::new("fresh-access", "fresh-refresh"))
        );
    }

    // Restart: the saved pair is picked up, refreshed and rotated on disk
    let transport = Arc::new(authority());
    let store = Arc::new(FileCredentialStore::new(&path));
    let client = Arc::new(ApiClient::new(transport.clone(), store.clone()));
    let account = AccountState::new(CasinoApi::new(client));

    assert_eq!(account.bootstrap().await.unwrap(), AccountPhase::Ready);
    assert_eq!(account.coins(), Some(75));
    assert_eq!(
        store.load().unwrap(),
        Some(CredentialPair::new("rotated", "rotated-refresh"))
    );
    let refresh = &transport.requests()[1];
    assert_eq!(refresh.path, REFRESH_PATH);
    assert_eq!(refresh.json().unwrap()["refresh"], "fresh-refresh");

    account.logout().unwrap();
    assert!(store.load().unwrap().is_none());
    assert_eq!(account.phase(), AccountPhase::Destroyed);
}

#[tokio::test]
async fn test_bootstrap_outage_keeps_saved_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let saved = CredentialPair::new(ACCESS, REFRESH);
    FileCredentialStore::new(&path).save(&saved).unwrap();

    for outage in [
        Err(Error::Network("connection refused".into())),
        Ok(json_response(503, r#"{"error":"Server error"}"#)),
    ] {
        let reply = Mutex::new(Some(outage));
        let transport = Arc::new(ScriptedTransport::new(move |_| {
            reply
                .lock()
                .take()
                .unwrap_or_else(|| Ok(json_response(500, "{}")))
        }));
        let store = Arc::new(FileCredentialStore::new(&path));
        let client = Arc::new(ApiClient::new(transport.clone(), store.clone()));
        let account = AccountState::new(CasinoApi::new(client));

        let err = account.bootstrap().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!err.requires_login());
        assert_eq!(account.phase(), AccountPhase::Uninitialized);
        assert!(account.api().is_authenticated());
        assert_eq!(store.load().unwrap(), Some(saved.clone()));
        assert_eq!(transport.request_count(), 1);
    }
}

#[tokio::test]
async fn test_bootstrap_with_dead_session_logs_out() {
    let (transport, account) = signed_in(|request| {
        Ok(match request.path.as_str() {
            REFRESH_PATH => json_response(401, r#"{"detail":"Token is blacklisted"}"#),
            _ => json_response(401, r#"{"detail":"Token expired"}"#),
        })
    });

    assert_eq!(account.bootstrap().await.unwrap(), AccountPhase::Anonymous);
    assert!(!account.api().is_authenticated());
    assert_eq!(transport.count_path(REFRESH_PATH), 1);
}
