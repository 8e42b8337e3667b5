mod common;

use std::sync::Arc;

use common::{signed_in, with_profile};
use parking_lot::Mutex;
use wagerline::testing::{json_response, profile_body};
use wagerline::{CoinRequestDesk, CoinRequestStatus, Error};

fn request_json(id: u64, amount: i64, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "user": {"id": 7, "username": "alice"},
        "amount": amount,
        "reason": "Ran dry at the dice table",
        "status": status,
        "reviewed_by": null,
        "created_at": "2024-03-01T12:00:00Z",
        "reviewed_at": null
    })
}

#[tokio::test]
async fn test_second_request_refused_while_one_is_pending() {
    let (transport, account) = signed_in(with_profile(0, false, |request| {
        Ok(match request.path.as_str() {
            "/coins/my-requests/" => json_response(
                200,
                &serde_json::json!([request_json(3, 1000, "pending")]).to_string(),
            ),
            _ => json_response(500, r#"{"error":"should not be called"}"#),
        })
    }));
    account.refresh().await.unwrap();
    let desk = CoinRequestDesk::new(account.clone());

    desk.sync().await.unwrap();
    assert!(desk.has_pending());

    let err = desk.submit(1000, "again please").await.unwrap_err();
    assert!(matches!(err, Error::Rejected(_)));
    assert_eq!(transport.count_path("/coins/request/"), 0);
}

#[tokio::test]
async fn test_out_of_range_amount_is_never_sent() {
    let (transport, account) = signed_in(with_profile(0, false, |_| {
        Ok(json_response(500, "{}"))
    }));
    let desk = CoinRequestDesk::new(account);

    assert!(matches!(desk.submit(99, "").await, Err(Error::Validation(_))));
    assert!(matches!(desk.submit(10_001, "").await, Err(Error::Validation(_))));
    assert!(matches!(
        desk.submit(500, &"x".repeat(201)).await,
        Err(Error::Validation(_))
    ));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_recovery_request_then_approval_is_detected() {
    let mine = Arc::new(Mutex::new(serde_json::json!([])));
    let listing = mine.clone();
    let (transport, account) = signed_in(with_profile(0, false, move |request| {
        Ok(match request.path.as_str() {
            "/coins/request/" => {
                let created = request_json(11, 1000, "pending");
                *listing.lock() = serde_json::json!([created.clone()]);
                json_response(201, &created.to_string())
            }
            "/coins/my-requests/" => json_response(200, &listing.lock().to_string()),
            _ => json_response(404, "{}"),
        })
    }));
    account.refresh().await.unwrap();
    assert!(account.is_bankrupt());
    let desk = CoinRequestDesk::new(account.clone());

    desk.sync().await.unwrap();
    assert!(!desk.has_pending());

    let created = desk.request_recovery().await.unwrap();
    assert_eq!(created.status, CoinRequestStatus::Pending);
    assert!(desk.has_pending());
    let sent = transport.last_request().unwrap().json().unwrap();
    assert_eq!(sent["amount"], 1000);
    assert_eq!(sent["reason"], wagerline::coins::RECOVERY_REASON);

    // Still pending on the authority
    assert!(desk.sync().await.unwrap().is_empty());

    *mine.lock() = serde_json::json!([request_json(11, 1000, "approved")]);
    let approved = desk.sync().await.unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id, 11);
    assert!(!desk.has_pending());

    // Reported once only
    assert!(desk.sync().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_staff_actions_need_staff_profile() {
    let (transport, account) = signed_in(with_profile(1000, false, |_| {
        Ok(json_response(200, "[]"))
    }));
    account.refresh().await.unwrap();
    let desk = CoinRequestDesk::new(account);

    assert!(matches!(desk.load_pending().await, Err(Error::Rejected(_))));
    assert!(matches!(desk.approve(1).await, Err(Error::Rejected(_))));
    assert!(matches!(desk.deny(1).await, Err(Error::Rejected(_))));
    // Only the profile fetch went out
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_processed_requests_leave_review_queue() {
    let (transport, account) = signed_in(with_profile(5000, true, |request| {
        Ok(match request.path.as_str() {
            "/admin/pending-requests/" => json_response(
                200,
                &serde_json::json!([
                    request_json(1, 500, "pending"),
                    request_json(2, 2000, "pending"),
                    request_json(3, 100, "pending")
                ])
                .to_string(),
            ),
            "/admin/approve/1/" => {
                let mut body = request_json(1, 500, "approved");
                body["reviewed_by"] = serde_json::json!({"id": 1, "username": "pit_boss"});
                body["reviewed_at"] = serde_json::json!("2024-03-01T13:00:00Z");
                json_response(200, &body.to_string())
            }
            "/admin/deny/3/" => json_response(200, &request_json(3, 100, "denied").to_string()),
            "/admin/approve/2/" => {
                json_response(400, r#"{"error":"Request already processed"}"#)
            }
            _ => json_response(404, r#"{"detail":"Not found."}"#),
        })
    }));
    account.refresh().await.unwrap();
    assert!(account.is_staff());
    let desk = CoinRequestDesk::new(account);

    assert_eq!(desk.load_pending().await.unwrap().len(), 3);

    let approved = desk.approve(1).await.unwrap();
    assert_eq!(approved.status, CoinRequestStatus::Approved);
    assert_eq!(approved.reviewed_by.unwrap().username, "pit_boss");

    let denied = desk.deny(3).await.unwrap();
    assert_eq!(denied.status, CoinRequestStatus::Denied);

    let queue: Vec<u64> = desk.review_queue().iter().map(|r| r.id).collect();
    assert_eq!(queue, vec![2]);

    // A failed review leaves the entry in place
    let err = desk.approve(2).await.unwrap_err();
    assert_eq!(err.to_string(), "Request already processed");
    assert_eq!(desk.review_queue().len(), 1);
    assert_eq!(transport.count_path("/admin/approve/2/"), 1);
}

#[tokio::test]
async fn test_first_sync_reports_approval_newer_than_profile() {
    let reviewed_later = Arc::new(Mutex::new(serde_json::json!([])));
    let listing = reviewed_later.clone();
    let (_, account) = signed_in(with_profile(0, false, move |request| {
        Ok(match request.path.as_str() {
            "/coins/my-requests/" => json_response(200, &listing.lock().to_string()),
            _ => json_response(404, "{}"),
        })
    }));
    account.refresh().await.unwrap();
    let loaded_at = account.profile_loaded_at().unwrap();

    let mut old = request_json(4, 500, "approved");
    old["reviewed_at"] = serde_json::json!("2024-03-01T13:00:00Z");
    let mut fresh = request_json(5, 2000, "approved");
    fresh["reviewed_at"] = serde_json::json!((loaded_at + chrono::Duration::seconds(5)).to_rfc3339());
    *reviewed_later.lock() = serde_json::json!([fresh, old]);

    // A desk that never saw the request pending still reports it
    let desk = CoinRequestDesk::new(account.clone());
    let approved = desk.sync().await.unwrap();
    let ids: Vec<u64> = approved.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![5]);
    assert!(desk.sync().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cached_requests_do_not_follow_a_new_sign_in() {
    let (transport, account) = signed_in(|request| {
        Ok(match (request.path.as_str(), request.bearer.as_deref()) {
            ("/auth/login/", _) => json_response(200, r#"{"access":"access-bob","refresh":"refresh-bob"}"#),
            ("/profile/", Some("access-bob")) => json_response(200, &profile_body("bob", 0, false)),
            ("/profile/", _) => json_response(200, &profile_body("alice", 0, true)),
            ("/coins/my-requests/", _) => json_response(
                200,
                &serde_json::json!([request_json(3, 1000, "pending")]).to_string(),
            ),
            ("/admin/pending-requests/", _) => json_response(
                200,
                &serde_json::json!([request_json(9, 700, "pending")]).to_string(),
            ),
            ("/coins/request/", _) => json_response(201, &request_json(12, 1000, "pending").to_string()),
            _ => json_response(404, "{}"),
        })
    });
    account.refresh().await.unwrap();
    let desk = CoinRequestDesk::new(account.clone());
    desk.sync().await.unwrap();
    desk.load_pending().await.unwrap();
    assert!(desk.has_pending());
    assert_eq!(desk.review_queue().len(), 1);

    account.logout().unwrap();
    assert!(!desk.has_pending());
    assert!(desk.my_requests().is_none());
    assert!(desk.review_queue().is_empty());

    account.login("bob", "hunter22").await.unwrap();
    let created = desk.request_recovery().await.unwrap();
    assert_eq!(created.id, 12);
    assert_eq!(transport.count_path("/coins/request/"), 1);
    assert_eq!(transport.last_request().unwrap().bearer.as_deref(), Some("access-bob"));
}
