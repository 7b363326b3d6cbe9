//! Catalog route tests: snapshot-store behavior observed through HTTP.

use serde_json::Value;

use segundo_lote_integration_tests::{SERVICE_TOKEN, TestContext, events_body};

#[tokio::test]
async fn events_are_fetched_once_within_the_staleness_window() {
    let mut ctx = TestContext::new().await;
    let upstream = ctx
        .upstream
        .mock("GET", "/api/events")
        .match_header("authorization", format!("Bearer {SERVICE_TOKEN}").as_str())
        .with_status(200)
        .with_body(events_body(5))
        .expect(1)
        .create_async()
        .await;

    for _ in 0..2 {
        let response = ctx
            .client
            .get(ctx.url("/api/events"))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("json body");
        assert_eq!(body["events"][0]["ticket_count"], 5);
    }

    // The second read was served from the snapshot, not the upstream.
    upstream.assert_async().await;
}

#[tokio::test]
async fn refresh_param_forces_a_second_fetch() {
    let mut ctx = TestContext::new().await;
    let upstream = ctx
        .upstream
        .mock("GET", "/api/events")
        .with_status(200)
        .with_body(events_body(5))
        .expect(2)
        .create_async()
        .await;

    ctx.client
        .get(ctx.url("/api/events"))
        .send()
        .await
        .expect("request");
    ctx.client
        .get(ctx.url("/api/events?refresh=true"))
        .send()
        .await
        .expect("request");

    upstream.assert_async().await;
}

#[tokio::test]
async fn stale_snapshot_is_served_when_a_forced_refresh_fails() {
    let mut ctx = TestContext::new().await;
    ctx.upstream
        .mock("GET", "/api/events")
        .with_status(200)
        .with_body(events_body(5))
        .expect(1)
        .create_async()
        .await;

    let response = ctx
        .client
        .get(ctx.url("/api/events"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);

    // Upstream goes down; the forced refresh fails but the previous
    // snapshot keeps being served. (Newer mocks take precedence.)
    ctx.upstream
        .mock("GET", "/api/events")
        .with_status(500)
        .with_body(r#"{"error":"boom"}"#)
        .create_async()
        .await;

    let response = ctx
        .client
        .get(ctx.url("/api/events?refresh=true"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["events"][0]["ticket_count"], 5);
}

#[tokio::test]
async fn catalog_read_errors_when_nothing_was_ever_fetched() {
    let mut ctx = TestContext::new().await;
    ctx.upstream
        .mock("GET", "/api/events")
        .with_status(500)
        .with_body(r#"{"error":"boom"}"#)
        .create_async()
        .await;

    let response = ctx
        .client
        .get(ctx.url("/api/events"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["error"], "upstream returned status 500");
}

#[tokio::test]
async fn successful_payment_decrements_the_events_snapshot() {
    let mut ctx = TestContext::new().await;
    let events = ctx
        .upstream
        .mock("GET", "/api/events")
        .with_status(200)
        .with_body(events_body(5))
        .expect(1)
        .create_async()
        .await;
    ctx.upstream
        .mock("POST", "/api/payment/create")
        .with_status(201)
        .with_body(r#"{"id":"pay_1","status":"pending"}"#)
        .create_async()
        .await;

    // Seed the snapshot.
    ctx.client
        .get(ctx.url("/api/events"))
        .send()
        .await
        .expect("request");

    // Purchase two tickets for the event.
    let response = ctx
        .client
        .post(ctx.url("/api/payment/create"))
        .header("authorization", "Bearer buyer-token")
        .json(&serde_json::json!({ "event_id": "evt_1", "quantity": 2 }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 201);

    // The snapshot reflects the optimistic decrement without refetching.
    let response = ctx
        .client
        .get(ctx.url("/api/events"))
        .send()
        .await
        .expect("request");
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["events"][0]["ticket_count"], 3);

    events.assert_async().await;
}

#[tokio::test]
async fn balance_requires_auth_and_reads_through() {
    let mut ctx = TestContext::new().await;

    let response = ctx
        .client
        .get(ctx.url("/api/balance"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 401);

    ctx.upstream
        .mock("GET", "/api/balance")
        .match_header("authorization", "Bearer seller-token")
        .with_status(200)
        .with_body(r#"{"balance":{"available":"100.00","pending":"50.00","total":"150.00"}}"#)
        .create_async()
        .await;

    let response = ctx
        .client
        .get(ctx.url("/api/balance"))
        .header("authorization", "Bearer seller-token")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("json body");
    assert_eq!(body["balance"]["available"], "100.00");
}
