use actix_web::{http::StatusCode, test::TestRequest};
use order_engine::{db_types::Actor, test_utils::system::TestSystem};
use serde_json::{json, Value};

use super::helpers::{as_actor, cod_order, send};

struct Parties {
    retailer: Actor,
    wholesaler: Actor,
    partner: Actor,
}

fn parties() -> Parties {
    Parties {
        retailer: Actor::retailer("ravi"),
        wholesaler: Actor::wholesaler("wasim"),
        partner: Actor::delivery_partner("priya"),
    }
}

async fn post(sys: &TestSystem, actor: &Actor, uri: &str, body: Value) -> (StatusCode, Value) {
    send(&sys.db, as_actor(TestRequest::post().uri(uri), actor).set_json(body)).await
}

async fn get(sys: &TestSystem, actor: &Actor, uri: &str) -> (StatusCode, Value) {
    send(&sys.db, as_actor(TestRequest::get().uri(uri), actor)).await
}

async fn place(sys: &TestSystem, p: &Parties) -> String {
    let body = serde_json::to_value(cod_order(&p.wholesaler)).expect("Could not serialize order");
    let (status, body) = post(sys, &p.retailer, "/api/orders", body).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["order"]["id"].as_str().expect("Order has no id").to_string()
}

/// Places an order and walks it all the way to delivered.
async fn deliver(sys: &TestSystem, p: &Parties) -> String {
    let id = place(sys, p).await;
    let (status, _) = post(sys, &p.wholesaler, &format!("/api/order/{id}/status"), json!({"status": "confirmed"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) =
        post(sys, &p.wholesaler, &format!("/api/order/{id}/assign"), json!({"delivery_partner_id": "priya"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["update"]["status"], "assigned");
    let (status, _) = post(sys, &p.wholesaler, &format!("/api/order/{id}/status"), json!({"status": "dispatched"})).await;
    assert_eq!(status, StatusCode::OK);
    for step in ["picked_up", "in_transit", "delivered"] {
        let body = json!({"status": step, "latitude": 19.076, "longitude": 72.8777});
        let (status, body) = post(sys, &p.partner, &format!("/api/order/{id}/delivery"), body).await;
        assert_eq!(status, StatusCode::OK, "{step}: {body}");
    }
    id
}

#[actix_web::test]
async fn health() {
    let sys = TestSystem::new().await;
    let (status, body) = send(&sys.db, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("👍️\n".into()));
    sys.tear_down().await;
}

#[actix_web::test]
async fn missing_identity_is_unauthenticated() {
    let sys = TestSystem::new().await;
    let (status, body) = send(&sys.db, TestRequest::get().uri("/api/orders")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
    sys.tear_down().await;
}

#[actix_web::test]
async fn malformed_order_is_a_bad_request() {
    let sys = TestSystem::new().await;
    let p = parties();
    let (status, body) = post(&sys, &p.retailer, "/api/orders", json!({"wholesaler_id": "wasim"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");

    let mut order = serde_json::to_value(cod_order(&p.wholesaler)).unwrap();
    order["items"] = json!([]);
    let (status, body) = post(&sys, &p.retailer, "/api/orders", order.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");

    // Totals that cannot be represented are rejected before anything is stored
    order["items"] = json!([{"product_id": "rice", "quantity": i64::MAX / 2, "unit_price": 4}]);
    let (status, body) = post(&sys, &p.retailer, "/api/orders", order).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["kind"], "invalid_request");
    let (status, body) = get(&sys, &p.retailer, "/api/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(0));
    sys.tear_down().await;
}

#[actix_web::test]
async fn cash_on_delivery_over_http() {
    let sys = TestSystem::new().await;
    let p = parties();
    let id = deliver(&sys, &p).await;

    let (status, body) =
        post(&sys, &p.partner, &format!("/api/order/{id}/proof"), json!({"receiver_name": "Ravi Kumar"})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let (status, body) = get(&sys, &p.retailer, &format!("/api/order/{id}/proof")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receiver_name"], "Ravi Kumar");

    let uri = format!("/api/order/{id}/payment/cod");
    let (status, body) = post(&sys, &p.wholesaler, &uri, Value::Null).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["outcome"]["outcome"], "settled");
    assert_eq!(body["entry"]["amount"], 50_000);
    assert_eq!(body["entry"]["fee"], 500);
    assert_eq!(body["order"]["payment_status"], "paid");
    // Retrying is safe
    let (status, body) = post(&sys, &p.wholesaler, &uri, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["outcome"], "already_settled");

    let (status, body) = get(&sys, &p.retailer, &format!("/api/order/{id}/timeline")).await;
    assert_eq!(status, StatusCode::OK);
    let steps = body.as_array().unwrap().iter().map(|u| u["status"].as_str().unwrap().to_string()).collect::<Vec<_>>();
    assert_eq!(steps, vec!["assigned", "picked_up", "in_transit", "delivered"]);

    // Look the order up by its short id, as printed on the receipt
    let (status, body) = get(&sys, &p.retailer, &format!("/api/order/{}", &id[..8])).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["strategy"], "truncated_id");
    assert_eq!(body["detail"]["order"]["status"], "delivered");
    assert_eq!(body["detail"]["ledger_entry"]["amount"], 50_000);
    assert_eq!(body["detail"]["items"].as_array().map(|i| i.len()), Some(1));
    sys.tear_down().await;
}

#[actix_web::test]
async fn errors_map_to_status_codes() {
    let sys = TestSystem::new().await;
    let p = parties();
    let id = deliver(&sys, &p).await;

    let (status, body) = post(&sys, &p.wholesaler, &format!("/api/order/{id}/status"), json!({"status": "rejected"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_transition");

    let stranger = Actor::retailer("someone-else");
    let (status, body) = get(&sys, &stranger, &format!("/api/order/{id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "unauthorized");

    let (status, body) = get(&sys, &p.retailer, "/api/order/does-not-exist-anywhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let other = place(&sys, &p).await;
    let (status, body) = post(&sys, &p.wholesaler, &format!("/api/order/{other}/payment/cod"), Value::Null).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_transition");

    let (status, body) = get(&sys, &p.retailer, &format!("/api/order/{other}/proof")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    sys.tear_down().await;
}

#[actix_web::test]
async fn order_lists_are_scoped_to_the_caller() {
    let sys = TestSystem::new().await;
    let p = parties();
    let first = place(&sys, &p).await;
    let _second = place(&sys, &p).await;
    let (status, _) =
        post(&sys, &p.wholesaler, &format!("/api/order/{first}/status"), json!({"status": "confirmed"})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = get(&sys, &p.retailer, "/api/orders").await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(2));
    let (_, body) = get(&sys, &p.wholesaler, "/api/orders?status=confirmed").await;
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], first.as_str());
    let (_, body) = get(&sys, &Actor::retailer("someone-else"), "/api/orders").await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(0));
    let (status, body) = get(&sys, &p.retailer, "/api/orders?status=lost").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_request");
    sys.tear_down().await;
}
