use actix_web::{http::StatusCode, test, test::TestRequest, App};
use log::debug;
use order_engine::{
    db_types::{Actor, NewOrderItem, Paise, PaymentMethod},
    events::EventProducers,
    order_objects::NewOrderRequest,
    OrderDatabase,
    ResolverConfig,
};
use serde_json::Value;

use crate::{
    identity::{ROLE_HEADER, USER_ID_HEADER},
    server::configure_app,
};

/// Adds the identity headers for `actor` to a request.
pub fn as_actor(req: TestRequest, actor: &Actor) -> TestRequest {
    req.insert_header((USER_ID_HEADER, actor.user_id.as_str())).insert_header((ROLE_HEADER, actor.role.to_string()))
}

/// Sends `req` to a fully configured app backed by `db` and returns the status and JSON body.
pub async fn send<B: OrderDatabase + 'static>(db: &B, req: TestRequest) -> (StatusCode, Value) {
    let db = db.clone();
    let app = App::new().configure(|cfg| configure_app(cfg, db, EventProducers::default(), ResolverConfig::default()));
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    let json = serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into()));
    debug!("Response: {status} {json}");
    (status, json)
}

pub fn cod_order(wholesaler: &Actor) -> NewOrderRequest {
    NewOrderRequest {
        wholesaler_id: wholesaler.user_id.clone(),
        items: vec![NewOrderItem::new("basmati-5kg", 2, Paise::from_rupees(250))],
        payment_method: PaymentMethod::CashOnDelivery,
        notes: None,
        reference_number: None,
    }
}
