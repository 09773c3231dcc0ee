use std::str::FromStr;

use cucumber::{then, when};
use order_engine::{
    db_types::{Actor, DeliveryStatus, NewOrderItem, OrderStatusType, Paise, PaymentMethod, PaymentStatus},
    order_objects::{
        AssignPartnerRequest,
        DeliveryProofRequest,
        DeliveryUpdateRequest,
        NewOrderRequest,
        PaymentOutcome,
        StatusChangeRequest,
    },
    DeliveryManagement,
    LedgerManagement,
};

use crate::cucumber::OrderWorld;

#[when(expr = "retailer '{word}' places a cash on delivery order with wholesaler '{word}' for {int} x '{word}' at {int} rupees")]
async fn place_cod_order(
    world: &mut OrderWorld,
    retailer: String,
    wholesaler: String,
    quantity: i64,
    product: String,
    price: i64,
) {
    let request = NewOrderRequest {
        wholesaler_id: wholesaler.into(),
        items: vec![NewOrderItem::new(product, quantity, Paise::from_rupees(price))],
        payment_method: PaymentMethod::CashOnDelivery,
        notes: None,
        reference_number: None,
    };
    let placed = world.system().orders.place_order(&Actor::retailer(retailer), request).await.expect("Error placing order");
    world.current_order = Some(placed.order.id);
}

#[when(expr = "wholesaler '{word}' marks the order {word}")]
async fn wholesaler_transition(world: &mut OrderWorld, wholesaler: String, status: String) {
    let status = OrderStatusType::from_str(&status).expect("Not a valid order status");
    let id = world.order_id();
    let result =
        world.system().orders.update_status(&Actor::wholesaler(wholesaler), &id, StatusChangeRequest::new(status)).await;
    world.last_error = result.err();
}

#[when(expr = "wholesaler '{word}' assigns delivery partner '{word}'")]
async fn assign_partner(world: &mut OrderWorld, wholesaler: String, partner: String) {
    let id = world.order_id();
    let request = AssignPartnerRequest { delivery_partner_id: partner.into() };
    world
        .system()
        .delivery
        .assign_delivery_partner(&Actor::wholesaler(wholesaler), &id, request)
        .await
        .expect("Error assigning delivery partner");
}

#[when(expr = "delivery partner '{word}' posts {word}")]
async fn post_delivery_update(world: &mut OrderWorld, partner: String, status: String) {
    let status = DeliveryStatus::from_str(&status).expect("Not a valid delivery status");
    let id = world.order_id();
    let request = DeliveryUpdateRequest::new(status);
    let result = world.system().delivery.post_delivery_update(&Actor::delivery_partner(partner), &id, request).await;
    world.last_error = result.err();
}

#[when(expr = "delivery partner '{word}' submits proof of delivery received by {string}")]
async fn submit_proof(world: &mut OrderWorld, partner: String, receiver: String) {
    let id = world.order_id();
    let request = DeliveryProofRequest::new(receiver);
    world
        .system()
        .delivery
        .submit_delivery_proof(&Actor::delivery_partner(partner), &id, request)
        .await
        .expect("Error submitting proof of delivery");
}

#[when(expr = "wholesaler '{word}' marks the cash payment received")]
async fn mark_paid(world: &mut OrderWorld, wholesaler: String) {
    let id = world.order_id();
    let result = world.system().payments.mark_payment_received(&Actor::wholesaler(wholesaler), &id).await;
    match result {
        Ok(result) => {
            world.last_payment = Some(result.outcome);
            world.last_error = None;
        },
        Err(e) => {
            world.last_payment = None;
            world.last_error = Some(e);
        },
    }
}

#[then(expr = "the order total is {int} rupees")]
async fn check_total(world: &mut OrderWorld, rupees: i64) {
    let order = world.current_order().await;
    assert_eq!(order.total_amount, Paise::from_rupees(rupees), "Order total is incorrect");
}

#[then(expr = "the order status is {word}")]
async fn check_status(world: &mut OrderWorld, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Not a valid order status");
    let order = world.current_order().await;
    assert_eq!(order.status, expected);
}

#[then(expr = "the latest delivery status is {word}")]
async fn check_latest_delivery(world: &mut OrderWorld, status: String) {
    let expected = DeliveryStatus::from_str(&status).expect("Not a valid delivery status");
    let id = world.order_id();
    let latest = world.system().db.fetch_latest_delivery_update(&id).await.expect("Error fetching timeline");
    assert_eq!(latest.map(|u| u.status), Some(expected));
}

#[then(expr = "the order payment status is {word}")]
async fn check_payment_status(world: &mut OrderWorld, status: String) {
    let expected = match status.as_str() {
        "paid" => PaymentStatus::Paid,
        "pending" => PaymentStatus::Pending,
        _ => panic!("Not a valid payment status: {status}"),
    };
    let order = world.current_order().await;
    assert_eq!(order.payment_status, expected);
}

#[then(expr = "the payment outcome is {word}")]
async fn check_payment_outcome(world: &mut OrderWorld, outcome: String) {
    let outcome = match (outcome.as_str(), world.last_payment.as_ref()) {
        ("settled", Some(PaymentOutcome::Settled)) => true,
        ("already_settled", Some(PaymentOutcome::AlreadySettled)) => true,
        ("partially_settled", Some(PaymentOutcome::PartiallySettled { .. })) => true,
        _ => false,
    };
    assert!(outcome, "Unexpected payment outcome: {:?} (error: {:?})", world.last_payment, world.last_error);
}

#[then(expr = "the ledger holds an entry of {int} rupees with a fee of {int} rupees")]
async fn check_ledger(world: &mut OrderWorld, amount: i64, fee: i64) {
    let id = world.order_id();
    let entry = world.system().db.fetch_ledger_entry(&id).await.expect("Error fetching ledger").expect("No entry");
    assert_eq!(entry.amount, Paise::from_rupees(amount));
    assert_eq!(entry.fee, Paise::from_rupees(fee));
}

#[then(expr = "the ledger has no entry for the order")]
async fn check_no_ledger(world: &mut OrderWorld) {
    let id = world.order_id();
    let entry = world.system().db.fetch_ledger_entry(&id).await.expect("Error fetching ledger");
    assert!(entry.is_none());
}

#[then(expr = "'{word}' has {int} unread notification(s)")]
async fn check_unread(world: &mut OrderWorld, user: String, count: usize) {
    let actor = Actor::retailer(user);
    let unread = world.system().notifications.unread_notifications(&actor).await.expect("Error fetching notifications");
    assert_eq!(unread.len(), count);
}

#[then(expr = "the last call failed with {word}")]
async fn check_error(world: &mut OrderWorld, kind: String) {
    let err = world.last_error.as_ref().expect("The last call did not fail");
    assert_eq!(err.kind().to_string(), kind, "{err}");
}
