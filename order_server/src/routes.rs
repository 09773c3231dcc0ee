//! Request handler definitions
//!
//! Define each route and its handler here. Handlers translate between JSON and the engine APIs and nothing more. Any
//! business rule belongs in the engine.
//!
//! Since each worker thread processes its requests sequentially, handlers must never block the current thread. Every
//! store call is async, so a handler waiting on the database lets the worker serve other requests in the meantime.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use order_engine::{
    db_types::OrderId,
    order_objects::{
        AssignPartnerRequest,
        DeliveryProofRequest,
        DeliveryUpdateRequest,
        NewOrderRequest,
        StatusChangeRequest,
    },
    DeliveryApi,
    NotificationApi,
    NotificationManagement,
    OrderDatabase,
    OrderFlowApi,
    OrderFlowError,
    OrderManagement,
    OrderResolver,
    PaymentApi,
};

use crate::{
    data_objects::{JsonResponse, OrderListParams},
    errors::ServerError,
    identity::Caller,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl OrderDatabase);
pub async fn place_order<B: OrderDatabase>(
    caller: Caller,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<NewOrderRequest>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST order from {}", caller.actor());
    let placed = api.place_order(caller.actor(), body.into_inner()).await?;
    Ok(HttpResponse::Created().json(placed))
}

route!(my_orders => Get "/orders" impl OrderDatabase);
pub async fn my_orders<B: OrderDatabase>(
    caller: Caller,
    api: web::Data<OrderFlowApi<B>>,
    params: web::Query<OrderListParams>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET orders for {}", caller.actor());
    let orders = api.fetch_orders(caller.actor(), params.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_token => Get "/order/{token}" impl OrderDatabase);
/// Resolves any reference to an order (full id, short id, notification id, reference number or id fragment) and
/// returns the full order detail, along with the strategy that found it.
pub async fn order_by_token<B: OrderDatabase>(
    caller: Caller,
    path: web::Path<String>,
    resolver: web::Data<OrderResolver<B>>,
) -> Result<HttpResponse, ServerError> {
    let token = path.into_inner();
    trace!("💻️ GET order '{token}' for {}", caller.actor());
    let resolved = resolver.resolve_detail(caller.actor(), &token).await?;
    Ok(HttpResponse::Ok().json(resolved))
}

route!(update_status => Post "/order/{id}/status" impl OrderDatabase);
pub async fn update_status<B: OrderDatabase>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Json<StatusChangeRequest>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ {} requests {order_id} move to {}", caller.actor(), body.status);
    let result = api.update_status(caller.actor(), &order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Delivery  ----------------------------------------------------
route!(assign_partner => Post "/order/{id}/assign" impl OrderDatabase);
pub async fn assign_partner<B: OrderDatabase>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<DeliveryApi<B>>,
    body: web::Json<AssignPartnerRequest>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let result = api.assign_delivery_partner(caller.actor(), &order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(delivery_update => Post "/order/{id}/delivery" impl OrderDatabase);
pub async fn delivery_update<B: OrderDatabase>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<DeliveryApi<B>>,
    body: web::Json<DeliveryUpdateRequest>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let result = api.post_delivery_update(caller.actor(), &order_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(delivery_timeline => Get "/order/{id}/timeline" impl OrderDatabase);
pub async fn delivery_timeline<B: OrderDatabase>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<DeliveryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let timeline = api.fetch_delivery_timeline(caller.actor(), &order_id).await?;
    Ok(HttpResponse::Ok().json(timeline))
}

route!(submit_proof => Post "/order/{id}/proof" impl OrderDatabase);
pub async fn submit_proof<B: OrderDatabase>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<DeliveryApi<B>>,
    body: web::Json<DeliveryProofRequest>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let result = api.submit_delivery_proof(caller.actor(), &order_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(result))
}

route!(fetch_proof => Get "/order/{id}/proof" impl OrderDatabase);
pub async fn fetch_proof<B: OrderDatabase>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<DeliveryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let proof = api
        .fetch_delivery_proof(caller.actor(), &order_id)
        .await?
        .ok_or_else(|| OrderFlowError::NotFound(format!("No proof of delivery has been captured for {order_id}")))?;
    Ok(HttpResponse::Ok().json(proof))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(cod_payment => Post "/order/{id}/payment/cod" impl OrderDatabase);
/// Records that the cash for a delivered COD order was collected. Safe to retry: repeat calls report
/// `already_settled` and a partially settled payment is completed by the next call.
pub async fn cod_payment<B: OrderDatabase>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    info!("💻️ {} records cash received for {order_id}", caller.actor());
    let result = api.mark_payment_received(caller.actor(), &order_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Notifications  ----------------------------------------------
route!(unread_notifications => Get "/notifications" impl OrderManagement, NotificationManagement);
pub async fn unread_notifications<B: OrderManagement + NotificationManagement>(
    caller: Caller,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notifications = api.unread_notifications(caller.actor()).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

route!(mark_notification_read => Post "/notifications/{id}/read" impl OrderManagement, NotificationManagement);
pub async fn mark_notification_read<B: OrderManagement + NotificationManagement>(
    caller: Caller,
    path: web::Path<String>,
    api: web::Data<NotificationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    api.mark_read(caller.actor(), &id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Notification {id} marked as read."))))
}
