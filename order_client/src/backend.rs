//! Backends the coordinator can drive.
use log::*;
use order_engine::{
    db_types::{Actor, Notification, Order, OrderId},
    events::EventProducers,
    order_objects::{
        AssignPartnerRequest,
        DeliveryProofRequest,
        DeliveryUpdateRequest,
        DeliveryUpdateResult,
        NewOrderRequest,
        PaymentResult,
        PlacedOrder,
        ProofResult,
        ResolvedOrder,
        StatusChangeRequest,
        TransitionResult,
    },
    DeliveryApi,
    NotificationApi,
    OrderDatabase,
    OrderFlowApi,
    OrderQueryFilter,
    OrderResolver,
    PaymentApi,
};
use order_server::identity::{ROLE_HEADER, USER_ID_HEADER};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    config::ClientConfig,
    errors::{ClientError, ErrorBody},
};

/// The order operations available to one session. Every call is made on behalf of the session's actor.
#[allow(async_fn_in_trait)]
pub trait OrderBackend {
    fn actor(&self) -> &Actor;

    async fn place_order(&self, request: NewOrderRequest) -> Result<PlacedOrder, ClientError>;

    /// Every order visible to the actor, most recent first.
    async fn fetch_orders(&self) -> Result<Vec<Order>, ClientError>;

    /// Resolves any reference to an order and loads its detail.
    async fn resolve_order(&self, token: &str) -> Result<ResolvedOrder, ClientError>;

    async fn update_status(
        &self,
        order_id: &OrderId,
        request: StatusChangeRequest,
    ) -> Result<TransitionResult, ClientError>;

    async fn assign_delivery_partner(
        &self,
        order_id: &OrderId,
        request: AssignPartnerRequest,
    ) -> Result<DeliveryUpdateResult, ClientError>;

    async fn post_delivery_update(
        &self,
        order_id: &OrderId,
        request: DeliveryUpdateRequest,
    ) -> Result<DeliveryUpdateResult, ClientError>;

    async fn submit_delivery_proof(
        &self,
        order_id: &OrderId,
        request: DeliveryProofRequest,
    ) -> Result<ProofResult, ClientError>;

    async fn mark_payment_received(&self, order_id: &OrderId) -> Result<PaymentResult, ClientError>;

    async fn unread_notifications(&self) -> Result<Vec<Notification>, ClientError>;

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ClientError>;
}

//--------------------------------------      LocalBackend     ---------------------------------------------------------
/// Drives the engine APIs in-process.
pub struct LocalBackend<B> {
    actor: Actor,
    orders: OrderFlowApi<B>,
    delivery: DeliveryApi<B>,
    payments: PaymentApi<B>,
    notifications: NotificationApi<B>,
    resolver: OrderResolver<B>,
}

impl<B: OrderDatabase> LocalBackend<B> {
    pub fn new(db: B, producers: EventProducers, actor: Actor) -> Self {
        Self {
            actor,
            orders: OrderFlowApi::new(db.clone(), producers.clone()),
            delivery: DeliveryApi::new(db.clone(), producers.clone()),
            payments: PaymentApi::new(db.clone(), producers),
            notifications: NotificationApi::new(db.clone()),
            resolver: OrderResolver::new(db),
        }
    }
}

impl<B: OrderDatabase> OrderBackend for LocalBackend<B> {
    fn actor(&self) -> &Actor {
        &self.actor
    }

    async fn place_order(&self, request: NewOrderRequest) -> Result<PlacedOrder, ClientError> {
        Ok(self.orders.place_order(&self.actor, request).await?)
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>, ClientError> {
        Ok(self.orders.fetch_orders(&self.actor, OrderQueryFilter::default()).await?)
    }

    async fn resolve_order(&self, token: &str) -> Result<ResolvedOrder, ClientError> {
        Ok(self.resolver.resolve_detail(&self.actor, token).await?)
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        request: StatusChangeRequest,
    ) -> Result<TransitionResult, ClientError> {
        Ok(self.orders.update_status(&self.actor, order_id, request).await?)
    }

    async fn assign_delivery_partner(
        &self,
        order_id: &OrderId,
        request: AssignPartnerRequest,
    ) -> Result<DeliveryUpdateResult, ClientError> {
        Ok(self.delivery.assign_delivery_partner(&self.actor, order_id, request).await?)
    }

    async fn post_delivery_update(
        &self,
        order_id: &OrderId,
        request: DeliveryUpdateRequest,
    ) -> Result<DeliveryUpdateResult, ClientError> {
        Ok(self.delivery.post_delivery_update(&self.actor, order_id, request).await?)
    }

    async fn submit_delivery_proof(
        &self,
        order_id: &OrderId,
        request: DeliveryProofRequest,
    ) -> Result<ProofResult, ClientError> {
        Ok(self.delivery.submit_delivery_proof(&self.actor, order_id, request).await?)
    }

    async fn mark_payment_received(&self, order_id: &OrderId) -> Result<PaymentResult, ClientError> {
        Ok(self.payments.mark_payment_received(&self.actor, order_id).await?)
    }

    async fn unread_notifications(&self) -> Result<Vec<Notification>, ClientError> {
        Ok(self.notifications.unread_notifications(&self.actor).await?)
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ClientError> {
        Ok(self.notifications.mark_read(&self.actor, notification_id).await?)
    }
}

//--------------------------------------      HttpBackend      ---------------------------------------------------------
/// Calls a remote order server. The session identity is sent on every request.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    server: Url,
    actor: Actor,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let user_id = HeaderValue::from_str(config.actor.user_id.as_str())
            .map_err(|e| ClientError::Configuration(format!("User id cannot be sent as a header. {e}")))?;
        let role = HeaderValue::from_str(&config.actor.role.to_string())
            .map_err(|e| ClientError::Configuration(format!("Role cannot be sent as a header. {e}")))?;
        headers.insert(USER_ID_HEADER, user_id);
        headers.insert(ROLE_HEADER, role);
        let client = Client::builder()
            .user_agent("B2B Order Client")
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Configuration(format!("Could not create HTTP client. {e}")))?;
        Ok(Self { client, server: config.server_url.clone(), actor: config.actor.clone() })
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.server.join(path)?)
    }

    pub async fn health(&self) -> Result<String, ClientError> {
        let res = self.client.get(self.url("/health")?).send().await?;
        Ok(res.text().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let req = self.client.get(self.url(path)?);
        self.send(req).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let req = self.client.post(self.url(path)?).json(body);
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let res = req.send().await?;
        let status = res.status();
        if status.is_success() {
            return Ok(res.json::<T>().await?);
        }
        let body = res.text().await?;
        trace!("🧭️ Server responded with {status}: {body}");
        Err(decode_error(status.as_u16(), &body))
    }
}

/// Turns an error response into a [`ClientError`], falling back to the raw body if it is not the server's error JSON.
pub fn decode_error(status: u16, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => err.into(),
        Err(_) => ClientError::InvalidResponse(format!("HTTP {status}: {body}")),
    }
}

fn order_path(order_id: &OrderId, action: &str) -> String {
    format!("/api/order/{}/{action}", order_id.as_str())
}

impl OrderBackend for HttpBackend {
    fn actor(&self) -> &Actor {
        &self.actor
    }

    async fn place_order(&self, request: NewOrderRequest) -> Result<PlacedOrder, ClientError> {
        self.post("/api/orders", &request).await
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>, ClientError> {
        self.get("/api/orders").await
    }

    async fn resolve_order(&self, token: &str) -> Result<ResolvedOrder, ClientError> {
        let mut url = self.url("/api/order/")?;
        // Pushing the token as a path segment percent-encodes it
        url.path_segments_mut()
            .map_err(|_| ClientError::Configuration(format!("{} cannot be used as a base URL", self.server)))?
            .pop_if_empty()
            .push(token.trim());
        self.send(self.client.get(url)).await
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        request: StatusChangeRequest,
    ) -> Result<TransitionResult, ClientError> {
        self.post(&order_path(order_id, "status"), &request).await
    }

    async fn assign_delivery_partner(
        &self,
        order_id: &OrderId,
        request: AssignPartnerRequest,
    ) -> Result<DeliveryUpdateResult, ClientError> {
        self.post(&order_path(order_id, "assign"), &request).await
    }

    async fn post_delivery_update(
        &self,
        order_id: &OrderId,
        request: DeliveryUpdateRequest,
    ) -> Result<DeliveryUpdateResult, ClientError> {
        self.post(&order_path(order_id, "delivery"), &request).await
    }

    async fn submit_delivery_proof(
        &self,
        order_id: &OrderId,
        request: DeliveryProofRequest,
    ) -> Result<ProofResult, ClientError> {
        self.post(&order_path(order_id, "proof"), &request).await
    }

    async fn mark_payment_received(&self, order_id: &OrderId) -> Result<PaymentResult, ClientError> {
        self.post(&order_path(order_id, "payment/cod"), &serde_json::Value::Null).await
    }

    async fn unread_notifications(&self) -> Result<Vec<Notification>, ClientError> {
        self.get("/api/notifications").await
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<(), ClientError> {
        let _: serde_json::Value = self.post(&format!("/api/notifications/{notification_id}/read"), &()).await?;
        Ok(())
    }
}
