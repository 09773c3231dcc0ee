use chrono::{DateTime, Utc};
use order_engine::{db_types::OrderStatusType, OrderQueryFilter};
use serde::{Deserialize, Serialize};

/// Query string accepted by `GET /api/orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderListParams {
    pub status: Option<OrderStatusType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl From<OrderListParams> for OrderQueryFilter {
    fn from(params: OrderListParams) -> Self {
        let mut filter = OrderQueryFilter::default();
        if let Some(status) = params.status {
            filter = filter.with_status(status);
        }
        filter.since = params.since;
        filter.until = params.until;
        filter.limit = params.limit;
        filter
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self { success: true, message: message.into() }
    }
}
