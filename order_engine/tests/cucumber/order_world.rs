use cucumber::World;
use order_engine::{
    db_types::{Order, OrderId},
    order_objects::PaymentOutcome,
    test_utils::system::TestSystem,
    OrderFlowError,
    OrderManagement,
};

#[derive(Default, Debug, World)]
pub struct OrderWorld {
    pub system: Option<TestSystem>,
    pub current_order: Option<OrderId>,
    pub last_payment: Option<PaymentOutcome>,
    pub last_error: Option<OrderFlowError>,
}

impl OrderWorld {
    pub fn system(&self) -> &TestSystem {
        self.system.as_ref().expect("Order system not initialised")
    }

    pub fn order_id(&self) -> OrderId {
        self.current_order.clone().expect("No order has been placed in this scenario")
    }

    /// The current order, as it is stored right now.
    pub async fn current_order(&self) -> Order {
        let id = self.order_id();
        self.system().db.fetch_order(&id).await.expect("Error fetching order").expect("Order does not exist")
    }
}
