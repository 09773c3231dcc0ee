use std::collections::HashMap;

use order_engine::db_types::{Order, OrderStatusType, Paise};
use serde::{Deserialize, Serialize};

/// Headline numbers for an actor's dashboard, derived from the orders they can see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub total_orders: usize,
    pub orders_by_status: HashMap<OrderStatusType, usize>,
    /// Value of every order that was not rejected.
    pub gross_value: Paise,
    /// Cash still to be collected on cash-on-delivery orders that were not rejected.
    pub outstanding_cod: Paise,
}

impl DashboardMetrics {
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut orders_by_status = HashMap::new();
        for order in orders {
            *orders_by_status.entry(order.status).or_insert(0) += 1;
        }
        let live = || orders.iter().filter(|o| o.status != OrderStatusType::Rejected);
        let gross_value = live().map(|o| o.total_amount).sum();
        let outstanding_cod = live().filter(|o| o.is_cash_on_delivery() && !o.is_paid()).map(|o| o.total_amount).sum();
        Self { total_orders: orders.len(), orders_by_status, gross_value, outstanding_cod }
    }

    pub fn count(&self, status: OrderStatusType) -> usize {
        self.orders_by_status.get(&status).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use order_engine::db_types::{OrderId, PaymentMethod, PaymentStatus};

    use super::*;

    fn order(status: OrderStatusType, method: PaymentMethod, paid: bool, rupees: i64) -> Order {
        Order {
            id: OrderId::random(),
            retailer_id: "ravi".into(),
            wholesaler_id: "wasim".into(),
            delivery_partner_id: None,
            reference_number: None,
            total_amount: Paise::from_rupees(rupees),
            status,
            payment_method: method,
            payment_status: if paid { PaymentStatus::Paid } else { PaymentStatus::Pending },
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn metrics_from_orders() {
        let orders = vec![
            order(OrderStatusType::Placed, PaymentMethod::CashOnDelivery, false, 500),
            order(OrderStatusType::Delivered, PaymentMethod::CashOnDelivery, true, 300),
            order(OrderStatusType::Dispatched, PaymentMethod::Electronic, false, 200),
            order(OrderStatusType::Rejected, PaymentMethod::CashOnDelivery, false, 1_000),
        ];
        let metrics = DashboardMetrics::from_orders(&orders);
        assert_eq!(metrics.total_orders, 4);
        assert_eq!(metrics.count(OrderStatusType::Placed), 1);
        assert_eq!(metrics.count(OrderStatusType::Confirmed), 0);
        assert_eq!(metrics.gross_value, Paise::from_rupees(1_000));
        assert_eq!(metrics.outstanding_cod, Paise::from_rupees(500));
        assert_eq!(DashboardMetrics::from_orders(&[]), DashboardMetrics::default());
    }
}
