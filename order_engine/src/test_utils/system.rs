use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    DeliveryApi,
    NotificationApi,
    OrderFlowApi,
    OrderResolver,
    PaymentApi,
    SqliteDatabase,
};

/// Every engine API wired to one freshly migrated SQLite store.
#[derive(Debug)]
pub struct TestSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub orders: OrderFlowApi<SqliteDatabase>,
    pub delivery: DeliveryApi<SqliteDatabase>,
    pub payments: PaymentApi<SqliteDatabase>,
    pub notifications: NotificationApi<SqliteDatabase>,
    pub resolver: OrderResolver<SqliteDatabase>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db_path = random_db_path();
        prepare_test_env(&db_path).await;
        let db = SqliteDatabase::new_with_url(&db_path, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Test system ready at {db_path}");
        Self {
            db_path,
            orders: OrderFlowApi::new(db.clone(), producers.clone()),
            delivery: DeliveryApi::new(db.clone(), producers.clone()),
            payments: PaymentApi::new(db.clone(), producers),
            notifications: NotificationApi::new(db.clone()),
            resolver: OrderResolver::new(db.clone()),
            db,
        }
    }

    /// Closes the pool and deletes the database file.
    pub async fn tear_down(mut self) {
        if let Err(e) = self.db.close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        if let Err(e) = Sqlite::drop_database(&self.db_path).await {
            warn!("🚀️ Could not remove test database {}: {e}", self.db_path);
        }
    }
}
