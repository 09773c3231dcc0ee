use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use order_engine::{
    events::EventProducers,
    DeliveryApi,
    NotificationApi,
    OrderDatabase,
    OrderFlowApi,
    OrderResolver,
    PaymentApi,
    ResolverConfig,
    SqliteDatabase,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    events::create_event_handlers,
    routes::{
        health,
        AssignPartnerRoute,
        CodPaymentRoute,
        DeliveryTimelineRoute,
        DeliveryUpdateRoute,
        FetchProofRoute,
        MarkNotificationReadRoute,
        MyOrdersRoute,
        OrderByTokenRoute,
        PlaceOrderRoute,
        SubmitProofRoute,
        UnreadNotificationsRoute,
        UpdateStatusRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = prepare_database(&config).await?;
    let handlers = create_event_handlers(config.event_buffer);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

async fn prepare_database(config: &ServerConfig) -> Result<SqliteDatabase, ServerError> {
    SqliteDatabase::create_if_missing(&config.database_url)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    Ok(db)
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let resolver_config = config.resolver_config();
    let srv = HttpServer::new(move || {
        let db = db.clone();
        let producers = producers.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("b2b::access_log"))
            .configure(|cfg| configure_app(cfg, db, producers, resolver_config))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("💻️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Registers the engine APIs and every route against `db`.
pub fn configure_app<B>(
    cfg: &mut web::ServiceConfig,
    db: B,
    producers: EventProducers,
    resolver_config: ResolverConfig,
) where
    B: OrderDatabase + 'static,
{
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
    cfg.app_data(json_config)
        .app_data(query_config)
        .app_data(web::Data::new(OrderFlowApi::new(db.clone(), producers.clone())))
        .app_data(web::Data::new(DeliveryApi::new(db.clone(), producers.clone())))
        .app_data(web::Data::new(PaymentApi::new(db.clone(), producers)))
        .app_data(web::Data::new(NotificationApi::new(db.clone())))
        .app_data(web::Data::new(OrderResolver::new(db).with_config(resolver_config)))
        .service(health)
        .service(
            web::scope("/api")
                .service(PlaceOrderRoute::<B>::new())
                .service(MyOrdersRoute::<B>::new())
                .service(OrderByTokenRoute::<B>::new())
                .service(UpdateStatusRoute::<B>::new())
                .service(AssignPartnerRoute::<B>::new())
                .service(DeliveryUpdateRoute::<B>::new())
                .service(DeliveryTimelineRoute::<B>::new())
                .service(SubmitProofRoute::<B>::new())
                .service(FetchProofRoute::<B>::new())
                .service(CodPaymentRoute::<B>::new())
                .service(UnreadNotificationsRoute::<B>::new())
                .service(MarkNotificationReadRoute::<B>::new()),
        );
}
