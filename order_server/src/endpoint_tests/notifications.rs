use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use order_engine::{db_types::Actor, test_utils::system::TestSystem, NotificationApi, StoreError};
use serde_json::Value;

use super::{
    helpers::{as_actor, cod_order, send},
    mocks::MockNotificationStore,
};
use crate::routes::{MarkNotificationReadRoute, UnreadNotificationsRoute};

#[actix_web::test]
async fn store_outage_is_service_unavailable() {
    let _ = env_logger::try_init().ok();
    let mut store = MockNotificationStore::new();
    store
        .expect_fetch_unread_notifications()
        .returning(|_| Err(StoreError::DatabaseError("disk I/O error".into())));
    let app = App::new()
        .app_data(web::Data::new(NotificationApi::new(store)))
        .service(UnreadNotificationsRoute::<MockNotificationStore>::new());
    let service = test::init_service(app).await;
    let req = as_actor(TestRequest::get().uri("/notifications"), &Actor::retailer("ravi")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["kind"], "upstream");
}

#[actix_web::test]
async fn marking_someone_elses_notification_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut store = MockNotificationStore::new();
    store.expect_mark_notification_read().times(1).returning(|_, _| Ok(false));
    let app = App::new()
        .app_data(web::Data::new(NotificationApi::new(store)))
        .service(MarkNotificationReadRoute::<MockNotificationStore>::new());
    let service = test::init_service(app).await;
    let req = as_actor(TestRequest::post().uri("/notifications/n-123/read"), &Actor::retailer("ravi")).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["kind"], "not_found");
}

#[actix_web::test]
async fn unread_notifications_can_be_dismissed() {
    let sys = TestSystem::new().await;
    let retailer = Actor::retailer("ravi");
    let wholesaler = Actor::wholesaler("wasim");
    let req = as_actor(TestRequest::post().uri("/api/orders"), &retailer).set_json(cod_order(&wholesaler));
    let (status, _) = send(&sys.db, req).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&sys.db, as_actor(TestRequest::get().uri("/api/notifications"), &wholesaler)).await;
    assert_eq!(status, StatusCode::OK);
    let unread = body.as_array().expect("Expected a list of notifications");
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0]["title"], "New order received");
    let id = unread[0]["id"].as_str().expect("Notification has no id").to_string();

    // The retailer cannot dismiss the wholesaler's notification
    let uri = format!("/api/notifications/{id}/read");
    let (status, _) = send(&sys.db, as_actor(TestRequest::post().uri(&uri), &retailer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&sys.db, as_actor(TestRequest::post().uri(&uri), &wholesaler)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (_, body) = send(&sys.db, as_actor(TestRequest::get().uri("/api/notifications"), &wholesaler)).await;
    assert_eq!(body.as_array().map(|a| a.len()), Some(0));
    sys.tear_down().await;
}
