#![allow(dead_code)]

use chrono::{Duration, Utc};
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use taskboard_notify::{
    config::{internal::InternalApiConfig, jwt::JwtConfig, rate_limit::RateLimitConfig},
    models::{NotificationModel, NotificationType},
    store::{MemoryStore, SharedStore},
    utils::encode_access_token,
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration_test_secret_that_is_at_least_32_characters_long";
pub const INTERNAL_TOKEN: &str = "integration-internal-token";

pub struct TestApp {
    pub addr: String,
    pub store: Arc<MemoryStore>,
    pub jwt: JwtConfig,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    pub fn internal_url(&self, path: &str) -> String {
        format!("{}/internal{}", self.addr, path)
    }

    /// A fresh user id and a valid access token for it.
    pub fn user(&self) -> (Uuid, String) {
        let user_id = Uuid::new_v4();
        let token = encode_access_token(&self.jwt, user_id).expect("Failed to encode token");
        (user_id, token)
    }

    /// Inserts a row created `minutes_ago` minutes in the past and returns its id.
    pub fn insert(
        &self,
        user_id: Uuid,
        kind: NotificationType,
        message: &str,
        minutes_ago: i64,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.store.insert_raw(NotificationModel {
            id,
            user_id,
            kind,
            message: message.to_string(),
            is_read: false,
            entity_type: Some("task".to_string()),
            entity_id: Some(format!("task-{}", minutes_ago)),
            created_at: (Utc::now() - Duration::minutes(minutes_ago)).naive_utc(),
        });
        id
    }

    /// `n` rows of one type, newest first in insertion order.
    pub fn seed(&self, user_id: Uuid, kind: NotificationType, n: usize) -> Vec<Uuid> {
        (0..n)
            .map(|i| self.insert(user_id, kind, &format!("{} #{}", kind, i), i as i64))
            .collect()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(InternalApiConfig::with_token(INTERNAL_TOKEN)).await
}

pub async fn spawn_app_with(internal: InternalApiConfig) -> TestApp {
    let jwt = JwtConfig::new(JWT_SECRET, 900).expect("Invalid test JWT config");
    let store = Arc::new(MemoryStore::new());
    let shared: SharedStore = store.clone();

    let app = axum::Router::new()
        .route("/", axum::routing::get(|| async { "ok" }))
        .merge(taskboard_notify::routes::create_routes(
            &RateLimitConfig::disabled(),
            &internal,
        ))
        .layer(axum::extract::Extension(shared))
        .layer(axum::extract::Extension(jwt.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        store,
        jwt,
        client: Client::new(),
    }
}
