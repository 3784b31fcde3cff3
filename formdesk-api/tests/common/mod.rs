//! Shared fixtures for the API tests
//!
//! Routers are built over the in-memory row store and document provider and
//! driven with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use formdesk_api::app::{build_router, AppState};
use formdesk_api::config::{AdminConfig, ApiConfig, Config, StoreConfig};
use formdesk_core::config::PasswordParams;
use formdesk_core::provider::MemoryDocumentProvider;
use formdesk_core::services::Services;
use formdesk_core::store::MemoryRowStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token-0123456789";
pub const TEMPLATE_SOURCE_ID: &str = "tmpl-survey";

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        database: None,
        store: StoreConfig {
            store_id: None,
            auto_setup: true,
        },
        admin: AdminConfig {
            token: ADMIN_TOKEN.to_string(),
        },
        provider: None,
        password: PasswordParams::fast(),
    }
}

pub struct TestApp {
    pub app: Router,
    pub services: Services,
    pub provider: Arc<MemoryDocumentProvider>,
}

impl TestApp {
    /// Router over an empty backend, setup not run
    pub fn unprovisioned() -> Self {
        let config = test_config();
        let provider = Arc::new(MemoryDocumentProvider::new());
        let services = Services::new(
            Arc::new(MemoryRowStore::new()),
            provider.clone(),
            config.service_config(),
        );
        let app = build_router(AppState::new(services.clone(), config));
        Self {
            app,
            services,
            provider,
        }
    }

    /// Router over a set up store
    pub async fn new() -> Self {
        let test_app = Self::unprovisioned();
        test_app.services.setup().await.expect("setup should succeed");
        test_app
    }

    /// Sends a request and returns status and parsed JSON body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!("expected JSON body, got {}", String::from_utf8_lossy(&body))
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Registers `email` and logs in, returning (access ID, session ID)
    pub async fn register_and_login(&self, email: &str) -> (String, String) {
        let (status, registered) = self
            .post("/v1/users", None, serde_json::json!({ "email": email }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", registered);

        let access_id = registered["accessId"].as_str().unwrap().to_string();
        let (status, login) = self
            .post(
                "/v1/auth/login",
                None,
                serde_json::json!({
                    "accessId": access_id,
                    "password": registered["password"],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", login);

        (access_id, login["sessionId"].as_str().unwrap().to_string())
    }

    /// Registers the "survey" template through the admin route
    pub async fn register_template(&self) {
        self.provider
            .insert_resource(TEMPLATE_SOURCE_ID, "Survey template")
            .await;
        let (status, body) = self
            .post(
                "/v1/templates",
                Some(ADMIN_TOKEN),
                serde_json::json!({ "templateType": "survey", "templateId": TEMPLATE_SOURCE_ID }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }
}
