use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use fishtank_server::app::{create_app, Services};
use fishtank_server::configs::{Auth, Database, Logger, SchemaManager, Server, Settings, Storage};
use fishtank_server::services::serial::mock::MockDevice;
use tower::ServiceExt;

pub struct MockApp {
    pub router: Router,
    pub storage: Arc<Storage>,
    pub services: Services,
    pub device: MockDevice,
    pub token: String,
}

impl MockApp {
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        let storage = Arc::new(
            Storage::new(settings.database.clone(), SchemaManager::default())
                .await
                .unwrap(),
        );

        let device = MockDevice::new();
        let services = Services::new(&settings, storage.clone(), device.connector(), "/dev/ttyMOCK");
        let router = create_app(&services);
        let token = services.token_service.generate_token("alice").unwrap().token;

        Self {
            router,
            storage,
            services,
            device,
            token,
        }
    }

    pub fn token_for(&self, user_id: &str) -> String {
        self.services.token_service.generate_token(user_id).unwrap().token
    }

    pub async fn post_form(&self, uri: &str, form: &str) -> Response<Body> {
        self.post_form_as(uri, form, &self.token).await
    }

    pub async fn post_form_as(&self, uri: &str, form: &str, token: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .method(Method::POST)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::from(form.to_string()))
            .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings {
        server: Server {
            host: String::from("127.0.0.1"),
            port: 0,
        },
        logger: Logger {
            level: String::from("debug"),
        },
        database: Database {
            migration_path: None,
            clean_start: true,
            url: String::from("sqlite::memory:"),
        },
        auth: Auth {
            secret: String::from("test"),
            expiration: 1000,
        },
        device: Default::default(),
        tank: Default::default(),
        scheduler: Default::default(),
    };

    settings.device.read_attempts = 3;
    settings.device.read_interval_ms = 1;
    settings.device.repair_cooldown_ms = 1;
    settings.device.max_retries = 1;

    settings
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    serde_json::from_slice(&body).unwrap()
}
