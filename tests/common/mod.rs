use std::sync::Arc;

use tokio::sync::mpsc;

use eshop_api::{
    auth::AuthenticatedUser,
    config::AppConfig,
    db,
    entities::user::UserRole,
    events::{self, EventSender},
    services::AppServices,
    AppState,
};
use uuid::Uuid;

/// Harness spinning up an application state backed by a file-based SQLite
/// database in a temp directory. The pool is capped at one connection so
/// overlapping transactions serialize at the pool instead of tripping
/// SQLite busy errors.
pub struct TestApp {
    pub state: Arc<AppState>,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("eshop_test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let cfg = AppConfig {
            database_url: database_url.clone(),
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            jwt_secret: "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            jwt_expiration_secs: 3600,
            db_max_connections: 1,
            cart_ttl_secs: 60,
            host: "127.0.0.1".to_string(),
            port: 18_080,
            environment: "test".to_string(),
            log_level: "warn".to_string(),
            cors_allowed_origins: "http://localhost:3000".to_string(),
            auto_migrate: true,
        };

        let db = db::establish_connection_from_config(&cfg)
            .await
            .expect("failed to open sqlite database");
        db::setup_schema(&db).await.expect("failed to create schema");
        let db = Arc::new(db);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let redis_client =
            Arc::new(redis::Client::open(cfg.redis_url.clone()).expect("invalid redis url"));

        let services = AppServices::new(db.clone(), event_sender.clone(), redis_client.clone(), &cfg);

        let state = Arc::new(AppState {
            db,
            config: cfg,
            event_sender,
            services,
            redis: redis_client,
        });

        Self {
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// An identity usable against the services without a token roundtrip.
    pub fn customer(&self, user_id: Uuid) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id,
            role: UserRole::Customer,
        }
    }

    pub fn admin(&self) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role: UserRole::Admin,
        }
    }
}
