use crate::config::AppConfig;
use crate::entities;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use std::time::Duration;
use tracing::{info, warn};

/// Type alias for the database connection pool.
pub type DbPool = DatabaseConnection;

/// Establishes the connection pool.
pub async fn establish_connection(database_url: &str, max_connections: u32) -> Result<DbPool, DbErr> {
    let mut opts = ConnectOptions::new(database_url.to_string());
    opts.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    let db = Database::connect(opts).await?;
    info!("database connection established");
    Ok(db)
}

pub async fn establish_connection_from_config(cfg: &AppConfig) -> Result<DbPool, DbErr> {
    establish_connection(&cfg.database_url, cfg.db_max_connections).await
}

/// Cheap connectivity probe used by the readiness endpoint.
pub async fn check_connection(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.ping().await
}

/// Creates the schema from the entity definitions. Used when
/// `auto_migrate` is set (development and the sqlite-backed tests);
/// production DDL is owned by deployment tooling.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let statements = [
        schema.create_table_from_entity(entities::User),
        schema.create_table_from_entity(entities::Category),
        schema.create_table_from_entity(entities::Product),
        schema.create_table_from_entity(entities::Order),
        schema.create_table_from_entity(entities::OrderItem),
    ];

    for mut stmt in statements {
        match db.execute(backend.build(stmt.if_not_exists())).await {
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "schema statement failed");
                return Err(e);
            }
        }
    }

    info!("schema ready");
    Ok(())
}
