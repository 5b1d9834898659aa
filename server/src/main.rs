use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use eventhub_server::config::Config;
use eventhub_server::repository::PgEventStore;
use eventhub_server::routes::create_routes;
use eventhub_server::services::payments::StripeConnectClient;
use eventhub_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    if config.payments.secret_key.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY is not set, connected account creation will fail");
    }

    let state = AppState::new(
        Arc::new(PgEventStore::new(pool)),
        Arc::new(StripeConnectClient::new(&config.payments)),
    );
    let app = create_routes(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
