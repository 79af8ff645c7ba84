//! # roomies-messaging
//!
//! Server binary for the Roomies direct-messaging core:
//! - **REST API** under `/api/chat` for conversations and message history
//! - **WebSocket gateway** at `/ws` relaying messages to per-user rooms
//! - **Redis backplane** (optional) so rooms span several instances

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roomies_messaging::adapters::http::{build_router, MessagingHandlers};
use roomies_messaging::adapters::memory::{
    InMemoryConversationStore, InMemoryMessageStore, InMemoryUserDirectory,
};
use roomies_messaging::adapters::postgres::{
    connect_pool, PostgresConversationStore, PostgresMessageStore, PostgresUserDirectory, MIGRATOR,
};
use roomies_messaging::adapters::websocket::{
    RealtimeGateway, RedisBackplane, RoomManager, WebSocketState,
};
use roomies_messaging::config::{AppConfig, LogFormat};
use roomies_messaging::ports::{ConversationStore, MessageStore, UserDirectory};

struct Stores {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserDirectory>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration and tracing
    // -----------------------------------------------------------------------
    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    init_tracing(&config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        persistent = config.database.is_some(),
        backplane = config.redis.is_some(),
        "Starting roomies-messaging"
    );

    // -----------------------------------------------------------------------
    // 2. Stores
    // -----------------------------------------------------------------------
    let stores = init_stores(&config).await?;

    // -----------------------------------------------------------------------
    // 3. Realtime gateway
    // -----------------------------------------------------------------------
    let mut gateway = RealtimeGateway::new(
        Arc::new(RoomManager::new()),
        config.messaging.max_content_length,
    );
    if let Some(redis) = &config.redis {
        let backplane = tokio::time::timeout(
            redis.timeout(),
            RedisBackplane::connect(&redis.url, redis.channel.clone()),
        )
        .await
        .context("timed out connecting to Redis")?
        .context("failed to connect to Redis")?;
        info!(channel = %redis.channel, "Room backplane connected");
        gateway = gateway.with_backplane(Arc::new(backplane));
    }
    let gateway = Arc::new(gateway);
    let _subscription = gateway
        .start_backplane()
        .await
        .context("failed to subscribe to room backplane")?;

    // -----------------------------------------------------------------------
    // 4. HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let messaging = MessagingHandlers::from_ports(
        stores.conversations,
        stores.messages,
        stores.users,
        &config.messaging,
    );
    let app = build_router(messaging, WebSocketState::new(gateway), &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shut down cleanly");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    match config.server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn init_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    let Some(database) = &config.database else {
        info!("No database configured, keeping chat data in memory");
        return Ok(Stores {
            conversations: Arc::new(InMemoryConversationStore::new()),
            messages: Arc::new(InMemoryMessageStore::new()),
            users: Arc::new(InMemoryUserDirectory::new()),
        });
    };

    let pool = connect_pool(database)
        .await
        .context("failed to connect to PostgreSQL")?;
    if database.run_migrations {
        MIGRATOR
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        info!("Migrations applied");
    }

    Ok(Stores {
        conversations: Arc::new(PostgresConversationStore::new(pool.clone())),
        messages: Arc::new(PostgresMessageStore::new(pool.clone())),
        users: Arc::new(PostgresUserDirectory::new(pool)),
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
