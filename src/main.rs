use staffdesk::{
    config::{self, MailTransport, database},
    core::{reference::seed_reference_data, session::prune_expired_sessions, user::ensure_admin},
    errors::{Error, Result},
    services::{DisabledMailer, LocalFileStore, Mailer, SesMailer},
    web::{AppState, build_router},
};
use chrono::Utc;
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_STORAGE_DIR: &str = "data/files";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();

    // 3. Load installation settings
    let settings = config::settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    info!("Loaded settings for {}", settings.app.name);

    // 4. Connect and ensure the schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;
    prune_expired_sessions(&db, Utc::now(), settings.app.session_ttl()).await?;

    // 5. Seed reference data and the first administrator
    seed_reference_data(&db, &settings.reference)
        .await
        .inspect_err(|e| error!("Failed to seed reference data: {}", e))?;
    info!("Reference data seeded");
    match (
        env::var("STAFFDESK_ADMIN_EMAIL"),
        env::var("STAFFDESK_ADMIN_PASSWORD"),
    ) {
        (Ok(email), Ok(password)) => {
            let name =
                env::var("STAFFDESK_ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string());
            ensure_admin(&db, &name, &email, &password).await?;
        }
        _ => warn!("STAFFDESK_ADMIN_EMAIL/STAFFDESK_ADMIN_PASSWORD not set, skipping admin bootstrap"),
    }

    // 6. Serve
    let storage_dir =
        env::var("STAFFDESK_STORAGE_DIR").unwrap_or_else(|_| DEFAULT_STORAGE_DIR.to_string());
    let bind = env::var("STAFFDESK_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let mailer: Arc<dyn Mailer> = match settings.mail.transport {
        MailTransport::Ses => {
            info!("Delivering mail through Amazon SES");
            Arc::new(SesMailer::from_env(settings.mail.ses_region.clone()).await)
        }
        MailTransport::Disabled => {
            warn!("No mail transport configured, offer letters will not be emailed");
            Arc::new(DisabledMailer)
        }
    };
    let state = AppState::new(
        db,
        settings,
        mailer,
        Arc::new(LocalFileStore::new(storage_dir)),
    );

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", bind, e))?;
    info!("Listening on {}", bind);
    axum::serve(listener, build_router(state))
        .await
        .map_err(Error::from)
}
