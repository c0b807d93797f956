use std::env;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sea_orm::{Database, DatabaseConnection};
use tracing::{debug, info};

use crate::email::{ConsoleEmailSender, EmailSender, SmtpConfig, SmtpEmailSender};
use crate::payments::{CheckoutGateway, HostedCheckout};
use crate::schemas::AppState;

/// Cached read-side entries live for one minute at most.
pub const CACHE_TTL: Duration = Duration::from_secs(60);
pub const CACHE_CAPACITY: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub jwt_secret: String,
    /// Origin used for CORS and for links embedded in outgoing emails.
    pub frontend_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://edurust.db?mode=rwc".to_string());
        let bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            debug!("JWT_SECRET not set, using development default");
            "edurust-development-secret".to_string()
        });
        let frontend_origin =
            env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self {
            database_url,
            bind_address,
            jwt_secret,
            frontend_origin,
        }
    }
}

pub async fn connect_database(config: &AppConfig) -> Result<DatabaseConnection, sea_orm::DbErr> {
    debug!("Connecting to database");
    let db = Database::connect(&config.database_url).await?;
    info!("Database connection established");
    Ok(db)
}

/// Builds the full application context: database, cache, mailer and checkout
/// gateway. The SMTP mailer is used when `SMTP_HOST` is configured, otherwise
/// outgoing mail is written to the log.
pub async fn initialize_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let db = connect_database(&config).await?;

    let cache = Cache::builder()
        .max_capacity(CACHE_CAPACITY)
        .time_to_live(CACHE_TTL)
        .build();

    let mailer: Arc<dyn EmailSender> = match SmtpConfig::from_env() {
        Some(smtp) => {
            info!("Using SMTP mailer via {}", smtp.host);
            Arc::new(SmtpEmailSender::new(smtp)?)
        }
        None => {
            info!("SMTP_HOST not set, emails will be logged to the console");
            Arc::new(ConsoleEmailSender)
        }
    };

    let checkout: Arc<dyn CheckoutGateway> =
        Arc::new(HostedCheckout::new(config.frontend_origin.clone()));

    Ok(AppState {
        db,
        cache,
        config: Arc::new(config),
        mailer,
        checkout,
    })
}
