use crate::relations::DemotionTarget;
use dotenv::dotenv;
use std::env;
use tracing::{info, warn};

const DEFAULT_DATABASE_URL: &str = "sqlite://social.db?mode=rwc";
const DEFAULT_JWT_SECRET: &str = "un segreto meno bello";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub demotion_target: DemotionTarget,
    pub app_env: String,
}

/// Legge una variabile con default e la converte, con un messaggio d'errore leggibile
fn parse_var<T: std::str::FromStr>(name: &str, default: &str, expected: &str) -> Result<T, String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse::<T>()
        .map_err(|_| format!("Invalid {}: must be {}", name, expected))
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            warn!("JWT_SECRET not set, using default (not secure for production!)");
            DEFAULT_JWT_SECRET.to_string()
        });

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = parse_var("SERVER_PORT", "3000", "a number between 0-65535")?;

        let max_connections = parse_var("MAX_DB_CONNECTIONS", "10", "a positive number")?;
        if max_connections == 0 {
            return Err("Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string());
        }

        let acquire_timeout_secs =
            parse_var("DB_ACQUIRE_TIMEOUT_SECS", "5", "a number of seconds")?;

        let demotion_target = env::var("ADMIN_DEMOTION_TARGET")
            .map(|raw| raw.parse::<DemotionTarget>())
            .unwrap_or(Ok(DemotionTarget::default()))
            .map_err(|e| format!("Invalid ADMIN_DEMOTION_TARGET: {}", e))?;

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            database_url,
            jwt_secret,
            server_host,
            server_port,
            max_connections,
            acquire_timeout_secs,
            demotion_target,
            app_env,
        })
    }

    /// Logga la configurazione (nascondendo i segreti)
    pub fn print_info(&self) {
        info!("Server Configuration:");
        info!("   Environment: {}", self.app_env);
        info!("   Server Address: {}:{}", self.server_host, self.server_port);
        info!("   Database: {}", Self::mask_url(&self.database_url));
        info!("   Max DB Connections: {}", self.max_connections);
        info!("   Acquire Timeout: {}s", self.acquire_timeout_secs);
        info!("   Admin Demotion Target: {:?}", self.demotion_target);
        info!(
            "   JWT Secret: {}",
            if self.jwt_secret == DEFAULT_JWT_SECRET {
                "USING DEFAULT (INSECURE!)"
            } else {
                "custom secret configured"
            }
        );
    }

    /// Maschera le credenziali dell'URL del database per il logging
    fn mask_url(url: &str) -> String {
        if let (Some(at_pos), Some(scheme_end)) = (url.find('@'), url.find("://")) {
            let scheme = &url[..scheme_end + 3];
            let after_at = &url[at_pos..];
            return format!("{}***{}", scheme, after_at);
        }
        // sqlite: niente credenziali, solo il percorso del file
        if url.starts_with("sqlite:") {
            return url.to_string();
        }
        "***".to_string()
    }
}
