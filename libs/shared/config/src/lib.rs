use std::env;
use std::time::Duration;
use tracing::warn;

pub const SSLCOMMERZ_SANDBOX_URL: &str = "https://sandbox.sslcommerz.com";
pub const SSLCOMMERZ_LIVE_URL: &str = "https://securepay.sslcommerz.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_id: String,
    pub store_passwd: String,
    pub is_live: bool,
    pub gateway_base_url: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub api_base_url: String,
    pub frontend_url: String,
    pub callback_signing_secret: String,
    pub placeholder_email: String,
    pub gateway_timeout: Duration,
    pub database_timeout: Duration,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let is_live = env::var("SSLCOMMERZ_IS_LIVE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let config = Self {
            store_id: env::var("STORE_ID")
                .unwrap_or_else(|_| {
                    warn!("STORE_ID not set, using empty value");
                    String::new()
                }),
            store_passwd: env::var("STORE_PASSWD")
                .unwrap_or_else(|_| {
                    warn!("STORE_PASSWD not set, using empty value");
                    String::new()
                }),
            is_live,
            gateway_base_url: env::var("SSLCOMMERZ_BASE_URL")
                .unwrap_or_else(|_| Self::default_gateway_url(is_live).to_string()),
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            api_base_url: env::var("API_URL")
                .unwrap_or_else(|_| {
                    warn!("API_URL not set, using default");
                    "http://localhost:3000".to_string()
                }),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| {
                    warn!("FRONTEND_URL not set, using default");
                    "http://localhost:5173".to_string()
                }),
            callback_signing_secret: env::var("CALLBACK_SIGNING_SECRET")
                .unwrap_or_else(|_| {
                    warn!("CALLBACK_SIGNING_SECRET not set, success callbacks will not be signed");
                    String::new()
                }),
            placeholder_email: env::var("PLACEHOLDER_EMAIL")
                .unwrap_or_else(|_| "noreply@clinic.local".to_string()),
            gateway_timeout: Duration::from_secs(Self::secs_from_env("GATEWAY_TIMEOUT_SECS", 30)),
            database_timeout: Duration::from_secs(Self::secs_from_env("DATABASE_TIMEOUT_SECS", 15)),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn default_gateway_url(is_live: bool) -> &'static str {
        if is_live {
            SSLCOMMERZ_LIVE_URL
        } else {
            SSLCOMMERZ_SANDBOX_URL
        }
    }

    fn secs_from_env(key: &str, default: u64) -> u64 {
        match env::var(key) {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("{} is not a whole number of seconds, using {}", key, default);
                default
            }),
            Err(_) => default,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.is_gateway_configured() && self.is_database_configured()
    }

    pub fn is_gateway_configured(&self) -> bool {
        !self.store_id.is_empty()
            && !self.store_passwd.is_empty()
            && !self.gateway_base_url.is_empty()
    }

    pub fn is_database_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_service_key.is_empty()
    }

    pub fn is_signing_enabled(&self) -> bool {
        !self.callback_signing_secret.is_empty()
    }

    /// Frontend page URL, e.g. `frontend_path("/payment-fail")`.
    pub fn frontend_path(&self, path: &str) -> String {
        format!("{}{}", self.frontend_url.trim_end_matches('/'), path)
    }

    pub fn api_path(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}
