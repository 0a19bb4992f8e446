use crate::credentials::Credentials;
use std::time::Duration;

pub const DEFAULT_SMS_BASE_URL: &str = "https://secure.bringcrm.no/api/sms/v1";
pub const DEFAULT_HQ_BASE_URL: &str = "https://api.bringcrm.no/hqpublic/v1";
pub const DEFAULT_RECORD_LINKING_BASE_URL: &str = "https://api.bas.no/recordlinking/v2";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub sms_base_url: String,
    pub hq_base_url: String,
    pub record_linking_base_url: String,
    pub http_timeout: Duration,
    /// Shared by the SMS and record-linking services.
    pub bdn_credentials: Credentials,
    pub hq_credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sms_base_url: DEFAULT_SMS_BASE_URL.to_string(),
            hq_base_url: DEFAULT_HQ_BASE_URL.to_string(),
            record_linking_base_url: DEFAULT_RECORD_LINKING_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            bdn_credentials: Credentials::default(),
            hq_credentials: Credentials::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the environment (and `.env` if present).
    ///
    /// Credentials are optional here: a client built from blank credentials
    /// reports `Unauthorized` on first use instead of failing at startup.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            sms_base_url: base_url_var("BDN_SMS_BASE_URL", DEFAULT_SMS_BASE_URL)?,
            hq_base_url: base_url_var("BDN_HQ_BASE_URL", DEFAULT_HQ_BASE_URL)?,
            record_linking_base_url: base_url_var(
                "BDN_RECORD_LINKING_BASE_URL",
                DEFAULT_RECORD_LINKING_BASE_URL,
            )?,
            http_timeout: Duration::from_secs(
                std::env::var("BDN_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| DEFAULT_HTTP_TIMEOUT_SECS.to_string())
                    .parse()
                    .map_err(|_| {
                        anyhow::anyhow!("BDN_HTTP_TIMEOUT_SECS must be a whole number of seconds")
                    })?,
            ),
            bdn_credentials: Credentials {
                api_key: optional_var("BDN_KEY"),
                api_account: optional_var("BDN_ACCOUNT"),
                api_domain: None,
            },
            hq_credentials: Credentials {
                api_key: optional_var("HQPUBLIC_BDN_KEY"),
                api_account: optional_var("HQPUBLIC_BDN_ACCOUNT"),
                api_domain: optional_var("HQPUBLIC_BDN_DOMAIN"),
            },
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("SMS Base URL: {}", config.sms_base_url);
        tracing::debug!("HQ Public Base URL: {}", config.hq_base_url);
        tracing::debug!(
            "Record Linking Base URL: {}",
            config.record_linking_base_url
        );
        if config.hq_credentials.api_key.is_none() {
            tracing::warn!("HQPUBLIC_BDN_KEY not set; HQ Public calls will be unauthorized");
        }
        if config.bdn_credentials.api_key.is_none() {
            tracing::warn!("BDN_KEY not set; SMS and Record Linking calls will be unauthorized");
        }

        Ok(config)
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn base_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let url = optional_var(name).unwrap_or_else(|| default.to_string());
    validate_base_url(name, &url)?;
    Ok(url.trim_end_matches('/').to_string())
}

fn validate_base_url(name: &str, url: &str) -> anyhow::Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(())
}
