
/// Endpoint of the legacy export backend (`/api/sync`).
pub const DEFAULT_SYNC_ENDPOINT: &str = "http://localhost:5000/api/sync";

#[derive(Debug, Clone)]
pub struct Config {
    pub sync_endpoint_url: String,
    pub port: u16,
    pub sync_timeout_secs: u64,
    /// 0 disables automatic refresh.
    pub auto_refresh_secs: u64,
    /// Read ANDAMENTOS/TERCEIROS/PARCELAS arrays from source rows.
    pub map_nested_collections: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_endpoint_url: DEFAULT_SYNC_ENDPOINT.to_string(),
            port: 3000,
            sync_timeout_secs: 30,
            auto_refresh_secs: 0,
            map_nested_collections: false,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            sync_endpoint_url: std::env::var("SYNC_ENDPOINT_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| validate_endpoint(&url))
                .transpose()?
                .unwrap_or_else(|| DEFAULT_SYNC_ENDPOINT.to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            sync_timeout_secs: std::env::var("SYNC_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SYNC_TIMEOUT_SECS must be a positive number"))
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("SYNC_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            auto_refresh_secs: std::env::var("AUTO_REFRESH_SECS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("AUTO_REFRESH_SECS must be a number (0 disables)"))?,
            map_nested_collections: std::env::var("MAP_NESTED_COLLECTIONS")
                .ok()
                .map(|v| parse_flag(&v))
                .transpose()?
                .unwrap_or(false),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Sync endpoint: {}", config.sync_endpoint_url);
        tracing::debug!("Sync timeout: {}s", config.sync_timeout_secs);
        if config.auto_refresh_secs > 0 {
            tracing::info!("Automatic refresh every {}s", config.auto_refresh_secs);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Endpoint must be an absolute http(s) URL.
pub fn validate_endpoint(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    let url = url::Url::parse(trimmed)
        .map_err(|e| anyhow::anyhow!("SYNC_ENDPOINT_URL is not a valid URL: {}", e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("SYNC_ENDPOINT_URL must start with http:// or https://");
    }
    Ok(trimmed.to_string())
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("MAP_NESTED_COLLECTIONS must be true or false, got '{}'", other),
    }
}
