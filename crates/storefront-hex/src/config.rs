use serde::Deserialize;
use std::env;
use std::time::Duration;

const SANDBOX_BASE_URL: &str = "https://dev.khalti.com/api/v2/";
const PRODUCTION_BASE_URL: &str = "https://khalti.com/api/v2/";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    /// Registration with this secret creates an admin account.
    pub admin_secret: Option<String>,
    /// Storefront origin; the payment callback redirects here.
    pub site_url: String,
    /// Publicly reachable base of this API, used for the gateway return URL.
    pub public_api_url: Option<String>,
    pub khalti: KhaltiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KhaltiMode {
    Sandbox,
    Production,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KhaltiConfig {
    pub secret_key: Option<String>,
    pub mode: KhaltiMode,
    pub base_url_override: Option<String>,
    pub timeout_secs: u64,
}

impl KhaltiConfig {
    /// Always ends with `/` so endpoint paths join underneath it.
    pub fn base_url(&self) -> String {
        let base = match (&self.base_url_override, self.mode) {
            (Some(url), _) => url.clone(),
            (None, KhaltiMode::Sandbox) => SANDBOX_BASE_URL.to_string(),
            (None, KhaltiMode::Production) => PRODUCTION_BASE_URL.to_string(),
        };
        if base.ends_with('/') {
            base
        } else {
            format!("{base}/")
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = env::var("SERVER_PORT").unwrap_or_else(|_| "3000".into());
        let database_url = env::var("DATABASE_URL").ok();

        let secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        let ttl_hours = parse_var("JWT_TTL_HOURS", 40)?;

        let mode = match env::var("KHALTI_MODE").as_deref() {
            Err(_) | Ok("sandbox") => KhaltiMode::Sandbox,
            Ok("production") => KhaltiMode::Production,
            Ok(other) => anyhow::bail!("KHALTI_MODE must be sandbox or production, got {other}"),
        };

        Ok(Self {
            server_port,
            database_url,
            jwt: JwtConfig { secret, ttl_hours },
            admin_secret: non_empty("ADMIN_SECRET"),
            site_url: env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:5173".into()),
            public_api_url: non_empty("PUBLIC_API_URL"),
            khalti: KhaltiConfig {
                secret_key: non_empty("KHALTI_SECRET_KEY"),
                mode,
                base_url_override: non_empty("KHALTI_BASE_URL"),
                timeout_secs: parse_var("KHALTI_TIMEOUT_SECS", 15)?,
            },
        })
    }

    /// Where the gateway sends the payer back after checkout.
    pub fn khalti_return_url(&self) -> Option<String> {
        self.public_api_url.as_ref().map(|base| {
            format!("{}/checkout/khalti/callback", base.trim_end_matches('/'))
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn khalti(mode: KhaltiMode, url: Option<&str>) -> KhaltiConfig {
        KhaltiConfig {
            secret_key: None,
            mode,
            base_url_override: url.map(String::from),
            timeout_secs: 15,
        }
    }

    #[test]
    fn base_url_follows_mode_and_override() {
        assert_eq!(
            khalti(KhaltiMode::Sandbox, None).base_url(),
            "https://dev.khalti.com/api/v2/"
        );
        assert_eq!(
            khalti(KhaltiMode::Production, None).base_url(),
            "https://khalti.com/api/v2/"
        );
        assert_eq!(
            khalti(KhaltiMode::Production, Some("http://127.0.0.1:9000/api")).base_url(),
            "http://127.0.0.1:9000/api/"
        );
    }

    #[test]
    fn return_url_joins_public_api_base() {
        let cfg = Config {
            server_port: "3000".into(),
            database_url: None,
            jwt: JwtConfig {
                secret: "s".into(),
                ttl_hours: 40,
            },
            admin_secret: None,
            site_url: "http://localhost:5173".into(),
            public_api_url: Some("https://api.example.com/".into()),
            khalti: khalti(KhaltiMode::Sandbox, None),
        };
        assert_eq!(
            cfg.khalti_return_url().as_deref(),
            Some("https://api.example.com/checkout/khalti/callback")
        );
    }
}
