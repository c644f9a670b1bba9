use anyhow::{Context, Result};
use std::fmt;

/// Port Telegram is told to deliver to. A reverse proxy terminates TLS there
/// and forwards to the local `PORT`.
pub const ADVERTISED_PORT: u16 = 443;

/// Local-only address of the liveness endpoint.
pub const HEALTH_ADDR: &str = "127.0.0.1:9000";

/// Long-poll wait ceiling in seconds.
pub const POLL_TIMEOUT_SECS: u32 = 60;

fn default_port() -> u16 {
    3000
}

#[derive(Clone)]
pub struct Config {
    pub token: String,
    /// Externally reachable hostname. Presence switches the bot to webhooks.
    pub domain: Option<String>,
    pub port: u16,
    pub debug: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("domain", &self.domain)
            .field("port", &self.port)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Config {
    /// Read configuration from the process environment, after loading `.env`
    /// if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TOKEN")
            .filter(|t| !t.is_empty())
            .context("Unable to read bot token. Make sure you export $TOKEN in the environment")?;

        let domain = lookup("DOMAIN").filter(|d| !d.is_empty());

        let port = match lookup("PORT").filter(|p| !p.is_empty()) {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("Invalid $PORT value: {raw}"))?,
            None => default_port(),
        };

        let debug = lookup("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false);

        Ok(Self {
            token,
            domain,
            port,
            debug,
        })
    }

    /// URL registered with Telegram, or `None` when running in polling mode.
    pub fn webhook_url(&self) -> Option<String> {
        self.domain
            .as_ref()
            .map(|domain| format!("https://{}:{}{}", domain, ADVERTISED_PORT, self.webhook_path()))
    }

    /// Path the webhook receiver listens on. Embeds the token so only
    /// Telegram knows where to push updates.
    pub fn webhook_path(&self) -> String {
        format!("/{}", self.token)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

/// Anything except "", "0" and "false" (case-insensitive) enables the flag.
fn is_truthy(value: &str) -> bool {
    !matches!(value.to_lowercase().as_str(), "" | "0" | "false")
}

/// Mask the token in anything that is about to be logged.
pub fn redact(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    text.replace(token, "<token>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = load(&[("DOMAIN", "example.org")]).unwrap_err();
        assert!(err.to_string().contains("$TOKEN"));
    }

    #[test]
    fn test_empty_token_is_an_error() {
        assert!(load(&[("TOKEN", "")]).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.domain, None);
        assert!(!config.debug);
        assert_eq!(config.webhook_url(), None);
    }

    #[test]
    fn test_webhook_url_uses_advertised_port() {
        let config = load(&[("TOKEN", "123:abc"), ("DOMAIN", "bot.example.org"), ("PORT", "8080")])
            .unwrap();
        assert_eq!(
            config.webhook_url().as_deref(),
            Some("https://bot.example.org:443/123:abc")
        );
        assert_eq!(config.webhook_path(), "/123:abc");
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_empty_domain_means_polling() {
        let config = load(&[("TOKEN", "t"), ("DOMAIN", "")]).unwrap();
        assert_eq!(config.domain, None);
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("TOKEN", "t"), ("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("$PORT"));
    }

    #[test]
    fn test_debug_flag_values() {
        for off in ["", "0", "false", "FALSE", "False"] {
            assert!(!load(&[("TOKEN", "t"), ("DEBUG", off)]).unwrap().debug, "{off}");
        }
        for on in ["1", "true", "yes", "TRUE"] {
            assert!(load(&[("TOKEN", "t"), ("DEBUG", on)]).unwrap().debug, "{on}");
        }
    }

    #[test]
    fn test_debug_output_hides_token() {
        let config = load(&[("TOKEN", "secret-token")]).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("secret-token"));
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("https://x:443/123:abc", "123:abc"),
            "https://x:443/<token>"
        );
        assert_eq!(redact("plain", ""), "plain");
    }
}
