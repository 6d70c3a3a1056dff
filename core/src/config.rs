//! Client configuration.

use std::time::Duration;

use crate::factory::TransportSelector;

/// Base URI relative endpoints are resolved against.
pub const DEFAULT_BASE_URI: &str = "https://xome.vn";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Environment variable holding the API key.
pub const API_KEY_ENV_NAME: &str = "XOME_API_KEY";

/// Environment variable holding the API username.
pub const API_USER_ENV_NAME: &str = "XOME_API_USER";

/// Settings for a `Xome` client.
///
/// `headers` are sent with every request. Replacing them with
/// [`XomeConfig::with_headers`] drops the credential headers read from the
/// environment.
#[derive(Debug, Clone)]
pub struct XomeConfig {
    pub base_uri: String,
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
    pub default_access_token: Option<String>,
    pub http_client_handler: TransportSelector,
}

impl XomeConfig {
    /// Defaults for `base_uri`, without reading the environment.
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            timeout: DEFAULT_TIMEOUT,
            headers: Vec::new(),
            default_access_token: None,
            http_client_handler: TransportSelector::Default,
        }
    }

    /// Defaults plus the `Api-Key` and `Api-Username` headers taken from
    /// `XOME_API_KEY` and `XOME_API_USER`. Unset variables are skipped.
    pub fn from_env() -> Self {
        let headers = [("Api-Key", API_KEY_ENV_NAME), ("Api-Username", API_USER_ENV_NAME)]
            .into_iter()
            .filter_map(|(header, var)| {
                std::env::var(var)
                    .ok()
                    .map(|value| (header.to_string(), value))
            })
            .collect();
        Self {
            headers,
            ..Self::new(DEFAULT_BASE_URI)
        }
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }

    /// Set the `Api-Key` and `Api-Username` headers, replacing earlier values.
    pub fn with_credentials(mut self, api_key: impl Into<String>, username: impl Into<String>) -> Self {
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("Api-Key") && !name.eq_ignore_ascii_case("Api-Username"));
        self.headers.push(("Api-Key".to_string(), api_key.into()));
        self.headers.push(("Api-Username".to_string(), username.into()));
        self
    }

    pub fn with_default_access_token(mut self, token: impl Into<String>) -> Self {
        self.default_access_token = Some(token.into());
        self
    }

    pub fn with_http_client_handler(mut self, handler: impl Into<TransportSelector>) -> Self {
        self.http_client_handler = handler.into();
        self
    }
}

impl Default for XomeConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_library_defaults() {
        let config = XomeConfig::new("http://localhost:3000");
        assert_eq!(config.base_uri, "http://localhost:3000");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert!(config.headers.is_empty());
        assert!(config.default_access_token.is_none());
        assert!(matches!(config.http_client_handler, TransportSelector::Default));
    }

    // The only test in this crate that touches these variables.
    #[test]
    fn from_env_maps_credentials_to_headers() {
        std::env::set_var(API_KEY_ENV_NAME, "env-key");
        std::env::set_var(API_USER_ENV_NAME, "env-user");
        let config = XomeConfig::from_env();
        assert_eq!(config.base_uri, DEFAULT_BASE_URI);
        assert_eq!(
            config.headers,
            vec![
                ("Api-Key".to_string(), "env-key".to_string()),
                ("Api-Username".to_string(), "env-user".to_string()),
            ]
        );

        std::env::remove_var(API_KEY_ENV_NAME);
        assert_eq!(
            XomeConfig::from_env().headers,
            vec![("Api-Username".to_string(), "env-user".to_string())]
        );

        std::env::remove_var(API_USER_ENV_NAME);
        assert!(XomeConfig::from_env().headers.is_empty());
        assert!(XomeConfig::default().headers.is_empty());
    }

    #[test]
    fn with_credentials_replaces_existing_values() {
        let config = XomeConfig::new(DEFAULT_BASE_URI)
            .with_headers(vec![
                ("api-key".to_string(), "old".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
            ])
            .with_credentials("key", "user");
        assert_eq!(
            config.headers,
            vec![
                ("X-Trace".to_string(), "1".to_string()),
                ("Api-Key".to_string(), "key".to_string()),
                ("Api-Username".to_string(), "user".to_string()),
            ]
        );
    }

    #[test]
    fn builder_methods_set_fields() {
        let config = XomeConfig::new(DEFAULT_BASE_URI)
            .with_base_uri("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(250))
            .with_default_access_token("token")
            .with_http_client_handler("stream");
        assert_eq!(config.base_uri, "http://127.0.0.1:9");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.default_access_token.as_deref(), Some("token"));
        assert!(matches!(config.http_client_handler, TransportSelector::Named(ref n) if n == "stream"));
    }
}
