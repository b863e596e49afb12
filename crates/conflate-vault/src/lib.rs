//! conflate-vault: HashiCorp Vault interpolator for conflate
//!
//! Resolves `<% VAULT[name] %>` directives against a Vault KV (version 1)
//! secrets engine. The resolved value is the JSON serialization of the
//! secret's `data` payload, which the engine then re-types into a mapping,
//! so individual fields are reachable by path:
//!
//! ```yaml
//! database:
//!   credentials: <% VAULT[apps.web.db] %>
//! ```
//!
//! # Example
//!
//! ```no_run
//! use conflate_core::{Config, Registry};
//! use conflate_vault::VaultInterpolator;
//!
//! let mut registry = Registry::with_builtins();
//! let vault = VaultInterpolator::new("http://localhost:8200")
//!     .with_token("s.XYZ")
//!     .with_mount("secret");
//! vault.register_into(&mut registry, false).unwrap();
//!
//! let config = Config::from_yaml_with("password: <% VAULT[apps.web] %>\n", &registry).unwrap();
//! ```

use std::sync::Arc;
use std::time::Duration;

use conflate_core::{register_global, Error, Interpolator, Registry, Result};

/// Registry tag the interpolator is registered under
pub const VAULT_TAG: &str = "VAULT";

const DEFAULT_MOUNT: &str = "secret";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Vault KV v1 interpolator (tag `VAULT`)
///
/// Secrets are fetched with `GET {addr}/v1/{mount}/{name}`, authenticated via
/// the `X-Vault-Token` header when a token is configured. A missing secret
/// (HTTP 404) reports as not-found, so directive defaults apply; every other
/// failure is fatal.
#[derive(Debug, Clone)]
pub struct VaultInterpolator {
    agent: ureq::Agent,
    addr: String,
    token: Option<String>,
    mount: String,
}

impl VaultInterpolator {
    /// Create an interpolator for the Vault server at `addr`.
    ///
    /// Uses the `secret` mount and a 30 second request timeout; no token is
    /// sent until one is configured.
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_timeout_secs(addr, DEFAULT_TIMEOUT_SECS)
    }

    fn with_timeout_secs(addr: impl Into<String>, timeout_secs: u64) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs)))
            .build();

        Self {
            agent: config.into(),
            addr: addr.into().trim_end_matches('/').to_string(),
            token: None,
            mount: DEFAULT_MOUNT.to_string(),
        }
    }

    /// Create an interpolator from the standard `VAULT_ADDR` and
    /// `VAULT_TOKEN` environment variables.
    pub fn from_env() -> Result<Self> {
        let addr = std::env::var("VAULT_ADDR").map_err(|_| {
            Error::interpolator_custom("vault", "VAULT_ADDR environment variable is not set")
        })?;

        let mut interpolator = Self::new(addr);
        if let Ok(token) = std::env::var("VAULT_TOKEN") {
            interpolator.token = Some(token);
        }
        Ok(interpolator)
    }

    /// Set the authentication token sent as `X-Vault-Token`
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the KV mount point (default `secret`)
    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into().trim_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        self.agent = config.into();
        self
    }

    /// Register this interpolator under the `VAULT` tag in `registry`
    pub fn register_into(self, registry: &mut Registry, overwrite: bool) -> Result<()> {
        registry.register(VAULT_TAG, Arc::new(self), overwrite)
    }

    /// Register this interpolator under the `VAULT` tag in the process-wide
    /// default registry
    pub fn register(self, overwrite: bool) -> Result<()> {
        register_global(VAULT_TAG, Arc::new(self), overwrite)
    }

    fn secret_url(&self, name: &str) -> String {
        format!("{}/v1/{}/{}", self.addr, self.mount, name)
    }
}

impl Interpolator for VaultInterpolator {
    fn lookup(&self, name: &str) -> Result<String> {
        let url = self.secret_url(name);
        log::debug!("fetching vault secret from {}", url);

        let mut request = self.agent.get(&url);
        if let Some(token) = &self.token {
            request = request.header("X-Vault-Token", token);
        }

        let response = request.call().map_err(|e| match e {
            ureq::Error::StatusCode(404) => Error::not_found(format!("vault secret '{}'", name)),
            ureq::Error::StatusCode(code) => Error::interpolator_custom(
                "vault",
                format!("server returned HTTP {} for '{}'", code, name),
            ),
            ureq::Error::Timeout(kind) => {
                Error::interpolator_custom("vault", format!("request timeout: {:?}", kind))
            }
            ureq::Error::Io(io_err) => {
                Error::interpolator_custom("vault", format!("connection error: {}", io_err))
            }
            other => Error::interpolator_custom("vault", format!("request failed: {}", other)),
        })?;

        let body = response.into_body().read_to_string().map_err(|e| {
            Error::interpolator_custom("vault", format!("failed to read response body: {}", e))
        })?;

        let payload: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            Error::interpolator_custom("vault", format!("response is not valid JSON: {}", e))
        })?;

        let data = payload.get("data").ok_or_else(|| {
            Error::interpolator_custom(
                "vault",
                format!("response for '{}' has no 'data' field", name),
            )
        })?;

        serde_json::to_string(data)
            .map_err(|e| Error::interpolator_custom("vault", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use pretty_assertions::assert_eq;

    fn interpolator_for(server: &Server) -> VaultInterpolator {
        VaultInterpolator::new(server.url()).with_token("test-token")
    }

    #[test]
    fn test_lookup_serializes_data_payload() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/v1/secret/apps.web")
            .match_header("X-Vault-Token", "test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"request_id": "abc", "data": {"password": "hunter2"}}"#)
            .create();

        let result = interpolator_for(&server).lookup("apps.web").unwrap();
        assert_eq!(result, r#"{"password":"hunter2"}"#);

        mock.assert();
    }

    #[test]
    fn test_lookup_404_is_not_found() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/v1/secret/missing")
            .with_status(404)
            .with_body(r#"{"errors": []}"#)
            .expect(2)
            .create();

        let err = interpolator_for(&server).lookup("missing").unwrap_err();
        assert!(err.is_not_found());

        // Not-found is default-eligible
        assert_eq!(
            interpolator_for(&server).lookup_or("missing", "fallback").unwrap(),
            "fallback"
        );

        mock.assert();
    }

    #[test]
    fn test_lookup_server_error_is_fatal() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/v1/secret/broken")
            .with_status(500)
            .create();

        let err = interpolator_for(&server).lookup("broken").unwrap_err();
        assert!(!err.is_not_found());
        assert!(format!("{}", err).contains("HTTP 500"));

        mock.assert();
    }

    #[test]
    fn test_lookup_malformed_payload() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/v1/secret/junk")
            .with_status(200)
            .with_body("not json")
            .create();

        let err = interpolator_for(&server).lookup("junk").unwrap_err();
        assert!(format!("{}", err).contains("not valid JSON"));

        mock.assert();
    }

    #[test]
    fn test_custom_mount() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/v1/kv/app")
            .with_status(200)
            .with_body(r#"{"data": {"k": "v"}}"#)
            .create();

        let interpolator = VaultInterpolator::new(server.url()).with_mount("kv");
        assert_eq!(interpolator.lookup("app").unwrap(), r#"{"k":"v"}"#);

        mock.assert();
    }

    #[test]
    fn test_end_to_end_with_config() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/v1/secret/apps.db")
            .with_status(200)
            .with_body(r#"{"data": {"user": "svc", "port": 5432}}"#)
            .create();

        let mut registry = Registry::with_builtins();
        interpolator_for(&server)
            .register_into(&mut registry, false)
            .unwrap();

        let config = conflate_core::Config::from_yaml_with(
            "database: <% VAULT[apps.db] %>\n",
            &registry,
        )
        .unwrap();

        // The JSON payload re-types into a nested mapping
        assert_eq!(config.get("database.user").unwrap().as_str(), Some("svc"));
        assert_eq!(config.get("database.port").unwrap().as_i64(), Some(5432));

        mock.assert();
    }

    #[test]
    fn test_from_env_requires_addr() {
        std::env::remove_var("VAULT_ADDR");
        assert!(VaultInterpolator::from_env().is_err());
    }
}
