// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::exporters::http::tls::{Config, ConfigBuilder};
use crate::exporters::ingest::{DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT, NOTIFIER_NAME};

/// Describes the host an event was collected on. Attached to every
/// aggregated event as `server.*` params.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerTags {
    pub host: String,
    pub environment: String,
    pub root: String,
    pub branch: Option<String>,
    pub github_account: Option<String>,
    pub github_repo: Option<String>,
}

impl ServerTags {
    /// Params for an event read from `log_file`.
    pub fn to_params(&self, log_file: &Path) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("server.host".into(), self.host.clone().into());
        params.insert("server.environment".into(), self.environment.clone().into());
        params.insert("server.root".into(), self.root.clone().into());
        if let Some(branch) = &self.branch {
            params.insert("server.branch".into(), branch.clone().into());
        }
        if let Some(account) = &self.github_account {
            params.insert("server.github.account".into(), account.clone().into());
        }
        if let Some(repo) = &self.github_repo {
            params.insert("server.github.repo".into(), repo.clone().into());
        }
        params.insert(
            "server.log_file".into(),
            log_file.to_string_lossy().into_owned().into(),
        );
        params.insert("notifier.name".into(), NOTIFIER_NAME.into());
        params
    }
}

#[derive(Clone)]
pub struct IngestExporterConfig {
    pub(crate) endpoint: String,
    pub(crate) access_token: String,
    pub(crate) request_timeout: Duration,
    pub(crate) tags: ServerTags,
    pub(crate) tls_cfg_builder: ConfigBuilder,
}

impl Default for IngestExporterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: String::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tags: ServerTags::default(),
            tls_cfg_builder: Config::builder(),
        }
    }
}

impl IngestExporterConfig {
    pub fn new(endpoint: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: access_token.into(),
            ..Default::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_tags(mut self, tags: ServerTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_ca_file(mut self, ca_file: &str) -> Self {
        self.tls_cfg_builder = self.tls_cfg_builder.with_ca_file(ca_file.to_string());
        self
    }

    pub fn with_ca_pem(mut self, ca_pem: &str) -> Self {
        self.tls_cfg_builder = self.tls_cfg_builder.with_ca_pem(ca_pem.to_string());
        self
    }

    pub fn with_tls_skip_verify(mut self, skip_verify: bool) -> Self {
        self.tls_cfg_builder = self.tls_cfg_builder.with_tls_skip_verify(skip_verify);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.access_token.trim().is_empty() {
            return Err("An access token must be specified".to_string());
        }

        if self.endpoint.is_empty() {
            return Err("An ingestion endpoint must be specified".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_include_optional_tags_only_when_set() {
        let mut tags = ServerTags {
            host: "web-1".to_string(),
            environment: "production".to_string(),
            root: "/srv/app".to_string(),
            ..Default::default()
        };

        let params = tags.to_params(Path::new("/var/log/app.log"));
        assert_eq!(params["server.host"], "web-1");
        assert_eq!(params["server.environment"], "production");
        assert_eq!(params["server.root"], "/srv/app");
        assert_eq!(params["server.log_file"], "/var/log/app.log");
        assert_eq!(params["notifier.name"], "ratchet-agent");
        assert!(!params.contains_key("server.branch"));
        assert!(!params.contains_key("server.github.account"));

        tags.branch = Some("main".to_string());
        tags.github_account = Some("acme".to_string());
        tags.github_repo = Some("shop".to_string());
        let params = tags.to_params(Path::new("/var/log/app.log"));
        assert_eq!(params["server.branch"], "main");
        assert_eq!(params["server.github.account"], "acme");
        assert_eq!(params["server.github.repo"], "shop");
    }

    #[test]
    fn test_validate() {
        let config = IngestExporterConfig::default();
        assert!(config.validate().is_err());

        let config = IngestExporterConfig::new(DEFAULT_ENDPOINT, "token");
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(3));

        let config = config.with_request_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
