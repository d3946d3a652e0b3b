// SPDX-License-Identifier: Apache-2.0

use clap::Args;
use std::path::Path;
use std::time::Duration;
use tower::BoxError;

use crate::exporters::ingest::{DEFAULT_ENDPOINT, IngestExporterConfig, ServerTags};

#[derive(Debug, Args, Clone)]
pub struct IngestExporterArgs {
    /// Project access token with post_server_item scope
    #[arg(long = "access-token", env = "RATCHET_ACCESS_TOKEN", required = true)]
    pub ingest_exporter_access_token: String,

    /// Item ingestion endpoint
    #[arg(long = "endpoint", env = "RATCHET_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub ingest_exporter_endpoint: String,

    /// Timeout for each item request, in seconds
    #[arg(long = "timeout-secs", env = "RATCHET_TIMEOUT_SECS", default_value = "3")]
    pub ingest_exporter_timeout_secs: u64,

    /// Environment name reported with every item
    #[arg(long = "environment", env = "RATCHET_ENVIRONMENT", default_value = "production")]
    pub ingest_exporter_environment: String,

    /// Host name reported with every item, defaults to the machine host name
    #[arg(long = "host", env = "RATCHET_HOST")]
    pub ingest_exporter_host: Option<String>,

    /// Code root reported with every item, defaults to the working directory
    #[arg(long = "root", env = "RATCHET_ROOT")]
    pub ingest_exporter_root: Option<String>,

    /// Code branch reported with every item
    #[arg(long = "branch", env = "RATCHET_BRANCH")]
    pub ingest_exporter_branch: Option<String>,

    /// GitHub account owning the deployed code
    #[arg(long = "github-account", env = "RATCHET_GITHUB_ACCOUNT")]
    pub ingest_exporter_github_account: Option<String>,

    /// GitHub repository of the deployed code
    #[arg(long = "github-repo", env = "RATCHET_GITHUB_REPO")]
    pub ingest_exporter_github_repo: Option<String>,

    /// CA certificate used to verify the endpoint
    #[arg(long = "tls-ca-file", env = "RATCHET_TLS_CA_FILE")]
    pub ingest_exporter_tls_ca_file: Option<String>,

    /// Skip verification of the endpoint certificate
    #[arg(long = "tls-skip-verify", env = "RATCHET_TLS_SKIP_VERIFY", default_value = "false")]
    pub ingest_exporter_tls_skip_verify: bool,
}

impl IngestExporterArgs {
    /// Build the exporter config. `host` and `cwd` fill in tags that were
    /// not given explicitly.
    pub fn build_config(&self, host: &str, cwd: &Path) -> Result<IngestExporterConfig, BoxError> {
        let tags = ServerTags {
            host: self
                .ingest_exporter_host
                .clone()
                .unwrap_or_else(|| host.to_string()),
            environment: self.ingest_exporter_environment.clone(),
            root: self
                .ingest_exporter_root
                .clone()
                .unwrap_or_else(|| cwd.to_string_lossy().into_owned()),
            branch: self.ingest_exporter_branch.clone(),
            github_account: self.ingest_exporter_github_account.clone(),
            github_repo: self.ingest_exporter_github_repo.clone(),
        };

        let mut config = IngestExporterConfig::new(
            self.ingest_exporter_endpoint.clone(),
            self.ingest_exporter_access_token.clone(),
        )
        .with_request_timeout(Duration::from_secs(self.ingest_exporter_timeout_secs))
        .with_tags(tags)
        .with_tls_skip_verify(self.ingest_exporter_tls_skip_verify);

        if let Some(ca_file) = &self.ingest_exporter_tls_ca_file {
            config = config.with_ca_file(ca_file);
        }
        config.validate()?;

        Ok(config)
    }
}
