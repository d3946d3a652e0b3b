// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;
use tokio::select;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{debug, info, warn};

use crate::crypto::init_crypto_provider;
use crate::exporters::ingest::HttpDispatcher;
use crate::init::args::AgentRun;
use crate::init::wait;
use crate::receivers::file::FileReceiver;

pub struct Agent {
    config: Box<AgentRun>,
    host: String,
}

impl Agent {
    pub fn new(config: Box<AgentRun>) -> Self {
        let host = gethostname::gethostname().to_string_lossy().into_owned();
        Self { config, host }
    }

    /// Override the host name reported when none was configured.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub async fn run(self, agent_cancel: CancellationToken) -> Result<(), BoxError> {
        let config = self.config;

        // Initialize the TLS library before any client is built
        init_crypto_provider()?;

        let cwd = std::env::current_dir()?;
        let receiver_config = config.file_receiver.build_config(&cwd)?;
        let exporter_config = config.ingest_exporter.build_config(&self.host, &cwd)?;

        info!(
            endpoint = exporter_config.endpoint(),
            files = receiver_config.files.len(),
            state_path = ?receiver_config.state_path,
            "Starting ratchet agent."
        );

        let dispatcher = HttpDispatcher::new(exporter_config)?;

        let mut receivers_task_set = JoinSet::new();
        let receivers_cancel = CancellationToken::new();

        FileReceiver::new(receiver_config, dispatcher)?
            .start(&mut receivers_task_set, &receivers_cancel)
            .await?;

        let mut result = Ok(());
        select! {
            _ = agent_cancel.cancelled() => {
                debug!("Agent cancellation signaled.");
            },
            e = wait::wait_for_any_task(&mut receivers_task_set) => {
                match e {
                    Ok(()) => warn!("Unexpected early exit of receiver."),
                    Err(e) => result = Err(e),
                }
            },
        }
        result?;

        // The scanner stops between paths, a path already started is read,
        // dispatched and stored before it exits
        receivers_cancel.cancel();

        let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
        let res = wait::wait_for_tasks_with_timeout(&mut receivers_task_set, shutdown_timeout).await;
        if let Err(e) = res {
            if receivers_task_set.is_empty() {
                return Err(e);
            }
            warn!(
                timeout = ?shutdown_timeout,
                "Receiver still dispatching after the shutdown timeout, waiting for it to finish."
            );
            wait::wait_for_tasks(&mut receivers_task_set).await?;
        }

        info!("Ratchet agent stopped.");
        Ok(())
    }
}
