// SPDX-License-Identifier: Apache-2.0

//! File receiver implementation.
//!
//! Wraps the [`Scanner`] in a task that lives on the agent's task set and
//! stops when the receivers' cancellation token fires.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{error, info};

use crate::receivers::file::config::FileReceiverConfig;
use crate::receivers::file::persistence::PositionStore;
use crate::receivers::file::scanner::{EventSink, Scanner};

pub struct FileReceiver<S> {
    scanner: Scanner<S>,
}

impl<S: EventSink> FileReceiver<S> {
    /// Create a new file receiver
    pub fn new(config: FileReceiverConfig, sink: S) -> Result<Self, BoxError> {
        let state_path = config.state_path.clone();
        let scanner = Scanner::new(config, sink)?;

        // A store that cannot be opened now is retried at the start of every
        // pass, so this is not fatal
        let scanner = match PositionStore::open(&state_path) {
            Ok(store) => {
                info!(
                    path = ?state_path,
                    files = store.len(),
                    "Loaded file positions"
                );
                scanner.with_store(store)
            }
            Err(e) => {
                error!(
                    path = ?state_path,
                    error = %e,
                    "Failed to open position store, scans are skipped until it can be read"
                );
                scanner
            }
        };

        Ok(Self { scanner })
    }

    /// Start the file receiver
    pub async fn start(
        self,
        task_set: &mut JoinSet<Result<(), BoxError>>,
        receivers_cancel: &CancellationToken,
    ) -> Result<(), BoxError> {
        let cancel = receivers_cancel.clone();
        task_set.spawn(self.scanner.run(cancel));
        Ok(())
    }
}
