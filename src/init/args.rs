// SPDX-License-Identifier: Apache-2.0

use clap::Args;

use crate::init::file_receiver::FileReceiverArgs;
use crate::init::ingest_exporter::IngestExporterArgs;

#[derive(Debug, Args, Clone)]
pub struct AgentRun {
    #[command(flatten)]
    pub file_receiver: FileReceiverArgs,

    #[command(flatten)]
    pub ingest_exporter: IngestExporterArgs,

    /// Seconds to wait for an in-flight scan pass to finish on shutdown
    #[arg(long, env = "RATCHET_SHUTDOWN_TIMEOUT_SECS", default_value = "5")]
    pub shutdown_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        run: AgentRun,
    }

    #[test]
    fn test_agent_run_combines_groups() {
        let cli = TestCli::try_parse_from([
            "test",
            "--access-token",
            "abc",
            "--file",
            "/var/log/app.log",
            "--shutdown-timeout-secs",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.run.shutdown_timeout_secs, 2);
        assert_eq!(cli.run.ingest_exporter.ingest_exporter_access_token, "abc");
        assert_eq!(
            cli.run.file_receiver.file_receiver_files,
            vec![PathBuf::from("/var/log/app.log")]
        );
    }
}
