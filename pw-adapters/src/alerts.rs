//! Alert sink implementations
//!
//! Sinks render short alert texts (log line, external speech command)

use anyhow::{bail, Result};
use pw_core::AlertSink;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Writes alerts to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn speak(&self, text: &str) {
        warn!(alert = text, "Alert");
    }
}

/// Runs an external program with the alert text as its last argument
///
/// e.g. `["powershell.exe", "-File", "saySomething.ps1"]` or
/// `["espeak"]`. The child is not waited on by the caller.
#[derive(Debug, Clone)]
pub struct CommandAlertSink {
    program: String,
    args: Vec<String>,
}

impl CommandAlertSink {
    pub fn new(argv: &[String]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            bail!("alert command is empty");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl AlertSink for CommandAlertSink {
    fn speak(&self, text: &str) {
        warn!(alert = text, "Alert");

        let spawned = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                // Reap in the background so finished children don't linger
                std::thread::spawn(move || {
                    if let Err(e) = child.wait() {
                        debug!("Alert command wait failed: {}", e);
                    }
                });
            }
            Err(e) => warn!("Failed to run alert command {}: {}", self.program, e),
        }
    }
}
