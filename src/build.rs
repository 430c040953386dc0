//! Build command execution with a timeout and shell-safety flag.

use log::{debug, warn};
use parking_lot::Mutex;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::BuildSettings;
use crate::error::SizeGateError;
use crate::fmt;

/// Poll interval while waiting for the build to finish
const WAIT_POLL: Duration = Duration::from_millis(100);

/// Runs the configured build command before measurement
pub struct BuildRunner {
    settings: BuildSettings,
}

impl BuildRunner {
    /// Create a runner for the configured build settings
    pub fn new(settings: BuildSettings) -> Self {
        Self { settings }
    }

    /// Run the build command in `project_root`.
    ///
    /// With `shell` enabled the command string runs under `sh -c`;
    /// otherwise it is split on whitespace and executed directly. The child
    /// is killed once the timeout lapses.
    pub fn run(&self, project_root: &std::path::Path) -> Result<(), SizeGateError> {
        let Some(command) = self.settings.command.as_deref() else {
            debug!("No build command configured, measuring existing output");
            return Ok(());
        };
        if command.trim().is_empty() {
            warn!("Build command is empty, measuring existing output");
            return Ok(());
        }

        let (program, args) = if self.settings.shell {
            ("sh".to_string(), vec!["-c".to_string(), command.to_string()])
        } else {
            let mut parts = command.split_whitespace().map(str::to_string);
            let program = parts.next().unwrap_or_default();
            (program, parts.collect())
        };

        if which::which(&program).is_err() {
            return Err(SizeGateError::ToolMissing { tool: program });
        }

        println!("{} Running build: {}", fmt::HAMMER, command);

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(project_root)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SizeGateError::Io {
                context: format!("spawning {}", command),
                source,
            })?;

        // Drain stderr on a helper thread so a chatty build cannot fill the
        // pipe and stall itself.
        let stderr_buf = Arc::new(Mutex::new(String::new()));
        let reader = child.stderr.take().map(|mut pipe| {
            let buf = Arc::clone(&stderr_buf);
            std::thread::spawn(move || {
                let mut contents = String::new();
                let _ = pipe.read_to_string(&mut contents);
                *buf.lock() = contents;
            })
        });

        let deadline = Instant::now() + Duration::from_secs(self.settings.timeout_secs);
        let status = loop {
            match child.try_wait().map_err(|source| SizeGateError::Io {
                context: format!("waiting for {}", command),
                source,
            })? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SizeGateError::BuildTimeout {
                        command: command.to_string(),
                        timeout_secs: self.settings.timeout_secs,
                    });
                }
                None => std::thread::sleep(WAIT_POLL),
            }
        };

        if let Some(handle) = reader {
            let _ = handle.join();
        }

        if !status.success() {
            return Err(SizeGateError::BuildFailed {
                command: command.to_string(),
                stderr: stderr_buf.lock().clone(),
            });
        }

        Ok(())
    }
}
