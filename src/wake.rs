//! Keeps the machine awake while a long request is in flight.
//!
//! A wake lock is optional: when the platform inhibitor cannot be started the
//! request goes ahead without it. The returned guard releases the lock when
//! dropped, whatever path the request took.

use crate::config::WakeLockCommand;
use std::process::{Child, Command, Stdio};

pub trait WakeLock {
    /// Try to acquire the lock; `None` when unavailable.
    fn acquire(&self) -> Option<WakeLockGuard>;
}

/// Held while the lock is active
pub struct WakeLockGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl WakeLockGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

/// No-op lock for platforms without an inhibitor
pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn acquire(&self) -> Option<WakeLockGuard> {
        None
    }
}

/// Spawns an inhibitor process (e.g. `caffeinate -s`) and kills it on release
pub struct ProcessWakeLock {
    command: WakeLockCommand,
}

impl ProcessWakeLock {
    pub fn new(command: WakeLockCommand) -> Self {
        Self { command }
    }
}

impl WakeLock for ProcessWakeLock {
    fn acquire(&self) -> Option<WakeLockGuard> {
        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match child {
            Ok(child) => {
                log::info!(
                    "Wake lock acquired ({} pid: {})",
                    self.command.program,
                    child.id()
                );
                Some(WakeLockGuard::new(move || release_child(child)))
            }
            Err(e) => {
                log::info!("Wake lock not available ({}): {}", self.command.program, e);
                None
            }
        }
    }
}

fn release_child(mut child: Child) {
    log::info!("Releasing wake lock (pid: {})", child.id());
    if let Err(e) = child.kill() {
        log::warn!("Error releasing wake lock: {}", e);
    }
    let _ = child.wait();
}

/// Lock matching the configuration
pub fn from_config(command: Option<&WakeLockCommand>) -> Box<dyn WakeLock> {
    match command {
        Some(cmd) => Box::new(ProcessWakeLock::new(cmd.clone())),
        None => Box::new(NoWakeLock),
    }
}
