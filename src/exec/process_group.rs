// src/exec/process_group.rs

//! Signalling a runner together with every process it started.
//!
//! The runner is spawned as the leader of its own process group, so one
//! `killpg` reaches the runner and all of its descendants.

#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;
use tracing::debug;

/// Handle to the process group led by a spawned runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGroup {
    pgid: u32,
}

impl ProcessGroup {
    /// Group led by the child with `pid` (spawned with `process_group(0)`).
    pub fn led_by(pid: u32) -> Self {
        Self { pgid: pid }
    }

    pub fn id(&self) -> u32 {
        self.pgid
    }

    /// Ask every process in the group to exit (SIGTERM).
    pub fn terminate(&self) -> anyhow::Result<()> {
        self.signal_all(GroupSignal::Terminate)
    }

    /// Kill every process in the group (SIGKILL).
    pub fn kill(&self) -> anyhow::Result<()> {
        self.signal_all(GroupSignal::Kill)
    }

    #[cfg(unix)]
    fn signal_all(&self, signal: GroupSignal) -> anyhow::Result<()> {
        use anyhow::Context;

        let sig = match signal {
            GroupSignal::Terminate => Signal::SIGTERM,
            GroupSignal::Kill => Signal::SIGKILL,
        };
        let pgid = i32::try_from(self.pgid).context("process group id out of range")?;
        match killpg(Pid::from_raw(pgid), sig) {
            Ok(()) => {
                debug!(pgid, ?sig, "signalled runner process group");
                Ok(())
            }
            // Nothing left in the group.
            Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("{sig:?} failed for process group {pgid}")),
        }
    }

    #[cfg(not(unix))]
    fn signal_all(&self, signal: GroupSignal) -> anyhow::Result<()> {
        debug!(pgid = self.pgid, ?signal, "process groups are not supported on this platform");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::process::Command;

    #[tokio::test]
    async fn terminate_reaches_grandchildren() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("sleep 30 & wait")
            .process_group(0)
            .spawn()
            .unwrap();
        let group = ProcessGroup::led_by(child.id().unwrap());

        group.terminate().unwrap();
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("runner should exit after SIGTERM")
            .unwrap();
        assert!(!status.success());

        // The whole group is gone, so signalling again is a no-op.
        tokio::time::sleep(Duration::from_millis(50)).await;
        group.kill().unwrap();
    }
}
