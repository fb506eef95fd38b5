//! SIGINFO support. The signal only exists on the BSD family (ctrl-T);
//! elsewhere the handler compiles down to nothing.

use linkpatrol_jobs::CheckerLoop;
use std::sync::Arc;

#[cfg(any(
    target_os = "freebsd",
    target_os = "macos",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
pub fn spawn_siginfo_handler(checker: Arc<CheckerLoop>) {
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::warn;

    match signal(SignalKind::from_raw(libc::SIGINFO)) {
        Ok(mut siginfo) => {
            tokio::spawn(async move {
                while siginfo.recv().await.is_some() {
                    eprintln!("{}", checker.statistics_line());
                }
            });
        }
        Err(e) => warn!(error = %e, "Failed to install SIGINFO handler"),
    }
}

#[cfg(not(any(
    target_os = "freebsd",
    target_os = "macos",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
pub fn spawn_siginfo_handler(_checker: Arc<CheckerLoop>) {}
