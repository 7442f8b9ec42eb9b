use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::MirrorError;

/// Shared flag raised by Ctrl+C and polled at safe points of a run.
#[derive(Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Create a flag and route SIGINT to it instead of terminating the process.
    /// A second Ctrl+C exits immediately with status 130.
    pub fn install() -> Self {
        let interrupt = Self::default();
        let flag = interrupt.0.clone();
        let handler = move || {
            if flag.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
        };
        if let Err(e) = ctrlc::set_handler(handler) {
            log::warn!("Could not install Ctrl+C handler: {}", e);
        }
        interrupt
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Report a failed step as `Interrupted` if Ctrl+C arrived meanwhile.
    ///
    /// SIGINT reaches git children too, so their failure is the signal, not a git error.
    pub fn settle<T>(&self, result: Result<T, MirrorError>) -> Result<T, MirrorError> {
        match result {
            Err(_) if self.is_set() => Err(MirrorError::Interrupted),
            other => other,
        }
    }

    /// `Err(Interrupted)` once the flag has been raised.
    pub fn check(&self) -> Result<(), MirrorError> {
        if self.is_set() {
            Err(MirrorError::Interrupted)
        } else {
            Ok(())
        }
    }
}
