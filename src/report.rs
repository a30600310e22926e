//! Per-repository progress lines
//!
//! The `[OK]`, `[UPDATE]`, `[DRY-RUN]`, `[SKIP]` and `[FAIL]` lines go to
//! stdout by default. Any writer can stand in for it.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Shared destination for progress lines
#[derive(Clone)]
pub struct Report {
    out: Arc<Mutex<dyn Write + Send>>,
}

impl Report {
    pub fn stdout() -> Self {
        Self {
            out: Arc::new(Mutex::new(io::stdout())),
        }
    }

    /// Write lines into a writer the caller keeps a handle to
    pub fn shared(out: Arc<Mutex<dyn Write + Send>>) -> Self {
        Self { out }
    }

    /// Write one line
    pub fn line(&self, args: fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{}", args) {
            warn!("Failed to write progress line: {}", e);
        }
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report").finish_non_exhaustive()
    }
}
