//! `codeclone` detects structural code duplication in Python source trees by
//! comparing the control-flow shape of functions rather than their text.
//!
//! The pipeline is: scan → parse (`ruff_python_parser`) → canonical
//! normalization → per-function CFG → fingerprint + block/segment windows →
//! clone groups → baseline diff → deterministic report and exit code.

pub mod baseline;
pub mod cache;
pub mod canonical_json;
pub mod cfg;
pub mod constants;
pub mod contracts;
pub mod entry_point;
pub mod errors;
pub mod extractor;
pub mod hashing;
pub mod normalize;
pub mod report;
pub mod scanner;
pub mod utils;

use std::sync::atomic::AtomicBool;
use std::sync::Once;

/// Set by the SIGINT handler; workers finish their current file and the
/// driver returns without writing the baseline or the cache.
pub static CANCELLED: AtomicBool = AtomicBool::new(false);

static HANDLER_INSTALLED: Once = Once::new();

#[cfg(unix)]
extern "C" fn handle_sigint(_signum: libc::c_int) {
    CANCELLED.store(true, std::sync::atomic::Ordering::Relaxed);
}

/// Install the process-wide SIGINT handler. Safe to call more than once.
pub fn install_interrupt_handler() {
    HANDLER_INSTALLED.call_once(|| {
        #[cfg(unix)]
        unsafe {
            libc::signal(libc::SIGINT, handle_sigint as libc::sighandler_t);
        }
    });
}
