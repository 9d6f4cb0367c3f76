//! Classification of failures caused by the host tearing the agent down.
//!
//! When the hosting page or runtime unloads the agent mid-run, in-flight requests fail
//! with messages that look like network errors. Those runs have an unknown outcome, not
//! a failed one, so callers must not report them as collection failures.

use regex::Regex;
use std::sync::OnceLock;

/// Returns true if an error message indicates the hosting context went away.
#[must_use]
pub fn is_host_teardown(message: &str) -> bool {
    static TEARDOWN_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TEARDOWN_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)(extension context invalidated",
            r"|context (was )?destroyed",
            r"|receiving end does not exist",
            r"|message port closed",
            r"|dispatch task is gone",
            r"|runtime (was )?(dropped|shut ?down)",
            r"|operation was (canceled|cancelled|aborted))",
        ))
        .expect("valid regex")
    });

    regex.is_match(message)
}
