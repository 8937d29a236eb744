use log::{error, info};
use std::process::Command;

// ────────────────────────────────────────────────────────────────
// osascript Check
// ────────────────────────────────────────────────────────────────

/// Check that the AppleScript runner is available in PATH.
pub fn check_osascript() -> bool {
    // `osascript` has no version flag; an empty program is the cheapest probe.
    match Command::new("osascript").args(["-e", "return"]).output() {
        Ok(output) if output.status.success() => {
            info!("osascript is available");
            true
        }
        Ok(_) => {
            error!(
                "`osascript` was found, but it returned an error. Please ensure Photos automation is allowed for this terminal."
            );
            false
        }
        Err(_) => {
            error!(
                "`osascript` is not available in PATH. The Photos library can only be driven on macOS."
            );
            false
        }
    }
}
