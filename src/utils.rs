use std::path::Path;

use crate::common::VALID_VIDEO_EXTENSIONS;

pub trait PathExt {
    fn ext_lower(&self) -> String;

    /// True when the extension names a motion format (video, live photo companion).
    fn is_motion(&self) -> bool {
        VALID_VIDEO_EXTENSIONS.contains(&self.ext_lower().as_str())
    }
}

impl PathExt for Path {
    fn ext_lower(&self) -> String {
        self.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default()
    }
}
