pub mod errors;

pub const DEFAULT_BATCH_SIZE: usize = 10;

pub const DEFAULT_WORK_UNIT_CAPACITY: usize = 99;

pub const DEFAULT_RESAMPLE_WIDTH: u32 = 672;

pub const DEFAULT_KEYWORD_MARKER: &str = " (AI)";

pub const MAX_DELETE_ATTEMPTS: u64 = 5;

/// Separator between the intake album name and the work unit generation index.
pub const WORK_UNIT_SEPARATOR: &str = " #";

/// Suffix of the temporary album a work unit is rebuilt into while items are
/// removed from it.
pub const REBUILD_SUFFIX: &str = " (rebuilding)";

/// Directory created inside the configured scratch path. Only this directory
/// is ever emptied or removed.
pub const SCRATCH_SUBDIR: &str = "photo-ai-keywords-export";

pub const VALID_VIDEO_EXTENSIONS: &[&str] = &[
    "gif", "mp4", "webm", "mkv", "mov", "avi", "flv", "wmv", "mpeg", "m4v", "3gp",
];

pub const IMAGE_PROMPT: &str =
    "Please find ten very precise keywords and separate them with commas.";

/// Builds the translation instruction for a target language.
pub fn translate_prompt(language: &str) -> String {
    format!(
        "Please translate the word list to {language} and separate them with commas. \
         Response strictly with the list, without any other explanations or comments."
    )
}
