use regex::Regex;
use std::sync::LazyLock;

static LEADING_ORDINAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\d+\.\s*").unwrap());

/// Split a model reply on commas, dropping leading ordinals such as `1. `
/// and items that are blank once cleaned.
pub fn parse_keywords(reply: &str) -> Vec<String> {
    reply
        .split(',')
        .map(|raw| clean_keyword(&LEADING_ORDINAL.replace(raw, "")))
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

/// Trim whitespace, dots and dashes around a generated keyword.
pub fn clean_keyword(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '.' || c == '-')
        .to_string()
}

/// Keep human keywords in order, replace every keyword carrying `marker`
/// with the freshly generated ones.
pub fn merge_keywords(existing: &[String], generated: &[String], marker: &str) -> Vec<String> {
    let mut merged: Vec<String> = existing
        .iter()
        .filter(|keyword| !keyword.contains(marker))
        .cloned()
        .collect();

    for raw in generated {
        let cleaned = clean_keyword(raw);
        if cleaned.is_empty() {
            continue;
        }
        let keyword = format!("{cleaned}{marker}");
        if !merged.contains(&keyword) {
            merged.push(keyword);
        }
    }
    merged
}
