//! macOS Photos backend driven through `osascript`.
//!
//! Every call runs one AppleScript program (fed on stdin) and parses its plain
//! text result. Photos has no "remove from album" verb, so removal copies the
//! remaining members into a pending album, deletes the original and gives the
//! copy the original name. Photos asks for confirmation when that rebuild
//! moves more than ~99 items, which is why work units stay below that size.

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info};
use path_clean::PathClean;
use std::{
    io::Write,
    path::Path,
    process::{Command, Stdio},
    time::Instant,
};

use super::{Album, PhotoBackend, PhotoItem};
use crate::common::REBUILD_SUFFIX;

const FIELD_SEPARATOR: char = '\t';
const KEYWORD_SEPARATOR: char = '\u{1f}';

const SCRIPT_HELPERS: &str = r#"
on joinList(theList, delim)
    set previousDelimiters to AppleScript's text item delimiters
    set AppleScript's text item delimiters to delim
    set joined to theList as text
    set AppleScript's text item delimiters to previousDelimiters
    return joined
end joinList
"#;

#[derive(Debug, Clone)]
pub struct ApplePhotosLibrary {
    program: String,
}

impl Default for ApplePhotosLibrary {
    fn default() -> Self {
        Self {
            program: "osascript".to_string(),
        }
    }
}

impl ApplePhotosLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `osascript` exists and Photos answers.
    pub fn check_available(&self) -> Result<()> {
        let version = self
            .run(r#"tell application "Photos" to return version"#)
            .context("Photos is not reachable through osascript")?;
        info!("Photos version: {}", version.trim());
        Ok(())
    }

    fn run(&self, script: &str) -> Result<String> {
        let start = Instant::now();
        let mut child = Command::new(&self.program)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context(format!("failed to spawn `{}`", self.program))?;

        child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("failed to open stdin of `{}`", self.program))?
            .write_all(script.as_bytes())
            .context("failed to send AppleScript program")?;

        let output = child
            .wait_with_output()
            .context(format!("failed to wait for `{}`", self.program))?;

        if !output.status.success() {
            bail!(
                "AppleScript failed with exit code {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        debug!(duration = &*format!("{:?}", start.elapsed()); "osascript finished");
        // osascript terminates its result with a newline.
        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.ends_with('\n') {
            stdout.pop();
        }
        Ok(stdout)
    }
}

// ────────────────────────────────────────────────────────────────
// Script building
// ────────────────────────────────────────────────────────────────

/// Quote a value as an AppleScript string literal.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quote_list<S: AsRef<str>>(values: &[S]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v.as_ref())).collect();
    format!("{{{}}}", quoted.join(", "))
}

fn media_item_list(ids: &[String]) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|id| format!("media item id {}", quote(id)))
        .collect();
    format!("{{{}}}", items.join(", "))
}

fn list_albums_script(exact_name: Option<&str>, prefix: &str) -> String {
    let condition = match exact_name {
        Some(name) => format!("albumName is {}", quote(name)),
        None => format!("albumName starts with {}", quote(prefix)),
    };
    format!(
        r#"{SCRIPT_HELPERS}
tell application "Photos"
    set output to {{}}
    repeat with anAlbum in albums
        set albumName to name of anAlbum
        if {condition} then
            set end of output to (id of anAlbum) & tab & albumName
        end if
    end repeat
end tell
return my joinList(output, linefeed)
"#
    )
}

fn list_members_script(album_id: &str) -> String {
    format!(
        r#"{SCRIPT_HELPERS}
tell application "Photos"
    set output to {{}}
    repeat with anItem in (media items of album id {album})
        set itemKeywords to keywords of anItem
        if itemKeywords is missing value then set itemKeywords to {{}}
        set end of output to (id of anItem) & tab & (filename of anItem) & tab & my joinList(itemKeywords, character id 31)
    end repeat
end tell
return my joinList(output, linefeed)
"#,
        album = quote(album_id)
    )
}

/// Rebuild `album` without `ids`. The kept items are copied into a pending
/// album first and the original is deleted only once the copy is complete, so
/// an interruption leaves every kept item in the original or in the pending
/// album (see `workflow::recover`).
fn rebuild_without_script(album: &Album, ids: &[String]) -> String {
    format!(
        r#"tell application "Photos"
    set oldAlbum to album id {album_id}
    set removeIds to {remove_ids}
    set keepItems to {{}}
    repeat with anItem in (media items of oldAlbum)
        if removeIds does not contain (id of anItem) then set end of keepItems to contents of anItem
    end repeat
    set newAlbum to make new album named {pending_name}
    if (count of keepItems) > 0 then add keepItems to newAlbum
    delete oldAlbum
    set name of newAlbum to {album_name}
    return id of newAlbum
end tell
"#,
        album_id = quote(&album.id),
        remove_ids = quote_list(ids),
        pending_name = quote(&format!("{}{}", album.name, REBUILD_SUFFIX)),
        album_name = quote(&album.name),
    )
}

// ────────────────────────────────────────────────────────────────
// Output parsing
// ────────────────────────────────────────────────────────────────

pub fn parse_albums(output: &str) -> Result<Vec<Album>> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (id, name) = line
                .split_once(FIELD_SEPARATOR)
                .ok_or_else(|| anyhow!("malformed album line: {line:?}"))?;
            Ok(Album {
                id: id.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

pub fn parse_members(output: &str) -> Result<Vec<PhotoItem>> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut fields = line.splitn(3, FIELD_SEPARATOR);
            let (Some(id), Some(filename)) = (fields.next(), fields.next()) else {
                bail!("malformed media item line: {line:?}");
            };
            let keywords = fields
                .next()
                .unwrap_or_default()
                .split(KEYWORD_SEPARATOR)
                .filter(|keyword| !keyword.is_empty())
                .map(str::to_string)
                .collect();
            Ok(PhotoItem::new(id, filename, keywords))
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────
// PhotoBackend
// ────────────────────────────────────────────────────────────────

impl PhotoBackend for ApplePhotosLibrary {
    fn album(&self, name: &str) -> Result<Option<Album>> {
        let output = self
            .run(&list_albums_script(Some(name), ""))
            .context(format!("failed to look up album {name:?}"))?;
        Ok(parse_albums(&output)?.into_iter().next())
    }

    fn albums_with_prefix(&self, prefix: &str) -> Result<Vec<Album>> {
        let output = self
            .run(&list_albums_script(None, prefix))
            .context(format!("failed to enumerate albums starting with {prefix:?}"))?;
        parse_albums(&output)
    }

    fn create_album(&self, name: &str) -> Result<Album> {
        let script = format!(
            "tell application \"Photos\" to return id of (make new album named {})",
            quote(name)
        );
        let id = self
            .run(&script)
            .context(format!("failed to create album {name:?}"))?;
        info!("Created album {name:?}");
        Ok(Album {
            id: id.trim().to_string(),
            name: name.to_string(),
        })
    }

    fn delete_album(&self, album: &Album) -> Result<()> {
        let script = format!(
            "tell application \"Photos\" to delete album id {}",
            quote(&album.id)
        );
        self.run(&script)
            .context(format!("failed to delete album {:?}", album.name))?;
        Ok(())
    }

    fn list_members(&self, album: &Album) -> Result<Vec<PhotoItem>> {
        let output = self
            .run(&list_members_script(&album.id))
            .context(format!("failed to list media items of {:?}", album.name))?;
        parse_members(&output)
    }

    fn add_members(&self, album: &Album, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let script = format!(
            "tell application \"Photos\" to add {} to album id {}",
            media_item_list(ids),
            quote(&album.id)
        );
        self.run(&script)
            .context(format!("failed to add {} items to {:?}", ids.len(), album.name))?;
        Ok(())
    }

    fn remove_members(&self, album: &Album, ids: &[String]) -> Result<Album> {
        if ids.is_empty() {
            return Ok(album.clone());
        }
        let id = self
            .run(&rebuild_without_script(album, ids))
            .context(format!(
                "failed to remove {} items from {:?}",
                ids.len(),
                album.name
            ))?;
        Ok(Album {
            id: id.trim().to_string(),
            name: album.name.clone(),
        })
    }

    fn export_media(&self, item: &PhotoItem, dir: &Path) -> Result<()> {
        let absolute = std::path::absolute(dir)
            .context(format!("failed to resolve export directory {:?}", dir))?
            .clean();
        let script = format!(
            "tell application \"Photos\" to export {} to (POSIX file {} as alias)",
            media_item_list(std::slice::from_ref(&item.id)),
            quote(&absolute.to_string_lossy())
        );
        self.run(&script)
            .context(format!("failed to export {:?}", item.filename))?;
        Ok(())
    }

    fn write_keywords(&self, id: &str, keywords: &[String]) -> Result<()> {
        let script = format!(
            "tell application \"Photos\" to set keywords of media item id {} to {}",
            quote(id),
            quote_list(keywords)
        );
        self.run(&script)
            .context(format!("failed to write keywords of {id}"))?;
        Ok(())
    }
}
