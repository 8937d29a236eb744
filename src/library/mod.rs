//! Photo library backends.
//!
//! The workflow only talks to a library through [`PhotoBackend`]. Albums are
//! the sole durable state of a run, so every operation here is a blocking call
//! against the backend itself.

pub mod memory;
pub mod photos;

use anyhow::Result;
use std::path::Path;

use crate::utils::PathExt;

pub use memory::MemoryLibrary;
pub use photos::ApplePhotosLibrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify by file name, the only hint most libraries expose cheaply.
    pub fn from_filename(filename: &str) -> Self {
        if Path::new(filename).is_motion() {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoItem {
    pub id: String,
    pub filename: String,
    pub kind: MediaKind,
    pub keywords: Vec<String>,
}

impl PhotoItem {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, keywords: Vec<String>) -> Self {
        let filename = filename.into();
        Self {
            id: id.into(),
            kind: MediaKind::from_filename(&filename),
            filename,
            keywords,
        }
    }
}

/// Handle to an album. Backends that rebuild albums on removal hand out a
/// fresh handle from [`PhotoBackend::remove_members`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Album {
    pub id: String,
    pub name: String,
}

pub trait PhotoBackend {
    /// Album with exactly this name, if any.
    fn album(&self, name: &str) -> Result<Option<Album>>;

    /// Every album whose name starts with `prefix`.
    fn albums_with_prefix(&self, prefix: &str) -> Result<Vec<Album>>;

    fn create_album(&self, name: &str) -> Result<Album>;

    fn delete_album(&self, album: &Album) -> Result<()>;

    fn list_members(&self, album: &Album) -> Result<Vec<PhotoItem>>;

    fn add_members(&self, album: &Album, ids: &[String]) -> Result<()>;

    /// Remove `ids` from the album and return the handle to keep using.
    fn remove_members(&self, album: &Album, ids: &[String]) -> Result<Album>;

    /// Export the media of one item into `dir`.
    fn export_media(&self, item: &PhotoItem, dir: &Path) -> Result<()>;

    fn write_keywords(&self, id: &str, keywords: &[String]) -> Result<()>;

    fn open_or_create_album(&self, name: &str) -> Result<Album> {
        match self.album(name)? {
            Some(album) => Ok(album),
            None => self.create_album(name),
        }
    }
}
