//! In-process photo library.
//!
//! Keeps albums, items and export artifacts in memory and counts the calls the
//! workflow makes, so runs can be replayed and inspected without a real
//! library. Failures can be scripted per item or per operation.

use anyhow::{Context, Result, anyhow, bail};
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
    sync::{Mutex, MutexGuard},
};
use uuid::Uuid;

use super::{Album, PhotoBackend, PhotoItem};
use crate::common::REBUILD_SUFFIX;

/// A file the library drops into the export directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Debug)]
struct StoredPhoto {
    item: PhotoItem,
    artifacts: Vec<ExportArtifact>,
}

#[derive(Debug)]
struct StoredAlbum {
    album: Album,
    members: Vec<String>,
}

#[derive(Debug, Default, Clone)]
pub struct CallLog {
    /// `list_members` calls per album name
    pub listings: HashMap<String, usize>,
    /// Size of every `remove_members` call, in order
    pub removals: Vec<usize>,
    /// Names of deleted albums, in order
    pub deleted: Vec<String>,
    pub exports: usize,
}

#[derive(Debug, Default)]
struct State {
    photos: HashMap<String, StoredPhoto>,
    albums: Vec<StoredAlbum>,
    calls: CallLog,
    failing_writes: HashSet<String>,
    listing_budget: Option<usize>,
    ignore_removals: bool,
    interrupt_rebuilds: bool,
}

impl State {
    fn stored_album(&self, album: &Album) -> Result<&StoredAlbum> {
        self.albums
            .iter()
            .find(|stored| stored.album.id == album.id)
            .ok_or_else(|| anyhow!("album {:?} does not exist", album.name))
    }

    fn stored_album_mut(&mut self, album: &Album) -> Result<&mut StoredAlbum> {
        self.albums
            .iter_mut()
            .find(|stored| stored.album.id == album.id)
            .ok_or_else(|| anyhow!("album {:?} does not exist", album.name))
    }
}

#[derive(Debug, Default)]
pub struct MemoryLibrary {
    state: Mutex<State>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory library lock poisoned"))
    }

    /// Register a photo whose export yields the given artifacts.
    pub fn insert_photo(
        &self,
        filename: &str,
        keywords: &[&str],
        artifacts: Vec<ExportArtifact>,
    ) -> Result<PhotoItem> {
        let item = PhotoItem::new(
            Uuid::new_v4().to_string(),
            filename,
            keywords.iter().map(|k| k.to_string()).collect(),
        );
        self.lock()?.photos.insert(
            item.id.clone(),
            StoredPhoto {
                item: item.clone(),
                artifacts,
            },
        );
        Ok(item)
    }

    pub fn photo(&self, id: &str) -> Result<PhotoItem> {
        let state = self.lock()?;
        let stored = state
            .photos
            .get(id)
            .ok_or_else(|| anyhow!("photo {id} does not exist"))?;
        Ok(stored.item.clone())
    }

    /// Member ids of the album with this name, empty when it does not exist.
    pub fn member_ids(&self, name: &str) -> Result<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .albums
            .iter()
            .find(|stored| stored.album.name == name)
            .map(|stored| stored.members.clone())
            .unwrap_or_default())
    }

    pub fn album_names(&self) -> Result<Vec<String>> {
        let state = self.lock()?;
        Ok(state
            .albums
            .iter()
            .map(|stored| stored.album.name.clone())
            .collect())
    }

    pub fn calls(&self) -> Result<CallLog> {
        Ok(self.lock()?.calls.clone())
    }

    pub fn fail_keyword_write(&self, id: &str) -> Result<()> {
        self.lock()?.failing_writes.insert(id.to_string());
        Ok(())
    }

    /// Allow `budget` more `list_members` calls, then behave as unreachable.
    /// `None` lifts the limit.
    pub fn set_listing_budget(&self, budget: Option<usize>) -> Result<()> {
        self.lock()?.listing_budget = budget;
        Ok(())
    }

    /// Accept `remove_members` calls without removing anything.
    pub fn set_ignore_removals(&self, ignore: bool) -> Result<()> {
        self.lock()?.ignore_removals = ignore;
        Ok(())
    }

    /// Make `remove_members` stop like a rebuild killed after the original
    /// album was deleted: the kept members are left in the pending
    /// `<name> (rebuilding)` album and the call fails.
    pub fn set_interrupt_rebuilds(&self, interrupt: bool) -> Result<()> {
        self.lock()?.interrupt_rebuilds = interrupt;
        Ok(())
    }
}

impl PhotoBackend for MemoryLibrary {
    fn album(&self, name: &str) -> Result<Option<Album>> {
        let state = self.lock()?;
        Ok(state
            .albums
            .iter()
            .find(|stored| stored.album.name == name)
            .map(|stored| stored.album.clone()))
    }

    fn albums_with_prefix(&self, prefix: &str) -> Result<Vec<Album>> {
        let state = self.lock()?;
        Ok(state
            .albums
            .iter()
            .filter(|stored| stored.album.name.starts_with(prefix))
            .map(|stored| stored.album.clone())
            .collect())
    }

    fn create_album(&self, name: &str) -> Result<Album> {
        let album = Album {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
        };
        self.lock()?.albums.push(StoredAlbum {
            album: album.clone(),
            members: Vec::new(),
        });
        Ok(album)
    }

    fn delete_album(&self, album: &Album) -> Result<()> {
        let mut state = self.lock()?;
        let before = state.albums.len();
        state.albums.retain(|stored| stored.album.id != album.id);
        if state.albums.len() == before {
            bail!("album {:?} does not exist", album.name);
        }
        state.calls.deleted.push(album.name.clone());
        Ok(())
    }

    fn list_members(&self, album: &Album) -> Result<Vec<PhotoItem>> {
        let mut state = self.lock()?;
        if let Some(budget) = state.listing_budget {
            if budget == 0 {
                bail!("photo library is not reachable");
            }
            state.listing_budget = Some(budget - 1);
        }
        *state.calls.listings.entry(album.name.clone()).or_default() += 1;

        let members = state.stored_album(album)?.members.clone();
        members
            .iter()
            .map(|id| {
                state
                    .photos
                    .get(id)
                    .map(|stored| stored.item.clone())
                    .ok_or_else(|| anyhow!("photo {id} does not exist"))
            })
            .collect()
    }

    fn add_members(&self, album: &Album, ids: &[String]) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(missing) = ids.iter().find(|id| !state.photos.contains_key(*id)) {
            bail!("photo {missing} does not exist");
        }
        let stored = state.stored_album_mut(album)?;
        for id in ids {
            // Adding a member twice is a no-op, as in real libraries.
            if !stored.members.contains(id) {
                stored.members.push(id.clone());
            }
        }
        Ok(())
    }

    fn remove_members(&self, album: &Album, ids: &[String]) -> Result<Album> {
        let mut state = self.lock()?;
        state.calls.removals.push(ids.len());
        if state.interrupt_rebuilds {
            let stored = state.stored_album_mut(album)?;
            stored.members.retain(|id| !ids.contains(id));
            stored.album = Album {
                id: Uuid::new_v4().to_string(),
                name: format!("{}{}", album.name, REBUILD_SUFFIX),
            };
            bail!("rebuild of {:?} was interrupted", album.name);
        }
        if !state.ignore_removals {
            let stored = state.stored_album_mut(album)?;
            stored.members.retain(|id| !ids.contains(id));
        }
        Ok(album.clone())
    }

    fn export_media(&self, item: &PhotoItem, dir: &Path) -> Result<()> {
        let mut state = self.lock()?;
        state.calls.exports += 1;
        let stored = state
            .photos
            .get(&item.id)
            .ok_or_else(|| anyhow!("photo {} does not exist", item.id))?;
        for artifact in &stored.artifacts {
            let target = dir.join(&artifact.filename);
            fs::write(&target, &artifact.bytes)
                .context(format!("failed to write export artifact {:?}", target))?;
        }
        Ok(())
    }

    fn write_keywords(&self, id: &str, keywords: &[String]) -> Result<()> {
        let mut state = self.lock()?;
        if state.failing_writes.contains(id) {
            bail!("keyword write rejected for photo {id}");
        }
        let stored = state
            .photos
            .get_mut(id)
            .ok_or_else(|| anyhow!("photo {id} does not exist"))?;
        stored.item.keywords = keywords.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_round_trips_through_albums() {
        let library = MemoryLibrary::new();
        let a = library.insert_photo("a.jpg", &[], vec![]).unwrap();
        let b = library.insert_photo("b.jpg", &[], vec![]).unwrap();
        let album = library.open_or_create_album("staging").unwrap();

        library
            .add_members(&album, &[a.id.clone(), b.id.clone(), a.id.clone()])
            .unwrap();
        assert_eq!(library.member_ids("staging").unwrap(), vec![a.id.clone(), b.id.clone()]);

        library.remove_members(&album, &[a.id.clone()]).unwrap();
        let members = library.list_members(&album).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, b.id);
        assert_eq!(library.calls().unwrap().removals, vec![1]);
    }

    #[test]
    fn open_or_create_reuses_existing_albums() {
        let library = MemoryLibrary::new();
        let first = library.open_or_create_album("done").unwrap();
        let second = library.open_or_create_album("done").unwrap();
        assert_eq!(first, second);
        assert_eq!(library.album_names().unwrap(), vec!["done".to_string()]);
    }

    #[test]
    fn interrupted_rebuild_leaves_kept_members_in_the_pending_album() {
        let library = MemoryLibrary::new();
        let a = library.insert_photo("a.jpg", &[], vec![]).unwrap();
        let b = library.insert_photo("b.jpg", &[], vec![]).unwrap();
        let album = library.create_album("staging #0").unwrap();
        library.add_members(&album, &[a.id.clone(), b.id.clone()]).unwrap();

        library.set_interrupt_rebuilds(true).unwrap();
        assert!(library.remove_members(&album, &[a.id.clone()]).is_err());
        assert!(library.album("staging #0").unwrap().is_none());
        assert_eq!(library.member_ids("staging #0 (rebuilding)").unwrap(), vec![b.id]);
    }

    #[test]
    fn listing_budget_simulates_an_unreachable_library() {
        let library = MemoryLibrary::new();
        let album = library.create_album("staging").unwrap();
        library.set_listing_budget(Some(1)).unwrap();
        assert!(library.list_members(&album).is_ok());
        assert!(library.list_members(&album).is_err());
        library.set_listing_budget(None).unwrap();
        assert!(library.list_members(&album).is_ok());
    }
}
