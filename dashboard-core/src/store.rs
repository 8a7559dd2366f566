//! Favorites and current location, persisted as two JSON records.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::model::{FavoritesSet, Location};

const FAVORITES_FILE: &str = "favorites.json";
const CURRENT_FILE: &str = "current_location.json";

#[derive(Debug)]
pub struct LocationStore {
    dir: PathBuf,
    favorites: FavoritesSet,
    current: Option<Location>,
}

impl LocationStore {
    /// Open the store in `dir`, restoring whatever was persisted there.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let (favorites, current) = Self::load(&dir);
        Self { dir, favorites, current }
    }

    /// Read persisted state. Absent or corrupt records yield empty state.
    pub fn load(dir: &Path) -> (FavoritesSet, Option<Location>) {
        let favorites = read_record::<FavoritesSet>(&dir.join(FAVORITES_FILE)).unwrap_or_default();
        let current = read_record::<Option<Location>>(&dir.join(CURRENT_FILE)).flatten();

        debug!(
            favorites = favorites.len(),
            has_current = current.is_some(),
            "Loaded location store"
        );
        (favorites, current)
    }

    pub fn favorites(&self) -> &FavoritesSet {
        &self.favorites
    }

    pub fn current(&self) -> Option<&Location> {
        self.current.as_ref()
    }

    /// Insert a favorite by id; a duplicate is a no-op. Returns whether it was added.
    pub fn add_favorite(&mut self, location: Location) -> Result<bool> {
        let location = location.with_favorite(true);

        if let Some(current) = self.current.as_mut().filter(|c| c.id == location.id) {
            current.is_favorite = true;
        }
        let added = self.favorites.insert(location);

        self.persist()?;
        Ok(added)
    }

    /// Remove a favorite by id; unknown ids are a no-op. Returns whether one was removed.
    pub fn remove_favorite(&mut self, id: &str) -> Result<bool> {
        if let Some(current) = self.current.as_mut().filter(|c| c.id == id) {
            current.is_favorite = false;
        }
        let removed = self.favorites.remove(id).is_some();

        self.persist()?;
        Ok(removed)
    }

    /// Flip favorite membership of the current location. `Ok(None)` without one.
    ///
    /// The in-memory change stands even when the write fails.
    pub fn toggle_current_favorite(&mut self) -> Result<Option<bool>> {
        let Some(current) = self.current.clone() else {
            return Ok(None);
        };

        if self.favorites.contains_id(&current.id) {
            self.remove_favorite(&current.id)?;
        } else {
            self.add_favorite(current)?;
        }
        Ok(self.current.as_ref().map(|c| c.is_favorite))
    }

    pub fn set_current(&mut self, location: Location) -> Result<()> {
        self.current = Some(location);
        self.persist()
    }

    /// Write both records. Last writer wins.
    pub fn persist(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory: {}", self.dir.display()))?;

        write_record(&self.dir.join(FAVORITES_FILE), &self.favorites)?;
        write_record(&self.dir.join(CURRENT_FILE), &self.current)?;
        Ok(())
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read saved locations");
            return None;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring corrupt saved locations");
            None
        }
    }
}

fn write_record<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize locations")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
