use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{TridentWorld, World};
use crate::error::ServerError;
use crate::event_bus::EventBus;
use crate::opts::WorldCreateSpec;
use crate::persistence;

/// The loaded worlds of one server, each in `<root>/<name>/`.
///
/// World names are unique: creating or loading a name holds that name's map
/// entry until the world is fully built, so two callers can never end up with
/// two instances of the same world.
pub struct WorldManager {
    root: PathBuf,
    worlds: DashMap<String, Arc<TridentWorld>>,
    events: Arc<EventBus>,
}

impl WorldManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_events(root, Arc::new(EventBus::new()))
    }

    pub fn with_events(root: impl Into<PathBuf>, events: Arc<EventBus>) -> Self {
        Self {
            root: root.into(),
            worlds: DashMap::new(),
            events,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn world_dir(&self, name: &str) -> Result<PathBuf, ServerError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(ServerError::invalid(format!("bad world name '{name}'")));
        }
        Ok(self.root.join(name))
    }

    /// Create a new world from `spec` and write it to disk.
    ///
    /// Fails with [`ServerError::WorldExists`] if the name is loaded or its
    /// directory already holds a world.
    pub fn create_world(
        &self,
        name: &str,
        spec: &WorldCreateSpec,
    ) -> Result<Arc<TridentWorld>, ServerError> {
        let dir = self.world_dir(name)?;
        match self.worlds.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ServerError::WorldExists(name.to_string())),
            Entry::Vacant(slot) => {
                if persistence::level_exists(&dir) {
                    return Err(ServerError::WorldExists(name.to_string()));
                }
                let world = Arc::new(TridentWorld::create(name, dir, spec, Arc::clone(&self.events))?);
                world.save()?;
                slot.insert(Arc::clone(&world));
                Ok(world)
            }
        }
    }

    /// Open a world saved under the root. Returns the loaded instance if it
    /// is already open.
    pub fn load_world(&self, name: &str) -> Result<Arc<TridentWorld>, ServerError> {
        let dir = self.world_dir(name)?;
        match self.worlds.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(slot) => {
                if !persistence::level_exists(&dir) {
                    return Err(ServerError::UnknownWorld(name.to_string()));
                }
                let world = Arc::new(TridentWorld::open(name, dir, Arc::clone(&self.events))?);
                slot.insert(Arc::clone(&world));
                Ok(world)
            }
        }
    }

    /// Load `name` if it exists on disk, otherwise create it from `spec`.
    pub fn load_or_create(
        &self,
        name: &str,
        spec: &WorldCreateSpec,
    ) -> Result<Arc<TridentWorld>, ServerError> {
        if let Some(world) = self.get(name) {
            return Ok(world);
        }
        match self.load_world(name) {
            Err(ServerError::UnknownWorld(_)) => match self.create_world(name, spec) {
                // Lost a race with another creator; theirs is as good as ours.
                Err(ServerError::WorldExists(_)) => self.load_world(name),
                other => other,
            },
            other => other,
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<TridentWorld>> {
        self.worlds.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of the loaded worlds, by name.
    pub fn worlds(&self) -> Vec<Arc<TridentWorld>> {
        let mut worlds: Vec<_> = self.worlds.iter().map(|e| Arc::clone(e.value())).collect();
        worlds.sort_by(|a, b| a.name().cmp(b.name()));
        worlds
    }

    /// Remove a world from the server, saving it first if asked. The name
    /// stays taken until the save is done, and a failed save leaves the world
    /// loaded. Returns `false` if it was not loaded.
    pub fn unload_world(&self, name: &str, save: bool) -> Result<bool, ServerError> {
        let Entry::Occupied(entry) = self.worlds.entry(name.to_string()) else {
            return Ok(false);
        };
        if save {
            entry.get().save()?;
        }
        let (name, _) = entry.remove_entry();
        tracing::info!("Unloaded world '{}'", name);
        Ok(true)
    }

    /// Save every loaded world. Every world is attempted; the first failure is
    /// returned after the rest have been saved.
    pub fn save_all(&self) -> Result<usize, ServerError> {
        let mut written = 0;
        let mut first_err = None;
        for world in self.worlds() {
            match world.save() {
                Ok(n) => written += n,
                Err(e) => {
                    tracing::error!("Saving world '{}' failed: {}", world.name(), e);
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}
