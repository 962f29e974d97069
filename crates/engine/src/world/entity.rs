use std::sync::RwLock;

use slotmap::{new_key_type, SlotMap};
use uuid::Uuid;

use super::position::Position;

new_key_type! {
    /// Handle for an entity inhabiting a world.
    pub struct EntityId;
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Player { name: String },
    Mob { type_name: String },
}

/// A copy of one entity's state at the time it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub uuid: Uuid,
    pub kind: EntityKind,
    pub position: Position,
}

impl Entity {
    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player { .. })
    }
}

/// The entities currently in a world. Players are the subset with
/// `EntityKind::Player`.
///
/// Reads return snapshots, so callers may iterate freely while the simulation
/// adds, moves or removes entities.
#[derive(Default)]
pub struct EntityTable {
    entities: RwLock<SlotMap<EntityId, Entity>>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, uuid: Uuid, kind: EntityKind, position: Position) -> EntityId {
        self.entities
            .write()
            .expect("entity table poisoned")
            .insert_with_key(|id| Entity {
                id,
                uuid,
                kind,
                position,
            })
    }

    pub fn despawn(&self, id: EntityId) -> Option<Entity> {
        self.entities.write().expect("entity table poisoned").remove(id)
    }

    /// Move an entity. Returns `false` if it no longer exists.
    pub fn move_to(&self, id: EntityId, position: Position) -> bool {
        match self.entities.write().expect("entity table poisoned").get_mut(id) {
            Some(entity) => {
                entity.position = position;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: EntityId) -> Option<Entity> {
        self.entities.read().expect("entity table poisoned").get(id).cloned()
    }

    pub fn find_player(&self, name: &str) -> Option<Entity> {
        self.entities
            .read()
            .expect("entity table poisoned")
            .values()
            .find(|e| matches!(&e.kind, EntityKind::Player { name: n } if n == name))
            .cloned()
    }

    /// Snapshot of every entity.
    pub fn snapshot(&self) -> Vec<Entity> {
        self.entities
            .read()
            .expect("entity table poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Snapshot of the players only.
    pub fn players(&self) -> Vec<Entity> {
        self.entities
            .read()
            .expect("entity table poisoned")
            .values()
            .filter(|e| e.is_player())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.read().expect("entity table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
