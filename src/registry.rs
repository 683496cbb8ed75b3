//! Per-level ordered registries of live surfaces. The head of each registry
//! is the newest or most recently promoted surface; the verification pass
//! walks head-first to find the expected topmost surface at a point.
//!
//! Registries are owned and mutated by the coordinator only (single-writer by
//! construction). Every operation returns a typed error instead of leaving
//! the collection inconsistent; the caller decides whether that is fatal.

use std::collections::VecDeque;

use crate::{
    catalog::{Level, LEVEL_COUNT},
    error::{StrataError, StrataResult},
    surface::{SurfaceId, SurfaceRecord},
};

#[derive(Debug, Default)]
pub struct LayerRegistry {
    records: VecDeque<SurfaceRecord>,
    created: usize,
}

impl LayerRegistry {
    /// Prepend a record. A duplicate handle is a protocol violation and is
    /// reported, not silently ignored.
    pub fn insert(&mut self, record: SurfaceRecord) -> StrataResult<()> {
        if self.records.iter().any(|r| r.id == record.id) {
            return Err(StrataError::DuplicateHandle {
                id: record.id,
                level: record.level_actual,
            });
        }
        self.records.push_front(record);
        self.created += 1;
        Ok(())
    }

    pub fn set_visibility(
        &mut self,
        level: Level,
        id: SurfaceId,
        visible: bool,
    ) -> StrataResult<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StrataError::HandleNotFound { id, level })?;
        record.visible = visible;
        Ok(())
    }

    /// Update visibility and move the record to the head: "show as topmost"
    /// changes rendering order and visibility atomically.
    pub fn promote_to_top(&mut self, level: Level, id: SurfaceId, visible: bool) -> StrataResult<()> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StrataError::HandleNotFound { id, level })?;
        let mut record = self
            .records
            .remove(pos)
            .ok_or(StrataError::HandleNotFound { id, level })?;
        record.visible = visible;
        record.topmost = true;
        self.records.push_front(record);
        Ok(())
    }

    pub fn remove(&mut self, level: Level, id: SurfaceId) -> StrataResult<SurfaceRecord> {
        let pos = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StrataError::HandleNotFound { id, level })?;
        let record = self
            .records
            .remove(pos)
            .ok_or(StrataError::HandleNotFound { id, level })?;
        self.created -= 1;
        Ok(record)
    }

    pub fn drain(&mut self) -> Vec<SurfaceRecord> {
        self.created = 0;
        self.records.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Live created count, visible to capacity checks and the verification
    /// pass.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Head-first iteration: newest / most recently promoted first.
    pub fn iter(&self) -> impl Iterator<Item = &SurfaceRecord> {
        self.records.iter()
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }
}

/// All seven registries for one iteration, indexed by level ordinal. Fresh
/// per iteration so repeated runs start from verifiably clean state.
#[derive(Debug, Default)]
pub struct RegistrySet {
    levels: [LayerRegistry; LEVEL_COUNT],
}

impl RegistrySet {
    pub fn level(&self, level: Level) -> &LayerRegistry {
        &self.levels[level.ordinal()]
    }

    pub fn level_mut(&mut self, level: Level) -> &mut LayerRegistry {
        &mut self.levels[level.ordinal()]
    }

    pub fn insert(&mut self, record: SurfaceRecord) -> StrataResult<()> {
        self.levels[record.level_actual.ordinal()].insert(record)
    }

    pub fn set_visibility(&mut self, level: Level, id: SurfaceId, visible: bool) -> StrataResult<()> {
        self.levels[level.ordinal()].set_visibility(level, id, visible)
    }

    pub fn promote_to_top(&mut self, level: Level, id: SurfaceId, visible: bool) -> StrataResult<()> {
        self.levels[level.ordinal()].promote_to_top(level, id, visible)
    }

    pub fn remove(&mut self, level: Level, id: SurfaceId) -> StrataResult<SurfaceRecord> {
        self.levels[level.ordinal()].remove(level, id)
    }

    pub fn drain_all(&mut self) -> Vec<SurfaceRecord> {
        let mut out = Vec::new();
        for registry in &mut self.levels {
            out.extend(registry.drain());
        }
        out
    }

    /// Which level's registry holds `id`, if any. Used for the opportunistic
    /// cross-registry uniqueness check: no handle may live in two registries.
    pub fn level_of(&self, id: SurfaceId) -> Option<Level> {
        Level::ALL
            .into_iter()
            .find(|level| self.levels[level.ordinal()].contains(id))
    }

    pub fn total_live(&self) -> usize {
        self.levels.iter().map(|r| r.len()).sum()
    }
}
