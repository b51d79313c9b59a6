//! Facility registries, keyed by client-assigned ids.

use rustc_hash::FxHashMap;

use wh_core::{GateId, RackId, StationId};

use crate::error::{EntityError, EntityResult};
use crate::{Gate, Rack, Station};

// ── RackStore ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RackStore {
    inner: FxHashMap<RackId, Rack>,
}

impl RackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rack: Rack) {
        self.inner.insert(rack.id, rack);
    }

    pub fn contains(&self, id: RackId) -> bool {
        self.inner.contains_key(&id)
    }

    pub fn get(&self, id: RackId) -> EntityResult<&Rack> {
        self.inner.get(&id).ok_or(EntityError::RackNotFound(id))
    }

    pub fn get_mut(&mut self, id: RackId) -> EntityResult<&mut Rack> {
        self.inner.get_mut(&id).ok_or(EntityError::RackNotFound(id))
    }

    /// Ids in ascending order, for deterministic candidate scans.
    pub fn sorted_ids(&self) -> Vec<RackId> {
        let mut ids: Vec<RackId> = self.inner.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rack> {
        self.inner.values()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ── GateStore ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct GateStore {
    inner: FxHashMap<GateId, Gate>,
}

impl GateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, gate: Gate) {
        self.inner.insert(gate.id, gate);
    }

    pub fn contains(&self, id: GateId) -> bool {
        self.inner.contains_key(&id)
    }

    pub fn get(&self, id: GateId) -> EntityResult<&Gate> {
        self.inner.get(&id).ok_or(EntityError::GateNotFound(id))
    }

    pub fn get_mut(&mut self, id: GateId) -> EntityResult<&mut Gate> {
        self.inner.get_mut(&id).ok_or(EntityError::GateNotFound(id))
    }

    /// Ids in ascending order, for deterministic scans.
    pub fn sorted_ids(&self) -> Vec<GateId> {
        let mut ids: Vec<GateId> = self.inner.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ── StationStore ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StationStore {
    inner: FxHashMap<StationId, Station>,
}

impl StationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, station: Station) {
        self.inner.insert(station.id, station);
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.inner.contains_key(&id)
    }

    pub fn get(&self, id: StationId) -> EntityResult<&Station> {
        self.inner.get(&id).ok_or(EntityError::StationNotFound(id))
    }

    pub fn get_mut(&mut self, id: StationId) -> EntityResult<&mut Station> {
        self.inner.get_mut(&id).ok_or(EntityError::StationNotFound(id))
    }

    /// Ids in ascending order, for deterministic scans.
    pub fn sorted_ids(&self) -> Vec<StationId> {
        let mut ids: Vec<StationId> = self.inner.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
