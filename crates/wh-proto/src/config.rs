//! START configuration: serde DTOs plus structural validation.
//!
//! The shape mirrors the wire exactly; the controller turns a validated
//! config into grid + registries.  Validation here is *structural*
//! (dimensions, codes, duplicate ids, rack stocking vs. capacity);
//! cross-entity feasibility of later orders is the order store's job.

use std::collections::HashSet;

use serde::Deserialize;

use crate::error::{ProtoError, ProtoResult};
use crate::msg::ItemQty;

/// `objects[].type` codes.
pub mod object_types {
    pub const GATE: u8 = 0;
    pub const AGENT: u8 = 1;
    pub const RACK: u8 = 2;
    pub const STATION: u8 = 3;
    pub const OBSTACLE: u8 = 4;
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WarehouseConfig {
    pub map: MapConfig,
    pub items: Vec<ItemConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ItemConfig {
    pub id: u32,
    pub weight: u32,
}

#[derive(Debug, Deserialize)]
pub struct MapConfig {
    pub height: u32,
    pub width: u32,
    pub grid: Vec<Vec<CellConfig>>,
}

#[derive(Debug, Deserialize)]
pub struct CellConfig {
    #[serde(default)]
    pub objects: Vec<ObjectConfig>,
}

/// One object on a cell.  Which optional fields are required depends on
/// `type`; [`WarehouseConfig::validate`] enforces that.
#[derive(Debug, Deserialize)]
pub struct ObjectConfig {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub id: Option<u32>,
    // Agent fields.
    #[serde(default)]
    pub load_cap: Option<u32>,
    #[serde(default)]
    pub direction: Option<u8>,
    // Rack fields.
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub items: Option<Vec<ItemQty>>,
}

// ── Validation ────────────────────────────────────────────────────────────────

impl WarehouseConfig {
    /// Check the configuration for structural consistency.
    ///
    /// Verifies grid dimensions, object type codes, required per-type
    /// fields, id uniqueness per kind, that rack items exist in the
    /// catalog, and that no rack starts stocked past its capacity.
    pub fn validate(&self) -> ProtoResult<()> {
        if self.map.height == 0 || self.map.width == 0 {
            return Err(invalid("map dimensions must be positive", None));
        }
        if self.map.grid.len() != self.map.height as usize {
            return Err(invalid("grid row count does not match height", None));
        }
        for row in &self.map.grid {
            if row.len() != self.map.width as usize {
                return Err(invalid("grid column count does not match width", None));
            }
        }

        let mut item_ids = HashSet::new();
        for item in &self.items {
            if !item_ids.insert(item.id) {
                return Err(invalid("duplicate item id", Some(item.id)));
            }
        }

        let mut agent_ids = HashSet::new();
        let mut rack_ids = HashSet::new();
        let mut gate_ids = HashSet::new();
        let mut station_ids = HashSet::new();

        for cell in self.map.grid.iter().flatten() {
            if cell.objects.len() > 1 {
                return Err(invalid("a cell may hold at most one object", None));
            }
            for obj in &cell.objects {
                self.validate_object(
                    obj,
                    &item_ids,
                    &mut agent_ids,
                    &mut rack_ids,
                    &mut gate_ids,
                    &mut station_ids,
                )?;
            }
        }
        Ok(())
    }

    fn validate_object(
        &self,
        obj: &ObjectConfig,
        item_ids: &HashSet<u32>,
        agents: &mut HashSet<u32>,
        racks: &mut HashSet<u32>,
        gates: &mut HashSet<u32>,
        stations: &mut HashSet<u32>,
    ) -> ProtoResult<()> {
        match obj.kind {
            object_types::OBSTACLE => Ok(()),

            object_types::GATE => {
                let id = require_id(obj)?;
                unique(gates, id, "gate")
            }

            object_types::STATION => {
                let id = require_id(obj)?;
                unique(stations, id, "station")
            }

            object_types::AGENT => {
                let id = require_id(obj)?;
                unique(agents, id, "agent")?;
                if obj.load_cap.is_none() {
                    return Err(invalid("agent missing load_cap", Some(id)));
                }
                match obj.direction {
                    Some(d) if d < 4 => Ok(()),
                    _ => Err(invalid("agent direction must be 0..=3", Some(id))),
                }
            }

            object_types::RACK => {
                let id = require_id(obj)?;
                unique(racks, id, "rack")?;
                let capacity = obj
                    .capacity
                    .ok_or_else(|| invalid("rack missing capacity", Some(id)))?;
                if obj.weight.is_none() {
                    return Err(invalid("rack missing container weight", Some(id)));
                }

                let mut stored = 0u32;
                for entry in obj.items.as_deref().unwrap_or_default() {
                    if !item_ids.contains(&entry.id) {
                        return Err(invalid("rack stocks unknown item", Some(entry.id)));
                    }
                    let unit = self
                        .items
                        .iter()
                        .find(|i| i.id == entry.id)
                        .map(|i| i.weight)
                        .unwrap_or(0);
                    stored += unit * entry.quantity;
                }
                if stored > capacity {
                    return Err(ProtoError::RackCapExceeded {
                        rack: id,
                        excess: stored - capacity,
                    });
                }
                Ok(())
            }

            _ => Err(invalid("unknown object type code", obj.id)),
        }
    }
}

fn invalid(reason: &str, id: Option<u32>) -> ProtoError {
    ProtoError::InvalidArgs { reason: reason.to_string(), id }
}

fn require_id(obj: &ObjectConfig) -> ProtoResult<u32> {
    obj.id.ok_or_else(|| invalid("object missing id", None))
}

fn unique(seen: &mut HashSet<u32>, id: u32, what: &str) -> ProtoResult<()> {
    if !seen.insert(id) {
        return Err(invalid(&format!("duplicate {what} id"), Some(id)));
    }
    Ok(())
}
