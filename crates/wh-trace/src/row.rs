//! Flat row types shared by all trace backends.

use wh_proto::UpdateMsg;

/// One agent action, flattened out of an UPDATE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRow {
    pub timestep: u64,
    /// Position within the tick's batch; preserves execution order.
    pub seq: u32,
    pub agent_id: u32,
    /// The action's wire code.
    pub action: u8,
}

/// One log entry, flattened out of an UPDATE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRow {
    pub timestep: u64,
    pub seq: u32,
    /// The log's wire code.
    pub kind: u8,
    /// The entry's data object, as compact JSON.
    pub data: String,
}

/// Flatten one UPDATE into its action and log rows.
pub fn flatten(update: &UpdateMsg) -> (Vec<ActionRow>, Vec<LogRow>) {
    let actions = update
        .actions
        .iter()
        .enumerate()
        .map(|(i, a)| ActionRow {
            timestep: update.timestep,
            seq: i as u32,
            agent_id: a.id,
            action: a.kind,
        })
        .collect();
    let logs = update
        .logs
        .iter()
        .enumerate()
        .map(|(i, l)| LogRow {
            timestep: update.timestep,
            seq: i as u32,
            kind: l.kind,
            data: l.data.to_string(),
        })
        .collect();
    (actions, logs)
}
