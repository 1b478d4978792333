//! redb table definitions for the local engine.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized records).

use redb::TableDefinition;

pub(crate) type Table = TableDefinition<'static, &'static str, &'static [u8]>;

/// Promise records keyed by `{promise_id}`.
pub(crate) const PROMISES: Table = TableDefinition::new("promises");

/// Task records keyed by `{task_id}`.
pub(crate) const TASKS: Table = TableDefinition::new("tasks");

/// Schedule records keyed by `{schedule_id}`.
pub(crate) const SCHEDULES: Table = TableDefinition::new("schedules");

/// Pending callbacks keyed by `{promise_id}/{callback_id}`.
pub(crate) const CALLBACKS: Table = TableDefinition::new("callbacks");

/// Build the composite key for the callbacks table.
pub(crate) fn callback_key(promise_id: &str, callback_id: &str) -> String {
    format!("{promise_id}/{callback_id}")
}
