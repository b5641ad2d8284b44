//! Progress packet payload (spec.md §4.F packet reception table).

/// Delivered to [`crate::sink::EventSink::on_progress`] zero or more times
/// during query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub rows: u64,
    pub bytes: u64,
    /// Only populated when `server.revision >= DBMS_MIN_REVISION_WITH_TOTAL_ROWS_IN_PROGRESS`.
    pub total_rows: Option<u64>,
}
