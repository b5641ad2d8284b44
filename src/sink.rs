//! The event sink capability set (spec.md §4.G).
//!
//! The teacher installs and clears a raw pointer to the active sink via a
//! scoped guard (`client.rs`/`query/select.rs`). Per the design notes in
//! spec.md §9, this is modeled here as a borrowed trait object passed into
//! the call instead: its lifetime is bounded by the call, and there is no
//! mutable process-wide state.

use crate::block::Block;
use crate::progress::Progress;
use crate::protocol::{ExceptionChain, ProfileInfo};

/// Callback surface a [`crate::session::Session`] pushes data into while a
/// query or insert runs. All calls are synchronous on the session's thread of
/// control; implementations must not re-enter the session that is calling them.
pub trait EventSink {
    /// One call per non-empty `Data` packet received during query execution.
    fn on_data(&mut self, _block: &Block) {}

    /// Zero or more times during execution.
    fn on_progress(&mut self, _progress: Progress) {}

    /// At most once per query.
    fn on_profile(&mut self, _profile: &ProfileInfo) {}

    /// At most once; the query is terminal once this fires.
    fn on_server_exception(&mut self, _exception: &ExceptionChain) {}

    /// Exactly once on normal completion (`EndOfStream`).
    fn on_finish(&mut self) {}
}

/// A sink that discards everything. Handy for `ping`-style calls and for
/// [`crate::session::Session::execute`] callers that only care whether the
/// call succeeded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {}

/// A sink that records every callback it receives, in order. Used by the
/// integration tests (spec.md §8 "Packet framing idempotence") to assert the
/// exact callback sequence a transcript produces.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub data_blocks: Vec<Block>,
    pub progress: Vec<Progress>,
    pub profile: Option<ProfileInfo>,
    pub server_exception: Option<ExceptionChain>,
    pub finished: bool,
}

impl EventSink for RecordingSink {
    fn on_data(&mut self, block: &Block) {
        self.data_blocks.push(block.clone());
    }

    fn on_progress(&mut self, progress: Progress) {
        self.progress.push(progress);
    }

    fn on_profile(&mut self, profile: &ProfileInfo) {
        self.profile = Some(*profile);
    }

    fn on_server_exception(&mut self, exception: &ExceptionChain) {
        self.server_exception = Some(exception.clone());
    }

    fn on_finish(&mut self) {
        self.finished = true;
    }
}
