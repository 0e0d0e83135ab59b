//! Status State Machine
//!
//! The legal transitions between [`PinStatusValue`] states, kept as pure
//! logic separate from persistence so the queue and the handler can both
//! consult it before writing through the Store.

use crate::db::PinStatusValue;

impl PinStatusValue {
    /// Is moving from `self` to `next` a legal transition?
    ///
    /// Mirrors the table in the status model: a worker claiming a job
    /// (`queued`/any non-terminal → `pinning`), a terminal outcome
    /// (`pinning` → `pinned`/`failed`), or a client-initiated reset
    /// (any state → `queued` via UpdatePin).
    #[must_use]
    pub fn can_transition(self, next: Self) -> bool {
        use PinStatusValue::{Failed, Pinned, Pinning, Queued};
        matches!(
            (self, next),
            (Queued, Pinning)
                | (Pinning, Pinned)
                | (Pinning, Failed)
                | (Pinned, Queued)
                | (Failed, Queued)
                | (Queued, Queued)
        )
    }
}
