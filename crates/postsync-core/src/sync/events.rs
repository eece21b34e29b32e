//! Change notifications published by the sync engine.

/// A change the presentation layer should react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEvent {
    /// A load started (`true`) or a load/page append finished (`false`)
    LoadingChanged(bool),
    /// The post at this index changed in place
    ///
    /// Sent while the engine still holds the list for the like write, so
    /// reads made in response complete once the write has finished.
    ItemChanged(usize),
}

/// Capacity of the broadcast channel; lagging subscribers skip older events
pub(crate) const EVENT_CAPACITY: usize = 64;
