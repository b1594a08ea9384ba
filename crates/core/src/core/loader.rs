//! Supersession of in-flight loads.
//!
//! Map, rule and path documents arrive asynchronously from outside the core.
//! When the user picks a new map while an earlier load is still in flight, the
//! earlier result must be dropped. Every request takes a [`LoadTicket`]; only the
//! most recently issued ticket may install its result.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default, Clone)]
pub struct LoadSequencer {
    latest: u64,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket for a new request, superseding all earlier ones.
    pub fn begin(&mut self) -> LoadTicket {
        self.latest = self.latest.wrapping_add(1);
        LoadTicket(self.latest)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest
    }

    /// Passes `value` through only if `ticket` is still the latest request.
    pub fn accept<T>(&self, ticket: LoadTicket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            debug!(
                stale = ticket.0,
                latest = self.latest,
                "dropping superseded load"
            );
            None
        }
    }
}
