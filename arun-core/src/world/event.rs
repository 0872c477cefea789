use serde::{Deserialize, Serialize};

use crate::acode::Aint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQueueEntry {
    pub event: Aint,
    /// Where the event was scheduled; resolved to a location when it fires.
    pub location: Aint,
    /// Ticks left before the event fires.
    pub after: Aint,
}

/// Pending events, ordered by `after` descending so the next one to fire is on
/// top (at the end).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQueue {
    entries: Vec<EventQueueEntry>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from bottom to top.
    pub fn entries(&self) -> &[EventQueueEntry] {
        &self.entries
    }

    /// Remove the topmost entry for `event`, if any.
    pub fn cancel(&mut self, event: Aint) {
        if let Some(pos) = self.entries.iter().rposition(|e| e.event == event) {
            self.entries.remove(pos);
        }
    }

    /// Replace any pending entry for `event`. A new entry goes below entries
    /// with the same `after`.
    pub fn schedule(&mut self, event: Aint, location: Aint, after: Aint) {
        self.cancel(event);
        let pos = self.entries.iter().rposition(|e| e.after > after).map_or(0, |p| p + 1);
        self.entries.insert(pos, EventQueueEntry { event, location, after });
    }

    /// Pop the top entry if it is due.
    pub fn pop_due(&mut self) -> Option<EventQueueEntry> {
        match self.entries.last() {
            Some(top) if top.after == 0 => self.entries.pop(),
            _ => None,
        }
    }

    pub fn tick(&mut self) {
        for entry in &mut self.entries {
            entry.after -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn afters(queue: &EventQueue) -> Vec<(Aint, Aint)> {
        queue.entries().iter().map(|e| (e.event, e.after)).collect()
    }

    #[test]
    fn schedule_keeps_descending_order() {
        let mut queue = EventQueue::new();
        queue.schedule(1, 0, 3);
        queue.schedule(2, 0, 1);
        queue.schedule(3, 0, 2);
        assert_eq!(afters(&queue), vec![(1, 3), (3, 2), (2, 1)]);

        queue.schedule(4, 0, 2);
        assert_eq!(afters(&queue), vec![(1, 3), (4, 2), (3, 2), (2, 1)]);
    }

    #[test]
    fn rescheduling_replaces_the_entry() {
        let mut queue = EventQueue::new();
        queue.schedule(1, 0, 3);
        queue.schedule(2, 0, 1);
        queue.schedule(1, 0, 0);
        assert_eq!(afters(&queue), vec![(2, 1), (1, 0)]);
        assert_eq!(queue.pop_due().map(|e| e.event), Some(1));
        assert_eq!(queue.pop_due(), None);
    }
}
