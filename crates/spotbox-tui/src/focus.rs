//! FocusRing — manages keyboard focus cycling between components.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = if self.current == 0 {
            self.items.len() - 1
        } else {
            self.current - 1
        };
        self.current()
    }

    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    /// Replace the focus ring contents (e.g., when the log panel opens).
    /// Tries to keep the same focused ID if it exists in the new set.
    pub fn set_items(&mut self, items: Vec<ComponentId>) {
        let old = self.current();
        self.items = items;
        if let Some(id) = old {
            if let Some(pos) = self.items.iter().position(|&x| x == id) {
                self.current = pos;
                return;
            }
        }
        self.current = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_wraps_both_ways() {
        let mut ring = FocusRing::new(vec![ComponentId::QueuePanel, ComponentId::LogPanel]);
        assert_eq!(ring.current(), Some(ComponentId::QueuePanel));
        assert_eq!(ring.next(), Some(ComponentId::LogPanel));
        assert_eq!(ring.next(), Some(ComponentId::QueuePanel));
        assert_eq!(ring.prev(), Some(ComponentId::LogPanel));
    }

    #[test]
    fn test_set_items_keeps_focus_when_possible() {
        let mut ring = FocusRing::new(vec![ComponentId::QueuePanel, ComponentId::LogPanel]);
        ring.set(ComponentId::LogPanel);
        ring.set_items(vec![ComponentId::LogPanel]);
        assert_eq!(ring.current(), Some(ComponentId::LogPanel));
        ring.set_items(vec![ComponentId::QueuePanel]);
        assert_eq!(ring.current(), Some(ComponentId::QueuePanel));
    }
}
