//! DeliveryQueue - ordered top-level items awaiting dispatch

use std::collections::VecDeque;
use std::sync::Arc;

use contracts::{LogEntry, Unit};

/// A top-level queue item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueItem {
    /// A bare entry submitted outside any group
    Entry(Arc<LogEntry>),
    /// The buffer of a fully closed group run
    Run(Vec<Unit>),
}

/// Read position inside a [`DeliveryQueue`]
///
/// `item` indexes top-level items; `unit` indexes into the current run and is
/// zero whenever the cursor sits on an item boundary. After
/// [`DeliveryQueue::release_consumed`] the cursor always points at the head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub item: usize,
    pub unit: usize,
}

/// Queue of items, appended at the tail and released from the head as the
/// cursor passes them
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    items: VecDeque<QueueItem>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_entry(&mut self, entry: Arc<LogEntry>) {
        self.items.push_back(QueueItem::Entry(entry));
    }

    /// Append a completed run; empty runs carry nothing and are skipped
    pub fn push_run(&mut self, units: Vec<Unit>) {
        if !units.is_empty() {
            self.items.push_back(QueueItem::Run(units));
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn front(&self) -> Option<&QueueItem> {
        self.items.front()
    }

    /// Resolve the unit at `cursor` and advance past it
    ///
    /// Returns `None` once the cursor has passed the tail.
    pub fn next_unit(&self, cursor: &mut Cursor) -> Option<Unit> {
        match self.items.get(cursor.item)? {
            QueueItem::Entry(entry) => {
                cursor.item += 1;
                Some(Unit::Entry(Arc::clone(entry)))
            }
            QueueItem::Run(units) => {
                let unit = units.get(cursor.unit).cloned();
                cursor.unit += 1;
                if cursor.unit >= units.len() {
                    cursor.unit = 0;
                    cursor.item += 1;
                }
                unit
            }
        }
    }

    /// Drop the items `cursor` has fully passed and rebase it onto the head
    ///
    /// A partially walked run stays at the head; the cursor keeps its offset.
    pub fn release_consumed(&mut self, cursor: &mut Cursor) {
        let consumed = cursor.item.min(self.items.len());
        self.items.drain(..consumed);
        cursor.item = 0;
    }

    /// Drop everything before `cursor`, including a consumed run prefix
    pub fn discard_consumed(&mut self, cursor: &Cursor) {
        let mut rebased = *cursor;
        self.release_consumed(&mut rebased);
        if rebased.unit > 0 {
            if let Some(QueueItem::Run(units)) = self.items.front_mut() {
                let trimmed = rebased.unit.min(units.len());
                units.drain(..trimmed);
                if units.is_empty() {
                    self.items.pop_front();
                }
            }
        }
    }
}
