//! Reading order assembly for right-to-left books.
//!
//! The sequencer walks the volume's logical items once, holding at most one single page back
//! so that two consecutive singles can share an opened spread. A pending single never crosses
//! a spread: it is flushed on its own first.

use crate::types::{LogicalItem, PageRecord, Placement};

/// Streaming page sequencer with one pending-single slot of lookahead.
#[derive(Debug)]
pub struct PageSequencer<T> {
    first_single_seen: bool,
    pending_single: Option<T>,
    records: Vec<PageRecord<T>>,
}

impl<T> Default for PageSequencer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PageSequencer<T> {
    pub fn new() -> Self {
        Self {
            first_single_seen: false,
            pending_single: None,
            records: Vec::new(),
        }
    }

    /// Feeds the next item in input order.
    pub fn push(&mut self, item: LogicalItem<T>) {
        match item {
            LogicalItem::Spread(right, left) => {
                self.flush_pending();
                self.records.push(PageRecord::new(right, Placement::Right));
                self.records.push(PageRecord::new(left, Placement::Left));
                self.first_single_seen = true;
            }
            LogicalItem::Single(image) => {
                if !self.first_single_seen {
                    log::info!("Using first page as standalone cover");
                    self.records.push(PageRecord::new(image, Placement::Right));
                    self.first_single_seen = true;
                } else if let Some(pending) = self.pending_single.take() {
                    self.records.push(PageRecord::new(pending, Placement::Right));
                    self.records.push(PageRecord::new(image, Placement::Left));
                } else {
                    self.pending_single = Some(image);
                }
            }
        }
    }

    /// Flushes an unpaired tail page and returns the reading order.
    pub fn finish(mut self) -> Vec<PageRecord<T>> {
        self.flush_pending();
        self.records
    }

    fn flush_pending(&mut self) {
        if let Some(pending) = self.pending_single.take() {
            self.records.push(PageRecord::new(pending, Placement::Right));
        }
    }
}

/// Sequences a whole volume of logical items.
pub fn sequence<T>(items: impl IntoIterator<Item = LogicalItem<T>>) -> Vec<PageRecord<T>> {
    let mut sequencer = PageSequencer::new();
    for item in items {
        sequencer.push(item);
    }
    sequencer.finish()
}
