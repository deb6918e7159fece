//! Result sink buffering extracted records until they are written
//!
//! Workers submit records tagged with their page index as soon as a page is
//! extracted. The scheduler commits pages in page-index order once their outcome is
//! final, and only committed records are ever flushed. This keeps the output order
//! independent of which worker finished first and keeps failed or late pages out of
//! the file.

use crate::crawler::ProductRecord;
use crate::lock;
use crate::output::traits::{OutputResult, RecordStore};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Buffers {
    /// Submitted but not yet committed, keyed by page index
    pending: BTreeMap<u32, Vec<ProductRecord>>,

    /// Committed records in output order, waiting for a flush
    ready: Vec<ProductRecord>,

    /// Records durably written so far
    written: usize,
}

/// Thread-safe buffer in front of a `RecordStore`
pub struct ResultSink {
    buffers: Mutex<Buffers>,
    store: Mutex<Box<dyn RecordStore + Send>>,
    batch_size: usize,
}

impl ResultSink {
    /// Creates a sink
    ///
    /// # Arguments
    ///
    /// * `store` - Durable destination of flushed records
    /// * `batch_size` - Committed record count that makes a flush due (0 = never)
    pub fn new(store: Box<dyn RecordStore + Send>, batch_size: usize) -> Self {
        Self {
            buffers: Mutex::new(Buffers::default()),
            store: Mutex::new(store),
            batch_size,
        }
    }

    /// Hands over the records extracted from one page
    pub fn submit(&self, page_index: u32, records: Vec<ProductRecord>) {
        if records.is_empty() {
            return;
        }
        lock(&self.buffers)
            .pending
            .entry(page_index)
            .or_default()
            .extend(records);
    }

    /// Moves a page's records into the flush buffer
    ///
    /// Must be called in page-index order. Returns the number of records committed.
    pub fn commit(&self, page_index: u32) -> usize {
        let mut buffers = lock(&self.buffers);
        match buffers.pending.remove(&page_index) {
            Some(records) => {
                let count = records.len();
                buffers.ready.extend(records);
                count
            }
            None => 0,
        }
    }

    /// Drops every submitted page that was never committed
    ///
    /// Returns the number of records discarded.
    pub fn discard_uncommitted(&self) -> usize {
        let mut buffers = lock(&self.buffers);
        let discarded = buffers.pending.values().map(Vec::len).sum();
        buffers.pending.clear();
        discarded
    }

    /// True if the committed buffer reached the configured batch size
    pub fn should_flush(&self) -> bool {
        self.batch_size > 0 && lock(&self.buffers).ready.len() >= self.batch_size
    }

    /// Writes every committed record to the store
    ///
    /// On failure nothing is lost: the batch goes back to the front of the buffer
    /// and a later flush retries it. Returns the number of records written.
    pub fn flush(&self) -> OutputResult<usize> {
        // Holding the store lock for the whole flush keeps batches in commit order
        let mut store = lock(&self.store);

        let batch = std::mem::take(&mut lock(&self.buffers).ready);
        if batch.is_empty() {
            return Ok(0);
        }

        match store.append_records(&batch) {
            Ok(written) => {
                lock(&self.buffers).written += written;
                tracing::info!("Flushed {} records to {}", written, store.location());
                Ok(written)
            }
            Err(e) => {
                let mut buffers = lock(&self.buffers);
                let newer = std::mem::replace(&mut buffers.ready, batch);
                buffers.ready.extend(newer);
                Err(e)
            }
        }
    }

    /// Committed records not yet written
    pub fn buffered_len(&self) -> usize {
        lock(&self.buffers).ready.len()
    }

    /// Records retained after a failed flush, in output order
    pub fn retained_records(&self) -> Vec<ProductRecord> {
        lock(&self.buffers).ready.clone()
    }

    pub fn records_written(&self) -> usize {
        lock(&self.buffers).written
    }

    pub fn location(&self) -> String {
        lock(&self.store).location()
    }
}
