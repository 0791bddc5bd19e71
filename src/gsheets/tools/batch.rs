use std::time::Duration;

use tracing::debug;

use crate::gsheets::tools::error::Result;

/// Cells of one spreadsheet row, as sent to the Sheets API.
pub type CellRow = Vec<serde_json::Value>;

/// Accumulates rows and hands them to an append call once `batch_size` rows
/// are pending. An optional pause before each call keeps the write rate
/// under the API quota.
#[derive(Debug)]
pub struct AppendBatcher {
    batch_size: usize,
    delay: Duration,
    pending: Vec<CellRow>,
    sent_batches: usize,
    sent_rows: usize,
}

impl AppendBatcher {
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            delay,
            pending: Vec::with_capacity(batch_size),
            sent_batches: 0,
            sent_rows: 0,
        }
    }

    /// Queues a row, sending the batch through `send` once it is full.
    pub fn push<F>(&mut self, row: CellRow, send: F) -> Result<()>
    where
        F: FnMut(Vec<CellRow>) -> Result<()>,
    {
        self.pending.push(row);
        if self.pending.len() >= self.batch_size {
            self.flush(send)?;
        }
        Ok(())
    }

    /// Sends whatever is pending. Empty batches are never sent.
    pub fn flush<F>(&mut self, mut send: F) -> Result<()>
    where
        F: FnMut(Vec<CellRow>) -> Result<()>,
    {
        if self.pending.is_empty() {
            return Ok(());
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let rows = batch.len();
        send(batch)?;
        self.sent_batches += 1;
        self.sent_rows += rows;
        debug!(rows, batch = self.sent_batches, "appended batch");
        Ok(())
    }

    /// Number of append calls made so far.
    pub fn sent_batches(&self) -> usize {
        self.sent_batches
    }

    /// Number of rows sent so far.
    pub fn sent_rows(&self) -> usize {
        self.sent_rows
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
