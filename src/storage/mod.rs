// Record sinks

pub mod csv_sink;

pub use csv_sink::{Columns, CsvSink, TeeSink};

use crate::model::{ListingRecord, StorageError};

/// Durable destination for a session's records. Only the coordinating task writes to it.
pub trait ListingSink {
    fn write_all(&mut self, records: &[ListingRecord]) -> Result<(), StorageError>;
}

impl ListingSink for Vec<ListingRecord> {
    fn write_all(&mut self, records: &[ListingRecord]) -> Result<(), StorageError> {
        self.extend_from_slice(records);
        Ok(())
    }
}
