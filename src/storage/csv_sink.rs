use super::ListingSink;
use crate::model::{ListingRecord, StorageError};
use csv::Writer;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

const HEADER: [&str; 7] = ["title", "price", "year", "km", "transmission", "fuel_type", "url"];
const SITE_COLUMN: &str = "site";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Columns {
    /// One site per file; the site is implied by the file name.
    SingleSite,
    /// Combined dataset with a trailing `site` column.
    WithSite,
}

/// CSV file written fresh on every run. The file is created on the first
/// write, so a run that never reaches its sink leaves no file behind.
pub struct CsvSink {
    path: PathBuf,
    columns: Columns,
    writer: Option<Writer<File>>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, columns: Columns) -> Self {
        Self {
            path: path.into(),
            columns,
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&mut self) -> Result<&mut Writer<File>, StorageError> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => self.create()?,
        };
        Ok(self.writer.insert(writer))
    }

    fn create(&self) -> Result<Writer<File>, StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut writer = Writer::from_writer(File::create(&self.path)?);
        match self.columns {
            Columns::SingleSite => writer.write_record(HEADER)?,
            Columns::WithSite => writer.write_record(HEADER.iter().chain([&SITE_COLUMN]))?,
        }
        Ok(writer)
    }
}

impl ListingSink for CsvSink {
    fn write_all(&mut self, records: &[ListingRecord]) -> Result<(), StorageError> {
        let columns = self.columns;
        let writer = self.open()?;
        for r in records {
            let row = [
                r.title.as_str(),
                r.price.as_str(),
                r.year.as_str(),
                r.km.as_str(),
                r.transmission.as_str(),
                r.fuel_type.as_str(),
                r.url.as_str(),
            ];
            match columns {
                Columns::SingleSite => writer.write_record(row)?,
                Columns::WithSite => {
                    writer.write_record(row.iter().chain([&r.source_site.as_str()]))?
                }
            }
        }
        writer.flush()?;
        info!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Forwards every batch to several sinks in turn.
pub struct TeeSink<'a> {
    sinks: Vec<&'a mut dyn ListingSink>,
}

impl<'a> TeeSink<'a> {
    pub fn new(sinks: Vec<&'a mut dyn ListingSink>) -> Self {
        Self { sinks }
    }
}

impl ListingSink for TeeSink<'_> {
    fn write_all(&mut self, records: &[ListingRecord]) -> Result<(), StorageError> {
        for sink in self.sinks.iter_mut() {
            sink.write_all(records)?;
        }
        Ok(())
    }
}
