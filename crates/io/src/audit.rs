//! Flat CSV record of every scraped row, kept for manual verification
//! against the stores.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use thiserror::Error;

use outage_recon::OutageRecord;

pub const AUDIT_HEADER: [&str; 6] = [
    "LOCALITY",
    "PROVIDER",
    "KEY",
    "LOC_CUST_SERVED",
    "LOC_OUT",
    "DATE_PULLED",
];

/// Format of the `DATE_PULLED` column.
pub const DATE_PULLED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV write error in {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub struct AuditSink {
    path: PathBuf,
}

impl AuditSink {
    /// Recreate the audit file with just the header row.
    pub fn create(path: &Path) -> Result<Self, AuditError> {
        let file = File::create(path).map_err(|source| AuditError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let sink = Self { path: path.to_path_buf() };
        let mut writer = sink.writer(file);
        writer.write_record(AUDIT_HEADER).map_err(|e| sink.write_err(e))?;
        writer.flush().map_err(|e| sink.write_err(e.into()))?;
        Ok(sink)
    }

    /// Append one row per record. Returns rows written.
    pub fn append(&self, records: &[OutageRecord]) -> Result<usize, AuditError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| AuditError::Open {
                path: self.path.clone(),
                source,
            })?;
        let mut writer = self.writer(file);

        for r in records {
            writer
                .write_record([
                    r.locality.as_str(),
                    r.provider.as_str(),
                    r.join_key.as_str(),
                    &r.customers_served.to_string(),
                    &r.customers_out.to_string(),
                    &r.observed_at.format(DATE_PULLED_FORMAT).to_string(),
                ])
                .map_err(|e| self.write_err(e))?;
        }
        writer.flush().map_err(|e| self.write_err(e.into()))?;
        Ok(records.len())
    }

    fn writer(&self, file: File) -> csv::Writer<File> {
        // `|` quoting keeps the file readable by the existing monitoring sheet.
        csv::WriterBuilder::new()
            .quote(b'|')
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file)
    }

    fn write_err(&self, source: csv::Error) -> AuditError {
        AuditError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
