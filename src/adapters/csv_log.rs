//! CSV audit-log adapter.
//!
//! Implements [`ActionSink`] against an append-only CSV file: header row on
//! first creation, one row per accepted action, flushed before returning so
//! the on-disk order matches acceptance order as closely as the filesystem
//! allows. The writer sits behind a mutex because network handlers, panel
//! callbacks and the control loop all append concurrently.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use log::info;

use crate::app::ports::{ActionSink, SinkError};
use crate::audit::{ActionRecord, CSV_HEADER};

pub struct CsvActionLog {
    writer: Mutex<BufWriter<File>>,
}

impl CsvActionLog {
    /// Open the log for appending, writing the header if the file is new.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let fresh = !path.exists();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        if fresh {
            writeln!(writer, "{CSV_HEADER}")?;
            writer.flush()?;
            info!("audit log created at {}", path.display());
        } else {
            info!("audit log appending to {}", path.display());
        }
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

impl ActionSink for CsvActionLog {
    fn append(&self, record: &ActionRecord) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(writer, "{}", record.csv_row()).map_err(|e| SinkError::Io(e.to_string()))?;
        writer.flush().map_err(|e| SinkError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{ActionKind, ActorKind};
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "filamentctl-{}-{}-{}.csv",
            name,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let _ = std::fs::remove_file(&p);
        p
    }

    #[test]
    fn fresh_file_gets_header_then_rows() {
        let path = scratch_path("fresh");
        let log = CsvActionLog::open(&path).unwrap();
        log.append(&ActionRecord::new(
            ActorKind::Panel,
            ActionKind::PowerOn,
            None,
            None,
        ))
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].contains("PANEL,FILAMENT_ON"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn reopening_appends_without_second_header() {
        let path = scratch_path("reopen");
        {
            let log = CsvActionLog::open(&path).unwrap();
            log.append(&ActionRecord::new(
                ActorKind::Network,
                ActionKind::PowerOff,
                Some("10.0.0.7".parse().unwrap()),
                None,
            ))
            .unwrap();
        }
        {
            let log = CsvActionLog::open(&path).unwrap();
            log.append(&ActionRecord::new(
                ActorKind::AutoShutoff,
                ActionKind::PowerOff,
                None,
                None,
            ))
            .unwrap();
        }

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("Raw Timestamp").count(), 1);
        assert_eq!(text.lines().count(), 3);
        std::fs::remove_file(&path).unwrap();
    }
}
