use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{LogStoreError, Result};
use crate::event::{ExecutionId, LogEvent};
use crate::store::LogStore;

/// [`LogStore`] persisting one JSON object per line in a single file.
///
/// The file is created on first append. Every append is flushed before it
/// returns. Reads scan the whole file, so this store suits audit trails and
/// tooling rather than hot lookups.
#[derive(Debug)]
pub struct JsonLinesLogStore {
    path: PathBuf,
    writer: Mutex<Option<File>>,
}

impl JsonLinesLogStore {
    /// Store backed by `path`. Nothing is opened until the first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(None),
        }
    }

    /// File the events are appended to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> LogStoreError {
        LogStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_all(&self) -> Result<Vec<LogEvent>> {
        let _guard = self.writer.lock().map_err(|_| LogStoreError::Poisoned)?;

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut events = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            let event = serde_json::from_str(&line).map_err(|source| LogStoreError::Decode {
                path: self.path.clone(),
                line: number + 1,
                source,
            })?;
            events.push(event);
        }
        Ok(events)
    }
}

impl LogStore for JsonLinesLogStore {
    fn append_log(&self, event: &LogEvent) -> Result<()> {
        let mut line = serde_json::to_string(event).map_err(|source| LogStoreError::Encode {
            execution_id: event.execution_id.clone(),
            source,
        })?;
        line.push('\n');

        let mut writer = self.writer.lock().map_err(|_| LogStoreError::Poisoned)?;
        let file = match writer.take() {
            Some(file) => file,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .map_err(|e| self.io_error(e))?;
                debug!(path = %self.path.display(), "opened saga log file");
                file
            }
        };
        let file = writer.insert(file);

        file.write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| self.io_error(e))
    }

    fn get_all_logs_by_execution_id(&self, id: &ExecutionId) -> Result<Vec<LogEvent>> {
        let events: Vec<LogEvent> = self
            .read_all()?
            .into_iter()
            .filter(|event| &event.execution_id == id)
            .collect();

        if events.is_empty() {
            return Err(LogStoreError::NotFound(id.clone()));
        }
        Ok(events)
    }

    fn execution_ids(&self) -> Result<Vec<ExecutionId>> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for event in self.read_all()? {
            if seen.insert(event.execution_id.clone()) {
                ids.push(event.execution_id);
            }
        }
        Ok(ids)
    }
}
