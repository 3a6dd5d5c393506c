//! Durable event store: one JSON-lines file per ledger stream.
//!
//! Each append serializes the whole batch first and writes it with a single
//! `write_all`, optionally followed by `sync_data`. If either fails, the file
//! is cut back to its length before the append. A crash mid-write can only
//! leave a torn final line, which `load_stream` reports as corruption instead
//! of silently dropping.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use guestbook_core::{ExpectedVersion, LedgerId};

use super::r#trait::{
    EventStore, EventStoreError, StoredEvent, UncommittedEvent, batch_stream, sequence_batch,
    stream_version,
};

/// Configuration for a [`FileEventStore`].
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Directory holding one `<ledger_id>.jsonl` file per stream.
    pub base_dir: PathBuf,
    /// Whether to `fsync` after every append.
    pub sync_on_write: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./data/ledger"),
            sync_on_write: true,
        }
    }
}

#[derive(Debug)]
pub struct FileEventStore {
    config: FileStoreConfig,
    /// Known stream versions; also serializes all file access.
    versions: Mutex<HashMap<LedgerId, u64>>,
}

impl FileEventStore {
    /// Open (creating if needed) the store directory.
    pub fn open(config: FileStoreConfig) -> Result<Self, EventStoreError> {
        fs::create_dir_all(&config.base_dir)?;
        debug!(dir = %config.base_dir.display(), "opened file event store");
        Ok(Self {
            config,
            versions: Mutex::new(HashMap::new()),
        })
    }

    fn stream_path(&self, ledger_id: LedgerId) -> PathBuf {
        self.config.base_dir.join(format!("{ledger_id}.jsonl"))
    }

    fn read_stream(path: &Path, ledger_id: LedgerId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut stream = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let event: StoredEvent = serde_json::from_str(&line).map_err(|e| {
                EventStoreError::Corrupt(format!("{}: line {}: {e}", path.display(), idx + 1))
            })?;

            if event.ledger_id != ledger_id {
                return Err(EventStoreError::Corrupt(format!(
                    "{}: line {} belongs to ledger {}",
                    path.display(),
                    idx + 1,
                    event.ledger_id
                )));
            }
            let expected = stream_version(&stream) + 1;
            if event.sequence_number != expected {
                return Err(EventStoreError::Corrupt(format!(
                    "{}: expected sequence_number {expected}, found {}",
                    path.display(),
                    event.sequence_number
                )));
            }

            stream.push(event);
        }

        Ok(stream)
    }
}

impl EventStore for FileEventStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some(ledger_id) = batch_stream(&events)? else {
            return Ok(vec![]);
        };

        let mut versions = self
            .versions
            .lock()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        let path = self.stream_path(ledger_id);
        let current = match versions.get(&ledger_id) {
            Some(v) => *v,
            None => stream_version(&Self::read_stream(&path, ledger_id)?),
        };

        if !expected_version.matches(current) {
            return Err(EventStoreError::Concurrency(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        let committed = sequence_batch(events, current);

        let mut buf = String::new();
        for event in &committed {
            let line = serde_json::to_string(event)
                .map_err(|e| EventStoreError::Serialization(e.to_string()))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if let Err(e) = append_or_roll_back(&mut file, buf.as_bytes(), self.config.sync_on_write) {
            // Disk state is uncertain now; re-read it on the next append.
            versions.remove(&ledger_id);
            warn!(%ledger_id, error = %e, "append to event log failed");
            return Err(e.into());
        }

        versions.insert(ledger_id, stream_version(&committed));
        debug!(%ledger_id, appended = committed.len(), "appended to event log");

        Ok(committed)
    }

    fn load_stream(&self, ledger_id: LedgerId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut versions = self
            .versions
            .lock()
            .map_err(|_| EventStoreError::InvalidAppend("lock poisoned".to_string()))?;

        let stream = Self::read_stream(&self.stream_path(ledger_id), ledger_id)?;
        if !stream.is_empty() {
            versions.insert(ledger_id, stream_version(&stream));
        }
        debug!(%ledger_id, events = stream.len(), "loaded event log");

        Ok(stream)
    }
}

/// What an append needs from the log file beyond `Write`.
trait LogFile: Write {
    fn len(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Write `bytes` at the end of `file`, cutting the file back to its prior
/// length if the write or the sync fails part way.
fn append_or_roll_back<F: LogFile>(file: &mut F, bytes: &[u8], sync: bool) -> io::Result<()> {
    let prior_len = file.len()?;

    let written = file
        .write_all(bytes)
        .and_then(|()| if sync { file.sync() } else { Ok(()) });

    if let Err(e) = written {
        if let Err(rollback) = file.truncate(prior_len) {
            warn!(error = %rollback, prior_len, "could not roll back partial append");
        }
        return Err(e);
    }
    Ok(())
}
