//! File-backed pending-payment slot.
//!
//! The slot is a single JSON file, `<state_dir>/pending_payment.json`.
//!
//! # Atomic Writes
//!
//! `set` uses the write-to-temp-then-rename pattern:
//! 1. Write to `pending_payment.json.tmp`
//! 2. fsync the file
//! 3. Rename over `pending_payment.json`
//! 4. fsync the directory
//!
//! A crash at any point leaves either the old record or the new one, never a
//! partial file. `clear` unlinks the file and fsyncs the directory, so a crash
//! before the unlink is durable leaves the record in place for recovery.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{PersistentSlot, Result, SlotError};
use crate::types::{OrderId, PendingPayment};

/// Current on-disk schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// File name of the slot inside the state directory.
pub const SLOT_FILE_NAME: &str = "pending_payment.json";

/// On-disk envelope around the pending record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SlotFile {
    schema_version: u32,
    pending: PendingPayment,
}

/// A [`PersistentSlot`] stored as a JSON file.
///
/// Blocking filesystem work runs on tokio's blocking pool so the cooperative
/// event loop is never stalled by an fsync.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    /// Creates a slot inside `state_dir`. The directory is created on first write.
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        FileSlot {
            path: state_dir.as_ref().join(SLOT_FILE_NAME),
        }
    }

    /// Returns the path of the slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistentSlot for FileSlot {
    async fn get(&self) -> Result<Option<PendingPayment>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_slot(&path)).await?
    }

    async fn set(&self, order_id: &OrderId) -> Result<PendingPayment> {
        let path = self.path.clone();
        let pending = PendingPayment::new(order_id.clone());
        let record = SlotFile {
            schema_version: SCHEMA_VERSION,
            pending: pending.clone(),
        };
        tokio::task::spawn_blocking(move || write_slot(&path, &record)).await??;
        debug!(order_id = %pending.order_id, "Pending payment recorded");
        Ok(pending)
    }

    async fn clear(&self) -> Result<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || remove_slot(&path)).await?
    }
}

fn read_slot(path: &Path) -> Result<Option<PendingPayment>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    // An empty file means nothing is pending.
    if bytes.iter().all(u8::is_ascii_whitespace) {
        trace!(path = %path.display(), "Slot file is empty");
        return Ok(None);
    }

    let file: SlotFile = serde_json::from_slice(&bytes)?;
    if file.schema_version != SCHEMA_VERSION {
        return Err(SlotError::SchemaMismatch {
            expected: SCHEMA_VERSION,
            got: file.schema_version,
        });
    }
    if file.pending.order_id.is_blank() {
        trace!(path = %path.display(), "Slot holds a blank order id");
        return Ok(None);
    }
    Ok(Some(file.pending))
}

fn write_slot(path: &Path, record: &SlotFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(record)?;

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;
    sync_parent(path)?;
    Ok(())
}

fn remove_slot(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    }
    sync_parent(path)?;
    trace!(path = %path.display(), "Slot file removed");
    Ok(())
}

/// fsyncs the directory holding `path` so renames and unlinks survive power loss.
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}
