//! The JSON document holding every imported survey and question.
//!
//! All the writes go through a single writer task and are applied one at a
//! time, in the order they were submitted. A write replaces the whole
//! document: the new content is written to a temporary file next to the
//! store and renamed over it, so that a reader sees either the old or the
//! new document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use snafu::prelude::*;
use survey_master::StoreSnapshot;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

use crate::ingest::*;

/// Content of a newly created store.
const EMPTY_STORE: &str = "{\n  \"surveys\": [],\n  \"questions\": []\n}";

struct WriteJob {
    contents: String,
    done: oneshot::Sender<IngestResult<()>>,
}

/// Handle on the store. Clones share the same writer.
#[derive(Clone, Debug)]
pub struct Store {
    path: PathBuf,
    jobs: mpsc::UnboundedSender<WriteJob>,
}

impl std::fmt::Debug for WriteJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WriteJob({} bytes)", self.contents.len())
    }
}

/// A write that has been queued.
#[derive(Debug)]
pub struct PendingWrite {
    done: oneshot::Receiver<IngestResult<()>>,
}

impl PendingWrite {
    /// Waits until the write is on disk.
    pub async fn wait(self) -> IngestResult<()> {
        match self.done.await {
            Ok(res) => res,
            Err(_) => WriterStoppedSnafu {}.fail(),
        }
    }
}

impl Store {
    /// Starts the writer. Must be called from within a tokio runtime.
    pub fn open(path: impl Into<PathBuf>) -> Store {
        let path = path.into();
        let (jobs, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(path.clone(), rx));
        debug!("Store::open: {:?}", path);
        Store { path, jobs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current document, creating an empty store on first use.
    pub async fn read(&self) -> IngestResult<StoreSnapshot> {
        self.ensure_exists().await?;
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .context(StoreIoSnafu { path: &self.path })?;
        if contents.trim().is_empty() {
            return Ok(StoreSnapshot::default());
        }
        let snapshot: StoreSnapshot =
            serde_json::from_str(&contents).context(StoreCorruptSnafu { path: &self.path })?;
        debug!(
            "Store::read: {} surveys, {} questions",
            snapshot.surveys.len(),
            snapshot.questions.len()
        );
        Ok(snapshot)
    }

    /// Replaces the document and waits until the new content is on disk.
    pub async fn write(&self, snapshot: &StoreSnapshot) -> IngestResult<()> {
        self.enqueue(snapshot)?.wait().await
    }

    /// Queues a replacement of the document without waiting for it.
    ///
    /// Writes are applied in the order of the calls to `enqueue`.
    pub fn enqueue(&self, snapshot: &StoreSnapshot) -> IngestResult<PendingWrite> {
        let contents = serde_json::to_string_pretty(snapshot).context(SerializingStoreSnafu {})?;
        let (done, rx) = oneshot::channel();
        if self.jobs.send(WriteJob { contents, done }).is_err() {
            return WriterStoppedSnafu {}.fail();
        }
        Ok(PendingWrite { done: rx })
    }

    async fn ensure_exists(&self) -> IngestResult<()> {
        if let Some(parent) = parent_dir(&self.path) {
            tokio::fs::create_dir_all(parent)
                .await
                .context(StoreIoSnafu { path: parent })?;
        }
        // Never replaces a store created in the meantime.
        let created = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;
        match created {
            Ok(mut file) => {
                info!("Store: creating {:?}", self.path);
                file.write_all(EMPTY_STORE.as_bytes())
                    .await
                    .context(StoreIoSnafu { path: &self.path })?;
                file.sync_all()
                    .await
                    .context(StoreIoSnafu { path: &self.path })?;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e).context(StoreIoSnafu { path: &self.path }),
        }
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

async fn run_writer(path: PathBuf, mut jobs: mpsc::UnboundedReceiver<WriteJob>) {
    while let Some(job) = jobs.recv().await {
        let WriteJob { contents, done } = job;
        let p = path.clone();
        let res = match tokio::task::spawn_blocking(move || commit(&p, contents.as_bytes())).await {
            Ok(res) => res,
            Err(e) => Err(e).context(BlockingTaskSnafu {}),
        };
        if let Err(e) = &res {
            warn!("Store: write to {:?} failed: {}", path, e);
        }
        // The caller may have stopped waiting.
        let _ = done.send(res);
    }
    debug!("Store: writer for {:?} stopped", path);
}

/// Replaces the file at `path` with `contents`.
fn commit(path: &Path, contents: &[u8]) -> IngestResult<()> {
    let dir = parent_dir(path).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).context(StoreWriteSnafu { path })?;

    let mut temp = tempfile::Builder::new()
        .prefix(".store-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .context(StoreWriteSnafu { path })?;
    temp.write_all(contents).context(StoreWriteSnafu { path })?;
    temp.as_file().sync_all().context(StoreWriteSnafu { path })?;

    match temp.persist(path) {
        Ok(_) => {
            debug!("Store: committed {} bytes to {:?}", contents.len(), path);
            Ok(())
        }
        Err(e) => {
            warn!(
                "Store: could not rename over {:?} ({}), writing in place",
                path, e.error
            );
            write_in_place(path, contents, e.file)
        }
    }
}

/// Overwrites `path` directly and removes the temporary file that could not
/// be renamed. The temporary file is removed even if the write fails.
fn write_in_place(
    path: &Path,
    contents: &[u8],
    temp: tempfile::NamedTempFile,
) -> IngestResult<()> {
    let res = fs::write(path, contents).context(StoreWriteSnafu { path });
    if let Err(err) = temp.close() {
        warn!("Store: could not remove temporary file: {}", err);
    }
    res
}
