//! Shared write state of a pending cache entry.
//!
//! The sink lives behind a mutex shared by the request and every writer it hands
//! out. Abort, writes and commit all take that mutex, so an abort either lands
//! before a commit (which then fails and publishes nothing) or after it (and is a
//! no-op).

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{NetError, Result};

enum Stage<S> {
    Writing(S),
    Aborted,
    Committed,
}

pub(crate) struct Staged<S> {
    stage: Arc<Mutex<Stage<S>>>,
}

impl<S: Write + Send + 'static> Staged<S> {
    pub(crate) fn new(sink: S) -> Self {
        Self {
            stage: Arc::new(Mutex::new(Stage::Writing(sink))),
        }
    }

    pub(crate) fn writer(&self) -> Result<Box<dyn Write + Send>> {
        match &*self.stage.lock() {
            Stage::Writing(_) => Ok(Box::new(StagedWriter {
                stage: self.stage.clone(),
            })),
            Stage::Aborted => Err(NetError::io("cache store was aborted")),
            Stage::Committed => Err(NetError::io("cache store already committed")),
        }
    }

    /// Drops the sink. Returns true when the store was still being written.
    pub(crate) fn abort(&self) -> bool {
        let mut stage = self.stage.lock();
        if let Stage::Writing(_) = &*stage {
            *stage = Stage::Aborted;
            true
        } else {
            false
        }
    }

    /// Hands the sink to `publish` while holding the lock. A failed publish leaves
    /// the store aborted.
    pub(crate) fn commit_with(&self, publish: impl FnOnce(S) -> Result<()>) -> Result<()> {
        let mut stage = self.stage.lock();
        match std::mem::replace(&mut *stage, Stage::Aborted) {
            Stage::Writing(sink) => {
                publish(sink)?;
                *stage = Stage::Committed;
                Ok(())
            }
            Stage::Aborted => Err(NetError::io("cache store was aborted")),
            Stage::Committed => {
                *stage = Stage::Committed;
                Err(NetError::io("cache store already committed"))
            }
        }
    }
}

struct StagedWriter<S> {
    stage: Arc<Mutex<Stage<S>>>,
}

impl<S: Write> Write for StagedWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut *self.stage.lock() {
            Stage::Writing(sink) => sink.write(buf),
            _ => Err(io::Error::new(io::ErrorKind::Other, "cache store closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.stage.lock() {
            Stage::Writing(sink) => sink.flush(),
            _ => Err(io::Error::new(io::ErrorKind::Other, "cache store closed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_reach_sink_on_commit() {
        let staged = Staged::new(Vec::new());
        staged.writer().unwrap().write_all(b"abc").unwrap();
        staged.writer().unwrap().write_all(b"def").unwrap();

        let mut published = Vec::new();
        staged
            .commit_with(|sink| {
                published = sink;
                Ok(())
            })
            .unwrap();
        assert_eq!(published, b"abcdef");
    }

    #[test]
    fn abort_closes_outstanding_writers() {
        let staged = Staged::new(Vec::new());
        let mut writer = staged.writer().unwrap();
        writer.write_all(b"abc").unwrap();

        assert!(staged.abort());
        assert!(writer.write_all(b"def").is_err());
        assert!(staged.writer().is_err());
        assert!(staged.commit_with(|_| panic!("must not publish")).is_err());
    }

    #[test]
    fn abort_after_commit_is_noop() {
        let staged = Staged::new(Vec::new());
        staged.commit_with(|_| Ok(())).unwrap();
        assert!(!staged.abort());
        assert!(staged.commit_with(|_| Ok(())).is_err());
    }

    #[test]
    fn failed_publish_leaves_store_aborted() {
        let staged = Staged::new(Vec::new());
        assert!(staged.commit_with(|_| Err(NetError::io("disk full"))).is_err());
        assert!(staged.writer().is_err());
    }
}
