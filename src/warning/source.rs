use super::parser::{ParseOutcome, parse_reader};
use super::store::{LoadFinished, WarningStore};
use crate::error::{Result, WarnError};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Supplies raw log text for a path-like identifier
pub trait LogSource: Send + Sync {
    /// Fail with `SourceUnreadable` unless the path is an existing regular file
    fn check(&self, path: &Path) -> Result<()>;

    fn open(&self, path: &Path) -> Result<Box<dyn BufRead + Send>>;
}

/// Log source backed by the local file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLogSource;

impl LogSource for FsLogSource {
    fn check(&self, path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path).map_err(|e| WarnError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if !metadata.is_file() {
            return Err(WarnError::SourceUnreadable {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }
        Ok(())
    }

    fn open(&self, path: &Path) -> Result<Box<dyn BufRead + Send>> {
        let file = File::open(path).map_err(|e| WarnError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Check, read and parse one log into a fully built store.
/// Nothing is returned unless the whole pass succeeded.
pub fn load_store(source: &dyn LogSource, path: &Path) -> Result<(WarningStore, LoadFinished)> {
    source.check(path)?;
    let reader = source.open(path)?;
    let result = parse_reader(reader);

    let source_id = path.display().to_string();
    if let ParseOutcome::Failure(reason) = &result.outcome {
        tracing::warn!(source = %source_id, %reason, "log parse failed");
        return Err(WarnError::ParseFailed {
            source_id,
            reason: reason.clone(),
        });
    }

    Ok(WarningStore::load(source_id, result))
}

/// Completed background load
#[derive(Debug)]
pub struct LoadEvent {
    pub path: PathBuf,
    pub result: Result<(WarningStore, LoadFinished)>,
}

/// Runs log parses off the async runtime and reports each one exactly once.
/// At most one load per path is in flight at any time.
pub struct LogLoader {
    source: Arc<dyn LogSource>,
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
    event_tx: mpsc::UnboundedSender<LoadEvent>,
}

impl LogLoader {
    pub fn new(source: Arc<dyn LogSource>) -> (Self, mpsc::UnboundedReceiver<LoadEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let loader = Self {
            source,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            event_tx,
        };
        (loader, event_rx)
    }

    /// Start loading `path` in the background. Returns false if a load for
    /// the same path is still running.
    pub fn request(&self, path: PathBuf) -> bool {
        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(path.clone()) {
                tracing::debug!(path = %path.display(), "load already in flight");
                return false;
            }
        }

        let source = Arc::clone(&self.source);
        let in_flight = Arc::clone(&self.in_flight);
        let event_tx = self.event_tx.clone();

        tokio::task::spawn_blocking(move || {
            let result = load_store(source.as_ref(), &path);
            in_flight
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&path);
            // Receiver gone means nobody is interested anymore
            let _ = event_tx.send(LoadEvent { path, result });
        });
        true
    }

    pub fn is_loading(&self, path: &Path) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::time::{Duration, timeout};

    #[test]
    fn test_check_rejects_missing_file() {
        let err = FsLogSource.check(Path::new("/definitely/not/here.log")).unwrap_err();
        assert!(matches!(err, WarnError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_check_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let err = FsLogSource.check(dir.path()).unwrap_err();
        match err {
            WarnError::SourceUnreadable { reason, .. } => assert_eq!(reason, "not a regular file"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_store_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "a.c:1:1: warning: x [-Wa]").unwrap();
        writeln!(temp_file, "note: y").unwrap();
        temp_file.flush().unwrap();

        let (store, finished) = load_store(&FsLogSource, temp_file.path()).unwrap();
        assert_eq!(store.record_count(), 1);
        assert_eq!(finished.record_count, 1);
        assert_eq!(store.records()[0].complete_text, "x\nnote: y");
    }

    #[test]
    fn test_load_store_tolerates_invalid_utf8() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"a.c:1: warning: x [-Wa]\n\xff\xff\nb.c:2: warning: y [-Wb]\n")
            .unwrap();
        temp_file.flush().unwrap();

        let (store, finished) = load_store(&FsLogSource, temp_file.path()).unwrap();
        assert!(finished.is_success());
        assert_eq!(store.record_count(), 2);
        assert_eq!(store.records()[0].complete_text, "x\n\u{FFFD}\u{FFFD}");
    }

    #[tokio::test]
    async fn test_loader_delivers_once() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "a.c:1: warning: x [-Wa]").unwrap();
        temp_file.flush().unwrap();

        let (loader, mut events) = LogLoader::new(Arc::new(FsLogSource));
        assert!(loader.request(temp_file.path().to_path_buf()));

        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.path, temp_file.path());
        let (store, _) = event.result.unwrap();
        assert_eq!(store.record_count(), 1);

        assert!(!loader.is_loading(temp_file.path()));
        assert!(events.try_recv().is_err());
    }

    /// Blocks every check until the test releases it
    struct GatedSource {
        gate: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl LogSource for GatedSource {
        fn check(&self, _path: &Path) -> Result<()> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(())
        }

        fn open(&self, _path: &Path) -> Result<Box<dyn BufRead + Send>> {
            Ok(Box::new(std::io::Cursor::new(b"a.c:1: warning: x [-Wa]\n".to_vec())))
        }
    }

    #[tokio::test]
    async fn test_loader_refuses_second_request_for_same_path() {
        let (release, gate) = std::sync::mpsc::channel();
        let source = GatedSource { gate: Mutex::new(gate) };
        let (loader, mut events) = LogLoader::new(Arc::new(source));
        let path = PathBuf::from("build.log");

        assert!(loader.request(path.clone()));
        assert!(loader.is_loading(&path));
        assert!(!loader.request(path.clone()));

        release.send(()).unwrap();
        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.path, path);
        assert!(event.result.is_ok());
        assert!(!loader.is_loading(&path));
    }

    #[tokio::test]
    async fn test_loader_reports_unreadable_source() {
        let (loader, mut events) = LogLoader::new(Arc::new(FsLogSource));
        assert!(loader.request(PathBuf::from("/no/such/build.log")));

        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event.result, Err(WarnError::SourceUnreadable { .. })));
    }
}
