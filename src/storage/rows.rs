//! Lazy row streaming over a query result.
//!
//! A worker thread owns the connection and cursor and hands decoded rows
//! over a bounded channel. The stream is finite and one-shot: once the last
//! row (or the first error) is delivered the worker exits and the connection
//! is closed. Dropping the stream early stops the worker at its next send.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use rusqlite::Row;
use tracing::{debug, warn};

use super::sqlite::open_connection;
use crate::Result;

/// Rows buffered ahead of the consumer
const CHANNEL_CAPACITY: usize = 64;

pub type RowMapper<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

/// A lazy, finite sequence of decoded rows.
pub struct RowStream<T> {
    rx: Receiver<Result<T>>,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> RowStream<T> {
    /// Start streaming `sql` with positional text parameters from the database at `path`.
    pub(crate) fn spawn(
        path: PathBuf,
        sql: &'static str,
        params: Vec<String>,
        map: RowMapper<T>,
    ) -> Self {
        let (tx, rx) = mpsc::sync_channel(CHANNEL_CAPACITY);
        let worker = thread::spawn(move || {
            if let Err(e) = stream_rows(&path, sql, &params, map, &tx) {
                // receiver may already be gone
                let _ = tx.send(Err(e));
            }
        });
        Self {
            rx,
            worker: Some(worker),
        }
    }
}

fn stream_rows<T>(
    path: &Path,
    sql: &str,
    params: &[String],
    map: RowMapper<T>,
    tx: &SyncSender<Result<T>>,
) -> Result<()> {
    let conn = open_connection(path)?;
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;

    let mut sent = 0usize;
    while let Some(row) = rows.next()? {
        let item = map(row)?;
        if tx.send(Ok(item)).is_err() {
            debug!("Row stream dropped after {} rows", sent);
            return Ok(());
        }
        sent += 1;
    }
    debug!("Row stream finished with {} rows", sent);
    Ok(())
}

impl<T> Iterator for RowStream<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rx.recv() {
            Ok(item) => Some(item),
            Err(_) => {
                if let Some(worker) = self.worker.take() {
                    if worker.join().is_err() {
                        warn!("Row stream worker panicked");
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ForecastStore;
    use crate::forecast::ForecastType;

    fn store_with(count: usize) -> (tempfile::TempDir, ForecastStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ForecastStore::open(&dir.path().join("data.db")).unwrap();
        for i in 0..count {
            store
                .create_forecast(&format!("f{i}"), "desc", "1", ForecastType::Numeric)
                .unwrap();
        }
        (dir, store)
    }

    #[test]
    fn test_stream_is_finite_and_one_shot() {
        let (_dir, store) = store_with(3);
        let mut stream = store.get_forecasts();
        assert_eq!(stream.by_ref().count(), 3);
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_stream_larger_than_buffer() {
        let (_dir, store) = store_with(200);
        let names: Vec<String> = store
            .get_forecasts()
            .map(|f| f.unwrap().shortname)
            .collect();
        assert_eq!(names.len(), 200);
    }

    #[test]
    fn test_early_drop_releases_store() {
        let (_dir, store) = store_with(200);
        {
            let mut stream = store.get_forecasts();
            assert!(stream.next().is_some());
        }
        // writes still go through once the partially-consumed stream is gone
        assert_eq!(
            store
                .create_forecast("after", "desc", "1", ForecastType::Numeric)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_write_while_stream_open() {
        let (_dir, store) = store_with(200);
        let mut stream = store.get_forecasts();
        assert!(stream.next().is_some());

        let started = std::time::Instant::now();
        assert_eq!(
            store
                .create_forecast("late", "desc", "1", ForecastType::Numeric)
                .unwrap(),
            1
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(2));

        // the open stream keeps reading its own snapshot
        assert_eq!(stream.count(), 199);
        assert_eq!(store.get_forecasts().count(), 201);
    }

    #[test]
    fn test_restart_by_reinvoking() {
        let (_dir, store) = store_with(2);
        assert_eq!(store.get_forecasts().count(), 2);
        assert_eq!(store.get_forecasts().count(), 2);
    }
}
