use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::upgrade_schema;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Request {
    Run(Job),
    Stop,
}

/// Owns the worker thread; dropping the last [`Database`] clone stops it.
struct Worker {
    requests: mpsc::Sender<Request>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };
        if self.requests.send(Request::Stop).is_err() {
            warn!("Advisor database worker already gone");
        }
        if let Err(err) = handle.join() {
            error!("Advisor database worker panicked: {err:?}");
        }
    }
}

/// The advisor database. All SQLite access runs on one `aspire-db` thread;
/// callers hand it closures and await the reply.
#[derive(Clone)]
pub struct Database {
    worker: Arc<Worker>,
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open advisor database {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("WAL journal unavailable, using the default: {err}");
    }
    let version = upgrade_schema(&mut conn).context("failed to upgrade advisor schema")?;
    info!("Advisor database at schema {version}: {}", path.display());
    Ok(conn)
}

fn serve(mut conn: Connection, requests: mpsc::Receiver<Request>) {
    while let Ok(request) = requests.recv() {
        match request {
            Request::Run(job) => job(&mut conn),
            Request::Stop => break,
        }
    }
    info!("Advisor database worker stopped");
}

impl Database {
    /// Opens (creating if needed) the SQLite file at `path` and brings its
    /// schema up to date before returning.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let handle = thread::Builder::new()
            .name("aspire-db".into())
            .spawn(move || match open_connection(&path) {
                Ok(conn) => {
                    if ready_tx.send(Ok(())).is_ok() {
                        serve(conn, request_rx);
                    }
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before it was ready")??;

        Ok(Self {
            worker: Arc::new(Worker {
                requests: request_tx,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Runs `task` on the database thread.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // The caller may have been cancelled; the result is then dropped.
            let _ = reply_tx.send(task(conn));
        });

        self.worker
            .requests
            .send(Request::Run(job))
            .map_err(|_| anyhow!("advisor database worker is not running"))?;
        reply_rx
            .await
            .map_err(|_| anyhow!("advisor database worker stopped mid-request"))?
    }
}
