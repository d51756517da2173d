use std::{
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

/// Call-history database. All statements run on one dedicated thread that owns
/// the SQLite connection; handles are cheap to clone.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let path_for_thread = db_path.clone();
        let inner = spawn_worker(move || Connection::open(&path_for_thread))?;
        info!("Database initialized at {}", db_path.display());

        Ok(Self { inner })
    }

    /// Private in-memory database, gone once the last handle drops.
    pub fn open_in_memory() -> Result<Self> {
        let inner = spawn_worker(Connection::open_in_memory)?;
        Ok(Self { inner })
    }

    /// Run `task` on the database thread and wait for its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Queue `task` without waiting; failures are logged on the database thread.
    ///
    /// Usable from synchronous code that must not block, such as channel handlers.
    pub fn submit<F>(&self, label: &'static str, task: F) -> Result<()>
    where
        F: FnOnce(&mut Connection) -> Result<()> + Send + 'static,
    {
        let command = DbCommand::Execute(Box::new(move |conn| {
            if let Err(err) = task(conn) {
                error!("background DB task '{label}' failed: {err:?}");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|err| anyhow!("failed to queue '{label}' on DB thread: {err}"))
    }
}

fn spawn_worker<O>(open: O) -> Result<Arc<DatabaseInner>>
where
    O: FnOnce() -> rusqlite::Result<Connection> + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

    let worker = thread::Builder::new()
        .name("callwatch-db".into())
        .spawn(move || {
            let mut conn = match open() {
                Ok(connection) => connection,
                Err(err) => {
                    let _ = ready_tx.send(Err(
                        anyhow::Error::new(err).context("failed to open SQLite database")
                    ));
                    return;
                }
            };

            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                error!("Failed to enable WAL mode: {err}");
            }
            if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                error!("Failed to enable foreign keys: {err}");
            }

            let init_result =
                run_migrations(&mut conn).context("failed to run database migrations");
            if ready_tx.send(init_result).is_err() {
                error!("DB initialization receiver dropped before ready signal");
                return;
            }

            while let Ok(command) = command_rx.recv() {
                match command {
                    DbCommand::Execute(task) => task(&mut conn),
                    DbCommand::Shutdown => break,
                }
            }

            info!("Database thread shutting down");
        })
        .context("failed to spawn database worker thread")?;

    ready_rx
        .recv()
        .context("database worker exited before signaling readiness")??;

    Ok(Arc::new(DatabaseInner {
        sender: command_tx,
        worker: Mutex::new(Some(worker)),
    }))
}
