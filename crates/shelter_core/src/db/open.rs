//! Connection bootstrap for the document store.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Bound every statement by a busy timeout.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have migrations fully applied.
//! - File stores create their parent directory on demand.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Busy timeout used when callers have no configured value.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a store file and applies all pending migrations.
///
/// # Side effects
/// - Creates the parent directory when missing.
/// - Emits `store_open` logging events with duration and status.
pub fn open_store(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with("file", busy_timeout, || {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Connection::open(path)?)
    })
}

/// Opens an in-memory store and applies all pending migrations.
pub fn open_store_in_memory(busy_timeout: Duration) -> DbResult<Connection> {
    open_with("memory", busy_timeout, || Ok(Connection::open_in_memory()?))
}

fn open_with(
    mode: &str,
    busy_timeout: Duration,
    connect: impl FnOnce() -> DbResult<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=store_open module=db status=start mode={mode}");

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=store_open module=db status=error mode={mode} duration_ms={} error_code=store_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
    };

    match bootstrap_connection(&mut conn, busy_timeout) {
        Ok(()) => {
            info!(
                "event=store_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=store_open module=db status=error mode={mode} duration_ms={} error_code=store_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.busy_timeout(busy_timeout)?;
    apply_migrations(conn)?;
    Ok(())
}
