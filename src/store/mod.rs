mod crypt;
mod models;
mod queries;

pub use models::*;
pub use queries::ProjectStats;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::Config;
use crate::keys;
use crypt::Cipher;

/// Encrypted record store: one SQLite connection plus the cipher derived
/// from the installation's key material. Record payloads never hit disk
/// in plaintext.
pub struct Store {
    pub conn: Connection,
    cipher: Cipher,
}

impl Store {
    pub fn open(config: &Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let key = keys::load_or_create(&data_dir)?;
        let cipher = Cipher::new(&key)?;

        let db_path = config.db_path()?;
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Store { conn, cipher })
    }

    /// In-memory store with a throwaway key, schema ready.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Store {
            conn,
            cipher: Cipher::ephemeral(),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id),
                status TEXT NOT NULL DEFAULT 'todo',
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            ",
        )?;
        Ok(())
    }
}
