// SPDX-License-Identifier: Apache-2.0

use crate::{Contact, ContactInput, ContactStore, StoreError};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Networked backend over a PostgreSQL pool. Transport security follows the
/// connection string's `sslmode`; certificates are always fully verified.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ContactStore for PostgresStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS contacts (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                email TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create(&self, input: &ContactInput) -> Result<Contact, StoreError> {
        let contact = sqlx::query_as::<_, Contact>(
            "INSERT INTO contacts (name, phone, email) VALUES ($1, $2, $3)
             RETURNING id, name, phone, email, created_at",
        )
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn list_all(&self) -> Result<Vec<Contact>, StoreError> {
        let contacts = sqlx::query_as::<_, Contact>(
            "SELECT id, name, phone, email, created_at FROM contacts ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn update(&self, id: i64, input: &ContactInput) -> Result<u64, StoreError> {
        let result =
            sqlx::query("UPDATE contacts SET name = $1, phone = $2, email = $3 WHERE id = $4")
                .bind(&input.name)
                .bind(&input.phone)
                .bind(&input.email)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("postgres pool closed");
    }
}

/// Embedded backend over a single rusqlite handle. rusqlite is synchronous,
/// so every call moves onto the blocking pool; the mutex makes the shared
/// handle's ownership explicit instead of ambient.
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
    path: PathBuf,
}

impl SqliteStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path: PathBuf = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let open_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || Connection::open(open_path)).await??;
        info!(path = %path.display(), "sqlite database opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let handle = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let conn = guard.as_ref().ok_or(StoreError::Closed)?;
            f(conn)
        })
        .await?
    }
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        email: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[async_trait]
impl ContactStore for SqliteStore {
    fn backend_tag(&self) -> &'static str {
        "sqlite"
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS contacts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    email TEXT NOT NULL,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
                )",
            )?;
            Ok(())
        })
        .await
    }

    async fn create(&self, input: &ContactInput) -> Result<Contact, StoreError> {
        let input = input.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO contacts (name, phone, email) VALUES (?1, ?2, ?3)",
                params![input.name, input.phone, input.email],
            )?;
            let id = conn.last_insert_rowid();
            let contact = conn.query_row(
                "SELECT id, name, phone, email, created_at FROM contacts WHERE id = ?1",
                params![id],
                row_to_contact,
            )?;
            Ok(contact)
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<Contact>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, phone, email, created_at FROM contacts
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map([], row_to_contact)?;
            let mut contacts = Vec::new();
            for row in rows {
                contacts.push(row?);
            }
            Ok(contacts)
        })
        .await
    }

    async fn update(&self, id: i64, input: &ContactInput) -> Result<u64, StoreError> {
        let input = input.clone();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE contacts SET name = ?1, phone = ?2, email = ?3 WHERE id = ?4",
                params![input.name, input.phone, input.email, id],
            )?;
            Ok(changed as u64)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<u64, StoreError> {
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
            Ok(changed as u64)
        })
        .await
    }

    async fn close(&self) {
        let handle = Arc::clone(&self.conn);
        let closed = tokio::task::spawn_blocking(move || {
            let mut guard = handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match guard.take() {
                Some(conn) => conn.close().map_err(|(_, e)| e),
                None => Ok(()),
            }
        })
        .await;
        match closed {
            Ok(Ok(())) => info!("sqlite database closed"),
            Ok(Err(e)) => warn!("sqlite close failed: {e}"),
            Err(e) => warn!("sqlite close task failed: {e}"),
        }
    }
}
