use crate::config::Config;
use crate::model::{ConversionRecord, NewConversion};
use crate::store::{ConversionStore, StoreResult, parse_id};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database as LibsqlDatabase};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[("001_conversions.sql", include_str!("migrations/001_conversions.sql"))];

pub const IN_MEMORY_PATH: &str = ":memory:";

pub struct Database {
    db: LibsqlDatabase,
    conn: Connection,
    replica: bool,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn is_replica(&self) -> bool {
        self.replica
    }

    /// Pushes pending local writes to the remote database. Periodic syncing
    /// is left to the builder's `sync_interval`; this is for a final flush.
    pub async fn sync(&self) -> Result<()> {
        if self.replica {
            self.db
                .sync()
                .await
                .map_err(|e| anyhow::anyhow!("sync failed: {}", e))?;
        }
        Ok(())
    }

    /// Applies every migration not yet listed in `_migrations`, in order.
    /// The bookkeeping table itself is created by the first system migration.
    async fn migrate(conn: &Connection, migrations: &[(&str, &str)]) -> Result<()> {
        let applied = Self::applied_migrations(conn).await?;

        for (name, sql) in migrations.iter().filter(|(name, _)| !applied.contains(*name)) {
            tracing::info!(migration = %name, "applying migration");
            conn.execute_batch(sql)
                .await
                .with_context(|| format!("failed to execute migration {name}"))?;
            conn.execute(
                "INSERT INTO _migrations (name, applied_at) VALUES (?, ?)",
                libsql::params![*name, Utc::now().to_rfc3339()],
            )
            .await?;
        }

        Ok(())
    }

    async fn applied_migrations(conn: &Connection) -> Result<HashSet<String>> {
        let mut applied = HashSet::new();
        let mut rows = match conn.query("SELECT name FROM _migrations", ()).await {
            Ok(rows) => rows,
            Err(e) if e.to_string().contains("no such table") => return Ok(applied),
            Err(e) => return Err(e.into()),
        };

        while let Some(row) = rows.next().await? {
            applied.insert(row.get::<String>(0)?);
        }

        Ok(applied)
    }

    /// Opens the database named by `app.database`, relative to `data_dir`
    /// unless it is `:memory:`. When replica credentials are configured the
    /// local file syncs with the remote database.
    pub async fn new(cfg: &Config, data_dir: &Path) -> Result<Self> {
        let name = cfg.app.get_db();

        let (db, replica) = match cfg.app.replica() {
            Some((url, token)) => {
                tracing::info!("[db] running in synced database mode (offline writes)");
                let path = data_dir.join(name);
                let sync_interval = Duration::from_secs(cfg.app.sync_interval_seconds);
                let db = Builder::new_synced_database(&path, url.to_string(), token.to_string())
                    .sync_interval(sync_interval)
                    .build()
                    .await?;
                (db, true)
            }
            None if name == IN_MEMORY_PATH => (Builder::new_local(IN_MEMORY_PATH).build().await?, false),
            None => (Builder::new_local(data_dir.join(name)).build().await?, false),
        };

        Self::setup(db, replica).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(IN_MEMORY_PATH).build().await?;
        Self::setup(db, false).await
    }

    async fn setup(db: LibsqlDatabase, replica: bool) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        Self::migrate(&conn, SYSTEM_MIGRATIONS).await?;
        Self::migrate(&conn, MIGRATIONS).await?;

        Ok(Database { db, conn, replica })
    }

    async fn insert(&self, input: NewConversion) -> Result<ConversionRecord> {
        let query = r#"
            INSERT INTO conversions (id, type, amount, result, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, type, amount, result, created_at
        "#;

        let id = Uuid::new_v4();
        let mut rows = self
            .conn
            .query(
                query,
                libsql::params![
                    id.to_string(),
                    input.kind,
                    input.amount,
                    input.result,
                    Utc::now().to_rfc3339()
                ],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Self::row_to_record(&row)
        } else {
            anyhow::bail!("Failed to create conversion")
        }
    }

    async fn select_all(&self) -> Result<Vec<ConversionRecord>> {
        let query = "SELECT id, type, amount, result, created_at FROM conversions";

        let mut rows = self.conn.query(query, ()).await?;
        let mut records = Vec::new();

        while let Some(row) = rows.next().await? {
            records.push(Self::row_to_record(&row)?);
        }

        Ok(records)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM conversions WHERE id = ?", libsql::params![id.to_string()])
            .await?;
        Ok(affected > 0)
    }

    fn row_to_record(row: &libsql::Row) -> Result<ConversionRecord> {
        let id: String = row.get(0)?;
        let created_at: String = row.get(4)?;

        Ok(ConversionRecord {
            id: Uuid::parse_str(&id)?,
            kind: row.get(1)?,
            amount: row.get(2)?,
            result: row.get(3)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        })
    }
}

#[async_trait]
impl ConversionStore for Database {
    async fn create(&self, input: NewConversion) -> StoreResult<ConversionRecord> {
        Ok(self.insert(input).await?)
    }

    async fn list(&self) -> StoreResult<Vec<ConversionRecord>> {
        Ok(self.select_all().await?)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let id = parse_id(id)?;
        Ok(self.delete_by_id(id).await?)
    }
}
