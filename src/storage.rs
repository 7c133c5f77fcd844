use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Pool, Sqlite, sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous}, Row};
use uuid::Uuid;

use crate::session::short_id;

pub const REPORT_FILE_PREFIX: &str = "AI_Session_Report_";

#[derive(Debug, Clone)]
pub struct QueuedMail {
    pub id: Uuid,
    pub recipients: Vec<String>,
    pub subject: String,
    pub raw_message: Vec<u8>,
    pub status: String,
}

#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    async fn put_cached_pdf(&self, temp_key: &str, session_id: &str, pdf: &[u8]) -> anyhow::Result<()>;
    async fn get_cached_pdf(&self, temp_key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn save_report_file(&self, session_id: &str, pdf: &[u8]) -> anyhow::Result<String>;
    async fn get_public_file(&self, file_name: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn queue_mail(&self, recipients: &[String], subject: &str, raw_message: &[u8]) -> anyhow::Result<Uuid>;
    async fn list_queued_mail(&self) -> anyhow::Result<Vec<QueuedMail>>;
    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct SqliteArtifactRepository {
    pool: Pool<Sqlite>,
}

impl SqliteArtifactRepository {
    pub async fn initialize(database_url: Option<String>) -> anyhow::Result<Self> {
        let url = match database_url {
            Some(u) => u,
            None => resolve_default_db_url()?,
        };
        let options = url.parse::<SqliteConnectOptions>()?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);
        let pool = Pool::<Sqlite>::connect_with(options).await?;
        sqlx::query("PRAGMA busy_timeout = 5000;").execute(&pool).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn pool(&self) -> &Pool<Sqlite> { &self.pool }
}

fn resolve_default_db_url() -> anyhow::Result<String> {
    let base = std::env::var("XDG_DATA_HOME").ok().map(PathBuf::from).unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local").join("share")
    });
    let dir = base.join("agent_widget");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("reports.db");
    Ok(format!("sqlite://{}", path.to_string_lossy()))
}

// Fixed-width UTC so stored timestamps compare correctly as text.
fn stamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn report_file_name(session_id: &str, at: DateTime<Utc>) -> String {
    format!("{}{}_{}.pdf", REPORT_FILE_PREFIX, short_id(session_id), at.timestamp_millis())
}

#[async_trait]
impl ArtifactRepository for SqliteArtifactRepository {
    async fn put_cached_pdf(&self, temp_key: &str, session_id: &str, pdf: &[u8]) -> anyhow::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO cached_reports (temp_key, session_id, pdf, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(temp_key)
            .bind(session_id)
            .bind(pdf)
            .bind(stamp(Utc::now()))
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn get_cached_pdf(&self, temp_key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT pdf FROM cached_reports WHERE temp_key = ?1")
            .bind(temp_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<Vec<u8>, _>("pdf")))
    }

    async fn save_report_file(&self, session_id: &str, pdf: &[u8]) -> anyhow::Result<String> {
        let now = Utc::now();
        let file_name = report_file_name(session_id, now);
        sqlx::query("INSERT OR REPLACE INTO report_files (file_name, session_id, is_private, content, created_at) VALUES (?1, ?2, 0, ?3, ?4)")
            .bind(&file_name)
            .bind(session_id)
            .bind(pdf)
            .bind(stamp(now))
            .execute(&self.pool).await?;
        Ok(file_name)
    }

    async fn get_public_file(&self, file_name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT content FROM report_files WHERE file_name = ?1 AND is_private = 0")
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<Vec<u8>, _>("content")))
    }

    async fn queue_mail(&self, recipients: &[String], subject: &str, raw_message: &[u8]) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        let recipients_json = serde_json::to_string(recipients)?;
        sqlx::query("INSERT INTO mail_queue (id, recipients, subject, raw_message, status, created_at) VALUES (?1, ?2, ?3, ?4, 'queued', ?5)")
            .bind(id.to_string())
            .bind(recipients_json)
            .bind(subject)
            .bind(raw_message)
            .bind(stamp(Utc::now()))
            .execute(&self.pool).await?;
        Ok(id)
    }

    async fn list_queued_mail(&self) -> anyhow::Result<Vec<QueuedMail>> {
        let rows = sqlx::query("SELECT id, recipients, subject, raw_message, status FROM mail_queue WHERE status = 'queued' ORDER BY created_at ASC")
            .fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let id_str: String = r.get("id");
            let recipients_json: String = r.get("recipients");
            out.push(QueuedMail {
                id: Uuid::parse_str(&id_str)?,
                recipients: serde_json::from_str(&recipients_json)?,
                subject: r.get("subject"),
                raw_message: r.get("raw_message"),
                status: r.get("status"),
            });
        }
        Ok(out)
    }

    async fn delete_expired(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let cutoff = stamp(cutoff);
        let files = sqlx::query("DELETE FROM report_files WHERE file_name LIKE ?1 AND created_at < ?2 AND is_private = 0")
            .bind(format!("{}%", REPORT_FILE_PREFIX))
            .bind(&cutoff)
            .execute(&self.pool)
            .await?;
        let cached = sqlx::query("DELETE FROM cached_reports WHERE created_at < ?1")
            .bind(&cutoff)
            .execute(&self.pool)
            .await?;
        Ok(files.rows_affected() + cached.rows_affected())
    }
}
