use chrono::{DateTime, Utc};
use mobc::{Manager, Pool};
use rusqlite::{Connection, Result as SqliteResult};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info};

fn log_rusqlite_error(context: &str, err: &rusqlite::Error) {
    error!("🔥 SQLite Error in {}: {:?}", context, err);

    if let rusqlite::Error::ExecuteReturnedResults = err {
        error!(
            "💥 EXECUTE_RETURNED_RESULTS: This means execute() was called on a SELECT statement!"
        );
        error!("🔧 Solution: Use query_row() or query_map() for SELECT statements");
    }
}

pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    pub fn new(db_path: String) -> Self {
        debug!("🔧 Creating SqliteManager for path: {}", db_path);
        Self { db_path }
    }
}

#[async_trait::async_trait]
impl Manager for SqliteManager {
    type Connection = Connection;
    type Error = rusqlite::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        debug!(
            "🔌 SqliteManager::connect() - Opening database: {}",
            self.db_path
        );

        let conn = match Connection::open(&self.db_path) {
            Ok(c) => c,
            Err(e) => {
                log_rusqlite_error("Connection::open", &e);
                return Err(e);
            }
        };

        // Some PRAGMA statements return a result row, so fall back to query_row
        // when execute() refuses them.
        let exec_pragma =
            |conn: &Connection, pragma: &str, name: &str| -> Result<(), rusqlite::Error> {
                match conn.execute(pragma, []) {
                    Ok(_) => Ok(()),
                    Err(rusqlite::Error::ExecuteReturnedResults) => {
                        match conn.query_row(pragma, [], |_| Ok(())) {
                            Ok(_) => Ok(()),
                            Err(e) => {
                                debug!("❌ {} failed with query_row: {}", name, e);
                                Err(e)
                            }
                        }
                    }
                    Err(e) => {
                        debug!("❌ {} failed with execute: {}", name, e);
                        Err(e)
                    }
                }
            };

        exec_pragma(&conn, "PRAGMA journal_mode=WAL", "PRAGMA journal_mode")?;
        exec_pragma(&conn, "PRAGMA synchronous=NORMAL", "PRAGMA synchronous")?;
        exec_pragma(&conn, "PRAGMA cache_size=1000000", "PRAGMA cache_size")?;
        exec_pragma(&conn, "PRAGMA temp_store=memory", "PRAGMA temp_store")?;
        exec_pragma(&conn, "PRAGMA mmap_size=268435456", "PRAGMA mmap_size")?;
        exec_pragma(&conn, "PRAGMA foreign_keys=ON", "PRAGMA foreign_keys")?;

        if let Err(e) = init_database(&conn) {
            log_rusqlite_error("init_database", &e);
            return Err(e);
        }

        debug!("✅ SqliteManager::connect() completed successfully");
        Ok(conn)
    }

    async fn check(&self, conn: Self::Connection) -> Result<Self::Connection, Self::Error> {
        match conn.query_row("SELECT 1", [], |_| Ok(())) {
            Ok(_) => Ok(conn),
            Err(e) => {
                log_rusqlite_error("connection check", &e);
                Err(e)
            }
        }
    }
}

fn init_database(conn: &Connection) -> SqliteResult<()> {
    debug!("🏗️ init_database() - Creating tables and indexes...");

    create_jobs_table(conn)?;
    create_results_table(conn)?;
    create_indexes(conn)?;

    debug!("✅ init_database() completed successfully");
    Ok(())
}

pub type DbPool = Pool<SqliteManager>;

pub async fn create_db_pool(
    db_path: &str,
) -> Result<DbPool, Box<dyn std::error::Error + Send + Sync>> {
    debug!(
        "🏊 create_db_pool() - Creating connection pool for: {}",
        db_path
    );

    // Ensure directory exists
    if let Some(parent) = Path::new(db_path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let manager = SqliteManager::new(db_path.to_string());
    let pool = Pool::builder().max_open(10).max_idle(5).build(manager);

    info!("✓ SQLite connection pool created: {}", db_path);
    Ok(pool)
}

fn create_jobs_table(conn: &Connection) -> SqliteResult<()> {
    debug!("📋 Creating jobs table...");
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            sheet_url TEXT,
            column_name TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            total_urls INTEGER NOT NULL DEFAULT 0,
            processed_urls INTEGER NOT NULL DEFAULT 0,
            progress INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;
    debug!("✅ Jobs table created");
    Ok(())
}

fn create_results_table(conn: &Connection) -> SqliteResult<()> {
    debug!("📧 Creating results table...");
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            website TEXT NOT NULL,
            email TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(job_id, website)
        )
        "#,
        [],
    )?;
    debug!("✅ Results table created");
    Ok(())
}

fn create_indexes(conn: &Connection) -> SqliteResult<()> {
    debug!("🔗 Creating database indexes...");
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_jobs_owner ON jobs(owner_id)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status)",
        "CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_results_job ON results(job_id)",
        "CREATE INDEX IF NOT EXISTS idx_results_email ON results(email)",
    ];

    for (i, index_sql) in indexes.iter().enumerate() {
        if let Err(e) = conn.execute(index_sql, []) {
            log_rusqlite_error(&format!("create index {}", i + 1), &e);
            return Err(e);
        }
    }

    debug!("✅ All indexes created successfully");
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct DatabaseStats {
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub total_results: i64,
    pub results_with_email: i64,
    pub email_hit_rate: f64,
    pub recent_jobs: Vec<JobSummary>,
}

#[derive(Debug, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub progress: i64,
    pub total_urls: i64,
    pub created_at: Option<DateTime<Utc>>,
}

pub async fn get_database_stats(
    pool: &DbPool,
) -> Result<DatabaseStats, Box<dyn std::error::Error + Send + Sync>> {
    debug!("📊 get_database_stats() - Collecting database statistics...");

    let conn = match pool.get().await {
        Ok(c) => c,
        Err(e) => {
            error!("💥 Failed to get connection from pool: {}", e);
            return Err(Box::new(e));
        }
    };

    let table_exists = |table_name: &str| -> Result<bool, rusqlite::Error> {
        let query = "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1";
        match conn.query_row(query, [table_name], |row| row.get::<_, i64>(0)) {
            Ok(count) => Ok(count > 0),
            Err(e) => {
                log_rusqlite_error(&format!("table_exists check for '{}'", table_name), &e);
                Err(e)
            }
        }
    };

    let count = |query: &str| -> Result<i64, rusqlite::Error> {
        conn.query_row(query, [], |row| row.get::<_, i64>(0))
    };

    let jobs_table_exists = table_exists("jobs")?;
    let results_table_exists = table_exists("results")?;

    let (total_jobs, active_jobs, completed_jobs, failed_jobs) = if jobs_table_exists {
        (
            count("SELECT COUNT(*) FROM jobs")?,
            count("SELECT COUNT(*) FROM jobs WHERE status IN ('pending', 'processing')")?,
            count("SELECT COUNT(*) FROM jobs WHERE status = 'completed'")?,
            count("SELECT COUNT(*) FROM jobs WHERE status = 'failed'")?,
        )
    } else {
        debug!("⏭️ Jobs table doesn't exist, returning zeros");
        (0, 0, 0, 0)
    };

    let (total_results, results_with_email) = if results_table_exists {
        (
            count("SELECT COUNT(*) FROM results")?,
            count("SELECT COUNT(*) FROM results WHERE email IS NOT NULL AND email != ''")?,
        )
    } else {
        debug!("⏭️ Results table doesn't exist, returning zeros");
        (0, 0)
    };

    let email_hit_rate = if total_results > 0 {
        (results_with_email as f64 / total_results as f64) * 100.0
    } else {
        0.0
    };

    let mut recent_jobs = Vec::new();
    if jobs_table_exists {
        let mut stmt = conn.prepare(
            "SELECT id, name, status, progress, total_urls, created_at
             FROM jobs ORDER BY created_at DESC LIMIT 10",
        )?;

        let job_iter = stmt.query_map([], |row| {
            let created_at_str: Option<String> = row.get(5)?;
            let created_at = created_at_str.and_then(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            });

            Ok(JobSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                status: row.get(2)?,
                progress: row.get(3)?,
                total_urls: row.get(4)?,
                created_at,
            })
        })?;

        for job in job_iter {
            recent_jobs.push(job?);
        }
    }

    let stats = DatabaseStats {
        total_jobs,
        active_jobs,
        completed_jobs,
        failed_jobs,
        total_results,
        results_with_email,
        email_hit_rate,
        recent_jobs,
    };

    debug!("✅ get_database_stats() completed successfully");
    Ok(stats)
}

// Pooled connections each open the database path themselves, so tests need a
// shared on-disk file rather than :memory:.
#[cfg(test)]
pub(crate) async fn test_db_pool() -> DbPool {
    let path = std::env::temp_dir().join(format!("email_scout_test_{}.db", uuid::Uuid::new_v4()));
    create_db_pool(path.to_str().unwrap()).await.unwrap()
}
