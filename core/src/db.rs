//! SQLite run history and remediation audit trail

use crate::detector::LeakVerdict;
use crate::executor::RemediationOutcome;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Memory,
    Leak,
    Cpu,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Memory => "memory",
            RunKind::Leak => "leak",
            RunKind::Cpu => "cpu",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub timestamp: i64,
    pub kind: String,
    pub sample_count: u32,
    pub data_file: Option<String>,
    pub net_growth: Option<f64>,
    pub suspected: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct RemediationRecord {
    pub id: i64,
    pub timestamp: i64,
    pub zombie_pid: u32,
    pub parent_pid: u32,
    pub success: bool,
    pub error: Option<String>,
}

impl Database {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "leakwatch")
            .map(|dirs| dirs.data_dir().join("history.db"))
            .unwrap_or_else(|| PathBuf::from("leakwatch.db"))
    }

    pub fn init_schema(&self) -> rusqlite::Result<()> {
        self.conn.execute_batch(include_str!("../schema.sql"))
    }

    fn now() -> i64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
    }

    pub fn insert_run(
        &self,
        kind: RunKind,
        sample_count: usize,
        data_file: Option<&Path>,
        verdict: Option<&LeakVerdict>,
    ) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO runs (timestamp, kind, sample_count, data_file, initial_value, final_value,
                               net_growth, rising_intervals, flat_or_falling_intervals, suspected)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                Self::now(),
                kind.as_str(),
                sample_count as i64,
                data_file.map(|p| p.to_string_lossy().into_owned()),
                verdict.map(|v| v.initial),
                verdict.map(|v| v.final_value),
                verdict.map(|v| v.net_growth),
                verdict.map(|v| v.rising_intervals as i64),
                verdict.map(|v| v.flat_or_falling_intervals as i64),
                verdict.map(|v| v.suspected as i32),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_runs(&self, limit: u32) -> rusqlite::Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, kind, sample_count, data_file, net_growth, suspected
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(RunRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                kind: row.get(2)?,
                sample_count: row.get(3)?,
                data_file: row.get(4)?,
                net_growth: row.get(5)?,
                suspected: row.get::<_, Option<i32>>(6)?.map(|s| s != 0),
            })
        })?;
        rows.collect()
    }

    pub fn insert_remediation(&self, outcome: &RemediationOutcome) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO remediations (timestamp, zombie_pid, parent_pid, success, error)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Self::now(),
                outcome.zombie_pid,
                outcome.parent_pid,
                outcome.success as i32,
                outcome.error,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_remediations(&self, limit: u32) -> rusqlite::Result<Vec<RemediationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, zombie_pid, parent_pid, success, error
             FROM remediations ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(RemediationRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                zombie_pid: row.get(2)?,
                parent_pid: row.get(3)?,
                success: row.get::<_, i32>(4)? != 0,
                error: row.get(5)?,
            })
        })?;
        rows.collect()
    }

    pub fn cleanup_old_data(&self, days: u32) -> rusqlite::Result<()> {
        let cutoff = Self::now() - (days as i64 * 86400);
        self.conn.execute("DELETE FROM runs WHERE timestamp < ?1", params![cutoff])?;
        self.conn.execute("DELETE FROM remediations WHERE timestamp < ?1", params![cutoff])?;
        Ok(())
    }
}
