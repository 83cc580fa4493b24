use std::path::PathBuf;

use rusqlite::{params, Connection};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub prompt: String,
    pub response: String,
    pub citations: Vec<String>,
}

fn db_path() -> PathBuf {
    Config::get_config_dir().join("history.sqlite")
}

fn ensure_dir() -> std::io::Result<()> {
    let dir = Config::get_config_dir();
    std::fs::create_dir_all(dir)
}

pub fn init() -> anyhow::Result<()> {
    ensure_dir()?;
    let conn = Connection::open(db_path())?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            prompt TEXT NOT NULL,
            response TEXT NOT NULL,
            citations TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        [],
    )?;
    Ok(())
}

pub fn add_entry(prompt: &str, response: &str, citations: &[String]) -> anyhow::Result<()> {
    ensure_dir()?;
    let conn = Connection::open(db_path())?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let citations_json = serde_json::to_string(citations)?;
    conn.execute(
        "INSERT INTO history (prompt, response, citations, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![prompt, response, citations_json, now],
    )?;
    Ok(())
}

pub fn last_entry() -> anyhow::Result<Option<HistoryEntry>> {
    ensure_dir()?;
    let conn = Connection::open(db_path())?;
    let mut stmt = conn.prepare(
        "SELECT prompt, response, citations
         FROM history
         ORDER BY created_at DESC, id DESC
         LIMIT 1",
    )?;
    let mut rows = stmt.query([])?;
    if let Some(row) = rows.next()? {
        let citations_json: String = row.get(2)?;
        Ok(Some(HistoryEntry {
            prompt: row.get(0)?,
            response: row.get(1)?,
            citations: serde_json::from_str(&citations_json).unwrap_or_default(),
        }))
    } else {
        Ok(None)
    }
}
