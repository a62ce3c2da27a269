use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OpenFlags, Transaction, params};
use serde::{Deserialize, Serialize};

use crate::config::app_cache_dir;
use crate::resolver::{Role, normalize_team_name};

/// Averaged per-role statistics carried by one historical row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SideStats {
    pub corners: f64,
    pub yellow_cards: f64,
    pub red_cards: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRow {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub season: i32,
    pub home_avg_corners: f64,
    pub home_avg_yellow_cards: f64,
    pub home_avg_red_cards: f64,
    pub away_avg_corners: f64,
    pub away_avg_yellow_cards: f64,
    pub away_avg_red_cards: f64,
}

impl HistoricalRow {
    pub fn team(&self, role: Role) -> &str {
        match role {
            Role::Home => &self.home_team,
            Role::Away => &self.away_team,
        }
    }

    /// Statistic columns belonging to `role`.
    pub fn side(&self, role: Role) -> SideStats {
        match role {
            Role::Home => SideStats {
                corners: self.home_avg_corners,
                yellow_cards: self.home_avg_yellow_cards,
                red_cards: self.home_avg_red_cards,
            },
            Role::Away => SideStats {
                corners: self.away_avg_corners,
                yellow_cards: self.away_avg_yellow_cards,
                red_cards: self.away_avg_red_cards,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub rows_read: usize,
    pub rows_upserted: usize,
    pub rows_skipped: usize,
    pub errors: Vec<String>,
}

/// In-memory, read-only view of the historical rows with a per-role name index.
#[derive(Debug, Clone, Default)]
pub struct HistoricalDataset {
    rows: Vec<HistoricalRow>,
    by_home: HashMap<String, Vec<usize>>,
    by_away: HashMap<String, Vec<usize>>,
}

impl HistoricalDataset {
    pub fn from_rows(rows: Vec<HistoricalRow>) -> Self {
        let mut by_home: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_away: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, row) in rows.iter().enumerate() {
            by_home
                .entry(normalize_team_name(&row.home_team))
                .or_default()
                .push(idx);
            by_away
                .entry(normalize_team_name(&row.away_team))
                .or_default()
                .push(idx);
        }
        Self {
            rows,
            by_home,
            by_away,
        }
    }

    /// Reads the store without touching its schema or the filesystem.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow!("dataset not found at {}", path.display()));
        }
        let conn = open_db_read_only(path)?;
        let rows = load_rows(&conn)?;
        Ok(Self::from_rows(rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[HistoricalRow] {
        &self.rows
    }

    /// Rows where the already-normalised `team_norm` played in `role`.
    pub fn rows_for(&self, team_norm: &str, role: Role) -> Vec<&HistoricalRow> {
        let index = match role {
            Role::Home => &self.by_home,
            Role::Away => &self.by_away,
        };
        index
            .get(team_norm)
            .map(|ids| ids.iter().map(|idx| &self.rows[*idx]).collect())
            .unwrap_or_default()
    }
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("team_stats.sqlite"))
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_db_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("open sqlite db read-only {}", path.display()))
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS team_match_stats (
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            league TEXT NOT NULL,
            season INTEGER NOT NULL,
            home_avg_corners REAL NOT NULL,
            home_avg_yellow_cards REAL NOT NULL,
            home_avg_red_cards REAL NOT NULL,
            away_avg_corners REAL NOT NULL,
            away_avg_yellow_cards REAL NOT NULL,
            away_avg_red_cards REAL NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (home_team, away_team, season)
        );
        CREATE INDEX IF NOT EXISTS idx_stats_home ON team_match_stats(home_team);
        CREATE INDEX IF NOT EXISTS idx_stats_away ON team_match_stats(away_team);
        CREATE INDEX IF NOT EXISTS idx_stats_league ON team_match_stats(league);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn upsert_row(tx: &Transaction<'_>, row: &HistoricalRow) -> Result<()> {
    tx.execute(
        "INSERT INTO team_match_stats(
            home_team, away_team, league, season,
            home_avg_corners, home_avg_yellow_cards, home_avg_red_cards,
            away_avg_corners, away_avg_yellow_cards, away_avg_red_cards,
            updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(home_team, away_team, season) DO UPDATE SET
            league = excluded.league,
            home_avg_corners = excluded.home_avg_corners,
            home_avg_yellow_cards = excluded.home_avg_yellow_cards,
            home_avg_red_cards = excluded.home_avg_red_cards,
            away_avg_corners = excluded.away_avg_corners,
            away_avg_yellow_cards = excluded.away_avg_yellow_cards,
            away_avg_red_cards = excluded.away_avg_red_cards,
            updated_at = excluded.updated_at",
        params![
            row.home_team,
            row.away_team,
            row.league,
            row.season,
            row.home_avg_corners,
            row.home_avg_yellow_cards,
            row.home_avg_red_cards,
            row.away_avg_corners,
            row.away_avg_yellow_cards,
            row.away_avg_red_cards,
            Utc::now().to_rfc3339(),
        ],
    )
    .with_context(|| {
        format!(
            "upsert stats row {} vs {} ({})",
            row.home_team, row.away_team, row.season
        )
    })?;
    Ok(())
}

pub fn load_rows(conn: &Connection) -> Result<Vec<HistoricalRow>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                home_team, away_team, league, season,
                home_avg_corners, home_avg_yellow_cards, home_avg_red_cards,
                away_avg_corners, away_avg_yellow_cards, away_avg_red_cards
            FROM team_match_stats
            ORDER BY season ASC, home_team ASC, away_team ASC
            "#,
        )
        .context("prepare load stats query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(HistoricalRow {
                home_team: row.get(0)?,
                away_team: row.get(1)?,
                league: row.get(2)?,
                season: row.get(3)?,
                home_avg_corners: row.get(4)?,
                home_avg_yellow_cards: row.get(5)?,
                home_avg_red_cards: row.get(6)?,
                away_avg_corners: row.get(7)?,
                away_avg_yellow_cards: row.get(8)?,
                away_avg_red_cards: row.get(9)?,
            })
        })
        .context("query load stats")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode stats row")?);
    }
    Ok(out)
}

/// Imports a training CSV (same column names as the table) into the store.
pub fn ingest_csv(conn: &mut Connection, db_path: PathBuf, csv_path: &Path) -> Result<IngestSummary> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("open csv {}", csv_path.display()))?;

    let mut rows_read = 0usize;
    let mut rows_upserted = 0usize;
    let mut rows_skipped = 0usize;
    let mut errors: Vec<String> = Vec::new();

    let tx = conn.transaction().context("begin ingest transaction")?;
    for (line, record) in reader.deserialize::<HistoricalRow>().enumerate() {
        rows_read += 1;
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                rows_skipped += 1;
                errors.push(format!("record {}: {err}", line + 1));
                continue;
            }
        };
        if row.home_team.trim().is_empty() || row.away_team.trim().is_empty() {
            rows_skipped += 1;
            errors.push(format!("record {}: empty team name", line + 1));
            continue;
        }
        upsert_row(&tx, &row)?;
        rows_upserted += 1;
    }
    tx.commit().context("commit ingest transaction")?;

    Ok(IngestSummary {
        db_path,
        rows_read,
        rows_upserted,
        rows_skipped,
        errors,
    })
}
