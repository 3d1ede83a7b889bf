use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use tracing::{info, warn};

use crate::record::{Category, GameRecord, GameResult};

/// Column order shared by inserts and reads.
static GAME_COLUMNS: LazyLock<Vec<String>> = LazyLock::new(|| {
    let mut cols: Vec<String> = ["game_id", "white_username", "black_username", "white_rating", "black_rating"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    for category in Category::ALL {
        cols.push(format!("{}_white", category.column()));
        cols.push(format!("{}_black", category.column()));
    }
    cols.extend(["accuracy_white", "accuracy_black", "result"].map(String::from));
    cols
});

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS games (
            game_id          TEXT PRIMARY KEY,
            white_username   TEXT NOT NULL,
            black_username   TEXT NOT NULL,
            white_rating     INTEGER DEFAULT 0,
            black_rating     INTEGER DEFAULT 0,
            brilliant_white  INTEGER DEFAULT 0,
            brilliant_black  INTEGER DEFAULT 0,
            great_white      INTEGER DEFAULT 0,
            great_black      INTEGER DEFAULT 0,
            book_white       INTEGER DEFAULT 0,
            book_black       INTEGER DEFAULT 0,
            best_white       INTEGER DEFAULT 0,
            best_black       INTEGER DEFAULT 0,
            excellent_white  INTEGER DEFAULT 0,
            excellent_black  INTEGER DEFAULT 0,
            good_white       INTEGER DEFAULT 0,
            good_black       INTEGER DEFAULT 0,
            inaccuracy_white INTEGER DEFAULT 0,
            inaccuracy_black INTEGER DEFAULT 0,
            mistake_white    INTEGER DEFAULT 0,
            mistake_black    INTEGER DEFAULT 0,
            miss_white       INTEGER DEFAULT 0,
            miss_black       INTEGER DEFAULT 0,
            blunder_white    INTEGER DEFAULT 0,
            blunder_black    INTEGER DEFAULT 0,
            accuracy_white   REAL DEFAULT 0,
            accuracy_black   REAL DEFAULT 0,
            result           TEXT DEFAULT '',
            created_at       TEXT DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_games_white ON games(white_username);
        CREATE INDEX IF NOT EXISTS idx_games_black ON games(black_username);
        ",
    )?;
    migrate(conn)
}

fn table_columns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(games)")?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cols)
}

// ── Migrations ──

/// Bring databases written by older releases up to the current layout.
fn migrate(conn: &Connection) -> Result<()> {
    let cols = table_columns(conn)?;
    let has = |name: &str| cols.iter().any(|c| c == name);

    for legacy in ["white_id", "black_id"] {
        if has(legacy) {
            // DROP COLUMN needs SQLite 3.35+; older files keep the column.
            match conn.execute_batch(&format!("ALTER TABLE games DROP COLUMN {}", legacy)) {
                Ok(()) => info!("Dropped legacy column {}", legacy),
                Err(e) => warn!("Could not drop legacy column {}: {}", legacy, e),
            }
        }
    }

    let added = [
        ("accuracy_white", "REAL DEFAULT 0"),
        ("accuracy_black", "REAL DEFAULT 0"),
        ("result", "TEXT DEFAULT ''"),
    ];
    for (name, decl) in added {
        if !has(name) {
            conn.execute_batch(&format!("ALTER TABLE games ADD COLUMN {} {}", name, decl))
                .with_context(|| format!("Failed to add column {}", name))?;
            info!("Added column {}", name);
        }
    }
    Ok(())
}

// ── Games ──

fn game_values(g: &GameRecord) -> Vec<Value> {
    let mut values = vec![
        Value::Text(g.game_id.clone()),
        Value::Text(g.white_username.clone()),
        Value::Text(g.black_username.clone()),
        Value::Integer(g.white_rating.into()),
        Value::Integer(g.black_rating.into()),
    ];
    for (_, tally) in g.tallies.iter() {
        values.push(Value::Integer(tally.white.into()));
        values.push(Value::Integer(tally.black.into()));
    }
    values.push(Value::Real(g.white_accuracy));
    values.push(Value::Real(g.black_accuracy));
    values.push(Value::Text(g.result_str().to_string()));
    values
}

/// Insert or replace each record by `game_id`, in one transaction.
pub fn save_games(conn: &Connection, games: &[GameRecord]) -> Result<usize> {
    let sql = format!(
        "INSERT OR REPLACE INTO games ({}) VALUES ({})",
        GAME_COLUMNS.join(", "),
        (1..=GAME_COLUMNS.len()).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", "),
    );
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&sql)?;
        for g in games {
            count += stmt.execute(rusqlite::params_from_iter(game_values(g)))?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn upsert_game(conn: &Connection, game: &GameRecord) -> Result<()> {
    save_games(conn, std::slice::from_ref(game))?;
    Ok(())
}

fn get_u32(row: &Row, idx: usize) -> rusqlite::Result<u32> {
    let v: Option<i64> = row.get(idx)?;
    Ok(v.and_then(|v| u32::try_from(v).ok()).unwrap_or(0))
}

fn get_f64(row: &Row, idx: usize) -> rusqlite::Result<f64> {
    let v: Option<f64> = row.get(idx)?;
    Ok(v.unwrap_or(0.0))
}

fn get_text(row: &Row, idx: usize) -> rusqlite::Result<String> {
    let v: Option<String> = row.get(idx)?;
    Ok(v.unwrap_or_default())
}

fn game_from_row(row: &Row) -> rusqlite::Result<GameRecord> {
    let mut g = GameRecord {
        game_id: get_text(row, 0)?,
        white_username: get_text(row, 1)?,
        black_username: get_text(row, 2)?,
        white_rating: get_u32(row, 3)?,
        black_rating: get_u32(row, 4)?,
        ..Default::default()
    };
    let mut idx = 5;
    for category in Category::ALL {
        g.tallies[category].white = get_u32(row, idx)?;
        g.tallies[category].black = get_u32(row, idx + 1)?;
        idx += 2;
    }
    g.white_accuracy = get_f64(row, idx)?;
    g.black_accuracy = get_f64(row, idx + 1)?;
    g.result = GameResult::normalize(&get_text(row, idx + 2)?);
    Ok(g)
}

/// Every stored game, oldest first.
pub fn fetch_games(conn: &Connection) -> Result<Vec<GameRecord>> {
    let sql = format!(
        "SELECT {} FROM games ORDER BY created_at, game_id",
        GAME_COLUMNS.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], game_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_games(conn: &Connection) -> Result<usize> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM games", [], |r| r.get(0))?;
    Ok(n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn sample(id: &str) -> GameRecord {
        let mut g = GameRecord::new(id);
        g.white_username = "alice".into();
        g.black_username = "bob".into();
        g.white_rating = 1300;
        g.black_rating = 1450;
        g.white_accuracy = 76.6;
        g.black_accuracy = 81.5;
        g.result = Some(GameResult::BlackWins);
        g.tallies[Category::Brilliant].black = 1;
        g.tallies[Category::Blunder].white = 2;
        g
    }

    #[test]
    fn upsert_then_fetch() {
        let conn = memory_db();
        upsert_game(&conn, &sample("1")).unwrap();
        let games = fetch_games(&conn).unwrap();
        assert_eq!(games, vec![sample("1")]);
    }

    #[test]
    fn upsert_replaces_by_game_id() {
        let conn = memory_db();
        upsert_game(&conn, &sample("1")).unwrap();
        let mut again = sample("1");
        again.white_username = "carol".into();
        again.result = None;
        upsert_game(&conn, &again).unwrap();

        assert_eq!(count_games(&conn).unwrap(), 1);
        let games = fetch_games(&conn).unwrap();
        assert_eq!(games[0].white_username, "carol");
        assert_eq!(games[0].result, None);
    }

    #[test]
    fn batch_save() {
        let conn = memory_db();
        let saved = save_games(&conn, &[sample("1"), sample("2"), sample("1")]).unwrap();
        assert_eq!(saved, 3);
        assert_eq!(count_games(&conn).unwrap(), 2);
    }

    #[test]
    fn unknown_stored_result_reads_as_none() {
        let conn = memory_db();
        upsert_game(&conn, &sample("1")).unwrap();
        conn.execute("UPDATE games SET result = 'forfeit', accuracy_white = NULL", [])
            .unwrap();
        let g = &fetch_games(&conn).unwrap()[0];
        assert_eq!(g.result, None);
        assert_eq!(g.white_accuracy, 0.0);
    }

    #[test]
    fn migrates_legacy_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE games (
                game_id TEXT PRIMARY KEY,
                white_username TEXT NOT NULL,
                black_username TEXT NOT NULL,
                white_id TEXT,
                black_id TEXT,
                white_rating INTEGER DEFAULT 0,
                black_rating INTEGER DEFAULT 0,
                brilliant_white INTEGER DEFAULT 0, brilliant_black INTEGER DEFAULT 0,
                great_white INTEGER DEFAULT 0, great_black INTEGER DEFAULT 0,
                book_white INTEGER DEFAULT 0, book_black INTEGER DEFAULT 0,
                best_white INTEGER DEFAULT 0, best_black INTEGER DEFAULT 0,
                excellent_white INTEGER DEFAULT 0, excellent_black INTEGER DEFAULT 0,
                good_white INTEGER DEFAULT 0, good_black INTEGER DEFAULT 0,
                inaccuracy_white INTEGER DEFAULT 0, inaccuracy_black INTEGER DEFAULT 0,
                mistake_white INTEGER DEFAULT 0, mistake_black INTEGER DEFAULT 0,
                miss_white INTEGER DEFAULT 0, miss_black INTEGER DEFAULT 0,
                blunder_white INTEGER DEFAULT 0, blunder_black INTEGER DEFAULT 0,
                created_at TEXT DEFAULT (datetime('now'))
            );
            INSERT INTO games (game_id, white_username, black_username, white_id, brilliant_white)
            VALUES ('old', 'dan', 'eve', '42', 3);",
        )
        .unwrap();

        init_schema(&conn).unwrap();
        let cols = table_columns(&conn).unwrap();
        for c in ["accuracy_white", "accuracy_black", "result"] {
            assert!(cols.iter().any(|x| x == c), "missing {}", c);
        }
        assert!(!cols.iter().any(|x| x == "white_id"));

        let g = &fetch_games(&conn).unwrap()[0];
        assert_eq!(g.white_username, "dan");
        assert_eq!(g.tallies[Category::Brilliant].white, 3);
        assert_eq!(g.white_accuracy, 0.0);
        assert_eq!(g.result, None);

        // Idempotent on an up-to-date table.
        init_schema(&conn).unwrap();
    }
}
