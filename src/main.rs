mod analytics;
mod db;
mod ids;
mod parser;
mod record;
mod report;
mod settings;

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use parser::extract::ReviewSelectors;
use record::{GameRecord, GameResult};

#[derive(Parser)]
#[command(name = "chess_review_stats", about = "Chess club statistics from saved game review pages")]
struct Cli {
    /// Database path (default: chess_analytics.db, or CHESS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every game listed in a CSV from saved review pages
    Collect {
        /// CSV with a game_id column (or ids/URLs in the first column)
        csv_file: PathBuf,
        /// Directory holding <game_id>.html pages
        #[arg(long)]
        pages_dir: Option<PathBuf>,
    },
    /// Extract a single saved review page
    Import {
        html_file: PathBuf,
        /// Game id (default: file name without extension)
        #[arg(long)]
        game_id: Option<String>,
    },
    /// Add a manually entered game (e.g. over-the-board league game)
    ManualPgn {
        /// Game identifier/code (e.g. jFY6SgYtW)
        pgn_code: String,
        white_username: String,
        black_username: String,
        /// PGN file (default: read from stdin when piped)
        #[arg(short = 'f', long)]
        pgn_file: Option<PathBuf>,
        /// Saved analysis page (accuracy, tallies, ratings)
        #[arg(long)]
        html_file: Option<PathBuf>,
        /// Game result, overrides the PGN or page
        #[arg(
            short,
            long,
            value_parser = PossibleValuesParser::new(["1-0", "0-1", "1/2-1/2"])
                .try_map(|s| s.parse::<GameResult>())
        )]
        result: Option<GameResult>,
    },
    /// Show player summaries
    Players {
        #[arg(long)]
        json: bool,
    },
    /// Show season overview
    Summary {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = settings::load()?;
    let db_path = cli.db.unwrap_or(settings.db_path);

    let result = match cli.command {
        Commands::Collect { csv_file, pages_dir } => {
            let text = std::fs::read_to_string(&csv_file)
                .with_context(|| format!("Failed to read {:?}", csv_file))?;
            let game_ids = ids::load_game_ids(&text);
            if game_ids.is_empty() {
                bail!("No valid game IDs found in {:?}", csv_file);
            }
            let pages_dir = pages_dir.unwrap_or(settings.pages_dir);
            let selectors = ReviewSelectors::new(&settings.selectors)?;
            println!("Found {} game(s) to process.", game_ids.len());

            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            let (games, failed) = collect_pages(&pages_dir, &game_ids, &selectors);
            let saved = db::save_games(&conn, &games)?;
            println!(
                "Saved {} games ({} failed), {} in database.",
                saved,
                failed,
                db::count_games(&conn)?
            );
            Ok(())
        }
        Commands::Import { html_file, game_id } => {
            let html = std::fs::read_to_string(&html_file)
                .with_context(|| format!("Failed to read {:?}", html_file))?;
            let game_id = match game_id {
                Some(id) => id,
                None => file_stem(&html_file)?,
            };
            let selectors = ReviewSelectors::new(&settings.selectors)?;
            let game = parser::parse_review_page_with(&html, &game_id, &selectors);

            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            db::upsert_game(&conn, &game)?;
            print_saved(&game);
            Ok(())
        }
        Commands::ManualPgn {
            pgn_code,
            white_username,
            black_username,
            pgn_file,
            html_file,
            result,
        } => {
            let mut game = if let Some(path) = html_file {
                let html = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {:?}", path))?;
                let selectors = ReviewSelectors::new(&settings.selectors)?;
                parser::parse_review_page_with(&html, &pgn_code, &selectors)
            } else if let Some(pgn) = read_pgn(pgn_file.as_deref())? {
                let headers = parser::parse_pgn_text(&pgn);
                GameRecord {
                    white_rating: headers.white_rating,
                    black_rating: headers.black_rating,
                    result: headers.result,
                    ..GameRecord::new(pgn_code.as_str())
                }
            } else if result.is_some() {
                info!("No PGN source, recording metadata only");
                GameRecord::new(pgn_code.as_str())
            } else {
                bail!("No PGN given. Pass --pgn-file, pipe it on stdin, or use --result to record metadata only.");
            };
            // Custom and editor games carry placeholder names on the page.
            game.white_username = white_username;
            game.black_username = black_username;
            if result.is_some() {
                game.result = result;
            }

            let conn = db::connect(&db_path)?;
            db::init_schema(&conn)?;
            db::upsert_game(&conn, &game)?;
            print_saved(&game);
            Ok(())
        }
        Commands::Players { json } => {
            let conn = open_existing(&db_path)?;
            let games = db::fetch_games(&conn)?;
            let stats = analytics::player_stats(&games);
            if json {
                println!("{}", report::to_json(&stats)?);
            } else if stats.is_empty() {
                println!("No player data yet. Run 'collect' first.");
            } else {
                print!("{}", report::players_text(&stats));
            }
            Ok(())
        }
        Commands::Summary { json } => {
            let conn = open_existing(&db_path)?;
            let games = db::fetch_games(&conn)?;
            let summary = analytics::season_summary(&games);
            if json {
                println!("{}", report::to_json(&summary)?);
            } else {
                print!("{}", report::summary_text(&summary));
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Extract each listed game from `<pages_dir>/<id>.html`. Returns the records
/// and how many pages could not be read.
fn collect_pages(
    pages_dir: &Path,
    game_ids: &[String],
    selectors: &ReviewSelectors,
) -> (Vec<GameRecord>, usize) {
    let pb = ProgressBar::new(game_ids.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut games = Vec::with_capacity(game_ids.len());
    let mut failed = 0;
    for game_id in game_ids {
        let path = pages_dir.join(format!("{}.html", game_id));
        match std::fs::read_to_string(&path) {
            Ok(html) => {
                let game = parser::parse_review_page_with(&html, game_id, selectors);
                if game.white_username.is_empty() && game.black_username.is_empty() {
                    warn!(game_id = %game_id, "no player names found on page");
                }
                games.push(game);
            }
            Err(e) => {
                warn!(game_id = %game_id, path = ?path, "failed to read page: {}", e);
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    (games, failed)
}

/// PGN from `path`, else from piped stdin. `None` when stdin is a terminal.
fn read_pgn(path: Option<&Path>) -> Result<Option<String>> {
    if let Some(path) = path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        return Ok(Some(text));
    }
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut text = String::new();
    stdin.read_to_string(&mut text).context("Failed to read PGN from stdin")?;
    Ok(Some(text))
}

fn open_existing(db_path: &Path) -> Result<rusqlite::Connection> {
    if !db_path.exists() {
        bail!("Database not found: {:?}. Run 'collect' first.", db_path);
    }
    let conn = db::connect(db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a game id from {:?}", path))
}

fn print_saved(g: &GameRecord) {
    let result = if g.result.is_some() { g.result_str() } else { "?" };
    let acc = if g.white_accuracy > 0.0 || g.black_accuracy > 0.0 {
        format!(" (W:{}% B:{}%)", g.white_accuracy, g.black_accuracy)
    } else {
        String::new()
    };
    println!(
        "Saved: {} vs {} ({}){}",
        truncate(&g.white_username, 32),
        truncate(&g.black_username, 32),
        result,
        acc
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn result_flag_accepts_closed_set() {
        let cli = Cli::try_parse_from(["x", "manual-pgn", "abc", "w", "b", "-r", "1/2-1/2"]).unwrap();
        match cli.command {
            Commands::ManualPgn { result, .. } => assert_eq!(result, Some(GameResult::Draw)),
            _ => panic!("wrong subcommand"),
        }
        assert!(Cli::try_parse_from(["x", "manual-pgn", "abc", "w", "b", "-r", "*"]).is_err());
        assert!(Cli::try_parse_from(["x", "manual-pgn", "abc", "w", "b", "-r", "2-0"]).is_err());
    }

    #[test]
    fn global_db_flag() {
        let cli = Cli::try_parse_from(["x", "players", "--db", "club.db", "--json"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("club.db")));
    }

    #[test]
    fn collect_from_pages_dir() {
        let ids = vec!["win_loss".to_string(), "missing".to_string()];
        let (games, failed) =
            collect_pages(Path::new("tests/fixtures"), &ids, ReviewSelectors::builtin());
        assert_eq!(failed, 1);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].game_id, "win_loss");
        assert_eq!(games[0].white_username, "white_player");
    }

    #[test]
    fn helpers() {
        assert_eq!(file_stem(Path::new("pages/1234.html")).unwrap(), "1234");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(format_duration(std::time::Duration::from_secs(75)), "1m 15s");
    }
}
