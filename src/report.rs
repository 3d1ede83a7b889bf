use std::fmt::Write;

use anyhow::Result;
use serde::Serialize;

use crate::analytics::{PlayerSummary, SeasonSummary};
use crate::record::Category;

pub fn players_text(stats: &[PlayerSummary]) -> String {
    let mut out = String::from("\n=== Player Summaries ===\n\n");
    for s in stats {
        let t = |c: Category| s.total(c);
        let _ = writeln!(out, "  {}", s.username);
        let _ = writeln!(
            out,
            "    Games: {}  (W: {}  L: {}  D: {})  |  Avg Rating: {:.1}  |  Avg Accuracy: {}",
            s.games_played,
            s.wins,
            s.losses,
            s.draws,
            s.avg_rating,
            accuracy_label(s.avg_accuracy)
        );
        let _ = writeln!(
            out,
            "    Brilliant: {}  Great: {}  Best: {}  Book: {}",
            t(Category::Brilliant),
            t(Category::Great),
            t(Category::Best),
            t(Category::Book)
        );
        let _ = writeln!(
            out,
            "    Excellent: {}  Good: {}",
            t(Category::Excellent),
            t(Category::Good)
        );
        let _ = writeln!(
            out,
            "    Inaccuracies: {}  Mistakes: {}  Miss: {}  Blunders: {}",
            t(Category::Inaccuracy),
            t(Category::Mistake),
            t(Category::Miss),
            t(Category::Blunder)
        );
        out.push('\n');
    }
    out
}

pub fn summary_text(s: &SeasonSummary) -> String {
    format!(
        "\n=== Season Overview ===\n\n  Total games: {}\n  Unique players: {}\n  Total Brilliant moves: {}\n",
        s.total_games, s.unique_players, s.total_brilliant_moves
    )
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Zero accuracy means no review data, shown as a dash.
fn accuracy_label(acc: f64) -> String {
    if acc > 0.0 {
        format!("{:.1}%", acc)
    } else {
        "—".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::player_stats;
    use crate::record::{GameRecord, GameResult};

    fn games() -> Vec<GameRecord> {
        let mut g = GameRecord::new("1");
        g.white_username = "alice".into();
        g.black_username = "bob".into();
        g.white_rating = 1300;
        g.black_rating = 1450;
        g.black_accuracy = 81.5;
        g.result = Some(GameResult::BlackWins);
        g.tallies[Category::Brilliant].black = 1;
        vec![g]
    }

    #[test]
    fn player_block() {
        let text = players_text(&player_stats(&games()));
        assert!(text.starts_with("\n=== Player Summaries ===\n"));
        assert!(text.contains(
            "  bob\n    Games: 1  (W: 1  L: 0  D: 0)  |  Avg Rating: 1450.0  |  Avg Accuracy: 81.5%\n"
        ));
        assert!(text.contains("Avg Accuracy: —\n"));
        assert!(text.contains("    Brilliant: 1  Great: 0  Best: 0  Book: 0\n"));
        // bob has the brilliant move, so is listed first.
        assert!(text.find("  bob").unwrap() < text.find("  alice").unwrap());
    }

    #[test]
    fn season_block() {
        let s = SeasonSummary {
            total_games: 2,
            unique_players: 2,
            total_brilliant_moves: 3,
        };
        let text = summary_text(&s);
        assert!(text.contains("  Total games: 2\n"));
        assert!(text.contains("  Total Brilliant moves: 3\n"));
    }

    #[test]
    fn json_output() {
        let stats = player_stats(&games());
        let v: serde_json::Value = serde_json::from_str(&to_json(&stats).unwrap()).unwrap();
        assert_eq!(v[0]["username"], "bob");
        assert_eq!(v[0]["totals"]["brilliant"], 1);
        assert_eq!(v[1]["avg_accuracy"], 0.0);
    }
}
