use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::record::{Category, Color, GameRecord, GameResult, PerCategory};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub username: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// Mean of the rating column, one decimal.
    pub avg_rating: f64,
    /// Mean accuracy, one decimal. Games with unknown (0.0) accuracy count.
    pub avg_accuracy: f64,
    pub totals: PerCategory<u64>,
    /// Per-game mean of each category, two decimals.
    pub per_game: PerCategory<f64>,
}

impl PlayerSummary {
    pub fn total(&self, category: Category) -> u64 {
        self.totals[category]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeasonSummary {
    pub total_games: u32,
    pub unique_players: u32,
    pub total_brilliant_moves: u64,
}

#[derive(Default)]
struct Accumulator {
    games: u32,
    wins: u32,
    losses: u32,
    draws: u32,
    rating_sum: u64,
    accuracy_sum: f64,
    totals: PerCategory<u64>,
}

impl Accumulator {
    fn add(&mut self, game: &GameRecord, color: Color) {
        self.games += 1;
        match game.result {
            Some(GameResult::Draw) => self.draws += 1,
            Some(r) => match r.winner() {
                Some(w) if w == color => self.wins += 1,
                Some(_) => self.losses += 1,
                None => {}
            },
            None => {}
        }
        self.rating_sum += u64::from(game.rating(color));
        self.accuracy_sum += game.accuracy(color);
        for (category, tally) in game.tallies.iter() {
            self.totals[category] += u64::from(tally.get(color));
        }
    }

    fn finish(self, username: &str) -> PlayerSummary {
        let games = self.games;
        let mean = |sum: f64| if games == 0 { 0.0 } else { sum / f64::from(games) };

        PlayerSummary {
            username: username.to_string(),
            games_played: games,
            wins: self.wins,
            losses: self.losses,
            draws: self.draws,
            avg_rating: round_to(mean(self.rating_sum as f64), 1),
            avg_accuracy: round_to(mean(self.accuracy_sum), 1),
            totals: self.totals,
            per_game: PerCategory::from_fn(|c| round_to(mean(self.totals[c] as f64), 2)),
        }
    }
}

/// Every (game, color) pair whose username is known.
fn sides(games: &[GameRecord]) -> impl Iterator<Item = (&GameRecord, Color)> {
    games.iter().flat_map(|g| {
        Color::BOTH
            .into_iter()
            .filter(move |&c| !g.username(c).is_empty())
            .map(move |c| (g, c))
    })
}

/// Per-player summaries, most brilliant moves first, then most games.
pub fn player_stats(games: &[GameRecord]) -> Vec<PlayerSummary> {
    let mut by_player: HashMap<&str, Accumulator> = HashMap::new();
    for (game, color) in sides(games) {
        by_player.entry(game.username(color)).or_default().add(game, color);
    }

    let mut stats: Vec<PlayerSummary> = by_player
        .into_iter()
        .map(|(username, acc)| acc.finish(username))
        .collect();
    stats.sort_by(|a, b| {
        b.total(Category::Brilliant)
            .cmp(&a.total(Category::Brilliant))
            .then(b.games_played.cmp(&a.games_played))
            .then_with(|| a.username.cmp(&b.username))
    });
    stats
}

pub fn season_summary(games: &[GameRecord]) -> SeasonSummary {
    let players: HashSet<&str> = sides(games).map(|(g, c)| g.username(c)).collect();
    let total_brilliant_moves = games
        .iter()
        .map(|g| {
            let t = g.tallies[Category::Brilliant];
            u64::from(t.white) + u64::from(t.black)
        })
        .sum();

    SeasonSummary {
        total_games: games.len() as u32,
        unique_players: players.len() as u32,
        total_brilliant_moves,
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
