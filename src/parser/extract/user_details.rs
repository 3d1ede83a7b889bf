use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::Sides;
use crate::parser::text::{safe_u32, unescape_backslashes};

static USER_DETAILS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)userDetails:\s*JSON\.parse\s*\(\s*"(.+?)"\s*\)"#).unwrap()
});

/// Per-side entry of the `userDetails` blob in the analysis config script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideDetails {
    pub username: Option<String>,
    pub game_rating: u32,
}

/// Decode `userDetails: JSON.parse("…")`. Missing or malformed blobs give
/// empty details for both sides.
pub fn extract(markup: &str) -> Sides<SideDetails> {
    let Some(caps) = USER_DETAILS_RE.captures(markup) else {
        return Sides::default();
    };
    let json = unescape_backslashes(&caps[1]);
    let value: Value = match serde_json::from_str(&json) {
        Ok(v) => v,
        Err(e) => {
            debug!("userDetails blob is not valid JSON: {}", e);
            return Sides::default();
        }
    };
    Sides::from_fn(|color| side(&value[color.as_str()]))
}

fn side(v: &Value) -> SideDetails {
    let game_rating = match v.get("gameRating") {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|r| u32::try_from(r).ok())
            .unwrap_or(0),
        Some(Value::String(s)) => safe_u32(Some(s)),
        _ => 0,
    };
    SideDetails {
        username: v.get("username").and_then(Value::as_str).map(str::to_string),
        game_rating,
    }
}
