use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Host glue hands us the whole message; these are the command words it may still carry.
static COMMAND_PREFIX: OnceLock<Regex> = OnceLock::new();
static STORE_LINK: OnceLock<Regex> = OnceLock::new();

/// Fragment every storefront app URL contains.
pub const STORE_APP_MARKER: &str = "store.steampowered.com/app";

/// Max suggestions surfaced next to the chosen candidate (pool positions 2..6).
pub const MAX_SUGGESTIONS: usize = 5;

fn command_prefix() -> &'static Regex {
    COMMAND_PREFIX.get_or_init(|| {
        Regex::new(r"(?i)^[./／]*(史低|价格)\s*").expect("static command prefix regex")
    })
}

fn store_link() -> &'static Regex {
    STORE_LINK.get_or_init(|| {
        Regex::new(r"^https?://store\.steampowered\.com/app/(\d+)").expect("static store link regex")
    })
}

/// Raw user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameQuery {
    /// Storefront link with the app id already extracted.
    DirectLink { store_id: u64 },
    /// Text that looked like a link but did not match the storefront pattern.
    MalformedLink { raw: String },
    FreeText { text: String },
}

impl GameQuery {
    /// Classify the text left after the command prefix has been stripped.
    pub fn parse(input: &str) -> Self {
        let text = input.trim();
        if text.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("http")) {
            return match store_app_id(text) {
                Some(store_id) => GameQuery::DirectLink { store_id },
                None => GameQuery::MalformedLink {
                    raw: text.to_string(),
                },
            };
        }
        GameQuery::FreeText {
            text: text.to_string(),
        }
    }
}

/// Drop a leading `/史低`, `.价格`, ... so inner spaces and digits survive untouched.
pub fn strip_command_prefix(raw: &str) -> &str {
    match command_prefix().find(raw) {
        Some(m) => &raw[m.end()..],
        None => raw,
    }
}

/// Digits following `/app/` in a storefront link.
pub fn store_app_id(url: &str) -> Option<u64> {
    store_link()
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

/// Canonical storefront link for an app id.
pub fn store_url(app_id: u64) -> String {
    format!("https://store.steampowered.com/app/{app_id}")
}

/// True when the text carries CJK ideographs and therefore needs translation.
pub fn needs_translation(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// One hit from the aggregator text search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateGame {
    pub id: String,
    pub title: String,
    pub kind: Option<String>,
    pub urls: Vec<String>,
}

impl CandidateGame {
    pub fn is_game(&self) -> bool {
        self.kind.as_deref() == Some("game")
    }

    /// First embedded storefront app URL, if the search hit carried one.
    pub fn store_app_id(&self) -> Option<u64> {
        self.urls
            .iter()
            .filter(|u| u.contains(STORE_APP_MARKER))
            .find_map(|u| store_app_id(u))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Substring,
    FirstResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch {
    pub chosen: CandidateGame,
    pub kind: MatchKind,
    /// "Did you mean" titles, shown whether or not the match was exact.
    pub suggestions: Vec<String>,
}

fn norm(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pick the best candidate for `title`.
///
/// Exact (case/space-insensitive) beats substring in either direction; with
/// neither, the first candidate of the pool is taken rather than failing.
/// Returns `None` only for an empty candidate list.
pub fn pick_best(title: &str, candidates: &[CandidateGame]) -> Option<BestMatch> {
    let games: Vec<&CandidateGame> = candidates.iter().filter(|c| c.is_game()).collect();
    let pool: Vec<&CandidateGame> = if games.is_empty() {
        candidates.iter().collect()
    } else {
        games
    };
    let first = *pool.first()?;

    let wanted = norm(title);
    let exact = pool.iter().find(|c| norm(&c.title) == wanted);
    let (chosen, kind) = match exact {
        Some(c) => (*c, MatchKind::Exact),
        None => {
            let partial = pool.iter().find(|c| {
                let t = norm(&c.title);
                t.contains(&wanted) || wanted.contains(&t)
            });
            match partial {
                Some(c) => (*c, MatchKind::Substring),
                None => (first, MatchKind::FirstResult),
            }
        }
    };

    let suggestions = pool
        .iter()
        .skip(1)
        .take(MAX_SUGGESTIONS)
        .map(|c| {
            if c.title.trim().is_empty() {
                "未知".to_string()
            } else {
                c.title.clone()
            }
        })
        .collect();

    Some(BestMatch {
        chosen: chosen.clone(),
        kind,
        suggestions,
    })
}
