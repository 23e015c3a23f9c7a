//! Shared text heuristics: the geopolitical relevance gate and the ordered
//! category cascade used by the wire, GDELT, digest and social providers.
//!
//! Pattern order matters. The first pattern that matches wins, so text that
//! mentions both "missile" and "attack" is `Military`, not `Conflict`.

use crate::ingest::types::EventCategory;
use once_cell::sync::Lazy;
use regex::Regex;

const GEO_KEYWORDS: &[&str] = &[
    "crisis",
    "conflict",
    "military",
    "attack",
    "strike",
    "war",
    "nuclear",
    "sanctions",
    "missile",
    "troops",
    "bombing",
    "invasion",
    "casualties",
    "killed",
    "weapon",
    "airstrike",
    "explosion",
    "terror",
    "hostage",
    "coup",
    "blockade",
    "escalation",
    "martial",
];

static GEO_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i){}", GEO_KEYWORDS.join("|"))).unwrap());

/// Relevance gate: does the text mention anything geopolitical at all?
pub fn is_geopolitical(text: &str) -> bool {
    GEO_PATTERN.is_match(text)
}

static CATEGORY_CASCADE: Lazy<Vec<(Regex, EventCategory)>> = Lazy::new(|| {
    [
        (
            r"nuclear|missile|troops|military|army|navy|air\s?force|pentagon|defense",
            EventCategory::Military,
        ),
        (
            r"attack|war|combat|battle|fighting|clash|killed|casualties",
            EventCategory::Conflict,
        ),
        (
            r"terror|isis|al.?qaeda|bomb|explosion|hostage",
            EventCategory::Terrorism,
        ),
        (
            r"earthquake|tsunami|hurricane|flood|volcano|wildfire",
            EventCategory::Disaster,
        ),
        (
            r"diplomat|embassy|treaty|summit|negotiate|un\s|united\snations",
            EventCategory::Diplomatic,
        ),
        (
            r"sanction|tariff|trade\swar|market|economy|inflation|oil\sprice",
            EventCategory::Economic,
        ),
        (
            r"statement|says|warns|announces|declares|condemns|urges",
            EventCategory::Statement,
        ),
    ]
    .into_iter()
    .map(|(p, c)| (Regex::new(&format!("(?i){p}")).unwrap(), c))
    .collect()
});

/// First matching pattern wins; `fallback` when nothing matches.
pub fn detect_category_or(text: &str, fallback: EventCategory) -> EventCategory {
    CATEGORY_CASCADE
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, c)| *c)
        .unwrap_or(fallback)
}

/// Cascade with the usual `Statement` fallback.
pub fn detect_category(text: &str) -> EventCategory {
    detect_category_or(text, EventCategory::Statement)
}
