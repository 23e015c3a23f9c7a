//! Keyword threat scorer shared by every text-based provider.
//!
//! A per-category base offset plus keyword tiers scanned over the lowercased
//! `title summary`. Any critical keyword short-circuits to `Critical`;
//! otherwise high keywords add 2 and medium keywords add 1, and the total maps
//! to `{>=4 High, >=2 Medium, >=1 Low, else Info}`.

use crate::ingest::types::{EventCategory, ThreatLevel};

const CRITICAL_KEYWORDS: &[&str] = &[
    "nuclear",
    "airstrike",
    "invasion",
    "war declared",
    "missile launch",
    "chemical weapon",
    "biological weapon",
    "nuke",
    "wmd",
];

const HIGH_KEYWORDS: &[&str] = &[
    "strike",
    "attack",
    "casualties",
    "killed",
    "bombing",
    "explosion",
    "military operation",
    "retaliation",
    "troops deployed",
    "sanctions",
    "blockade",
    "no-fly zone",
    "martial law",
];

const MEDIUM_KEYWORDS: &[&str] = &[
    "tensions",
    "escalation",
    "threat",
    "warning",
    "mobilization",
    "protest",
    "embargo",
    "diplomatic crisis",
    "cyber attack",
    "oil price",
    "market crash",
];

fn category_offset(category: EventCategory) -> i32 {
    match category {
        EventCategory::Conflict | EventCategory::Military | EventCategory::Terrorism => 2,
        EventCategory::Disaster => 1,
        EventCategory::Prediction => -1,
        EventCategory::Statement
        | EventCategory::Diplomatic
        | EventCategory::Economic
        | EventCategory::Earthquake => 0,
    }
}

/// Raw score before banding; `None` means a critical keyword matched.
pub fn threat_score(title: &str, summary: &str, category: EventCategory) -> Option<i32> {
    let text = format!("{title} {summary}").to_lowercase();

    if CRITICAL_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return None;
    }

    let mut score = category_offset(category);
    score += 2 * HIGH_KEYWORDS.iter().filter(|kw| text.contains(*kw)).count() as i32;
    score += MEDIUM_KEYWORDS.iter().filter(|kw| text.contains(*kw)).count() as i32;
    Some(score)
}

pub fn score_threat_level(title: &str, summary: &str, category: EventCategory) -> ThreatLevel {
    match threat_score(title, summary, category) {
        None => ThreatLevel::Critical,
        Some(s) if s >= 4 => ThreatLevel::High,
        Some(s) if s >= 2 => ThreatLevel::Medium,
        Some(s) if s >= 1 => ThreatLevel::Low,
        Some(_) => ThreatLevel::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_keyword_short_circuits() {
        assert_eq!(
            score_threat_level("Nuclear strike imminent", "", EventCategory::Conflict),
            ThreatLevel::Critical
        );
        // Even with a negative base offset
        assert_eq!(
            score_threat_level("Will there be an invasion?", "", EventCategory::Prediction),
            ThreatLevel::Critical
        );
    }

    #[test]
    fn no_hits_on_neutral_category_is_info() {
        assert_eq!(
            score_threat_level("Officials hold talks", "", EventCategory::Diplomatic),
            ThreatLevel::Info
        );
    }

    #[test]
    fn two_medium_hits_score_two_is_medium() {
        // "protest" +1, "escalation" +1 on base 0 -> 2
        assert_eq!(
            threat_score("Protest escalation reported", "", EventCategory::Statement),
            Some(2)
        );
        assert_eq!(
            score_threat_level("Protest escalation reported", "", EventCategory::Statement),
            ThreatLevel::Medium
        );
    }

    #[test]
    fn category_offset_alone_bands() {
        assert_eq!(
            score_threat_level("Quiet day", "", EventCategory::Conflict),
            ThreatLevel::Medium
        );
        assert_eq!(
            score_threat_level("Quiet day", "", EventCategory::Disaster),
            ThreatLevel::Low
        );
        assert_eq!(
            score_threat_level("Quiet day", "", EventCategory::Prediction),
            ThreatLevel::Info
        );
    }

    #[test]
    fn high_keywords_accumulate() {
        // "strike" +2, "casualties" +2 on base 0 -> 4
        assert_eq!(
            score_threat_level("Strike leaves casualties", "", EventCategory::Statement),
            ThreatLevel::High
        );
        // summary text is scanned too
        assert_eq!(
            score_threat_level("Update", "sanctions announced", EventCategory::Economic),
            ThreatLevel::Medium
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(
            score_threat_level("MARTIAL LAW declared", "", EventCategory::Statement),
            ThreatLevel::Medium
        );
    }
}
