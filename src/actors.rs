//! Actor rollup over the aggregated event list.
//!
//! Literal, case-sensitive substring scan of `title summary` for each known
//! actor. Counts every mention; only `statement` events update the last
//! statement fields, and the newest statement wins whatever the input order
//! (ties keep the first one seen).

use crate::ingest::types::{ActorStatus, CrisisEvent, EventCategory};
use std::collections::HashMap;

pub struct KnownActor {
    pub name: &'static str,
    pub flag: &'static str,
    pub role: &'static str,
}

const fn actor(name: &'static str, flag: &'static str, role: &'static str) -> KnownActor {
    KnownActor { name, flag, role }
}

pub const KNOWN_ACTORS: &[KnownActor] = &[
    actor("Biden", "🇺🇸", "US President"),
    actor("Trump", "🇺🇸", "US President"),
    actor("Netanyahu", "🇮🇱", "Israeli PM"),
    actor("Khamenei", "🇮🇷", "Supreme Leader"),
    actor("IRGC", "🇮🇷", "Islamic Revolutionary Guard"),
    actor("Raisi", "🇮🇷", "Iranian President"),
    actor("Pezeshkian", "🇮🇷", "Iranian President"),
    actor("Guterres", "🇺🇳", "UN Secretary-General"),
    actor("Zelenskyy", "🇺🇦", "Ukrainian President"),
    actor("Putin", "🇷🇺", "Russian President"),
    actor("Xi Jinping", "🇨🇳", "Chinese President"),
    actor("Macron", "🇫🇷", "French President"),
    actor("Erdogan", "🇹🇷", "Turkish President"),
    actor("MBS", "🇸🇦", "Saudi Crown Prince"),
    actor("Hezbollah", "🇱🇧", "Lebanese Militia"),
    actor("Hamas", "🇵🇸", "Palestinian Militant Group"),
    actor("Houthis", "🇾🇪", "Yemeni Armed Group"),
    actor("IDF", "🇮🇱", "Israel Defense Forces"),
    actor("Pentagon", "🇺🇸", "US Dept of Defense"),
    actor("NATO", "🏳️", "North Atlantic Treaty Org"),
];

/// First known actor named in `text`, in table order.
pub fn primary_actor(text: &str) -> Option<&'static str> {
    KNOWN_ACTORS
        .iter()
        .find(|a| text.contains(a.name))
        .map(|a| a.name)
}

pub fn extract_actors(events: &[CrisisEvent]) -> Vec<ActorStatus> {
    // name -> index into `out`, keeps first-seen order for equal counts
    let mut index: HashMap<&'static str, usize> = HashMap::new();
    let mut out: Vec<ActorStatus> = Vec::new();

    for ev in events {
        let text = format!("{} {}", ev.title, ev.summary);
        let is_statement = ev.category == EventCategory::Statement;

        for known in KNOWN_ACTORS {
            if !text.contains(known.name) {
                continue;
            }
            let slot = *index.entry(known.name).or_insert_with(|| {
                out.push(ActorStatus {
                    name: known.name.to_string(),
                    flag: known.flag.to_string(),
                    role: known.role.to_string(),
                    last_statement: None,
                    last_statement_time: None,
                    event_count: 0,
                });
                out.len() - 1
            });

            let status = &mut out[slot];
            status.event_count += 1;
            let newer = status
                .last_statement_time
                .map_or(true, |seen| ev.timestamp > seen);
            if is_statement && newer {
                status.last_statement = Some(ev.title.clone());
                status.last_statement_time = Some(ev.timestamp);
            }
        }
    }

    out.sort_by(|a, b| b.event_count.cmp(&a.event_count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{SourceTier, ThreatLevel};
    use chrono::{TimeZone, Utc};

    fn ev(title: &str, category: EventCategory, secs: i64) -> CrisisEvent {
        CrisisEvent {
            id: format!("t:{title}"),
            title: title.into(),
            summary: title.into(),
            category,
            level: ThreatLevel::Info,
            location: None,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            source: "test".into(),
            source_tier: SourceTier::Public,
            url: None,
            actor: None,
            entities: None,
        }
    }

    #[test]
    fn statement_sets_last_statement_and_counts_all() {
        let events = vec![
            ev("Netanyahu warns of response", EventCategory::Statement, 200),
            ev("Netanyahu visits troops", EventCategory::Military, 100),
        ];
        let actors = extract_actors(&events);
        assert_eq!(actors.len(), 1);
        let n = &actors[0];
        assert_eq!(n.name, "Netanyahu");
        assert_eq!(n.event_count, 2);
        assert_eq!(n.last_statement.as_deref(), Some("Netanyahu warns of response"));
        assert_eq!(n.last_statement_time, Some(Utc.timestamp_opt(200, 0).unwrap()));
    }

    #[test]
    fn newest_statement_wins_in_either_order() {
        let newest_first = vec![
            ev("Netanyahu warns of response", EventCategory::Statement, 300),
            ev("Netanyahu says talks ongoing", EventCategory::Statement, 100),
        ];
        let mut oldest_first = newest_first.clone();
        oldest_first.reverse();

        for events in [newest_first, oldest_first] {
            let n = &extract_actors(&events)[0];
            assert_eq!(n.event_count, 2);
            assert_eq!(n.last_statement.as_deref(), Some("Netanyahu warns of response"));
            assert_eq!(n.last_statement_time, Some(Utc.timestamp_opt(300, 0).unwrap()));
        }
    }

    #[test]
    fn sorted_by_count_desc() {
        let events = vec![
            ev("Putin speaks", EventCategory::Statement, 3),
            ev("Hamas and IDF clash", EventCategory::Conflict, 2),
            ev("IDF update", EventCategory::Military, 1),
        ];
        let actors = extract_actors(&events);
        assert_eq!(actors[0].name, "IDF");
        assert_eq!(actors[0].event_count, 2);
        assert!(actors[0].last_statement.is_none());
        assert_eq!(actors.len(), 3);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(extract_actors(&[ev("nato summit", EventCategory::Diplomatic, 1)]).is_empty());
        assert_eq!(primary_actor("Talks with Trump and Putin"), Some("Trump"));
        assert_eq!(primary_actor("no one"), None);
    }
}
