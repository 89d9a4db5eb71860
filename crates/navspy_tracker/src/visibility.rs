//! Visibility evaluator
//!
//! Picks the most visible section out of an intersection batch. Only entries
//! that are currently intersecting take part; the highest ratio wins, and on
//! equal ratios the entry delivered first wins.

use navspy_core::IntersectionEntry;

use crate::reducer::{Proposal, SignalSource};
use crate::section::SectionId;

/// Select the proposal for one intersection batch
pub fn select(entries: &[IntersectionEntry]) -> Option<Proposal> {
    let mut best: Option<&IntersectionEntry> = None;

    for entry in entries.iter().filter(|e| e.is_intersecting) {
        match best {
            Some(current) if entry.ratio <= current.ratio => {}
            _ => best = Some(entry),
        }
    }

    best.map(|entry| Proposal {
        section: SectionId::new(&entry.target),
        confidence: entry.ratio,
        source: SignalSource::Visibility,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use navspy_core::Bounds;
    use std::time::Duration;

    fn entry(target: &str, ratio: f32, is_intersecting: bool) -> IntersectionEntry {
        IntersectionEntry {
            target: target.to_string(),
            time: Duration::ZERO,
            bounds: Bounds::default(),
            root_bounds: Bounds::default(),
            intersection: Bounds::default(),
            ratio,
            is_intersecting,
        }
    }

    #[test]
    fn test_highest_ratio_wins() {
        let proposal = select(&[entry("projects", 0.1, true), entry("connect", 0.8, true)]).unwrap();
        assert_eq!(proposal.section, "connect");
        assert_eq!(proposal.confidence, 0.8);
        assert_eq!(proposal.source, SignalSource::Visibility);
    }

    #[test]
    fn test_non_intersecting_entries_ignored() {
        assert!(select(&[entry("about", 0.0, false)]).is_none());
        assert!(select(&[]).is_none());

        let proposal = select(&[entry("about", 0.0, false), entry("skills", 0.0, true)]).unwrap();
        assert_eq!(proposal.section, "skills");
    }

    #[test]
    fn test_first_entry_wins_ties() {
        let proposal = select(&[
            entry("experience", 0.5, true),
            entry("projects", 0.5, true),
            entry("skills", 0.25, true),
        ])
        .unwrap();
        assert_eq!(proposal.section, "experience");
    }
}
