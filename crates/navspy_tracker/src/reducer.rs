//! Active-state reducer
//!
//! The single writer of the published active section. Both evaluators feed it
//! proposals and the most recent one wins; there is no priority between the
//! sources and a proposal is never rejected for looking worse than the current
//! state.
//!
//! State machine:
//!
//! ```text
//! Uninitialized (None) --proposal--> Active(id) --proposal--> Active(id')
//!                       \
//!                        `--close--> Closed (every proposal ignored)
//! ```
//!
//! Proposals naming a section outside the resolved set are ignored, so the
//! published id is always one of the resolved sections.

use std::cell::{Cell, RefCell};

use navspy_core::{ReadSignal, StateCell};
use rustc_hash::FxHashSet;

use crate::section::SectionId;

/// Which evaluator produced a proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalSource {
    Visibility,
    Proximity,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Visibility => "visibility",
            SignalSource::Proximity => "proximity",
        }
    }
}

/// An evaluator's suggestion for the active section
#[derive(Clone, Debug, PartialEq)]
pub struct Proposal {
    pub section: SectionId,
    /// Intersection ratio, or `1 / (1 + distance)` for proximity. Reported
    /// only; never used to reject a proposal.
    pub confidence: f32,
    pub source: SignalSource,
}

/// What happened to a proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acceptance {
    /// Accepted and the active section changed
    Published,
    /// Accepted, but the section was already active
    Unchanged,
    /// Not a resolved section, or the reducer is closed
    Ignored,
}

/// Counters kept by the reducer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReducerStats {
    pub accepted: u64,
    pub published: u64,
    pub ignored: u64,
}

/// Merges proposals into the published active section
pub struct Reducer {
    active: StateCell<Option<SectionId>>,
    resolved: RefCell<FxHashSet<SectionId>>,
    closed: Cell<bool>,
    stats: Cell<ReducerStats>,
}

impl Reducer {
    pub fn new() -> Self {
        Self {
            active: StateCell::new(None),
            resolved: RefCell::new(FxHashSet::default()),
            closed: Cell::new(false),
            stats: Cell::new(ReducerStats::default()),
        }
    }

    /// Set the sections proposals may name
    pub fn set_resolved<'a>(&self, ids: impl IntoIterator<Item = &'a SectionId>) {
        *self.resolved.borrow_mut() = ids.into_iter().cloned().collect();
    }

    pub fn accept(&self, proposal: Proposal) -> Acceptance {
        let mut stats = self.stats.get();

        if self.closed.get() || !self.resolved.borrow().contains(&proposal.section) {
            stats.ignored += 1;
            self.stats.set(stats);
            tracing::trace!(
                section = %proposal.section,
                source = proposal.source.as_str(),
                closed = self.closed.get(),
                "proposal ignored"
            );
            return Acceptance::Ignored;
        }

        stats.accepted += 1;
        let section = proposal.section.clone();
        // Stats are stored before publishing so subscribers see them
        let changed = self.active.get().as_ref() != Some(&section);
        if changed {
            stats.published += 1;
        }
        self.stats.set(stats);

        if !changed {
            return Acceptance::Unchanged;
        }

        tracing::debug!(
            section = %section,
            source = proposal.source.as_str(),
            confidence = proposal.confidence,
            "active section changed"
        );
        self.active.set(Some(section));
        Acceptance::Published
    }

    /// Currently published section
    pub fn active(&self) -> Option<SectionId> {
        self.active.get()
    }

    pub fn reader(&self) -> ReadSignal<Option<SectionId>> {
        self.active.reader()
    }

    /// Stop accepting proposals and detach every subscriber
    pub fn close(&self) {
        self.closed.set(true);
        self.active.clear_subscribers();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub fn stats(&self) -> ReducerStats {
        self.stats.get()
    }
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn proposal(id: &str, source: SignalSource) -> Proposal {
        Proposal {
            section: SectionId::from(id),
            confidence: 0.5,
            source,
        }
    }

    fn reducer() -> Reducer {
        let reducer = Reducer::new();
        let ids = [SectionId::from("about"), SectionId::from("projects")];
        reducer.set_resolved(ids.iter());
        reducer
    }

    #[test]
    fn test_starts_uninitialized() {
        assert_eq!(reducer().active(), None);
    }

    #[test]
    fn test_last_write_wins_across_sources() {
        let reducer = reducer();

        assert_eq!(reducer.accept(proposal("about", SignalSource::Visibility)), Acceptance::Published);
        assert_eq!(reducer.accept(proposal("projects", SignalSource::Proximity)), Acceptance::Published);
        assert_eq!(reducer.active(), Some(SectionId::from("projects")));

        // A lower-confidence proposal still wins by recency
        let weak = Proposal {
            confidence: 0.01,
            ..proposal("about", SignalSource::Visibility)
        };
        assert_eq!(reducer.accept(weak), Acceptance::Published);
        assert_eq!(reducer.active(), Some(SectionId::from("about")));

        assert_eq!(reducer.accept(proposal("about", SignalSource::Proximity)), Acceptance::Unchanged);
        assert_eq!(
            reducer.stats(),
            ReducerStats {
                accepted: 4,
                published: 3,
                ignored: 0
            }
        );
    }

    #[test]
    fn test_unresolved_section_ignored() {
        let reducer = reducer();
        assert_eq!(reducer.accept(proposal("skills", SignalSource::Visibility)), Acceptance::Ignored);
        assert_eq!(reducer.active(), None);
    }

    #[test]
    fn test_closed_reducer_is_silent() {
        let reducer = reducer();
        let notified = Rc::new(Cell::new(0));
        let notified_clone = notified.clone();
        let _sub = reducer
            .reader()
            .subscribe(move |_| notified_clone.set(notified_clone.get() + 1));

        reducer.accept(proposal("about", SignalSource::Visibility));
        reducer.close();
        assert_eq!(reducer.accept(proposal("projects", SignalSource::Proximity)), Acceptance::Ignored);

        assert_eq!(notified.get(), 1);
        assert_eq!(reducer.active(), Some(SectionId::from("about")));
        assert!(reducer.is_closed());
    }
}
