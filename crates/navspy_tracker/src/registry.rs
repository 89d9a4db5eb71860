//! Region registry
//!
//! Resolves section ids to live region handles. Sections whose element is not
//! mounted yet are retried a bounded number of times; once the retry budget is
//! spent the registry settles on whatever resolved, which may be nothing.
//!
//! The registry is a pure state machine: it never schedules anything itself.
//! The tracker calls [`RegionRegistry::attempt`], and when the answer is
//! [`RegistryStep::Retry`] it arms a host timer for the next attempt.

use navspy_core::Bounds;
use smallvec::SmallVec;

use crate::section::{Section, SectionId, SectionList};

/// Live binding of a section to its rendered geometry
#[derive(Clone, Debug, PartialEq)]
pub struct RegionHandle {
    pub section: Section,
    /// Viewport-relative bounding box from the last refresh
    pub bounds: Bounds,
    /// Last reported intersection ratio (0 until the first batch)
    pub ratio: f32,
}

impl RegionHandle {
    pub fn id(&self) -> &SectionId {
        &self.section.id
    }
}

/// Section ids that failed a lookup pass
pub type MissingSections = SmallVec<[SectionId; 4]>;

/// Final outcome of resolution
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    /// Resolved handles, in section order
    pub handles: Vec<RegionHandle>,
    /// Sections that never resolved
    pub missing: MissingSections,
    /// Lookups performed (initial + retries)
    pub attempts: u32,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Result of one lookup pass
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryStep {
    /// Some sections are missing and the budget allows another attempt
    Retry { missing: MissingSections },
    /// Resolution is over
    Resolved(Resolution),
}

/// Resolves a fixed section list against a document
#[derive(Clone, Debug)]
pub struct RegionRegistry {
    sections: SectionList,
    retry_limit: u32,
    attempts: u32,
    handles: Vec<RegionHandle>,
    missing: MissingSections,
    resolved: bool,
}

impl RegionRegistry {
    pub fn new(sections: SectionList, retry_limit: u32) -> Self {
        Self {
            sections,
            retry_limit,
            attempts: 0,
            handles: Vec::new(),
            missing: SmallVec::new(),
            resolved: false,
        }
    }

    /// Perform one lookup pass
    ///
    /// Every pass looks up every section again, so handles reflect the
    /// document at the time of the last pass. Calling this after resolution
    /// has settled returns the settled outcome without looking anything up.
    pub fn attempt<F>(&mut self, lookup: F) -> RegistryStep
    where
        F: Fn(&str) -> Option<Bounds>,
    {
        if self.resolved {
            return RegistryStep::Resolved(self.resolution());
        }

        self.attempts += 1;
        self.handles.clear();
        self.missing.clear();

        for section in &self.sections {
            match lookup(section.id.as_str()) {
                Some(bounds) => self.handles.push(RegionHandle {
                    section: section.clone(),
                    bounds,
                    ratio: 0.0,
                }),
                None => self.missing.push(section.id.clone()),
            }
        }

        let retries_used = self.attempts - 1;
        if !self.missing.is_empty() && retries_used < self.retry_limit {
            tracing::trace!(
                attempt = self.attempts,
                missing = self.missing.len(),
                "sections not mounted yet, retrying"
            );
            return RegistryStep::Retry {
                missing: self.missing.clone(),
            };
        }

        self.resolved = true;
        if self.missing.is_empty() {
            tracing::debug!(
                sections = self.handles.len(),
                attempts = self.attempts,
                "all sections resolved"
            );
        } else {
            tracing::debug!(
                resolved = self.handles.len(),
                missing = ?self.missing,
                attempts = self.attempts,
                "retry budget exhausted, tracking resolved subset"
            );
        }
        RegistryStep::Resolved(self.resolution())
    }

    fn resolution(&self) -> Resolution {
        Resolution {
            handles: self.handles.clone(),
            missing: self.missing.clone(),
            attempts: self.attempts,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn handles(&self) -> &[RegionHandle] {
        &self.handles
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handles.iter().any(|h| h.section.id == id)
    }

    /// Re-read the geometry of every resolved handle
    ///
    /// A handle whose element can no longer be found keeps its last bounds.
    pub fn refresh<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<Bounds>,
    {
        for handle in &mut self.handles {
            if let Some(bounds) = lookup(handle.section.id.as_str()) {
                handle.bounds = bounds;
            }
        }
    }

    /// Store the latest intersection ratio reported for a section
    pub fn record_ratio(&mut self, id: &str, ratio: f32) {
        if let Some(handle) = self.handles.iter_mut().find(|h| h.section.id == id) {
            handle.ratio = ratio;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn sections() -> SectionList {
        SectionList::new(["about", "projects", "connect"]).unwrap()
    }

    fn at(top: f32) -> Option<Bounds> {
        Some(Bounds::new(0.0, top, 1000.0, 1000.0))
    }

    #[test]
    fn test_resolves_immediately() {
        let mut registry = RegionRegistry::new(sections(), 10);
        let step = registry.attempt(|_| at(0.0));

        let RegistryStep::Resolved(resolution) = step else {
            panic!("expected resolution");
        };
        assert!(resolution.is_complete());
        assert_eq!(resolution.attempts, 1);
        assert_eq!(resolution.handles.len(), 3);
    }

    #[test]
    fn test_same_handles_regardless_of_attempts() {
        let mut eager = RegionRegistry::new(sections(), 10);
        let eager_step = eager.attempt(|_| at(0.0));

        // connect only shows up on the fourth lookup
        let lookups = Cell::new(0);
        let mut late = RegionRegistry::new(sections(), 10);
        let late_step = loop {
            lookups.set(lookups.get() + 1);
            let n = lookups.get();
            match late.attempt(|id| if id == "connect" && n < 4 { None } else { at(0.0) }) {
                RegistryStep::Retry { missing } => assert_eq!(missing.as_slice(), &[SectionId::from("connect")]),
                resolved => break resolved,
            }
        };

        let (RegistryStep::Resolved(a), RegistryStep::Resolved(b)) = (eager_step, late_step) else {
            panic!("both registries should settle");
        };
        assert_eq!(a.handles, b.handles);
        assert_eq!(b.attempts, 4);
    }

    #[test]
    fn test_retry_budget_is_exact() {
        let mut registry = RegionRegistry::new(sections(), 10);
        let mut retries = 0;
        assert!(!registry.is_resolved());

        let resolution = loop {
            match registry.attempt(|id| if id == "projects" { None } else { at(0.0) }) {
                RegistryStep::Retry { .. } => retries += 1,
                RegistryStep::Resolved(resolution) => break resolution,
            }
            assert!(retries <= 10, "retried past the budget");
        };

        assert_eq!(retries, 10);
        assert_eq!(resolution.attempts, 11);
        assert_eq!(resolution.missing.as_slice(), &[SectionId::from("projects")]);
        assert_eq!(resolution.handles.len(), 2);

        // Settled: further attempts don't look anything up
        assert!(registry.is_resolved());
        let attempts_before = registry.attempts();
        assert!(matches!(registry.attempt(|_| at(0.0)), RegistryStep::Resolved(_)));
        assert_eq!(registry.attempts(), attempts_before);
        assert!(!registry.contains("projects"));
    }

    #[test]
    fn test_nothing_resolves() {
        let mut registry = RegionRegistry::new(sections(), 0);
        let RegistryStep::Resolved(resolution) = registry.attempt(|_| None) else {
            panic!("zero budget resolves on first attempt");
        };
        assert!(resolution.handles.is_empty());
        assert_eq!(resolution.missing.len(), 3);
    }

    #[test]
    fn test_refresh_and_ratio() {
        let mut registry = RegionRegistry::new(sections(), 10);
        registry.attempt(|_| at(0.0));

        registry.refresh(|id| if id == "about" { at(-300.0) } else { None });
        registry.record_ratio("projects", 0.4);

        assert_eq!(registry.handles()[0].bounds.top(), -300.0);
        assert_eq!(registry.handles()[1].bounds.top(), 0.0);
        assert_eq!(registry.handles()[1].ratio, 0.4);
    }
}
