//! Replay a page file's script against a virtual host

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use navspy_core::{Host, VirtualHost};
use navspy_tracker::ActiveSectionTracker;
use serde::Serialize;
use tracing::debug;

use crate::page::{Action, PageFile};

/// A change of the active section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub t_ms: u64,
    pub scroll: f32,
    pub active: Option<String>,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={} scroll={} active={}",
            self.t_ms,
            self.scroll,
            self.active.as_deref().unwrap_or("none")
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub phase: String,
    pub transitions: usize,
    /// How often each section became active, in first-activation order
    pub activations: IndexMap<String, u32>,
    pub unresolved: Vec<String>,
    pub resolution_attempts: u32,
    pub scroll_events: u64,
    pub coalesced_scrolls: u64,
    pub proximity_evaluations: u64,
    pub visibility_batches: u64,
    pub ignored_proposals: u64,
}

/// One output line in `--json` mode
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record<'a> {
    Transition(&'a Transition),
    Summary(&'a Summary),
}

pub struct Simulation {
    pub transitions: Vec<Transition>,
    pub summary: Summary,
}

/// Mount a tracker on the page, paint once, then run every step
///
/// `scroll`, `burst`, `advance_ms` and `resize` steps are each followed by
/// one rendered frame.
pub fn run(page: &PageFile) -> Result<Simulation> {
    let actions = page.actions()?;
    let sections = page.section_list()?;
    let host = Rc::new(VirtualHost::new(page.layout()));

    let tracker = ActiveSectionTracker::mount(&host, sections, page.tracker.clone())
        .context("Invalid tracker configuration")?;

    let transitions = Rc::new(RefCell::new(Vec::new()));
    let _subscription = {
        let transitions = transitions.clone();
        let host = host.clone();
        tracker.subscribe(move |active| {
            transitions.borrow_mut().push(Transition {
                t_ms: host.now().as_millis() as u64,
                scroll: host.scroll_y(),
                active: active.as_ref().map(|id| id.to_string()),
            });
        })
    };

    host.render_frame();

    for (i, action) in actions.into_iter().enumerate() {
        debug!(step = i + 1, ?action, "running step");
        match action {
            Action::Scroll(y) => host.scroll_and_render(y),
            Action::Burst(ys) => {
                for y in ys {
                    host.scroll_to(y);
                }
                host.render_frame();
            }
            Action::Advance(by) => {
                host.advance(by);
                host.render_frame();
            }
            Action::Frame => host.render_frame(),
            Action::Resize(viewport) => {
                host.resize(viewport);
                host.render_frame();
            }
            Action::Unmount => tracker.unmount(),
        }
    }

    let transitions = transitions.take();
    let mut activations: IndexMap<String, u32> = IndexMap::new();
    for id in transitions.iter().filter_map(|t| t.active.clone()) {
        *activations.entry(id).or_default() += 1;
    }

    let stats = tracker.stats();
    let unresolved = tracker
        .resolution()
        .map(|r| r.missing.iter().map(|id| id.to_string()).collect())
        .unwrap_or_default();

    let summary = Summary {
        phase: format!("{:?}", tracker.phase()).to_lowercase(),
        transitions: transitions.len(),
        activations,
        unresolved,
        resolution_attempts: stats.resolution_attempts,
        scroll_events: stats.scroll_events,
        coalesced_scrolls: stats.coalesced_scrolls,
        proximity_evaluations: stats.proximity_evaluations,
        visibility_batches: stats.visibility_batches,
        ignored_proposals: stats.reducer.ignored,
    };

    Ok(Simulation {
        transitions,
        summary,
    })
}
