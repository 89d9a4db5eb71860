//! navspy tracker
//!
//! Decides which section of a scrolling single-page layout is "active" so a
//! navigation bar can highlight it:
//!
//! - **Region registry**: resolves section ids to rendered regions, retrying
//!   for sections that mount late
//! - **Visibility evaluator**: picks the most visible section from each
//!   intersection batch
//! - **Proximity evaluator**: on scroll, at most once per frame, picks the
//!   section whose top edge is closest to a reference line
//! - **Reducer**: merges both signals, most recent proposal wins, and
//!   publishes the result
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//! use navspy_core::{PageLayout, RegionLayout, Viewport, VirtualHost};
//! use navspy_tracker::{NavBar, TrackerConfig};
//!
//! let host = Rc::new(VirtualHost::new(PageLayout::new(
//!     Viewport::new(1280.0, 800.0),
//!     vec![
//!         RegionLayout::new("about", 0.0, 900.0),
//!         RegionLayout::new("experience", 900.0, 900.0),
//!         RegionLayout::new("projects", 1800.0, 900.0),
//!         RegionLayout::new("skills", 2700.0, 900.0),
//!         RegionLayout::new("connect", 3600.0, 900.0),
//!     ],
//! )));
//!
//! let nav = NavBar::default();
//! let tracker = nav
//!     .mount_tracker(&host, TrackerConfig::default())
//!     .unwrap()
//!     .expect("tracking runs on the landing page");
//!
//! host.scroll_and_render(1800.0);
//! assert_eq!(nav.underline_target(tracker.active().as_ref()), Some("Projects"));
//! ```

pub mod config;
pub mod error;
pub mod nav;
pub mod proximity;
pub mod reducer;
pub mod registry;
pub mod section;
pub mod tracker;
pub mod visibility;


pub use config::TrackerConfig;
pub use error::{ConfigError, Error, SectionError};
pub use nav::{default_items, scroll_progress, NavBar, NavEntry, NavItem};
pub use proximity::FrameGate;
pub use reducer::{Acceptance, Proposal, Reducer, ReducerStats, SignalSource};
pub use registry::{MissingSections, RegionHandle, RegionRegistry, RegistryStep, Resolution};
pub use section::{Section, SectionId, SectionList};
pub use tracker::{ActiveSectionTracker, Phase, TrackerStats};
