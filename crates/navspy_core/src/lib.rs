//! navspy Core Runtime
//!
//! This crate provides the foundational primitives the navspy tracker runs on:
//!
//! - **State Cells**: single-writer observable values with a subscriber list
//! - **Host**: the event sources of a single-threaded event loop (timers,
//!   animation frames, scroll listeners, intersection observers), every one of
//!   them returning a handle at registration time
//! - **Intersection Observation**: viewport intersection entries computed with
//!   root margins and threshold lists
//! - **Virtual Host**: a deterministic, virtual-clock page used by tests and
//!   the command line simulator
//!
//! # Example
//!
//! ```rust
//! use navspy_core::reactive::StateCell;
//!
//! let cell = StateCell::new(None::<String>);
//! let reader = cell.reader();
//!
//! let _sub = reader.subscribe(|value| {
//!     println!("Active is now: {:?}", value);
//! });
//!
//! cell.set(Some("about".to_string()));
//! assert_eq!(reader.get(), Some("about".to_string()));
//! ```

pub mod error;
pub mod geometry;
pub mod host;
pub mod intersection;
pub mod reactive;
pub mod virtual_host;

pub use error::{CoreError, Result};
pub use geometry::{Bounds, Length, RootMargin, Viewport};
pub use host::{FrameId, Host, IntersectionCallback, ListenerId, ObserverId, Task, TimerId};
pub use intersection::{IntersectionEntry, IntersectionOptions, IntersectionTracker};
pub use reactive::{ReadSignal, StateCell, Subscription};
pub use virtual_host::{HostStats, PageLayout, RegionLayout, VirtualHost};
