//! Navigation bar model
//!
//! The rendering-side consumer of the active section: which entry is
//! highlighted, which one carries the underline, whether the mobile drawer is
//! open, and whether tracking runs at all (only on the landing page).

use std::rc::Rc;

use navspy_core::Host;

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::section::{SectionId, SectionList};
use crate::tracker::ActiveSectionTracker;

/// One link in the navigation bar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavItem {
    pub label: String,
    /// Fragment link, `#<section-id>`
    pub href: String,
}

impl NavItem {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }

    /// Section this item points at, if the href is a fragment link
    pub fn section_id(&self) -> Option<&str> {
        self.href.strip_prefix('#').filter(|id| !id.is_empty())
    }

    fn points_at(&self, section: &SectionId) -> bool {
        self.section_id() == Some(section.as_str())
    }
}

/// The portfolio's navigation entries, in page order
pub fn default_items() -> Vec<NavItem> {
    vec![
        NavItem::new("About", "#about"),
        NavItem::new("Experience", "#experience"),
        NavItem::new("Projects", "#projects"),
        NavItem::new("Skills", "#skills"),
        NavItem::new("Reach Me", "#connect"),
    ]
}

/// Render state of one entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavEntry {
    pub label: String,
    pub href: String,
    pub highlighted: bool,
    pub underlined: bool,
}

/// Navigation bar state
#[derive(Clone, Debug)]
pub struct NavBar {
    items: Vec<NavItem>,
    path: String,
    hovered: Option<String>,
    menu_open: bool,
}

impl NavBar {
    pub fn new(items: Vec<NavItem>) -> Self {
        Self {
            items,
            path: "/".to_string(),
            hovered: None,
            menu_open: false,
        }
    }

    pub fn items(&self) -> &[NavItem] {
        &self.items
    }

    /// Route the bar is rendered on
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn is_landing_page(&self) -> bool {
        self.path == "/"
    }

    /// Sections to track, from the items' fragment links
    pub fn sections(&self) -> Result<SectionList, Error> {
        Ok(SectionList::new(self.items.iter().filter_map(NavItem::section_id))?)
    }

    /// Mount a tracker for the items' sections, but only on the landing page
    pub fn mount_tracker<H: Host + ?Sized + 'static>(
        &self,
        host: &Rc<H>,
        config: TrackerConfig,
    ) -> Result<Option<ActiveSectionTracker<H>>, Error> {
        if !self.is_landing_page() {
            tracing::debug!(path = %self.path, "not on the landing page, tracking disabled");
            return Ok(None);
        }
        let tracker = ActiveSectionTracker::mount(host, self.sections()?, config)?;
        Ok(Some(tracker))
    }

    pub fn hover(&mut self, label: &str) {
        self.hovered = Some(label.to_string());
    }

    /// Clear the hover, unless another item took it over meanwhile
    pub fn unhover(&mut self, label: &str) {
        if self.hovered.as_deref() == Some(label) {
            self.hovered = None;
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    /// Following a fragment link closes the mobile drawer
    pub fn hash_changed(&mut self) {
        self.menu_open = false;
    }

    /// Whether `item` renders as the active entry
    pub fn is_highlighted(&self, item: &NavItem, active: Option<&SectionId>) -> bool {
        active.is_some_and(|section| item.points_at(section))
    }

    /// Label of the entry carrying the underline
    ///
    /// Hover takes precedence over the active section. Off the landing page
    /// nothing is underlined.
    pub fn underline_target(&self, active: Option<&SectionId>) -> Option<&str> {
        if !self.is_landing_page() {
            return None;
        }
        if let Some(hovered) = self.hovered.as_deref() {
            return Some(hovered);
        }
        let active = active?;
        self.items
            .iter()
            .find(|item| item.points_at(active))
            .map(|item| item.label.as_str())
    }

    /// Render state for every entry
    pub fn entries(&self, active: Option<&SectionId>) -> Vec<NavEntry> {
        let underline = self.underline_target(active);
        self.items
            .iter()
            .map(|item| NavEntry {
                label: item.label.clone(),
                href: item.href.clone(),
                highlighted: self.is_highlighted(item, active),
                underlined: underline == Some(item.label.as_str()),
            })
            .collect()
    }
}

impl Default for NavBar {
    fn default() -> Self {
        Self::new(default_items())
    }
}

/// How far down the page the viewport is, in `[0, 1]`
///
/// Pages that don't scroll report 0.
pub fn scroll_progress(scroll_y: f32, document_height: f32, viewport_height: f32) -> f32 {
    let scrollable = document_height - viewport_height;
    if scrollable <= 0.0 {
        return 0.0;
    }
    (scroll_y / scrollable).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sections() {
        let nav = NavBar::default();
        let sections = nav.sections().unwrap();
        let ids: Vec<&str> = sections.ids().map(SectionId::as_str).collect();
        assert_eq!(ids, vec!["about", "experience", "projects", "skills", "connect"]);
    }

    #[test]
    fn test_underline_prefers_hover() {
        let mut nav = NavBar::default();
        let active = SectionId::from("connect");

        assert_eq!(nav.underline_target(Some(&active)), Some("Reach Me"));

        nav.hover("Skills");
        assert_eq!(nav.underline_target(Some(&active)), Some("Skills"));

        // Leaving an item that isn't hovered keeps the current hover
        nav.unhover("About");
        assert_eq!(nav.hovered(), Some("Skills"));

        nav.unhover("Skills");
        assert_eq!(nav.underline_target(None), None);
    }

    #[test]
    fn test_off_landing_page() {
        let mut nav = NavBar::default();
        nav.set_path("/projects/skillmapper-b2c");
        nav.hover("About");

        assert!(!nav.is_landing_page());
        assert_eq!(nav.underline_target(Some(&SectionId::from("about"))), None);
    }

    #[test]
    fn test_entries() {
        let nav = NavBar::default();
        let active = SectionId::from("projects");
        let entries = nav.entries(Some(&active));

        let highlighted: Vec<&str> = entries
            .iter()
            .filter(|e| e.highlighted)
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(highlighted, vec!["Projects"]);
        assert!(entries.iter().filter(|e| e.underlined).count() == 1);
        assert!(nav.entries(None).iter().all(|e| !e.highlighted && !e.underlined));
    }

    #[test]
    fn test_menu_closes_on_hash_change() {
        let mut nav = NavBar::default();
        nav.toggle_menu();
        assert!(nav.is_menu_open());
        nav.hash_changed();
        assert!(!nav.is_menu_open());
    }

    #[test]
    fn test_scroll_progress() {
        assert_eq!(scroll_progress(0.0, 3000.0, 800.0), 0.0);
        assert_eq!(scroll_progress(1100.0, 3000.0, 800.0), 0.5);
        assert_eq!(scroll_progress(5000.0, 3000.0, 800.0), 1.0);
        assert_eq!(scroll_progress(10.0, 500.0, 800.0), 0.0);
    }
}
