//! Page file handling
//!
//! A page file describes a single-page layout and a scroll script to replay
//! against it:
//!
//! ```toml
//! track = ["about", "projects", "skills", "connect"]
//!
//! [viewport]
//! width = 1280
//! height = 800
//!
//! [[section]]
//! id = "about"
//! top = 0
//! height = 1000
//!
//! [[section]]
//! id = "projects"
//! top = 1000
//! height = 1400
//! mount_at_ms = 300
//!
//! [tracker]
//! nav_height = 64
//!
//! [[step]]
//! advance_ms = 600
//!
//! [[step]]
//! scroll = 1100
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use navspy_core::{PageLayout, RegionLayout, Viewport};
use navspy_tracker::{SectionList, TrackerConfig};
use serde::{Deserialize, Serialize};

// =============================================================================
// Page file
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PageFile {
    /// Section ids to track, in page order; defaults to every section
    #[serde(default)]
    pub track: Option<Vec<String>>,
    /// Defaults to the bottom of the lowest section
    #[serde(default)]
    pub document_height: Option<f32>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default, rename = "section")]
    pub sections: Vec<SectionEntry>,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SectionEntry {
    pub id: String,
    pub top: f32,
    pub height: f32,
    /// Milliseconds after load at which the section mounts
    #[serde(default)]
    pub mount_at_ms: Option<u64>,
}

/// One `[[step]]` table; exactly one key must be set
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    #[serde(default)]
    pub scroll: Option<f32>,
    /// Several scroll events delivered before the next frame
    #[serde(default)]
    pub burst: Option<Vec<f32>>,
    #[serde(default)]
    pub advance_ms: Option<u64>,
    #[serde(default)]
    pub frame: bool,
    #[serde(default)]
    pub resize: Option<[f32; 2]>,
    #[serde(default)]
    pub unmount: bool,
}

/// What a step does
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Scroll(f32),
    Burst(Vec<f32>),
    Advance(Duration),
    Frame,
    Resize(Viewport),
    Unmount,
}

impl Step {
    pub fn action(&self) -> Result<Action> {
        let mut actions = Vec::new();
        if let Some(y) = self.scroll {
            actions.push(Action::Scroll(y));
        }
        if let Some(ys) = &self.burst {
            if ys.is_empty() {
                anyhow::bail!("burst needs at least one scroll position");
            }
            actions.push(Action::Burst(ys.clone()));
        }
        if let Some(ms) = self.advance_ms {
            actions.push(Action::Advance(Duration::from_millis(ms)));
        }
        if self.frame {
            actions.push(Action::Frame);
        }
        if let Some([width, height]) = self.resize {
            if !(width > 0.0 && height > 0.0) {
                anyhow::bail!("resize needs a positive size (got {}x{})", width, height);
            }
            actions.push(Action::Resize(Viewport::new(width, height)));
        }
        if self.unmount {
            actions.push(Action::Unmount);
        }

        match actions.len() {
            0 => anyhow::bail!("step has no action"),
            1 => Ok(actions.remove(0)),
            n => anyhow::bail!("step has {} actions, expected exactly one", n),
        }
    }
}

impl PageFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Ids to hand to the tracker
    pub fn tracked_ids(&self) -> Vec<String> {
        match &self.track {
            Some(ids) => ids.clone(),
            None => self.sections.iter().map(|s| s.id.clone()).collect(),
        }
    }

    pub fn section_list(&self) -> Result<SectionList> {
        SectionList::new(self.tracked_ids()).context("Invalid section list")
    }

    pub fn actions(&self) -> Result<Vec<Action>> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| step.action().with_context(|| format!("step {}", i + 1)))
            .collect()
    }

    pub fn layout(&self) -> PageLayout {
        let regions = self
            .sections
            .iter()
            .map(|s| {
                let region = RegionLayout::new(s.id.clone(), s.top, s.height);
                match s.mount_at_ms {
                    Some(ms) => region.mounted_at(Duration::from_millis(ms)),
                    None => region,
                }
            })
            .collect();

        let layout = PageLayout::new(self.viewport, regions);
        match self.document_height {
            Some(height) => layout.with_document_height(height),
            None => layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
track = ["about", "projects", "skills"]

[viewport]
width = 1000
height = 800

[[section]]
id = "about"
top = 0
height = 1000

[[section]]
id = "projects"
top = 1000
height = 1000
mount_at_ms = 300

[tracker]
retry_limit = 3

[[step]]
advance_ms = 600

[[step]]
burst = [100, 600, 1050]

[[step]]
unmount = true
"#;

    #[test]
    fn test_parse_page() {
        let page = PageFile::from_toml_str(PAGE).unwrap();

        assert_eq!(page.viewport, Viewport::new(1000.0, 800.0));
        assert_eq!(page.sections.len(), 2);
        assert_eq!(page.tracker.retry_limit, 3);
        assert_eq!(page.tracked_ids(), vec!["about", "projects", "skills"]);

        let layout = page.layout();
        assert_eq!(layout.document_height, 2000.0);
        assert_eq!(layout.regions[1].mount_at, Some(Duration::from_millis(300)));

        assert_eq!(
            page.actions().unwrap(),
            vec![
                Action::Advance(Duration::from_millis(600)),
                Action::Burst(vec![100.0, 600.0, 1050.0]),
                Action::Unmount,
            ]
        );
    }

    #[test]
    fn test_track_defaults_to_sections() {
        let page = PageFile::from_toml_str(
            r#"
[[section]]
id = "about"
top = 0
height = 500
"#,
        )
        .unwrap();
        assert_eq!(page.tracked_ids(), vec!["about"]);
        assert_eq!(page.viewport, Viewport::default());
    }

    #[test]
    fn test_step_needs_one_action() {
        assert!(Step::default().action().is_err());

        let step = Step {
            scroll: Some(10.0),
            frame: true,
            ..Default::default()
        };
        assert!(step.action().is_err());

        let step = Step {
            resize: Some([0.0, 800.0]),
            ..Default::default()
        };
        assert!(step.action().is_err());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(PageFile::from_toml_str("[[step]]\nteleport = 5\n").is_err());
    }
}
