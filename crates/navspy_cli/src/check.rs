//! Check command - validate a page file before replaying it

use std::time::Duration;

use indexmap::IndexMap;
use navspy_tracker::SectionList;

use crate::page::{Action, PageFile};

// ANSI color codes
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const BOLD: &str = "\x1b[1m";
    pub const CYAN: &str = "\x1b[36m";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

/// Result of a single check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.into(),
        }
    }

    fn warning(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.into(),
        }
    }

    fn error(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.into(),
        }
    }

    pub fn colored_icon(&self) -> String {
        match self.status {
            CheckStatus::Ok => format!("{}✓{}", colors::GREEN, colors::RESET),
            CheckStatus::Warning => format!("{}!{}", colors::YELLOW, colors::RESET),
            CheckStatus::Error => format!("{}✗{}", colors::RED, colors::RESET),
        }
    }
}

/// Run every check against a parsed page file
pub fn check_page(page: &PageFile) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let viewport = page.viewport;
    if viewport.width > 0.0 && viewport.height > 0.0 {
        results.push(CheckResult::ok(
            "viewport",
            format!("{}x{}", viewport.width, viewport.height),
        ));
    } else {
        results.push(CheckResult::error(
            "viewport",
            format!("size must be positive (got {}x{})", viewport.width, viewport.height),
        ));
    }

    check_sections(page, &mut results);
    check_tracking(page, &mut results);

    match page.tracker.validate() {
        Ok(()) => results.push(CheckResult::ok("tracker", "configuration is valid")),
        Err(e) => results.push(CheckResult::error("tracker", e.to_string())),
    }

    check_steps(page, &mut results);
    results
}

fn check_sections(page: &PageFile, results: &mut Vec<CheckResult>) {
    if page.sections.is_empty() {
        results.push(CheckResult::warning("sections", "page has no sections"));
        return;
    }

    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for section in &page.sections {
        *counts.entry(section.id.as_str()).or_default() += 1;

        let valid_height = section.height.is_finite() && section.height > 0.0;
        if !valid_height || !section.top.is_finite() || section.top < 0.0 {
            results.push(CheckResult::error(
                "sections",
                format!(
                    "'{}' needs a non-negative top and a positive height (got top={}, height={})",
                    section.id, section.top, section.height
                ),
            ));
        }
    }

    for (id, count) in &counts {
        if *count > 1 {
            results.push(CheckResult::error(
                "sections",
                format!("'{}' is defined {} times", id, count),
            ));
        }
    }

    let mut by_top: Vec<_> = page.sections.iter().collect();
    by_top.sort_by(|a, b| a.top.total_cmp(&b.top));
    for pair in by_top.windows(2) {
        if pair[0].top + pair[0].height > pair[1].top {
            results.push(CheckResult::warning(
                "sections",
                format!("'{}' overlaps '{}'", pair[0].id, pair[1].id),
            ));
        }
    }

    if !results
        .iter()
        .any(|r| r.name == "sections" && r.status == CheckStatus::Error)
    {
        results.push(CheckResult::ok(
            "sections",
            format!("{} sections", page.sections.len()),
        ));
    }
}

fn check_tracking(page: &PageFile, results: &mut Vec<CheckResult>) {
    let ids = page.tracked_ids();
    if let Err(e) = SectionList::new(&ids) {
        results.push(CheckResult::error("track", e.to_string()));
        return;
    }

    let retry_window = page
        .tracker
        .retry_interval()
        .saturating_mul(page.tracker.retry_limit);
    let mut all_found = true;

    for id in &ids {
        let id = id.trim_start_matches('#');
        match page.sections.iter().find(|s| s.id == id) {
            None => {
                all_found = false;
                results.push(CheckResult::warning(
                    "track",
                    format!("'{}' is not on the page and will be dropped", id),
                ));
            }
            Some(section) => {
                let mount_at = Duration::from_millis(section.mount_at_ms.unwrap_or(0));
                if mount_at > retry_window {
                    all_found = false;
                    results.push(CheckResult::warning(
                        "track",
                        format!(
                            "'{}' mounts at {}ms, after the last retry at {}ms",
                            id,
                            mount_at.as_millis(),
                            retry_window.as_millis()
                        ),
                    ));
                }
            }
        }
    }

    if all_found {
        results.push(CheckResult::ok(
            "track",
            format!("tracking {} sections", ids.len()),
        ));
    }
}

fn check_steps(page: &PageFile, results: &mut Vec<CheckResult>) {
    let max_scroll = page.layout().max_scroll();
    let mut failed = false;

    for (i, step) in page.steps.iter().enumerate() {
        let name = format!("step {}", i + 1);
        match step.action() {
            Err(e) => {
                failed = true;
                results.push(CheckResult::error(&name, e.to_string()));
            }
            Ok(Action::Scroll(y)) if y < 0.0 || y > max_scroll => {
                results.push(CheckResult::warning(
                    &name,
                    format!("scroll {} will be clamped to [0, {}]", y, max_scroll),
                ));
            }
            Ok(_) => {}
        }
    }

    if !failed {
        results.push(CheckResult::ok(
            "steps",
            format!("{} steps", page.steps.len()),
        ));
    }
}

pub fn has_errors(results: &[CheckResult]) -> bool {
    results.iter().any(|r| r.status == CheckStatus::Error)
}

pub fn print_results(path: &str, results: &[CheckResult]) {
    println!("{}{}navspy check{} {}", colors::BOLD, colors::CYAN, colors::RESET, path);
    println!();

    let mut errors = 0;
    let mut warnings = 0;
    for result in results {
        println!("    [{}] {}: {}", result.colored_icon(), result.name, result.message);
        match result.status {
            CheckStatus::Error => errors += 1,
            CheckStatus::Warning => warnings += 1,
            CheckStatus::Ok => {}
        }
    }

    println!();
    if errors == 0 && warnings == 0 {
        println!("{}No issues found{}", colors::GREEN, colors::RESET);
    } else {
        println!("{} error(s), {} warning(s)", errors, warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(source: &str) -> PageFile {
        PageFile::from_toml_str(source).unwrap()
    }

    const SECTIONS: &str = r#"
[[section]]
id = "about"
top = 0
height = 1000

[[section]]
id = "projects"
top = 1000
height = 1000
"#;

    #[test]
    fn test_valid_page() {
        let results = check_page(&page(SECTIONS));
        assert!(!has_errors(&results));
        assert!(results.iter().all(|r| r.status == CheckStatus::Ok));
    }

    #[test]
    fn test_duplicate_section() {
        let source = format!("{SECTIONS}\n[[section]]\nid = \"about\"\ntop = 2000\nheight = 100\n");
        let results = check_page(&page(&source));
        assert!(has_errors(&results));
    }

    #[test]
    fn test_late_and_missing_sections_warn() {
        let source =
            format!("{SECTIONS}\n[[section]]\nid = \"late\"\ntop = 2000\nheight = 100\nmount_at_ms = 5000\n");
        let mut file = page(&source);
        file.track = Some(vec!["about".into(), "late".into(), "skills".into()]);

        let results = check_page(&file);
        let warnings: Vec<&str> = results
            .iter()
            .filter(|r| r.status == CheckStatus::Warning)
            .map(|r| r.message.as_str())
            .collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("after the last retry"));
        assert!(warnings[1].contains("not on the page"));
        assert!(!has_errors(&results));
    }

    #[test]
    fn test_invalid_tracker_config() {
        let source = format!("{SECTIONS}\n[tracker]\nthresholds = [0.5, 0.1]\n");
        let results = check_page(&page(&source));
        assert!(results
            .iter()
            .any(|r| r.name == "tracker" && r.status == CheckStatus::Error));
    }

    #[test]
    fn test_huge_retry_window_saturates() {
        let source = format!(
            "{SECTIONS}\n[tracker]\nretry_limit = 4000000000\nretry_interval_ms = 10000000000000\n"
        );
        let file = page(&source);
        assert!(file.tracker.validate().is_ok());

        let results = check_page(&file);
        assert!(!has_errors(&results));
        assert!(results
            .iter()
            .any(|r| r.name == "track" && r.status == CheckStatus::Ok));
    }
}
