use crate::inspect::{InspectionResult, UpstreamKind};
use colored::Colorize;
use std::fmt;

/// Column widths shared by every line of one report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchWidths {
    pub display_name: usize,
    pub branch: usize,
}

impl BatchWidths {
    pub fn observe_display_name(&mut self, display_name: &str) {
        self.display_name = self.display_name.max(display_name.chars().count());
    }

    pub fn observe_branch(&mut self, branch: &str) {
        self.branch = self.branch.max(branch.chars().count());
    }
}

/// Bracketed annotation after the branch marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Behind(usize),
    Ahead(usize),
    Changed(usize),
    Clean,
}

impl Badge {
    fn colored(self) -> String {
        let text = self.to_string();
        match self {
            Badge::Behind(_) => text.blue().to_string(),
            Badge::Ahead(_) => text.yellow().to_string(),
            Badge::Changed(_) => text.red().to_string(),
            Badge::Clean => text.green().to_string(),
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Badge::Behind(count) => write!(f, "[{count}↓]"),
            Badge::Ahead(count) => write!(f, "[{count}↑]"),
            Badge::Changed(count) => write!(f, "[{count} changes]"),
            Badge::Clean => write!(f, "[✓ clean]"),
        }
    }
}

/// Badges for an installed repository, in display order.
///
/// `Clean` is present exactly when no other badge is. Without a tracking ref
/// there is nothing to be behind, so `behind` is ignored.
pub fn badges(result: &InspectionResult) -> Vec<Badge> {
    let mut badges = Vec::new();
    if result.upstream == UpstreamKind::Tracked && result.behind > 0 {
        badges.push(Badge::Behind(result.behind));
    }
    if result.ahead > 0 {
        badges.push(Badge::Ahead(result.ahead));
    }
    if result.changed_files > 0 {
        badges.push(Badge::Changed(result.changed_files));
    }
    debug_assert_eq!(badges.is_empty(), result.is_clean());
    if badges.is_empty() {
        badges.push(Badge::Clean);
    }
    badges
}

/// Render one report line (without the leading row number)
pub fn format_status(result: &InspectionResult, widths: &BatchWidths) -> String {
    let display_name = result.display_name();
    if !result.installed {
        return format!("{display_name}: Not installed");
    }

    let branch_pad = widths.branch.saturating_sub(result.branch.chars().count());
    let mut line = format!(
        "{:<width$} git:({}){}",
        display_name,
        result.branch.blue(),
        " ".repeat(branch_pad),
        width = widths.display_name,
    );

    for badge in badges(result) {
        line.push(' ');
        line.push_str(&badge.colored());
    }

    line
}
