//! Status icons for CLI output

use crate::domain::chart::ChartRelease;

/// Status icons for release states
pub struct StatusIcon;

impl StatusIcon {
    /// Installed at the newest version
    pub const SUCCESS: &'static str = "✓";

    /// Installed, newer version published
    pub const WARNING: &'static str = "⚠";

    /// Not installed
    pub const ERROR: &'static str = "✗";

    pub fn get_release_icon(release: &ChartRelease) -> &'static str {
        if !release.is_installed() {
            Self::ERROR
        } else if release.update_available() {
            Self::WARNING
        } else {
            Self::SUCCESS
        }
    }

    pub fn get_status_text(release: &ChartRelease) -> &'static str {
        if !release.is_installed() {
            "Not installed"
        } else if release.update_available() {
            "Update available"
        } else {
            "Up to date"
        }
    }
}
