//! Color theme for CLI output

use crate::domain::chart::ChartRelease;
use comfy_table::Color as TableColor;

/// Color theme for terminal output
#[derive(Debug, Clone)]
pub struct ColorTheme {
    pub success: TableColor,
    pub warning: TableColor,
    pub error: TableColor,
    pub info: TableColor,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: TableColor::Green,
            warning: TableColor::Yellow,
            error: TableColor::Red,
            info: TableColor::Cyan,
        }
    }
}

impl ColorTheme {
    /// Get color based on release state
    pub fn get_release_color(&self, release: &ChartRelease) -> TableColor {
        if !release.is_installed() {
            self.error
        } else if release.update_available() {
            self.warning
        } else {
            self.success
        }
    }
}
