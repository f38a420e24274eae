//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::domain::chart::ChartRelease;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

const NOT_INSTALLED: &str = "-";

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    /// Render installed vs available versions, one row per component
    pub fn render_versions(&self, releases: &[ChartRelease]) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("COMPONENT").set_alignment(CellAlignment::Left),
                Cell::new("RELEASE").set_alignment(CellAlignment::Left),
                Cell::new("INSTALLED").set_alignment(CellAlignment::Center),
                Cell::new("AVAILABLE").set_alignment(CellAlignment::Center),
                Cell::new("STATUS").set_alignment(CellAlignment::Center),
            ]);

        for release in releases {
            let icon = StatusIcon::get_release_icon(release);
            let status = StatusIcon::get_status_text(release);
            let color = self.theme.get_release_color(release);

            table.add_row(vec![
                Cell::new(release.component.display_name),
                Cell::new(release.component.release_name),
                Cell::new(release.installed_version.as_deref().unwrap_or(NOT_INSTALLED))
                    .fg(color),
                Cell::new(&release.available_version)
                    .fg(self.theme.info),
                Cell::new(format!("{} {}", icon, status)).fg(color),
            ]);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "╭─ Cosmonic Control {} ─╮\n",
            format!("[{} components]", releases.len())
                .bright_black()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "Legend: {} Up to date  {} Update available  {} Not installed\n",
            StatusIcon::SUCCESS.green(),
            StatusIcon::WARNING.yellow(),
            StatusIcon::ERROR.red()
        ));

        output
    }
}

/// One-line summary used by `nexus` / `hostgroup` without a subcommand
pub fn render_release_line(release: &ChartRelease) -> String {
    format!(
        "{} installed version [{}], repo version [{}]",
        release.component.display_name,
        release.installed_version.as_deref().unwrap_or_default(),
        release.available_version
    )
}
