//! Commands that open a Cosmonic web page

use crate::infrastructure::constants::{DOCUMENTATION_URL, LICENSE_URL};
use crate::infrastructure::{BrowserOpener, SystemBrowser};
use clap::Parser;
use tracing::warn;

#[derive(Parser, Debug, Clone)]
pub struct DocsCommand {}

impl DocsCommand {
    pub fn execute(&self) -> anyhow::Result<()> {
        open_link(&SystemBrowser, DOCUMENTATION_URL);
        Ok(())
    }
}

/// To obtain a license, visit cosmonic.com and sign up for a free trial key
#[derive(Parser, Debug, Clone)]
pub struct LicenseCommand {}

impl LicenseCommand {
    pub fn execute(&self) -> anyhow::Result<()> {
        open_link(&SystemBrowser, LICENSE_URL);
        Ok(())
    }
}

/// Print the URL and try the browser; a missing browser is not an error.
pub fn open_link(browser: &dyn BrowserOpener, url: &str) -> bool {
    println!("Opening {}", url);
    match browser.open(url) {
        Ok(()) => true,
        Err(e) => {
            warn!(%url, error = %e, "Failed to open browser");
            eprintln!("Unable to open a browser, visit {} directly", url);
            false
        }
    }
}
