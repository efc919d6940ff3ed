//! Core engine: the resolve → parse → decide → update pipeline.

pub mod scanner;
pub mod offers;
pub mod pricing;
pub mod executor;
pub mod runner;

use anyhow::Result;
use scraper::Selector;

/// Compile a configured CSS selector, naming the config key on failure.
pub(crate) fn compile_selector(css: &str, key: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Invalid selector {key} = {css:?}: {e:?}"))
}
