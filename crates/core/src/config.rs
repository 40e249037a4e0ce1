//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

/// Content core configuration.
///
/// Bulk traversals (branch publish, move, delete) page through descendants in
/// fixed-size batches to bound the working set while the coarse tree lock is
/// held; the batch sizes are tunable here.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Descendants per page during branch publishing (default: 100).
    pub branch_page_size: usize,

    /// Descendants per page during moves (default: 500).
    pub move_page_size: usize,

    /// Descendants per page during recursive deletes (default: 500).
    pub delete_page_size: usize,

    /// Maximum content name length (default: 255).
    pub name_max_length: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            branch_page_size: 100,
            move_page_size: 500,
            delete_page_size: 500,
            name_max_length: 255,
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let branch_page_size = env::var("ARBOR_BRANCH_PAGE_SIZE")
            .map(|v| v.parse())
            .unwrap_or(Ok(defaults.branch_page_size))
            .context("ARBOR_BRANCH_PAGE_SIZE must be a valid usize")?;

        let move_page_size = env::var("ARBOR_MOVE_PAGE_SIZE")
            .map(|v| v.parse())
            .unwrap_or(Ok(defaults.move_page_size))
            .context("ARBOR_MOVE_PAGE_SIZE must be a valid usize")?;

        let delete_page_size = env::var("ARBOR_DELETE_PAGE_SIZE")
            .map(|v| v.parse())
            .unwrap_or(Ok(defaults.delete_page_size))
            .context("ARBOR_DELETE_PAGE_SIZE must be a valid usize")?;

        let name_max_length = env::var("ARBOR_NAME_MAX_LENGTH")
            .map(|v| v.parse())
            .unwrap_or(Ok(defaults.name_max_length))
            .context("ARBOR_NAME_MAX_LENGTH must be a valid usize")?;

        Ok(Self {
            branch_page_size,
            move_page_size,
            delete_page_size,
            name_max_length,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_batch_sizes() {
        let config = CoreConfig::default();
        assert_eq!(config.branch_page_size, 100);
        assert_eq!(config.move_page_size, 500);
        assert_eq!(config.delete_page_size, 500);
        assert_eq!(config.name_max_length, 255);
    }
}
