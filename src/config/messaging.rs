//! Messaging configuration

use serde::Deserialize;

use crate::domain::messaging::DEFAULT_MAX_CONTENT_LENGTH;
use crate::ports::{HistoryPage, HistoryWindow};

use super::error::ValidationError;

/// Upper bound for `history_page_size`.
pub const MAX_HISTORY_PAGE_SIZE: u32 = 500;

/// Messaging behavior
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingConfig {
    /// Messages returned per history request
    #[serde(default = "default_history_page_size")]
    pub history_page_size: u32,

    /// Which end of a long history the page is taken from
    #[serde(default)]
    pub history_window: HistoryWindow,

    /// Maximum message length in characters
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
}

impl MessagingConfig {
    pub fn history_page(&self) -> HistoryPage {
        HistoryPage::new(self.history_page_size, self.history_window)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.history_page_size == 0 || self.history_page_size > MAX_HISTORY_PAGE_SIZE {
            return Err(ValidationError::InvalidHistoryPageSize(MAX_HISTORY_PAGE_SIZE));
        }
        if self.max_content_length == 0 {
            return Err(ValidationError::InvalidContentLength);
        }
        Ok(())
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            history_page_size: default_history_page_size(),
            history_window: HistoryWindow::default(),
            max_content_length: default_max_content_length(),
        }
    }
}

fn default_history_page_size() -> u32 {
    50
}

fn default_max_content_length() -> usize {
    DEFAULT_MAX_CONTENT_LENGTH
}
