use serde::Serialize;

use crate::error::{BookmarkerError, Result};

use super::parse_bool;

/// Bulk-update instruction applied to every bookmark a [`super::Filter`]
/// selects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Modifier {
    pub project: Option<String>,
    pub archived: Option<bool>,
}

impl Modifier {
    pub fn new(key: &str, value: &str) -> Result<Self> {
        let mut modifier = Self::default();
        modifier.set(key, value)?;
        Ok(modifier)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.trim().to_lowercase().as_str() {
            "project" => self.project = Some(value.to_string()),
            "archived" => {
                let archived = parse_bool(value).ok_or_else(|| {
                    BookmarkerError::Parse(format!("invalid archived format: {value}"))
                })?;
                self.archived = Some(archived);
            }
            other => {
                return Err(BookmarkerError::Parse(format!(
                    "unsupported modifier field: {other}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.project.as_deref().is_none_or(str::is_empty) && self.archived.is_none()
    }
}
