use serde::Serialize;

use crate::config::ChangeFrequency;

/// One `<url>` record of the sitemap.
///
/// Field names follow the sitemap protocol so templates can bind them directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlEntry {
    #[serde(rename = "loc")]
    pub location: String,
    #[serde(rename = "changefreq")]
    pub change_frequency: ChangeFrequency,
    pub priority: f64,
    /// Display label; empty when the catalog did not provide one.
    pub title: String,
}

impl UrlEntry {
    pub fn new(
        location: impl Into<String>,
        change_frequency: ChangeFrequency,
        priority: f64,
        title: Option<String>,
    ) -> Self {
        Self {
            location: location.into(),
            change_frequency,
            priority,
            title: title.unwrap_or_default(),
        }
    }
}
