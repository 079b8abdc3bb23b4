use serde::Deserialize;
use tracing::{info, warn};

use crate::api::{ActivityFetcher, CityFetcher};
use crate::config::{ChangeFrequency, SitemapConfig};
use crate::entry::UrlEntry;
use crate::error::SitemapError;

/// Per-kind metadata stamped onto every generated entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySettings {
    pub default_locale: String,
    pub page_limit: u32,
    pub cities_changefreq: ChangeFrequency,
    pub cities_priority: f64,
    pub activities_changefreq: ChangeFrequency,
    pub activities_priority: f64,
}

impl From<&SitemapConfig> for EntrySettings {
    fn from(config: &SitemapConfig) -> Self {
        Self {
            default_locale: config.default_locale.clone(),
            page_limit: config.api.page_limit,
            cities_changefreq: config.cities_changefreq(),
            cities_priority: config.cities_priority,
            activities_changefreq: config.activities_changefreq(),
            activities_priority: config.activities_priority,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CityPayload {
    id: u64,
    url: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivitiesPage {
    data: Vec<ActivityPayload>,
}

#[derive(Debug, Deserialize)]
struct ActivityPayload {
    url: String,
    #[serde(default)]
    title: Option<String>,
}

/// Walk cities and their activities (one page each) into an ordered entry list.
///
/// Only the first page of each listing is read. A branch whose request failed contributes
/// nothing; a response that is not the expected JSON aborts the run.
pub async fn build_url_list<F>(
    fetcher: &F,
    settings: &EntrySettings,
    locale: &str,
) -> Result<Vec<UrlEntry>, SitemapError>
where
    F: CityFetcher + ActivityFetcher + ?Sized,
{
    let locale = if locale.trim().is_empty() {
        info!(
            locale = %settings.default_locale,
            "Locale is not specified. Using default locale"
        );
        settings.default_locale.as_str()
    } else {
        locale
    };

    let mut urls = Vec::new();
    let Some(body) = fetcher.fetch_cities(locale, settings.page_limit).await else {
        warn!(locale, "No cities returned; the sitemap will be empty");
        return Ok(urls);
    };
    let cities: Vec<CityPayload> =
        serde_json::from_slice(&body).map_err(|err| SitemapError::malformed("cities", err))?;

    let city_count = cities.len();
    for city in cities {
        push_entry(
            &mut urls,
            city.url,
            settings.cities_changefreq,
            settings.cities_priority,
            city.name,
        );

        let Some(body) = fetcher
            .fetch_activities(city.id, locale, settings.page_limit)
            .await
        else {
            continue;
        };
        let page: ActivitiesPage = serde_json::from_slice(&body)
            .map_err(|err| SitemapError::malformed("activities", err))?;

        for activity in page.data {
            push_entry(
                &mut urls,
                activity.url,
                settings.activities_changefreq,
                settings.activities_priority,
                activity.title,
            );
        }
    }

    info!(
        locale,
        cities = city_count,
        entries = urls.len(),
        "Urls were generated successfully"
    );
    Ok(urls)
}

fn push_entry(
    urls: &mut Vec<UrlEntry>,
    location: String,
    change_frequency: ChangeFrequency,
    priority: f64,
    title: Option<String>,
) {
    if location.trim().is_empty() {
        warn!(title = title.as_deref().unwrap_or(""), "Skipping catalog item without url");
        return;
    }
    urls.push(UrlEntry::new(location, change_frequency, priority, title));
}
