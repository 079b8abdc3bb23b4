use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::aggregate::{EntrySettings, build_url_list};
use crate::api::{ActivityFetcher, CityFetcher};
use crate::config::SitemapConfig;
use crate::delivery::{Delivery, DeliveryTarget, TargetConflict};
use crate::error::SitemapError;
use crate::mail::MailSender;
use crate::render::{Renderer, render_sitemap};
use crate::stage::StagingArea;

/// What the caller asked one run to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub locale: Option<String>,
    pub dir: Option<String>,
    pub recipients: Option<String>,
}

/// Terminal state of a run that did not hit a hard error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Saved(PathBuf),
    Mailed { recipients: Vec<String> },
    MailFailed { recipients: Vec<String> },
    Conflict,
    InvalidLocale { locale: String, supported: Vec<String> },
}

impl RunOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Saved(_) | RunOutcome::Mailed { .. } | RunOutcome::Conflict => 0,
            RunOutcome::MailFailed { .. } | RunOutcome::InvalidLocale { .. } => 1,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Saved(path) => {
                write!(f, "Sitemap has been successfully saved to {}", path.display())
            }
            RunOutcome::Mailed { recipients } => {
                write!(f, "Sitemap has been sent by email to {}", recipients.join(", "))
            }
            RunOutcome::MailFailed { recipients } => write!(
                f,
                "Sitemap could not be sent by email to {}",
                recipients.join(", ")
            ),
            RunOutcome::Conflict => write!(
                f,
                "--dir and --recipients options are specified at the same time. \
                 Please select one of them for a single run."
            ),
            RunOutcome::InvalidLocale { locale, supported } => write!(
                f,
                "{locale} locale is not valid. Valid locales are {}",
                supported.join(", ")
            ),
        }
    }
}

/// Resolve the requested locale: absent or empty means the configured default, anything
/// else must be supported exactly as given.
pub fn resolve_locale(config: &SitemapConfig, requested: Option<&str>) -> Option<String> {
    match requested.filter(|locale| !locale.is_empty()) {
        Some(locale) if config.is_supported_locale(locale) => Some(locale.to_string()),
        Some(_) => None,
        None => {
            info!(
                locale = %config.default_locale,
                "No locale specified. Using default locale"
            );
            Some(config.default_locale.clone())
        }
    }
}

/// Fetch, render and deliver one locale's sitemap.
///
/// Locale and target checks happen before any request leaves the process.
pub async fn run<F>(
    config: &SitemapConfig,
    request: &RunRequest,
    fetcher: &F,
    renderer: &dyn Renderer,
    mailer: &dyn MailSender,
) -> Result<RunOutcome, SitemapError>
where
    F: CityFetcher + ActivityFetcher + ?Sized,
{
    let Some(locale) = resolve_locale(config, request.locale.as_deref()) else {
        let locale = request.locale.clone().unwrap_or_default();
        warn!(locale = %locale, "Rejected unsupported locale");
        return Ok(RunOutcome::InvalidLocale {
            locale,
            supported: config.supported_locales.clone(),
        });
    };

    let target = match DeliveryTarget::resolve(
        request.dir.as_deref(),
        request.recipients.as_deref(),
        config.default_directory_path(),
    ) {
        Ok(target) => target,
        Err(TargetConflict) => {
            warn!("Both a target directory and recipients were requested; nothing delivered");
            return Ok(RunOutcome::Conflict);
        }
    };

    let settings = EntrySettings::from(config);
    let urls = build_url_list(fetcher, &settings, &locale).await?;
    let text = render_sitemap(renderer, &urls)?;

    let mut delivery = Delivery::new(
        StagingArea::new(config.sitemap_prefix()),
        renderer,
        mailer,
        config.email_from.as_str(),
    );

    match target {
        DeliveryTarget::Directory(dir) => {
            let path = delivery.finalize_to_directory(&dir, &locale, &text)?;
            Ok(RunOutcome::Saved(path))
        }
        DeliveryTarget::EmailRecipients(recipients) => {
            if delivery.finalize_to_email(&recipients, &locale, &text).await? {
                Ok(RunOutcome::Mailed { recipients })
            } else {
                Ok(RunOutcome::MailFailed { recipients })
            }
        }
    }
}
