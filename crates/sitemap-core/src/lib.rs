//! Catalog sitemap generation: fetch cities and activities, render, deliver.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod delivery;
pub mod entry;
pub mod error;
pub mod logging;
pub mod mail;
pub mod pipeline;
pub mod render;
pub mod stage;

pub use aggregate::{EntrySettings, build_url_list};
pub use api::{ActivityFetcher, ApiClient, CityFetcher};
pub use config::{
    ChangeFrequency, ConfigLoadResult, ConfigSource, SitemapConfig, config_path, load_config,
};
pub use delivery::{Delivery, DeliveryTarget, TargetConflict, parse_recipients};
pub use entry::UrlEntry;
pub use error::SitemapError;
pub use logging::{LoggingDestination, init_logging};
pub use mail::{MailSender, OutgoingEmail, SmtpMailer};
pub use pipeline::{RunOutcome, RunRequest, run};
pub use render::{HandlebarsRenderer, Renderer};
pub use stage::{FileWriter, FsWriter, StagingArea};
