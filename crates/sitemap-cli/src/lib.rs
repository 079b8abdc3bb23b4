pub mod cli_args;

use anyhow::Context;
use sitemap_core::logging::{LoggingDestination, init_logging};
use sitemap_core::{ApiClient, HandlebarsRenderer, SmtpMailer, load_config};

pub use cli_args::Cli;

/// Execute one sitemap run and return the process exit code.
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let destination = if cli.no_log_file {
        LoggingDestination::StderrOnly
    } else {
        LoggingDestination::FileAndStderr
    };
    if let Err(err) = init_logging(destination) {
        eprintln!("Warning: logging unavailable: {err}");
    }

    let load = load_config(cli.config.as_deref());
    for warning in &load.warnings {
        eprintln!("Warning: {warning}");
    }
    let mut config = load.config;
    config.apply_env_overrides()?;
    config.validate()?;

    if cli.locale.as_deref().is_none_or(str::is_empty) {
        println!("No locale specified. Using default locale.");
    }

    let client = ApiClient::from_config(&config).context("failed to build API client")?;
    let renderer = HandlebarsRenderer::with_overrides(config.templates_path().as_deref())
        .context("failed to load templates")?;
    let mailer = SmtpMailer::from_settings(&config.smtp).context("failed to set up SMTP")?;

    let outcome = sitemap_core::run(&config, &cli.to_request(), &client, &renderer, &mailer).await?;
    println!("{outcome}");
    Ok(outcome.exit_code())
}
