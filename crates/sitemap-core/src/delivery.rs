use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::expand_path;
use crate::error::SitemapError;
use crate::mail::{EmailAttachment, MailSender, OutgoingEmail};
use crate::render::{EMAIL_HTML_TEMPLATE, EMAIL_TEXT_TEMPLATE, Renderer};
use crate::stage::StagingArea;

const ATTACHMENT_CONTENT_TYPE: &str = "application/xml";
const SUBJECT_PREFIX: &str = "MUSEMENT.COM sitemap for";

/// Where a run's sitemap ends up. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryTarget {
    Directory(PathBuf),
    EmailRecipients(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("--dir and --recipients options are specified at the same time")]
pub struct TargetConflict;

impl DeliveryTarget {
    /// Pick the single target requested; blank options count as absent.
    pub fn resolve(
        dir: Option<&str>,
        recipients: Option<&str>,
        default_dir: PathBuf,
    ) -> Result<Self, TargetConflict> {
        let dir = dir.map(str::trim).filter(|value| !value.is_empty());
        let recipients = recipients.map(str::trim).filter(|value| !value.is_empty());

        match (dir, recipients) {
            (Some(_), Some(_)) => Err(TargetConflict),
            (None, Some(raw)) => Ok(DeliveryTarget::EmailRecipients(parse_recipients(raw))),
            (Some(dir), None) => Ok(DeliveryTarget::Directory(expand_path(dir))),
            (None, None) => Ok(DeliveryTarget::Directory(default_dir)),
        }
    }
}

/// Split a comma-separated recipient list, trimming each address. No validation happens here.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(String::from)
        .collect()
}

/// Moves a staged sitemap to its final destination.
pub struct Delivery<'a> {
    staging: StagingArea,
    renderer: &'a dyn Renderer,
    mailer: &'a dyn MailSender,
    email_from: String,
}

impl<'a> Delivery<'a> {
    pub fn new(
        staging: StagingArea,
        renderer: &'a dyn Renderer,
        mailer: &'a dyn MailSender,
        email_from: impl Into<String>,
    ) -> Self {
        Self {
            staging,
            renderer,
            mailer,
            email_from: email_from.into(),
        }
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Stage `content` and mirror it into `target_dir`, overwriting same-named files.
    ///
    /// The staging directory is removed on every path out of this call.
    pub fn finalize_to_directory(
        &mut self,
        target_dir: &Path,
        locale: &str,
        content: &str,
    ) -> Result<PathBuf, SitemapError> {
        let outcome = self.stage_and_mirror(target_dir, locale, content);

        if let Err(err) = self.staging.cleanup() {
            if outcome.is_ok() {
                return Err(err);
            }
            warn!(error = %err, "Failed to remove staging directory");
        }

        let path = outcome?;
        info!(path = %path.display(), "Sitemap saved");
        Ok(path)
    }

    /// Stage `content` and mail it as an attachment.
    ///
    /// Returns `Ok(false)` when the transport refused the message; it is not retried. The
    /// staged file stays in place until this delivery is dropped.
    pub async fn finalize_to_email(
        &mut self,
        recipients: &[String],
        locale: &str,
        content: &str,
    ) -> Result<bool, SitemapError> {
        let staged = self.staging.stage(locale, content)?;
        let filename = self.staging.file_name(locale);

        let bindings = json!({ "filename": filename });
        let html_body = self.renderer.render(EMAIL_HTML_TEMPLATE, &bindings)?;
        let text_body = self.renderer.render(EMAIL_TEXT_TEMPLATE, &bindings)?;

        let email = OutgoingEmail {
            from: self.email_from.clone(),
            to: recipients.to_vec(),
            subject: format!("{SUBJECT_PREFIX} {filename}"),
            html_body,
            text_body,
            attachment: EmailAttachment {
                filename,
                content_type: ATTACHMENT_CONTENT_TYPE.to_string(),
                body: fs::read(&staged)?,
            },
        };

        match self.mailer.send(&email).await {
            Ok(()) => {
                info!(recipients = %recipients.join(", "), "Sitemap sent by email successfully");
                Ok(true)
            }
            Err(err) => {
                error!(
                    cause = "mail transport",
                    recipients = %recipients.join(", "),
                    error = %err,
                    "Send failed - sitemap was not delivered"
                );
                Ok(false)
            }
        }
    }

    fn stage_and_mirror(
        &mut self,
        target_dir: &Path,
        locale: &str,
        content: &str,
    ) -> Result<PathBuf, SitemapError> {
        let staged = self.staging.stage(locale, content)?;
        let staging_dir = staged
            .parent()
            .ok_or_else(|| SitemapError::message("staged file has no parent directory"))?;

        ensure_directory(target_dir)?;
        if !self.staging.can_write_in(target_dir) {
            error!(path = %target_dir.display(), "Target directory is not writeable");
            return Err(SitemapError::DirectoryNotWritable {
                path: target_dir.to_path_buf(),
            });
        }

        mirror(staging_dir, target_dir)?;
        Ok(target_dir.join(self.staging.file_name(locale)))
    }
}

fn ensure_directory(dir: &Path) -> Result<(), SitemapError> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }
    builder.create(dir)?;
    Ok(())
}

/// Copy every file under `source` into `target`, keeping relative paths.
fn mirror(source: &Path, target: &Path) -> Result<(), SitemapError> {
    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry.map_err(|err| SitemapError::message(format!("mirror failed: {err}")))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|err| SitemapError::message(format!("mirror failed: {err}")))?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}
