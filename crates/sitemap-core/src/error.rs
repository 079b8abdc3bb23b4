use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("{0}")]
    Message(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed {resource} response: {source}")]
    MalformedResponse {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),
    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),
    #[error("Can't move sitemap to \"{}\" - directory is not writeable", path.display())]
    DirectoryNotWritable { path: PathBuf },
    #[error("mail error: {0}")]
    Mail(String),
}

impl SitemapError {
    pub fn message<T: Into<String>>(message: T) -> Self {
        SitemapError::Message(message.into())
    }

    pub fn malformed(resource: &'static str, source: serde_json::Error) -> Self {
        SitemapError::MalformedResponse { resource, source }
    }
}
