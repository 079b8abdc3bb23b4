use std::path::Path;

use handlebars::Handlebars;
use serde_json::{Value, json};
use tracing::debug;

use crate::entry::UrlEntry;
use crate::error::SitemapError;

pub const SITEMAP_TEMPLATE: &str = "sitemap.xml";
pub const EMAIL_HTML_TEMPLATE: &str = "email.html";
pub const EMAIL_TEXT_TEMPLATE: &str = "email.txt";

const TEMPLATE_EXTENSION: &str = "hbs";

const EMBEDDED_TEMPLATES: [(&str, &str); 3] = [
    (SITEMAP_TEMPLATE, include_str!("../templates/sitemap.xml.hbs")),
    (EMAIL_HTML_TEMPLATE, include_str!("../templates/email.html.hbs")),
    (EMAIL_TEXT_TEMPLATE, include_str!("../templates/email.txt.hbs")),
];

/// Turns a named template plus its bindings into text.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, data: &Value) -> Result<String, SitemapError>;
}

pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// Renderer backed by the built-in templates only.
    pub fn new() -> Result<Self, SitemapError> {
        Self::with_overrides(None)
    }

    /// Built-in templates, each replaced by `<dir>/<name>.hbs` when that file exists.
    pub fn with_overrides(dir: Option<&Path>) -> Result<Self, SitemapError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::html_escape);

        for (name, source) in EMBEDDED_TEMPLATES {
            let override_path = dir.map(|dir| dir.join(format!("{name}.{TEMPLATE_EXTENSION}")));
            match override_path {
                Some(path) if path.is_file() => {
                    debug!(template = name, path = %path.display(), "Using template override");
                    registry.register_template_file(name, &path)?;
                }
                _ => registry.register_template_string(name, source)?,
            }
        }

        Ok(Self { registry })
    }
}

impl Renderer for HandlebarsRenderer {
    fn render(&self, template: &str, data: &Value) -> Result<String, SitemapError> {
        Ok(self.registry.render(template, data)?)
    }
}

/// Render the sitemap document for `urls`, in order.
pub fn render_sitemap<R>(renderer: &R, urls: &[UrlEntry]) -> Result<String, SitemapError>
where
    R: Renderer + ?Sized,
{
    renderer.render(SITEMAP_TEMPLATE, &json!({ "urls": urls }))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::config::ChangeFrequency;

    #[test]
    fn sitemap_lists_entries_in_order_and_escapes_locations() {
        let renderer = HandlebarsRenderer::new().expect("renderer");
        let urls = vec![
            UrlEntry::new("https://x/c1", ChangeFrequency::Weekly, 0.7, Some("Paris".into())),
            UrlEntry::new("https://x/a1?lang=it&page=2", ChangeFrequency::Daily, 0.5, None),
        ];

        let xml = render_sitemap(&renderer, &urls).expect("render");

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        let first = xml.find("<loc>https://x/c1</loc>").expect("city loc");
        let second = xml
            .find("<loc>https://x/a1?lang&#x3D;it&amp;page&#x3D;2</loc>")
            .expect("activity loc");
        assert!(first < second);
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>0.7</priority>"));
        assert!(xml.contains("<priority>0.5</priority>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }

    #[test]
    fn empty_sitemap_is_still_a_document() {
        let renderer = HandlebarsRenderer::new().expect("renderer");
        let xml = render_sitemap(&renderer, &[]).expect("render");
        assert!(xml.contains("<urlset"));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn email_bodies_mention_the_filename() {
        let renderer = HandlebarsRenderer::new().expect("renderer");
        let data = json!({ "filename": "sitemap_it-IT.xml" });
        let html = renderer.render(EMAIL_HTML_TEMPLATE, &data).expect("html");
        let text = renderer.render(EMAIL_TEXT_TEMPLATE, &data).expect("text");
        assert!(html.contains("<strong>sitemap_it-IT.xml</strong>"));
        assert!(text.contains("sitemap sitemap_it-IT.xml is attached"));
    }

    #[test]
    fn template_directory_overrides_single_template() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("email.txt.hbs"), "file={{filename}}").expect("write");

        let renderer = HandlebarsRenderer::with_overrides(Some(temp.path())).expect("renderer");
        let data = json!({ "filename": "catalog_es-ES.xml" });

        assert_eq!(
            renderer.render(EMAIL_TEXT_TEMPLATE, &data).expect("text"),
            "file=catalog_es-ES.xml"
        );
        assert!(
            renderer
                .render(EMAIL_HTML_TEMPLATE, &data)
                .expect("html")
                .contains("catalog_es-ES.xml")
        );
    }

    #[test]
    fn strict_mode_rejects_missing_bindings() {
        let renderer = HandlebarsRenderer::new().expect("renderer");
        let err = renderer.render(EMAIL_HTML_TEMPLATE, &json!({})).unwrap_err();
        assert!(matches!(err, SitemapError::Render(_)));
    }

    #[test]
    fn markup_characters_become_entities() {
        let renderer = HandlebarsRenderer::new().expect("renderer");
        let urls = vec![UrlEntry::new(
            "https://x/it's-<new>\"tour\"",
            ChangeFrequency::Daily,
            0.5,
            None,
        )];

        let xml = render_sitemap(&renderer, &urls).expect("render");

        assert!(xml.contains("<loc>https://x/it&#x27;s-&lt;new&gt;&quot;tour&quot;</loc>"));
    }
}
