use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempDir};
use tracing::{debug, info};

use crate::error::SitemapError;

const STAGING_DIR_PREFIX: &str = "catalog-sitemap-";

const PROBE_PREFIX: &str = ".catalog-sitemap-probe";

/// Writes staged bytes to disk.
pub trait FileWriter: Send + Sync {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Whether new files can be created inside `dir`.
    fn can_write_in(&self, dir: &Path) -> bool;
}

/// [`FileWriter`] backed by `std::fs::write`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWriter;

impl FileWriter for FsWriter {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn can_write_in(&self, dir: &Path) -> bool {
        Builder::new().prefix(PROBE_PREFIX).tempfile_in(dir).is_ok()
    }
}

/// Run-scoped staging area for rendered sitemaps.
///
/// The backing directory is created on first use with a unique name and lives until
/// [`StagingArea::cleanup`] runs or the area is dropped.
pub struct StagingArea {
    prefix: String,
    root: Option<TempDir>,
    writer: Box<dyn FileWriter>,
}

impl StagingArea {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_writer(prefix, Box::new(FsWriter))
    }

    pub fn with_writer(prefix: impl Into<String>, writer: Box<dyn FileWriter>) -> Self {
        Self {
            prefix: prefix.into(),
            root: None,
            writer,
        }
    }

    /// `<prefix>_<locale>.xml`
    pub fn file_name(&self, locale: &str) -> String {
        format!("{}_{}.xml", self.prefix, locale)
    }

    /// The staging directory, if one has been created for this run.
    pub fn path(&self) -> Option<&Path> {
        self.root.as_ref().map(TempDir::path)
    }

    /// Whether the writer behind this area can create files in `dir`.
    pub fn can_write_in(&self, dir: &Path) -> bool {
        self.writer.can_write_in(dir)
    }

    /// Write `content` for `locale` and return the staged file path.
    ///
    /// Staging the same locale twice overwrites the earlier file.
    pub fn stage(&mut self, locale: &str, content: &str) -> Result<PathBuf, SitemapError> {
        let root = self.ensure_root()?;
        let path = root.join(self.file_name(locale));
        self.writer.write(&path, content.as_bytes())?;
        debug!(path = %path.display(), bytes = content.len(), "Staged sitemap");
        Ok(path)
    }

    /// Remove the staging directory. A later [`StagingArea::stage`] starts a fresh one.
    pub fn cleanup(&mut self) -> Result<(), SitemapError> {
        if let Some(root) = self.root.take() {
            info!(path = %root.path().display(), "Removing temporary folder");
            root.close()?;
        }
        Ok(())
    }

    fn ensure_root(&mut self) -> Result<PathBuf, SitemapError> {
        if let Some(root) = &self.root {
            return Ok(root.path().to_path_buf());
        }

        let root = Builder::new().prefix(STAGING_DIR_PREFIX).tempdir()?;
        let path = root.path().to_path_buf();
        debug!(path = %path.display(), "Created staging directory");
        self.root = Some(root);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingWriter;

    impl FileWriter for FailingWriter {
        fn write(&self, _path: &Path, _contents: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn can_write_in(&self, _dir: &Path) -> bool {
            false
        }
    }

    #[test]
    fn stages_under_prefixed_locale_name() {
        let mut staging = StagingArea::new("sitemap");
        let path = staging.stage("it-IT", "<urlset/>").expect("stage");

        assert!(path.is_absolute());
        assert_eq!(path.file_name().unwrap(), "sitemap_it-IT.xml");
        assert_eq!(fs::read_to_string(&path).unwrap(), "<urlset/>");
        assert_eq!(path.parent(), staging.path());
    }

    #[test]
    fn directory_is_created_lazily_and_reused() {
        let mut staging = StagingArea::new("catalog");
        assert!(staging.path().is_none());

        let first = staging.stage("it-IT", "one").expect("stage");
        let second = staging.stage("fr-FR", "two").expect("stage");
        assert_eq!(first.parent(), second.parent());

        let again = staging.stage("it-IT", "three").expect("stage");
        assert_eq!(again, first);
        assert_eq!(fs::read_to_string(&first).unwrap(), "three");
    }

    #[test]
    fn separate_runs_never_share_a_directory() {
        let mut one = StagingArea::new("sitemap");
        let mut two = StagingArea::new("sitemap");
        one.stage("it-IT", "a").expect("stage");
        two.stage("it-IT", "b").expect("stage");
        assert_ne!(one.path(), two.path());
    }

    #[test]
    fn cleanup_removes_directory() {
        let mut staging = StagingArea::new("sitemap");
        staging.stage("es-ES", "x").expect("stage");
        let dir = staging.path().unwrap().to_path_buf();

        staging.cleanup().expect("cleanup");
        assert!(!dir.exists());
        assert!(staging.path().is_none());
        staging.cleanup().expect("second cleanup is a no-op");
    }

    #[test]
    fn dropping_the_area_removes_directory() {
        let dir = {
            let mut staging = StagingArea::new("sitemap");
            staging.stage("es-ES", "x").expect("stage");
            staging.path().unwrap().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn writer_failures_surface_as_io_errors() {
        let mut staging = StagingArea::with_writer("sitemap", Box::new(FailingWriter));
        let err = staging.stage("it-IT", "x").unwrap_err();
        assert!(matches!(err, SitemapError::Io(_)));
    }
}
