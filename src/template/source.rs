//! Content source abstraction for reading template files from the filesystem or ZIP bundles.

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::{Read, Seek};

use super::{TemplateConfig, TemplateConfigProvider};

/// Where template files come from: a directory on disk or a ZIP bundle.
pub trait ContentSource {
    /// Read the file at a logical path as UTF-8 text.
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String>;
    /// Files directly inside a directory (not its subdirectories), as full logical paths.
    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>>;
}

/// Reads template files from the local filesystem.
pub struct FsSource;

impl ContentSource for FsSource {
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String> {
        std::fs::read_to_string(path.as_str())
            .with_context(|| format!("Failed to read template file {}", path))
    }

    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        let walker = walkdir::WalkDir::new(path.as_std_path())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.with_context(|| format!("Failed to list templates in {}", path))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let p = Utf8PathBuf::from_path_buf(entry.into_path())
                .map_err(|p| anyhow!("Template path {} is not UTF-8", p.display()))?;
            files.push(p);
        }
        Ok(files)
    }
}

/// Reads template files from a ZIP bundle.
///
/// Entry names are indexed once when the bundle is opened; directory
/// entries are skipped.
pub struct ZipSource<R: Read + Seek> {
    archive: zip::ZipArchive<R>,
    entries: Vec<Utf8PathBuf>,
}

impl<R: Read + Seek> ZipSource<R> {
    pub fn new(reader: R) -> Result<Self> {
        let archive = zip::ZipArchive::new(reader).context("Not a valid template bundle")?;
        let mut entries: Vec<Utf8PathBuf> = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(Utf8PathBuf::from)
            .collect();
        entries.sort();
        Ok(Self { archive, entries })
    }

    /// Every file entry in the bundle, sorted.
    pub fn entries(&self) -> &[Utf8PathBuf] {
        &self.entries
    }
}

/// Bundle entries are stored without a leading `./` or `/`.
fn bundle_path(path: &Utf8Path) -> &str {
    path.as_str().trim_start_matches("./").trim_start_matches('/')
}

impl<R: Read + Seek> ContentSource for ZipSource<R> {
    fn read_to_string(&mut self, path: &Utf8Path) -> Result<String> {
        let name = bundle_path(path);
        let mut entry = self
            .archive
            .by_name(name)
            .with_context(|| format!("Template bundle has no entry {}", name))?;
        let mut text = String::with_capacity(entry.size() as usize);
        entry
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to read template bundle entry {}", name))?;
        Ok(text)
    }

    fn list_dir(&mut self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
        let dir = bundle_path(path).trim_end_matches('/');
        Ok(self
            .entries
            .iter()
            .filter(|e| e.parent().map(Utf8Path::as_str).unwrap_or("") == dir)
            .cloned()
            .collect())
    }
}

/// Serves template configs stored as `<root>/<template_id>.json` in any
/// [`ContentSource`].
pub struct SourceTemplateProvider<S: ContentSource> {
    root: Utf8PathBuf,
    source: S,
}

impl<S: ContentSource> SourceTemplateProvider<S> {
    pub fn new(root: impl AsRef<Utf8Path>, source: S) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            source,
        }
    }

    /// Logical path of the JSON file for `template_id`.
    pub fn template_path(&self, template_id: &str) -> Utf8PathBuf {
        self.root.join(format!("{}.json", template_id))
    }

    /// Ids of all templates stored directly under the root, sorted. Files in
    /// subdirectories cannot be fetched by id and are not listed.
    pub fn template_ids(&mut self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .source
            .list_dir(&self.root)?
            .into_iter()
            .filter(|p| p.extension() == Some("json"))
            .filter_map(|p| p.file_stem().map(str::to_string))
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

impl<S: ContentSource> TemplateConfigProvider for SourceTemplateProvider<S> {
    fn fetch(&mut self, template_id: &str) -> Result<TemplateConfig> {
        let path = self.template_path(template_id);
        let text = self.source.read_to_string(&path)?;
        TemplateConfig::from_json(&text).with_context(|| format!("Invalid template {}", path))
    }
}
