//! Source crawling.
//!
//! Walks the content folder (and the data folder), hashes every file the
//! markup engines understand and parses only what changed:
//!
//! | Store has source? | Same hash? | Status      | Action          |
//! |-------------------|------------|-------------|-----------------|
//! | no                | -          | `New`       | parse + insert  |
//! | yes               | no         | `Updated`   | parse + replace |
//! | yes               | yes        | `Identical` | nothing         |
//!
//! Parsing runs on the rayon pool; store writes happen afterwards on the
//! calling thread.

use crate::{
    config::SiteConfig,
    document::{Document, DocumentTypes, rootpath_for},
    log,
    parser::{MarkupEngines, ParseError, Parser},
    store::ContentStore,
    utils::hash,
};
use rayon::prelude::*;
use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use walkdir::{DirEntry, WalkDir};

/// Engine identifier whose extensions belong to the data folder.
const DATA_ENGINE: &str = "DataFileEngine";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Updated,
    Identical,
}

/// Outcome of one crawl.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub new: usize,
    pub updated: usize,
    pub identical: usize,
    /// Files excluded with a warning (no type, invalid date, ...).
    pub skipped: usize,
    /// Failures that must fail the bake.
    pub errors: Vec<String>,
}

impl CrawlReport {
    pub fn merge(&mut self, other: CrawlReport) {
        self.new += other.new;
        self.updated += other.updated;
        self.identical += other.identical;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }

    fn count(&mut self, status: FileStatus) {
        match status {
            FileStatus::New => self.new += 1,
            FileStatus::Updated => self.updated += 1,
            FileStatus::Identical => self.identical += 1,
        }
    }
}

/// A source file queued for parsing.
struct Source {
    path: PathBuf,
    source_uri: String,
    sha1: String,
    status: FileStatus,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Folder {
    Content,
    Data,
}

pub struct Crawler {
    config: &'static SiteConfig,
    parser: Parser,
    store: Arc<dyn ContentStore>,
    types: Arc<DocumentTypes>,
}

impl Crawler {
    pub fn new(
        config: &'static SiteConfig,
        engines: Arc<MarkupEngines>,
        store: Arc<dyn ContentStore>,
        types: Arc<DocumentTypes>,
    ) -> Self {
        Self {
            config,
            parser: Parser::new(config, engines),
            store,
            types,
        }
    }

    /// Crawl the content folder.
    pub fn crawl(&self) -> CrawlReport {
        self.crawl_folder(&self.config.build.content, Folder::Content)
    }

    /// Crawl the data folder. A missing folder yields an empty report.
    pub fn crawl_data(&self) -> CrawlReport {
        self.crawl_folder(&self.config.build.data, Folder::Data)
    }

    /// Delete stored documents whose source file no longer exists.
    pub fn prune(&self) -> Vec<String> {
        self.store
            .all_documents()
            .into_iter()
            .filter(|doc| !doc.file.is_file())
            .filter_map(|doc| self.store.delete_by_source(&doc.source_uri))
            .map(|doc| doc.source_uri)
            .collect()
    }

    fn crawl_folder(&self, dir: &Path, folder: Folder) -> CrawlReport {
        let mut report = CrawlReport::default();
        if !dir.is_dir() {
            return report;
        }

        let sources: Vec<Source> = WalkDir::new(dir)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
            .filter(|path| self.belongs_to(path, folder))
            .filter_map(|path| self.inspect(dir, path, &mut report))
            .collect();

        let parsed: Vec<_> = sources
            .into_par_iter()
            .map(|source| {
                let result = self.parser.process_file(&source.path);
                (source, result)
            })
            .collect();

        for (source, result) in parsed {
            match result {
                Ok(Some(doc)) => self.store_document(source, doc, folder, &mut report),
                Ok(None) => report.skipped += 1,
                Err(err) if err.is_skip() => {
                    log!("warn"; "{err}, skipped");
                    report.skipped += 1;
                }
                Err(err) => {
                    log!("error"; "{err}");
                    report.errors.push(err.to_string());
                }
            }
        }

        report
    }

    /// Whether the parser handles `path` and it lives in the right folder.
    fn belongs_to(&self, path: &Path, folder: Folder) -> bool {
        if !self.parser.supports(path) {
            return false;
        }
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let is_data = self.parser.engines().implementation(&extension).as_deref() == Some(DATA_ENGINE);
        is_data == (folder == Folder::Data)
    }

    /// Hash a file and compare it with the stored record.
    ///
    /// Identical files are counted here and not parsed again.
    fn inspect(&self, dir: &Path, path: PathBuf, report: &mut CrawlReport) -> Option<Source> {
        let source_uri = relative_uri(dir, &path)?;
        let sha1 = match hash::file_digest(&path) {
            Ok(sha1) => sha1,
            Err(err) => {
                let err = ParseError::Io(path, err);
                log!("error"; "{err}");
                report.errors.push(err.to_string());
                return None;
            }
        };

        let status = match self.store.find_by_source(&source_uri) {
            None => FileStatus::New,
            Some(doc) if doc.sha1 == sha1 => FileStatus::Identical,
            Some(_) => FileStatus::Updated,
        };
        if status == FileStatus::Identical {
            report.count(status);
            return None;
        }

        Some(Source {
            path,
            source_uri,
            sha1,
            status,
        })
    }

    fn store_document(&self, source: Source, mut doc: Document, folder: Folder, report: &mut CrawlReport) {
        if !self.types.contains(&doc.doc_type) {
            log!("warn"; "{}: unknown document type `{}`, skipped", source.source_uri, doc.doc_type);
            report.skipped += 1;
            return;
        }

        doc.uri = match folder {
            Folder::Content => self.content_uri(&source.source_uri),
            Folder::Data => source.source_uri.clone(),
        };
        doc.no_extension_uri = self.no_extension_uri(&doc.uri);
        doc.rootpath = rootpath_for(&doc.uri);
        doc.name = source
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        doc.file = source.path;
        doc.source_uri = source.source_uri;
        doc.sha1 = source.sha1;

        if let Err(err) = self.store.add_document(doc) {
            log!("error"; "{err}");
            report.errors.push(err.to_string());
            return;
        }
        report.count(source.status);
    }

    /// Output uri of a content source.
    ///
    /// `blog/first.md` becomes `blog/first.html`, or `blog/first/index.html`
    /// when extension-less uris apply to it.
    fn content_uri(&self, source_uri: &str) -> String {
        let extension = &self.config.build.output_extension;
        let content = &self.config.content;
        let base = Path::new(source_uri).with_extension("");
        let base = base.to_string_lossy();

        let pretty = content.uri_no_extension
            && content
                .uri_no_extension_prefix
                .as_deref()
                .is_none_or(|prefix| source_uri.starts_with(prefix.trim_start_matches('/')));
        let is_index = base == "index" || base.ends_with("/index");

        if pretty && !is_index {
            format!("{base}/index{extension}")
        } else {
            format!("{base}{extension}")
        }
    }

    /// `blog/first/index.html` → `blog/first/`.
    fn no_extension_uri(&self, uri: &str) -> Option<String> {
        let index = format!("/index{}", self.config.build.output_extension);
        uri.strip_suffix(&index).map(|base| format!("{base}/"))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// `/`-separated path of `path` below `dir`.
fn relative_uri(dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(dir).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

// ============================================================================
// Tests
// ============================================================================
