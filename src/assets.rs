//! Static asset copying.
//!
//! Everything under the assets folder lands at the same relative path in the
//! output folder. Files whose copy is already newer than the source are left
//! alone unless `clean` is set.

use crate::{config::SiteConfig, log};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

const IGNORED_FILES: &[&str] = &[".DS_Store"];

#[derive(Debug, Error)]
#[error("cannot copy asset `{}` to `{}`", .source_path.display(), .dest.display())]
pub struct AssetError {
    pub source_path: PathBuf,
    pub dest: PathBuf,
    #[source]
    pub cause: io::Error,
}

/// Result of one copy pass.
#[derive(Debug, Default)]
pub struct AssetReport {
    pub copied: usize,
    pub up_to_date: usize,
    pub errors: Vec<AssetError>,
}

/// Copy the assets folder into the output folder.
///
/// A missing assets folder is not an error.
pub fn copy_assets(config: &SiteConfig, clean: bool) -> AssetReport {
    let mut report = AssetReport::default();
    let assets = &config.build.assets;
    if !assets.is_dir() {
        return report;
    }

    let files = WalkDir::new(assets)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            !IGNORED_FILES.contains(&name.as_ref())
        });

    for entry in files {
        let source = entry.path();
        let Ok(relative) = source.strip_prefix(assets) else {
            continue;
        };
        let dest = config.build.output.join(relative);

        if !clean && is_up_to_date(source, &dest) {
            report.up_to_date += 1;
            continue;
        }

        match copy_file(source, &dest) {
            Ok(()) => {
                log!("assets"; "{}", relative.display());
                report.copied += 1;
            }
            Err(cause) => report.errors.push(AssetError {
                source_path: source.to_path_buf(),
                dest,
                cause,
            }),
        }
    }

    report
}

fn copy_file(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest).map(drop)
}

/// Destination exists and is not older than the source.
fn is_up_to_date(source: &Path, dest: &Path) -> bool {
    let modified = |path: &Path| path.metadata().and_then(|meta| meta.modified()).ok();
    match (modified(source), modified(dest)) {
        (Some(source), Some(dest)) => source <= dest,
        _ => false,
    }
}
