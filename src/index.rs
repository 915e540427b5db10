//! Report discovery for batch runs
//!
//! Walks a directory (or takes a single file), skips hidden entries and
//! anything matching the exclude globs, and hashes every report with blake3
//! so byte-identical reports can skip the comparison.

use crate::types::ReportEntry;
use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{info, warn};
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Index every report under `root`, sorted by relative path
pub fn index_reports(root: &Path, exclude_patterns: &[String]) -> Result<Vec<ReportEntry>> {
    if !root.exists() {
        bail!("Path does not exist: {}", root.display());
    }

    if root.is_file() {
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(vec![make_entry(root, name)?]);
    }

    let excludes = build_globset(exclude_patterns)?;
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if excludes.is_match(&relative) {
            continue;
        }

        match make_entry(entry.path(), relative) {
            Ok(report) => entries.push(report),
            Err(e) => warn!("Failed to index {}: {}", entry.path().display(), e),
        }
    }

    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    info!("Indexed {} reports under {}", entries.len(), root.display());
    Ok(entries)
}

fn make_entry(path: &Path, relative_path: String) -> Result<ReportEntry> {
    let size = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    Ok(ReportEntry {
        path: path.to_path_buf(),
        relative_path,
        size,
        content_hash: hash_file(path)?,
    })
}

/// Streaming blake3 hash of a file (hex)
pub fn hash_file(path: &Path) -> Result<String> {
    let file =
        fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 16384];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Read a report as UTF-8 text
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    String::from_utf8(bytes).with_context(|| format!("Not valid UTF-8 text: {}", path.display()))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim().trim_end_matches('/');
        if pattern.is_empty() {
            continue;
        }
        builder.add(
            Glob::new(pattern).with_context(|| format!("Invalid exclude pattern: {}", pattern))?,
        );
        // a bare name also excludes everything below a folder of that name
        builder.add(Glob::new(&format!("**/{}", pattern))?);
        builder.add(Glob::new(&format!("{}/**", pattern))?);
        builder.add(Glob::new(&format!("**/{}/**", pattern))?);
    }
    builder.build().context("Failed to build exclude patterns")
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
