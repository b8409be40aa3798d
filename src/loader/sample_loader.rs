// Walk a sample folder and sort every wav into a symbol bucket.
//
// A file is tagged by a `__SYMBOL` suffix on its name (`take3__ay.wav`), or
// failing that by the name of the folder it sits in (`A/take3.wav`). When
// both exist and disagree the filename wins and the disagreement is kept as
// a conflict.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::shared::{AUDIO_EXTENSION, CHROMATIC_FILE, Symbol, TagSource};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub path: PathBuf,
    pub symbol: Symbol,
    pub source: TagSource,
}

impl Sample {
    pub fn new(path: impl Into<PathBuf>, symbol: Symbol, source: TagSource) -> Self {
        Self { path: path.into(), symbol, source }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SymbolConflict {
    pub path: PathBuf,
    pub filename_symbol: Symbol,
    pub folder_symbol: Symbol,
}

impl fmt::Display for SymbolConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "filename tag overrides folder symbol for {}: {} (folder {})",
            self.path.display(),
            self.filename_symbol,
            self.folder_symbol
        )
    }
}

// Something below the root we couldn't read; reported, never fatal
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Symbol -> samples, each bucket sorted by path. Every symbol has a bucket,
/// possibly empty. Conflicts found while filling the buckets travel with them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Buckets {
    by_symbol: BTreeMap<Symbol, Vec<Sample>>,
    conflicts: Vec<SymbolConflict>,
}

impl Default for Buckets {
    fn default() -> Self {
        Self {
            by_symbol: Symbol::ALL.into_iter().map(|s| (s, Vec::new())).collect(),
            conflicts: Vec::new(),
        }
    }
}

impl Buckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Self {
        let mut buckets = Self::new();
        for sample in samples {
            buckets.insert(sample);
        }
        buckets.sort();
        buckets
    }

    pub fn insert(&mut self, sample: Sample) {
        self.by_symbol.entry(sample.symbol).or_default().push(sample);
    }

    pub fn record_conflict(&mut self, conflict: SymbolConflict) {
        self.conflicts.push(conflict);
    }

    fn sort(&mut self) {
        for bucket in self.by_symbol.values_mut() {
            bucket.sort_by(|a, b| a.path.cmp(&b.path));
        }
    }

    pub fn get(&self, symbol: Symbol) -> &[Sample] {
        self.by_symbol.get(&symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn conflicts(&self) -> &[SymbolConflict] {
        &self.conflicts
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &[Sample])> {
        self.by_symbol.iter().map(|(s, b)| (*s, b.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.by_symbol.values().map(Vec::len).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub root: PathBuf,
    pub buckets: Buckets,
    pub untagged: Vec<PathBuf>,
    pub unknown_tags: BTreeMap<String, Vec<PathBuf>>, // `__QQ` style tags we don't know
    pub issues: Vec<ScanIssue>,
}

impl ScanResult {
    pub fn conflicts(&self) -> &[SymbolConflict] {
        self.buckets.conflicts()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detection {
    pub symbol: Option<Symbol>,
    pub source: Option<TagSource>,
    pub conflict: Option<SymbolConflict>,
    pub unknown_tag: Option<String>,
}

// `voice__AY.wav` -> Some("AY"); the suffix has to be letters only
fn filename_tag(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let (_, tag) = stem.rsplit_once("__")?;
    (!tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphabetic())).then(|| tag.to_ascii_uppercase())
}

fn folder_tag(path: &Path) -> Option<Symbol> {
    let parent = path.parent()?.file_name()?.to_str()?;
    parent.parse().ok()
}

pub fn detect_symbol(path: &Path) -> Detection {
    let raw_tag = filename_tag(path);
    let tag_symbol = raw_tag.as_deref().and_then(|t| t.parse::<Symbol>().ok());
    let folder_symbol = folder_tag(path);

    match (tag_symbol, folder_symbol) {
        (Some(tag), folder) => Detection {
            symbol: Some(tag),
            source: Some(TagSource::Filename),
            conflict: folder.filter(|f| *f != tag).map(|f| SymbolConflict {
                path: path.to_path_buf(),
                filename_symbol: tag,
                folder_symbol: f,
            }),
            unknown_tag: None,
        },
        (None, Some(folder)) => Detection {
            symbol: Some(folder),
            source: Some(TagSource::Folder),
            conflict: None,
            unknown_tag: None,
        },
        (None, None) => Detection { symbol: None, source: None, conflict: None, unknown_tag: raw_tag },
    }
}

fn is_audio_file(path: &Path) -> bool {
    let is_wav = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(AUDIO_EXTENSION));
    let is_output = path.file_name().is_some_and(|n| n.eq_ignore_ascii_case(CHROMATIC_FILE));
    is_wav && !is_output
}

// All candidate audio files below `root`, sorted. Only an unreadable root is an error;
// anything deeper that can't be read becomes a ScanIssue.
pub fn list_audio_files(root: &Path) -> Result<(Vec<PathBuf>, Vec<ScanIssue>), ScanError> {
    std::fs::read_dir(root).map_err(|source| ScanError::Unreadable { path: root.to_path_buf(), source })?;

    let mut files = Vec::new();
    let mut issues = Vec::new();
    // linked folders are not entered, so a link loop can't send us in circles
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                issues.push(ScanIssue { path, message: e.to_string() });
                continue;
            }
        };
        let is_file = entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file());
        if is_file && is_audio_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok((files, issues))
}

// Classify an already-listed set of files (the cache lists first to fingerprint)
pub fn classify(root: &Path, files: Vec<PathBuf>, issues: Vec<ScanIssue>) -> ScanResult {
    let mut buckets = Buckets::new();
    let mut untagged = Vec::new();
    let mut unknown_tags: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for file in files {
        let detection = detect_symbol(&file);
        if let Some(conflict) = detection.conflict {
            log::warn!("{conflict}");
            buckets.record_conflict(conflict);
        }
        match (detection.symbol, detection.source) {
            (Some(symbol), Some(source)) => {
                log::debug!("{} -> {symbol} ({source:?})", file.display());
                buckets.insert(Sample::new(file, symbol, source));
            }
            _ => match detection.unknown_tag {
                Some(tag) => {
                    log::debug!("{} has unknown tag {tag}", file.display());
                    unknown_tags.entry(tag).or_default().push(file);
                }
                None => untagged.push(file),
            },
        }
    }
    buckets.sort();
    untagged.sort();

    log::info!(
        "scanned {}: {} tagged, {} untagged, {} unknown tag(s), {} conflict(s)",
        root.display(),
        buckets.total(),
        untagged.len(),
        unknown_tags.len(),
        buckets.conflicts().len()
    );

    ScanResult { root: root.to_path_buf(), buckets, untagged, unknown_tags, issues }
}

pub fn scan_folder(root: &Path) -> Result<ScanResult, ScanError> {
    let (files, issues) = list_audio_files(root)?;
    Ok(classify(root, files, issues))
}
