//! Local autosave of in-progress builder edits, one JSON file per draft.

use crate::document::GraphDocument;
use anyhow::Context;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

pub struct DraftCache {
    dir: PathBuf,
}

impl DraftCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", file_stem(name), EXTENSION))
    }

    /// Write `doc` under `name`. The previous draft stays intact if the
    /// write fails part-way.
    pub fn store(&self, name: &str, doc: &GraphDocument) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating draft dir {}", self.dir.display()))?;
        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, doc.to_json_pretty()?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        log::debug!("[Drafts] stored '{}'", name);
        Ok(path)
    }

    pub fn restore(&self, name: &str) -> anyhow::Result<Option<GraphDocument>> {
        let path = self.path_for(name);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let doc = GraphDocument::from_json(&json)
            .with_context(|| format!("parsing draft {}", path.display()))?;
        Ok(Some(doc))
    }

    /// Returns true if a draft was removed.
    pub fn discard(&self, name: &str) -> anyhow::Result<bool> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Stored draft names (file stems), sorted.
    pub fn list(&self) -> anyhow::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Draft names map to file stems; anything outside `[A-Za-z0-9_-]` becomes `_`.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "untitled".to_string() } else { stem }
}
