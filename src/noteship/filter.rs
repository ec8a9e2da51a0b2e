//! Upload filter configuration: which directories and files to skip, and
//! which files are eligible for upload.
//!
//! Resolved once before traversal begins. Explicit flag values and
//! list-file entries extend the built-in defaults, they never replace
//! them.

use crate::error::{NoteshipError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const DEFAULT_IGNORE_DIRS: &[&str] = &[".git", ".obsidian", "node_modules", "__pycache__"];
const DEFAULT_IGNORE_FILES: &[&str] = &[".DS_Store"];
const DEFAULT_INCLUDE: &[&str] = &["*.md"];

#[derive(Debug, Clone)]
pub struct UploadFilter {
    ignore_dirs: HashSet<String>,
    ignore_files: HashSet<String>,
    include_patterns: Vec<String>,
    include: GlobSet,
}

impl UploadFilter {
    pub fn builder() -> UploadFilterBuilder {
        UploadFilterBuilder::default()
    }

    /// True when a directory of this name must be skipped entirely,
    /// including traversal into it.
    pub fn skips_dir(&self, name: &str) -> bool {
        self.ignore_dirs.contains(name)
    }

    pub fn skips_file(&self, name: &str) -> bool {
        self.ignore_files.contains(name)
    }

    /// A file is eligible only if its name matches at least one include
    /// pattern.
    pub fn includes(&self, name: &str) -> bool {
        !self.skips_file(name) && self.include.is_match(name)
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include_patterns
    }
}

impl Default for UploadFilter {
    fn default() -> Self {
        UploadFilterBuilder::default()
            .build()
            .unwrap_or_else(|_| unreachable!("default patterns are valid globs"))
    }
}

#[derive(Debug, Default)]
pub struct UploadFilterBuilder {
    ignore_dirs: Vec<String>,
    ignore_files: Vec<String>,
    include: Vec<String>,
}

impl UploadFilterBuilder {
    pub fn ignore_dirs<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.ignore_dirs.extend(names);
        self
    }

    pub fn ignore_files<I: IntoIterator<Item = String>>(mut self, names: I) -> Self {
        self.ignore_files.extend(names);
        self
    }

    pub fn include<I: IntoIterator<Item = String>>(mut self, patterns: I) -> Self {
        self.include.extend(patterns);
        self
    }

    /// Extend the ignore sets from a list file: one name per line,
    /// `#` comments and blank lines skipped. Names ending in `/` are
    /// directory ignores, the rest are file ignores.
    pub fn ignore_list_file(mut self, path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(NoteshipError::Io)?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(dir) = line.strip_suffix('/') {
                self.ignore_dirs.push(dir.to_string());
            } else {
                self.ignore_files.push(line.to_string());
            }
        }
        Ok(self)
    }

    pub fn build(self) -> Result<UploadFilter> {
        let mut ignore_dirs: HashSet<String> = DEFAULT_IGNORE_DIRS
            .iter()
            .map(|s| s.to_string())
            .collect();
        ignore_dirs.extend(self.ignore_dirs);

        let mut ignore_files: HashSet<String> = DEFAULT_IGNORE_FILES
            .iter()
            .map(|s| s.to_string())
            .collect();
        ignore_files.extend(self.ignore_files);

        let mut include_patterns: Vec<String> =
            DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect();
        include_patterns.extend(self.include);

        let mut builder = GlobSetBuilder::new();
        for pattern in &include_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                NoteshipError::Config(format!("Invalid include pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let include = builder.build().map_err(|e| {
            NoteshipError::Config(format!("Invalid include patterns: {}", e))
        })?;

        Ok(UploadFilter {
            ignore_dirs,
            ignore_files,
            include_patterns,
            include,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_include_markdown_only() {
        let filter = UploadFilter::default();
        assert!(filter.includes("notes.md"));
        assert!(!filter.includes("notes.txt"));
        assert!(filter.skips_dir(".git"));
        assert!(filter.skips_file(".DS_Store"));
    }

    #[test]
    fn flags_extend_defaults() {
        let filter = UploadFilter::builder()
            .ignore_dirs(vec!["assets".to_string()])
            .include(vec!["*.txt".to_string()])
            .build()
            .unwrap();
        // Extended
        assert!(filter.skips_dir("assets"));
        assert!(filter.includes("a.txt"));
        // Defaults still in force
        assert!(filter.skips_dir(".git"));
        assert!(filter.includes("a.md"));
    }

    #[test]
    fn list_file_splits_dirs_and_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\n\ndrafts/\nscratch.md").unwrap();

        let filter = UploadFilter::builder()
            .ignore_list_file(file.path())
            .unwrap()
            .build()
            .unwrap();
        assert!(filter.skips_dir("drafts"));
        assert!(filter.skips_file("scratch.md"));
        assert!(!filter.includes("scratch.md"));
    }

    #[test]
    fn bad_pattern_is_config_error() {
        let err = UploadFilter::builder()
            .include(vec!["[".to_string()])
            .build()
            .unwrap_err();
        assert!(matches!(err, NoteshipError::Config(_)));
    }
}
