use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregate::WordCounts;
use crate::config::{JobConfig, OutputFormat};
use crate::coordinator::CancelHandle;
use crate::error::{Result, WordCountError};

pub const SUCCESS_MARKER: &str = "_SUCCESS";

pub fn part_file_name(part: usize) -> String {
    format!("part-{:05}", part)
}

#[derive(Serialize)]
struct WordRecord<'a> {
    word: &'a str,
    count: u64,
}

/// What a successful write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub parts: usize,
    pub records: usize,
}

/// Writes the result mapping as a directory of `part-NNNNN` text files plus a
/// `_SUCCESS` marker. Nothing shows up at the destination until every file is
/// on disk.
#[derive(Debug, Clone)]
pub struct TextSink {
    output: PathBuf,
    overwrite: bool,
    format: OutputFormat,
    parts: usize,
}

impl TextSink {
    pub fn new(output: impl Into<PathBuf>, overwrite: bool, format: OutputFormat, parts: usize) -> Self {
        TextSink {
            output: output.into(),
            overwrite,
            format,
            parts: parts.max(1),
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        TextSink::new(
            config.output_path.clone(),
            config.overwrite,
            config.format,
            config.partition_count,
        )
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Fails with `OutputExists` when the destination is taken and
    /// overwriting is off.
    pub fn check_destination(&self) -> Result<()> {
        if self.output.file_name().is_none() {
            // `..` or `/` can never be replaced by a rename
            if exists(&self.output) {
                return Err(WordCountError::OutputExists(self.output.clone()));
            }
            return Err(WordCountError::Argument(format!(
                "output path {} does not name a directory",
                self.output.display()
            )));
        }
        if !self.overwrite && exists(&self.output) {
            return Err(WordCountError::OutputExists(self.output.clone()));
        }
        Ok(())
    }

    pub fn write(&self, counts: WordCounts, cancel: &CancelHandle) -> Result<WriteSummary> {
        self.check_destination()?;

        let parent = match self.output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| WordCountError::output_write(&parent, e))?;
        let staging = Staging::create(&parent, &self.output)?;

        let records = counts.len();
        for (part, bucket) in self.partition(counts).into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(WordCountError::Cancelled);
            }
            let path = staging.path().join(part_file_name(part));
            write_part(&path, &bucket, self.format).map_err(|e| WordCountError::output_write(&path, e))?;
        }
        let marker = staging.path().join(SUCCESS_MARKER);
        File::create(&marker)
            .and_then(|f| f.sync_all())
            .map_err(|e| WordCountError::output_write(&marker, e))?;

        if cancel.is_cancelled() {
            return Err(WordCountError::Cancelled);
        }
        staging.publish(&self.output, self.overwrite)?;
        tracing::info!(
            output = %self.output.display(),
            parts = self.parts,
            records,
            "output committed"
        );
        Ok(WriteSummary {
            path: self.output.clone(),
            parts: self.parts,
            records,
        })
    }

    /// Hash-partitions the records over the part files, each part sorted by word.
    fn partition(&self, counts: WordCounts) -> Vec<Vec<(String, u64)>> {
        let mut buckets = vec![Vec::new(); self.parts];
        for (word, count) in counts {
            let part = part_for(&word, self.parts);
            buckets[part].push((word, count));
        }
        for bucket in &mut buckets {
            bucket.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        }
        buckets
    }
}

pub fn part_for(word: &str, parts: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    word.hash(&mut hasher);
    (hasher.finish() % parts as u64) as usize
}

pub fn write_record(writer: &mut impl Write, format: OutputFormat, word: &str, count: u64) -> io::Result<()> {
    match format {
        OutputFormat::Text => writeln!(writer, "{} {}", word, count),
        OutputFormat::Tsv => writeln!(writer, "{}\t{}", word, count),
        OutputFormat::Tuple => writeln!(writer, "({},{})", word, count),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, &WordRecord { word, count })?;
            writer.write_all(b"\n")
        }
    }
}

fn write_part(path: &Path, records: &[(String, u64)], format: OutputFormat) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for (word, count) in records {
        write_record(&mut writer, format, word, *count)?;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn remove_path(path: &Path) -> io::Result<()> {
    if path.symlink_metadata()?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// `<parent>/.<name>.<random>.<suffix>`, hidden from directory inputs.
fn sibling(parent: &Path, dest: &Path, suffix: &str) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    parent.join(format!(".{}.{:016x}.{}", name, rand::random::<u64>(), suffix))
}

/// Hidden directory the output is built in. Removed on drop unless it has
/// been renamed onto the destination.
struct Staging {
    path: PathBuf,
    published: bool,
}

impl Staging {
    fn create(parent: &Path, dest: &Path) -> Result<Self> {
        let path = sibling(parent, dest, "staging");
        fs::create_dir(&path).map_err(|e| WordCountError::output_write(&path, e))?;
        tracing::debug!(staging = %path.display(), "created staging directory");
        Ok(Staging {
            path,
            published: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn publish(mut self, dest: &Path, overwrite: bool) -> Result<()> {
        if !exists(dest) {
            fs::rename(&self.path, dest).map_err(|e| WordCountError::output_write(dest, e))?;
            self.published = true;
            return Ok(());
        }
        if !overwrite {
            return Err(WordCountError::OutputExists(dest.to_path_buf()));
        }

        let parent = self.path.parent().unwrap_or(Path::new("."));
        let aside = sibling(parent, dest, "old");
        fs::rename(dest, &aside).map_err(|e| WordCountError::output_write(dest, e))?;
        if let Err(e) = fs::rename(&self.path, dest) {
            if let Err(restore) = fs::rename(&aside, dest) {
                tracing::error!(
                    output = %dest.display(),
                    saved = %aside.display(),
                    error = %restore,
                    "failed to restore previous output"
                );
            }
            return Err(WordCountError::output_write(dest, e));
        }
        self.published = true;
        if let Err(e) = remove_path(&aside) {
            tracing::warn!(path = %aside.display(), error = %e, "failed to remove replaced output");
        }
        Ok(())
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if !self.published {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                tracing::warn!(staging = %self.path.display(), error = %e, "failed to remove staging directory");
            }
        }
    }
}
