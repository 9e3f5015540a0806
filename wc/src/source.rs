use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, WordCountError};

/// A trailing piece up to 10% larger than the split size is not split off.
const SPLIT_SLOP: f64 = 1.1;

pub const DEFAULT_MIN_SPLIT_BYTES: u64 = 1;

/// Lazy line stream of one partition.
pub type Lines<'a> = Box<dyn Iterator<Item = Result<String>> + Send + 'a>;

/// Input that has been cut into independently readable partitions.
pub trait PartitionedInput: Send + Sync {
    fn partition_count(&self) -> usize;

    /// Opens the line stream of one partition. Streams are not restartable,
    /// call again to read the partition a second time.
    fn read(&self, partition: usize) -> Result<Lines<'_>>;
}

/// Byte range `[start, start + len)` of one input file. A line belongs to the
/// split that contains its first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSplit {
    pub path: PathBuf,
    pub start: u64,
    pub len: u64,
}

impl InputSplit {
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Text files on the local filesystem, read as one record per line.
#[derive(Debug)]
pub struct TextInput {
    files: Vec<PathBuf>,
    partitions: Vec<Vec<InputSplit>>,
}

impl TextInput {
    /// Resolves `path` (a file or a directory) and cuts its files into
    /// `partitions` partitions.
    pub fn open(path: impl AsRef<Path>, partitions: usize, min_split_bytes: u64) -> Result<Self> {
        if partitions == 0 {
            return Err(WordCountError::Argument(
                "partition count must be at least 1".to_string(),
            ));
        }
        let files = list_input_files(path.as_ref())?;
        let mut sized = Vec::with_capacity(files.len());
        for file in &files {
            let len = fs::metadata(file)
                .map_err(|e| WordCountError::input_read(file, e))?
                .len();
            sized.push((file.clone(), len));
        }
        let splits = plan_splits(&sized, partitions, min_split_bytes);
        tracing::debug!(
            files = files.len(),
            splits = splits.len(),
            partitions,
            "planned input splits"
        );
        Ok(TextInput {
            files,
            partitions: slice(splits, partitions),
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn splits(&self, partition: usize) -> &[InputSplit] {
        &self.partitions[partition]
    }

    pub fn split_count(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }
}

impl PartitionedInput for TextInput {
    fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn read(&self, partition: usize) -> Result<Lines<'_>> {
        let splits = self.partitions.get(partition).ok_or_else(|| {
            WordCountError::Argument(format!(
                "partition {} out of range ({} partitions)",
                partition,
                self.partitions.len()
            ))
        })?;
        Ok(Box::new(PartitionReader {
            splits: splits.iter(),
            current: None,
        }))
    }
}

/// Lines already in memory, one vector per partition.
#[derive(Debug, Clone, Default)]
pub struct MemoryInput {
    partitions: Vec<Vec<String>>,
}

impl MemoryInput {
    pub fn new(partitions: Vec<Vec<String>>) -> Self {
        MemoryInput { partitions }
    }

    /// Deals the lines round-robin over `partitions` partitions.
    pub fn from_lines<I, S>(lines: I, partitions: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let partitions = partitions.max(1);
        let mut parts = vec![Vec::new(); partitions];
        for (i, line) in lines.into_iter().enumerate() {
            parts[i % partitions].push(line.into());
        }
        MemoryInput { partitions: parts }
    }
}

impl PartitionedInput for MemoryInput {
    fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    fn read(&self, partition: usize) -> Result<Lines<'_>> {
        let lines = self.partitions.get(partition).ok_or_else(|| {
            WordCountError::Argument(format!("partition {} out of range", partition))
        })?;
        Ok(Box::new(lines.iter().map(|line| Ok(line.clone()))))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.') || name.starts_with('_'))
        .unwrap_or(false)
}

/// Files to read for `path`, in sorted order. Hidden and marker files
/// (`.foo`, `_SUCCESS`) below a directory are skipped.
pub fn list_input_files(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(WordCountError::InputNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(WordCountError::input_read(path, e)),
    };
    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !metadata.is_dir() {
        // pipes and devices have no length to split on
        return Err(WordCountError::input_read(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "not a regular file or directory"),
        ));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(path)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = entry.map_err(|e| {
            let at = e.path().unwrap_or(path).to_path_buf();
            WordCountError::input_read(at, io::Error::from(e))
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Cuts files into byte-range splits of roughly `total / partitions` bytes.
/// Empty files produce no split.
pub fn plan_splits(files: &[(PathBuf, u64)], partitions: usize, min_split_bytes: u64) -> Vec<InputSplit> {
    let total: u64 = files.iter().map(|(_, len)| len).sum();
    let goal = total / partitions.max(1) as u64;
    let split_size = goal.max(min_split_bytes).max(1);

    let mut splits = Vec::new();
    for (path, len) in files {
        let mut remaining = *len;
        let mut offset = 0;
        while remaining as f64 / split_size as f64 > SPLIT_SLOP {
            splits.push(InputSplit {
                path: path.clone(),
                start: offset,
                len: split_size,
            });
            offset += split_size;
            remaining -= split_size;
        }
        if remaining > 0 {
            splits.push(InputSplit {
                path: path.clone(),
                start: offset,
                len: remaining,
            });
        }
    }
    splits
}

/// Deals splits round-robin over exactly `n` partitions.
pub fn slice(splits: Vec<InputSplit>, n: usize) -> Vec<Vec<InputSplit>> {
    let mut partitions = vec![Vec::new(); n];
    for (i, split) in splits.into_iter().enumerate() {
        partitions[i % n].push(split);
    }
    partitions
}

struct PartitionReader<'a> {
    splits: std::slice::Iter<'a, InputSplit>,
    current: Option<SplitReader>,
}

impl Iterator for PartitionReader<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                if let Some(line) = reader.next() {
                    return Some(line);
                }
                self.current = None;
            }
            let split = self.splits.next()?;
            match SplitReader::open(split) {
                Ok(reader) => self.current = Some(reader),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Reads the lines owned by one split.
pub struct SplitReader {
    path: PathBuf,
    reader: BufReader<File>,
    pos: u64,
    end: u64,
    buf: Vec<u8>,
    done: bool,
}

impl SplitReader {
    pub fn open(split: &InputSplit) -> Result<Self> {
        let file = File::open(&split.path).map_err(|e| WordCountError::input_read(&split.path, e))?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut pos = split.start;
        if split.start > 0 {
            // the line running into this split belongs to the previous one
            reader
                .seek(SeekFrom::Start(split.start - 1))
                .map_err(|e| WordCountError::input_read(&split.path, e))?;
            let skipped = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| WordCountError::input_read(&split.path, e))?;
            pos = split.start - 1 + skipped as u64;
        }
        Ok(SplitReader {
            path: split.path.clone(),
            reader,
            pos,
            end: split.end(),
            buf,
            done: false,
        })
    }
}

impl Iterator for SplitReader {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.end {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                self.pos += n as u64;
                Some(Ok(decode_line(&self.buf)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(WordCountError::input_read(&self.path, e)))
            }
        }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
