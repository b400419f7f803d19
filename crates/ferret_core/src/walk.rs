//! Filesystem fragment source.
//!
//! Walks a directory tree (honouring gitignore rules), filters out binary
//! and oversized files, and yields one [`Fragment`] per readable text file.
//! Read failures on individual files are logged and skipped; they must not
//! abort a whole-tree scan.

use std::io::Read;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::warn;

use crate::error::SourceError;
use crate::fragment::Fragment;

/// Bytes inspected for NUL when sniffing binary content, matching git's
/// own heuristic window.
const BINARY_CHECK_BYTES: usize = 8192;

/// Files at or above this size are memory-mapped instead of heap-read.
const MMAP_THRESHOLD: u64 = 32 * 1024;

/// Extensions that are binary regardless of content; sniffing is skipped.
const BINARY_EXTENSIONS: &[&str] = &[
    "o", "a", "so", "dylib", "dll", "exe", "class", "pyc", "wasm", // compiled
    "png", "jpg", "jpeg", "gif", "ico", "webp", "bmp", "tiff", // images
    "mp3", "mp4", "wav", "avi", "mov", "ogg", "webm", "mkv", // media
    "zip", "tar", "gz", "bz2", "xz", "7z", "zst", // archives
    "ttf", "otf", "woff", "woff2", // fonts
    "bin", "dat", "pdf",
];

/// Returns `true` if the leading bytes contain a NUL, which marks the
/// content as binary.
#[must_use]
pub fn is_binary(bytes: &[u8]) -> bool {
    let window = bytes.len().min(BINARY_CHECK_BYTES);
    bytes[..window].contains(&0)
}

fn has_binary_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Configurable directory walker producing scan fragments.
#[derive(Debug)]
pub struct FileWalker {
    root: PathBuf,
    max_file_size: Option<u64>,
    respect_gitignore: bool,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size: None,
            respect_gitignore: true,
        }
    }

    /// Skips files larger than `bytes`.
    #[must_use]
    pub fn max_file_size(mut self, bytes: Option<u64>) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Controls whether `.gitignore` rules prune the walk.
    #[must_use]
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Consumes the walker, yielding one fragment per scannable file.
    ///
    /// The iterator is finite and not restartable. The directory tree is
    /// enumerated up front; file contents are read lazily as the iterator
    /// is drained. Individual unreadable files are skipped with a warning
    /// rather than surfaced as errors.
    pub fn fragments(self) -> impl Iterator<Item = Result<Fragment, SourceError>> + Send {
        let max_file_size = self.max_file_size;
        self.collect_paths().into_iter().filter_map(move |path| {
            let raw = read_text_file(&path, max_file_size)?;
            Some(Ok(Fragment::new(raw, path.display().to_string())))
        })
    }

    fn collect_paths(&self) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .build();

        let mut paths = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable path: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if has_binary_extension(entry.path()) {
                continue;
            }
            paths.push(entry.into_path());
        }
        paths
    }
}

/// Reads a file as UTF-8 text.
///
/// Returns `None` when the file exceeds `max_size`, contains binary
/// content, is not valid UTF-8, or cannot be read. Small files go through
/// a single buffered read; larger ones are memory-mapped so the page cache
/// is used directly.
#[must_use]
pub fn read_text_file(path: &Path, max_size: Option<u64>) -> Option<String> {
    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            warn!("skipping {}: {err}", path.display());
            return None;
        }
    };
    let len = file.metadata().ok()?.len();

    if max_size.is_some_and(|max| len > max) {
        return None;
    }

    if len >= MMAP_THRESHOLD {
        read_mapped(&file)
    } else {
        read_buffered(&mut file, len)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn read_buffered(file: &mut std::fs::File, len: u64) -> Option<String> {
    let mut bytes = Vec::with_capacity(len as usize);
    file.read_to_end(&mut bytes).ok()?;
    if is_binary(&bytes) {
        return None;
    }
    String::from_utf8(bytes).ok()
}

fn read_mapped(file: &std::fs::File) -> Option<String> {
    // SAFETY: the map is read-only and dropped before returning. A file
    // truncated underneath us could fault, the same exposure ripgrep and
    // git accept for mapped reads.
    #[allow(unsafe_code)]
    let map = unsafe { memmap2::Mmap::map(file) }.ok()?;
    if is_binary(&map) {
        return None;
    }
    std::str::from_utf8(&map).ok().map(String::from)
}
