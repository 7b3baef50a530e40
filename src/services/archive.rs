//! ZIP archive reading in natural filename order.
//!
//! Entries are yielded one at a time: each entry is opened, read fully into
//! memory, and closed before the next one is touched.

use std::{
    cmp::Ordering,
    io::{Read, Seek},
};
use thiserror::Error;
use zip::{ZipArchive, result::ZipError};

/// Upper bound for the buffer reserved up front from an entry's declared size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Largest decompressed entry accepted by default.
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid zip archive: {0}")]
    Invalid(#[from] ZipError),
    #[error("unreadable archive entry `{name}`: {reason}")]
    Entry { name: String, reason: String },
}

/// One decompressed archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Iterates the file entries of a ZIP archive in natural order of their names.
pub struct ArchiveExtractor<R> {
    archive: ZipArchive<R>,
    order: Vec<(usize, String)>,
    position: usize,
    max_entry_size: u64,
}

impl<R: Read + Seek> ArchiveExtractor<R> {
    /// Read the central directory and fix the processing order.
    ///
    /// Directory entries are dropped here. Structural damage surfaces as
    /// `ArchiveError::Invalid` before any entry is extracted.
    pub fn open(reader: R) -> Result<Self, ArchiveError> {
        let mut archive = ZipArchive::new(reader)?;

        let mut order = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            if entry.is_dir() {
                continue;
            }
            order.push((index, entry.name().to_string()));
        }
        order.sort_by(|(_, a), (_, b)| natural_cmp(a, b));

        Ok(Self {
            archive,
            order,
            position: 0,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        })
    }

    /// Cap the decompressed size of a single entry. Larger entries fail with
    /// `ArchiveError::Entry` instead of being buffered.
    pub fn with_max_entry_size(mut self, limit: u64) -> Self {
        self.max_entry_size = limit;
        self
    }

    /// Entry names in the order they will be yielded.
    #[cfg(test)]
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|(_, name)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn read_entry(&mut self, index: usize, name: &str) -> Result<ArchiveEntry, ArchiveError> {
        let mut file = self
            .archive
            .by_index(index)
            .map_err(|err| ArchiveError::Entry {
                name: name.to_string(),
                reason: err.to_string(),
            })?;

        let limit = self.max_entry_size;
        let too_large = || ArchiveError::Entry {
            name: name.to_string(),
            reason: format!("decompressed size exceeds {} bytes", limit),
        };
        if file.size() > limit {
            return Err(too_large());
        }

        // the declared size is untrusted
        let mut data = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.by_ref()
            .take(limit.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|err| ArchiveError::Entry {
                name: name.to_string(),
                reason: err.to_string(),
            })?;
        if data.len() as u64 > limit {
            return Err(too_large());
        }

        Ok(ArchiveEntry {
            name: name.to_string(),
            data,
        })
    }
}

impl<R: Read + Seek> Iterator for ArchiveExtractor<R> {
    type Item = Result<ArchiveEntry, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, name) = self.order.get(self.position).cloned()?;
        self.position += 1;
        Some(self.read_entry(index, &name))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.order.len() - self.position;
        (remaining, Some(remaining))
    }
}

/// Compare two names treating runs of ASCII digits as numbers.
///
/// `img2.png < img10.png`. Other bytes compare as-is, so `B < a`. A digit
/// sorts before any non-digit. Equal numbers with fewer leading zeros come
/// first (`7 < 007`). When one name is a prefix of the other the shorter wins.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (x, y) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);

    while i < x.len() && j < y.len() {
        let (dx, dy) = (x[i].is_ascii_digit(), y[j].is_ascii_digit());
        match (dx, dy) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {
                if x[i] != y[j] {
                    return x[i].cmp(&y[j]);
                }
                i += 1;
                j += 1;
            }
            (true, true) => {
                let (zeros_i, end_i) = digit_run(x, i);
                let (zeros_j, end_j) = digit_run(y, j);
                let left = &x[zeros_i..end_i];
                let right = &y[zeros_j..end_j];

                let ord = left
                    .len()
                    .cmp(&right.len())
                    .then_with(|| left.cmp(right))
                    .then_with(|| (zeros_i - i).cmp(&(zeros_j - j)));
                if ord != Ordering::Equal {
                    return ord;
                }
                i = end_i;
                j = end_j;
            }
        }
    }

    x.len().cmp(&y.len())
}

/// Scan the digit run starting at `start`: returns the index of its first
/// significant digit and the index just past the run.
fn digit_run(bytes: &[u8], start: usize) -> (usize, usize) {
    let mut pos = start;
    while pos < bytes.len() && bytes[pos] == b'0' {
        pos += 1;
    }
    let significant = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    (significant, pos)
}

/// Reduce an untrusted entry name to a bare file name.
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// is left (`dir/`, `..`, control characters).
pub fn sanitize_entry_name(name: &str) -> Option<&str> {
    let base = name.rsplit(|c| c == '/' || c == '\\').next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    if base.chars().any(|c| c.is_control()) {
        return None;
    }
    Some(base)
}

/// Extension of a bare file name including the dot, or an empty string.
pub fn entry_extension(base_name: &str) -> &str {
    base_name
        .rfind('.')
        .map(|pos| &base_name[pos..])
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{build_stored_zip, build_zip, find_bytes};
    use std::io::Cursor;

    fn names<R: Read + Seek>(extractor: &ArchiveExtractor<R>) -> Vec<String> {
        extractor.entry_names().map(str::to_string).collect()
    }

    #[test]
    fn natural_order_beats_lexicographic() {
        let mut input = vec!["page10.png", "page2.png", "page1.png"];
        input.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(input, ["page1.png", "page2.png", "page10.png"]);
    }

    #[test]
    fn natural_cmp_edge_cases() {
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
        assert_eq!(natural_cmp("x", "x"), Ordering::Equal);
        assert_eq!(natural_cmp("ch2/p3", "ch10/p1"), Ordering::Less);
        assert_eq!(natural_cmp("0", "00"), Ordering::Less);
    }

    #[test]
    fn natural_cmp_is_case_sensitive() {
        assert_eq!(natural_cmp("B.png", "a.png"), Ordering::Less);
        assert_eq!(natural_cmp("img10", "Img2"), Ordering::Greater);

        let mut input = vec!["b.png", "a.png", "C.png", "A.png"];
        input.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(input, ["A.png", "C.png", "a.png", "b.png"]);
    }

    #[test]
    fn digits_sort_before_other_bytes() {
        assert_eq!(natural_cmp("page1.png", "page.png"), Ordering::Less);
        assert_eq!(natural_cmp("page.png", "page1.png"), Ordering::Greater);
        assert_eq!(natural_cmp("9z", "_a"), Ordering::Less);
    }

    #[test]
    fn fewer_leading_zeros_first() {
        assert_eq!(natural_cmp("7.png", "007.png"), Ordering::Less);
        assert_eq!(natural_cmp("007.png", "7.png"), Ordering::Greater);
        assert_eq!(natural_cmp("007.png", "8.png"), Ordering::Less);

        let mut input = vec!["010.png", "10.png", "9.png", "0010.png"];
        input.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(input, ["9.png", "10.png", "010.png", "0010.png"]);
    }

    #[test]
    fn yields_entries_in_natural_order() {
        let bytes = build_zip(&[
            ("page10.png", "ten"),
            ("page1.png", "one"),
            ("page2.png", "two"),
        ]);

        let extractor = ArchiveExtractor::open(Cursor::new(bytes)).expect("valid archive");
        assert_eq!(extractor.len(), 3);
        assert_eq!(names(&extractor), ["page1.png", "page2.png", "page10.png"]);

        let entries: Vec<ArchiveEntry> = extractor
            .collect::<Result<_, _>>()
            .expect("entries should be readable");
        let data: Vec<Vec<u8>> = entries.into_iter().map(|e| e.data).collect();
        assert_eq!(data, vec![b"one".to_vec(), b"two".to_vec(), b"ten".to_vec()]);
    }

    #[test]
    fn reopening_yields_same_sequence() {
        let bytes = build_zip(&[("b.png", "b"), ("a.png", "a")]);

        let first: Vec<_> = ArchiveExtractor::open(Cursor::new(bytes.clone()))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        let second: Vec<_> = ArchiveExtractor::open(Cursor::new(bytes))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn skips_directories() {
        let bytes = build_zip(&[("scans/", ""), ("scans/1.png", "one")]);

        let extractor = ArchiveExtractor::open(Cursor::new(bytes)).unwrap();
        assert_eq!(names(&extractor), ["scans/1.png"]);
    }

    #[test]
    fn oversized_entry_is_rejected() {
        let big = "x".repeat(100);
        let bytes = build_zip(&[("a.png", "small"), ("b.png", big.as_str())]);

        let mut extractor = ArchiveExtractor::open(Cursor::new(bytes))
            .unwrap()
            .with_max_entry_size(10);

        let first = extractor.next().unwrap().expect("small entry fits");
        assert_eq!(first.data, b"small");

        let err = extractor.next().unwrap().unwrap_err();
        match err {
            ArchiveError::Entry { name, reason } => {
                assert_eq!(name, "b.png");
                assert!(reason.contains("exceeds 10 bytes"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn entry_at_limit_is_accepted() {
        let bytes = build_zip(&[("a.png", "0123456789")]);
        let entries: Vec<_> = ArchiveExtractor::open(Cursor::new(bytes))
            .unwrap()
            .with_max_entry_size(10)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries[0].data, b"0123456789");
    }

    #[test]
    fn truncated_archive_is_invalid() {
        let bytes = build_zip(&[("a.png", "aaaa"), ("b.png", "bbbb")]);
        let truncated = bytes[..bytes.len() / 2].to_vec();

        let err = ArchiveExtractor::open(Cursor::new(truncated))
            .err()
            .expect("truncated archive must not open");
        assert!(matches!(err, ArchiveError::Invalid(_)));
    }

    #[test]
    fn non_zip_input_is_invalid() {
        let err = ArchiveExtractor::open(Cursor::new(b"definitely not a zip".to_vec()))
            .err()
            .expect("garbage must not open");
        assert!(matches!(err, ArchiveError::Invalid(_)));
    }

    #[test]
    fn corrupt_entry_fails_when_reached() {
        let mut bytes =
            build_stored_zip(&[("a.png", "AAAAAAAAAAAAAAAA"), ("b.png", "BBBBBBBBBBBBBBBB")]);
        let corrupt_at = find_bytes(&bytes, b"BBBBBBBBBBBBBBBB").expect("payload is stored raw");
        bytes[corrupt_at] ^= 0xff;

        let mut extractor = ArchiveExtractor::open(Cursor::new(bytes)).expect("directory is intact");
        let first = extractor.next().unwrap().expect("first entry is intact");
        assert_eq!(first.name, "a.png");

        let err = extractor.next().unwrap().expect_err("second entry is corrupt");
        assert!(matches!(err, ArchiveError::Entry { ref name, .. } if name == "b.png"));
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_entry_name("a/b/c.png"), Some("c.png"));
        assert_eq!(sanitize_entry_name("..\\..\\evil.png"), Some("evil.png"));
        assert_eq!(sanitize_entry_name("../../etc/passwd"), Some("passwd"));
        assert_eq!(sanitize_entry_name("dir/"), None);
        assert_eq!(sanitize_entry_name("a/.."), None);
        assert_eq!(sanitize_entry_name(""), None);
    }

    #[test]
    fn extension_keeps_dot_and_last_suffix() {
        assert_eq!(entry_extension("page1.png"), ".png");
        assert_eq!(entry_extension("scan.tar.gz"), ".gz");
        assert_eq!(entry_extension("README"), "");
    }
}
