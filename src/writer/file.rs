//! Plain and rotating file writers: archive-naming scheme (period inserted
//! before the extension, or as a filename prefix), mtime-based retention
//! pruning, a time trigger checked only every `check_interval` writes to
//! avoid a syscall per record, and a write that itself triggers rotation
//! delivered to the *new* file rather than split or lost.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::rotation::RotationTrigger;
use crate::error::WriteError;
use crate::record::LogRecord;
use crate::writer::Writer;

/// How a rotated archive's period label is placed relative to the base
/// filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `app.log` -> `app.2025-08-22.log`
    BeforeExtension,
    /// `app.log` -> `2025-08-22.app.log`
    Prefix,
}

impl DateStyle {
    pub fn from_str(s: Option<&str>) -> DateStyle {
        match s {
            Some("prefix") => DateStyle::Prefix,
            _ => DateStyle::BeforeExtension,
        }
    }
}

/// A plain append-only file sink with no rotation; the innermost `Sink` of
/// the canonical composition order when rotation is not configured.
pub struct FileWriter {
    name: String,
    file: File,
    healthy: bool,
}

impl FileWriter {
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> io::Result<FileWriter> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(FileWriter {
            name: name.into(),
            file,
            healthy: true,
        })
    }
}

impl Writer for FileWriter {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        let line = format!("{}\n", record.message);
        match self.file.write_all(line.as_bytes()) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.healthy = false;
                Err(WriteError::Io(e))
            }
        }
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        match self.file.flush() {
            Ok(()) => {
                self.healthy = true;
                Ok(())
            }
            Err(e) => {
                self.healthy = false;
                Err(WriteError::Io(e))
            }
        }
    }

    fn healthy(&self) -> bool {
        self.healthy
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Archive compression applied to a file once rotation moves past it.
/// Grounded on the `Compression` enum `logly::config::state::SinkConfig`
/// carries, narrowed here to the two algorithms already in this crate's
/// dependency set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

/// A file writer with size, time, or combined rotation, archive retention
/// by count, and the `check_interval` gate on the time-trigger check.
pub struct RotatingWriter {
    name: String,
    base_path: PathBuf,
    trigger: RotationTrigger,
    date_style: DateStyle,
    size_limit: Option<u64>,
    max_files: Option<usize>,
    check_interval: u64,
    compression: Compression,

    current_period: String,
    file: File,
    current_size: u64,
    writes_since_time_check: u64,
    next_size_tag: u64,
    healthy: bool,
}

impl RotatingWriter {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        name: impl Into<String>,
        base_path: impl AsRef<Path>,
        trigger: RotationTrigger,
        date_style: DateStyle,
        size_limit: Option<u64>,
        max_files: Option<usize>,
        check_interval: u64,
    ) -> io::Result<RotatingWriter> {
        let base_path = base_path.as_ref().to_path_buf();
        let current_period = trigger.period_label();
        let file = open_for_period(&base_path, &current_period, date_style)?;
        let current_size = file.metadata()?.len();
        let next_size_tag = next_unused_size_tag(&base_path, date_style);
        Ok(RotatingWriter {
            name: name.into(),
            base_path,
            trigger,
            date_style,
            size_limit,
            max_files,
            check_interval: check_interval.max(1),
            compression: Compression::None,
            current_period,
            file,
            current_size,
            writes_since_time_check: 0,
            next_size_tag,
            healthy: true,
        })
    }

    /// Compresses each archive once rotation moves past it. Applied to the
    /// file being closed, never to the file currently being written.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    fn needs_size_rotation(&self, upcoming: usize) -> bool {
        self.size_limit
            .is_some_and(|limit| self.current_size + upcoming as u64 >= limit)
    }

    fn needs_time_rotation(&mut self) -> bool {
        if self.trigger == RotationTrigger::Never {
            return false;
        }
        self.writes_since_time_check += 1;
        if self.writes_since_time_check < self.check_interval {
            return false;
        }
        self.writes_since_time_check = 0;
        self.trigger.period_label() != self.current_period
    }

    fn rotate(&mut self, size_triggered: bool) -> io::Result<()> {
        let closed_size = byte_unit::Byte::from_u64(self.current_size)
            .get_appropriate_unit(byte_unit::UnitType::Binary);
        tracing::info!(writer = %self.name, size = %closed_size, "rotating log file");

        let closed_path = path_for_period(&self.base_path, &self.current_period, self.date_style);

        let period = if size_triggered && self.trigger == RotationTrigger::Never {
            let tag = self.next_size_tag;
            self.next_size_tag += 1;
            tag.to_string()
        } else {
            self.trigger.period_label()
        };
        self.current_period = period.clone();
        self.file = open_for_period(&self.base_path, &period, self.date_style)?;
        self.current_size = 0;

        if self.compression != Compression::None && closed_path.exists() {
            if let Err(e) = compress_archive(&closed_path, self.compression) {
                tracing::warn!(path = %closed_path.display(), error = %e, "archive compression failed");
            }
        }

        if let Some(keep) = self.max_files {
            let current_path = path_for_period(&self.base_path, &period, self.date_style);
            if let Some(dir) = current_path.parent() {
                let _ = prune_old_files(dir, &self.base_path, self.date_style, keep, &current_path);
            }
        }
        Ok(())
    }
}

/// Compresses `path` in place, replacing it with `path` plus the
/// algorithm's conventional suffix, and removes the uncompressed original.
fn compress_archive(path: &Path, compression: Compression) -> io::Result<()> {
    let data = fs::read(path)?;
    let compressed_path = match compression {
        Compression::Gzip => path.with_extension(format!(
            "{}.gz",
            path.extension().and_then(|e| e.to_str()).unwrap_or("log")
        )),
        Compression::Zstd => path.with_extension(format!(
            "{}.zst",
            path.extension().and_then(|e| e.to_str()).unwrap_or("log")
        )),
        Compression::None => return Ok(()),
    };

    match compression {
        Compression::Gzip => {
            let out = File::create(&compressed_path)?;
            let mut encoder = flate2::write::GzEncoder::new(out, flate2::Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()?;
        }
        Compression::Zstd => {
            let out = File::create(&compressed_path)?;
            let mut encoder = zstd::stream::Encoder::new(out, 0)?;
            encoder.write_all(&data)?;
            encoder.finish()?;
        }
        Compression::None => unreachable!(),
    }

    fs::remove_file(path)?;
    Ok(())
}

impl Writer for RotatingWriter {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        let line = format!("{}\n", record.message);
        let bytes = line.as_bytes();

        let size_triggered = self.needs_size_rotation(bytes.len());
        let time_triggered = self.needs_time_rotation();
        if size_triggered || time_triggered {
            self.rotate(size_triggered && !time_triggered)
                .map_err(|e| WriteError::Rotation(e.to_string()))?;
        }

        match self.file.write_all(bytes) {
            Ok(()) => {
                self.current_size += bytes.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.healthy = false;
                Err(WriteError::Io(e))
            }
        }
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        match self.file.flush() {
            Ok(()) => {
                self.healthy = true;
                Ok(())
            }
            Err(e) => {
                self.healthy = false;
                Err(WriteError::Io(e))
            }
        }
    }

    fn healthy(&self) -> bool {
        self.healthy
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn path_for_period(base: &Path, period: &str, style: DateStyle) -> PathBuf {
    if period.is_empty() {
        return base.to_path_buf();
    }
    let file_name = base.file_name().and_then(|s| s.to_str()).unwrap_or_default();
    match style {
        DateStyle::Prefix => {
            let new_name = if file_name.starts_with('.') {
                format!("{period}{file_name}")
            } else {
                format!("{period}.{file_name}")
            };
            base.with_file_name(new_name)
        }
        DateStyle::BeforeExtension => {
            if let Some(pos) = file_name.rfind('.') {
                let (stem, ext) = file_name.split_at(pos);
                base.with_file_name(format!("{stem}.{period}{ext}"))
            } else {
                base.with_file_name(format!("{file_name}.{period}"))
            }
        }
    }
}

fn open_for_period(base: &Path, period: &str, style: DateStyle) -> io::Result<File> {
    let p = path_for_period(base, period, style);
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(p)
}

/// Scans `base`'s directory for existing size-triggered archives (period
/// component is a plain decimal integer) and returns one past the
/// largest tag found, so a writer resuming after a restart keeps handing
/// out distinct archive numbers instead of reusing one already on disk.
fn next_unused_size_tag(base: &Path, style: DateStyle) -> u64 {
    let Some(dir) = base.parent() else {
        return 1;
    };
    let base_name = base.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let (stem, ext_opt) = match base_name.rfind('.') {
        Some(pos) => (&base_name[..pos], Some(&base_name[pos + 1..])),
        None => (base_name, None),
    };

    let Ok(entries) = fs::read_dir(dir) else {
        return 1;
    };
    let mut max_tag = 0u64;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let period = match style {
            DateStyle::Prefix => name.strip_suffix(&format!(".{base_name}")),
            DateStyle::BeforeExtension => match ext_opt {
                Some(ext) => name
                    .strip_prefix(&format!("{stem}."))
                    .and_then(|rest| rest.strip_suffix(&format!(".{ext}"))),
                None => name.strip_prefix(&format!("{stem}.")),
            },
        };
        if let Some(tag) = period.and_then(|p| p.parse::<u64>().ok()) {
            max_tag = max_tag.max(tag);
        }
    }
    max_tag + 1
}

fn prune_old_files(
    dir: &Path,
    base: &Path,
    style: DateStyle,
    keep: usize,
    current_path: &Path,
) -> io::Result<()> {
    let base_name = base.file_name().and_then(|s| s.to_str()).unwrap_or("");
    let (stem, ext_opt) = match base_name.rfind('.') {
        Some(pos) => (&base_name[..pos], Some(&base_name[pos + 1..])),
        None => (base_name, None),
    };

    let mut candidates: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path == current_path || !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let matches = match style {
            DateStyle::Prefix => name.ends_with(&format!(".{base_name}")),
            DateStyle::BeforeExtension => match ext_opt {
                Some(ext) => name.starts_with(&format!("{stem}.")) && name.ends_with(&format!(".{ext}")),
                None => name.starts_with(&format!("{stem}.")),
            },
        };
        if !matches {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        candidates.push((modified, path));
    }

    if candidates.len() > keep {
        candidates.sort_by_key(|(t, _)| *t);
        let remove = candidates.len() - keep;
        for (_, path) in candidates.into_iter().take(remove) {
            let _ = fs::remove_file(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::record::LogRecordBuilder;
    use tempfile::TempDir;

    fn rec(msg: &str) -> LogRecord {
        LogRecordBuilder::new(Level::Info, msg).build()
    }

    #[test]
    fn plain_writer_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut w = FileWriter::open("file", &path).unwrap();
        w.write(&rec("hello")).unwrap();
        w.write(&rec("world")).unwrap();
        w.flush().unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "hello\nworld\n");
    }

    #[test]
    fn rotating_writer_rotates_on_size_without_losing_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut w = RotatingWriter::open(
            "rot",
            &path,
            RotationTrigger::Never,
            DateStyle::BeforeExtension,
            Some(50),
            Some(10),
            1000,
        )
        .unwrap();

        let mut expected_lines = 0usize;
        for i in 0..200 {
            w.write(&rec(&format!("line-{i}"))).unwrap();
            expected_lines += 1;
        }
        w.flush().unwrap();

        let mut total_lines = 0usize;
        for entry in fs::read_dir(dir.path()).unwrap() {
            let entry = entry.unwrap();
            if entry.path().is_file() {
                let contents = fs::read_to_string(entry.path()).unwrap();
                total_lines += contents.lines().count();
            }
        }
        assert_eq!(total_lines, expected_lines);
    }

    #[test]
    fn retention_keeps_at_most_max_files_plus_current() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut w = RotatingWriter::open(
            "rot",
            &path,
            RotationTrigger::Never,
            DateStyle::BeforeExtension,
            Some(10),
            Some(2),
            1000,
        )
        .unwrap();
        for i in 0..50 {
            w.write(&rec(&format!("line-{i}"))).unwrap();
        }
        w.flush().unwrap();

        let file_count = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().is_file())
            .count();
        // current file + at most 2 archives
        assert!(file_count <= 3, "expected <=3 files, found {file_count}");
    }

    #[test]
    fn size_triggered_rotation_tags_archives_with_increasing_integers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut w = RotatingWriter::open(
            "rot",
            &path,
            RotationTrigger::Never,
            DateStyle::BeforeExtension,
            Some(50),
            None,
            1000,
        )
        .unwrap();
        for i in 0..200 {
            w.write(&rec(&format!("line-{i}"))).unwrap();
        }
        w.flush().unwrap();
        drop(w);

        let mut tags: Vec<u64> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_prefix("app.")
                    .and_then(|rest| rest.strip_suffix(".log"))
                    .and_then(|tag| tag.parse::<u64>().ok())
            })
            .collect();
        tags.sort_unstable();
        assert!(!tags.is_empty(), "expected at least one integer-tagged archive");
        assert_eq!(tags, (1..=tags.len() as u64).collect::<Vec<_>>());
    }

    #[test]
    fn reopening_after_restart_resumes_past_the_highest_existing_tag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        {
            let mut w = RotatingWriter::open(
                "rot",
                &path,
                RotationTrigger::Never,
                DateStyle::BeforeExtension,
                Some(50),
                None,
                1000,
            )
            .unwrap();
            for i in 0..120 {
                w.write(&rec(&format!("line-{i}"))).unwrap();
            }
            w.flush().unwrap();
        }

        let reopened = RotatingWriter::open(
            "rot",
            &path,
            RotationTrigger::Never,
            DateStyle::BeforeExtension,
            Some(50),
            None,
            1000,
        )
        .unwrap();
        let highest_existing = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.strip_prefix("app.")
                    .and_then(|rest| rest.strip_suffix(".log"))
                    .and_then(|tag| tag.parse::<u64>().ok())
            })
            .max()
            .unwrap_or(0);
        assert_eq!(reopened.next_size_tag, highest_existing + 1);
    }

    #[test]
    fn gzip_compression_replaces_archive_with_gz_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let mut w = RotatingWriter::open(
            "rot",
            &path,
            RotationTrigger::Never,
            DateStyle::BeforeExtension,
            Some(50),
            None,
            1000,
        )
        .unwrap()
        .with_compression(Compression::Gzip);

        for i in 0..50 {
            w.write(&rec(&format!("line-{i}"))).unwrap();
        }
        w.flush().unwrap();

        let gz_found = fs::read_dir(dir.path())
            .unwrap()
            .any(|e| e.unwrap().path().extension().and_then(|e| e.to_str()) == Some("gz"));
        assert!(gz_found, "expected at least one compressed archive");
    }
}
