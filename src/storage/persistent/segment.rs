//! Snapshot segments produced by compaction.
//!
//! A segment is an immutable file holding the full record index as of a WAL
//! sequence number. Each compaction writes a complete snapshot, so only the newest
//! segment is needed on open; older ones are pruned once a newer one is durable.
//!
//! # Layout
//! ```text
//! [MAGIC][VERSION][codec frame: SegmentHeader][codec frame: SegmentData]
//! ```
//! Files are named `segment_00001.seg`, `segment_00002.seg`, ... and written via a
//! temp file that is fsynced and renamed into place.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Result as IoResult, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::term::{CanonicalTerm, TermRecord};

use super::codec;

/// Segment file header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHeader {
    /// Last WAL sequence folded into this snapshot.
    pub up_to_sequence: u64,
    /// Number of records in the snapshot.
    pub record_count: u64,
    /// When this segment was written.
    pub created_at: DateTime<Utc>,
}

/// One stored record inside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Canonical key.
    pub term: CanonicalTerm,
    /// The record stored under it.
    pub record: TermRecord,
}

/// Full record index snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentData {
    /// All records, in key order.
    pub records: Vec<SnapshotEntry>,
}

impl SegmentData {
    /// Snapshot an index.
    #[must_use]
    pub fn from_index(index: &BTreeMap<CanonicalTerm, TermRecord>) -> Self {
        Self {
            records: index
                .iter()
                .map(|(term, record)| SnapshotEntry {
                    term: term.clone(),
                    record: record.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild an index from the snapshot.
    #[must_use]
    pub fn into_index(self) -> BTreeMap<CanonicalTerm, TermRecord> {
        self.records.into_iter().map(|e| (e.term, e.record)).collect()
    }

    /// Number of records.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.records.len() as u64
    }
}

/// A finalized segment file.
#[derive(Debug)]
pub struct Segment {
    id: u32,
    path: PathBuf,
    /// Last WAL sequence covered.
    pub up_to_sequence: u64,
}

impl Segment {
    /// Open an existing segment, reading only its header.
    pub fn open(path: &Path, id: u32) -> IoResult<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let _version = codec::read_header(&mut reader)?;
        let header: SegmentHeader = codec::decode(&mut reader)?;

        Ok(Self {
            id,
            path: path.to_path_buf(),
            up_to_sequence: header.up_to_sequence,
        })
    }

    /// Get the path to this segment.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot stored in this segment.
    pub fn read_all(&self) -> IoResult<SegmentData> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let _version = codec::read_header(&mut reader)?;
        let _header: SegmentHeader = codec::decode(&mut reader)?;
        codec::decode(&mut reader)
    }
}

/// Writes one segment atomically (temp file, fsync, rename).
pub struct SegmentWriter {
    id: u32,
    temp_path: Option<PathBuf>,
    final_path: PathBuf,
    writer: Option<BufWriter<File>>,
    up_to_sequence: u64,
}

impl SegmentWriter {
    fn new(id: u32, final_path: PathBuf) -> IoResult<Self> {
        let temp_path = final_path.with_extension(format!("seg.{}.tmp", Uuid::new_v4()));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;

        let mut writer = BufWriter::new(file);
        codec::write_header(&mut writer)?;

        Ok(Self {
            id,
            temp_path: Some(temp_path),
            final_path,
            writer: Some(writer),
            up_to_sequence: 0,
        })
    }

    /// Write the snapshot. May only be called once.
    pub fn write_data(&mut self, data: &SegmentData, up_to_sequence: u64) -> IoResult<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            std::io::Error::new(ErrorKind::Other, "segment writer already consumed")
        })?;

        let header = SegmentHeader {
            up_to_sequence,
            record_count: data.record_count(),
            created_at: Utc::now(),
        };
        writer.write_all(&codec::encode(&header)?)?;
        writer.write_all(&codec::encode(data)?)?;
        self.up_to_sequence = up_to_sequence;
        Ok(())
    }

    /// Flush, fsync and rename into place. After this returns the segment is durable.
    pub fn finalize(mut self) -> IoResult<Segment> {
        let (Some(mut writer), Some(temp_path)) = (self.writer.take(), self.temp_path.take())
        else {
            return Err(std::io::Error::new(
                ErrorKind::Other,
                "segment writer already consumed",
            ));
        };

        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);
        fs::rename(&temp_path, &self.final_path)?;

        Ok(Segment {
            id: self.id,
            path: self.final_path.clone(),
            up_to_sequence: self.up_to_sequence,
        })
    }
}

impl Drop for SegmentWriter {
    fn drop(&mut self) {
        // Unfinished writes leave no trace.
        self.writer.take();
        if let Some(temp_path) = self.temp_path.take() {
            let _ = fs::remove_file(temp_path);
        }
    }
}

fn parse_segment_id(path: &Path) -> Option<u32> {
    if path.extension().map_or(true, |e| e != "seg") {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("segment_")?
        .parse()
        .ok()
}

/// Manages the segment files of a data directory.
#[derive(Debug)]
pub struct SegmentManager {
    dir: PathBuf,
    latest: Option<Segment>,
    next_segment_id: u32,
}

impl SegmentManager {
    /// Open or create the segment directory, picking up the newest readable segment.
    pub fn open(dir: &Path) -> IoResult<Self> {
        fs::create_dir_all(dir)?;

        let mut candidates = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "tmp") {
                let _ = fs::remove_file(&path);
                continue;
            }
            if let Some(id) = parse_segment_id(&path) {
                candidates.push((id, path));
            }
        }
        candidates.sort_by_key(|(id, _)| *id);

        let next_segment_id = candidates.last().map_or(1, |(id, _)| id + 1);
        let mut latest = None;
        for (id, path) in candidates.into_iter().rev() {
            match Segment::open(&path, id) {
                Ok(segment) => {
                    latest = Some(segment);
                    break;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable segment"),
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            latest,
            next_segment_id,
        })
    }

    /// Get the directory containing segments.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The newest segment, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&Segment> {
        self.latest.as_ref()
    }

    /// Start writing the next segment.
    pub fn create_segment_writer(&mut self) -> IoResult<SegmentWriter> {
        let id = self.next_segment_id;
        self.next_segment_id += 1;
        let path = self.dir.join(format!("segment_{id:05}.seg"));
        SegmentWriter::new(id, path)
    }

    /// Install a finalized segment as the newest and delete the ones it supersedes.
    pub fn install(&mut self, segment: Segment) -> IoResult<()> {
        let keep = segment.id;
        self.latest = Some(segment);

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if parse_segment_id(&path).map_or(false, |id| id < keep) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Load the newest snapshot, or an empty one when no segment exists.
    pub fn load_latest(&self) -> IoResult<SegmentData> {
        self.latest
            .as_ref()
            .map_or_else(|| Ok(SegmentData::default()), Segment::read_all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::AuthorId;
    use tempfile::tempdir;

    fn sample_index() -> BTreeMap<CanonicalTerm, TermRecord> {
        let mut index = BTreeMap::new();
        let rust = CanonicalTerm::new("rust").unwrap();
        index.insert(
            rust.clone(),
            TermRecord::definition("a systems language", AuthorId::new("u1")),
        );
        index.insert(
            CanonicalTerm::new("rustlang").unwrap(),
            TermRecord::synonym(rust, AuthorId::new("u2")),
        );
        index
    }

    #[test]
    fn test_segment_manager_open_empty() {
        let dir = tempdir().unwrap();
        let manager = SegmentManager::open(dir.path()).unwrap();
        assert!(manager.latest().is_none());
        assert!(manager.load_latest().unwrap().records.is_empty());
    }

    #[test]
    fn test_segment_writer_roundtrip() {
        let dir = tempdir().unwrap();
        let mut manager = SegmentManager::open(dir.path()).unwrap();

        let mut writer = manager.create_segment_writer().unwrap();
        writer
            .write_data(&SegmentData::from_index(&sample_index()), 10)
            .unwrap();
        let segment = writer.finalize().unwrap();
        assert_eq!(segment.up_to_sequence, 10);
        assert!(segment.path().to_string_lossy().contains("segment_00001"));
        manager.install(segment).unwrap();

        let reopened = SegmentManager::open(dir.path()).unwrap();
        let index = reopened.load_latest().unwrap().into_index();
        assert_eq!(index, sample_index());
    }

    #[test]
    fn test_install_prunes_older_segments() {
        let dir = tempdir().unwrap();
        let mut manager = SegmentManager::open(dir.path()).unwrap();

        for seq in [5, 9] {
            let mut writer = manager.create_segment_writer().unwrap();
            writer.write_data(&SegmentData::default(), seq).unwrap();
            let segment = writer.finalize().unwrap();
            manager.install(segment).unwrap();
        }

        let segs: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| parse_segment_id(&e.unwrap().path()))
            .collect();
        assert_eq!(segs, [2]);
        assert_eq!(manager.latest().unwrap().up_to_sequence, 9);
    }

    #[test]
    fn test_dropped_writer_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let mut manager = SegmentManager::open(dir.path()).unwrap();

        drop(manager.create_segment_writer().unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
