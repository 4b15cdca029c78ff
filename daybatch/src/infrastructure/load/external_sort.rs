// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # External K-Way Merge Sort
//!
//! The spill path for inputs whose byte estimate exceeds the memory
//! budget. The input is cut into memory-sized runs, each run is stable
//! sorted and written to a scratch file (JSON lines, one record per
//! line), and the runs are merged through a min-heap keyed by
//! `(sort key, run index, in-run sequence)`.
//!
//! ## Stability
//!
//! Runs are cut in input order and each run is sorted stably, so the
//! `(key, run, seq)` tie-break reproduces input order for equal keys -
//! the same guarantee the in-memory path gets from `sort_by_key`.
//!
//! ## Resource Ownership
//!
//! The merge owns its scratch files through a guard that deletes them on
//! drop, whichever way the merge ends. Spill files never appear in the
//! context's temp-file list; they are the sorter's own resource, not the
//! day's.
//!
//! Merge output is streamed: the loader pulls one record at a time and
//! never materializes the sorted whole.

use daybatch_domain::{EtlError, TargetRecord};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Sorts records in memory, stably, by the named field.
pub fn sort_in_memory(
    records: Vec<TargetRecord>,
    sort_field: &str,
) -> Result<Vec<TargetRecord>, EtlError> {
    let mut keyed: Vec<(i64, TargetRecord)> = records
        .into_iter()
        .map(|record| record.sort_value(sort_field).map(|key| (key, record)))
        .collect::<Result<_, _>>()?;
    // Vec::sort_by_key is stable: ties keep input order
    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, record)| record).collect())
}

/// Deletes the run files (and their directory) when the merge ends.
struct RunFilesGuard {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl Drop for RunFilesGuard {
    fn drop(&mut self) {
        for path in &self.files {
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        category = "load",
                        event = "spill_cleanup_failed",
                        error_details = %err,
                        "could not remove spill file {}",
                        path.display()
                    );
                }
            }
        }
        let _ = std::fs::remove_dir(&self.dir);
    }
}

/// One spilled run being read back during the merge.
struct RunReader {
    lines: std::io::Lines<BufReader<File>>,
    run: usize,
    next_seq: u64,
}

impl RunReader {
    /// Reads the next record of this run, tagging it for the heap
    fn next_entry(&mut self, sort_field: &str) -> Result<Option<HeapEntry>, EtlError> {
        let Some(line) = self.lines.next() else {
            return Ok(None);
        };
        let line = line.map_err(|err| {
            EtlError::load_error(format!("spill read failed on run {}: {}", self.run, err))
        })?;
        let record: TargetRecord = serde_json::from_str(&line)?;
        let key = record.sort_value(sort_field)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(Some(HeapEntry {
            key,
            run: self.run,
            seq,
            record,
        }))
    }
}

/// Heap entry ordered by `(key, run, seq)`; the record rides along and
/// never participates in the ordering.
struct HeapEntry {
    key: i64,
    run: usize,
    seq: u64,
    record: TargetRecord,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        (self.key, self.run, self.seq) == (other.key, other.run, other.seq)
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, the merge needs the minimum
        (other.key, other.run, other.seq).cmp(&(self.key, self.run, self.seq))
    }
}

/// A streaming K-way merge over spilled runs.
pub struct KWayMerge {
    readers: Vec<RunReader>,
    heap: BinaryHeap<HeapEntry>,
    sort_field: String,
    _guard: RunFilesGuard,
}

impl Iterator for KWayMerge {
    type Item = Result<TargetRecord, EtlError>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.heap.pop()?;
        // Refill from the run the winner came from
        match self.readers[entry.run].next_entry(&self.sort_field) {
            Ok(Some(next)) => self.heap.push(next),
            Ok(None) => {}
            Err(err) => return Some(Err(err)),
        }
        Some(Ok(entry.record))
    }
}

/// Run-writing half of the external sort.
pub struct ExternalSorter {
    scratch_dir: PathBuf,
    run_capacity: usize,
    sort_field: String,
}

impl ExternalSorter {
    /// `run_capacity` is the number of records per spilled run, derived
    /// from the memory budget and the per-record estimate.
    pub fn new(scratch_dir: &Path, run_capacity: usize, sort_field: &str) -> Self {
        Self {
            scratch_dir: scratch_dir.to_path_buf(),
            run_capacity: run_capacity.max(1),
            sort_field: sort_field.to_string(),
        }
    }

    /// Spills the input into sorted runs and returns the streaming merge.
    pub fn sort(self, mut records: Vec<TargetRecord>) -> Result<KWayMerge, EtlError> {
        std::fs::create_dir_all(&self.scratch_dir)?;

        let mut files = Vec::new();
        let mut run_index = 0usize;
        // Cut runs in input order so the run index is a stability tie-break
        while !records.is_empty() {
            let take = records.len().min(self.run_capacity);
            let rest = records.split_off(take);
            let run = sort_in_memory(records, &self.sort_field)?;
            records = rest;

            let path = self.scratch_dir.join(format!("run-{:05}.jsonl", run_index));
            let mut writer = BufWriter::new(File::create(&path)?);
            for record in &run {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            files.push(path);
            run_index += 1;
        }

        debug!(
            category = "load",
            event = "spill_written",
            runs = files.len(),
            "external sort spilled {} runs under {}",
            files.len(),
            self.scratch_dir.display()
        );

        let guard = RunFilesGuard {
            dir: self.scratch_dir.clone(),
            files: files.clone(),
        };

        let mut readers = Vec::with_capacity(files.len());
        let mut heap = BinaryHeap::with_capacity(files.len());
        for (run, path) in files.iter().enumerate() {
            let mut reader = RunReader {
                lines: BufReader::new(File::open(path)?).lines(),
                run,
                next_seq: 0,
            };
            if let Some(entry) = reader.next_entry(&self.sort_field)? {
                heap.push(entry);
            }
            readers.push(reader);
        }

        Ok(KWayMerge {
            readers,
            heap,
            sort_field: self.sort_field,
            _guard: guard,
        })
    }
}
