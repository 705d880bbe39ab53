// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! File conventions of sequencing run folders and of the output directories
//! written by bcl2fastq and BCL Convert.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::SampleSheetError;
use crate::stats::{self, Bcl2FastqStats};
use crate::suggest::{report_suggested_barcodes, DemuxSampleStats, SuggestedBarcodes, UnknownBarcodeCount};

/// File name the instruments and converters look for.
pub const CANONICAL_SAMPLESHEET: &str = "SampleSheet.csv";

lazy_static! {
    static ref RUNID_REGEX: Regex =
        Regex::new(r"[0-9]{6,8}_[A-Z0-9]{6,}_[0-9]{1,}_[-A-Z0-9]{1,}").unwrap();
}

/// Does `name` contain an Illumina run id such as `240301_A00123_0042_AHXXXXDSXY`?
pub fn is_runid(name: &str) -> bool {
    RUNID_REGEX.is_match(name)
}

/// A file is taken for a sample sheet when it has the canonical name or its
/// first non-blank line opens the `[Header]` section.
pub fn looks_like_samplesheet(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    if path.file_name().map_or(false, |n| n == CANONICAL_SAMPLESHEET) {
        return true;
    }
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };
    for line in BufReader::new(file).lines() {
        match line {
            Ok(line) => {
                let line = line.trim_start_matches('\u{feff}').trim();
                if line.is_empty() {
                    continue;
                }
                return line.starts_with("[Header]");
            }
            Err(_) => return false,
        }
    }
    false
}

/// Sample sheets directly inside `dir`: `SampleSheet.csv` first, then other
/// regular `.csv` files, then symlinked ones. Each group is sorted by name.
pub fn find_samplesheets(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, SampleSheetError> {
    let dir = dir.as_ref();
    let read_err = |source| SampleSheetError::ReadFile {
        path: dir.to_path_buf(),
        source,
    };

    let mut canonical = Vec::new();
    let mut regular = Vec::new();
    let mut links = Vec::new();

    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_csv = path
            .extension()
            .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
        if !is_csv || !path.is_file() || !looks_like_samplesheet(&path) {
            continue;
        }
        let is_link = fs::symlink_metadata(&path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        if path.file_name().map_or(false, |n| n == CANONICAL_SAMPLESHEET) {
            canonical.push(path);
        } else if is_link {
            links.push(path);
        } else {
            regular.push(path);
        }
    }

    regular.sort();
    links.sort();
    canonical.extend(regular);
    canonical.extend(links);
    Ok(canonical)
}

/// Loads the two inputs of the suggested-barcode report from a
/// demultiplexer's output directory.
pub trait LoadDemuxStats {
    fn demux_sample_stats(&self) -> Result<Vec<DemuxSampleStats>, SampleSheetError>;

    /// The `n` most frequent unknown barcodes of every lane.
    fn top_unknown_barcodes(&self, n: usize) -> Result<Vec<UnknownBarcodeCount>, SampleSheetError>;

    fn suggested_barcodes(&self, n: usize) -> Result<SuggestedBarcodes, SampleSheetError> {
        let samples = self.demux_sample_stats()?;
        let unknown = self.top_unknown_barcodes(n)?;
        report_suggested_barcodes(&samples, &unknown)
    }
}

/// A BCL Convert output directory, reports under `Reports/`.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq, Debug)]
pub struct BclConvertOutput {
    pub path: PathBuf,
}

impl BclConvertOutput {
    pub fn demultiplex_stats_path(&self) -> PathBuf {
        self.path.join("Reports").join("Demultiplex_Stats.csv")
    }

    pub fn top_unknown_barcodes_path(&self) -> PathBuf {
        self.path.join("Reports").join("Top_Unknown_Barcodes.csv")
    }

    fn is_present(&self) -> bool {
        self.demultiplex_stats_path().is_file() && self.top_unknown_barcodes_path().is_file()
    }
}

impl LoadDemuxStats for BclConvertOutput {
    fn demux_sample_stats(&self) -> Result<Vec<DemuxSampleStats>, SampleSheetError> {
        stats::read_demultiplex_stats(self.demultiplex_stats_path())
    }

    fn top_unknown_barcodes(&self, n: usize) -> Result<Vec<UnknownBarcodeCount>, SampleSheetError> {
        stats::read_top_unknown_barcodes(self.top_unknown_barcodes_path(), n)
    }
}

/// A bcl2fastq output directory with `Stats/Stats.json`. The legacy copy BCL
/// Convert writes to `Reports/legacy/Stats/Stats.json` is read the same way.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq, Debug)]
pub struct Bcl2FastqOutput {
    pub path: PathBuf,
}

impl Bcl2FastqOutput {
    pub fn stats_json_path(&self) -> PathBuf {
        let stats = self.path.join("Stats").join("Stats.json");
        let legacy = self
            .path
            .join("Reports")
            .join("legacy")
            .join("Stats")
            .join("Stats.json");
        if !stats.is_file() && legacy.is_file() {
            legacy
        } else {
            stats
        }
    }

    fn is_present(&self) -> bool {
        self.stats_json_path().is_file()
    }
}

impl LoadDemuxStats for Bcl2FastqOutput {
    fn demux_sample_stats(&self) -> Result<Vec<DemuxSampleStats>, SampleSheetError> {
        Ok(Bcl2FastqStats::read(self.stats_json_path())?.sample_stats())
    }

    fn top_unknown_barcodes(&self, n: usize) -> Result<Vec<UnknownBarcodeCount>, SampleSheetError> {
        Ok(Bcl2FastqStats::read(self.stats_json_path())?.top_unknown_barcodes(n))
    }

    fn suggested_barcodes(&self, n: usize) -> Result<SuggestedBarcodes, SampleSheetError> {
        let stats = Bcl2FastqStats::read(self.stats_json_path())?;
        report_suggested_barcodes(&stats.sample_stats(), &stats.top_unknown_barcodes(n))
    }
}

/// The output directory of one of the supported demultiplexers. Use
/// `detect()` to pick the variant from the files present.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq, Debug)]
pub enum ConversionOutput {
    BclConvert(BclConvertOutput),
    Bcl2Fastq(Bcl2FastqOutput),
}

impl ConversionOutput {
    pub fn bclconvert(path: impl Into<PathBuf>) -> ConversionOutput {
        ConversionOutput::BclConvert(BclConvertOutput { path: path.into() })
    }

    pub fn bcl2fastq(path: impl Into<PathBuf>) -> ConversionOutput {
        ConversionOutput::Bcl2Fastq(Bcl2FastqOutput { path: path.into() })
    }

    /// BCL Convert reports take precedence over a bcl2fastq `Stats.json`.
    pub fn detect(dir: impl AsRef<Path>) -> Result<ConversionOutput, SampleSheetError> {
        let dir = dir.as_ref();
        let bclconvert = BclConvertOutput {
            path: dir.to_path_buf(),
        };
        if bclconvert.is_present() {
            debug!("found BCL Convert reports in {:?}", dir);
            return Ok(ConversionOutput::BclConvert(bclconvert));
        }
        let bcl2fastq = Bcl2FastqOutput {
            path: dir.to_path_buf(),
        };
        if bcl2fastq.is_present() {
            debug!("found bcl2fastq stats in {:?}", dir);
            return Ok(ConversionOutput::Bcl2Fastq(bcl2fastq));
        }
        Err(SampleSheetError::UnknownConversionOutput {
            path: dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        match self {
            ConversionOutput::BclConvert(d) => &d.path,
            ConversionOutput::Bcl2Fastq(d) => &d.path,
        }
    }
}

impl LoadDemuxStats for ConversionOutput {
    fn demux_sample_stats(&self) -> Result<Vec<DemuxSampleStats>, SampleSheetError> {
        match self {
            ConversionOutput::BclConvert(d) => d.demux_sample_stats(),
            ConversionOutput::Bcl2Fastq(d) => d.demux_sample_stats(),
        }
    }

    fn top_unknown_barcodes(&self, n: usize) -> Result<Vec<UnknownBarcodeCount>, SampleSheetError> {
        match self {
            ConversionOutput::BclConvert(d) => d.top_unknown_barcodes(n),
            ConversionOutput::Bcl2Fastq(d) => d.top_unknown_barcodes(n),
        }
    }

    fn suggested_barcodes(&self, n: usize) -> Result<SuggestedBarcodes, SampleSheetError> {
        match self {
            ConversionOutput::BclConvert(d) => d.suggested_barcodes(n),
            ConversionOutput::Bcl2Fastq(d) => d.suggested_barcodes(n),
        }
    }
}
