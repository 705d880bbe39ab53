// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Suggested barcodes: find samples whose reads may have ended up among the
//! undetermined reads because their barcode was read in another orientation.
//!
//! For every lane, each declared sample barcode is transformed in every
//! reverse-complement orientation and compared against the most frequent
//! unknown barcodes reported for that lane by the demultiplexer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::Path;

use crate::barcode::{compare_barcodes, Barcode, RcMethod, Separator};
use crate::error::SampleSheetError;
use crate::samplesheet::indexes::lane_key;

/// Pseudo-sample holding the reads no sample claimed.
pub const UNDETERMINED: &str = "Undetermined";

/// Reads assigned to one sample in one lane.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DemuxSampleStats {
    pub lane: String,
    pub sample_id: String,
    pub sample_project: Option<String>,
    /// Declared barcode, `i7`, `i7-i5` or `i7+i5`. Absent for `Undetermined`.
    pub index: Option<String>,
    pub read_count: u64,
}

/// An observed barcode that matched no sample, with its read count.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UnknownBarcodeCount {
    pub lane: String,
    pub index: String,
    pub index2: Option<String>,
    pub read_count: u64,
}

impl UnknownBarcodeCount {
    pub fn barcode(&self, sep: Separator) -> Result<Barcode, SampleSheetError> {
        match self.index2 {
            Some(ref index2) if !index2.is_empty() => {
                Ok(Barcode::new(&self.index, index2)?.with_separator(sep))
            }
            _ => Barcode::single(&self.index),
        }
    }
}

/// One row of the suggested-barcode report.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuggestedBarcode {
    #[serde(rename = "Lane")]
    pub lane: String,
    #[serde(rename = "Sample_Project")]
    pub sample_project: String,
    #[serde(rename = "SampleID")]
    pub sample_id: String,
    #[serde(rename = "Barcode")]
    pub barcode: String,
    pub i7: String,
    pub i5: String,
    #[serde(rename = "Read_count")]
    pub read_count: u64,
    #[serde(rename = "Reverse_complement")]
    pub reverse_complement: RcMethod,
    #[serde(rename = "Unknown_barcode")]
    pub unknown_barcode: String,
    #[serde(rename = "Unknown_i7")]
    pub unknown_i7: String,
    #[serde(rename = "Unknown_i5")]
    pub unknown_i5: String,
    #[serde(rename = "Unknown_barcode_ID")]
    pub unknown_barcode_id: u32,
    #[serde(rename = "Unknown_read_count")]
    pub unknown_read_count: u64,
    #[serde(rename = "Diff_count")]
    pub diff_count: i64,
    #[serde(rename = "Log2_FoldChange")]
    pub log2_fold_change: f64,
}

/// Column order of the report CSV.
pub const REPORT_COLUMNS: [&str; 15] = [
    "Lane",
    "Sample_Project",
    "SampleID",
    "Barcode",
    "i7",
    "i5",
    "Read_count",
    "Reverse_complement",
    "Unknown_barcode",
    "Unknown_i7",
    "Unknown_i5",
    "Unknown_barcode_ID",
    "Unknown_read_count",
    "Diff_count",
    "Log2_FoldChange",
];

/// `log2(unknown / max(declared, 1))` rounded to two decimals.
pub fn log2_fold_change(unknown: u64, declared: u64) -> f64 {
    let ratio = unknown as f64 / declared.max(1) as f64;
    (ratio.log2() * 100.0).round() / 100.0
}

/// Records sorted by unknown barcode id, then lane. An empty report is a
/// valid outcome: no orientation of any sample barcode is among the unknowns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SuggestedBarcodes {
    records: Vec<SuggestedBarcode>,
}

impl SuggestedBarcodes {
    pub fn records(&self) -> &[SuggestedBarcode] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the report as CSV. The header row is always written.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), SampleSheetError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(REPORT_COLUMNS)?;
        for rec in &self.records {
            wtr.serialize(rec)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_file(&self, path: impl AsRef<Path>) -> Result<(), SampleSheetError> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| SampleSheetError::WriteFile {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_csv(io::BufWriter::new(file))
    }
}

/// Compare every sample of a lane against every unknown barcode of the same
/// lane. `Undetermined` and samples without an index are skipped. When the
/// unknown barcodes carry no i5, only the i7 sides are compared.
pub fn report_suggested_barcodes(
    samples: &[DemuxSampleStats],
    unknown: &[UnknownBarcodeCount],
) -> Result<SuggestedBarcodes, SampleSheetError> {
    if !unknown.is_empty() && unknown.iter().all(|u| u.index2.as_deref().map_or(true, str::is_empty)) {
        warn!("unknown barcodes have no index2, comparing i7 indexes only");
    }

    let lanes: BTreeSet<(u32, String)> = samples.iter().map(|s| lane_key(&s.lane)).collect();
    let mut ids: HashMap<String, u32> = HashMap::new();
    let mut records = Vec::new();

    for (_, lane) in &lanes {
        let lane_unknown: Vec<&UnknownBarcodeCount> =
            unknown.iter().filter(|u| u.lane == *lane).collect();

        for sample in samples.iter().filter(|s| s.lane == *lane) {
            if sample.sample_id == UNDETERMINED {
                continue;
            }
            let index = match sample.index {
                Some(ref index) if !index.is_empty() => index,
                _ => {
                    debug!("sample {} in lane {} has no index", sample.sample_id, lane);
                    continue;
                }
            };
            let declared = Barcode::parse(index)?;

            for u in &lane_unknown {
                let observed = u.barcode(declared.separator())?;
                let (known, candidate) = if observed.is_dual() && declared.is_dual() {
                    (observed.clone(), declared.clone())
                } else {
                    (observed.i7_only(), declared.i7_only())
                };

                for m in compare_barcodes(&known, &candidate) {
                    let next = ids.len() as u32 + 1;
                    let id = *ids.entry(m.transformed.to_string()).or_insert(next);
                    records.push(SuggestedBarcode {
                        lane: sample.lane.clone(),
                        sample_project: sample.sample_project.clone().unwrap_or_default(),
                        sample_id: sample.sample_id.clone(),
                        barcode: index.clone(),
                        i7: declared.i7().to_string(),
                        i5: declared.i5().map(|s| s.to_string()).unwrap_or_default(),
                        read_count: sample.read_count,
                        reverse_complement: m.method,
                        unknown_barcode: observed.to_string(),
                        unknown_i7: observed.i7().to_string(),
                        unknown_i5: observed.i5().map(|s| s.to_string()).unwrap_or_default(),
                        unknown_barcode_id: id,
                        unknown_read_count: u.read_count,
                        diff_count: u.read_count as i64 - sample.read_count as i64,
                        log2_fold_change: log2_fold_change(u.read_count, sample.read_count),
                    });
                }
            }
        }
    }

    records.sort_by(|a, b| {
        (a.unknown_barcode_id, lane_key(&a.lane)).cmp(&(b.unknown_barcode_id, lane_key(&b.lane)))
    });
    info!(
        "{} suggested barcode(s) for {} distinct unknown barcode(s)",
        records.len(),
        ids.len()
    );
    Ok(SuggestedBarcodes { records })
}
