// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Readers for the demultiplexing statistics written by BCL Convert
//! (`Reports/Demultiplex_Stats.csv`, `Reports/Top_Unknown_Barcodes.csv`) and
//! by bcl2fastq (`Stats/Stats.json`), converted into the inputs of
//! [`report_suggested_barcodes`](crate::suggest::report_suggested_barcodes).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use crate::error::SampleSheetError;
use crate::samplesheet::indexes::lane_key;
use crate::suggest::{DemuxSampleStats, UnknownBarcodeCount};

/// Unknown barcodes kept per lane unless asked otherwise.
pub const DEFAULT_TOP_N: usize = 10;

fn open(path: &Path) -> Result<BufReader<File>, SampleSheetError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| SampleSheetError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Deserialize, Debug)]
struct DemultiplexStatsRow {
    #[serde(rename = "Lane")]
    lane: String,
    #[serde(rename = "SampleID")]
    sample_id: String,
    #[serde(rename = "Sample_Project", default)]
    sample_project: Option<String>,
    #[serde(rename = "Index", default)]
    index: Option<String>,
    #[serde(rename = "# Reads")]
    reads: u64,
}

/// Per-sample, per-lane read counts from a BCL Convert `Demultiplex_Stats.csv`.
pub fn demultiplex_stats_from_reader<R: io::Read>(
    reader: R,
) -> Result<Vec<DemuxSampleStats>, SampleSheetError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut stats = Vec::new();
    for row in rdr.deserialize() {
        let row: DemultiplexStatsRow = row?;
        stats.push(DemuxSampleStats {
            lane: row.lane,
            sample_id: row.sample_id,
            sample_project: row.sample_project,
            index: row.index,
            read_count: row.reads,
        });
    }
    Ok(stats)
}

pub fn read_demultiplex_stats(path: impl AsRef<Path>) -> Result<Vec<DemuxSampleStats>, SampleSheetError> {
    demultiplex_stats_from_reader(open(path.as_ref())?)
}

#[derive(Deserialize, Debug)]
struct TopUnknownRow {
    #[serde(rename = "Lane")]
    lane: String,
    index: String,
    #[serde(default)]
    index2: Option<String>,
    #[serde(rename = "# Reads")]
    reads: u64,
}

/// Unknown barcodes from a BCL Convert `Top_Unknown_Barcodes.csv`, limited
/// to the `top_n` most frequent per lane.
pub fn top_unknown_barcodes_from_reader<R: io::Read>(
    reader: R,
    top_n: usize,
) -> Result<Vec<UnknownBarcodeCount>, SampleSheetError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut counts = Vec::new();
    for row in rdr.deserialize() {
        let row: TopUnknownRow = row?;
        counts.push(UnknownBarcodeCount {
            lane: row.lane,
            index: row.index,
            index2: row.index2,
            read_count: row.reads,
        });
    }
    Ok(top_n_per_lane(counts, top_n))
}

pub fn read_top_unknown_barcodes(
    path: impl AsRef<Path>,
    top_n: usize,
) -> Result<Vec<UnknownBarcodeCount>, SampleSheetError> {
    top_unknown_barcodes_from_reader(open(path.as_ref())?, top_n)
}

/// Group by lane (lanes in numeric order), sort each lane by count
/// descending and keep the first `n`.
pub fn top_n_per_lane(counts: Vec<UnknownBarcodeCount>, n: usize) -> Vec<UnknownBarcodeCount> {
    let mut lanes: BTreeMap<(u32, String), Vec<UnknownBarcodeCount>> = BTreeMap::new();
    for c in counts {
        lanes.entry(lane_key(&c.lane)).or_default().push(c);
    }
    lanes
        .into_values()
        .flat_map(|mut lane| {
            lane.sort_by(|a, b| b.read_count.cmp(&a.read_count));
            lane.truncate(n);
            lane
        })
        .collect()
}

/// The parts of a bcl2fastq `Stats.json` used here.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Bcl2FastqStats {
    #[serde(default)]
    pub flowcell: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    pub conversion_results: Vec<LaneConversionResults>,
    #[serde(default)]
    pub unknown_barcodes: Vec<LaneUnknownBarcodes>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct LaneConversionResults {
    pub lane_number: u32,
    #[serde(rename = "TotalClustersPF", default)]
    pub total_clusters_pf: Option<u64>,
    pub demux_results: Vec<SampleDemuxResults>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SampleDemuxResults {
    pub sample_id: String,
    #[serde(default)]
    pub sample_name: Option<String>,
    #[serde(default)]
    pub index_metrics: Vec<IndexMetric>,
    pub number_reads: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct IndexMetric {
    pub index_sequence: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct LaneUnknownBarcodes {
    pub lane: u32,
    /// Barcode (`i7+i5`) to read count.
    pub barcodes: BTreeMap<String, u64>,
}

impl Bcl2FastqStats {
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, SampleSheetError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, SampleSheetError> {
        Bcl2FastqStats::from_reader(open(path.as_ref())?)
    }

    /// Read counts per sample and lane. bcl2fastq does not record projects.
    pub fn sample_stats(&self) -> Vec<DemuxSampleStats> {
        self.conversion_results
            .iter()
            .flat_map(|lane| {
                lane.demux_results.iter().map(move |sample| DemuxSampleStats {
                    lane: lane.lane_number.to_string(),
                    sample_id: sample.sample_id.clone(),
                    sample_project: None,
                    index: sample.index_metrics.first().map(|m| m.index_sequence.clone()),
                    read_count: sample.number_reads,
                })
            })
            .collect()
    }

    /// The `n` most frequent unknown barcodes of every lane.
    pub fn top_unknown_barcodes(&self, n: usize) -> Vec<UnknownBarcodeCount> {
        let counts = self
            .unknown_barcodes
            .iter()
            .flat_map(|lane| {
                lane.barcodes.iter().map(move |(barcode, &reads)| {
                    let mut parts = barcode.splitn(2, '+');
                    let index = parts.next().unwrap_or_default().to_string();
                    UnknownBarcodeCount {
                        lane: lane.lane.to_string(),
                        index,
                        index2: parts.next().map(str::to_string),
                        read_count: reads,
                    }
                })
            })
            .collect();
        top_n_per_lane(counts, n)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const BCLCONVERT_REPORTS: &str = "test/conversion/bclconvert/Reports";
    const BCL2FASTQ_STATS: &str = "test/conversion/bcl2fastq/Stats/Stats.json";

    #[test]
    fn test_read_demultiplex_stats() {
        let stats =
            read_demultiplex_stats(Path::new(BCLCONVERT_REPORTS).join("Demultiplex_Stats.csv")).unwrap();
        assert_eq!(stats.len(), 6);
        assert_eq!(
            stats[0],
            DemuxSampleStats {
                lane: "1".to_string(),
                sample_id: "Sample_1".to_string(),
                sample_project: Some("Project_1".to_string()),
                index: Some("ATCTCAGG-TATCCTCT".to_string()),
                read_count: 92,
            }
        );
        let undetermined = &stats[2];
        assert_eq!(undetermined.sample_id, "Undetermined");
        assert_eq!(undetermined.index, None);
    }

    #[test]
    fn test_read_top_unknown_barcodes() {
        let path = Path::new(BCLCONVERT_REPORTS).join("Top_Unknown_Barcodes.csv");
        let all = read_top_unknown_barcodes(&path, DEFAULT_TOP_N).unwrap();
        assert_eq!(all.len(), 6);
        let top = read_top_unknown_barcodes(&path, 2).unwrap();
        let summary: Vec<(&str, &str, u64)> = top
            .iter()
            .map(|u| (u.lane.as_str(), u.index2.as_deref().unwrap_or(""), u.read_count))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("1", "CGGAGAGA", 125580963),
                ("1", "TACTCCTT", 112136682),
                ("2", "AGAGGATA", 85643023),
                ("2", "TACTCCTT", 1200),
            ]
        );
    }

    #[test]
    fn test_single_index_unknowns() {
        let text = "Lane,index,# Reads,% of Unknown Barcodes,% of All Reads\n1,ACGTACGT,10,0.5,0.1\n";
        let counts = top_unknown_barcodes_from_reader(text.as_bytes(), DEFAULT_TOP_N).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].index2, None);
    }

    #[test]
    fn test_bcl2fastq_stats() {
        let stats = Bcl2FastqStats::read(BCL2FASTQ_STATS).unwrap();
        assert_eq!(stats.run_id.as_deref(), Some("240301_A00123_0042_AHXXXXDSXY"));

        let samples = stats.sample_stats();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].index.as_deref(), Some("AAAA+TTTT"));
        assert_eq!(samples[2].lane, "2");
        assert_eq!(samples[2].read_count, 7);

        let top = stats.top_unknown_barcodes(1);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].index, "TTTT");
        assert_eq!(top[0].index2.as_deref(), Some("AAAA"));
        assert_eq!(top[0].read_count, 500);
        assert_eq!(top[1].lane, "2");
    }

    #[test]
    fn test_missing_stats_file() {
        assert!(matches!(
            Bcl2FastqStats::read("test/conversion/none/Stats.json"),
            Err(SampleSheetError::ReadFile { .. })
        ));
    }
}
