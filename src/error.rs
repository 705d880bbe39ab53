// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Error type shared by the sample sheet parser, the index checks and the
//! suggested-barcode engine.

use itertools::Itertools;
use std::path::PathBuf;

use crate::hamming::HammingDistance;

#[derive(Debug, thiserror::Error)]
pub enum SampleSheetError {
    #[error(
        "Line {line:?} in section [{section}] has {found} non-empty fields, expected at most {expected}"
    )]
    MalformedSectionLine {
        section: String,
        line: String,
        found: usize,
        expected: usize,
    },

    #[error(
        "Unable to infer the sample sheet format. Expected a [BCLConvert_Settings] section (v2) \
         or any of [Header], [Reads], [Settings], [Data] (v1), found sections: [{}]",
        sections.join("], [")
    )]
    UnknownFormatVersion { sections: Vec<String> },

    #[error(
        "Found duplicate Sample IDs: {} (rows {})",
        ids.join(", "),
        rows.iter().join(", ")
    )]
    DuplicateSampleId { ids: Vec<String>, rows: Vec<usize> },

    #[error(
        "Found illegal project names in column '{column}': {}. The names 'all' and 'default' are reserved.",
        projects.join(", ")
    )]
    IllegalProjectName {
        column: String,
        projects: Vec<String>,
    },

    #[error(
        "{} index pair(s) are closer than the minimum Hamming distance of {min}: {}",
        pairs.len(),
        pairs.iter().map(|p| format!("{} vs {} ({})", p.u, p.v, p.distance)).join("; ")
    )]
    InsufficientHammingDistance {
        min: u32,
        pairs: Vec<HammingDistance>,
    },

    #[error("Sequences {u} and {v} are not the same length ({} vs {})", u.len(), v.len())]
    LengthMismatch { u: String, v: String },

    #[error("Section [{section}] has no column '{column}'")]
    MissingColumn { section: String, column: String },

    #[error("Section [{section}] declares the column '{column}' more than once")]
    DuplicateColumn { section: String, column: String },

    #[error("Invalid character {invalid:?} at position {position} in sequence {sequence:?}. Allowed: A, C, G, T, N")]
    InvalidSequence {
        sequence: String,
        position: usize,
        invalid: char,
    },

    #[error("Unable to read {barcode:?} as a barcode: {reason}")]
    InvalidBarcode { barcode: String, reason: String },

    #[error(
        "Duplicate index group {key} disagrees on column '{column}': {}",
        values.join(", ")
    )]
    ConflictingMergeFields {
        key: String,
        column: String,
        values: Vec<String>,
    },

    #[error("Invalid value {value:?} for setting {key}. Expected {expected}")]
    InvalidSetting {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Unknown {kind} {value:?}. Expected one of: {}", allowed.join(", "))]
    UnknownOption {
        kind: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("No bcl2fastq or BCL Convert statistics found under {path:?}")]
    UnknownConversionOutput { path: PathBuf },

    #[error("Error reading {path:?}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error writing {path:?}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
