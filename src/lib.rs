// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Parse and check Illumina sample sheets, and diagnose reads lost to
//! mis-declared barcodes.
//!
//! * [`samplesheet`] reads and writes the v1 (bcl2fastq) and v2 (BCL Convert)
//!   sample sheet formats and runs the index checks on them.
//! * [`suggest`] compares each sample's declared barcode against the unknown
//!   barcodes of its lane, under every reverse-complement convention.
//! * [`stats`] and [`layout`] read the demultiplexer's outputs that feed it.

#[macro_use]
extern crate log;

pub mod barcode;
pub mod error;
pub mod hamming;
pub mod layout;
pub mod samplesheet;
pub mod section;
pub mod seq;
pub mod stats;
pub mod suggest;

pub use crate::barcode::{Barcode, RcMethod, Separator};
pub use crate::error::SampleSheetError;
pub use crate::samplesheet::{SampleSheet, SampleSheetFormat};
pub use crate::suggest::{report_suggested_barcodes, SuggestedBarcodes};
