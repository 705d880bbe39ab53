// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Sample barcodes as declared in a sample sheet: an i7 index, optionally
//! paired with an i5 index. A dual barcode can be read off the flow cell in
//! four physically distinct orientations, so the reverse complement comes in
//! four flavours (see [`RcMethod`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SampleSheetError;
use crate::seq::DnaSeq;

/// Character joining the i7 and i5 parts when written as one string.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Separator {
    #[serde(rename = "-")]
    Dash,
    #[serde(rename = "+")]
    Plus,
}

impl Separator {
    pub fn as_char(self) -> char {
        match self {
            Separator::Dash => '-',
            Separator::Plus => '+',
        }
    }
}

impl Default for Separator {
    fn default() -> Self {
        Separator::Dash
    }
}

/// The transforms tried when looking for a barcode "in disguise".
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RcMethod {
    /// Identity, used as the baseline comparison
    #[serde(rename = "none")]
    None,
    /// Reverse complement the i7 side only
    #[serde(rename = "i7")]
    I7,
    /// Reverse complement the i5 side only
    #[serde(rename = "i5")]
    I5,
    /// Reverse complement both sides independently
    #[serde(rename = "both")]
    Both,
    /// Reverse complement `i7 + sep + i5` as one literal string
    #[serde(rename = "full")]
    Full,
}

const RC_METHOD_NAMES: &[&str] = &["none", "i7", "i5", "both", "full"];

static DUAL_INDEX_METHODS: [RcMethod; 5] = RcMethod::ALL;
static SINGLE_INDEX_METHODS: [RcMethod; 2] = [RcMethod::None, RcMethod::I7];

impl RcMethod {
    pub const ALL: [RcMethod; 5] = [
        RcMethod::None,
        RcMethod::I7,
        RcMethod::I5,
        RcMethod::Both,
        RcMethod::Full,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RcMethod::None => "none",
            RcMethod::I7 => "i7",
            RcMethod::I5 => "i5",
            RcMethod::Both => "both",
            RcMethod::Full => "full",
        }
    }
}

impl fmt::Display for RcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RcMethod {
    type Err = SampleSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(RcMethod::None),
            "i7" | "i7-only" | "1" => Ok(RcMethod::I7),
            "i5" | "i5-only" | "2" => Ok(RcMethod::I5),
            "both" | "3" => Ok(RcMethod::Both),
            "full" | "4" => Ok(RcMethod::Full),
            _ => Err(SampleSheetError::UnknownOption {
                kind: "reverse complement method",
                value: s.to_string(),
                allowed: RC_METHOD_NAMES,
            }),
        }
    }
}

/// An i7 index, optionally paired with an i5 index. Two barcodes are equal
/// when their textual forms (`i7`, separator, `i5`) are equal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Barcode {
    i7: DnaSeq,
    i5: Option<DnaSeq>,
    sep: Separator,
}

impl Barcode {
    /// A dual-index barcode joined by `-`.
    pub fn new(i7: &str, i5: &str) -> Result<Barcode, SampleSheetError> {
        Ok(Barcode {
            i7: nonempty(i7, i7)?,
            i5: Some(nonempty(i5, i5)?),
            sep: Separator::Dash,
        })
    }

    /// A single-index barcode.
    pub fn single(i7: &str) -> Result<Barcode, SampleSheetError> {
        Ok(Barcode {
            i7: nonempty(i7, i7)?,
            i5: None,
            sep: Separator::Dash,
        })
    }

    /// Read `i7`, `i7-i5` or `i7+i5`. A `+` anywhere in the string selects
    /// the `+` separator.
    pub fn parse(sequence: &str) -> Result<Barcode, SampleSheetError> {
        let sequence = sequence.trim();
        let sep = if sequence.contains('+') {
            Separator::Plus
        } else {
            Separator::Dash
        };
        Self::parse_with(sequence, sep)
    }

    fn parse_with(sequence: &str, sep: Separator) -> Result<Barcode, SampleSheetError> {
        let parts: Vec<&str> = sequence.split(sep.as_char()).collect();
        match parts.as_slice() {
            [i7] => Ok(Barcode {
                i7: nonempty(i7, sequence)?,
                i5: None,
                sep,
            }),
            [i7, i5] => Ok(Barcode {
                i7: nonempty(i7, sequence)?,
                i5: Some(nonempty(i5, sequence)?),
                sep,
            }),
            _ => Err(SampleSheetError::InvalidBarcode {
                barcode: sequence.to_string(),
                reason: format!("expected at most one '{}' separator", sep.as_char()),
            }),
        }
    }

    pub fn with_separator(mut self, sep: Separator) -> Barcode {
        self.sep = sep;
        self
    }

    pub fn i7(&self) -> &DnaSeq {
        &self.i7
    }

    pub fn i5(&self) -> Option<&DnaSeq> {
        self.i5.as_ref()
    }

    pub fn separator(&self) -> Separator {
        self.sep
    }

    pub fn is_dual(&self) -> bool {
        self.i5.is_some()
    }

    /// The same barcode without its i5 part.
    pub fn i7_only(&self) -> Barcode {
        Barcode {
            i7: self.i7.clone(),
            i5: None,
            sep: self.sep,
        }
    }

    /// Transforms that give distinct orientations for this barcode. Only
    /// `none` and `i7` apply to a single-index barcode, the others coincide
    /// with them.
    pub fn methods(&self) -> &'static [RcMethod] {
        if self.is_dual() {
            &DUAL_INDEX_METHODS
        } else {
            &SINGLE_INDEX_METHODS
        }
    }

    pub fn reverse_complement(&self, method: RcMethod) -> Barcode {
        match method {
            RcMethod::None => self.clone(),
            RcMethod::I7 => Barcode {
                i7: self.i7.reverse_complement(),
                i5: self.i5.clone(),
                sep: self.sep,
            },
            RcMethod::I5 => Barcode {
                i7: self.i7.clone(),
                i5: self.i5.as_ref().map(DnaSeq::reverse_complement),
                sep: self.sep,
            },
            RcMethod::Both => Barcode {
                i7: self.i7.reverse_complement(),
                i5: self.i5.as_ref().map(DnaSeq::reverse_complement),
                sep: self.sep,
            },
            // Equivalent to reverse complementing the literal `i7 sep i5` text:
            // the separator is its own complement, so the reversed string reads
            // rc(i5), sep, rc(i7).
            RcMethod::Full => match self.i5 {
                Some(ref i5) => Barcode {
                    i7: i5.reverse_complement(),
                    i5: Some(self.i7.reverse_complement()),
                    sep: self.sep,
                },
                None => Barcode {
                    i7: self.i7.reverse_complement(),
                    i5: None,
                    sep: self.sep,
                },
            },
        }
    }
}

fn nonempty(part: &str, whole: &str) -> Result<DnaSeq, SampleSheetError> {
    let part = part.trim();
    if part.is_empty() {
        return Err(SampleSheetError::InvalidBarcode {
            barcode: whole.to_string(),
            reason: "empty index sequence".to_string(),
        });
    }
    DnaSeq::new(part.as_bytes())
}

impl FromStr for Barcode {
    type Err = SampleSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Barcode::parse(s)
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.i5 {
            Some(ref i5) => write!(f, "{}{}{}", self.i7, self.sep.as_char(), i5),
            None => write!(f, "{}", self.i7),
        }
    }
}

impl fmt::Debug for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Barcode({})", self)
    }
}

/// A transform of the candidate barcode that reproduces the known barcode.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BarcodeMatch {
    pub method: RcMethod,
    pub transformed: Barcode,
}

/// Check whether any orientation of `candidate` is textually identical to
/// `known`. Returns every matching transform in [`RcMethod::ALL`] order;
/// an empty vector means no orientation matched.
pub fn compare_barcodes(known: &Barcode, candidate: &Barcode) -> Vec<BarcodeMatch> {
    candidate
        .methods()
        .iter()
        .filter_map(|&method| {
            let transformed = candidate.reverse_complement(method);
            if transformed.to_string() == known.to_string() {
                Some(BarcodeMatch {
                    method,
                    transformed,
                })
            } else {
                None
            }
        })
        .collect()
}
