// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Validated container for a short DNA index sequence.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Index;
use std::str::{self, FromStr};

use crate::error::SampleSheetError;

const UPPER_ACGTN: &[u8; 5] = b"ACGTN";

/// Make sure that the input byte slice contains only "ACGTN" characters,
/// in either case. Returns an error describing the position of the first
/// character that is not an ACGTN.
pub fn ensure_acgtn(seq: &[u8]) -> Result<(), SampleSheetError> {
    for (i, &s) in seq.iter().enumerate() {
        if !UPPER_ACGTN.contains(&s.to_ascii_uppercase()) {
            return Err(SampleSheetError::InvalidSequence {
                sequence: String::from_utf8_lossy(seq).into_owned(),
                position: i,
                invalid: s as char,
            });
        }
    }
    Ok(())
}

/// An index (i7 or i5) adapter sequence.
/// A `DnaSeq` is guaranteed to contain only upper case "ACGTN" bases;
/// lower case input is accepted and normalised.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DnaSeq {
    sequence: Vec<u8>,
}

impl DnaSeq {
    /// Create a new DnaSeq from the given byte slice.
    pub fn new(seq: &[u8]) -> Result<DnaSeq, SampleSheetError> {
        ensure_acgtn(seq)?;
        Ok(DnaSeq {
            sequence: seq.to_ascii_uppercase(),
        })
    }

    /// Access the sequence data
    pub fn seq(&self) -> &[u8] {
        &self.sequence
    }

    pub fn as_str(&self) -> &str {
        // only ACGTN bytes are ever stored
        str::from_utf8(&self.sequence).unwrap_or_default()
    }

    /// The length of the sequence
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Watson-Crick reverse complement. N is its own complement.
    pub fn reverse_complement(&self) -> DnaSeq {
        DnaSeq {
            sequence: bio::alphabets::dna::revcomp(self.sequence.as_slice()),
        }
    }
}

impl FromStr for DnaSeq {
    type Err = SampleSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DnaSeq::new(s.as_bytes())
    }
}

impl Index<usize> for DnaSeq {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.sequence[index]
    }
}

impl AsRef<[u8]> for DnaSeq {
    fn as_ref(&self) -> &[u8] {
        self.seq()
    }
}

impl Borrow<[u8]> for DnaSeq {
    fn borrow(&self) -> &[u8] {
        self.seq()
    }
}

impl From<DnaSeq> for String {
    fn from(seq: DnaSeq) -> String {
        seq.as_str().to_string()
    }
}

impl fmt::Display for DnaSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for DnaSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self, f)
    }
}

impl Serialize for DnaSeq {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DnaSeq {
    fn deserialize<D>(deserializer: D) -> Result<DnaSeq, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(DnaSeqVisitor)
    }
}

struct DnaSeqVisitor;

impl<'de> Visitor<'de> for DnaSeqVisitor {
    type Value = DnaSeq;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("An [ACGTNacgtn]* string")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        DnaSeq::new(value.as_bytes()).map_err(E::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::{prop_assert_eq, proptest};

    #[test]
    fn test_lower_case_is_normalised() {
        let s = DnaSeq::new(b"acgtN").unwrap();
        assert_eq!(s.as_str(), "ACGTN");
        assert_eq!(s, "ACGTN".parse().unwrap());
    }

    #[test]
    fn test_invalid_base() {
        match DnaSeq::new(b"ACXT") {
            Err(SampleSheetError::InvalidSequence {
                position, invalid, ..
            }) => {
                assert_eq!(position, 2);
                assert_eq!(invalid, 'X');
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(DnaSeq::new(b"ACGT+ACGT").is_err());
    }

    #[test]
    fn test_reverse_complement() {
        let s = DnaSeq::new(b"AACGTN").unwrap();
        assert_eq!(s.reverse_complement().as_str(), "NACGTT");
        let s = DnaSeq::new(b"GATTACA").unwrap();
        assert_eq!(s.reverse_complement().as_str(), "TGTAATC");
    }

    #[test]
    fn test_serde_json() {
        let seq = DnaSeq::new(b"AGCTAGTCAGTCAGTA").unwrap();
        let json_str = serde_json::to_string(&seq).unwrap();
        assert_eq!(json_str, r#""AGCTAGTCAGTCAGTA""#);
        let bad: Result<DnaSeq, _> = serde_json::from_str(r#""AGCTZ""#);
        assert!(bad.is_err());
    }

    proptest! {
        #[test]
        fn prop_test_reverse_complement_involution(
            ref seq in "[ACGTN]{0, 24}",
        ) {
            let target = DnaSeq::new(seq.as_bytes()).unwrap();
            prop_assert_eq!(target.reverse_complement().reverse_complement(), target);
        }

        #[test]
        fn prop_test_serde_json_dna_seq(
            ref seq in "[ACGTNacgtn]{0, 24}",
        ) {
            let target = DnaSeq::new(seq.as_bytes()).unwrap();
            let encoded = serde_json::to_string_pretty(&target).unwrap();
            let decoded: DnaSeq = serde_json::from_str(&encoded).unwrap();
            prop_assert_eq!(target, decoded);
        }
    }
}
