// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Hamming distances between index sequences.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SampleSheetError;

/// Count the positions at which `u` and `v` differ. The inputs must be the
/// same length.
///
/// ```
/// use samplesheet_qc::hamming::hamming;
/// assert_eq!(hamming(b"GAGCCTACTAACGGGAT", b"CATCGTAATGACGGCCT").unwrap(), 7);
/// ```
pub fn hamming(u: &[u8], v: &[u8]) -> Result<u32, SampleSheetError> {
    if u.len() != v.len() {
        return Err(SampleSheetError::LengthMismatch {
            u: String::from_utf8_lossy(u).into_owned(),
            v: String::from_utf8_lossy(v).into_owned(),
        });
    }
    Ok(u.iter().zip(v.iter()).filter(|(a, b)| a != b).count() as u32)
}

/// Which side of a pair was reverse complemented before comparing.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Orientation {
    Forward,
    ReverseComplementU,
    ReverseComplementV,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Orientation::Forward => "none",
            Orientation::ReverseComplementU => "u",
            Orientation::ReverseComplementV => "v",
        };
        f.write_str(s)
    }
}

/// One pairwise comparison. `lane` is set when the comparison was restricted
/// to the samples of a single lane.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct HammingDistance {
    pub lane: Option<String>,
    pub u: String,
    pub v: String,
    pub distance: u32,
    pub orientation: Orientation,
}

/// Reverse complement of a literal index string. Separator characters
/// (`+`, `-`) stay in place relative to the reversed sequence.
pub fn reverse_complement_str(s: &str) -> String {
    String::from_utf8_lossy(&bio::alphabets::dna::revcomp(s.as_bytes())).into_owned()
}

/// Compare every unordered pair of `seqs`. Duplicated entries are compared
/// too and produce a distance of zero. With `reverse_complement` each pair is
/// additionally compared with either side reverse complemented.
///
/// When `skip_length_mismatch` is set, pairs of unequal length are left out
/// instead of aborting the whole computation.
pub fn pairwise_hamming_distance(
    seqs: &[String],
    lane: Option<&str>,
    reverse_complement: bool,
    skip_length_mismatch: bool,
) -> Result<Vec<HammingDistance>, SampleSheetError> {
    let mut d = Vec::new();

    for (u, v) in seqs.iter().tuple_combinations() {
        let mut comparisons = vec![(Orientation::Forward, u.clone(), v.clone())];
        if reverse_complement {
            comparisons.push((
                Orientation::ReverseComplementU,
                reverse_complement_str(u),
                v.clone(),
            ));
            comparisons.push((
                Orientation::ReverseComplementV,
                u.clone(),
                reverse_complement_str(v),
            ));
        }

        for (orientation, a, b) in comparisons {
            let distance = match hamming(a.as_bytes(), b.as_bytes()) {
                Ok(d) => d,
                Err(e @ SampleSheetError::LengthMismatch { .. }) => {
                    if skip_length_mismatch {
                        debug!("skipping comparison: {}", e);
                        break;
                    }
                    return Err(e);
                }
                Err(e) => return Err(e),
            };
            d.push(HammingDistance {
                lane: lane.map(str::to_string),
                u: u.clone(),
                v: v.clone(),
                distance,
                orientation,
            });
        }
    }

    Ok(d)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::{prop_assert_eq, proptest};

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_worked_example() {
        assert_eq!(
            hamming(b"GAGCCTACTAACGGGAT", b"CATCGTAATGACGGCCT").unwrap(),
            7
        );
    }

    #[test]
    fn test_length_mismatch() {
        match hamming(b"ACGT", b"ACG") {
            Err(SampleSheetError::LengthMismatch { u, v }) => {
                assert_eq!(u, "ACGT");
                assert_eq!(v, "ACG");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_pairwise_keeps_duplicates() {
        let seqs = strings(&["AAAA", "AAAA", "AAAT"]);
        let d = pairwise_hamming_distance(&seqs, None, false, false).unwrap();
        let distances: Vec<u32> = d.iter().map(|x| x.distance).collect();
        assert_eq!(distances, vec![0, 1, 1]);
    }

    #[test]
    fn test_pairwise_reverse_complement() {
        let seqs = strings(&["AACC", "GGTT"]);
        let d = pairwise_hamming_distance(&seqs, Some("1"), true, false).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(d[0].distance, 4);
        assert_eq!(d[1].orientation, Orientation::ReverseComplementU);
        assert_eq!(d[1].distance, 0);
        assert_eq!(d[2].distance, 0);
        assert_eq!(d[2].lane.as_deref(), Some("1"));
    }

    #[test]
    fn test_pairwise_length_mismatch() {
        let seqs = strings(&["AAAA", "AAAAAA", "AAAT"]);
        assert!(pairwise_hamming_distance(&seqs, None, false, false).is_err());

        let d = pairwise_hamming_distance(&seqs, None, false, true).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!((d[0].u.as_str(), d[0].v.as_str()), ("AAAA", "AAAT"));
    }

    proptest! {
        #[test]
        fn prop_test_hamming_symmetry(
            ref u in "[ACGTN]{12}",
            ref v in "[ACGTN]{12}",
        ) {
            prop_assert_eq!(
                hamming(u.as_bytes(), v.as_bytes()).unwrap(),
                hamming(v.as_bytes(), u.as_bytes()).unwrap()
            );
        }

        #[test]
        fn prop_test_hamming_identity(
            ref u in "[ACGTN]{0, 24}",
        ) {
            prop_assert_eq!(hamming(u.as_bytes(), u.as_bytes()).unwrap(), 0);
        }
    }
}
