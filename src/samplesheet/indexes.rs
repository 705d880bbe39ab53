// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Index-level operations over the sample table: duplicate detection,
//! duplicate merging, filtering by index value and pairwise Hamming
//! distances. Every operation reads the table and returns a new value.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use super::{LANE, SAMPLE_ID, SAMPLE_NAME, SAMPLE_PROJECT};
use crate::error::SampleSheetError;
use crate::hamming::{pairwise_hamming_distance, HammingDistance};
use crate::section::TableSection;

/// Project assigned to rows created by `merge_duplicate_indexes`.
pub const DUPLICATE_PROJECT: &str = "DUPLICATE_INDEXES";
const DUPLICATE_ID_PREFIX: &str = "DUPLICATE_INDEX";

/// Names of the i7 and i5 columns of a sample table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexColumns {
    pub index1: &'static str,
    pub index2: &'static str,
}

impl IndexColumns {
    pub const V1: IndexColumns = IndexColumns {
        index1: "index",
        index2: "index2",
    };
    pub const V2: IndexColumns = IndexColumns {
        index1: "Index",
        index2: "Index2",
    };
}

/// Which index values to compare in `hamming_distances`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One `index+index2` string per sample, duplicates kept.
    Whole,
    /// The distinct set of every i7 and i5 sequence on its own.
    Sides,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HammingOptions {
    pub granularity: Granularity,
    /// Only compare samples sharing a lane, when a `Lane` column exists.
    pub use_lane: bool,
    pub reverse_complement: bool,
    pub skip_length_mismatch: bool,
}

impl Default for HammingOptions {
    fn default() -> Self {
        HammingOptions {
            granularity: Granularity::Whole,
            use_lane: true,
            reverse_complement: false,
            skip_length_mismatch: false,
        }
    }
}

/// Smallest Hamming distance that keeps two indexes apart when the
/// demultiplexer tolerates `barcode_mismatches` mismatches.
pub fn min_hamming_distance(barcode_mismatches: u32) -> u32 {
    barcode_mismatches + 1
}

/// How the synthetic row of a merged duplicate group fills columns that are
/// not part of the group key and not rewritten by the merge.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergeFieldPolicy {
    /// Take the value of the first row of the group, in table order.
    FirstRow,
    /// Every row of the group must hold the same value.
    RequireAgreement,
    /// Leave the column blank.
    Blank,
}

const MERGE_FIELD_POLICY_NAMES: &[&str] = &["first", "agree", "blank"];

impl FromStr for MergeFieldPolicy {
    type Err = SampleSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" | "first_row" => Ok(MergeFieldPolicy::FirstRow),
            "agree" | "require_agreement" => Ok(MergeFieldPolicy::RequireAgreement),
            "blank" => Ok(MergeFieldPolicy::Blank),
            _ => Err(SampleSheetError::UnknownOption {
                kind: "merge field policy",
                value: s.to_string(),
                allowed: MERGE_FIELD_POLICY_NAMES,
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    pub use_lane: bool,
    /// Replace the duplicate rows by the merged row instead of appending it.
    pub drop: bool,
    pub fields: MergeFieldPolicy,
}

impl MergeOptions {
    pub fn new(fields: MergeFieldPolicy) -> Self {
        MergeOptions {
            use_lane: true,
            drop: true,
            fields,
        }
    }
}

/// Index columns consulted by `filter_sample_indexes`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexSelection {
    Both,
    Index1,
    Index2,
}

const INDEX_SELECTION_NAMES: &[&str] = &["both", "index1", "index2"];

impl FromStr for IndexSelection {
    type Err = SampleSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" => Ok(IndexSelection::Both),
            "index1" => Ok(IndexSelection::Index1),
            "index2" => Ok(IndexSelection::Index2),
            _ => Err(SampleSheetError::UnknownOption {
                kind: "index selection",
                value: s.to_string(),
                allowed: INDEX_SELECTION_NAMES,
            }),
        }
    }
}

/// Lanes order numerically; anything that is not a number sorts last.
pub(crate) fn lane_key(lane: &str) -> (u32, String) {
    (lane.parse().unwrap_or(u32::MAX), lane.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct GroupKey {
    lane: Option<(u32, String)>,
    index1: String,
    index2: Option<String>,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((_, ref lane)) = self.lane {
            write!(f, "lane {} ", lane)?;
        }
        match self.index2 {
            Some(ref index2) => write!(f, "{}+{}", self.index1, index2),
            None => write!(f, "{}", self.index1),
        }
    }
}

/// Positions of the grouping columns in a particular table.
struct KeyColumns {
    lane: Option<usize>,
    index1: usize,
    index2: Option<usize>,
}

impl KeyColumns {
    fn resolve(
        table: &TableSection,
        cols: IndexColumns,
        use_lane: bool,
    ) -> Result<Self, SampleSheetError> {
        Ok(KeyColumns {
            lane: if use_lane {
                table.column_index(LANE)
            } else {
                None
            },
            index1: table.require_column(cols.index1)?,
            index2: table.column_index(cols.index2),
        })
    }

    fn key(&self, row: &[String]) -> GroupKey {
        GroupKey {
            lane: self.lane.map(|c| lane_key(&row[c])),
            index1: row[self.index1].clone(),
            index2: self.index2.map(|c| row[c].clone()),
        }
    }

    /// Row numbers per key, in key order; rows keep table order inside a group.
    fn groups(&self, table: &TableSection) -> BTreeMap<GroupKey, Vec<usize>> {
        let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
        for (i, row) in table.rows().iter().enumerate() {
            groups.entry(self.key(row)).or_default().push(i);
        }
        groups
    }
}

/// All rows whose `(Lane, index, index2)` is shared with another row, sorted
/// by that key. `Lane` takes part only with `use_lane` and when the column
/// exists; `index2` only when the column exists.
pub fn duplicate_indexes(
    table: &TableSection,
    cols: IndexColumns,
    use_lane: bool,
) -> Result<TableSection, SampleSheetError> {
    let keys = KeyColumns::resolve(table, cols, use_lane)?;
    let rows: Vec<usize> = keys
        .groups(table)
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .flat_map(|(_, rows)| rows)
        .collect();
    Ok(table.select_rows(&rows))
}

/// Replace every group of rows sharing `(Lane, index, index2)` with a
/// single synthetic row.
pub fn merge_duplicate_indexes(
    table: &TableSection,
    cols: IndexColumns,
    opts: &MergeOptions,
) -> Result<TableSection, SampleSheetError> {
    let keys = KeyColumns::resolve(table, cols, opts.use_lane)?;
    let groups = keys.groups(table);
    let dupes: Vec<(&GroupKey, &Vec<usize>)> =
        groups.iter().filter(|(_, rows)| rows.len() > 1).collect();

    if dupes.is_empty() {
        warn!("found 0 duplicate indexes in [{}], nothing to merge", table.name());
        return Ok(table.clone());
    }

    let mut merged = Vec::with_capacity(dupes.len());
    for (key, rows) in &dupes {
        merged.push((rows[0], merged_row(table, &keys, key, rows, opts.fields)?));
    }
    info!(
        "merging {} duplicate index group(s) covering {} rows",
        merged.len(),
        dupes.iter().map(|(_, rows)| rows.len()).sum::<usize>()
    );

    let mut out = TableSection::new(table.name(), table.columns().to_vec());
    if opts.drop {
        let grouped: HashSet<usize> = dupes.iter().flat_map(|(_, rows)| rows.iter().copied()).collect();
        let mut by_first: HashMap<usize, Vec<String>> = merged.into_iter().collect();
        for (i, row) in table.rows().iter().enumerate() {
            if let Some(new) = by_first.remove(&i) {
                out.push_row(new);
            } else if !grouped.contains(&i) {
                out.push_row(row.clone());
            }
        }
    } else {
        for row in table.rows() {
            out.push_row(row.clone());
        }
        for (_, row) in merged {
            out.push_row(row);
        }
    }
    Ok(out)
}

fn merged_row(
    table: &TableSection,
    keys: &KeyColumns,
    key: &GroupKey,
    rows: &[usize],
    policy: MergeFieldPolicy,
) -> Result<Vec<String>, SampleSheetError> {
    let synthetic_id = match key.index2 {
        Some(ref index2) => format!("{}_{}_{}", DUPLICATE_ID_PREFIX, key.index1, index2),
        None => format!("{}_{}", DUPLICATE_ID_PREFIX, key.index1),
    };
    let first = &table.rows()[rows[0]];

    let mut row = Vec::with_capacity(table.columns().len());
    for (c, column) in table.columns().iter().enumerate() {
        let value = if column == SAMPLE_ID || column == SAMPLE_NAME {
            synthetic_id.clone()
        } else if column == SAMPLE_PROJECT {
            DUPLICATE_PROJECT.to_string()
        } else if c == keys.index1 || Some(c) == keys.index2 || Some(c) == keys.lane {
            first[c].clone()
        } else {
            match policy {
                MergeFieldPolicy::FirstRow => first[c].clone(),
                MergeFieldPolicy::Blank => String::new(),
                MergeFieldPolicy::RequireAgreement => {
                    let values: Vec<&str> = rows
                        .iter()
                        .map(|&r| table.rows()[r][c].as_str())
                        .unique()
                        .collect();
                    if values.len() > 1 {
                        return Err(SampleSheetError::ConflictingMergeFields {
                            key: key.to_string(),
                            column: column.clone(),
                            values: values.into_iter().map(str::to_string).collect(),
                        });
                    }
                    first[c].clone()
                }
            }
        };
        row.push(value);
    }
    Ok(row)
}

/// Rows whose index columns hold any of `values`. Asking for `Both` on a
/// table without an index2 column falls back to the i7 column with a warning;
/// asking for `Index2` there is an error.
pub fn filter_sample_indexes<S: AsRef<str>>(
    table: &TableSection,
    cols: IndexColumns,
    values: &[S],
    which: IndexSelection,
) -> Result<TableSection, SampleSheetError> {
    let wanted: HashSet<&str> = values.iter().map(AsRef::as_ref).collect();
    let index1 = table.require_column(cols.index1)?;

    let check = match which {
        IndexSelection::Both => match table.column_index(cols.index2) {
            Some(index2) => vec![index1, index2],
            None => {
                warn!(
                    "no '{}' column in [{}], filtering by '{}' only",
                    cols.index2,
                    table.name(),
                    cols.index1
                );
                vec![index1]
            }
        },
        IndexSelection::Index1 => vec![index1],
        IndexSelection::Index2 => vec![table.require_column(cols.index2)?],
    };

    Ok(table.filter_rows(|row| check.iter().any(|&c| wanted.contains(row[c].as_str()))))
}

/// Pairwise distances between the indexes of the table, sorted by distance.
/// Identical barcodes are compared too, so duplicates show up as distance 0
/// unless `Granularity::Sides` asks for set semantics.
pub fn hamming_distances(
    table: &TableSection,
    cols: IndexColumns,
    opts: &HammingOptions,
) -> Result<Vec<HammingDistance>, SampleSheetError> {
    let keys = KeyColumns::resolve(table, cols, opts.use_lane)?;

    let mut lanes: BTreeMap<Option<(u32, String)>, Vec<&[String]>> = BTreeMap::new();
    for row in table.rows() {
        lanes
            .entry(keys.lane.map(|c| lane_key(&row[c])))
            .or_default()
            .push(row);
    }

    let mut d = Vec::new();
    for (lane, rows) in lanes {
        let seqs: Vec<String> = match opts.granularity {
            Granularity::Whole => rows
                .iter()
                .map(|row| match keys.index2 {
                    Some(c) => format!("{}+{}", row[keys.index1], row[c]),
                    None => row[keys.index1].clone(),
                })
                .sorted()
                .collect(),
            Granularity::Sides => rows
                .iter()
                .flat_map(|row| {
                    std::iter::once(row[keys.index1].clone())
                        .chain(keys.index2.map(|c| row[c].clone()))
                })
                .filter(|s| !s.is_empty())
                .unique()
                .sorted()
                .collect(),
        };
        let lane = lane.as_ref().map(|(_, name)| name.as_str());
        d.extend(pairwise_hamming_distance(
            &seqs,
            lane,
            opts.reverse_complement,
            opts.skip_length_mismatch,
        )?);
    }

    d.sort_by_key(|x| x.distance);
    Ok(d)
}

/// Fail with every pair closer than `min`.
pub fn verify_hamming_distance(
    table: &TableSection,
    cols: IndexColumns,
    opts: &HammingOptions,
    min: u32,
) -> Result<(), SampleSheetError> {
    let pairs: Vec<HammingDistance> = hamming_distances(table, cols, opts)?
        .into_iter()
        .filter(|d| d.distance < min)
        .collect();
    if pairs.is_empty() {
        Ok(())
    } else {
        Err(SampleSheetError::InsufficientHammingDistance { min, pairs })
    }
}
