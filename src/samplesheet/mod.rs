// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Illumina sample sheets, in the IEM (v1) and BCL Convert (v2) layouts.
//!
//! A sheet is read once from text into typed sections. Checks such as
//! `verify_sample_id` only run when asked for, and the transforms
//! (`merge_duplicate_indexes`, `set_project_suffix`, ...) consume the sheet
//! and hand back the updated one:
//!
//! ```
//! use samplesheet_qc::samplesheet::{MergeFieldPolicy, MergeOptions, SampleSheet};
//!
//! let text = "[Data]\nSample_ID,Sample_Project,index\nA,P1,ACGT\nB,P1,ACGT\n";
//! let sheet = SampleSheet::parse(text).unwrap();
//! assert_eq!(sheet.duplicate_indexes(true).unwrap().len(), 2);
//!
//! let sheet = sheet
//!     .merge_duplicate_indexes(&MergeOptions::new(MergeFieldPolicy::FirstRow))
//!     .unwrap();
//! assert!(sheet.duplicate_indexes(true).unwrap().is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SampleSheetError;
use crate::hamming::HammingDistance;
use crate::section::{tokenize, DictSection, ListSection, RawSections, TableSection};

pub mod indexes;
pub mod settings;

pub use self::indexes::{
    min_hamming_distance, Granularity, HammingOptions, IndexColumns, IndexSelection,
    MergeFieldPolicy, MergeOptions, DUPLICATE_PROJECT,
};
pub use self::settings::{
    BarcodeMismatches, BclConvertSettings, ConversionSettings, FastqCompressionFormat, Settings,
};

pub const HEADER: &str = "Header";
pub const READS: &str = "Reads";
pub const SETTINGS: &str = "Settings";
pub const DATA: &str = "Data";
pub const BCLCONVERT_SETTINGS: &str = "BCLConvert_Settings";
pub const BCLCONVERT_DATA: &str = "BCLConvert_Data";
pub const CLOUD_SETTINGS: &str = "Cloud_Settings";
pub const CLOUD_DATA: &str = "Cloud_Data";

pub const LANE: &str = "Lane";
pub const SAMPLE_ID: &str = "Sample_ID";
pub const SAMPLE_NAME: &str = "Sample_Name";
pub const SAMPLE_PROJECT: &str = "Sample_Project";
pub const PROJECT_NAME: &str = "ProjectName";
pub const FILE_FORMAT_VERSION: &str = "FileFormatVersion";

/// Project names the demultiplexer reserves for itself.
pub const RESERVED_PROJECTS: &[&str] = &["all", "default"];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SampleSheetFormat {
    V1,
    V2,
}

impl fmt::Display for SampleSheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SampleSheetFormat::V1 => "v1",
            SampleSheetFormat::V2 => "v2",
        })
    }
}

impl FromStr for SampleSheetFormat {
    type Err = SampleSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" | "1" => Ok(SampleSheetFormat::V1),
            "v2" | "2" => Ok(SampleSheetFormat::V2),
            _ => Err(SampleSheetError::UnknownOption {
                kind: "sample sheet format",
                value: s.to_string(),
                allowed: &["v1", "v2"],
            }),
        }
    }
}

/// Format to decode a sheet as.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatHint {
    #[default]
    Infer,
    V1,
    V2,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    pub format: FormatHint,
    /// Drop table columns that are blank in every row.
    pub drop_blank_columns: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            format: FormatHint::Infer,
            drop_blank_columns: true,
        }
    }
}

/// Decide the layout from the section headers, empty sections included.
/// BCL Convert sections, or a `FileFormatVersion` of 2 or more, mean v2; any
/// of the IEM sections mean v1.
pub fn infer_format(raw: &RawSections) -> Result<SampleSheetFormat, SampleSheetError> {
    if raw.declared(BCLCONVERT_SETTINGS) || raw.declared(BCLCONVERT_DATA) {
        return Ok(SampleSheetFormat::V2);
    }

    let version = raw
        .get(HEADER)
        .and_then(|lines| DictSection::parse(HEADER, lines).ok())
        .and_then(|header| header.get(FILE_FORMAT_VERSION).and_then(|v| v.parse::<u32>().ok()));
    if version.map_or(false, |v| v >= 2) {
        return Ok(SampleSheetFormat::V2);
    }

    if [HEADER, READS, SETTINGS, DATA].iter().any(|s| raw.declared(s)) {
        return Ok(SampleSheetFormat::V1);
    }

    Err(SampleSheetError::UnknownFormatVersion {
        sections: raw.declared_names().to_vec(),
    })
}

/// Sections other than the known ones, kept as raw lines.
fn other_sections(raw: RawSections) -> Vec<ListSection> {
    raw.into_iter()
        .map(|(name, lines)| ListSection::new(name, lines))
        .collect()
}

/// IEM-style sample sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleSheetV1 {
    pub path: Option<PathBuf>,
    pub header: DictSection,
    pub reads: ListSection,
    pub settings: Settings,
    pub data: TableSection,
    pub other: Vec<ListSection>,
}

impl Default for SampleSheetV1 {
    fn default() -> Self {
        SampleSheetV1 {
            path: None,
            header: DictSection::new(HEADER),
            reads: ListSection::new(READS, Vec::new()),
            settings: Settings::default(),
            data: TableSection::new(DATA, Vec::new()),
            other: Vec::new(),
        }
    }
}

impl SampleSheetV1 {
    fn from_sections(mut raw: RawSections, opts: &ParseOptions) -> Result<Self, SampleSheetError> {
        Ok(SampleSheetV1 {
            path: None,
            header: DictSection::parse(HEADER, &raw.take(HEADER))?,
            reads: ListSection::parse(READS, &raw.take(READS)),
            settings: DictSection::parse(SETTINGS, &raw.take(SETTINGS))?.into(),
            data: TableSection::parse(DATA, &raw.take(DATA), opts.drop_blank_columns)?,
            other: other_sections(raw),
        })
    }
}

impl fmt::Display for SampleSheetV1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", self.header, self.reads, self.settings, self.data)?;
        for section in &self.other {
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}

/// BCL Convert sample sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleSheetV2 {
    pub path: Option<PathBuf>,
    pub header: DictSection,
    pub reads: DictSection,
    pub bclconvert_settings: BclConvertSettings,
    pub bclconvert_data: TableSection,
    pub cloud_settings: DictSection,
    pub cloud_data: TableSection,
    pub other: Vec<ListSection>,
}

impl Default for SampleSheetV2 {
    fn default() -> Self {
        let mut header = DictSection::new(HEADER);
        header.insert(FILE_FORMAT_VERSION, "2");
        SampleSheetV2 {
            path: None,
            header,
            reads: DictSection::new(READS),
            bclconvert_settings: BclConvertSettings::default(),
            bclconvert_data: TableSection::new(BCLCONVERT_DATA, Vec::new()),
            cloud_settings: DictSection::new(CLOUD_SETTINGS),
            cloud_data: TableSection::new(CLOUD_DATA, Vec::new()),
            other: Vec::new(),
        }
    }
}

impl SampleSheetV2 {
    fn from_sections(mut raw: RawSections, opts: &ParseOptions) -> Result<Self, SampleSheetError> {
        let drop = opts.drop_blank_columns;
        Ok(SampleSheetV2 {
            path: None,
            header: DictSection::parse(HEADER, &raw.take(HEADER))?,
            reads: DictSection::parse(READS, &raw.take(READS))?,
            bclconvert_settings: DictSection::parse(BCLCONVERT_SETTINGS, &raw.take(BCLCONVERT_SETTINGS))?
                .into(),
            bclconvert_data: TableSection::parse(BCLCONVERT_DATA, &raw.take(BCLCONVERT_DATA), drop)?,
            cloud_settings: DictSection::parse(CLOUD_SETTINGS, &raw.take(CLOUD_SETTINGS))?,
            cloud_data: TableSection::parse(CLOUD_DATA, &raw.take(CLOUD_DATA), drop)?,
            other: other_sections(raw),
        })
    }

    /// The `[BCLConvert_Settings]` section.
    pub fn settings(&self) -> &BclConvertSettings {
        &self.bclconvert_settings
    }

    pub fn settings_mut(&mut self) -> &mut BclConvertSettings {
        &mut self.bclconvert_settings
    }

    /// The `[BCLConvert_Data]` section.
    pub fn data(&self) -> &TableSection {
        &self.bclconvert_data
    }

    /// Fill `Sample_Project` of `[BCLConvert_Data]` from the `ProjectName`
    /// recorded for the same `Sample_ID` in `[Cloud_Data]`. The column is
    /// added when missing; samples without a cloud entry get a blank project.
    pub fn projectname_to_sampleproject(mut self) -> Result<Self, SampleSheetError> {
        let ids = self.cloud_data.column_values(SAMPLE_ID)?;
        let names = self.cloud_data.column_values(PROJECT_NAME)?;
        let mapper: HashMap<String, String> = ids
            .into_iter()
            .zip(names)
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        self.bclconvert_data = self
            .bclconvert_data
            .map_column(SAMPLE_ID, SAMPLE_PROJECT, &mapper)?;
        Ok(self)
    }
}

impl fmt::Display for SampleSheetV2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}",
            self.header,
            self.reads,
            self.bclconvert_settings,
            self.bclconvert_data,
            self.cloud_settings,
            self.cloud_data
        )?;
        for section in &self.other {
            write!(f, "{}", section)?;
        }
        Ok(())
    }
}

/// Summary of a sheet, as printed by `samplesheet-qc info`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SampleSheetInfo {
    #[serde(flatten)]
    pub header: BTreeMap<String, String>,
    pub projects: Vec<String>,
    pub is_split_lane: bool,
    pub samplesheet_format: SampleSheetFormat,
    pub samplesheet_version: u32,
    pub samplesheet_path: Option<PathBuf>,
    pub samplesheet_filename: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SampleSheet {
    V1(SampleSheetV1),
    V2(SampleSheetV2),
}

impl SampleSheet {
    /// A sheet with every known section present and empty.
    pub fn empty(format: SampleSheetFormat) -> SampleSheet {
        match format {
            SampleSheetFormat::V1 => SampleSheet::V1(SampleSheetV1::default()),
            SampleSheetFormat::V2 => SampleSheet::V2(SampleSheetV2::default()),
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<SampleSheet, SampleSheetError> {
        SampleSheet::read_with(path, &ParseOptions::default())
    }

    pub fn read_with(
        path: impl AsRef<Path>,
        opts: &ParseOptions,
    ) -> Result<SampleSheet, SampleSheetError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SampleSheetError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut sheet = SampleSheet::parse_with(&text, opts)?;
        match sheet {
            SampleSheet::V1(ref mut s) => s.path = Some(path.to_path_buf()),
            SampleSheet::V2(ref mut s) => s.path = Some(path.to_path_buf()),
        }
        Ok(sheet)
    }

    pub fn parse(text: &str) -> Result<SampleSheet, SampleSheetError> {
        SampleSheet::parse_with(text, &ParseOptions::default())
    }

    pub fn parse_with(text: &str, opts: &ParseOptions) -> Result<SampleSheet, SampleSheetError> {
        let raw = tokenize(text);
        let format = match opts.format {
            FormatHint::Infer => infer_format(&raw)?,
            FormatHint::V1 => SampleSheetFormat::V1,
            FormatHint::V2 => SampleSheetFormat::V2,
        };
        debug!("decoding sample sheet as {} (sections: {:?})", format, raw.names());
        Ok(match format {
            SampleSheetFormat::V1 => SampleSheet::V1(SampleSheetV1::from_sections(raw, opts)?),
            SampleSheetFormat::V2 => SampleSheet::V2(SampleSheetV2::from_sections(raw, opts)?),
        })
    }

    pub fn format(&self) -> SampleSheetFormat {
        match self {
            SampleSheet::V1(_) => SampleSheetFormat::V1,
            SampleSheet::V2(_) => SampleSheetFormat::V2,
        }
    }

    /// File the sheet was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SampleSheet::V1(s) => s.path.as_deref(),
            SampleSheet::V2(s) => s.path.as_deref(),
        }
    }

    pub fn header(&self) -> &DictSection {
        match self {
            SampleSheet::V1(s) => &s.header,
            SampleSheet::V2(s) => &s.header,
        }
    }

    /// The sample table: `[Data]` or `[BCLConvert_Data]`.
    pub fn data(&self) -> &TableSection {
        match self {
            SampleSheet::V1(s) => &s.data,
            SampleSheet::V2(s) => s.data(),
        }
    }

    fn with_data(self, data: TableSection) -> SampleSheet {
        match self {
            SampleSheet::V1(s) => SampleSheet::V1(SampleSheetV1 { data, ..s }),
            SampleSheet::V2(s) => SampleSheet::V2(SampleSheetV2 {
                bclconvert_data: data,
                ..s
            }),
        }
    }

    pub fn settings(&self) -> &dyn ConversionSettings {
        match self {
            SampleSheet::V1(s) => &s.settings,
            SampleSheet::V2(s) => s.settings(),
        }
    }

    pub fn settings_mut(&mut self) -> &mut dyn ConversionSettings {
        match self {
            SampleSheet::V1(s) => &mut s.settings,
            SampleSheet::V2(s) => s.settings_mut(),
        }
    }

    pub fn index_columns(&self) -> IndexColumns {
        match self {
            SampleSheet::V1(_) => IndexColumns::V1,
            SampleSheet::V2(_) => IndexColumns::V2,
        }
    }

    pub fn has_index2(&self) -> bool {
        self.data().has_column(self.index_columns().index2)
    }

    /// `FileFormatVersion` from the header; 1 when absent.
    pub fn file_format_version(&self) -> Result<u32, SampleSheetError> {
        match self.header().get(FILE_FORMAT_VERSION) {
            None | Some("") => Ok(1),
            Some(v) => v.parse().map_err(|_| SampleSheetError::InvalidSetting {
                key: FILE_FORMAT_VERSION,
                value: v.to_string(),
                expected: "an integer",
            }),
        }
    }

    /// Every table column that holds project names.
    fn project_columns(&self) -> Vec<(&TableSection, &'static str)> {
        let candidates: Vec<(&TableSection, &'static str)> = match self {
            SampleSheet::V1(s) => vec![(&s.data, SAMPLE_PROJECT)],
            SampleSheet::V2(s) => vec![
                (&s.bclconvert_data, SAMPLE_PROJECT),
                (&s.cloud_data, PROJECT_NAME),
            ],
        };
        candidates
            .into_iter()
            .filter(|(table, column)| table.has_column(column))
            .collect()
    }

    /// Sorted distinct project names, ignoring blanks. A v2 sheet without
    /// `Sample_Project` reads the `ProjectName` column of `[Cloud_Data]`.
    pub fn projects(&self) -> Vec<String> {
        match self.project_columns().first() {
            Some((table, column)) => table
                .column_values(column)
                .unwrap_or_default()
                .into_iter()
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<String>>()
                .into_iter()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn is_split_lane(&self) -> bool {
        self.projects().len() > 1
    }

    pub fn info(&self) -> Result<SampleSheetInfo, SampleSheetError> {
        let path = self
            .path()
            .map(|p| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf()));
        Ok(SampleSheetInfo {
            header: self
                .header()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            projects: self.projects(),
            is_split_lane: self.is_split_lane(),
            samplesheet_format: self.format(),
            samplesheet_version: self.file_format_version()?,
            samplesheet_filename: self
                .path()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned()),
            samplesheet_path: path,
        })
    }

    /// Fail when a `Sample_ID` occurs on more than one row.
    pub fn verify_sample_id(&self) -> Result<(), SampleSheetError> {
        let data = self.data();
        let ids = data.column_values(SAMPLE_ID)?;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for id in &ids {
            *counts.entry(*id).or_default() += 1;
        }

        let mut dupe_ids = Vec::new();
        let mut rows = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            if counts[id] > 1 {
                rows.push(i);
                if !dupe_ids.contains(id) {
                    dupe_ids.push(*id);
                }
            }
        }

        if rows.is_empty() {
            Ok(())
        } else {
            Err(SampleSheetError::DuplicateSampleId {
                ids: dupe_ids.into_iter().map(str::to_string).collect(),
                rows,
            })
        }
    }

    /// Fail when a project column holds one of `RESERVED_PROJECTS`.
    pub fn verify_sample_project(&self) -> Result<(), SampleSheetError> {
        for (table, column) in self.project_columns() {
            let mut bad: Vec<String> = Vec::new();
            for p in table.column_values(column)? {
                if RESERVED_PROJECTS.contains(&p) && !bad.iter().any(|b| b == p) {
                    bad.push(p.to_string());
                }
            }
            if !bad.is_empty() {
                return Err(SampleSheetError::IllegalProjectName {
                    column: column.to_string(),
                    projects: bad,
                });
            }
        }
        Ok(())
    }

    pub fn duplicate_indexes(&self, use_lane: bool) -> Result<TableSection, SampleSheetError> {
        indexes::duplicate_indexes(self.data(), self.index_columns(), use_lane)
    }

    pub fn hamming_distances(
        &self,
        opts: &HammingOptions,
    ) -> Result<Vec<HammingDistance>, SampleSheetError> {
        indexes::hamming_distances(self.data(), self.index_columns(), opts)
    }

    pub fn verify_hamming_distance(
        &self,
        opts: &HammingOptions,
        min: u32,
    ) -> Result<(), SampleSheetError> {
        indexes::verify_hamming_distance(self.data(), self.index_columns(), opts, min)
    }

    pub fn filter_sample_indexes<S: AsRef<str>>(
        &self,
        values: &[S],
        which: IndexSelection,
    ) -> Result<TableSection, SampleSheetError> {
        indexes::filter_sample_indexes(self.data(), self.index_columns(), values, which)
    }

    pub fn merge_duplicate_indexes(self, opts: &MergeOptions) -> Result<SampleSheet, SampleSheetError> {
        let data = indexes::merge_duplicate_indexes(self.data(), self.index_columns(), opts)?;
        Ok(self.with_data(data))
    }

    /// Append `_{suffix}` to every project name, in every column that holds
    /// project names.
    pub fn set_project_suffix(self, suffix: &str) -> Result<SampleSheet, SampleSheetError> {
        let mapper = {
            let columns = self.project_columns();
            if columns.is_empty() {
                return Err(SampleSheetError::MissingColumn {
                    section: self.data().name().to_string(),
                    column: SAMPLE_PROJECT.to_string(),
                });
            }
            let mut mapper = HashMap::new();
            for (table, column) in &columns {
                for p in table.column_values(column)? {
                    if !p.is_empty() {
                        mapper.insert(p.to_string(), format!("{}_{}", p, suffix));
                    }
                }
            }
            mapper
        };

        Ok(match self {
            SampleSheet::V1(mut s) => {
                s.data = s.data.rename_values(SAMPLE_PROJECT, &mapper)?;
                SampleSheet::V1(s)
            }
            SampleSheet::V2(mut s) => {
                if s.bclconvert_data.has_column(SAMPLE_PROJECT) {
                    s.bclconvert_data = s.bclconvert_data.rename_values(SAMPLE_PROJECT, &mapper)?;
                }
                if s.cloud_data.has_column(PROJECT_NAME) {
                    s.cloud_data = s.cloud_data.rename_values(PROJECT_NAME, &mapper)?;
                }
                SampleSheet::V2(s)
            }
        })
    }

    /// Serialized text of the sheet, section by section. Parsing it with
    /// `ParseOptions { drop_blank_columns: false, .. }` gives the same sheet
    /// back, as long as no data row is blank in every column. The default
    /// options drop named columns that are blank in every row.
    pub fn to_csv(&self) -> String {
        self.to_string()
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), SampleSheetError> {
        let path = path.as_ref();
        fs::write(path, self.to_csv()).map_err(|source| SampleSheetError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Display for SampleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleSheet::V1(s) => fmt::Display::fmt(s, f),
            SampleSheet::V2(s) => fmt::Display::fmt(s, f),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use file_diff::diff_files;
    use pretty_assertions::assert_eq;
    use proptest::collection::vec;
    use proptest::{prop_assert_eq, proptest};
    use std::fs::File;

    const V1_SHEET: &str = "test/samplesheet/v1.csv";
    const V2_SHEET: &str = "test/samplesheet/v2.csv";
    const V2_SINGLE_INDEX: &str = "test/samplesheet/v2_single_index.csv";
    const V1_DUPLICATES: &str = "test/samplesheet/v1_duplicates.csv";

    #[test]
    fn test_read_v1() {
        let sheet = SampleSheet::read(V1_SHEET).unwrap();
        assert_eq!(sheet.format(), SampleSheetFormat::V1);
        assert_eq!(sheet.header().get("Experiment Name"), Some("Run42"));
        assert_eq!(sheet.file_format_version().unwrap(), 1);
        assert_eq!(sheet.index_columns(), IndexColumns::V1);
        assert!(sheet.has_index2());
        assert_eq!(sheet.data().len(), 4);
        assert_eq!(sheet.projects(), vec!["ProjectA", "ProjectB"]);
        assert!(sheet.is_split_lane());
        assert_eq!(sheet.settings().create_fastq_for_index_reads().unwrap(), Some(true));
        match sheet {
            SampleSheet::V1(ref s) => {
                assert_eq!(s.reads.items(), &["151".to_string(), "151".to_string()][..]);
                // Description is blank on every row
                assert!(!s.data.has_column("Description"));
            }
            _ => panic!("expected a v1 sheet"),
        }
    }

    #[test]
    fn test_read_v2() {
        let sheet = SampleSheet::read(V2_SHEET).unwrap();
        assert_eq!(sheet.format(), SampleSheetFormat::V2);
        assert_eq!(sheet.file_format_version().unwrap(), 2);
        assert_eq!(sheet.index_columns(), IndexColumns::V2);
        assert_eq!(sheet.data().name(), BCLCONVERT_DATA);
        assert_eq!(sheet.data().len(), 3);
        // no Sample_Project column: projects come from Cloud_Data
        assert_eq!(sheet.projects(), vec!["ProjectX"]);
        assert!(!sheet.is_split_lane());
        match sheet {
            SampleSheet::V2(ref s) => {
                assert_eq!(s.reads.get("Read1Cycles"), Some("151"));
                assert_eq!(s.settings().software_version(), Some("4.2.7"));
                assert_eq!(
                    s.settings().barcode_mismatches_index1().unwrap(),
                    Some(BarcodeMismatches::One)
                );
                assert_eq!(s.cloud_settings.get("GeneratedVersion"), Some("3.9.14"));
                assert_eq!(s.other.len(), 1);
                assert_eq!(s.other[0].name(), "Custom_Notes");
            }
            _ => panic!("expected a v2 sheet"),
        }
    }

    #[test]
    fn test_format_inference() {
        assert_eq!(
            SampleSheet::parse("[BCLConvert_Data]\nSample_ID,Index\nA,ACGT\n").unwrap().format(),
            SampleSheetFormat::V2
        );
        assert_eq!(
            SampleSheet::parse("[Header]\nFileFormatVersion,2\n").unwrap().format(),
            SampleSheetFormat::V2
        );
        assert_eq!(
            SampleSheet::parse("[Reads]\n151\n").unwrap().format(),
            SampleSheetFormat::V1
        );
        match SampleSheet::parse("[Foo]\nbar\n[Baz]\nqux\n") {
            Err(SampleSheetError::UnknownFormatVersion { sections }) => {
                assert_eq!(sections, vec!["Foo", "Baz"]);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            SampleSheet::parse(""),
            Err(SampleSheetError::UnknownFormatVersion { .. })
        ));

        let forced = ParseOptions {
            format: FormatHint::V2,
            ..ParseOptions::default()
        };
        let sheet = SampleSheet::parse_with("[Foo]\nbar\n", &forced).unwrap();
        assert_eq!(sheet.format(), SampleSheetFormat::V2);
        assert!(sheet.data().is_empty());
    }

    #[test]
    fn test_malformed_header_aborts_load() {
        let text = "[Header]\nKey,Value,Extra\n[Data]\nSample_ID,index\nA,ACGT\n";
        assert!(matches!(
            SampleSheet::parse(text),
            Err(SampleSheetError::MalformedSectionLine { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SampleSheet::read("test/samplesheet/does_not_exist.csv"),
            Err(SampleSheetError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_verify_sample_id() {
        let sheet = SampleSheet::read(V1_SHEET).unwrap();
        assert!(sheet.verify_sample_id().is_ok());

        let dupes = SampleSheet::read(V1_DUPLICATES).unwrap();
        match dupes.verify_sample_id() {
            Err(SampleSheetError::DuplicateSampleId { ids, rows }) => {
                assert_eq!(ids, vec!["Sample2"]);
                assert_eq!(rows, vec![1, 3]);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_verify_sample_project() {
        let sheet = SampleSheet::read(V1_SHEET).unwrap();
        assert!(sheet.verify_sample_project().is_ok());

        let dupes = SampleSheet::read(V1_DUPLICATES).unwrap();
        match dupes.verify_sample_project() {
            Err(SampleSheetError::IllegalProjectName { column, projects }) => {
                assert_eq!(column, SAMPLE_PROJECT);
                assert_eq!(projects, vec!["default"]);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_duplicates_and_merge() {
        let sheet = SampleSheet::read(V1_DUPLICATES).unwrap();
        let dupes = sheet.duplicate_indexes(true).unwrap();
        assert_eq!(dupes.column_values(SAMPLE_ID).unwrap(), vec!["Sample1", "Sample2"]);

        let merged = sheet
            .merge_duplicate_indexes(&MergeOptions::new(MergeFieldPolicy::FirstRow))
            .unwrap();
        assert!(merged.duplicate_indexes(true).unwrap().is_empty());
        assert_eq!(
            merged.data().column_values(SAMPLE_ID).unwrap(),
            vec!["DUPLICATE_INDEX_ATTACTCG_TATAGCCT", "Sample3", "Sample2"]
        );
        assert!(merged.projects().contains(&DUPLICATE_PROJECT.to_string()));
    }

    #[test]
    fn test_filter_single_index_v2() {
        let sheet = SampleSheet::read(V2_SINGLE_INDEX).unwrap();
        assert!(!sheet.has_index2());
        let hits = sheet
            .filter_sample_indexes(&["CGTACTAG"], IndexSelection::Both)
            .unwrap();
        assert_eq!(hits.column_values(SAMPLE_ID).unwrap(), vec!["S2"]);
        assert!(sheet
            .filter_sample_indexes(&["CGTACTAG"], IndexSelection::Index2)
            .is_err());
    }

    #[test]
    fn test_hamming_on_sheet() {
        let sheet = SampleSheet::read(V1_SHEET).unwrap();
        let d = sheet.hamming_distances(&HammingOptions::default()).unwrap();
        // lane 1 holds three samples, lane 2 one
        assert_eq!(d.len(), 3);
        assert!(d.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(sheet.verify_hamming_distance(&HammingOptions::default(), 3).is_ok());
    }

    #[test]
    fn test_verify_hamming_distance_reports_close_pairs() {
        let sheet = SampleSheet::read(V1_DUPLICATES).unwrap();
        let opts = HammingOptions::default();
        let close: Vec<HammingDistance> = sheet
            .hamming_distances(&opts)
            .unwrap()
            .into_iter()
            .filter(|d| d.distance < 3)
            .collect();
        match sheet.verify_hamming_distance(&opts, 3) {
            Err(SampleSheetError::InsufficientHammingDistance { min, pairs }) => {
                assert_eq!(min, 3);
                assert_eq!(pairs, close);
                assert_eq!(pairs[0].u, "ATTACTCG+TATAGCCT");
                assert_eq!(pairs[0].distance, 0);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_set_project_suffix() {
        let sheet = SampleSheet::read(V1_SHEET).unwrap();
        let sheet = sheet.set_project_suffix("fastq").unwrap();
        assert_eq!(sheet.projects(), vec!["ProjectA_fastq", "ProjectB_fastq"]);

        let v2 = SampleSheet::read(V2_SHEET).unwrap().set_project_suffix("x").unwrap();
        assert_eq!(v2.projects(), vec!["ProjectX_x"]);

        let bare = SampleSheet::parse("[Data]\nSample_ID,index\nA,ACGT\n").unwrap();
        assert!(matches!(
            bare.set_project_suffix("x"),
            Err(SampleSheetError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_projectname_to_sampleproject() {
        let sheet = match SampleSheet::read(V2_SHEET).unwrap() {
            SampleSheet::V2(s) => s,
            _ => panic!("expected a v2 sheet"),
        };
        let sheet = sheet.projectname_to_sampleproject().unwrap();
        assert_eq!(
            sheet.data().column_values(SAMPLE_PROJECT).unwrap(),
            vec!["ProjectX", "ProjectX", ""]
        );
    }

    #[test]
    fn test_info() {
        let sheet = SampleSheet::read(V2_SHEET).unwrap();
        let info = sheet.info().unwrap();
        assert_eq!(info.samplesheet_filename.as_deref(), Some("v2.csv"));
        assert_eq!(info.samplesheet_version, 2);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["RunName"], "Run43");
        assert_eq!(json["samplesheet_format"], "v2");
        assert_eq!(json["projects"][0], "ProjectX");
    }

    #[test]
    fn test_empty_sheets() {
        for format in &[SampleSheetFormat::V1, SampleSheetFormat::V2] {
            let sheet = SampleSheet::empty(*format);
            assert!(sheet.data().is_empty());
            assert!(sheet.projects().is_empty());
            assert!(sheet.duplicate_indexes(true).is_err());
            assert!(sheet.verify_sample_project().is_ok());
        }
    }

    #[test]
    fn test_empty_sheets_read_back() {
        for format in &[SampleSheetFormat::V1, SampleSheetFormat::V2] {
            let sheet = SampleSheet::empty(*format);
            let again = SampleSheet::parse(&sheet.to_csv()).unwrap();
            assert_eq!(again.format(), *format);
            assert_eq!(again, sheet);
        }
        assert_eq!(
            SampleSheet::parse("[Header]\n\n[Data]\n").unwrap().format(),
            SampleSheetFormat::V1
        );
        assert_eq!(
            SampleSheet::parse("[Header]\n[BCLConvert_Settings]\n").unwrap().format(),
            SampleSheetFormat::V2
        );
    }

    #[test]
    fn test_blank_column_read_back() {
        let mut sheet = SampleSheetV1::default();
        sheet.data = TableSection::new(DATA, vec!["Sample_ID".to_string(), "index".to_string()]);
        sheet.data.push_record(&[("Sample_ID", "A".to_string())]);
        let sheet = SampleSheet::V1(sheet);

        let keep = ParseOptions {
            drop_blank_columns: false,
            ..ParseOptions::default()
        };
        let again = SampleSheet::parse_with(&sheet.to_csv(), &keep).unwrap();
        assert_eq!(again, sheet);

        let dropped = SampleSheet::parse(&sheet.to_csv()).unwrap();
        assert_eq!(dropped.data().columns(), &["Sample_ID".to_string()][..]);
    }

    #[test]
    fn test_create_fastq_for_index_reads_on_sheet() {
        let mut sheet = SampleSheet::read(V2_SHEET).unwrap();
        sheet.settings_mut().set_create_fastq_for_index_reads(true);
        assert_eq!(sheet.settings().create_fastq_for_index_reads().unwrap(), Some(true));
    }

    #[test]
    fn test_write_v2() {
        let sheet = SampleSheet::read(V2_SHEET).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("SampleSheet.csv");
        sheet.write(&out).unwrap();
        assert!(diff_files(
            &mut File::open(&out).unwrap(),
            &mut File::open("test/samplesheet/v2.expected.csv").unwrap(),
        ));
    }

    #[test]
    fn test_write_v1() {
        let sheet = SampleSheet::read(V1_SHEET).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("SampleSheet.csv");
        sheet.write(&out).unwrap();
        assert!(diff_files(
            &mut File::open(&out).unwrap(),
            &mut File::open("test/samplesheet/v1.expected.csv").unwrap(),
        ));
        let again = SampleSheet::read(&out).unwrap();
        assert_eq!(again.data(), sheet.data());
        assert_eq!(again.header(), sheet.header());
    }

    proptest! {
        #[test]
        fn prop_test_serialize_parse_round_trip(
            v2 in proptest::bool::ANY,
            header in vec(("[A-Za-z][A-Za-z0-9_]{0,8}", "[A-Za-z0-9_.]{0,8}"), 0..5),
            reads in vec("[0-9]{1,3}", 0..3),
            settings in vec(("[A-Za-z][A-Za-z0-9_]{0,8}", "[A-Za-z0-9_.]{0,8}"), 0..3),
            columns in 0usize..5,
            blank_column in proptest::bool::ANY,
            rows in vec(vec("[A-Za-z0-9_]{0,8}", 5), 0..6),
        ) {
            let mut names: Vec<String> = (0..columns).map(|c| format!("Column{}", c)).collect();
            if blank_column {
                names.push("Description".to_string());
            }
            let mut data = TableSection::new(if v2 { BCLCONVERT_DATA } else { DATA }, names.clone());
            for row in rows {
                let mut row = row[..columns].to_vec();
                if row.iter().all(|v| v.is_empty()) {
                    continue;
                }
                row.resize(names.len(), String::new());
                data.push_row(row);
            }

            let sheet = if v2 {
                let mut s = SampleSheetV2::default();
                for (k, v) in &header {
                    s.header.insert(k, v.as_str());
                }
                for (i, r) in reads.iter().enumerate() {
                    s.reads.insert(&format!("Read{}Cycles", i + 1), r.as_str());
                }
                for (k, v) in &settings {
                    s.bclconvert_settings.section_mut().insert(k, v.as_str());
                }
                s.bclconvert_data = data;
                SampleSheet::V2(s)
            } else {
                let mut s = SampleSheetV1::default();
                for (k, v) in &header {
                    s.header.insert(k, v.as_str());
                }
                s.reads = ListSection::new(READS, reads);
                for (k, v) in &settings {
                    s.settings.section_mut().insert(k, v.as_str());
                }
                s.data = data;
                SampleSheet::V1(s)
            };

            let keep = ParseOptions {
                drop_blank_columns: false,
                ..ParseOptions::default()
            };
            let parsed = SampleSheet::parse_with(&sheet.to_csv(), &keep).unwrap();
            prop_assert_eq!(parsed, sheet);
        }
    }
}
