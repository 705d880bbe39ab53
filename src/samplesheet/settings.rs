// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Typed access to the settings sections. Values stay stored as text in the
//! underlying `DictSection`, so unknown keys and their order survive a
//! round trip.

use std::fmt;
use std::str::FromStr;

use crate::error::SampleSheetError;
use crate::section::DictSection;

pub const CREATE_FASTQ_FOR_INDEX_READS: &str = "CreateFastqForIndexReads";
pub const SOFTWARE_VERSION: &str = "SoftwareVersion";
pub const ADAPTER_READ1: &str = "AdapterRead1";
pub const ADAPTER_READ2: &str = "AdapterRead2";
pub const BARCODE_MISMATCHES_INDEX1: &str = "BarcodeMismatchesIndex1";
pub const BARCODE_MISMATCHES_INDEX2: &str = "BarcodeMismatchesIndex2";
pub const OVERRIDE_CYCLES: &str = "OverrideCycles";
pub const FASTQ_COMPRESSION_FORMAT: &str = "FastqCompressionFormat";
pub const NO_LANE_SPLITTING: &str = "NoLaneSplitting";

/// Settings understood by both sample sheet formats.
pub trait ConversionSettings {
    fn section(&self) -> &DictSection;
    fn section_mut(&mut self) -> &mut DictSection;

    /// `CreateFastqForIndexReads`, stored as `0` or `1`.
    fn create_fastq_for_index_reads(&self) -> Result<Option<bool>, SampleSheetError> {
        match self.section().get(CREATE_FASTQ_FOR_INDEX_READS) {
            None | Some("") => Ok(None),
            Some("0") => Ok(Some(false)),
            Some("1") => Ok(Some(true)),
            Some(other) => Err(SampleSheetError::InvalidSetting {
                key: CREATE_FASTQ_FOR_INDEX_READS,
                value: other.to_string(),
                expected: "0 or 1",
            }),
        }
    }

    fn set_create_fastq_for_index_reads(&mut self, value: bool) {
        self.section_mut()
            .insert(CREATE_FASTQ_FOR_INDEX_READS, if value { "1" } else { "0" });
    }
}

/// The v1 `[Settings]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    section: DictSection,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            section: DictSection::new("Settings"),
        }
    }
}

impl From<DictSection> for Settings {
    fn from(section: DictSection) -> Self {
        Settings { section }
    }
}

impl ConversionSettings for Settings {
    fn section(&self) -> &DictSection {
        &self.section
    }

    fn section_mut(&mut self) -> &mut DictSection {
        &mut self.section
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.section, f)
    }
}

/// Allowed values of `BarcodeMismatchesIndex1/2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarcodeMismatches {
    Zero,
    One,
    Two,
    /// `na`: the index read is not used for demultiplexing.
    NotApplicable,
}

impl BarcodeMismatches {
    /// Number of tolerated mismatches, if the index is used at all.
    pub fn count(self) -> Option<u32> {
        match self {
            BarcodeMismatches::Zero => Some(0),
            BarcodeMismatches::One => Some(1),
            BarcodeMismatches::Two => Some(2),
            BarcodeMismatches::NotApplicable => None,
        }
    }
}

impl fmt::Display for BarcodeMismatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BarcodeMismatches::Zero => "0",
            BarcodeMismatches::One => "1",
            BarcodeMismatches::Two => "2",
            BarcodeMismatches::NotApplicable => "na",
        };
        f.write_str(s)
    }
}

impl FromStr for BarcodeMismatches {
    type Err = SampleSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(BarcodeMismatches::Zero),
            "1" => Ok(BarcodeMismatches::One),
            "2" => Ok(BarcodeMismatches::Two),
            "na" => Ok(BarcodeMismatches::NotApplicable),
            _ => Err(SampleSheetError::InvalidSetting {
                key: BARCODE_MISMATCHES_INDEX1,
                value: s.to_string(),
                expected: "0, 1, 2 or na",
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FastqCompressionFormat {
    Gzip,
    Dragen,
}

impl fmt::Display for FastqCompressionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FastqCompressionFormat::Gzip => "gzip",
            FastqCompressionFormat::Dragen => "dragen",
        })
    }
}

impl FromStr for FastqCompressionFormat {
    type Err = SampleSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gzip" => Ok(FastqCompressionFormat::Gzip),
            "dragen" => Ok(FastqCompressionFormat::Dragen),
            _ => Err(SampleSheetError::InvalidSetting {
                key: FASTQ_COMPRESSION_FORMAT,
                value: s.to_string(),
                expected: "gzip or dragen",
            }),
        }
    }
}

/// The v2 `[BCLConvert_Settings]` section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BclConvertSettings {
    section: DictSection,
}

impl Default for BclConvertSettings {
    fn default() -> Self {
        BclConvertSettings {
            section: DictSection::new("BCLConvert_Settings"),
        }
    }
}

impl From<DictSection> for BclConvertSettings {
    fn from(section: DictSection) -> Self {
        BclConvertSettings { section }
    }
}

impl ConversionSettings for BclConvertSettings {
    fn section(&self) -> &DictSection {
        &self.section
    }

    fn section_mut(&mut self) -> &mut DictSection {
        &mut self.section
    }
}

impl fmt::Display for BclConvertSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.section, f)
    }
}

fn non_blank<'a>(section: &'a DictSection, key: &str) -> Option<&'a str> {
    section.get(key).filter(|v| !v.is_empty())
}

impl BclConvertSettings {
    /// Version of BCL Convert, as three dot-separated integers.
    pub fn software_version(&self) -> Option<&str> {
        non_blank(&self.section, SOFTWARE_VERSION)
    }

    pub fn set_software_version(&mut self, version: &str) -> Result<(), SampleSheetError> {
        let parts: Vec<&str> = version.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit())) {
            return Err(SampleSheetError::InvalidSetting {
                key: SOFTWARE_VERSION,
                value: version.to_string(),
                expected: "a version such as 4.2.7",
            });
        }
        self.section.insert(SOFTWARE_VERSION, version);
        Ok(())
    }

    /// Adapter sequence(s) trimmed from read 1. Several adapters are
    /// joined with `+`.
    pub fn adapter_read1(&self) -> Option<&str> {
        non_blank(&self.section, ADAPTER_READ1)
    }

    pub fn set_adapter_read1(&mut self, adapter: &str) -> Result<(), SampleSheetError> {
        check_adapter(ADAPTER_READ1, adapter)?;
        self.section.insert(ADAPTER_READ1, adapter);
        Ok(())
    }

    pub fn adapter_read2(&self) -> Option<&str> {
        non_blank(&self.section, ADAPTER_READ2)
    }

    pub fn set_adapter_read2(&mut self, adapter: &str) -> Result<(), SampleSheetError> {
        check_adapter(ADAPTER_READ2, adapter)?;
        self.section.insert(ADAPTER_READ2, adapter);
        Ok(())
    }

    pub fn barcode_mismatches_index1(&self) -> Result<Option<BarcodeMismatches>, SampleSheetError> {
        self.mismatches(BARCODE_MISMATCHES_INDEX1)
    }

    pub fn set_barcode_mismatches_index1(&mut self, value: BarcodeMismatches) {
        self.section.insert(BARCODE_MISMATCHES_INDEX1, value.to_string());
    }

    pub fn barcode_mismatches_index2(&self) -> Result<Option<BarcodeMismatches>, SampleSheetError> {
        self.mismatches(BARCODE_MISMATCHES_INDEX2)
    }

    pub fn set_barcode_mismatches_index2(&mut self, value: BarcodeMismatches) {
        self.section.insert(BARCODE_MISMATCHES_INDEX2, value.to_string());
    }

    fn mismatches(&self, key: &'static str) -> Result<Option<BarcodeMismatches>, SampleSheetError> {
        match non_blank(&self.section, key) {
            None => Ok(None),
            Some(v) => v.parse().map(Some).map_err(|_| SampleSheetError::InvalidSetting {
                key,
                value: v.to_string(),
                expected: "0, 1, 2 or na",
            }),
        }
    }

    pub fn override_cycles(&self) -> Option<&str> {
        non_blank(&self.section, OVERRIDE_CYCLES)
    }

    /// Read layout such as `Y151;I8;I8;Y151`: `;`-separated segments built
    /// from `Y`, `N`, `I` and `U` followed by a cycle count.
    pub fn set_override_cycles(&mut self, cycles: &str) -> Result<(), SampleSheetError> {
        let valid = !cycles.is_empty()
            && cycles.split(';').all(|read| {
                let mut chars = read.chars().peekable();
                let mut segments = 0;
                while let Some(c) = chars.next() {
                    if !"YNIU".contains(c) {
                        return false;
                    }
                    let mut digits = 0;
                    while chars.peek().map_or(false, |d| d.is_ascii_digit()) {
                        chars.next();
                        digits += 1;
                    }
                    if digits == 0 {
                        return false;
                    }
                    segments += 1;
                }
                segments > 0
            });
        if !valid {
            return Err(SampleSheetError::InvalidSetting {
                key: OVERRIDE_CYCLES,
                value: cycles.to_string(),
                expected: "';'-separated reads such as Y151;I8;I8;Y151",
            });
        }
        self.section.insert(OVERRIDE_CYCLES, cycles);
        Ok(())
    }

    pub fn fastq_compression_format(&self) -> Result<Option<FastqCompressionFormat>, SampleSheetError> {
        non_blank(&self.section, FASTQ_COMPRESSION_FORMAT)
            .map(str::parse)
            .transpose()
    }

    pub fn set_fastq_compression_format(&mut self, format: FastqCompressionFormat) {
        self.section.insert(FASTQ_COMPRESSION_FORMAT, format.to_string());
    }

    /// `NoLaneSplitting`, stored as `true` or `false`.
    pub fn no_lane_splitting(&self) -> Result<Option<bool>, SampleSheetError> {
        match non_blank(&self.section, NO_LANE_SPLITTING) {
            None => Ok(None),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(v) => Err(SampleSheetError::InvalidSetting {
                key: NO_LANE_SPLITTING,
                value: v.to_string(),
                expected: "true or false",
            }),
        }
    }

    pub fn set_no_lane_splitting(&mut self, value: bool) {
        self.section
            .insert(NO_LANE_SPLITTING, if value { "true" } else { "false" });
    }
}

fn check_adapter(key: &'static str, adapter: &str) -> Result<(), SampleSheetError> {
    let valid = !adapter.is_empty()
        && adapter
            .split('+')
            .all(|a| !a.is_empty() && crate::seq::ensure_acgtn(a.as_bytes()).is_ok());
    if valid {
        Ok(())
    } else {
        Err(SampleSheetError::InvalidSetting {
            key,
            value: adapter.to_string(),
            expected: "one or more ACGTN sequences joined by '+'",
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bclconvert(lines: &[&str]) -> BclConvertSettings {
        let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
        DictSection::parse("BCLConvert_Settings", &lines).unwrap().into()
    }

    #[test]
    fn test_create_fastq_for_index_reads() {
        let mut s = Settings::default();
        assert_eq!(s.create_fastq_for_index_reads().unwrap(), None);
        s.set_create_fastq_for_index_reads(true);
        assert_eq!(s.create_fastq_for_index_reads().unwrap(), Some(true));
        s.set_create_fastq_for_index_reads(false);
        assert_eq!(s.to_string(), "[Settings]\nCreateFastqForIndexReads,0\n\n");

        let bad = bclconvert(&["CreateFastqForIndexReads,yes"]);
        assert!(bad.create_fastq_for_index_reads().is_err());
    }

    #[test]
    fn test_bclconvert_getters() {
        let s = bclconvert(&[
            "SoftwareVersion,4.2.7",
            "AdapterRead1,CTGTCTCTTATACACATCT",
            "BarcodeMismatchesIndex1,1",
            "BarcodeMismatchesIndex2,na",
            "OverrideCycles,Y151;I8;I8;Y151",
            "FastqCompressionFormat,gzip",
            "NoLaneSplitting,TRUE",
        ]);
        assert_eq!(s.software_version(), Some("4.2.7"));
        assert_eq!(s.adapter_read1(), Some("CTGTCTCTTATACACATCT"));
        assert_eq!(s.adapter_read2(), None);
        assert_eq!(s.barcode_mismatches_index1().unwrap(), Some(BarcodeMismatches::One));
        assert_eq!(
            s.barcode_mismatches_index2().unwrap(),
            Some(BarcodeMismatches::NotApplicable)
        );
        assert_eq!(s.override_cycles(), Some("Y151;I8;I8;Y151"));
        assert_eq!(
            s.fastq_compression_format().unwrap(),
            Some(FastqCompressionFormat::Gzip)
        );
        assert_eq!(s.no_lane_splitting().unwrap(), Some(true));
    }

    #[test]
    fn test_bclconvert_setters() {
        let mut s = BclConvertSettings::default();
        s.set_software_version("4.2.7").unwrap();
        assert!(s.set_software_version("4.2").is_err());
        s.set_adapter_read1("AGATCGGAAGAGC+CTGTCTCTTATA").unwrap();
        assert!(s.set_adapter_read2("AGAT+").is_err());
        s.set_barcode_mismatches_index1(BarcodeMismatches::Zero);
        s.set_override_cycles("U8Y143;I8;I8;U8Y143").unwrap();
        assert!(s.set_override_cycles("Y151;8I").is_err());
        s.set_fastq_compression_format(FastqCompressionFormat::Dragen);
        s.set_no_lane_splitting(false);
        assert_eq!(
            s.to_string(),
            "[BCLConvert_Settings]\n\
             SoftwareVersion,4.2.7\n\
             AdapterRead1,AGATCGGAAGAGC+CTGTCTCTTATA\n\
             BarcodeMismatchesIndex1,0\n\
             OverrideCycles,U8Y143;I8;I8;U8Y143\n\
             FastqCompressionFormat,dragen\n\
             NoLaneSplitting,false\n\n"
        );
    }

    #[test]
    fn test_invalid_stored_values() {
        let s = bclconvert(&[
            "BarcodeMismatchesIndex2,3",
            "FastqCompressionFormat,zstd",
            "NoLaneSplitting,1",
        ]);
        match s.barcode_mismatches_index2() {
            Err(SampleSheetError::InvalidSetting { key, value, .. }) => {
                assert_eq!(key, BARCODE_MISMATCHES_INDEX2);
                assert_eq!(value, "3");
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(s.fastq_compression_format().is_err());
        assert!(s.no_lane_splitting().is_err());
    }

    #[test]
    fn test_mismatch_count() {
        assert_eq!(BarcodeMismatches::Two.count(), Some(2));
        assert_eq!(BarcodeMismatches::NotApplicable.count(), None);
        assert_eq!("na".parse::<BarcodeMismatches>().unwrap().to_string(), "na");
    }
}
