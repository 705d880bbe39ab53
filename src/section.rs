// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Split sample sheet text into `[Section]` blocks and decode each block as a
//! key/value dictionary, a bare list, or a comma-separated table.
//!
//! Fields are split on every comma. Quoted fields with embedded commas are not
//! supported.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

use crate::error::SampleSheetError;

lazy_static! {
    static ref SECTION_REGEX: Regex =
        Regex::new(r"^\[[ \t]*([A-Za-z0-9_]+)[ \t]*\][, \t]*$").unwrap();
}

/// Name of the section opened by `line`, if it is a `[Name]` header.
pub fn section_name(line: &str) -> Option<&str> {
    SECTION_REGEX
        .captures(line.trim())
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

/// Sections of a sample sheet in file order, each holding its non-empty,
/// trimmed lines. Sections without any content are not kept, but the name of
/// every `[Name]` header seen is remembered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawSections {
    sections: Vec<(String, Vec<String>)>,
    declared: Vec<String>,
}

impl RawSections {
    /// Names of every section header in the text, including empty sections.
    pub fn declared_names(&self) -> &[String] {
        &self.declared
    }

    /// Was a `[name]` header present, with or without content?
    pub fn declared(&self, name: &str) -> bool {
        self.declared.iter().any(|n| n == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.sections.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, lines)| lines.as_slice())
    }

    /// Remove a section, returning its lines (empty if absent).
    pub fn take(&mut self, name: &str) -> Vec<String> {
        match self.sections.iter().position(|(n, _)| n == name) {
            Some(pos) => self.sections.remove(pos).1,
            None => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn close(&mut self, name: String, lines: Vec<String>) {
        if !self.declared(&name) {
            self.declared.push(name.clone());
        }
        if lines.is_empty() {
            return;
        }
        // a repeated section replaces the earlier one
        match self.sections.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = lines,
            None => self.sections.push((name, lines)),
        }
    }
}

impl IntoIterator for RawSections {
    type Item = (String, Vec<String>);
    type IntoIter = std::vec::IntoIter<(String, Vec<String>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.into_iter()
    }
}

/// Split the full text of a sample sheet into named sections. Lines before
/// the first header are ignored; no check is made against known names.
pub fn tokenize(text: &str) -> RawSections {
    let mut raw = RawSections::default();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(name) = section_name(line) {
            if let Some((prev, lines)) = current.take() {
                raw.close(prev, lines);
            }
            current = Some((name.to_string(), Vec::new()));
        } else if !line.is_empty() {
            if let Some((_, ref mut lines)) = current {
                lines.push(line.to_string());
            }
        }
    }

    if let Some((name, lines)) = current {
        raw.close(name, lines);
    }
    raw
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// Ordered key/value section, e.g. `[Header]` or `[Settings]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DictSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl DictSection {
    pub fn new(name: impl Into<String>) -> Self {
        DictSection {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Each line holds a key and an optional value. More than two non-empty
    /// fields on a line is an error. A repeated key keeps its first position
    /// and takes the last value.
    pub fn parse(name: &str, lines: &[String]) -> Result<Self, SampleSheetError> {
        let mut section = DictSection::new(name);
        for line in lines {
            let fields = split_fields(line);
            let found = fields.iter().filter(|f| !f.is_empty()).count();
            if found == 0 {
                continue;
            }
            if found > 2 {
                return Err(SampleSheetError::MalformedSectionLine {
                    section: name.to_string(),
                    line: line.clone(),
                    found,
                    expected: 2,
                });
            }
            let key = fields[0];
            let value = fields.get(1).copied().unwrap_or("");
            if key.is_empty() {
                return Err(SampleSheetError::MalformedSectionLine {
                    section: name.to_string(),
                    line: line.clone(),
                    found,
                    expected: 2,
                });
            }
            section.insert(key, value);
        }
        Ok(section)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set `key`, replacing the value in place when it already exists.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for DictSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.name)?;
        for (k, v) in &self.entries {
            writeln!(f, "{},{}", k, v)?;
        }
        writeln!(f)
    }
}

/// Section of bare lines, e.g. the v1 `[Reads]` section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListSection {
    name: String,
    items: Vec<String>,
}

impl ListSection {
    pub fn new(name: impl Into<String>, items: Vec<String>) -> Self {
        ListSection {
            name: name.into(),
            items,
        }
    }

    /// Trailing commas and whitespace are stripped; lines left empty are skipped.
    pub fn parse(name: &str, lines: &[String]) -> Self {
        let items = lines
            .iter()
            .map(|l| l.trim().trim_end_matches(|c: char| c == ',' || c.is_whitespace()))
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        ListSection::new(name, items)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for ListSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.name)?;
        for item in &self.items {
            writeln!(f, "{}", item)?;
        }
        writeln!(f)
    }
}

/// Table section with a header row, e.g. `[Data]`. Cells are stored trimmed,
/// with an empty string for a blank cell. Row order is preserved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableSection {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableSection {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        TableSection {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// The first line is the header. Rows are zipped positionally against it:
    /// short rows are padded with blanks, extra trailing fields must be blank.
    /// Rows that are entirely blank are dropped. Columns without a name and
    /// without values are dropped. With `drop_blank_columns`, named columns
    /// that are blank in every row are dropped too (only when there is at
    /// least one row).
    pub fn parse(
        name: &str,
        lines: &[String],
        drop_blank_columns: bool,
    ) -> Result<Self, SampleSheetError> {
        let (header, body) = match lines.split_first() {
            Some(split) => split,
            None => return Ok(TableSection::new(name, Vec::new())),
        };

        let columns: Vec<String> = split_fields(header).into_iter().map(str::to_string).collect();
        let ncol = columns.len();

        let mut rows = Vec::new();
        for line in body {
            let fields = split_fields(line);
            if fields.len() > ncol && fields[ncol..].iter().any(|f| !f.is_empty()) {
                return Err(SampleSheetError::MalformedSectionLine {
                    section: name.to_string(),
                    line: line.clone(),
                    found: fields.len(),
                    expected: ncol,
                });
            }
            let mut row: Vec<String> = fields.iter().take(ncol).map(|f| f.to_string()).collect();
            row.resize(ncol, String::new());
            if row.iter().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row);
        }

        let keep: Vec<usize> = (0..ncol)
            .filter(|&c| {
                let blank = rows.iter().all(|r| r[c].is_empty());
                if !blank {
                    return true;
                }
                if columns[c].is_empty() {
                    return false;
                }
                if drop_blank_columns && !rows.is_empty() {
                    warn!(
                        "dropping column '{}' from section [{}]: it is blank in every row",
                        columns[c], name
                    );
                    return false;
                }
                true
            })
            .collect();

        let mut table = TableSection::new(name, keep.iter().map(|&c| columns[c].clone()).collect());
        table.rows = rows
            .into_iter()
            .map(|r| keep.iter().map(|&c| r[c].clone()).collect())
            .collect();
        table.check_unique_columns()?;
        Ok(table)
    }

    fn check_unique_columns(&self) -> Result<(), SampleSheetError> {
        let mut seen = HashMap::new();
        for c in &self.columns {
            if seen.insert(c.as_str(), ()).is_some() {
                return Err(SampleSheetError::DuplicateColumn {
                    section: self.name.clone(),
                    column: c.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Like `column_index`, but a missing column is an error.
    pub fn require_column(&self, column: &str) -> Result<usize, SampleSheetError> {
        self.column_index(column)
            .ok_or_else(|| SampleSheetError::MissingColumn {
                section: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Value of `column` in row `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let c = self.column_index(column)?;
        self.rows.get(row).map(|r| r[c].as_str())
    }

    pub fn column_values(&self, column: &str) -> Result<Vec<&str>, SampleSheetError> {
        let c = self.require_column(column)?;
        Ok(self.rows.iter().map(|r| r[c].as_str()).collect())
    }

    /// Append a row. Columns not mentioned in `record` are left blank; names
    /// that are not columns of the table are ignored.
    pub fn push_record(&mut self, record: &[(&str, String)]) {
        let mut row = vec![String::new(); self.columns.len()];
        for (col, value) in record {
            if let Some(c) = self.column_index(col) {
                row[c] = value.clone();
            }
        }
        self.rows.push(row);
    }

    pub(crate) fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// New table with the same columns holding the rows at `indices`, in
    /// that order.
    pub fn select_rows(&self, indices: &[usize]) -> TableSection {
        TableSection {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// New table with the rows for which `keep` returns true.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[String]) -> bool) -> TableSection {
        TableSection {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// New table where every value of `column` found in `mapper` is replaced.
    pub fn rename_values(
        &self,
        column: &str,
        mapper: &HashMap<String, String>,
    ) -> Result<TableSection, SampleSheetError> {
        let c = self.require_column(column)?;
        let mut table = self.clone();
        for row in &mut table.rows {
            if let Some(new) = mapper.get(&row[c]) {
                row[c] = new.clone();
            }
        }
        Ok(table)
    }

    /// New table where `column` (added at the end if absent) is set from the
    /// value of `key_column` looked up in `mapper`. Unmapped rows get a blank.
    pub fn map_column(
        &self,
        key_column: &str,
        column: &str,
        mapper: &HashMap<String, String>,
    ) -> Result<TableSection, SampleSheetError> {
        let k = self.require_column(key_column)?;
        let mut table = self.clone();
        let c = match table.column_index(column) {
            Some(c) => c,
            None => {
                table.columns.push(column.to_string());
                for row in &mut table.rows {
                    row.push(String::new());
                }
                table.columns.len() - 1
            }
        };
        for row in &mut table.rows {
            row[c] = mapper.get(&row[k]).cloned().unwrap_or_default();
        }
        Ok(table)
    }
}

impl fmt::Display for TableSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.name)?;
        if !self.columns.is_empty() {
            writeln!(f, "{}", self.columns.join(","))?;
        }
        for row in &self.rows {
            writeln!(f, "{}", row.join(","))?;
        }
        writeln!(f)
    }
}
