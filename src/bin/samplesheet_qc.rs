// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Command-line front end: check, update, create and summarise sample sheets,
//! and suggest barcode corrections from demultiplexing statistics.

#[macro_use]
extern crate log;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use samplesheet_qc::layout::{ConversionOutput, LoadDemuxStats};
use samplesheet_qc::samplesheet::{
    min_hamming_distance, Granularity, HammingOptions, MergeFieldPolicy, MergeOptions,
    SampleSheet, SampleSheetFormat,
};
use samplesheet_qc::SampleSheetError;
use samplesheet_qc::section::TableSection;
use samplesheet_qc::stats::DEFAULT_TOP_N;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run verifications on a sample sheet. Exits non-zero on any failure.
    Check(Check),
    /// Apply transformations and write the updated sample sheet.
    Update(Update),
    /// Print an empty sample sheet skeleton.
    Create(Create),
    /// Print a JSON summary of a sample sheet.
    Info(Info),
    /// Report unknown barcodes that match a sample under a reverse complement.
    SuggestBarcodes(SuggestBarcodes),
}

#[derive(Args)]
struct Check {
    sheet: PathBuf,
    /// Look for rows sharing the same indexes.
    #[arg(long)]
    duplicates: bool,
    /// Look for repeated Sample_ID values.
    #[arg(long)]
    sample_ids: bool,
    /// Look for reserved project names.
    #[arg(long)]
    projects: bool,
    /// Fail when two samples are closer than this Hamming distance.
    #[arg(long, conflicts_with = "barcode_mismatches")]
    min_hamming_distance: Option<u32>,
    /// Derive the minimum Hamming distance from the mismatches the
    /// demultiplexer is allowed.
    #[arg(long)]
    barcode_mismatches: Option<u32>,
    /// Compare i7 and i5 sequences separately.
    #[arg(long)]
    sides: bool,
    /// Also compare each sample against the reverse complement of the other.
    #[arg(long)]
    reverse_complement: bool,
    /// Only compare samples sharing a lane.
    #[arg(long)]
    by_lane: bool,
}

#[derive(Args)]
struct Update {
    sheet: PathBuf,
    /// Append `_SUFFIX` to every project name.
    #[arg(long)]
    project_suffix: Option<String>,
    /// Copy Cloud_Data ProjectName into BCLConvert_Data Sample_Project (v2 only).
    #[arg(long)]
    projectname_to_sampleproject: bool,
    /// Replace every group of rows sharing indexes by one synthetic row.
    #[arg(long)]
    merge_duplicate_indexes: bool,
    /// How the merged row fills the remaining columns: first, agree or blank.
    #[arg(long, default_value = "first")]
    merge_fields: MergeFieldPolicy,
    #[arg(long)]
    create_fastq_for_index_reads: bool,
    /// Output path, `-` for stdout.
    #[arg(short, long, default_value = "-")]
    output: String,
    /// Overwrite an existing output file.
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct Create {
    #[arg(long, default_value = "v2")]
    format: SampleSheetFormat,
}

#[derive(Args)]
struct Info {
    sheet: PathBuf,
}

#[derive(Args)]
struct SuggestBarcodes {
    /// bcl2fastq or BCL Convert output directory.
    conversion_dir: PathBuf,
    /// Report CSV, stdout when absent.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Unknown barcodes considered per lane.
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,
}

fn write_tsv(table: &TableSection) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(io::stdout());
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

impl Check {
    fn hamming_options(&self) -> HammingOptions {
        HammingOptions {
            granularity: if self.sides {
                Granularity::Sides
            } else {
                Granularity::Whole
            },
            use_lane: self.by_lane,
            reverse_complement: self.reverse_complement,
            skip_length_mismatch: false,
        }
    }

    fn execute(&self) -> Result<bool> {
        let sheet = SampleSheet::read(&self.sheet)?;
        let min_distance = self
            .min_hamming_distance
            .or_else(|| self.barcode_mismatches.map(min_hamming_distance));
        let all = !(self.duplicates || self.sample_ids || self.projects || min_distance.is_some());
        let mut ok = true;

        if all || self.duplicates {
            let dups = sheet.duplicate_indexes(self.by_lane)?;
            if !dups.is_empty() {
                eprintln!("{} row(s) share their indexes:", dups.len());
                write_tsv(&dups)?;
                ok = false;
            }
        }

        if all || self.sample_ids {
            if let Err(e) = sheet.verify_sample_id() {
                eprintln!("{}", e);
                ok = false;
            }
        }

        if all || self.projects {
            if let Err(e) = sheet.verify_sample_project() {
                eprintln!("{}", e);
                ok = false;
            }
        }

        if let Some(min) = min_distance {
            match sheet.verify_hamming_distance(&self.hamming_options(), min) {
                Ok(()) => {}
                Err(SampleSheetError::InsufficientHammingDistance { min, pairs }) => {
                    eprintln!(
                        "{} index pair(s) are closer than the minimum Hamming distance of {}:",
                        pairs.len(),
                        min
                    );
                    let mut wtr = csv::WriterBuilder::new()
                        .delimiter(b'\t')
                        .from_writer(io::stdout());
                    for d in &pairs {
                        wtr.serialize(d)?;
                    }
                    wtr.flush()?;
                    ok = false;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if ok {
            info!("{}: all checks passed", self.sheet.display());
        }
        Ok(ok)
    }
}

impl Update {
    fn execute(&self) -> Result<bool> {
        let mut sheet = SampleSheet::read(&self.sheet)?;

        if self.projectname_to_sampleproject {
            sheet = match sheet {
                SampleSheet::V2(s) => SampleSheet::V2(s.projectname_to_sampleproject()?),
                SampleSheet::V1(_) => {
                    bail!("--projectname-to-sampleproject requires a v2 sample sheet")
                }
            };
        }
        if self.merge_duplicate_indexes {
            sheet = sheet.merge_duplicate_indexes(&MergeOptions::new(self.merge_fields))?;
        }
        if let Some(ref suffix) = self.project_suffix {
            sheet = sheet.set_project_suffix(suffix)?;
        }
        if self.create_fastq_for_index_reads {
            sheet.settings_mut().set_create_fastq_for_index_reads(true);
        }

        if self.output == "-" {
            io::stdout().write_all(sheet.to_csv().as_bytes())?;
        } else {
            let out = PathBuf::from(&self.output);
            if out.exists() && !self.force {
                bail!("{} exists, use --force to overwrite", out.display());
            }
            sheet.write(&out)?;
            info!("wrote {}", out.display());
        }
        Ok(true)
    }
}

impl Create {
    fn execute(&self) -> Result<bool> {
        print!("{}", SampleSheet::empty(self.format));
        Ok(true)
    }
}

impl Info {
    fn execute(&self) -> Result<bool> {
        let sheet = SampleSheet::read(&self.sheet)?;
        let info = sheet.info()?;
        println!("{}", serde_json::to_string_pretty(&info)?);
        Ok(true)
    }
}

impl SuggestBarcodes {
    fn execute(&self) -> Result<bool> {
        let output = ConversionOutput::detect(&self.conversion_dir)?;
        let report = output
            .suggested_barcodes(self.top_n)
            .with_context(|| format!("loading statistics from {}", output.path().display()))?;
        match self.output {
            Some(ref path) => {
                report.to_csv_file(path)?;
                info!("wrote {} suggestion(s) to {}", report.len(), path.display());
            }
            None => report.write_csv(io::stdout())?,
        }
        Ok(true)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check(cmd) => cmd.execute(),
        Commands::Update(cmd) => cmd.execute(),
        Commands::Create(cmd) => cmd.execute(),
        Commands::Info(cmd) => cmd.execute(),
        Commands::SuggestBarcodes(cmd) => cmd.execute(),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}
