// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

#[macro_use]
extern crate criterion;

use criterion::Criterion;
use samplesheet_qc::hamming::reverse_complement_str;
use samplesheet_qc::samplesheet::{Granularity, HammingOptions, SampleSheet};
use samplesheet_qc::suggest::{report_suggested_barcodes, DemuxSampleStats, UnknownBarcodeCount};

const N_SAMPLES: usize = 96;

fn encode(mut n: usize, len: usize) -> String {
    let mut s = Vec::with_capacity(len);
    for _ in 0..len {
        s.push(b"ACGT"[n % 4]);
        n /= 4;
    }
    String::from_utf8(s).unwrap()
}

fn i7(i: usize) -> String {
    encode(i * 7919 + 3, 8)
}

fn i5(i: usize) -> String {
    encode(i * 104729 + 11, 8)
}

fn plate_sheet() -> String {
    let mut text = String::from(
        "[Header]\nFileFormatVersion,2\n\n[BCLConvert_Settings]\nSoftwareVersion,3.9.3\n\n\
         [BCLConvert_Data]\nLane,Sample_ID,Index,Index2,Sample_Project\n",
    );
    for i in 0..N_SAMPLES {
        text.push_str(&format!("1,S{},{},{},Plate\n", i, i7(i), i5(i)));
    }
    text
}

fn run_hamming_benchmark(c: &mut Criterion) {
    let text = plate_sheet();
    c.bench_function("bench-parse-96-samples", |b| {
        b.iter(|| assert_eq!(SampleSheet::parse(&text).unwrap().data().len(), N_SAMPLES))
    });

    let sheet = SampleSheet::parse(&text).unwrap();
    let whole = HammingOptions::default();
    c.bench_function("bench-hamming-whole-96-samples", |b| {
        b.iter(|| {
            assert_eq!(
                sheet.hamming_distances(&whole).unwrap().len(),
                N_SAMPLES * (N_SAMPLES - 1) / 2
            )
        })
    });

    let sides_rc = HammingOptions {
        granularity: Granularity::Sides,
        reverse_complement: true,
        ..HammingOptions::default()
    };
    c.bench_function("bench-hamming-sides-rc-96-samples", |b| {
        b.iter(|| sheet.hamming_distances(&sides_rc).unwrap().len())
    });
}

fn run_suggest_benchmark(c: &mut Criterion) {
    let samples: Vec<DemuxSampleStats> = (0..N_SAMPLES)
        .map(|i| DemuxSampleStats {
            lane: "1".to_string(),
            sample_id: format!("S{}", i),
            sample_project: Some("Plate".to_string()),
            index: Some(format!("{}-{}", i7(i), i5(i))),
            read_count: 100 + i as u64,
        })
        .collect();
    // every tenth sample shows up with its i5 reverse complemented
    let unknown: Vec<UnknownBarcodeCount> = (0..N_SAMPLES)
        .map(|i| UnknownBarcodeCount {
            lane: "1".to_string(),
            index: i7(i),
            index2: Some(if i % 10 == 0 { reverse_complement_str(&i5(i)) } else { i5(i + 1000) }),
            read_count: 1_000_000,
        })
        .collect();

    c.bench_function("bench-suggest-96x96", |b| {
        b.iter(|| report_suggested_barcodes(&samples, &unknown).unwrap().len())
    });
}

criterion_group!(benches, run_hamming_benchmark, run_suggest_benchmark);

criterion_main!(benches);
