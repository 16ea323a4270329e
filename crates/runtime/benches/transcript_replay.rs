// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for transcript decoding and replay.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use runtime::{Interpreter, RuntimeConfig};
use tensor_core::{DType, HostTensor, Shape};
use transcript_ir::{Argument, HostTensorArg, Instruction, Transcript};

fn host(shape: Vec<usize>, values: &[i64]) -> Argument {
    let t = HostTensor::from_i64(Shape::new(shape), values).unwrap();
    Argument::HostTensor(HostTensorArg::numpy(t))
}

fn dev(name: &str) -> Argument {
    Argument::device(name, DType::Int64)
}

/// A chain of `ops` modular multiplications over a `[rows, 8]` tensor.
fn modmul_chain(rows: usize, ops: usize) -> Transcript {
    let n = rows * 8;
    let values: Vec<i64> = (0..n as i64).collect();
    let mut t = Transcript::new(vec![
        Instruction::op("host_to_device", vec![host(vec![rows, 8], &values)], dev("acc")),
        Instruction::op("host_to_device", vec![host(vec![8], &[65537; 8])], dev("p")),
    ]);
    for _ in 0..ops {
        t.push(Instruction::op(
            "_modmul_ttt",
            vec![dev("acc"), dev("acc"), dev("p"), dev("acc")],
            dev("acc"),
        ));
    }
    t
}

/// One forward NTT over `lanes` independent length-`m` lanes.
fn ntt_transcript(m: usize, lanes: usize) -> Transcript {
    let p = 7681i64; // 7681 = 1 + 15 * 512, so 2m-th roots exist for m <= 256.
    let twiddles: Vec<i64> = (0..m as i64).map(|i| (i * 17 + 1) % p).collect();
    let perm: Vec<i64> = (0..m as i64).collect();
    let values: Vec<i64> = (0..(m * lanes) as i64).map(|v| v % p).collect();
    Transcript::new(vec![
        Instruction::op("host_to_device", vec![host(vec![1, m, lanes, 1], &values)], dev("a")),
        Instruction::op("host_to_device", vec![host(vec![1], &[p])], dev("p")),
        Instruction::op("host_to_device", vec![host(vec![m], &perm)], dev("perm")),
        Instruction::op("host_to_device", vec![host(vec![1, m], &twiddles)], dev("psi")),
        Instruction::op(
            "ntt",
            vec![
                dev("a"),
                dev("perm"),
                Argument::None,
                dev("p"),
                dev("psi"),
                dev("a"),
                Argument::Int(0),
                Argument::Int(0),
            ],
            dev("a"),
        ),
    ])
}

fn bench_modmul_chain(c: &mut Criterion) {
    let interpreter = Interpreter::cpu(RuntimeConfig {
        enable_profiling: false,
        ..Default::default()
    });
    let mut group = c.benchmark_group("modmul_chain");
    for rows in [16usize, 256] {
        let transcript = modmul_chain(rows, 64);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &transcript, |b, t| {
            b.iter(|| interpreter.run(t).unwrap())
        });
    }
    group.finish();
}

fn bench_ntt_threads(c: &mut Criterion) {
    let transcript = ntt_transcript(256, 64);
    let mut group = c.benchmark_group("ntt_threads");
    for threads in [1usize, 4] {
        let interpreter = Interpreter::cpu(RuntimeConfig {
            num_threads: Some(threads),
            enable_profiling: false,
            ..Default::default()
        });
        group.bench_with_input(BenchmarkId::from_parameter(threads), &transcript, |b, t| {
            b.iter(|| interpreter.run(t).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let json = modmul_chain(64, 256).to_json().unwrap();
    c.bench_function("decode_modmul_chain", |b| {
        b.iter(|| Transcript::from_json(&json).unwrap())
    });
}

criterion_group!(benches, bench_modmul_chain, bench_ntt_threads, bench_decode);
criterion_main!(benches);
