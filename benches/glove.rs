use std::collections::HashMap;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array2;
use word_embedding_loader::prelude::*;

const N_TOKENS: usize = 10_000;
const DIMS: usize = 50;

fn glove_text() -> Vec<u8> {
    let mut text = String::new();
    for idx in 0..N_TOKENS {
        text.push_str(&format!("token{}", idx));
        for component in 0..DIMS {
            text.push_str(&format!(" {:.5}", (idx * DIMS + component) as f32 * 1e-4));
        }
        text.push('\n');
    }

    text.into_bytes()
}

fn glove_benchmark(c: &mut Criterion) {
    let text = glove_text();

    c.bench_function("glove-load", |b| {
        b.iter(|| {
            let loaded: Loaded<f32> =
                load(&mut Cursor::new(&text), &LoadOptions::default()).unwrap();
            loaded
        })
    });

    let lookup: HashMap<Token, usize> = (0..N_TOKENS)
        .step_by(100)
        .enumerate()
        .map(|(row, idx)| (Token::from(format!("token{}", idx)), row))
        .collect();
    c.bench_function("glove-load-with-vocab", |b| {
        b.iter(|| {
            let matrix: Array2<f32> =
                load_with_vocab(&mut Cursor::new(&text), &lookup, &LoadOptions::default())
                    .unwrap();
            matrix
        })
    });
}

criterion_group!(glove_benches, glove_benchmark);
criterion_main!(glove_benches);
