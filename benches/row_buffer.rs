use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use setab::{ColumnValue, Row, RowBuffer};

fn append_one_block(capacity: usize) {
    let buffer = RowBuffer::new(capacity * 2, usize::MAX, Duration::from_secs(3600));
    for i in 0..capacity as i64 {
        buffer.append(black_box(Row::new(i, vec![ColumnValue::Integer(i)])));
    }
}

fn cursor_walk(capacity: usize) {
    let buffer = RowBuffer::new(capacity * 2, usize::MAX, Duration::from_secs(3600));
    for i in 0..capacity as i64 {
        buffer.append(Row::new(i, vec![ColumnValue::Integer(i)]));
    }
    let mut cursor = buffer.cursor();
    while cursor.get().is_some() {
        black_box(cursor.get());
        if !cursor.next() {
            break;
        }
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("append 1000 rows", |b| {
        b.iter(|| append_one_block(black_box(1000)))
    });
    c.bench_function("cursor walk over 1000 rows", |b| {
        b.iter(|| cursor_walk(black_box(1000)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
