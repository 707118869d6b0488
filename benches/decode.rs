use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use epistle::model::location::IndexLocation;
use epistle::model::message::Message;
use epistle::parser::document::flatten_records;

fn record(n: usize) -> Value {
    json!({
        "id": format!("{n}@bench.example"),
        "timestamp": 1_700_000_000 + n as i64,
        "filename": [format!("/mail/bob@yahoo.com/Inbox/cur/{n}:2,S")],
        "tags": ["inbox", "unread"],
        "headers": {"Subject": format!("Message {n}"), "From": "bench@example.com"},
        "body": [{"id": 1, "content-type": "text/plain", "content": "hello"}]
    })
}

/// 200 threads, each a chain of five replies.
fn document() -> Value {
    let threads = (0..200)
        .map(|t| {
            let mut node = json!([]);
            for depth in (0..5).rev() {
                node = json!([[record(t * 5 + depth), node]]);
            }
            node
        })
        .collect();
    Value::Array(threads)
}

fn bench_flatten(c: &mut Criterion) {
    let doc = document();
    c.bench_function("flatten_records", |b| {
        b.iter(|| flatten_records(doc.clone()).unwrap().len())
    });
}

fn bench_decode_messages(c: &mut Criterion) {
    let doc = document();
    let location = IndexLocation::new("/mail").unwrap();
    c.bench_function("decode_messages", |b| {
        b.iter(|| {
            flatten_records(doc.clone())
                .unwrap()
                .into_iter()
                .map(|r| Message::from_value(r, location.clone()).unwrap())
                .count()
        })
    });
}

criterion_group!(benches, bench_flatten, bench_decode_messages);
criterion_main!(benches);
