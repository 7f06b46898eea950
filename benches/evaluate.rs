//! Benchmark skeleton for compile + evaluate. Not a tuned suite — a stub so
//! the crate carries the same benchmarking scaffold the teacher does.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indexmap::IndexMap;
use rego_ast::value::Value;
use rego_lang::{ErrorMode, Policy};

const POLICY: &str = r#"
package bench

default allow := false

allow {
    input.user.role == "admin"
}

allow {
    input.user.role == "editor"
    input.resource.owner == input.user.name
}
"#;

fn input_document() -> Value {
    let mut user = IndexMap::new();
    user.insert(Value::string("role"), Value::string("editor"));
    user.insert(Value::string("name"), Value::string("ada"));

    let mut resource = IndexMap::new();
    resource.insert(Value::string("owner"), Value::string("ada"));

    let mut input = IndexMap::new();
    input.insert(Value::string("user"), Value::object(user));
    input.insert(Value::string("resource"), Value::object(resource));
    Value::object(input)
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile bench policy", |b| {
        b.iter(|| Policy::compile(black_box(POLICY)).unwrap());
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let policy = Policy::compile(POLICY).unwrap();
    let input = input_document();
    c.bench_function("evaluate allow rule", |b| {
        b.iter(|| {
            policy
                .evaluate_rule("allow", Value::object(IndexMap::new()), black_box(input.clone()), ErrorMode::Lenient)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);
