//! Search and Validation Benchmarks
//!
//! Measures filter parsing, list queries over growing tenants, and the
//! schema checks every create goes through.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use scim_provisioner::directory::DirectoryUser;
use scim_provisioner::resource::ResourceTranslator;
use scim_provisioner::schema::{ResourceKind, SchemaRegistry};
use scim_provisioner::search::{FilterExpr, SearchEngine, SearchParams, SearchRequest};
use serde_json::{Value, json};
use std::sync::Arc;

const BASE: &str = "https://scim.example.com/scim/v2/acme";

fn create_test_user_data(id: usize) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "userName": format!("user{}@example.com", id),
        "externalId": format!("ext-{}", id),
        "name": {"givenName": format!("User{}", id), "familyName": "Test"},
        "emails": [{"value": format!("user{}@example.com", id), "type": "work", "primary": true}],
        "roles": [{"value": "member"}, {"value": format!("team-{}", id % 7)}],
        "active": id % 5 != 0
    })
}

fn directory_users(count: usize) -> Vec<DirectoryUser> {
    (0..count)
        .map(|i| {
            let mut user = DirectoryUser::new(format!("user{}@example.com", i));
            user.email = Some(format!("user{}@example.com", i));
            user.first_name = Some(format!("User{}", i));
            user.last_name = Some("Test".to_string());
            user.enabled = i % 5 != 0;
            user
        })
        .collect()
}

fn bench_filter_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_parsing");

    let filters = [
        ("simple", r#"userName eq "alice""#),
        (
            "compound",
            r#"active eq true and (name.familyName sw "T" or emails.value co "example")"#,
        ),
        ("negated", r#"not (userName sw "svc-") and emails.value pr"#),
    ];
    for (name, filter) in filters {
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = black_box(FilterExpr::parse(black_box(filter)));
            });
        });
    }

    group.finish();
}

fn bench_list_users(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_users");
    let engine = SearchEngine::new(Arc::new(SchemaRegistry::with_embedded_schemas().unwrap()));

    let request = SearchRequest::from_params(&SearchParams {
        filter: Some(r#"active eq true and userName co "1""#.to_string()),
        sort_by: Some("userName".to_string()),
        start_index: Some("11".to_string()),
        count: Some("50".to_string()),
        ..Default::default()
    })
    .unwrap();

    for size in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(
            BenchmarkId::new("filter_sort_page", size),
            size,
            |b, &size| {
                let documents: Vec<Value> = directory_users(size)
                    .iter()
                    .map(|u| ResourceTranslator::to_value(u, BASE))
                    .collect::<Result<_, _>>()
                    .unwrap();

                b.iter(|| {
                    let result =
                        engine.execute(ResourceKind::User, &request, documents.iter(), BASE);
                    let _ = black_box(result);
                });
            },
        );
    }

    group.finish();
}

fn bench_create_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_validation");
    let registry = SchemaRegistry::with_embedded_schemas().unwrap();
    let definition = registry.definition_for(ResourceKind::User).unwrap();
    let schema = registry.schema_for(ResourceKind::User).unwrap();
    let documents: Vec<Value> = (0..100).map(create_test_user_data).collect();

    group.throughput(Throughput::Elements(documents.len() as u64));
    group.bench_function("canonicalize_and_validate", |b| {
        b.iter(|| {
            for document in &documents {
                let canonical = registry.canonicalize(schema, black_box(document));
                let _ = black_box(registry.validate_create(definition, schema, &canonical));
            }
        });
    });

    group.bench_function("raw_json_parse_only", |b| {
        let text: Vec<String> = documents.iter().map(Value::to_string).collect();
        b.iter(|| {
            for t in &text {
                let _ = black_box(serde_json::from_str::<Value>(black_box(t)));
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_filter_parsing,
    bench_list_users,
    bench_create_validation
);
criterion_main!(benches);
