//! Routing benchmarks.
//!
//! Run with: `cargo bench -p gapi-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gapi_router::Router;
use http::Method;

fn build_router(num_routes: usize) -> Router<usize> {
    let mut router = Router::new();
    for i in 0..num_routes / 3 {
        let _ = router.insert(Method::GET, format!("/api/v1/resource{i}"), i);
        let _ = router.insert(Method::GET, format!("/api/v1/resource{i}/{{id}}"), i);
        let _ = router.insert(
            Method::GET,
            format!("/api/v1/org/{{org}}/resource{i}/{{id}}"),
            i,
        );
    }
    router
}

fn bench_matches(c: &mut Criterion) {
    let router = build_router(300);
    let paths = [
        ("static", "/api/v1/resource50"),
        ("variable", "/api/v1/resource25/12345"),
        ("nested", "/api/v1/org/acme/resource75/9"),
        ("miss", "/api/v2/none"),
    ];

    let mut group = c.benchmark_group("match");
    for (name, path) in paths {
        group.bench_with_input(BenchmarkId::from_parameter(name), path, |b, path| {
            b.iter(|| black_box(router.at(&Method::GET, path).is_ok()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_matches);
criterion_main!(benches);
