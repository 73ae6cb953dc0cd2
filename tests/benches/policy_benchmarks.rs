//! # Zone-Gate Benchmarks
//!
//! Hot-path costs per inbound message:
//!
//! | Stage | Crate | Target |
//! |-------|-------|--------|
//! | Payload decode | zg-04 | < 20µs |
//! | Zone evaluation | zg-02 | < 1µs |
//! | Full FaceMatch cycle | all | < 200µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::CameraZoneConfig;
use std::time::Duration;
use zg_02_zone_policy::{evaluate, ZonePolicy, ZoneSnapshot};
use zg_04_dispatcher::decode;
use zg_tests::integration::harness::{face_match, general, TestGate, ROC_SERIAL, WATCHLIST_ID};

// ============================================================================
// ZG-02: Zone Policy Evaluation
// ============================================================================

fn bench_zone_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("zg-02-zone-policy");
    let policy = ZonePolicy::default();
    let camera = CameraZoneConfig {
        from_zone: 1,
        to_zone: 2,
        update_zone: true,
    };

    let cases = [
        ("transition", vec![1, 2], 1, false),
        ("anti_passback", vec![1, 2], 2, false),
        ("free_pass", vec![2], 0, true),
        ("invalid_zone", vec![0, 1, 2], 1, false),
    ];
    for (name, zones, current, free_movement) in cases {
        let snapshot = ZoneSnapshot {
            access_zones: zones,
            current_zone: current,
            free_movement,
        };
        group.bench_with_input(BenchmarkId::new("evaluate", name), &snapshot, |b, s| {
            b.iter(|| black_box(evaluate(s, &camera, &policy)))
        });
    }

    // Membership checks scale with the zone list
    for size in [4_u32, 64, 512] {
        let snapshot = ZoneSnapshot {
            access_zones: (1..=size).collect(),
            current_zone: 1,
            free_movement: false,
        };
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("evaluate_zones", size), &snapshot, |b, s| {
            b.iter(|| black_box(evaluate(s, &camera, &policy)))
        });
    }
    group.finish();
}

// ============================================================================
// ZG-04: Payload Decoding
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("zg-04-decode");

    let face = serde_json::to_vec(&face_match("evt-1", WATCHLIST_ID, "face-1")).unwrap();
    let sysconfig = serde_json::to_vec(&general(
        "msg_sd_sysconfig",
        serde_json::json!({
            "sysConfig": {
                "SERIAL_LOCATION": {"b": 1, "a": 2, "c": 3},
                "DEBOUNCE": {"HOLD_TIMER_VALUES": {"Input2": 10, "Input1": 5}}
            }
        }),
    ))
    .unwrap();

    group.bench_function("face_match", |b| b.iter(|| black_box(decode(&face))));
    group.bench_function("general_sysconfig", |b| b.iter(|| black_box(decode(&sysconfig))));
    group.bench_function("malformed", |b| b.iter(|| black_box(decode(b"{not json"))));
    group.finish();
}

// ============================================================================
// End to end: queue → dispatcher → policy → publish
// ============================================================================

fn bench_face_match_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("zg-e2e");
    group.measurement_time(Duration::from_secs(10));

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let gate = TestGate::new();
    gate.install_camera(1, 2, false);
    gate.install_identity("face-1", &[1, 2], 1, false);

    let mut counter = 0_u64;
    group.bench_function("face_match_granted", |b| {
        b.iter(|| {
            counter += 1;
            gate.push(ROC_SERIAL, &face_match(&format!("evt-{counter}"), WATCHLIST_ID, "face-1"));
            black_box(runtime.block_on(gate.drain()))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_zone_evaluation, bench_decode, bench_face_match_cycle);
criterion_main!(benches);
