//! # Data-Availability Benchmarks
//!
//! | Path | Measures |
//! |------|----------|
//! | Certifying write | put + BLS sign over memory storage |
//! | Certificate validation | committee lookup + aggregate verify + read |
//! | Redundant write | fan-out to three replicas |
//! | Signature aggregation | combining committee partials |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use da_01_storage::{InMemoryStorageService, RedundantStorageService};
use da_03_certification::{
    CertifyingWriter, CertifyingWriterSettings, ChainValidatingReader, ValidationSettings,
};
use rand::RngCore;
use shared_crypto::{aggregate_signatures, BlsKeyPair};
use shared_types::{
    Certificate, CommitteeInfo, DaWriter, DataHash, InMemoryChain, ManualClock, StorageService,
};
use std::sync::Arc;
use std::time::Duration;

fn payload(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn writer(keys: &BlsKeyPair) -> CertifyingWriter {
    CertifyingWriter::new(
        Arc::new(InMemoryStorageService::new("bench")),
        BlsKeyPair::from_secret(&keys.secret_bytes()).unwrap(),
        CertifyingWriterSettings::default(),
        None,
    )
    .unwrap()
}

fn bench_certifying_write(c: &mut Criterion) {
    let rt = runtime();
    let keys = BlsKeyPair::from_seed(&[1; 32]).unwrap();
    let writer = writer(&keys);

    let mut group = c.benchmark_group("da-certifying-write");
    group.measurement_time(Duration::from_secs(10));
    for size in [1_024usize, 64 * 1_024, 1_024 * 1_024] {
        let data = payload(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("store", size), &data, |b, data| {
            b.to_async(&rt)
                .iter(|| async { black_box(writer.store(data, u64::MAX).await.unwrap()) })
        });
    }
    group.finish();
}

fn bench_certificate_validation(c: &mut Criterion) {
    let rt = runtime();
    let keys = BlsKeyPair::from_seed(&[1; 32]).unwrap();
    let writer = Arc::new(writer(&keys));
    let data = payload(4_096);
    let cert = rt.block_on(writer.store(&data, u64::MAX)).unwrap();

    let chain = Arc::new(InMemoryChain::new());
    chain.set_committee(CommitteeInfo {
        height: 0,
        members: vec![keys.public_key().to_bytes()],
        quorum: 1,
    });
    let reader = ChainValidatingReader::new(
        writer,
        chain,
        ValidationSettings::default(),
        Arc::new(ManualClock::new(0)),
    );

    c.bench_function("da-validated-read", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(reader.retrieve(cert.clone().into()).await.unwrap()) })
    });
}

fn bench_redundant_write(c: &mut Criterion) {
    let rt = runtime();
    let replicas: Vec<Arc<dyn StorageService>> = (0..3)
        .map(|i| Arc::new(InMemoryStorageService::new(format!("replica-{}", i))) as Arc<dyn StorageService>)
        .collect();
    let redundant = RedundantStorageService::new(replicas).unwrap();
    let data = payload(16 * 1_024);

    c.bench_function("da-redundant-put-3", |b| {
        b.to_async(&rt)
            .iter(|| async { redundant.put(black_box(&data), u64::MAX).await.unwrap() })
    });
}

fn bench_signature_aggregation(c: &mut Criterion) {
    let message = Certificate::signable_message(&DataHash::of(b"batch"), 1_000);
    let mut group = c.benchmark_group("da-aggregation");
    for committee in [4usize, 16, 64] {
        let partials: Vec<[u8; 96]> = (0..committee)
            .map(|i| {
                BlsKeyPair::from_seed(&[i as u8; 32])
                    .unwrap()
                    .sign(&message)
                    .to_bytes()
            })
            .collect();
        group.throughput(Throughput::Elements(committee as u64));
        group.bench_with_input(
            BenchmarkId::new("aggregate", committee),
            &partials,
            |b, partials| b.iter(|| black_box(aggregate_signatures(partials).unwrap())),
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_certifying_write,
    bench_certificate_validation,
    bench_redundant_write,
    bench_signature_aggregation
);
criterion_main!(benches);
