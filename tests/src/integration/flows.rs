//! # Integration Test Flows
//!
//! Decorators composed by hand across crates, checking the properties the
//! node relies on:
//!
//! 1. **Certify then validate**: a certifying writer's output passes the
//!    chain-validating reader and returns the stored bytes
//! 2. **Retention**: re-storing never shortens an expiration
//! 3. **Redundancy**: a failing replica fails the write until it recovers
//! 4. **Fallback**: backup-only content is served and backfilled
//! 5. **Quorum**: REST reads and remote stores need `Q` agreeing members
//! 6. **Background sync**: replication and eager fallback converge

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::fixtures::{readers_of, Committee, LocalSigner, SignerBehavior};

    use da_01_storage::test_utils::ScriptedStorage;
    use da_01_storage::{
        CacheSettings, CachingStorageService, EagerSyncSettings, FallbackSettings,
        FallbackStorageService, InMemoryStorageService, IterableStorageService,
        LruStorageService, RedundantStorageService, RegularSyncStorage, ReplicationSettings,
        SyncingFallbackStorageService,
    };
    use da_02_rest_aggregator::{
        QuorumRestAggregator, QuorumStoreAggregator, RestAggregatorSettings,
        StoreAggregatorSettings,
    };
    use da_03_certification::{
        CertifyingWriter, CertifyingWriterSettings, ChainValidatingReader, ValidationSettings,
    };
    use shared_crypto::{verify_aggregate, BlsKeyPair};
    use shared_types::{
        BatchCommitment, DaError, DaReader, DaWriter, DataHash, InMemoryChain, IterableStorage,
        ManualClock, RetrieveKey, StorageService, TimeSource,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const NOW: u64 = 10_000;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(NOW))
    }

    fn chain_with(committee: &Committee) -> Arc<InMemoryChain> {
        let chain = Arc::new(InMemoryChain::new());
        chain.set_committee(committee.info.clone());
        chain
    }

    fn writer_for(
        committee: &Committee,
        index: usize,
        storage: Arc<dyn StorageService>,
    ) -> CertifyingWriter {
        let keys = BlsKeyPair::from_secret(&committee.keys[index].secret_bytes()).unwrap();
        CertifyingWriter::new(
            storage,
            keys,
            CertifyingWriterSettings {
                signer_index: index,
                ..Default::default()
            },
            None,
        )
        .unwrap()
    }

    fn fallback_settings(ignore_write_errors: bool) -> FallbackSettings {
        FallbackSettings {
            retention_period: Duration::from_secs(3_600),
            ignore_write_errors,
        }
    }

    // =============================================================================
    // CERTIFY THEN VALIDATE
    // =============================================================================

    #[tokio::test]
    async fn test_certified_payload_round_trips_through_validation() {
        let committee = Committee::new(1, 1, 0);
        let storage = Arc::new(InMemoryStorageService::new("local"));
        let writer = Arc::new(writer_for(&committee, 0, storage));

        let cert = writer.store(b"batch-1", NOW + 600).await.unwrap();
        assert_eq!(cert.data_hash, DataHash::of(b"batch-1"));
        assert!(verify_aggregate(
            &committee.info.members,
            cert.signers_mask,
            &cert.message(),
            &cert.signature
        )
        .is_ok());

        let reader = ChainValidatingReader::new(
            writer,
            chain_with(&committee),
            ValidationSettings::default(),
            clock(),
        );
        assert_eq!(reader.retrieve(cert.into()).await.unwrap(), b"batch-1");
    }

    #[tokio::test]
    async fn test_non_member_bit_rejected_without_touching_storage() {
        let committee = Committee::new(3, 2, 0);
        let storage = Arc::new(ScriptedStorage::new("local"));
        storage.put(b"payload", NOW + 600).await.unwrap();
        storage.reset_counters();

        let cert = committee.certify(b"payload", NOW + 600, &[0, 1], 1 << 7);
        let reader = ChainValidatingReader::new(
            storage.clone(),
            chain_with(&committee),
            ValidationSettings::default(),
            clock(),
        );

        let err = reader.retrieve(cert.into()).await.unwrap_err();
        assert!(matches!(err, DaError::CertificateInvalid { .. }));
        assert_eq!(storage.gets(), 0);
    }

    #[tokio::test]
    async fn test_below_committee_quorum_rejected() {
        let committee = Committee::new(3, 2, 0);
        let storage = Arc::new(InMemoryStorageService::new("local"));
        storage.put(b"payload", NOW + 600).await.unwrap();

        let cert = committee.certify(b"payload", NOW + 600, &[2], 0);
        let reader = ChainValidatingReader::new(
            storage,
            chain_with(&committee),
            ValidationSettings::default(),
            clock(),
        );

        let err = reader.retrieve(RetrieveKey::Certificate(cert)).await.unwrap_err();
        assert!(matches!(err, DaError::CertificateInvalid { .. }));
    }

    // =============================================================================
    // RETENTION
    // =============================================================================

    #[tokio::test]
    async fn test_restore_keeps_longest_retention() {
        let committee = Committee::new(1, 1, 0);
        let storage = Arc::new(ScriptedStorage::new("local"));
        let writer = writer_for(&committee, 0, storage.clone());
        let hash = DataHash::of(b"same bytes");

        writer.store(b"same bytes", NOW + 1_000).await.unwrap();
        writer.store(b"same bytes", NOW + 100).await.unwrap();
        assert_eq!(storage.expiration_of(&hash), Some(NOW + 1_000));

        writer.store(b"same bytes", NOW + 5_000).await.unwrap();
        assert_eq!(storage.expiration_of(&hash), Some(NOW + 5_000));
    }

    // =============================================================================
    // REDUNDANCY
    // =============================================================================

    #[tokio::test]
    async fn test_redundant_write_fails_then_succeeds_after_recovery() {
        let a = Arc::new(ScriptedStorage::new("a"));
        let b = Arc::new(ScriptedStorage::new("b"));
        let redundant = RedundantStorageService::new(vec![
            a.clone() as Arc<dyn StorageService>,
            b.clone() as Arc<dyn StorageService>,
        ])
        .unwrap();
        let hash = DataHash::of(b"replicated");

        b.fail_puts(true);
        assert!(redundant.put(b"replicated", NOW + 60).await.is_err());

        b.fail_puts(false);
        redundant.put(b"replicated", NOW + 60).await.unwrap();
        assert!(a.contains(&hash));
        assert!(b.contains(&hash));
    }

    #[tokio::test]
    async fn test_redundant_read_skips_failing_replica() {
        let a = Arc::new(ScriptedStorage::new("a"));
        let b = Arc::new(ScriptedStorage::new("b"));
        let redundant = RedundantStorageService::new(vec![
            a.clone() as Arc<dyn StorageService>,
            b.clone() as Arc<dyn StorageService>,
        ])
        .unwrap();
        redundant.put(b"replicated", NOW + 60).await.unwrap();

        a.fail_gets(true);
        let data = redundant.get_by_hash(&DataHash::of(b"replicated")).await.unwrap();
        assert_eq!(data, b"replicated");
    }

    // =============================================================================
    // FALLBACK
    // =============================================================================

    #[tokio::test]
    async fn test_backup_only_content_is_backfilled() {
        let primary = Arc::new(ScriptedStorage::new("primary"));
        let backup = Arc::new(ScriptedStorage::new("backup"));
        backup.put(b"only remote", NOW + 600).await.unwrap();
        backup.reset_counters();

        let fallback = FallbackStorageService::new(
            primary.clone(),
            backup.clone(),
            fallback_settings(false),
            clock(),
        );
        let hash = DataHash::of(b"only remote");

        assert_eq!(fallback.get_by_hash(&hash).await.unwrap(), b"only remote");
        assert!(primary.contains(&hash));
        assert_eq!(backup.gets(), 1);

        assert_eq!(fallback.get_by_hash(&hash).await.unwrap(), b"only remote");
        assert_eq!(backup.gets(), 1);
    }

    #[tokio::test]
    async fn test_ignoring_write_errors_skips_backfill() {
        let primary = Arc::new(ScriptedStorage::new("primary"));
        let backup = Arc::new(ScriptedStorage::new("backup"));
        backup.put(b"only remote", NOW + 600).await.unwrap();
        backup.reset_counters();

        let fallback = FallbackStorageService::new(
            primary.clone(),
            backup.clone(),
            fallback_settings(true),
            clock(),
        );
        let hash = DataHash::of(b"only remote");

        fallback.get_by_hash(&hash).await.unwrap();
        fallback.get_by_hash(&hash).await.unwrap();
        assert!(!primary.contains(&hash));
        assert_eq!(backup.gets(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_backup_is_never_served() {
        let primary = Arc::new(ScriptedStorage::new("primary"));
        let backup = Arc::new(ScriptedStorage::new("backup"));
        backup.put(b"remote", NOW + 600).await.unwrap();
        backup.corrupt_reads(true);

        let fallback =
            FallbackStorageService::new(primary.clone(), backup, fallback_settings(false), clock());
        let err = fallback.get_by_hash(&DataHash::of(b"remote")).await.unwrap_err();
        assert!(matches!(err, DaError::ContentMismatch { .. }));
        assert!(primary.is_empty());
    }

    // =============================================================================
    // QUORUM
    // =============================================================================

    #[tokio::test]
    async fn test_rest_quorum_two_of_three_with_one_corrupt() {
        let endpoints: Vec<Arc<ScriptedStorage>> =
            (0..3).map(|i| Arc::new(ScriptedStorage::new(format!("peer-{}", i)))).collect();
        for endpoint in &endpoints {
            endpoint.put(b"agreed", NOW + 600).await.unwrap();
        }
        endpoints[2].corrupt_reads(true);

        let aggregator = QuorumRestAggregator::new(
            endpoints.iter().map(|e| e.clone() as Arc<dyn DaReader>).collect(),
            RestAggregatorSettings {
                quorum: 2,
                request_timeout: Duration::from_millis(500),
                ..Default::default()
            },
        )
        .unwrap();

        let data = aggregator.get_by_hash(&DataHash::of(b"agreed")).await.unwrap();
        assert_eq!(data, b"agreed");
    }

    #[tokio::test]
    async fn test_rest_quorum_not_reached_when_only_one_answers_in_time() {
        let endpoints: Vec<Arc<ScriptedStorage>> =
            (0..3).map(|i| Arc::new(ScriptedStorage::new(format!("peer-{}", i)))).collect();
        for endpoint in &endpoints {
            endpoint.put(b"slow", NOW + 600).await.unwrap();
        }
        endpoints[1].delay_gets(Duration::from_secs(5));
        endpoints[2].fail_gets(true);

        let aggregator = QuorumRestAggregator::new(
            endpoints.iter().map(|e| e.clone() as Arc<dyn DaReader>).collect(),
            RestAggregatorSettings {
                quorum: 2,
                request_timeout: Duration::from_millis(50),
                ..Default::default()
            },
        )
        .unwrap();

        let err = aggregator.get_by_hash(&DataHash::of(b"slow")).await.unwrap_err();
        assert!(matches!(err, DaError::QuorumNotReached { .. }));
    }

    #[tokio::test]
    async fn test_remote_store_aggregates_valid_certificate() {
        let committee = Committee::new(3, 2, 0);
        let signers: Vec<Arc<LocalSigner>> = vec![
            Arc::new(LocalSigner::new(&committee, 0, SignerBehavior::Honest)),
            Arc::new(LocalSigner::new(&committee, 1, SignerBehavior::Fail)),
            Arc::new(LocalSigner::new(&committee, 2, SignerBehavior::Honest)),
        ];
        let aggregator = QuorumStoreAggregator::new(
            signers.iter().map(|s| s.endpoint_for(&committee)).collect(),
            StoreAggregatorSettings {
                quorum: 2,
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let cert = aggregator.store(b"posted batch", NOW + 600).await.unwrap();
        assert_eq!(cert.signers_mask, 0b101);

        // The members' own stores now serve the batch through a validating reader.
        let rest = QuorumRestAggregator::new(
            readers_of(&signers),
            RestAggregatorSettings {
                quorum: 1,
                ..Default::default()
            },
        )
        .unwrap();
        let reader = ChainValidatingReader::new(
            Arc::new(rest),
            chain_with(&committee),
            ValidationSettings {
                quorum_threshold: 2,
                ..Default::default()
            },
            clock(),
        );
        assert_eq!(reader.retrieve(cert.into()).await.unwrap(), b"posted batch");
    }

    #[tokio::test]
    async fn test_conflicting_quorums_reject_the_round() {
        let committee = Committee::new(4, 2, 0);
        let signers: Vec<Arc<LocalSigner>> = vec![
            Arc::new(LocalSigner::new(&committee, 0, SignerBehavior::ShiftExpiration(60))),
            Arc::new(LocalSigner::new(&committee, 1, SignerBehavior::ShiftExpiration(60))),
            Arc::new(LocalSigner::new(&committee, 2, SignerBehavior::Delayed(30))),
            Arc::new(LocalSigner::new(&committee, 3, SignerBehavior::Delayed(30))),
        ];
        let aggregator = QuorumStoreAggregator::new(
            signers.iter().map(|s| s.endpoint_for(&committee)).collect(),
            StoreAggregatorSettings {
                quorum: 2,
                timeout: Duration::from_secs(2),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let err = aggregator.store(b"contested", NOW + 600).await.unwrap_err();
        assert!(err.to_string().contains("conflicting quorums"));
    }

    // =============================================================================
    // BACKGROUND SYNC
    // =============================================================================

    #[tokio::test]
    async fn test_replication_copies_once_then_is_idle() {
        let clock = clock();
        let source = Arc::new(IterableStorageService::new(Arc::new(
            InMemoryStorageService::new("source"),
        )));
        let destination = Arc::new(ScriptedStorage::new("mirror"));
        for i in 0..5u8 {
            source.put(&[i; 16], NOW + 600).await.unwrap();
        }

        let daemon = RegularSyncStorage::new(
            vec![source.clone() as Arc<dyn IterableStorage>],
            vec![destination.clone() as Arc<dyn StorageService>],
            ReplicationSettings {
                interval: Duration::from_secs(60),
                batch_size: 2,
            },
            clock,
        )
        .unwrap();

        let first = daemon.run_once().await;
        assert_eq!(first.written, 5);
        assert_eq!(destination.len(), 5);

        destination.reset_counters();
        let second = daemon.run_once().await;
        assert_eq!(second.written, 0);
        assert_eq!(destination.puts(), 0);
    }

    #[tokio::test]
    async fn test_eager_fallback_pulls_committed_batches() {
        let committee = Committee::new(1, 1, 0);
        let primary = Arc::new(ScriptedStorage::new("primary"));
        let backup = Arc::new(ScriptedStorage::new("backup"));
        backup.put(b"committed", NOW + 600).await.unwrap();

        let chain = chain_with(&committee);
        chain.push_batch(BatchCommitment {
            height: 1,
            timestamp: NOW,
            certificate: committee.certify(b"committed", NOW + 600, &[0], 0),
        });

        let passive =
            FallbackStorageService::new(primary.clone(), backup, fallback_settings(false), clock());
        let syncing = SyncingFallbackStorageService::new(
            passive,
            Some(chain),
            EagerSyncSettings {
                start_height: 0,
                poll_interval: Duration::from_secs(30),
            },
            clock(),
        )
        .unwrap();

        let report = syncing.sync_once().await.unwrap();
        assert_eq!(report.synced, 1);
        assert!(primary.contains(&DataHash::of(b"committed")));

        let again = syncing.sync_once().await.unwrap();
        assert_eq!(again.examined, 0);
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_reads() {
        let clock = clock();
        let target = Arc::new(ScriptedStorage::new("target"));
        target.put(b"hot", NOW + 600).await.unwrap();
        target.reset_counters();

        let cached = CachingStorageService::new(
            Arc::new(LruStorageService::new(16, clock.clone()).unwrap()),
            target.clone(),
            CacheSettings {
                expiration: Duration::from_secs(3_600),
            },
            clock.clone(),
        );
        let hash = DataHash::of(b"hot");

        for _ in 0..3 {
            assert_eq!(cached.get_by_hash(&hash).await.unwrap(), b"hot");
        }
        assert_eq!(target.gets(), 1);
        assert!(clock.now() >= NOW);
    }
}
