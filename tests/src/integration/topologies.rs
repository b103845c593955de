//! # Configured Topologies
//!
//! Whole graphs built from TOML through `DaNode`, one per role, with
//! in-process committee members standing in for remote peers.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::fixtures::{readers_of, signers_of, Committee, LocalSigner, SignerBehavior};

    use node_runtime::{
        build_graph, Collaborators, DaNode, DataAvailabilityConfig, NodeRole, PlanStep,
    };
    use shared_crypto::verify_aggregate;
    use da_01_storage::test_utils::ScriptedStorage;
    use da_01_storage::InMemoryStorageService;
    use shared_types::{
        ComponentStatus, DaError, DaReader, DataHash, InMemoryChain, Lifecycle, ManualClock,
        RetrieveKey, StorageService,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const NOW: u64 = 50_000;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(NOW))
    }

    fn parse(toml: &str) -> DataAvailabilityConfig {
        DataAvailabilityConfig::parse(toml).unwrap()
    }

    struct Refuses;

    #[async_trait]
    impl Lifecycle for Refuses {
        fn component_name(&self) -> String {
            "refuses".into()
        }

        async fn start(&self) -> Result<(), DaError> {
            Err(DaError::Configuration("refusing to start".into()))
        }

        async fn stop(&self) -> Result<(), DaError> {
            Ok(())
        }
    }

    // =============================================================================
    // ROLE RULES
    // =============================================================================

    #[tokio::test]
    async fn test_node_with_signing_key_is_rejected() {
        let committee = Committee::new(1, 1, 0);
        let config = parse(&format!(
            r#"
            enable = true
            role = "node"
            [[backends]]
            name = "mem"
            kind = "memory"
            [signing]
            key_material = "{}"
            "#,
            committee.secret_hex(0)
        ));

        let err = DaNode::build(&config, &Collaborators::new()).await.unwrap_err();
        assert!(matches!(err, DaError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_batch_poster_rejects_local_backends() {
        let config = parse(
            r#"
            enable = true
            role = "batch-poster"
            [[backends]]
            name = "mem"
            kind = "memory"
            [rest_aggregator]
            enable = true
            urls = ["http://a"]
            "#,
        );

        let err = DaNode::build(&config, &Collaborators::new()).await.unwrap_err();
        assert!(matches!(err, DaError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_disabled_config_builds_nothing() {
        let config = parse("enable = false");
        assert!(DaNode::build(&config, &Collaborators::new()).await.unwrap().is_none());
    }

    // =============================================================================
    // SERVER
    // =============================================================================

    #[tokio::test]
    async fn test_signing_server_with_cache_and_validation() {
        let committee = Committee::new(2, 1, 0);
        let config = parse(&format!(
            r#"
            enable = true
            role = "server"
            [[backends]]
            name = "primary"
            kind = "memory"
            [[backends]]
            name = "secondary"
            kind = "memory"
            [signing]
            key_material = "{}"
            signer_index = 1
            [cache]
            enable = true
            kind = "local"
            capacity = 8
            [validation]
            enable = true
            "#,
            committee.secret_hex(1)
        ));
        let chain = Arc::new(InMemoryChain::new());
        chain.set_committee(committee.info.clone());
        let collaborators = Collaborators::new().with_chain(chain).with_clock(clock());

        let node = DaNode::build(&config, &collaborators).await.unwrap().unwrap();
        assert!(node.plan().contains(|s| matches!(s, PlanStep::Redundant { .. })));
        node.start().await.unwrap();

        let cert = node.store(b"rollup batch", Duration::from_secs(3_600)).await.unwrap();
        assert_eq!(cert.signers_mask, 0b10);
        assert_eq!(cert.expiration, NOW + 3_600);
        assert!(verify_aggregate(
            &committee.info.members,
            cert.signers_mask,
            &cert.message(),
            &cert.signature
        )
        .is_ok());

        let hash = cert.data_hash;
        assert_eq!(node.retrieve(cert.into()).await.unwrap(), b"rollup batch");

        let err = node.retrieve(RetrieveKey::Hash(hash)).await.unwrap_err();
        assert!(matches!(err, DaError::CertificateInvalid { .. }));

        node.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_local_file_backend_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let committee = Committee::new(1, 1, 0);
        let toml = format!(
            r#"
            enable = true
            role = "server"
            [[backends]]
            name = "disk"
            kind = "local-file"
            [backends.connection]
            data_dir = "{}"
            [signing]
            key_material = "{}"
            "#,
            dir.path().display(),
            committee.secret_hex(0)
        );
        let config = parse(&toml);
        let collaborators = Collaborators::new().with_clock(clock());

        let hash = {
            let node = DaNode::build(&config, &collaborators).await.unwrap().unwrap();
            node.store(b"durable", Duration::from_secs(600)).await.unwrap().data_hash
        };

        let reopened = DaNode::build(&config, &collaborators).await.unwrap().unwrap();
        assert_eq!(reopened.retrieve(hash.into()).await.unwrap(), b"durable");
    }

    // =============================================================================
    // NODE
    // =============================================================================

    #[tokio::test]
    async fn test_node_falls_back_to_committee_and_backfills() {
        let remotes: Vec<Arc<ScriptedStorage>> = (0..2)
            .map(|i| Arc::new(ScriptedStorage::new(format!("member-{}", i))))
            .collect();
        for remote in &remotes {
            remote.put(b"only on committee", NOW + 600).await.unwrap();
        }

        let config = parse(
            r#"
            enable = true
            role = "node"
            [[backends]]
            name = "local"
            kind = "memory"
            [rest_aggregator]
            enable = true
            urls = ["http://member-0", "http://member-1"]
            quorum_threshold = 2
            [fallback]
            enable = true
            "#,
        );
        let collaborators = Collaborators::new()
            .with_remote_readers(
                remotes
                    .iter()
                    .map(|r| r.clone() as Arc<dyn DaReader>)
                    .collect(),
            )
            .with_clock(clock());

        let node = DaNode::build(&config, &collaborators).await.unwrap().unwrap();
        assert_eq!(node.plan().role, NodeRole::Node);
        assert!(!node.can_write());

        let hash = DataHash::of(b"only on committee");
        assert_eq!(node.retrieve(hash.into()).await.unwrap(), b"only on committee");

        // Backfilled: the committee is no longer needed.
        for remote in &remotes {
            remote.fail_gets(true);
        }
        assert_eq!(node.retrieve(hash.into()).await.unwrap(), b"only on committee");
    }

    // =============================================================================
    // BATCH POSTER
    // =============================================================================

    #[tokio::test]
    async fn test_batch_poster_collects_quorum_certificate() {
        let committee = Committee::new(3, 2, 0);
        let members: Vec<Arc<LocalSigner>> = vec![
            Arc::new(LocalSigner::new(&committee, 0, SignerBehavior::Honest)),
            Arc::new(LocalSigner::new(&committee, 1, SignerBehavior::Honest)),
            Arc::new(LocalSigner::new(&committee, 2, SignerBehavior::Fail)),
        ];
        let signers = (0..3)
            .map(|i| {
                format!(
                    "[[store_aggregator.signers]]\nurl = \"http://member-{i}\"\nindex = {i}\npublic_key = \"{}\"\n",
                    committee.public_hex(i)
                )
            })
            .collect::<String>();
        let config = parse(&format!(
            r#"
            enable = true
            role = "batch-poster"
            [rest_aggregator]
            enable = true
            urls = ["http://member-0", "http://member-1", "http://member-2"]
            quorum_threshold = 1
            [store_aggregator]
            enable = true
            quorum_threshold = 2
            {}
            "#,
            signers
        ));
        let collaborators = Collaborators::new()
            .with_remote_readers(readers_of(&members))
            .with_remote_signers(signers_of(&members))
            .with_clock(clock());

        let node = DaNode::build(&config, &collaborators).await.unwrap().unwrap();
        node.start().await.unwrap();

        let cert = node.store(b"posted", Duration::from_secs(600)).await.unwrap();
        assert_eq!(cert.signers_mask, 0b011);
        assert_eq!(cert.signer_count(), 2);

        assert_eq!(node.retrieve(cert.into()).await.unwrap(), b"posted");
        node.stop().await.unwrap();
    }

    // =============================================================================
    // LIFECYCLE
    // =============================================================================

    #[tokio::test]
    async fn test_eager_fallback_without_chain_fails_before_start() {
        let config = parse(
            r#"
            enable = true
            role = "server"
            [[backends]]
            name = "local"
            kind = "memory"
            [rest_aggregator]
            enable = true
            urls = ["http://peer"]
            [fallback]
            enable = true
            eager = true
            "#,
        );
        let peer: Arc<dyn DaReader> = Arc::new(InMemoryStorageService::new("peer"));
        let collaborators = Collaborators::new().with_remote_readers(vec![peer]);

        let err = DaNode::build(&config, &collaborators).await.unwrap_err();
        assert!(matches!(err, DaError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_start_failure_rolls_back_built_components() {
        let config = parse(
            r#"
            enable = true
            role = "server"
            [[backends]]
            name = "source"
            kind = "memory"
            sync_from = true
            [[backends]]
            name = "mirror"
            kind = "memory"
            sync_to = true
            [replication]
            enable = true
            interval_secs = 3600
            "#,
        );
        let graph = build_graph(&config, &Collaborators::new()).await.unwrap().unwrap();
        graph.lifecycle.register(Arc::new(Refuses));

        let err = graph.lifecycle.start().await.unwrap_err();
        assert_eq!(err.component, "refuses");

        let statuses = graph.lifecycle.statuses();
        assert_eq!(statuses[0].0, "regular-sync");
        assert_eq!(statuses[0].1, ComponentStatus::Stopped);
        assert_eq!(statuses[1].1, ComponentStatus::Failed);
    }
}
