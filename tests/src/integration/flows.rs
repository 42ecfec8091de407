//! # Integration Test Flows
//!
//! Whole-graph builds through the public API:
//!
//! 1. **Root embeds child**: child bytecode and address flow into the parent
//! 2. **Shared sessions**: concurrent builds compile each unit once
//! 3. **Configuration**: TOML and environment overrides drive the engine
//! 4. **Limits**: deep graphs are rejected before anything is compiled

#[cfg(test)]
mod tests {
    use crate::benchmarks::precompile::{chain, layered, seeds};
    use qc_precompile::domain::invariants::{artifact_invariants_hold, invariant_children_first};
    use qc_precompile::domain::services::find_occurrences;
    use qc_precompile::prelude::*;
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Escrow (stateful) embeds a signature `Lock` and checks its address.
    fn escrow_graph() -> UnitGraph {
        UnitGraph::new()
            .with(
                UnitDescriptor::signature("Lock")
                    .source(
                        "#pragma version 8\n\
                         pushbytes TMPL_secret_hash\n\
                         sha256\n\
                         eq\n\
                         pushint TMPL_expiry\n\
                         lt\n\
                         return",
                    )
                    .variable(TemplateVariable::bytes("secret_hash", 32))
                    .variable(TemplateVariable::uint("expiry"))
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .with(
                UnitDescriptor::stateful("Escrow")
                    .source(
                        "#pragma version 8\n\
                         pushbytes CHILD_Lock\n\
                         pop\n\
                         pushbytes TMPL_lock_addr\n\
                         sender\n\
                         eq\n\
                         assert\n\
                         pushbytes TMPL_lock_hash\n\
                         log\n\
                         pushint 1\n\
                         return",
                    )
                    .child("Lock")
                    .variable(TemplateVariable::bytes("lock_addr", 32).from_child_address("Lock"))
                    .variable(TemplateVariable::bytes("lock_hash", 32).from_child_hash("Lock"))
                    .build()
                    .unwrap(),
            )
            .unwrap()
    }

    fn lock_bindings(secret: u8, expiry: u64) -> ExternalBindings {
        ExternalBindings::new()
            .with("Lock.secret_hash", [secret; 32])
            .with("expiry", expiry)
    }

    // =============================================================================
    // INTEGRATION TESTS: ROOT EMBEDS CHILD
    // =============================================================================

    #[test]
    fn test_child_address_and_bytecode_flow_into_parent() {
        init_tracing();
        let graph = escrow_graph();
        let engine = PrecompileEngine::new(LineAssembler::new());
        let output = engine.build(&graph, "Escrow", &lock_bindings(0xAB, 1_700_000_000)).unwrap();

        let lock = output.artifact("Lock").unwrap();
        let escrow = &output.root;
        let address = lock.address.expect("closed signature has an address");

        assert_eq!(address, program_address(&lock.bytecode));
        assert_eq!(escrow.slot_bytes("lock_addr"), Some(&address.as_bytes()[..]));
        assert_eq!(escrow.slot_bytes("lock_hash"), Some(&lock.content_hash.as_bytes()[..]));
        assert_eq!(find_occurrences(&escrow.bytecode, &lock.bytecode).len(), 1);
        assert_eq!(
            lock.slot_bytes("expiry"),
            Some(&1_700_000_000u64.to_be_bytes()[..])
        );

        assert!(invariant_children_first(&output.order, &graph));
        for artifact in output.artifacts.values() {
            assert!(artifact_invariants_hold(artifact));
        }
    }

    #[test]
    fn test_new_secret_changes_every_embedding() {
        let graph = escrow_graph();
        let engine = PrecompileEngine::new(LineAssembler::new());
        let a = engine.build(&graph, "Escrow", &lock_bindings(1, 10)).unwrap();
        let b = engine.build(&graph, "Escrow", &lock_bindings(2, 10)).unwrap();

        assert_ne!(a.artifact("Lock").unwrap().address, b.artifact("Lock").unwrap().address);
        assert_ne!(a.root.slot_bytes("lock_addr"), b.root.slot_bytes("lock_addr"));
        assert_ne!(a.root.slot_bytes("lock_hash"), b.root.slot_bytes("lock_hash"));
        // Same layout, different constants.
        assert_eq!(a.root.bytecode.len(), b.root.bytecode.len());
        assert_eq!(a.root.variable_offsets, b.root.variable_offsets);
    }

    #[test]
    fn test_missing_child_value_leaves_parent_templated() {
        let graph = escrow_graph();
        let engine = PrecompileEngine::new(LineAssembler::new());
        let bindings = ExternalBindings::new().with("expiry", 5u64);
        let output = engine.build(&graph, "Escrow", &bindings).unwrap();

        let lock = output.artifact("Lock").unwrap();
        assert!(lock.is_template());
        assert_eq!(lock.address, None);

        // No address yet, so the parent keeps its own slot open too.
        let open: Vec<(&str, &str)> = output
            .unresolved()
            .iter()
            .map(|s| (s.unit.as_str(), s.variable.as_str()))
            .collect();
        assert_eq!(open, vec![("Lock", "secret_hash"), ("Escrow", "lock_addr")]);
        assert!(output.root.offset_of("lock_hash").unwrap().resolved);
    }

    // =============================================================================
    // INTEGRATION TESTS: SHARED SESSIONS
    // =============================================================================

    #[test]
    fn test_concurrent_builds_share_one_session() {
        let graph = layered(3, 3);
        let engine = PrecompileEngine::new(CountingCompiler::new(LineAssembler::new()));
        let session = BuildSession::new();
        let bindings = seeds(9);

        let roots: Vec<Arc<CompiledArtifact>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..6)
                .map(|_| {
                    scope.spawn(|| {
                        engine
                            .build_in_session(&session, &graph, "Root", &bindings)
                            .unwrap()
                            .root
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(engine.compiler().calls(), graph.len());
        assert!(roots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        let stats = session.stats();
        assert_eq!(stats.misses, graph.len());
        assert_eq!(stats.entries, graph.len());
    }

    #[test]
    fn test_parallel_config_matches_sequential() {
        let graph = layered(4, 3);
        let sequential = PrecompileEngine::new(LineAssembler::new())
            .build(&graph, "Root", &seeds(1))
            .unwrap();

        let config = PrecompileConfig::parse("parallel = true\n").unwrap();
        let parallel = PrecompileEngine::with_config(LineAssembler::new(), config)
            .build(&graph, "Root", &seeds(1))
            .unwrap();

        assert_eq!(sequential.artifacts, parallel.artifacts);
        assert_eq!(sequential.order, parallel.order);
    }

    // =============================================================================
    // INTEGRATION TESTS: CONFIGURATION & LIMITS
    // =============================================================================

    #[test]
    fn test_config_file_limits_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precompile.toml");
        std::fs::write(&path, "max_depth = 4\nfail_fast = true\n").unwrap();
        let config = PrecompileConfig::load(&path).unwrap();
        assert!(config.fail_fast);

        let engine = PrecompileEngine::with_config(CountingCompiler::new(LineAssembler::new()), config);
        assert!(engine.build(&chain(4), "U4", &seeds(0)).is_ok());

        let err = engine.build(&chain(5), "U5", &seeds(0)).unwrap_err();
        assert!(matches!(
            err.first(),
            Some(PrecompileError::DepthExceeded { max: 4, .. })
        ));
        assert!(err.skipped.is_empty());
    }

    #[test]
    fn test_environment_overrides() {
        let config = PrecompileConfig::default().overridden_by(|key| match key {
            "QC_PRECOMPILE_MAX_UNITS" => Some("3".to_string()),
            _ => None,
        })
        .unwrap();
        let engine = PrecompileEngine::with_config(CountingCompiler::new(LineAssembler::new()), config);

        let err = engine.build(&chain(5), "U5", &seeds(0)).unwrap_err();
        assert!(matches!(
            err.first(),
            Some(PrecompileError::GraphTooLarge { max: 3, .. })
        ));
        assert_eq!(engine.compiler().calls(), 0);
    }
}
