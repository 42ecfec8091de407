//! # Deployment Flow
//!
//! A stateful program only learns its on-chain id after deployment, so a
//! bundle that references it is built twice:
//!
//! 1. **First build**: everything that does not need the id is compiled;
//!    slots that do are reported open
//! 2. **Deploy**: the stateful artifact is persisted and submitted in pages
//! 3. **Second build**: the id is bound; the session serves unchanged units
//!    from cache and only the dependents are recompiled

#[cfg(test)]
mod tests {
    use qc_precompile::codec;
    use qc_precompile::prelude::*;

    const POOL_ID: u64 = 4_242;

    fn bundle_graph() -> UnitGraph {
        UnitGraph::new()
            .with(
                UnitDescriptor::stateful("Pool")
                    .source("#pragma version 8\npushint 0\nglobal_get\npushint 1\nadd\nreturn")
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .with(
                UnitDescriptor::signature("Delegate")
                    .source(
                        "#pragma version 8\n\
                         pushint TMPL_pool_id @pool_id\n\
                         pushbytes TMPL_pool_hash\n\
                         concat\n\
                         sha512_256\n\
                         return",
                    )
                    .child("Pool")
                    .variable(TemplateVariable::uint("pool_id"))
                    .variable(TemplateVariable::bytes("pool_hash", 32).from_child_hash("Pool"))
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .with(
                UnitDescriptor::stateful("Bundle")
                    .source(
                        "#pragma version 8\n\
                         pushbytes CHILD_Delegate\n\
                         pop\n\
                         pushbytes TMPL_delegate_addr\n\
                         global_put\n\
                         pushint 1\n\
                         return",
                    )
                    .child("Pool")
                    .child("Delegate")
                    .variable(
                        TemplateVariable::bytes("delegate_addr", 32).from_child_address("Delegate"),
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap()
    }

    /// Stands in for the chain: persists the program, submits it page by
    /// page and returns the assigned id.
    fn deploy(engine: &PrecompileEngine<CountingCompiler<LineAssembler>>, artifact: &CompiledArtifact) -> u64 {
        let stored = codec::to_bytes(artifact).unwrap();
        let restored = codec::from_bytes(&stored).unwrap();
        assert_eq!(&restored, artifact);

        let submitted: Vec<u8> = engine.pages(&restored).concat();
        assert_eq!(submitted, artifact.bytecode);
        POOL_ID
    }

    #[test]
    fn test_second_build_after_deployment() {
        let graph = bundle_graph();
        let config = PrecompileConfig {
            page_size: 8,
            ..PrecompileConfig::default()
        };
        let engine = PrecompileEngine::with_config(CountingCompiler::new(LineAssembler::new()), config);
        let session = BuildSession::new();

        // First build: Delegate still waits for the pool id.
        let first = engine
            .build_in_session(&session, &graph, "Bundle", &ExternalBindings::new())
            .unwrap();
        let delegate = first.artifact("Delegate").unwrap();
        assert!(delegate.is_template());
        assert_eq!(delegate.address, None);
        let open: Vec<(&str, &str)> = first
            .unresolved()
            .iter()
            .map(|s| (s.unit.as_str(), s.variable.as_str()))
            .collect();
        assert_eq!(open, vec![("Delegate", "pool_id"), ("Bundle", "delegate_addr")]);

        let pool_id = deploy(&engine, first.artifact("Pool").unwrap());

        // Second build in the same session.
        let bindings = ExternalBindings::new().with("Delegate.pool_id", pool_id);
        let second = engine
            .build_in_session(&session, &graph, "Bundle", &bindings)
            .unwrap();

        assert_eq!(second.stats.cache_hits, 1);
        assert_eq!(second.stats.compiled, 2);
        assert_eq!(engine.compiler().calls(), 5);

        let delegate = second.artifact("Delegate").unwrap();
        let address = delegate.address.expect("closed signature");
        assert!(second.unresolved().is_empty());
        assert_eq!(second.root.slot_bytes("delegate_addr"), Some(&address.as_bytes()[..]));
        assert_eq!(delegate.slot_bytes("pool_id"), Some(&POOL_ID.to_be_bytes()[..]));
    }

    #[test]
    fn test_populating_template_matches_rebuild() {
        let graph = bundle_graph();
        let engine = PrecompileEngine::new(CountingCompiler::new(LineAssembler::new()));

        let template = engine
            .build(&graph, "Delegate", &ExternalBindings::new())
            .unwrap()
            .root;
        let slot = template.offset_of("pool_id").unwrap();
        assert!(!slot.resolved);

        // The template survives a JSON round trip before being populated.
        let json = codec::to_json(&template).unwrap();
        let restored = codec::from_json(&json).unwrap();
        let populated = restored
            .populate(&ExternalBindings::new().with("pool_id", POOL_ID))
            .unwrap();

        let rebuilt = engine
            .build(&graph, "Delegate", &ExternalBindings::new().with("pool_id", POOL_ID))
            .unwrap()
            .root;
        assert_eq!(populated.bytecode, rebuilt.bytecode);
        assert_eq!(populated.content_hash, rebuilt.content_hash);
        assert_eq!(populated.address, rebuilt.address);
        assert_eq!(rebuilt.offset_of("pool_id").unwrap().offset, slot.offset);
    }

    #[test]
    fn test_deploy_rejects_oversized_id() {
        let graph = bundle_graph();
        let engine = PrecompileEngine::new(LineAssembler::new());
        let template = engine
            .build(&graph, "Delegate", &ExternalBindings::new())
            .unwrap()
            .root;

        let too_wide = ExternalBindings::new().with("pool_id", U256::MAX);
        assert!(matches!(
            template.populate(&too_wide),
            Err(PrecompileError::WidthMismatch { expected: 8, actual: 32, .. })
        ));
    }
}
