use anyhow::anyhow;
use esignflow::model::{BlockType, Dimensions, Position, SignatureTypeStatus};
use esignflow::registry::{BlockRegistry, LegacyPlacement, RegistryConfig, RegistrySource};
use esignflow::template::{BlockPlacement, TemplateConfig};
use esignflow::type_cache::SignatureTypeCache;

fn placement(page: i64, x: f64, y: f64, block_type: BlockType, required: bool) -> BlockPlacement {
    BlockPlacement {
        default_page: page,
        default_x: x,
        default_y: y,
        default_width: 180.0,
        default_height: 40.0,
        block_type,
        required,
    }
}

#[test]
fn builds_one_block_per_template_entry() {
    let config = TemplateConfig::new()
        .with_block("sig1", placement(1, 10.0, 80.0, BlockType::Signature, true))
        .with_block("init1", placement(1, 70.0, 90.0, BlockType::Initial, false))
        .with_block("sig2", placement(3, 10.0, 50.0, BlockType::Signature, true));
    let registry = BlockRegistry::from_template(&config, None, &RegistryConfig::default());

    assert_eq!(registry.source(), RegistrySource::Template);
    assert_eq!(registry.len(), 3);
    let ids: Vec<&str> = registry.blocks().iter().map(|b| b.id()).collect();
    assert_eq!(ids, vec!["sig1", "init1", "sig2"]);
    assert!(registry.blocks().iter().all(|b| !b.is_completed()));

    let sig2 = registry.find("sig2").unwrap();
    assert_eq!(sig2.page(), 3);
    assert_eq!(sig2.position(), Position::new(10.0, 50.0));
    assert_eq!(sig2.dimensions(), Dimensions::new(180.0, 40.0));
    assert!(sig2.is_required());
    assert!(!registry.find("init1").unwrap().is_required());
}

#[test]
fn empty_template_uses_legacy_placement() {
    let legacy = LegacyPlacement {
        page: 2,
        position: Position::new(40.0, 75.0),
    };
    let registry =
        BlockRegistry::from_template(&TemplateConfig::new(), Some(&legacy), &RegistryConfig::default());

    assert_eq!(registry.source(), RegistrySource::Legacy);
    assert_eq!(registry.len(), 1);
    let b = &registry.blocks()[0];
    assert_eq!(b.page(), 2);
    assert_eq!(b.position(), Position::new(40.0, 75.0));
    assert_eq!(b.dimensions(), Dimensions::new(200.0, 50.0));
    assert_eq!(b.block_type(), &BlockType::Signature);
    assert!(b.is_required());
}

#[test]
fn provider_failure_uses_fallback_block() {
    let registry = BlockRegistry::build(
        Err(anyhow!("connection refused")),
        None,
        &RegistryConfig::default(),
    );

    assert_eq!(registry.source(), RegistrySource::Fallback);
    assert_eq!(registry.len(), 1);
    let b = &registry.blocks()[0];
    assert_eq!(b.id(), "fallback_signature");
    assert_eq!(b.page(), 1);
    assert_eq!(b.position(), Position::new(25.0, 90.0));
    assert_eq!(b.dimensions(), Dimensions::new(200.0, 50.0));
    assert_eq!(b.block_type(), &BlockType::Signature);
    assert!(b.is_required());
    assert!(!b.is_completed());
}

#[test]
fn empty_template_without_legacy_uses_fallback_block() {
    let registry = BlockRegistry::from_template(&TemplateConfig::new(), None, &RegistryConfig::default());
    assert_eq!(registry.source(), RegistrySource::Fallback);
    assert_eq!(registry.blocks()[0].id(), "fallback_signature");
}

#[test]
fn out_of_range_placements_are_clamped() {
    let mut p = placement(0, -5.0, 130.0, BlockType::Signature, true);
    p.default_width = 0.0;
    let config = TemplateConfig::new().with_block("odd", p);
    let registry = BlockRegistry::from_template(&config, None, &RegistryConfig::default());

    let b = &registry.blocks()[0];
    assert_eq!(b.page(), 1);
    assert_eq!(b.position(), Position::new(0.0, 100.0));
    assert_eq!(b.dimensions(), Dimensions::new(200.0, 50.0));
}

#[test]
fn distinct_types_get_fresh_status_entries() {
    let config = TemplateConfig::new()
        .with_block("a", placement(1, 0.0, 0.0, BlockType::Initial, false))
        .with_block("b", placement(1, 0.0, 10.0, BlockType::Signature, true))
        .with_block("c", placement(2, 0.0, 0.0, BlockType::Initial, false))
        .with_block("d", placement(2, 0.0, 20.0, BlockType::from("date"), false));
    let registry = BlockRegistry::from_template(&config, None, &RegistryConfig::default());

    assert_eq!(
        registry.types(),
        vec![
            BlockType::Initial,
            BlockType::Signature,
            BlockType::Other("date".to_string())
        ]
    );
    assert_eq!(registry.count_of_type(&BlockType::Initial), 2);

    let cache = SignatureTypeCache::for_types(registry.types());
    let statuses = cache.statuses();
    assert_eq!(statuses.len(), 3);
    assert!(
        statuses
            .iter()
            .all(|(_, s)| *s == SignatureTypeStatus { modal_shown: false, captured: false })
    );
}
