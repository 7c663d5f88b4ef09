use esignflow::EsignError;
use esignflow::capture::{
    CaptureFlow, CaptureInput, CaptureState, ConfirmOutcome, Interaction, MissingInput,
};
use esignflow::model::BlockType;
use esignflow::registry::{BlockRegistry, RegistryConfig};
use esignflow::template::{BlockPlacement, TemplateConfig};
use esignflow::type_cache::SignatureTypeCache;

fn placement(page: i64, y: f64, block_type: BlockType) -> BlockPlacement {
    BlockPlacement {
        default_page: page,
        default_x: 10.0,
        default_y: y,
        default_width: 200.0,
        default_height: 50.0,
        block_type,
        required: true,
    }
}

fn setup() -> (BlockRegistry, SignatureTypeCache, CaptureFlow) {
    let template = TemplateConfig::new()
        .with_block("A", placement(1, 10.0, BlockType::Signature))
        .with_block("B", placement(1, 50.0, BlockType::Signature))
        .with_block("C", placement(2, 10.0, BlockType::Signature))
        .with_block("I", placement(2, 80.0, BlockType::Initial));
    let registry = BlockRegistry::from_template(&template, None, &RegistryConfig::default());
    let cache = SignatureTypeCache::for_types(registry.types());
    (registry, cache, CaptureFlow::default())
}

#[test]
fn first_interaction_prompts() {
    let (mut registry, mut cache, mut flow) = setup();
    let outcome = flow.interact(&mut registry, &mut cache, "A").unwrap();
    let Interaction::Prompted(request) = outcome else {
        panic!("expected prompt");
    };
    assert_eq!(request.block_id, "A");
    assert_eq!(request.block_type, BlockType::Signature);
    assert!(request.offer_apply_to_all);
    assert_eq!(request.incomplete_of_type, 3);
    assert!(matches!(flow.state(), CaptureState::Prompting(_)));
    assert!(cache.status(&BlockType::Signature).modal_shown);
    assert!(!cache.status(&BlockType::Signature).captured);
}

#[test]
fn single_block_type_does_not_offer_apply_to_all() {
    let (mut registry, mut cache, mut flow) = setup();
    let Interaction::Prompted(request) = flow.interact(&mut registry, &mut cache, "I").unwrap()
    else {
        panic!("expected prompt");
    };
    assert!(!request.offer_apply_to_all);
    assert_eq!(request.label, "Type your initials");
}

#[test]
fn unmet_preconditions_keep_prompt_open() {
    let (mut registry, mut cache, mut flow) = setup();
    flow.interact(&mut registry, &mut cache, "A").unwrap();

    let empty = CaptureInput::new("   ").with_consent();
    assert_eq!(
        flow.confirm(&mut registry, &mut cache, &empty).unwrap(),
        ConfirmOutcome::Pending(MissingInput::Text)
    );
    let no_consent = CaptureInput::new("John Doe");
    assert_eq!(
        flow.confirm(&mut registry, &mut cache, &no_consent).unwrap(),
        ConfirmOutcome::Pending(MissingInput::Consent)
    );
    assert!(flow.prompt().is_some());
    assert!(registry.blocks().iter().all(|b| !b.is_completed()));
    assert!(cache.lookup(&BlockType::Signature).is_none());
}

#[test]
fn cancel_returns_to_idle_without_changes() {
    let (mut registry, mut cache, mut flow) = setup();
    flow.interact(&mut registry, &mut cache, "A").unwrap();
    let request = flow.cancel().unwrap();
    assert_eq!(request.block_id, "A");
    assert_eq!(flow.state(), &CaptureState::Idle);
    assert!(!registry.find("A").unwrap().is_completed());
    assert!(matches!(flow.cancel(), Err(EsignError::NoPromptOpen)));
}

#[test]
fn second_block_of_same_type_is_auto_applied() {
    let (mut registry, mut cache, mut flow) = setup();
    flow.interact(&mut registry, &mut cache, "A").unwrap();
    let outcome = flow
        .confirm(
            &mut registry,
            &mut cache,
            &CaptureInput::new("  John Doe ").with_consent(),
        )
        .unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Completed {
            block_id: "A".into(),
            block_type: BlockType::Signature,
            applied_to_others: 0,
        }
    );
    let a = registry.find("A").unwrap();
    assert_eq!(a.signature_text(), Some("John Doe"));
    assert!(!a.is_auto_applied());

    let outcome = flow.interact(&mut registry, &mut cache, "C").unwrap();
    assert_eq!(outcome, Interaction::AutoApplied { block_id: "C".into() });
    let c = registry.find("C").unwrap();
    assert_eq!(c.signature_text(), Some("John Doe"));
    assert!(c.is_auto_applied());
    assert!(!registry.find("B").unwrap().is_completed());
    assert_eq!(flow.state(), &CaptureState::Idle);
}

#[test]
fn apply_to_all_completes_every_block_of_type() {
    let (mut registry, mut cache, mut flow) = setup();
    flow.interact(&mut registry, &mut cache, "B").unwrap();
    let outcome = flow
        .confirm(
            &mut registry,
            &mut cache,
            &CaptureInput::new("John Doe").with_consent().apply_to_all(),
        )
        .unwrap();
    assert!(matches!(
        outcome,
        ConfirmOutcome::Completed { applied_to_others: 2, .. }
    ));
    for id in ["A", "B", "C"] {
        assert_eq!(registry.find(id).unwrap().signature_text(), Some("John Doe"));
    }
    assert!(!registry.find("B").unwrap().is_auto_applied());
    assert!(registry.find("A").unwrap().is_auto_applied());
    assert!(!registry.find("I").unwrap().is_completed());
}

#[test]
fn completed_blocks_and_unknown_ids() {
    let (mut registry, mut cache, mut flow) = setup();
    flow.interact(&mut registry, &mut cache, "A").unwrap();
    assert!(matches!(
        flow.interact(&mut registry, &mut cache, "B"),
        Err(EsignError::PromptAlreadyOpen(id)) if id == "A"
    ));
    flow.confirm(
        &mut registry,
        &mut cache,
        &CaptureInput::new("John Doe").with_consent(),
    )
    .unwrap();

    assert_eq!(
        flow.interact(&mut registry, &mut cache, "A").unwrap(),
        Interaction::AlreadyCompleted { block_id: "A".into() }
    );
    assert!(matches!(
        flow.interact(&mut registry, &mut cache, "nope"),
        Err(EsignError::UnknownBlock(_))
    ));
    assert!(matches!(
        flow.confirm(&mut registry, &mut cache, &CaptureInput::new("x").with_consent()),
        Err(EsignError::NoPromptOpen)
    ));
}

#[test]
fn blank_capture_never_auto_applies() {
    let (mut registry, mut cache, mut flow) = setup();
    assert!(cache.capture(&BlockType::Signature, "").is_err());

    let outcome = flow.interact(&mut registry, &mut cache, "A").unwrap();
    assert!(matches!(outcome, Interaction::Prompted(_)));
    assert!(!registry.find("A").unwrap().is_completed());
}
