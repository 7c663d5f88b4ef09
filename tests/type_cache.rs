use esignflow::EsignError;
use esignflow::model::{BlockType, CapturedSignature, Dimensions, Position, SignatureBlock};
use esignflow::type_cache::{SignatureTypeCache, apply_to_all_of_type, apply_to_block};

fn block(id: &str, y: f64, block_type: BlockType) -> SignatureBlock {
    SignatureBlock::new(
        id,
        1,
        Position::new(10.0, y),
        Dimensions::new(200.0, 50.0),
        block_type,
        true,
    )
}

#[test]
fn newest_capture_replaces_previous() {
    let mut cache = SignatureTypeCache::new();
    assert!(cache.lookup(&BlockType::Signature).is_none());
    assert!(!cache.status(&BlockType::Signature).captured);

    cache.capture(&BlockType::Signature, "J. Doe").unwrap();
    let second = cache.capture(&BlockType::Signature, "John Doe").unwrap();
    let stored = cache.lookup(&BlockType::Signature).unwrap();
    assert_eq!(stored.text, "John Doe");
    assert_eq!(stored, &second);
    assert!(cache.status(&BlockType::Signature).captured);
    assert!(cache.lookup(&BlockType::Initial).is_none());
}

#[test]
fn apply_to_completed_block_is_rejected() {
    let mut cache = SignatureTypeCache::new();
    let first = cache.capture(&BlockType::Signature, "John Doe").unwrap();
    let mut b = block("a", 10.0, BlockType::Signature);

    apply_to_block(&mut b, &first, false).unwrap();
    assert_eq!(b.signature_text(), Some("John Doe"));
    assert!(!b.is_auto_applied());

    let other = cache.capture(&BlockType::Signature, "Someone Else").unwrap();
    let err = apply_to_block(&mut b, &other, true).unwrap_err();
    assert!(matches!(err, EsignError::BlockAlreadyCompleted(id) if id == "a"));
    assert_eq!(b.signature_text(), Some("John Doe"));
}

#[test]
fn apply_rejects_other_type() {
    let mut cache = SignatureTypeCache::new();
    let initials = cache.capture(&BlockType::Initial, "JD").unwrap();
    let mut b = block("a", 10.0, BlockType::Signature);
    assert!(matches!(
        apply_to_block(&mut b, &initials, false),
        Err(EsignError::TypeMismatch { .. })
    ));
    assert!(!b.is_completed());
}

#[test]
fn apply_to_all_fills_only_incomplete_blocks_of_type() {
    let mut blocks = vec![
        block("a", 10.0, BlockType::Signature),
        block("b", 20.0, BlockType::Signature),
        block("i", 30.0, BlockType::Initial),
        block("c", 40.0, BlockType::Signature),
    ];
    let mut cache = SignatureTypeCache::new();

    // Block A is signed by hand first.
    let captured = cache.capture(&BlockType::Signature, "John Doe").unwrap();
    apply_to_block(&mut blocks[0], &captured, false).unwrap();
    let a_completion = blocks[0].completion().cloned();

    let count = apply_to_all_of_type(&mut blocks, &captured);
    assert_eq!(count, 2);

    assert_eq!(blocks[0].completion().cloned(), a_completion);
    assert!(!blocks[0].is_auto_applied());
    for b in [&blocks[1], &blocks[3]] {
        assert_eq!(b.signature_text(), Some("John Doe"));
        assert!(b.is_auto_applied());
    }
    assert!(!blocks[2].is_completed());

    assert_eq!(apply_to_all_of_type(&mut blocks, &captured), 0);
}

#[test]
fn modal_shown_is_tracked_per_type() {
    let mut cache = SignatureTypeCache::for_types([BlockType::Signature, BlockType::Initial]);
    cache.mark_modal_shown(&BlockType::Initial);

    let initial = cache.status(&BlockType::Initial);
    assert!(initial.modal_shown);
    assert!(!initial.captured);
    assert!(cache.auto_apply_candidate(&BlockType::Initial).is_none());
    assert!(!cache.status(&BlockType::Signature).modal_shown);

    cache.capture(&BlockType::Initial, "JD").unwrap();
    assert_eq!(cache.auto_apply_candidate(&BlockType::Initial).map(|c| c.text.as_str()), Some("JD"));
}

#[test]
fn blank_capture_is_rejected_and_not_cached() {
    let mut cache = SignatureTypeCache::for_types([BlockType::Signature]);
    for text in ["", "   ", "\t\n"] {
        assert!(matches!(
            cache.capture(&BlockType::Signature, text),
            Err(EsignError::EmptySignature(t)) if t == "signature"
        ));
    }
    assert!(!cache.status(&BlockType::Signature).captured);
    assert!(cache.auto_apply_candidate(&BlockType::Signature).is_none());
}

#[test]
fn apply_with_blank_text_fails_and_leaves_block_incomplete() {
    let blank = CapturedSignature {
        text: "  ".to_string(),
        timestamp: chrono::Utc::now(),
        block_type: BlockType::Signature,
    };
    let mut b = block("a", 10.0, BlockType::Signature);
    assert!(matches!(
        apply_to_block(&mut b, &blank, true),
        Err(EsignError::EmptySignature(_))
    ));
    assert!(!b.is_completed());

    let mut blocks = vec![b];
    assert_eq!(apply_to_all_of_type(&mut blocks, &blank), 0);
    assert!(!blocks[0].is_completed());
}
