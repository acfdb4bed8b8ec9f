/*!
 * Tests for deduplication, batch building and the batch worker pool
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use transcore::translation::batch::estimate_tokens;
use transcore::translation::{BatchBuilder, BatchProcessor, CanonicalItem, Deduplicator};

use crate::common;

fn items(texts: &[&str]) -> Vec<CanonicalItem> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| CanonicalItem::new(t.to_string(), format!("f{}", i)))
        .collect()
}

/// Identical texts collapse into one canonical item that keeps every id
#[test]
fn test_deduplicate_withRepeatedText_shouldKeepOneItemPerText() {
    let fragments = common::fragments(&[("a", "Hello"), ("b", "Hello"), ("c", "World")]);
    let result = Deduplicator::deduplicate(&fragments);

    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].text, "Hello");
    assert_eq!(result.items[0].fragment_ids, vec!["a", "b"]);
    assert_eq!(result.items[1].text, "World");
    assert_eq!(result.fragment_count(), 3);
}

#[test]
fn test_deduplicate_withSurroundingWhitespace_shouldMatchTrimmedText() {
    let fragments = common::fragments(&[("a", "  Hello "), ("b", "Hello"), ("c", "   ")]);
    let result = Deduplicator::deduplicate(&fragments);

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].fragment_ids, vec!["a", "b"]);
    assert!(!result.fragment_to_text.contains_key("c"));
}

#[test]
fn test_redistribute_shouldGiveEveryFragmentItsCanonicalTranslation() {
    let fragments = common::fragments(&[("a", "Hello"), ("b", "Hello"), ("c", "World")]);
    let result = Deduplicator::deduplicate(&fragments);

    let translations = HashMap::from([
        ("Hello".to_string(), "Bonjour".to_string()),
        ("World".to_string(), "Monde".to_string()),
    ]);
    let by_fragment = result.redistribute(&translations);

    assert_eq!(by_fragment["a"], "Bonjour");
    assert_eq!(by_fragment["b"], "Bonjour");
    assert_eq!(by_fragment["c"], "Monde");
}

#[test]
fn test_redistribute_withMissingTranslation_shouldLeaveFragmentsOut() {
    let fragments = common::fragments(&[("a", "Hello"), ("c", "World")]);
    let result = Deduplicator::deduplicate(&fragments);

    let translations = HashMap::from([("Hello".to_string(), "Bonjour".to_string())]);
    let by_fragment = result.redistribute(&translations);

    assert_eq!(by_fragment.len(), 1);
    assert!(!by_fragment.contains_key("c"));
}

/// Test batch sizes with the item-count limit
#[test]
fn test_batchBuilder_withMaxBatchSizeTwo_shouldSplitTwoTwoOne() {
    let batches = BatchBuilder::new(2, 2000).build(items(&["a", "b", "c", "d", "e"]));

    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(batches[0].id, "batch-1");
    assert_eq!(batches[2].id, "batch-3");
}

/// Every batch respects both limits unless it holds a single oversized item
#[test]
fn test_batchBuilder_budgetInvariant_shouldHoldForMixedLengths() {
    let long = "x".repeat(90);
    let texts = [
        "short", "a little longer text", long.as_str(), "tiny", "another medium sentence here",
        "ok", long.as_str(), "end",
    ];
    let batches = BatchBuilder::new(3, 20).build(items(&texts));

    let total: usize = batches.iter().map(|b| b.len()).sum();
    assert_eq!(total, texts.len());
    for batch in &batches {
        assert!(!batch.is_empty());
        assert!(batch.len() <= 3);
        let oversized_single = batch.len() == 1 && estimate_tokens(&batch.items[0].text) > 20;
        assert!(batch.token_count <= 20 || oversized_single, "{} over budget", batch.id);
    }
}

#[test]
fn test_batchBuilder_withOversizedItem_shouldSendItAlone() {
    let long = "word ".repeat(100);
    let batches = BatchBuilder::new(10, 10).build(items(&["a", long.as_str(), "b"]));

    assert_eq!(batches.len(), 3);
    assert_eq!(batches[1].len(), 1);
    assert!(batches[1].token_count > 10);
}

#[test]
fn test_batch_fragmentIds_shouldFlattenItemIds() {
    let fragments = common::fragments(&[("a", "Hello"), ("b", "Hello"), ("c", "World")]);
    let dedup = Deduplicator::deduplicate(&fragments);
    let batches = BatchBuilder::new(10, 2000).build(dedup.items);

    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].texts(), vec!["Hello", "World"]);
    assert_eq!(batches[0].fragment_ids(), vec!["a", "b", "c"]);
}

/// Four 100ms batches with two workers take two rounds, not four
#[tokio::test]
async fn test_batchProcessor_withConcurrencyTwo_shouldOverlapBatches() {
    let batches = BatchBuilder::new(1, 2000).build(items(&["a", "b", "c", "d"]));
    let processor = BatchProcessor::new(2, Duration::ZERO);

    let started = Instant::now();
    let outcomes = processor
        .process(batches, |batch| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, String>(batch.len())
        })
        .await;
    let elapsed = started.elapsed();

    assert_eq!(outcomes.len(), 4);
    assert!(elapsed >= Duration::from_millis(190), "took {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(380), "took {:?}", elapsed);
}

#[tokio::test]
async fn test_batchProcessor_shouldNeverExceedConcurrency() {
    let batches = BatchBuilder::new(1, 2000).build(items(&["a", "b", "c", "d", "e", "f", "g"]));
    let processor = BatchProcessor::new(3, Duration::ZERO);
    let active = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let outcomes = processor
        .process(batches, |_batch| {
            let active = &active;
            let peak = &peak;
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }
        })
        .await;

    assert_eq!(outcomes.len(), 7);
    assert_eq!(peak.load(Ordering::SeqCst), 3);
}

/// A failing batch yields an error outcome without stopping the others
#[tokio::test]
async fn test_batchProcessor_withFailingBatch_shouldIsolateFailure() {
    let batches = BatchBuilder::new(1, 2000).build(items(&["a", "boom", "c"]));
    let processor = BatchProcessor::new(2, Duration::ZERO);

    let outcomes = processor
        .process(batches, |batch| async move {
            if batch.texts()[0] == "boom" {
                Err(format!("{} exploded", batch.id))
            } else {
                Ok(batch.texts())
            }
        })
        .await;

    assert_eq!(outcomes.len(), 3);
    let failed: Vec<_> = outcomes.iter().filter(|o| o.result.is_err()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].batch_id, "batch-2");
}

#[tokio::test]
async fn test_batchProcessor_withNoBatches_shouldReturnImmediately() {
    let processor = BatchProcessor::new(4, Duration::from_secs(10));
    let outcomes = processor
        .process(Vec::new(), |_batch| async { Ok::<_, String>(()) })
        .await;

    assert!(outcomes.is_empty());
}
