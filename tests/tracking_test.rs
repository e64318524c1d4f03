use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use carttrack_rs::integration::{IntoDetections, ReplayDetector, ReplaySource};
use carttrack_rs::sync::{SyncOperation, SyncRequest};
use carttrack_rs::{
    AssociationStrategy, BoundingBox, Detection, DetectionBuilder, DetectionSource, Frame,
    FrameDriver, InventoryReconciler, Ledger, SkuCatalog, SyncJob, SyncSink, SyncWorker,
    TrackerConfig,
};

fn catalog() -> SkuCatalog {
    SkuCatalog::from_json_str(r#"{"apple": "SKU00101", "orange": {"sku": "SKU00102"}}"#).unwrap()
}

fn config(window: usize, timeout: f64) -> TrackerConfig {
    TrackerConfig {
        stabilization_frames: window,
        removal_timeout_secs: timeout,
        frame_skip: 1,
        ..TrackerConfig::default()
    }
}

fn cart(window: usize, timeout: f64) -> InventoryReconciler<SkuCatalog, Vec<SyncJob>> {
    InventoryReconciler::new("cart_001", config(window, timeout), catalog(), Vec::new())
}

fn apple() -> Detection {
    DetectionBuilder::new()
        .label("apple")
        .tlwh(10, 10, 40, 40)
        .confidence(0.8)
        .build()
}

#[test]
fn test_apple_confirmed_after_three_frames() {
    let mut cart = cart(3, 3.0);

    cart.process_frame(&[apple()], 0.0);
    cart.process_frame(&[apple()], 1.0);
    assert_eq!(cart.inventory_summary_at(1.0).item_count, 0);

    cart.process_frame(&[apple()], 2.0);
    let summary = cart.inventory_summary_at(2.0);
    assert_eq!(summary.cart_id, "cart_001");
    assert_eq!(summary.item_count, 1);
    assert_eq!(summary.items[0].label, "apple");
    assert_eq!(summary.items[0].sku, "SKU00101");
    assert_eq!(summary.items[0].quantity, 1);

    let jobs = cart.sync_sink();
    assert_eq!(jobs.len(), 1);
    match &jobs[0].request {
        SyncRequest::Add(add) => {
            assert_eq!(add.cart_id, "cart_001");
            assert_eq!(add.sku, "SKU00101");
            assert_eq!(add.confidence, 0.8);
        }
        other => panic!("expected an add, got {other:?}"),
    }
}

#[test]
fn test_confirmed_apple_removed_after_timeout() {
    let mut cart = cart(3, 3.0);
    for t in [8.0, 9.0, 10.0] {
        cart.process_frame(&[apple()], t);
    }
    assert_eq!(cart.inventory_summary_at(10.0).item_count, 1);

    for t in [11.0, 12.0, 13.0] {
        assert!(cart.process_frame(&[], t).evicted.is_empty());
    }
    let report = cart.process_frame(&[], 14.0);
    assert_eq!(report.evicted.len(), 1);
    assert_eq!(cart.inventory_summary_at(14.0).item_count, 0);

    let ops: Vec<SyncOperation> = cart.sync_sink().iter().map(SyncJob::operation).collect();
    assert_eq!(ops, vec![SyncOperation::Add, SyncOperation::Remove]);
}

#[test]
fn test_two_disjoint_apples_are_two_candidates() {
    let mut cart = cart(3, 3.0);
    let report = cart.process_frame(
        &[
            Detection::new("apple", 0, 0, 10, 10, 0.9),
            Detection::new("apple", 100, 100, 110, 110, 0.9),
        ],
        0.0,
    );
    assert_eq!(report.created.len(), 2);
    assert_eq!(cart.tracked_items().len(), 2);
    assert_eq!(
        BoundingBox::new(0, 0, 10, 10).iou(&BoundingBox::new(100, 100, 110, 110)),
        0.0
    );
}

#[test]
fn test_moving_item_keeps_its_key() {
    let mut cart = cart(5, 3.0);
    let orange = |center: i32| {
        DetectionBuilder::new()
            .label("orange")
            .xywh(center, center, 100, 100)
            .confidence(0.9)
            .build()
    };
    let key = cart.process_frame(&[orange(150)], 0.0).created[0];

    // Drifts a few pixels per frame; IoU with the previous box stays high
    for (t, offset) in [(1.0, 5), (2.0, 10), (3.0, 15)] {
        let report = cart.process_frame(&[orange(150 + offset)], t);
        assert_eq!(report.matched, vec![key]);
        assert!(report.created.is_empty());
    }
    assert_eq!(cart.item(key).unwrap().bbox(), BoundingBox::new(115, 115, 215, 215));
}

#[test]
fn test_optimal_strategy_matches_dense_clutter() {
    let mut first = cart(5, 3.0);
    let mut optimal = InventoryReconciler::new(
        "cart",
        TrackerConfig {
            association: AssociationStrategy::Optimal,
            ..config(5, 3.0)
        },
        catalog(),
        Vec::<SyncJob>::new(),
    );

    let seed = [
        Detection::new("apple", 0, 0, 100, 100, 0.9),
        Detection::new("apple", 30, 0, 130, 100, 0.9),
    ];
    first.process_frame(&seed, 0.0);
    optimal.process_frame(&seed, 0.0);

    // The first detection overlaps both items; the second only overlaps the
    // first item, which greedy matching has already handed out.
    let next = [
        Detection::new("apple", 20, 0, 120, 100, 0.9),
        Detection::new("apple", -5, 0, 95, 100, 0.9),
    ];
    let greedy = first.process_frame(&next, 1.0);
    let solved = optimal.process_frame(&next, 1.0);

    assert_eq!(greedy.matched.len(), 1);
    assert_eq!(greedy.created.len(), 1);
    assert_eq!(solved.matched.len(), 2);
    assert!(solved.created.is_empty());
}

/// Ledger double that records calls and rejects configured SKUs.
#[derive(Clone, Default)]
struct RecordingLedger {
    reject: Vec<String>,
    calls: Arc<Mutex<Vec<(SyncOperation, String)>>>,
}

impl Ledger for RecordingLedger {
    fn send(&self, request: &SyncRequest) -> impl Future<Output = bool> + Send {
        self.calls
            .lock()
            .unwrap()
            .push((request.operation(), request.sku().to_string()));
        let ok = !self.reject.iter().any(|s| s == request.sku());
        async move { ok }
    }

    fn health_check(&self) -> impl Future<Output = bool> + Send {
        async { true }
    }
}

#[tokio::test]
async fn test_replay_through_worker() {
    let recording = r#"
{"timestamp": 0.0, "detections": [{"label": "apple", "bbox": [10, 10, 50, 50], "confidence": 0.8}, {"label": "orange", "bbox": [200, 200, 260, 260], "confidence": 0.9}]}
{"timestamp": 1.0, "detections": [{"label": "apple", "bbox": [11, 11, 51, 51], "confidence": 0.8}, {"label": "orange", "bbox": [201, 201, 261, 261], "confidence": 0.9}]}
{"timestamp": 2.0, "detections": [{"label": "apple", "bbox": [12, 12, 52, 52], "confidence": 0.85}, {"label": "person", "bbox": [0, 0, 300, 300], "confidence": 0.99}]}
{"timestamp": 6.0, "detections": []}
"#;
    let ledger = RecordingLedger {
        reject: vec!["SKU00102".to_string()],
        ..Default::default()
    };
    let calls = Arc::clone(&ledger.calls);
    let (worker, handle) = SyncWorker::new(ledger, Vec::<SyncJob>::new());
    let task = worker.spawn();

    let mut source = ReplaySource::from_jsonl_str(recording).unwrap();
    let reconciler = InventoryReconciler::new("cart_001", config(2, 3.0), catalog(), handle);
    let mut driver = FrameDriver::new(ReplayDetector, reconciler);
    let stats = driver.run(&mut source, &AtomicBool::new(false)).unwrap();
    assert_eq!(stats.frames_processed, 4);
    assert_eq!(stats.confirmed, 2);
    assert_eq!(stats.evicted, 2);
    assert_eq!(driver.reconciler().inventory_summary_at(6.0).item_count, 0);

    drop(driver);
    let outcome = task.await.unwrap();
    assert_eq!(outcome.delivered, 2);
    assert_eq!(outcome.failed, 2);
    assert!(outcome.divergence.iter().all(|job| job.request.sku() == "SKU00102"));

    let calls = calls.lock().unwrap().clone();
    let apple_ops: Vec<SyncOperation> = calls
        .iter()
        .filter(|(_, sku)| sku == "SKU00101")
        .map(|(op, _)| *op)
        .collect();
    assert_eq!(apple_ops, vec![SyncOperation::Add, SyncOperation::Remove]);
    assert_eq!(calls.len(), 4);
}

/// Replays raw class-indexed model output, one batch per frame.
struct ModelOutput {
    batches: Vec<Vec<(usize, [f32; 4], f32)>>,
}

const CLASS_NAMES: &[&str] = &["person", "apple", "orange", "bottle"];

impl DetectionSource for ModelOutput {
    type Error = std::convert::Infallible;

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let raw = if self.batches.is_empty() {
            Vec::new()
        } else {
            self.batches.remove(0)
        };
        Ok((raw, CLASS_NAMES).into_detections())
    }
}

#[test]
fn test_raw_model_output_through_driver() {
    let detector = ModelOutput {
        batches: vec![
            vec![(1, [10.2, 10.0, 50.7, 50.1], 0.81), (0, [0.0, 0.0, 300.0, 300.0], 0.99)],
            vec![(1, [11.0, 10.4, 51.0, 50.9], 0.84), (3, [200.0, 200.0, 240.0, 300.0], 0.9)],
            vec![(1, [11.5, 11.0, 51.3, 51.2], 0.86), (9, [0.0, 0.0, 5.0, 5.0], 0.95)],
        ],
    };
    let mut driver = FrameDriver::new(detector, cart(3, 3.0));

    let mut confirmed = Vec::new();
    for t in [0.0, 1.0, 2.0] {
        let frame = Frame {
            timestamp: t,
            ..Default::default()
        };
        let report = driver.process_frame(&frame).unwrap().unwrap();
        confirmed.extend(report.confirmed);
    }

    // "person" and "bottle" are not in the catalog; class 9 has no name
    assert_eq!(driver.reconciler().tracked_items().len(), 1);
    assert_eq!(confirmed.len(), 1);
    let item = driver.reconciler().item(confirmed[0]).unwrap();
    assert_eq!(item.sku(), "SKU00101");
    assert_eq!(item.bbox(), BoundingBox::new(11, 11, 51, 51));
}

#[test]
fn test_custom_sink() {
    /// Counts jobs instead of storing them.
    #[derive(Default)]
    struct Counter(usize);

    impl SyncSink for Counter {
        fn submit(&mut self, _job: SyncJob) {
            self.0 += 1;
        }
    }

    let mut cart =
        InventoryReconciler::new("cart", config(1, 1.0), catalog(), Counter::default());
    cart.process_frame(&[apple()], 0.0);
    cart.process_frame(&[], 5.0);
    assert_eq!(cart.sync_sink().0, 2);
}
