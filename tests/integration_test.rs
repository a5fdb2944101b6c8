//! Integration Tests - End-to-end Ingestion Pipeline Testing
//!
//! Tests the interaction between the poller, the pipeline, and mock
//! adapters. Uses mockall for trait mocking and tokio::test for async
//! tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use mockall::mock;
use mockall::predicate::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;
use uuid::Uuid;

use snapshot_ingest::adapters::persistence::FileRepository;
use snapshot_ingest::domain::intent::{IntentResolver, OrderIntent, RefundReason};
use snapshot_ingest::domain::memo::{encode_memo, Instruction, Side};
use snapshot_ingest::domain::pair_policy::{DEFAULT_PRIMARY_ASSET, DEFAULT_STABLE_ASSET};
use snapshot_ingest::domain::snapshot::{OrderId, Snapshot};
use snapshot_ingest::usecases::{PassResult, PollerConfig, SnapshotPoller, SnapshotProcessor};

// ---- Mock Definitions ----

mock! {
    pub Source {}

    #[async_trait::async_trait]
    impl snapshot_ingest::ports::ledger::SnapshotSource for Source {
        async fn fetch_after(
            &self,
            checkpoint: DateTime<Utc>,
            limit: usize,
        ) -> anyhow::Result<Vec<Snapshot>>;
    }
}

mock! {
    pub Checkpoints {}

    #[async_trait::async_trait]
    impl snapshot_ingest::ports::repository::CheckpointStore for Checkpoints {
        async fn load_checkpoint(&self) -> anyhow::Result<Option<DateTime<Utc>>>;
        async fn save_checkpoint(&self, checkpoint: DateTime<Utc>) -> anyhow::Result<()>;
    }
}

mock! {
    pub Orders {}

    #[async_trait::async_trait]
    impl snapshot_ingest::ports::repository::OrderRepository for Orders {
        async fn create_order(&self, intent: &OrderIntent) -> anyhow::Result<()>;
        async fn cancel_order(&self, order_id: &OrderId) -> anyhow::Result<()>;
    }
}

mock! {
    pub Refunds {}

    #[async_trait::async_trait]
    impl snapshot_ingest::ports::refund::RefundHandler for Refunds {
        async fn refund(&self, snapshot: &Snapshot, reason: RefundReason) -> anyhow::Result<()>;
    }
}

// ---- Fixtures ----

const EXCHANGE: &str = "exchange-account";
const XIN: &str = "c94ac88f-4671-3976-b60a-09064f1811e8";

fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, second).unwrap()
}

fn bid_memo() -> String {
    encode_memo(&Instruction::new_order(
        Side::Bid,
        Uuid::parse_str(XIN).unwrap(),
        "100",
    ))
    .unwrap()
}

fn snapshot(n: u32, data: String) -> Snapshot {
    Snapshot {
        snapshot_id: format!("snap-{n}"),
        amount: dec!(250),
        asset_id: DEFAULT_STABLE_ASSET.to_string(),
        created_at: at(n),
        trace_id: format!("trace-{n}"),
        user_id: EXCHANGE.to_string(),
        opponent_id: "alice".to_string(),
        data,
    }
}

fn fast_config() -> PollerConfig {
    PollerConfig {
        page_limit: 10,
        retry_delay: Duration::from_millis(10),
        idle_delay: Duration::from_millis(10),
    }
}

fn poller(
    source: MockSource,
    checkpoints: MockCheckpoints,
    orders: MockOrders,
    refunds: MockRefunds,
) -> SnapshotPoller<MockSource, MockCheckpoints, MockOrders, MockRefunds> {
    let processor = SnapshotProcessor::new(
        EXCHANGE,
        IntentResolver::default(),
        Arc::new(orders),
        Arc::new(refunds),
    );
    SnapshotPoller::new(
        Arc::new(source),
        Arc::new(checkpoints),
        processor,
        fast_config(),
        at(0),
    )
}

fn recording_checkpoints(saved: Arc<Mutex<Vec<DateTime<Utc>>>>) -> MockCheckpoints {
    let mut checkpoints = MockCheckpoints::new();
    checkpoints.expect_save_checkpoint().returning(move |c| {
        saved.lock().unwrap().push(c);
        Ok(())
    });
    checkpoints
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_page_advances_checkpoint_after_each_snapshot() {
    let page = vec![
        snapshot(1, bid_memo()),
        snapshot(2, bid_memo()),
        snapshot(3, bid_memo()),
    ];

    let mut source = MockSource::new();
    source
        .expect_fetch_after()
        .with(eq(at(0)), eq(10))
        .times(1)
        .returning(move |_, _| Ok(page.clone()));

    let saved = Arc::new(Mutex::new(Vec::new()));
    let checkpoints = recording_checkpoints(Arc::clone(&saved));

    let mut orders = MockOrders::new();
    orders
        .expect_create_order()
        .withf(|intent| {
            intent.quote == DEFAULT_STABLE_ASSET
                && intent.base == XIN
                && intent.quantity == dec!(2.5)
                && intent.price == dec!(100)
        })
        .times(3)
        .returning(|_| Ok(()));

    let mut refunds = MockRefunds::new();
    refunds.expect_refund().never();

    let mut poller = poller(source, checkpoints, orders, refunds);
    let (_tx, mut rx) = broadcast::channel(1);

    let result = poller.poll_once(&mut rx).await;
    assert_eq!(
        result,
        PassResult::Page {
            fetched: 3,
            processed: 3,
            failed: false
        }
    );
    assert_eq!(poller.checkpoint(), at(3));
    assert_eq!(*saved.lock().unwrap(), vec![at(1), at(2), at(3)]);
}

#[tokio::test]
async fn test_failure_holds_checkpoint_and_redelivers() {
    let page = vec![
        snapshot(1, bid_memo()),
        snapshot(2, bid_memo()),
        snapshot(3, bid_memo()),
    ];
    let redelivered = page[1..].to_vec();

    let mut source = MockSource::new();
    source
        .expect_fetch_after()
        .with(eq(at(0)), always())
        .times(1)
        .returning(move |_, _| Ok(page.clone()));
    source
        .expect_fetch_after()
        .with(eq(at(1)), always())
        .times(1)
        .returning(move |_, _| Ok(redelivered.clone()));

    let saved = Arc::new(Mutex::new(Vec::new()));
    let checkpoints = recording_checkpoints(Arc::clone(&saved));

    // trace-2 fails on its first delivery only.
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_ref = Arc::clone(&attempts);
    let mut orders = MockOrders::new();
    orders.expect_create_order().returning(move |intent| {
        if intent.trace_id == "trace-2" && attempts_ref.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("engine unavailable");
        }
        Ok(())
    });

    let mut poller = poller(source, checkpoints, orders, MockRefunds::new());
    let (_tx, mut rx) = broadcast::channel(1);

    let first = poller.poll_once(&mut rx).await;
    assert_eq!(
        first,
        PassResult::Page {
            fetched: 3,
            processed: 1,
            failed: true
        }
    );
    assert_eq!(poller.checkpoint(), at(1));

    let second = poller.poll_once(&mut rx).await;
    assert_eq!(
        second,
        PassResult::Page {
            fetched: 2,
            processed: 2,
            failed: false
        }
    );
    assert_eq!(poller.checkpoint(), at(3));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(*saved.lock().unwrap(), vec![at(1), at(2), at(3)]);
}

#[tokio::test]
async fn test_fetch_failure_keeps_checkpoint() {
    let mut source = MockSource::new();
    source
        .expect_fetch_after()
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("connection reset")));

    let mut checkpoints = MockCheckpoints::new();
    checkpoints.expect_save_checkpoint().never();

    let mut poller = poller(source, checkpoints, MockOrders::new(), MockRefunds::new());
    let (_tx, mut rx) = broadcast::channel(1);

    assert_eq!(poller.poll_once(&mut rx).await, PassResult::FetchFailed);
    assert_eq!(poller.checkpoint(), at(0));
}

#[tokio::test]
async fn test_checkpoint_persist_failure_is_processing_failure() {
    let mut source = MockSource::new();
    source
        .expect_fetch_after()
        .returning(|_, _| Ok(vec![snapshot(1, bid_memo())]));

    let mut checkpoints = MockCheckpoints::new();
    checkpoints
        .expect_save_checkpoint()
        .times(1)
        .returning(|_| Err(anyhow::anyhow!("disk full")));

    let mut orders = MockOrders::new();
    orders.expect_create_order().times(1).returning(|_| Ok(()));

    let mut poller = poller(source, checkpoints, orders, MockRefunds::new());
    let (_tx, mut rx) = broadcast::channel(1);

    assert_eq!(
        poller.poll_once(&mut rx).await,
        PassResult::Page {
            fetched: 1,
            processed: 0,
            failed: true
        }
    );
    assert_eq!(poller.checkpoint(), at(0));
}

#[tokio::test]
async fn test_refund_cancel_and_ignore_paths() {
    let target = Uuid::new_v4();
    let cancel_memo = encode_memo(&Instruction {
        side: "ASK".to_string(),
        reference_asset: Uuid::parse_str(XIN).unwrap(),
        price: String::new(),
        target_order: target,
    })
    .unwrap();

    let mut foreign = snapshot(3, bid_memo());
    foreign.user_id = "someone-else".to_string();
    let mut outgoing = snapshot(4, bid_memo());
    outgoing.amount = dec!(-1);

    let page = vec![
        snapshot(1, String::new()),
        snapshot(2, cancel_memo),
        foreign,
        outgoing,
    ];

    let mut source = MockSource::new();
    source.expect_fetch_after().returning(move |_, _| Ok(page.clone()));

    let saved = Arc::new(Mutex::new(Vec::new()));
    let checkpoints = recording_checkpoints(Arc::clone(&saved));

    let mut orders = MockOrders::new();
    orders.expect_create_order().never();
    orders
        .expect_cancel_order()
        .with(eq(target.hyphenated().to_string()))
        .times(1)
        .returning(|_| Ok(()));

    let mut refunds = MockRefunds::new();
    refunds
        .expect_refund()
        .withf(|snapshot, reason| {
            snapshot.snapshot_id == "snap-1" && *reason == RefundReason::NoInstruction
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let mut poller = poller(source, checkpoints, orders, refunds);
    let (_tx, mut rx) = broadcast::channel(1);

    let result = poller.poll_once(&mut rx).await;
    assert_eq!(
        result,
        PassResult::Page {
            fetched: 4,
            processed: 4,
            failed: false
        }
    );
    // Ignored snapshots still move the checkpoint.
    assert_eq!(poller.checkpoint(), at(4));
    assert_eq!(saved.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_equal_timestamps_do_not_rewrite_checkpoint() {
    let mut second = snapshot(1, bid_memo());
    second.snapshot_id = "snap-1b".to_string();
    second.trace_id = "trace-1b".to_string();
    let page = vec![snapshot(1, bid_memo()), second];

    let mut source = MockSource::new();
    source.expect_fetch_after().returning(move |_, _| Ok(page.clone()));

    let mut checkpoints = MockCheckpoints::new();
    checkpoints
        .expect_save_checkpoint()
        .with(eq(at(1)))
        .times(1)
        .returning(|_| Ok(()));

    let mut orders = MockOrders::new();
    orders.expect_create_order().times(2).returning(|_| Ok(()));

    let mut poller = poller(source, checkpoints, orders, MockRefunds::new());
    let (_tx, mut rx) = broadcast::channel(1);

    poller.poll_once(&mut rx).await;
    assert_eq!(poller.checkpoint(), at(1));
}

#[tokio::test]
async fn test_resume_prefers_persisted_checkpoint() {
    let mut checkpoints = MockCheckpoints::new();
    checkpoints
        .expect_load_checkpoint()
        .times(1)
        .returning(|| Ok(Some(at(42))));

    let processor = SnapshotProcessor::new(
        EXCHANGE,
        IntentResolver::default(),
        Arc::new(MockOrders::new()),
        Arc::new(MockRefunds::new()),
    );
    let poller = SnapshotPoller::resume(
        Arc::new(MockSource::new()),
        Arc::new(checkpoints),
        processor,
        fast_config(),
        at(0),
    )
    .await
    .unwrap();
    assert_eq!(poller.checkpoint(), at(42));

    let mut empty = MockCheckpoints::new();
    empty.expect_load_checkpoint().returning(|| Ok(None));
    let processor = SnapshotProcessor::new(
        EXCHANGE,
        IntentResolver::default(),
        Arc::new(MockOrders::new()),
        Arc::new(MockRefunds::new()),
    );
    let poller = SnapshotPoller::resume(
        Arc::new(MockSource::new()),
        Arc::new(empty),
        processor,
        fast_config(),
        at(7),
    )
    .await
    .unwrap();
    assert_eq!(poller.checkpoint(), at(7));

    let mut broken = MockCheckpoints::new();
    broken
        .expect_load_checkpoint()
        .returning(|| Err(anyhow::anyhow!("permission denied")));
    let processor = SnapshotProcessor::new(
        EXCHANGE,
        IntentResolver::default(),
        Arc::new(MockOrders::new()),
        Arc::new(MockRefunds::new()),
    );
    let resumed = SnapshotPoller::resume(
        Arc::new(MockSource::new()),
        Arc::new(broken),
        processor,
        fast_config(),
        at(0),
    )
    .await;
    assert!(resumed.is_err());
}

#[tokio::test]
async fn test_shutdown_interrupts_idle_sleep() {
    let mut source = MockSource::new();
    source.expect_fetch_after().returning(|_, _| Ok(Vec::new()));

    let processor = SnapshotProcessor::new(
        EXCHANGE,
        IntentResolver::default(),
        Arc::new(MockOrders::new()),
        Arc::new(MockRefunds::new()),
    );
    let poller = SnapshotPoller::new(
        Arc::new(source),
        Arc::new(MockCheckpoints::new()),
        processor,
        PollerConfig {
            page_limit: 10,
            retry_delay: Duration::from_secs(60),
            idle_delay: Duration::from_secs(60),
        },
        at(5),
    );

    let (tx, rx) = broadcast::channel(1);
    let handle = tokio::spawn(poller.run(rx));

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(()).unwrap();

    let checkpoint = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("poller must stop promptly")
        .unwrap();
    assert_eq!(checkpoint, at(5));
}

#[tokio::test]
async fn test_shutdown_mid_page_finishes_in_flight_snapshot() {
    let page = vec![
        snapshot(1, bid_memo()),
        snapshot(2, bid_memo()),
        snapshot(3, bid_memo()),
    ];

    let mut source = MockSource::new();
    source
        .expect_fetch_after()
        .with(eq(at(0)), always())
        .times(1)
        .returning(move |_, _| Ok(page.clone()));

    let saved = Arc::new(Mutex::new(Vec::new()));
    let checkpoints = recording_checkpoints(Arc::clone(&saved));

    let (tx, rx) = broadcast::channel(1);
    let stop = tx.clone();
    let mut orders = MockOrders::new();
    orders
        .expect_create_order()
        .withf(|intent| intent.trace_id == "trace-1")
        .times(1)
        .returning(move |_| {
            // Shutdown arrives while snapshot 1 is being applied.
            let _ = stop.send(());
            Ok(())
        });

    let poller = poller(source, checkpoints, orders, MockRefunds::new());
    let checkpoint = tokio::time::timeout(Duration::from_secs(2), poller.run(rx))
        .await
        .expect("poller must stop after the in-flight snapshot");

    assert_eq!(checkpoint, at(1));
    assert_eq!(*saved.lock().unwrap(), vec![at(1)]);
    drop(tx);
}

#[tokio::test]
async fn test_run_retries_failed_fetch_from_same_checkpoint() {
    let calls: Arc<Mutex<Vec<(DateTime<Utc>, std::time::Instant)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let calls_ref = Arc::clone(&calls);

    let (tx, rx) = broadcast::channel(1);
    let stop = tx.clone();
    let mut source = MockSource::new();
    source
        .expect_fetch_after()
        .times(2)
        .returning(move |checkpoint, _| {
            let mut calls = calls_ref.lock().unwrap();
            calls.push((checkpoint, std::time::Instant::now()));
            if calls.len() == 1 {
                anyhow::bail!("ledger unavailable");
            }
            let _ = stop.send(());
            Ok(Vec::new())
        });

    let mut checkpoints = MockCheckpoints::new();
    checkpoints.expect_save_checkpoint().never();

    let processor = SnapshotProcessor::new(
        EXCHANGE,
        IntentResolver::default(),
        Arc::new(MockOrders::new()),
        Arc::new(MockRefunds::new()),
    );
    let retry_delay = Duration::from_millis(50);
    let poller = SnapshotPoller::new(
        Arc::new(source),
        Arc::new(checkpoints),
        processor,
        PollerConfig {
            page_limit: 10,
            retry_delay,
            idle_delay: Duration::from_secs(60),
        },
        at(0),
    );

    let checkpoint = tokio::time::timeout(Duration::from_secs(2), poller.run(rx))
        .await
        .expect("poller must stop after the retried fetch");
    assert_eq!(checkpoint, at(0));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, at(0));
    assert_eq!(calls[1].0, at(0));
    assert!(calls[1].1.duration_since(calls[0].1) >= retry_delay);
    drop(tx);
}

#[tokio::test]
async fn test_redelivery_against_file_repository_is_idempotent() {
    let dir = std::env::temp_dir().join(format!("ingest-it-{}", Uuid::new_v4()));
    let repository = Arc::new(FileRepository::from_data_dir(&dir).await.unwrap());

    let mut bad_price = snapshot(2, String::new());
    bad_price.data = encode_memo(&Instruction::new_order(
        Side::Bid,
        Uuid::parse_str(XIN).unwrap(),
        "0.000000001",
    ))
    .unwrap();
    let page = vec![snapshot(1, bid_memo()), bad_price];

    // Two pollers replay the same page from the same starting point.
    for _ in 0..2 {
        let page = page.clone();
        let mut source = MockSource::new();
        source.expect_fetch_after().returning(move |_, _| Ok(page.clone()));

        let processor = SnapshotProcessor::new(
            EXCHANGE,
            IntentResolver::default(),
            Arc::clone(&repository),
            Arc::clone(&repository),
        );
        let mut poller = SnapshotPoller::new(
            Arc::new(source),
            Arc::clone(&repository),
            processor,
            fast_config(),
            at(0),
        );
        let (_tx, mut rx) = broadcast::channel(1);
        let result = poller.poll_once(&mut rx).await;
        assert_eq!(
            result,
            PassResult::Page {
                fetched: 2,
                processed: 2,
                failed: false
            }
        );
    }

    assert_eq!(repository.orders().len().await, 1);
    let refunds = repository.refunds().records().await.unwrap();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].reason, RefundReason::InvalidPrice);
    assert_eq!(refunds[0].amount, Decimal::from(250));

    use snapshot_ingest::ports::repository::CheckpointStore;
    assert_eq!(repository.load_checkpoint().await.unwrap(), Some(at(2)));

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[test]
fn test_default_anchors_are_distinct() {
    assert_ne!(DEFAULT_PRIMARY_ASSET, DEFAULT_STABLE_ASSET);
}
