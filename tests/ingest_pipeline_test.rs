use pool_valuation::datasource::{EventSourceError, MockEventSource};
use pool_valuation::db::{init_db, EventStatus, Repository};
use pool_valuation::domain::{
    Address, Balancer, BlockNumber, Decimal, EventKind, Pool, PoolId, PoolType, Timestamp,
    TokenPrice, VaultEvent, VAULT_ID,
};
use pool_valuation::engine::{LiquiditySanityCheck, PricingAssetRegistry, Snapshotter};
use pool_valuation::orchestration::{EventProcessor, IngestionError, IngestionResult, Ingestor};
use pool_valuation::store::EntityStore;
use std::sync::Arc;
use tempfile::TempDir;

fn addr(byte: u8) -> Address {
    Address::parse(&format!("0x{}", hex::encode([byte; 20]))).unwrap()
}

fn weth() -> Address {
    addr(0xe0)
}

fn usdc() -> Address {
    addr(0xc0)
}

fn pool_id() -> PoolId {
    PoolId::parse(&format!("0x{}", hex::encode([0xab; 32]))).unwrap()
}

fn processor() -> EventProcessor {
    let registry = PricingAssetRegistry::new(vec![weth(), usdc()], vec![usdc()]).unwrap();
    EventProcessor::new(
        Arc::new(registry),
        Snapshotter::default(),
        LiquiditySanityCheck::NonEmptyPool,
    )
}

fn db_path(temp_dir: &TempDir) -> String {
    temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string()
}

async fn open_ingestor(path: &str) -> Ingestor {
    let pool = init_db(path).await.expect("init_db failed");
    Ingestor::open(Arc::new(Repository::new(pool)), processor())
        .await
        .expect("open failed")
}

fn event(block: u64, log_index: u64, kind: EventKind) -> VaultEvent {
    VaultEvent::new(BlockNumber::new(block), Timestamp::new(block as i64 * 12), kind)
        .with_log_position(&format!("0x{:064x}", block), log_index)
}

fn register() -> VaultEvent {
    event(
        1,
        0,
        EventKind::PoolRegistered {
            pool_id: pool_id(),
            pool_type: PoolType::Weighted,
            tokens: vec![weth(), usdc()],
        },
    )
}

fn price_weth() -> VaultEvent {
    event(
        2,
        0,
        EventKind::PriceObserved(TokenPrice {
            asset: weth(),
            pricing_asset: usdc(),
            block: BlockNumber::new(2),
            pool_id: pool_id(),
            price: Decimal::from(2_000),
        }),
    )
}

fn join() -> VaultEvent {
    event(
        3,
        0,
        EventKind::PoolBalanceChanged {
            pool_id: pool_id(),
            deltas: vec![(weth(), Decimal::from(10)), (usdc(), Decimal::from(20_000))],
            shares_delta: Decimal::from(100),
        },
    )
}

fn swap(log_index: u64) -> VaultEvent {
    event(
        4,
        log_index,
        EventKind::Swap {
            pool_id: pool_id(),
            token_in: usdc(),
            amount_in: Decimal::from(2_000),
            token_out: weth(),
            amount_out: Decimal::from(1),
        },
    )
}

fn source() -> MockEventSource {
    MockEventSource::new()
        .with_event(swap(0))
        .with_event(register())
        .with_event(price_weth())
        .with_event(join())
}

#[tokio::test]
async fn test_sync_applies_events_in_block_order() {
    let temp_dir = TempDir::new().unwrap();
    let ingestor = open_ingestor(&db_path(&temp_dir)).await;

    let result = ingestor
        .sync(&source(), BlockNumber::new(0), BlockNumber::new(100))
        .await
        .unwrap();
    assert_eq!(
        result,
        IngestionResult {
            events_seen: 4,
            events_applied: 4,
            duplicates_skipped: 0,
            invalid_skipped: 0,
            liquidity_rejections: 0,
        }
    );

    let pool = ingestor
        .repository()
        .get_pool(&pool_id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pool.total_liquidity, Decimal::from(40_000));
    assert_eq!(pool.total_swap_volume, Decimal::from(2_000));
    assert_eq!(pool.swaps_count, 1);

    let history = ingestor
        .repository()
        .query_pool_historical_liquidity(&pool_id())
        .await
        .unwrap();
    let blocks: Vec<u64> = history.iter().map(|h| h.block.as_u64()).collect();
    assert_eq!(blocks, vec![3, 4]);
}

#[tokio::test]
async fn test_resync_skips_processed_events() {
    let temp_dir = TempDir::new().unwrap();
    let ingestor = open_ingestor(&db_path(&temp_dir)).await;

    ingestor
        .sync(&source(), BlockNumber::new(0), BlockNumber::new(100))
        .await
        .unwrap();
    let result = ingestor
        .sync(&source(), BlockNumber::new(0), BlockNumber::new(100))
        .await
        .unwrap();
    assert_eq!(result.events_applied, 0);
    assert_eq!(result.duplicates_skipped, 4);

    // Replaying must not double-count the vault aggregate.
    let vault = ingestor
        .repository()
        .get_balancer(VAULT_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vault.total_liquidity, Decimal::from(40_000));
    assert_eq!(vault.total_swap_count, 1);
}

#[tokio::test]
async fn test_duplicate_within_batch_applied_once() {
    let temp_dir = TempDir::new().unwrap();
    let ingestor = open_ingestor(&db_path(&temp_dir)).await;

    let events = vec![register(), price_weth(), join(), swap(0), swap(0), swap(1)];
    let result = ingestor.ingest(&events).await.unwrap();
    assert_eq!(result.events_applied, 5);
    assert_eq!(result.duplicates_skipped, 1);

    let swaps = ingestor
        .with_store(|store| store.load::<Pool>(&pool_id()).map(|p| p.swaps_count))
        .await;
    assert_eq!(swaps, Some(2));
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = db_path(&temp_dir);

    {
        let ingestor = open_ingestor(&path).await;
        ingestor
            .ingest(&[register(), price_weth(), join()])
            .await
            .unwrap();
    }

    let ingestor = open_ingestor(&path).await;
    let before = ingestor
        .with_store(|store| store.load::<Balancer>(&VAULT_ID.to_string()))
        .await
        .unwrap();
    assert_eq!(before.total_liquidity, Decimal::from(40_000));

    let result = ingestor.ingest(&[join(), swap(0)]).await.unwrap();
    assert_eq!(result.duplicates_skipped, 1);
    assert_eq!(result.events_applied, 1);

    let vault = ingestor
        .with_store(|store| store.load::<Balancer>(&VAULT_ID.to_string()))
        .await
        .unwrap();
    assert_eq!(vault.total_liquidity, Decimal::from(40_000));
    assert_eq!(vault.total_swap_volume, Decimal::from(2_000));
}

#[tokio::test]
async fn test_invalid_events_recorded_and_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let ingestor = open_ingestor(&db_path(&temp_dir)).await;

    // Swap on a pool that was never registered.
    let result = ingestor.ingest(&[swap(0), register()]).await.unwrap();
    assert_eq!(result.invalid_skipped, 1);
    assert_eq!(result.events_applied, 1);

    let repo = ingestor.repository();
    assert_eq!(repo.count_processed_events(EventStatus::Invalid).await.unwrap(), 1);
    assert_eq!(repo.count_processed_events(EventStatus::Applied).await.unwrap(), 1);

    let result = ingestor.ingest(&[swap(0)]).await.unwrap();
    assert_eq!(result.duplicates_skipped, 1);
}

#[tokio::test]
async fn test_persist_failure_restores_committed_state() {
    let temp_dir = TempDir::new().unwrap();
    let path = db_path(&temp_dir);
    let ingestor = open_ingestor(&path).await;
    ingestor
        .ingest(&[register(), price_weth(), join()])
        .await
        .unwrap();

    let side_pool = init_db(&path).await.unwrap();
    sqlx::query(
        r#"
        CREATE TRIGGER freeze_swaps BEFORE UPDATE ON pools
        WHEN NEW.swaps_count > 0
        BEGIN SELECT RAISE(ABORT, 'swaps frozen'); END
        "#,
    )
    .execute(&side_pool)
    .await
    .unwrap();

    let result = ingestor.ingest(&[swap(0)]).await;
    assert!(matches!(result, Err(IngestionError::Db(_))));
    let swaps = ingestor
        .with_store(|store| store.load::<Pool>(&pool_id()).map(|p| p.swaps_count))
        .await;
    assert_eq!(swaps, Some(0));

    // The swap was never recorded, so it applies once the trigger is gone.
    sqlx::query("DROP TRIGGER freeze_swaps")
        .execute(&side_pool)
        .await
        .unwrap();
    let result = ingestor.ingest(&[swap(0)]).await.unwrap();
    assert_eq!(result.events_applied, 1);
    let swaps = ingestor
        .with_store(|store| store.load::<Pool>(&pool_id()).map(|p| p.swaps_count))
        .await;
    assert_eq!(swaps, Some(1));
}

#[tokio::test]
async fn test_persist_and_reload_failure_rolls_back_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = db_path(&temp_dir);
    let ingestor = open_ingestor(&path).await;
    ingestor
        .ingest(&[register(), price_weth(), join()])
        .await
        .unwrap();

    let second_join = event(
        5,
        0,
        EventKind::PoolBalanceChanged {
            pool_id: pool_id(),
            deltas: vec![(weth(), Decimal::from(10))],
            shares_delta: Decimal::from(50),
        },
    );

    // Both the batch write and a reload from SQLite now fail.
    let side_pool = init_db(&path).await.unwrap();
    sqlx::query("ALTER TABLE balancer_snapshots RENAME TO balancer_snapshots_moved")
        .execute(&side_pool)
        .await
        .unwrap();
    assert!(ingestor.repository().load_store().await.is_err());

    let result = ingestor.ingest(&[second_join.clone()]).await;
    assert!(matches!(result, Err(IngestionError::Db(_))));
    let vault = ingestor
        .with_store(|store| store.load::<Balancer>(&VAULT_ID.to_string()))
        .await
        .unwrap();
    assert_eq!(vault.total_liquidity, Decimal::from(40_000));

    sqlx::query("ALTER TABLE balancer_snapshots_moved RENAME TO balancer_snapshots")
        .execute(&side_pool)
        .await
        .unwrap();
    let result = ingestor.ingest(&[second_join]).await.unwrap();
    assert_eq!(result.events_applied, 1);

    let pool = ingestor
        .with_store(|store| store.load::<Pool>(&pool_id()))
        .await
        .unwrap();
    assert_eq!(pool.total_liquidity, Decimal::from(60_000));
    let vault = ingestor
        .repository()
        .get_balancer(VAULT_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vault.total_liquidity, Decimal::from(60_000));
}

#[tokio::test]
async fn test_source_error_propagates() {
    let temp_dir = TempDir::new().unwrap();
    let ingestor = open_ingestor(&db_path(&temp_dir)).await;

    let failing = MockEventSource::new()
        .with_event(register())
        .with_error(EventSourceError::NetworkError("timeout".to_string()));
    let result = ingestor
        .sync(&failing, BlockNumber::new(0), BlockNumber::new(10))
        .await;
    assert!(matches!(
        result,
        Err(IngestionError::Source(EventSourceError::NetworkError(_)))
    ));
}

#[tokio::test]
async fn test_sync_past_source_head_applies_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let ingestor = open_ingestor(&db_path(&temp_dir)).await;

    let lagging = source().with_head(BlockNumber::new(3));
    let result = ingestor
        .sync(&lagging, BlockNumber::new(0), BlockNumber::new(4))
        .await;
    assert!(matches!(
        result,
        Err(IngestionError::Source(EventSourceError::AheadOfHead { requested: 4, head: 3 }))
    ));
    assert_eq!(
        ingestor
            .repository()
            .count_processed_events(EventStatus::Applied)
            .await
            .unwrap(),
        0
    );

    let result = ingestor
        .sync(&lagging, BlockNumber::new(0), BlockNumber::new(3))
        .await
        .unwrap();
    assert_eq!(result.events_applied, 3);
}
