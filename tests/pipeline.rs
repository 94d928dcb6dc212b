use chrono::{DateTime, Duration, TimeZone, Utc};
use pairflow::aggregator::SymbolOutcome;
use pairflow::config::PipelineSettings;
use pairflow::dataset::{Dataset, Device};
use pairflow::error::PipelineError;
use pairflow::memory_store::MemoryBarStore;
use pairflow::models::{CashFuturesType, FutureBar, OptionBar, PutCallType};
use pairflow::pairing::PairFinder;
use pairflow::pipeline::{build_dataset_for_symbols, build_universal_dataset};
use pairflow::ranker::SymbolRanker;
use pairflow::store::TimeRange;
use std::sync::Once;
use uuid::Uuid;

fn ensure_test_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap()
}

fn at(minute: i64) -> DateTime<Utc> {
    session_start() + Duration::minutes(minute)
}

fn future_bar(symbol: &str, minute: i64, close: f64, volume: i64, contract_month: i32) -> FutureBar {
    let timestamp = at(minute);
    FutureBar {
        symbol_code: symbol.to_string(),
        timestamp,
        trade_date: timestamp.date_naive(),
        execution_date: None,
        index_type: "NK2".to_string(),
        session_id: 1,
        open: close,
        high: close,
        low: close,
        close,
        volume,
        vwap: close,
        trade_count: 3,
        record_no: minute,
        contract_month,
    }
}

fn option_bar(symbol: &str, minute: i64, close: f64, volume: i64, contract_month: i32) -> OptionBar {
    let timestamp = at(minute);
    OptionBar {
        symbol_code: symbol.to_string(),
        timestamp,
        trade_date: timestamp.date_naive(),
        execution_date: None,
        underlying_code: "NK22".to_string(),
        put_call_type: PutCallType::Put,
        session_id: 1,
        open: close,
        high: close,
        low: close,
        close,
        volume,
        vwap: close,
        trade_count: 2,
        record_no: minute,
        contract_month,
        exercise_price: 37_500.0,
        cash_futures_type: CashFuturesType::Futures,
    }
}

/// `minutes` aligned bars whose option close rises every minute.
fn seed_rising_pair(
    store: &mut MemoryBarStore,
    future: &str,
    option: &str,
    contract_month: i32,
    minutes: i64,
) {
    for m in 0..minutes {
        let t = m as f64;
        store.insert_future(future_bar(future, m, 38_000.0 + t * 5.0, 1_000 + m, contract_month));
        store.insert_option(option_bar(option, m, 120.0 + t, 40 + m, contract_month));
    }
}

fn settings_for(range: TimeRange) -> PipelineSettings {
    PipelineSettings {
        ranking_range: Some(range),
        ..PipelineSettings::default()
    }
}

fn full_day() -> TimeRange {
    TimeRange::new(session_start(), session_start() + Duration::days(1))
}

#[tokio::test]
async fn forty_aligned_minutes_give_four_rising_windows() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    seed_rising_pair(&mut store, "FUT0001", "OPT0001", 202503, 40);

    let build = build_universal_dataset(&store, &settings_for(full_day()), Utc::now(), false)
        .await
        .unwrap();

    assert_eq!(build.dataset.feature_shape(), [4, 30, 4]);
    assert_eq!(build.dataset.label_shape(), [4, 1]);
    assert_eq!(build.dataset.labels(), &[1.0, 1.0, 1.0, 1.0]);
    assert_eq!(build.summary.attempted, 1);
    assert_eq!(
        build.summary.symbols[0].outcome,
        SymbolOutcome::Contributed {
            future_symbol: "FUT0001".to_string(),
            aligned_rows: 40,
            windows: 4,
        }
    );
}

#[tokio::test]
async fn unmatched_minutes_are_dropped_before_windowing() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    seed_rising_pair(&mut store, "FUT0001", "OPT0001", 202503, 40);
    // Option-only and future-only minutes never reach the feature engine.
    store.insert_option(option_bar("OPT0001", 100, 1.0, 1, 202503));
    store.insert_future(future_bar("FUT0001", 101, 1.0, 1, 202503));

    let build = build_universal_dataset(&store, &settings_for(full_day()), Utc::now(), false)
        .await
        .unwrap();
    assert_eq!(build.dataset.len(), 4);
}

#[tokio::test]
async fn repeated_builds_are_identical() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    seed_rising_pair(&mut store, "FUT0001", "OPT0001", 202503, 45);
    seed_rising_pair(&mut store, "FUT0002", "OPT0002", 202504, 50);
    let settings = settings_for(full_day());

    let first = build_universal_dataset(&store, &settings, Utc::now(), false)
        .await
        .unwrap();
    let second = build_universal_dataset(&store, &settings, Utc::now(), false)
        .await
        .unwrap();

    assert_eq!(first.dataset, second.dataset);
    assert_eq!(first.summary, second.summary);
}

#[tokio::test]
async fn dataset_length_is_sum_of_symbol_contributions() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    seed_rising_pair(&mut store, "FUT0001", "OPT0001", 202503, 40);
    seed_rising_pair(&mut store, "FUT0002", "OPT0002", 202504, 47);
    seed_rising_pair(&mut store, "FUT0003", "OPT0003", 202505, 12);
    let settings = PipelineSettings::default();
    let symbols: Vec<String> = ["OPT0001", "OPT0002", "OPT0003"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let build = build_dataset_for_symbols(&store, &settings, &symbols, false)
        .await
        .unwrap();

    // 39 and 46 feature vectors less lookback and horizon; the third is too short.
    assert_eq!(build.dataset.len(), 4 + 11);
    assert_eq!(build.summary.contributed, 2);
    assert!(matches!(
        build.summary.symbols[2].outcome,
        SymbolOutcome::Insufficient { aligned_rows: 12, .. }
    ));
}

#[tokio::test]
async fn ranker_orders_by_volume_within_range() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    store.insert_option(option_bar("OPTA", 0, 10.0, 300, 202503));
    store.insert_option(option_bar("OPTB", 1, 10.0, 700, 202503));
    store.insert_option(option_bar("OPTC", 2, 10.0, 200, 202503));
    // Outside the range; would otherwise outrank everything.
    store.insert_option(option_bar("OPTD", 60 * 24 * 3, 10.0, 9_000, 202503));

    let ranked = SymbolRanker::new(&store)
        .top_active_options(&full_day(), 2)
        .await
        .unwrap();
    assert_eq!(ranked, vec!["OPTB".to_string(), "OPTA".to_string()]);
}

#[tokio::test]
async fn pair_finder_uses_full_history_volume() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    store.insert_option(option_bar("OPT0001", 0, 10.0, 1, 202503));
    store.insert_future(future_bar("FUTX", 0, 38_000.0, 1_000, 202503));
    store.insert_future(future_bar("FUTY", 0, 38_000.0, 2_000, 202503));
    store.insert_future(future_bar("FUTY", 60 * 24 * 30, 38_000.0, 3_000, 202503));
    store.insert_future(future_bar("FUTZ", 0, 38_000.0, 90_000, 202506));

    let future = PairFinder::new(&store)
        .matching_future("OPT0001")
        .await
        .unwrap();
    assert_eq!(future, "FUTY");
}

#[tokio::test]
async fn empty_ranking_range_is_no_data() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    seed_rising_pair(&mut store, "FUT0001", "OPT0001", 202503, 40);
    let later = TimeRange::new(
        session_start() + Duration::days(10),
        session_start() + Duration::days(11),
    );

    let err = build_universal_dataset(&store, &settings_for(later), Utc::now(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoData { .. }));
}

#[tokio::test]
async fn built_dataset_survives_file_round_trip_on_device() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    seed_rising_pair(&mut store, "FUT0001", "OPT0001", 202503, 42);
    let settings = PipelineSettings {
        device: Device::Cuda(0),
        ..settings_for(full_day())
    };

    let build = build_universal_dataset(&store, &settings, Utc::now(), false)
        .await
        .unwrap();
    assert_eq!(build.dataset.device(), Device::Cuda(0));

    let dir = std::env::temp_dir().join(format!("pairflow-{}", Uuid::new_v4()));
    let path = dir.join("dataset.bin");
    build.dataset.save_to_file(&path).unwrap();
    let loaded = Dataset::load_from_file(&path).unwrap();
    assert_eq!(loaded, build.dataset);
    assert_eq!(loaded.window(0).map(|w| w.len()), Some(30 * 4));
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn offline_build_reads_bar_snapshot() {
    ensure_test_env();
    let mut store = MemoryBarStore::new();
    seed_rising_pair(&mut store, "FUT0001", "OPT0001", 202503, 40);
    let path = std::env::temp_dir().join(format!("pairflow-bars-{}.bin", Uuid::new_v4()));
    store.save_to_file(&path).unwrap();

    let restored = MemoryBarStore::load_from_file(&path).unwrap();
    let build = build_universal_dataset(&restored, &settings_for(full_day()), Utc::now(), false)
        .await
        .unwrap();
    assert_eq!(build.dataset.len(), 4);
    std::fs::remove_file(&path).ok();
}
