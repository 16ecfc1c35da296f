mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use sentinel_domain::{
    ChangeKind,
    CheckpointRepository,
    PassReason,
    PipelineError,
    RuntimeConfig,
    TriggerAction,
    MILLIS_PER_MINUTE,
};
use sentinel_infrastructure::MemoryRepo;

use common::{burst, default_now, memory_state, state_with, FixedClock, FlakyCheckpoints, FlakySource, BASE};

#[tokio::test]
async fn first_observation_is_a_baseline() {
    let (repo, _clock, state) = memory_state(RuntimeConfig::default());
    repo.append_records(burst("Jane_Doe", &[0, 2, 4, 5, 7, 9], 10.0)).await;
    let mut monitor = state.change_monitor();

    let decision = monitor.observe_and_maybe_trigger().await.expect("baseline");
    assert_eq!(decision.change, ChangeKind::Baseline);
    assert_eq!(decision.action, TriggerAction::None);
    assert_eq!(decision.delta, 0);
    assert_eq!(decision.current_row_count, 6);
    assert!(decision.pass.is_none());
    assert!(repo.alerts().await.is_empty());
    assert_eq!(monitor.last_known().map(|o| o.current_row_count), Some(6));
}

#[tokio::test]
async fn growth_triggers_one_pass_and_unchanged_does_not() {
    let (repo, _clock, state) = memory_state(RuntimeConfig::default());
    repo.append_records(burst("Bob_Ray", &[0, 30], 1.0)).await;
    let mut monitor = state.change_monitor();
    monitor.observe_and_maybe_trigger().await.expect("baseline");

    let new_rows: Vec<_> = (0..50)
        .map(|seq| common::tx("Jane_Doe", seq, 40 + seq as i64, 2.0))
        .collect();
    repo.append_records(new_rows).await;

    let grown = monitor.observe_and_maybe_trigger().await.expect("growth");
    assert_eq!(grown.change, ChangeKind::Growth);
    assert_eq!(grown.action, TriggerAction::Triggered);
    assert_eq!(grown.reason, Some(PassReason::Growth));
    assert_eq!(grown.delta, 50);
    let pass = grown.pass.expect("pass result");
    assert_eq!(pass.records_processed, 52);
    assert_eq!(pass.alerts_generated, 1);

    let quiet = monitor.observe_and_maybe_trigger().await.expect("unchanged");
    assert_eq!(quiet.change, ChangeKind::Unchanged);
    assert_eq!(quiet.action, TriggerAction::None);
    assert_eq!(quiet.delta, 0);
    assert_eq!(repo.alerts().await.len(), 1);
    assert_eq!(
        monitor.last_known().and_then(|o| o.last_processed_watermark),
        Some(BASE + 89 * MILLIS_PER_MINUTE)
    );
}

#[tokio::test]
async fn shrinking_dataset_triggers_replacement_pass() {
    let (repo, _clock, state) = memory_state(RuntimeConfig::default());
    repo.append_records(burst("Bob_Ray", &[0, 30, 60], 1.0)).await;
    let mut monitor = state.change_monitor();
    monitor.observe_and_maybe_trigger().await.expect("baseline");

    repo.replace_records(burst("Carl_Poe", &[0, 1], 1.0)).await;
    let decision = monitor.observe_and_maybe_trigger().await.expect("replaced");
    assert_eq!(decision.change, ChangeKind::Replaced);
    assert_eq!(decision.reason, Some(PassReason::Replaced));
    assert_eq!(decision.delta, -1);
    assert_eq!(decision.pass.expect("pass").records_processed, 2);
}

#[tokio::test]
async fn failed_pass_is_retried_on_next_tick() {
    let repo = Arc::new(MemoryRepo::new());
    let source = Arc::new(FlakySource::new(repo.clone()));
    let state = state_with(
        RuntimeConfig::default(),
        &repo,
        source.clone(),
        repo.clone(),
        FixedClock::at(default_now()),
    );
    let mut monitor = state.change_monitor();
    monitor.observe_and_maybe_trigger().await.expect("baseline");

    repo.append_records(burst("Jane_Doe", &[0, 2, 4, 5, 7, 9], 10.0)).await;
    source.fail_next_queries(1);
    let err = monitor
        .observe_and_maybe_trigger()
        .await
        .expect_err("pass fails");
    assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    assert_eq!(monitor.last_known().map(|o| o.current_row_count), Some(0));

    let retried = monitor.observe_and_maybe_trigger().await.expect("retry");
    assert_eq!(retried.change, ChangeKind::Growth);
    assert_eq!(retried.delta, 6);
    assert_eq!(retried.pass.expect("pass").alerts_generated, 1);
    assert_eq!(monitor.last_known().map(|o| o.current_row_count), Some(6));
}

#[tokio::test]
async fn unreadable_count_fails_without_running_a_pass() {
    let repo = Arc::new(MemoryRepo::new());
    let source = Arc::new(FlakySource::new(repo.clone()));
    let state = state_with(
        RuntimeConfig::default(),
        &repo,
        source.clone(),
        repo.clone(),
        FixedClock::at(default_now()),
    );
    let mut monitor = state.change_monitor();
    source.fail_counts(true);

    let err = monitor
        .observe_and_maybe_trigger()
        .await
        .expect_err("count fails");
    assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    assert!(monitor.last_known().is_none());
    assert!(repo.read("aml_processing").await.expect("read").is_none());
}

#[tokio::test]
async fn unreadable_checkpoint_is_treated_as_first_run() {
    let repo = Arc::new(MemoryRepo::new());
    let checkpoints = Arc::new(FlakyCheckpoints::new(repo.clone()));
    let state = state_with(
        RuntimeConfig::default(),
        &repo,
        repo.clone(),
        checkpoints.clone(),
        FixedClock::at(default_now()),
    );
    repo.append_records(burst("Jane_Doe", &[0, 2], 1.0)).await;
    checkpoints.fail_reads(true);

    let observation = state.change_monitor().observe().await.expect("observe");
    assert_eq!(observation.current_row_count, 2);
    assert_eq!(observation.last_processed_watermark, None);
}

#[tokio::test]
async fn tick_swallows_errors_and_counts_them() {
    let repo = Arc::new(MemoryRepo::new());
    let source = Arc::new(FlakySource::new(repo.clone()));
    let state = state_with(
        RuntimeConfig::default(),
        &repo,
        source.clone(),
        repo.clone(),
        FixedClock::at(default_now()),
    );
    let mut monitor = state.change_monitor();
    source.fail_counts(true);
    monitor.tick().await;
    source.fail_counts(false);
    monitor.tick().await;

    assert_eq!(monitor.ticks(), 2);
    let metrics = state.metrics.render_prometheus();
    assert!(metrics.contains("sentinel_monitor_ticks_total 2\n"));
    assert!(metrics.contains("sentinel_monitor_errors_total 1\n"));
}

#[tokio::test]
async fn run_loop_stops_on_shutdown() {
    let config = RuntimeConfig {
        monitor_interval_seconds: 1,
        ..RuntimeConfig::default()
    };
    let (_repo, _clock, state) = memory_state(config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(state.change_monitor().run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).expect("monitor still listening");

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor exits promptly")
        .expect("monitor task");
    assert!(state.metrics.render_prometheus().contains("sentinel_monitor_ticks_total 1\n"));
}
