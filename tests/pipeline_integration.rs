//! End-to-end pipeline behavior through the public API: dispatch, retry
//! semantics, failure isolation, and graceful drain.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_test::assert_ok;

use telemetry_batch::{
    AggregationPipeline, Batch, BatchConfig, BatchDispatcher, Batcher, DispatcherConfig,
    DrainOutcome, EngineError, ExecutionEngine, InProcessEngine, LifecycleCoordinator, MemorySink,
    PipelineError, Reading, RetryPolicy, StepExecutionConfig, StepFailure, StepKind,
    TelemetryConfig,
};

fn batch_of(values: &[f64]) -> Batch {
    let mut batcher = Batcher::new(values.len());
    let mut frozen = None;
    for &v in values {
        frozen = batcher.append(Reading::new(Utc::now(), v));
    }
    frozen.expect("batch at capacity")
}

fn fast_execution(max_attempts: u32) -> StepExecutionConfig {
    StepExecutionConfig {
        retry_initial_interval_ms: 1,
        retry_backoff_multiplier: 2.0,
        retry_max_interval_ms: 4,
        retry_max_attempts: max_attempts,
        step_timeout_ms: 1_000,
    }
}

#[tokio::test]
async fn reference_scenario_end_to_end() {
    let engine = Arc::new(InProcessEngine::new());
    let pipeline = AggregationPipeline::new(engine, &fast_execution(3));
    let batch = batch_of(&[48.0, 49.0, 52.0, 51.0]);

    let result = assert_ok!(pipeline.process(&batch).await);

    assert_eq!(result.batch_size, 4);
    assert_eq!(result.minimum, 48.0);
    assert_eq!(result.maximum, 52.0);
    assert_eq!(result.average, 50.0);
    assert!((result.std_dev - 1.58114).abs() < 1e-5);
    assert_eq!(result.first_value, 48.0);
    assert_eq!(result.last_value, 51.0);
    assert!(result.first_timestamp <= result.last_timestamp);
}

#[tokio::test]
async fn retry_exhaustion_reports_exact_attempt_count() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let engine = Arc::new(InProcessEngine::with_fault_hook(Arc::new(move |step, _| {
        if step == StepKind::Min {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("always fails".to_string())
        } else {
            Ok(())
        }
    })));
    let pipeline = AggregationPipeline::new(engine, &fast_execution(3));

    let error = pipeline.process(&batch_of(&[1.0, 2.0])).await.unwrap_err();

    // Exactly 3 attempts, not fewer or more
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    match error {
        PipelineError::StepFailed {
            step,
            source: EngineError::Step(StepFailure::RetriesExhausted { attempts, .. }),
        } => {
            assert_eq!(step, StepKind::Min);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected retries-exhausted step failure, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_batch_does_not_affect_concurrent_sibling() {
    let sink = Arc::new(MemorySink::new());
    // Single-reading batches are poisoned; everything else succeeds
    let engine = Arc::new(InProcessEngine::with_fault_hook(Arc::new(|_, batch| {
        if batch.len() == 1 {
            Err("poisoned".to_string())
        } else {
            Ok(())
        }
    })));
    let config = DispatcherConfig {
        workers: 2,
        queue_depth: 4,
        drain_timeout_ms: 5_000,
    };
    let pipeline = Arc::new(AggregationPipeline::new(engine, &fast_execution(3)));
    let dispatcher = BatchDispatcher::new(&config, pipeline, sink.clone());

    let poisoned = batch_of(&[0.0]);
    let poisoned_id = poisoned.batch_id;
    let healthy = batch_of(&[48.0, 49.0, 52.0, 51.0]);
    let healthy_id = healthy.batch_id;

    // Both in flight concurrently on the two workers
    dispatcher.submit(poisoned).await.unwrap();
    dispatcher.submit(healthy).await.unwrap();

    assert_eq!(dispatcher.shutdown().await, DrainOutcome::Completed);

    let results = sink.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].batch_id, healthy_id);
    assert_eq!(results[0].average, 50.0);

    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, poisoned_id);
}

#[tokio::test]
async fn backpressure_blocks_without_losing_batches() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(InProcessEngine::new());
    // One worker, queue depth one: submissions outpace the pipeline and must
    // block rather than drop
    let config = DispatcherConfig {
        workers: 1,
        queue_depth: 1,
        drain_timeout_ms: 10_000,
    };
    let pipeline = Arc::new(AggregationPipeline::new(engine, &fast_execution(3)));
    let dispatcher = BatchDispatcher::new(&config, pipeline, sink.clone());

    for i in 0..10 {
        let base = 40.0 + i as f64;
        assert_ok!(dispatcher.submit(batch_of(&[base, base + 2.0])).await);
    }

    assert_eq!(dispatcher.shutdown().await, DrainOutcome::Completed);
    assert_eq!(sink.results().len(), 10);
    assert!(sink.failures().is_empty());
}

#[tokio::test]
async fn drain_timeout_abandons_stuck_runs() {
    let sink = Arc::new(MemorySink::new());
    // Every attempt fails; with a high attempt cap and a real backoff the
    // run cannot finish inside the tiny drain budget
    let engine = Arc::new(InProcessEngine::with_fault_hook(Arc::new(|_, _| {
        Err("stuck".to_string())
    })));
    let execution = StepExecutionConfig {
        retry_initial_interval_ms: 50,
        retry_backoff_multiplier: 2.0,
        retry_max_interval_ms: 1_000,
        retry_max_attempts: 1_000,
        step_timeout_ms: 1_000,
    };
    let config = DispatcherConfig {
        workers: 1,
        queue_depth: 1,
        drain_timeout_ms: 100,
    };
    let pipeline = Arc::new(AggregationPipeline::new(engine, &execution));
    let dispatcher = BatchDispatcher::new(&config, pipeline, sink.clone());

    dispatcher.submit(batch_of(&[1.0])).await.unwrap();
    // Give the worker time to pick the batch up before closing the intake
    tokio::time::sleep(Duration::from_millis(20)).await;

    match dispatcher.shutdown().await {
        DrainOutcome::TimedOut { abandoned_workers } => assert_eq!(abandoned_workers, 1),
        DrainOutcome::Completed => panic!("expected the drain budget to expire"),
    }
    assert!(sink.results().is_empty());
}

#[tokio::test]
async fn unbounded_policy_recovers_eventually() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let engine = Arc::new(InProcessEngine::with_fault_hook(Arc::new(move |_, _| {
        // Fail the first 5 attempts of each step's sequence
        if counter.fetch_add(1, Ordering::SeqCst) % 6 < 5 {
            Err("flaky".to_string())
        } else {
            Ok(())
        }
    })));
    // max_attempts = 0 means unbounded retries
    let pipeline = AggregationPipeline::new(engine, &fast_execution(0));

    let result = pipeline.process(&batch_of(&[2.0, 4.0])).await.unwrap();
    assert_eq!(result.average, 3.0);
    assert_eq!(attempts.load(Ordering::SeqCst), 24);
}

#[tokio::test]
async fn coordinator_full_lifecycle() {
    let engine = Arc::new(InProcessEngine::new());
    let sink = Arc::new(MemorySink::new());
    let config = TelemetryConfig {
        batch: BatchConfig {
            capacity: 3,
            tick_interval_ms: 1,
        },
        dispatcher: DispatcherConfig {
            workers: 2,
            queue_depth: 4,
            drain_timeout_ms: 5_000,
        },
        execution: fast_execution(2),
        ..TelemetryConfig::default()
    };
    let coordinator = LifecycleCoordinator::new(config, engine.clone(), sink.clone());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { coordinator.run(shutdown_rx).await });

    tokio::time::sleep(Duration::from_millis(80)).await;
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert!(engine.is_closed());
    let results = sink.results();
    assert!(!results.is_empty());
    for result in &results {
        assert_eq!(result.batch_size, 3);
        assert!(result.minimum <= result.average && result.average <= result.maximum);
    }
}

#[tokio::test]
async fn closed_engine_surfaces_as_step_failure() {
    let engine = Arc::new(InProcessEngine::new());
    engine.close().await;

    let policy = RetryPolicy::from_config(&fast_execution(2));
    let result = engine
        .execute_step(
            StepKind::Max,
            &batch_of(&[1.0]),
            &policy,
            Duration::from_secs(1),
        )
        .await;
    assert!(matches!(result, Err(EngineError::ConnectionClosed)));
}
