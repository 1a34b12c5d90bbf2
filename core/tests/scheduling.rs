mod common;

use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use common::{config, failing, ok, scripted, sleeping, Probe, Step};
use dagrun_core::api::{
    execute_tasks, BlockingFnRunner, ExecutionEngine, SchedulerError, Task, TaskError,
    UnknownDependencyPolicy,
};

fn namespaces<O>(results: &[dagrun_core::api::TaskResult<O>]) -> Vec<&str> {
    results.iter().map(|r| r.namespace.as_str()).collect()
}

#[tokio::test]
async fn failure_is_isolated_among_independent_tasks() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(4, Duration::from_secs(5)));

    let batch = engine
        .execute(vec![ok("A"), failing("B"), ok("C")])
        .await
        .unwrap();

    assert_eq!((batch.total, batch.successful, batch.failed), (3, 2, 1));
    assert!(batch.get("A").unwrap().success);
    assert!(batch.get("C").unwrap().success);

    let b = batch.get("B").unwrap();
    assert!(!b.success);
    assert!(!b.skipped);
    assert_eq!(
        b.error,
        Some(TaskError::Failed("B failed on purpose".to_string()))
    );
    assert_eq!(b.output, None);
}

#[tokio::test]
async fn timed_out_task_fails_without_hanging_its_level() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(
        scripted(probe.clone()),
        config(4, Duration::from_millis(50)),
    );

    let started = Instant::now();
    let batch = engine
        .execute(vec![sleeping("slow", 5_000), ok("fast")])
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    let slow = batch.get("slow").unwrap();
    assert!(!slow.success);
    assert_eq!(slow.error, Some(TaskError::TimedOut(Duration::from_millis(50))));
    assert!(slow.error.as_ref().unwrap().is_timeout());
    assert!(batch.get("fast").unwrap().success);
    assert_eq!((batch.successful, batch.failed), (1, 1));
}

#[tokio::test]
async fn fail_fast_skips_every_later_level() {
    let probe = Probe::new();
    let mut cfg = config(4, Duration::from_secs(5));
    cfg.fail_fast = true;
    let engine = ExecutionEngine::new(scripted(probe.clone()), cfg);

    let batch = engine
        .execute(vec![
            failing("A"),
            ok("B").depends_on(["A"]),
            ok("C").depends_on(["A"]),
            ok("D").depends_on(["B", "C"]),
        ])
        .await
        .unwrap();

    assert_eq!(batch.levels, vec![vec!["A"], vec!["B", "C"], vec!["D"]]);
    assert_eq!(probe.invoked(), vec!["A"]);

    let a = batch.get("A").unwrap();
    assert!(a.is_failure());
    for ns in ["B", "C", "D"] {
        let r = batch.get(ns).unwrap();
        assert!(r.skipped, "{ns} should be skipped");
        assert!(!r.success);
        assert!(matches!(r.error, Some(TaskError::Skipped(_))));
    }
    assert_eq!(
        (batch.total, batch.successful, batch.failed, batch.skipped_count),
        (4, 0, 1, 3)
    );
}

#[tokio::test]
async fn fail_fast_lets_the_failing_level_finish() {
    let probe = Probe::new();
    let mut cfg = config(4, Duration::from_secs(5));
    cfg.fail_fast = true;
    let engine = ExecutionEngine::new(scripted(probe.clone()), cfg);

    let batch = engine
        .execute(vec![failing("A"), sleeping("B", 30), ok("C").depends_on(["B"])])
        .await
        .unwrap();

    assert!(batch.get("B").unwrap().success);
    assert!(batch.get("C").unwrap().skipped);
    assert_eq!(probe.calls(), 2);
}

#[tokio::test]
async fn diamond_succeeds_level_by_level() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(4, Duration::from_secs(5)));

    let batch = engine
        .execute(vec![
            ok("A"),
            ok("B").depends_on(["A"]),
            ok("C").depends_on(["A"]),
            ok("D").depends_on(["B", "C"]),
        ])
        .await
        .unwrap();

    assert_eq!(batch.levels, vec![vec!["A"], vec!["B", "C"], vec!["D"]]);
    assert_eq!((batch.total, batch.successful, batch.failed), (4, 4, 0));
    assert!(batch.is_success());

    let invoked = probe.invoked();
    assert_eq!(invoked.first().map(String::as_str), Some("A"));
    assert_eq!(invoked.last().map(String::as_str), Some("D"));
}

#[tokio::test]
async fn cycle_is_fatal_and_nothing_runs() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(4, Duration::from_secs(5)));

    let err = engine
        .execute(vec![
            ok("ok"),
            ok("X").depends_on(["Y"]),
            ok("Y").depends_on(["X"]),
        ])
        .await
        .unwrap_err();

    match err {
        SchedulerError::CyclicDependency { cycles } => {
            assert_eq!(cycles, vec![vec!["X".to_string(), "Y".to_string()]]);
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn duplicate_and_unknown_dependencies_are_fatal() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(4, Duration::from_secs(5)));

    let err = engine.execute(vec![ok("A"), ok("A")]).await.unwrap_err();
    assert_eq!(err, SchedulerError::DuplicateTask("A".to_string()));

    let err = engine
        .execute(vec![ok("A").depends_on(["ghost"])])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SchedulerError::UnknownDependency {
            task: "A".to_string(),
            dependency: "ghost".to_string(),
        }
    );

    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn treat_as_satisfied_places_task_in_first_level() {
    let probe = Probe::new();
    let mut cfg = config(4, Duration::from_secs(5));
    cfg.unknown_dependency_policy = UnknownDependencyPolicy::TreatAsSatisfied;
    let engine = ExecutionEngine::new(scripted(probe.clone()), cfg);

    let batch = engine
        .execute(vec![ok("A").depends_on(["done-elsewhere"]), ok("B").depends_on(["A"])])
        .await
        .unwrap();

    assert_eq!(batch.levels, vec![vec!["A"], vec!["B"]]);
    assert!(batch.is_success());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn running_tasks_never_exceed_max_workers() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(3, Duration::from_secs(5)));

    let tasks: Vec<_> = (0..12).map(|i| sleeping(&format!("t{i}"), 20)).collect();
    let batch = engine.execute(tasks).await.unwrap();

    assert!(batch.is_success());
    assert_eq!(probe.calls(), 12);
    assert!(probe.peak() <= 3, "peak was {}", probe.peak());
    assert!(probe.peak() >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timed_out_runners_still_count_against_max_workers() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(
        scripted(probe.clone()),
        config(1, Duration::from_millis(50)),
    );

    let batch = engine
        .execute(vec![
            sleeping("hog", 400),
            sleeping("next", 200),
            sleeping("third", 200),
        ])
        .await
        .unwrap();

    assert_eq!((batch.successful, batch.failed), (0, 3));
    for ns in ["hog", "next", "third"] {
        assert!(batch.get(ns).unwrap().error.as_ref().unwrap().is_timeout());
    }
    assert_eq!(probe.calls(), 3);
    assert_eq!(probe.peak(), 1, "peak was {} with max_workers=1", probe.peak());
}

#[tokio::test]
async fn next_level_waits_for_every_task_of_the_previous_one() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(4, Duration::from_secs(5)));

    let batch = engine
        .execute(vec![
            ok("fast"),
            sleeping("slow", 150),
            ok("child").depends_on(["fast"]),
        ])
        .await
        .unwrap();

    assert_eq!(batch.levels, vec![vec!["fast", "slow"], vec!["child"]]);
    assert_eq!(probe.invoked().last().map(String::as_str), Some("child"));

    let slow = batch.get("slow").unwrap();
    let child = batch.get("child").unwrap();
    assert!(
        child.start_time >= slow.end_time,
        "child started at {} before slow ended at {}",
        child.start_time,
        slow.end_time
    );
}

#[tokio::test]
async fn panicking_runner_does_not_abort_siblings() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(4, Duration::from_secs(5)));

    let batch = engine
        .execute(vec![ok("A"), Task::new("P", Step::Panic), ok("C")])
        .await
        .unwrap();

    assert_eq!(
        batch.get("P").unwrap().error,
        Some(TaskError::Panicked("P panicked".to_string()))
    );
    assert_eq!((batch.successful, batch.failed), (2, 1));
    assert_eq!(probe.active(), 0);
}

#[tokio::test]
async fn timeout_override_beats_batch_default() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(
        scripted(probe.clone()),
        config(4, Duration::from_millis(40)),
    );

    let batch = engine
        .execute(vec![
            sleeping("patient", 150).with_timeout(Duration::from_secs(5)),
            sleeping("default", 2_000),
        ])
        .await
        .unwrap();

    assert!(batch.get("patient").unwrap().success);
    assert_eq!(
        batch.get("default").unwrap().error,
        Some(TaskError::TimedOut(Duration::from_millis(40)))
    );
}

#[tokio::test]
async fn dependents_of_failures_still_run_by_default() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(4, Duration::from_secs(5)));

    let batch = engine
        .execute(vec![failing("A"), ok("B").depends_on(["A"])])
        .await
        .unwrap();

    assert_eq!(probe.invoked(), vec!["A", "B"]);
    assert!(batch.get("B").unwrap().success);
}

#[tokio::test]
async fn skip_dependents_on_failure_prunes_only_downstream() {
    let probe = Probe::new();
    let cfg = config(4, Duration::from_secs(5)).with_skip_dependents_on_failure(true);
    let engine = ExecutionEngine::new(scripted(probe.clone()), cfg);

    let batch = engine
        .execute(vec![
            failing("A"),
            ok("E"),
            ok("B").depends_on(["A"]),
            ok("F").depends_on(["E"]),
            ok("C").depends_on(["B"]),
        ])
        .await
        .unwrap();

    let mut invoked = probe.invoked();
    invoked.sort();
    assert_eq!(invoked, vec!["A", "E", "F"]);

    assert!(batch.get("B").unwrap().skipped);
    assert!(batch.get("C").unwrap().skipped);
    assert!(batch.get("F").unwrap().success);
    assert_eq!(
        (batch.successful, batch.failed, batch.skipped_count),
        (2, 1, 2)
    );
}

#[tokio::test]
async fn report_order_is_submission_order_and_levels_are_stable() {
    let tasks = || {
        vec![
            sleeping("slowest", 60),
            sleeping("middle", 30),
            ok("quick"),
            ok("after").depends_on(["quick", "slowest"]),
        ]
    };

    let mut seen_levels = Vec::new();
    for _ in 0..3 {
        let probe = Probe::new();
        let engine =
            ExecutionEngine::new(scripted(probe.clone()), config(4, Duration::from_secs(5)));
        let batch = engine.execute(tasks()).await.unwrap();

        assert_eq!(
            namespaces(&batch.results),
            vec!["slowest", "middle", "quick", "after"]
        );
        seen_levels.push(batch.levels.clone());
    }

    assert!(seen_levels.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(
        seen_levels[0],
        vec![vec!["slowest", "middle", "quick"], vec!["after"]]
    );
}

#[tokio::test]
async fn one_engine_serves_concurrent_batches() {
    let probe = Probe::new();
    let engine = ExecutionEngine::new(scripted(probe.clone()), config(2, Duration::from_secs(5)));

    let (left, right) = tokio::join!(
        engine.execute(vec![sleeping("L1", 20), ok("L2").depends_on(["L1"])]),
        engine.execute(vec![failing("R1"), ok("R2")]),
    );

    let left = left.unwrap();
    let right = right.unwrap();
    assert!(left.is_success());
    assert_eq!((right.successful, right.failed), (1, 1));
    assert_ne!(left.run_id, right.run_id);
    assert_eq!(probe.calls(), 4);
}

#[tokio::test]
async fn empty_batch_returns_empty_report() {
    let probe = Probe::new();
    let batch = execute_tasks(
        Vec::<Task<Step>>::new(),
        scripted(probe.clone()),
        config(1, Duration::from_secs(1)),
    )
    .await
    .unwrap();

    assert_eq!(batch.total, 0);
    assert!(batch.levels.is_empty());
    assert_eq!(batch.total_duration, Duration::ZERO);
}

#[tokio::test]
async fn blocking_runner_is_bounded_by_deadline() {
    let runner = BlockingFnRunner::new(|task: &Task<u64>| -> anyhow::Result<u64> {
        std::thread::sleep(Duration::from_millis(task.payload));
        Ok(task.payload)
    });
    let batch = execute_tasks(
        vec![Task::new("stuck", 300u64), Task::new("brief", 1u64)],
        runner,
        config(2, Duration::from_millis(50)),
    )
    .await
    .unwrap();

    assert!(batch.get("stuck").unwrap().error.as_ref().unwrap().is_timeout());
    assert_eq!(batch.get("brief").unwrap().output, Some(1));
}
