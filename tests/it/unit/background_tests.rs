//! Unit tests for the background executor and completion handles.

use recolor::background::{BackgroundExecutor, Completion, TaskResult};
use std::time::{Duration, Instant};

/// Poll `executor` until `count` messages arrived or `timeout` passed
fn collect<M: Send + 'static>(
    executor: &BackgroundExecutor<M>,
    count: usize,
    timeout: Duration,
) -> Vec<M> {
    let start = Instant::now();
    let mut messages = Vec::new();
    while messages.len() < count && start.elapsed() < timeout {
        messages.extend(executor.drain());
        std::thread::yield_now();
    }
    messages
}

#[test]
fn test_executor_creation() {
    let executor: BackgroundExecutor<()> = BackgroundExecutor::new(2);
    assert!(!executor.has_pending());
    assert_eq!(executor.pending_count(), 0);
}

#[test]
fn test_spawn_and_drain() {
    let executor = BackgroundExecutor::new(1);
    executor.spawn("answer", || Ok(42), |result: TaskResult<i32>| result);
    assert!(executor.has_pending());

    let messages = collect(&executor, 1, Duration::from_secs(5));
    assert_eq!(messages, vec![Ok::<_, String>(42)]);
    assert!(!executor.has_pending());
}

#[test]
fn test_errors_are_reported() {
    let executor = BackgroundExecutor::new(1);
    executor.spawn(
        "failing",
        || Err::<(), _>("disk full".to_string()),
        |result| result,
    );
    let message = executor.wait_next(Duration::from_secs(5));
    assert_eq!(message, Some(Err("disk full".to_string())));
}

#[test]
fn test_panics_become_errors() {
    let executor = BackgroundExecutor::new(1);
    executor.spawn(
        "exploding",
        || -> TaskResult<i32> { panic!("boom") },
        |result| result,
    );
    let message = executor.wait_next(Duration::from_secs(5)).unwrap();
    assert_eq!(message, Err("task 'exploding' panicked".to_string()));

    // The worker survives the panic
    executor.spawn("after", || Ok(1), |result| result);
    assert_eq!(executor.wait_next(Duration::from_secs(5)), Some(Ok(1)));
}

#[test]
fn test_many_tasks_all_report() {
    let executor = BackgroundExecutor::new(3);
    for i in 0..20 {
        executor.spawn("square", move || Ok(i * i), |result: TaskResult<i32>| result);
    }
    let mut values: Vec<i32> = collect(&executor, 20, Duration::from_secs(5))
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    values.sort();
    assert_eq!(values, (0..20).map(|i| i * i).collect::<Vec<_>>());
}

#[test]
fn test_completion_first_resolve_wins() {
    let completion: Completion<u32> = Completion::new();
    assert!(!completion.is_complete());
    assert_eq!(completion.result(), None);

    completion.resolve(Ok(1));
    completion.resolve(Ok(2));
    assert_eq!(completion.result(), Some(Ok(1)));

    let clone = completion.clone();
    assert!(clone.same_as(&completion));
    assert!(!Completion::<u32>::new().same_as(&completion));
}

#[test]
fn test_completion_wait_from_another_thread() {
    let completion: Completion<&'static str> = Completion::new();
    let remote = completion.clone();
    let handle = std::thread::spawn(move || remote.wait_timeout(Duration::from_secs(5)));

    completion.resolve(Ok("done"));
    assert_eq!(handle.join().unwrap(), Some(Ok("done")));
}

#[test]
fn test_completion_wait_times_out() {
    let completion: Completion<()> = Completion::new();
    assert_eq!(completion.wait_timeout(Duration::from_millis(10)), None);
}
