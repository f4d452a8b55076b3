//! Threaded snapshot stream with backpressure and cancellation

mod common;

use std::{thread, time::Duration};

use common::{reference_config, run_to_end, with_status};
use gridrl::{Snapshot, Status, TrainingStream};

#[test]
fn test_stream_matches_direct_run() {
    let config = reference_config().with_episodes(8);
    let (direct, direct_result) = run_to_end(config.clone());

    let mut stream = TrainingStream::spawn(config).unwrap();
    let streamed: Vec<Snapshot> = stream.by_ref().collect();
    let result = stream.join().unwrap();

    assert_eq!(streamed, direct);
    assert_eq!(result, direct_result);
}

#[test]
fn test_cancel_mid_episode_closes_with_cancelled() {
    let config = reference_config()
        .with_episodes(10_000)
        .with_step_delay_ms(5);
    let mut stream = TrainingStream::spawn(config).unwrap();

    let mut received: Vec<Snapshot> = stream.by_ref().take(3).collect();
    stream.cancel();
    received.extend(stream.by_ref());
    let result = stream.join().unwrap();

    assert_eq!(with_status(&received, Status::Cancelled).len(), 1);
    assert!(with_status(&received, Status::Done).is_empty());
    assert_eq!(received.last().unwrap().status, Status::Cancelled);
    assert!(result.cancelled);
    assert!(result.episodes_completed < 10_000);
}

#[test]
fn test_cancel_token_works_from_another_thread() {
    let config = reference_config()
        .with_episodes(10_000)
        .with_step_delay_ms(2);
    let mut stream = TrainingStream::spawn(config).unwrap();
    let token = stream.cancel_token();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        token.cancel();
    });

    let received: Vec<Snapshot> = stream.by_ref().collect();
    canceller.join().unwrap();
    let result = stream.join().unwrap();

    assert_eq!(received.last().unwrap().status, Status::Cancelled);
    assert!(result.cancelled);
}

#[test]
fn test_producer_waits_for_consumer() {
    let mut stream = TrainingStream::spawn(reference_config().with_episodes(2)).unwrap();
    let first = stream.next().unwrap();
    thread::sleep(Duration::from_millis(50));
    let second = stream.next().unwrap();

    // nothing was skipped while the consumer was idle
    assert_eq!(first.step, 1);
    assert_eq!(second.step, 2);
    stream.join().unwrap();
}
