mod common;
use common::*;

use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tof_pipeline::{
  BoundedPriorityQueue, LifecycleState, Logger, LoggerConfig, Message, MeasurementRecord, SendError,
};

#[test]
fn saturated_queue_scenario() {
  let q = BoundedPriorityQueue::new(2);
  let target = std::path::Path::new("unused.txt");
  q.push(Message::log(b"a", target, 5).unwrap(), false).unwrap();
  q.push(Message::log(b"b", target, 1).unwrap(), false).unwrap();

  let err = q
    .push(Message::log(b"c", target, 3).unwrap(), false)
    .unwrap_err();
  assert!(err.is_full());
  assert_eq!(SendError::from(err), SendError::Full);
  assert_eq!(q.len(), 2);

  assert_eq!(q.pop().unwrap().payload(), b"b");
  assert_eq!(q.pop().unwrap().payload(), b"a");
}

#[test]
fn blocked_producer_resumes_after_worker_pop() {
  let Fixture { dir, logger } = Fixture::new(1);
  let target = dir.path().join("out.txt");
  logger.send_log(b"LOG#1\n", &target, 0, true).unwrap();

  let producer = {
    let logger = logger.clone();
    let target = target.clone();
    thread::spawn(move || logger.send_log(b"LOG#2\n", &target, 0, true))
  };
  thread::sleep(SHORT_TIMEOUT);
  assert!(!producer.is_finished(), "second send should be blocked");
  assert_eq!(logger.len(), 1);

  let worker = logger.spawn_worker().unwrap();
  producer.join().unwrap().unwrap();

  let (summary, residual) = logger.shutdown(0, worker);
  assert!(summary.unwrap().stopped);
  assert!(residual.is_empty());
  assert_eq!(read_lines(&target), vec!["LOG#1", "LOG#2"]);
}

#[test]
fn send_after_worker_observed_close_is_rejected() {
  let Fixture { dir, logger } = Fixture::new(4);
  let target = dir.path().join("out.txt");

  logger.send_close(0, true).unwrap();
  let summary = logger.worker().unwrap().run();
  assert!(summary.stopped);
  assert_eq!(logger.state(), LifecycleState::Stopped);

  assert_eq!(
    logger.send_log(b"too late", &target, 0, false),
    Err(SendError::Closed)
  );
  assert_eq!(
    logger.send_log(b"too late", &target, 0, true),
    Err(SendError::Closed)
  );
  assert!(logger.is_empty());
  assert!(logger.destroy().is_empty());
  assert!(!target.exists());
}

#[test]
fn destroy_returns_exactly_the_unexecuted_messages() {
  let Fixture { dir, logger } = Fixture::new(ITEMS_LOW + 1);
  let target = dir.path().join("out.txt");

  // Priorities 0..=4 interleaved; the close directive sits at priority 2.
  for i in 0..ITEMS_LOW {
    let line = format!("{}\n", i);
    logger
      .send_log(line.as_bytes(), &target, (i % 5) as u32, false)
      .unwrap();
  }
  logger.send_close(2, false).unwrap();

  let summary = logger.worker().unwrap().run();
  assert!(summary.stopped);

  let residual = logger.destroy();
  let written = read_lines(&target);

  // Priorities 0, 1 and 2 ran (2 was queued before the close); 3 and 4 remain.
  let expected_written: usize = (0..ITEMS_LOW).filter(|i| i % 5 <= 2).count();
  assert_eq!(written.len(), expected_written);
  assert_eq!(residual.len(), ITEMS_LOW - expected_written);
  assert!(residual.iter().all(|m| m.priority() >= 3));

  let mut seen = HashSet::new();
  for line in &written {
    assert!(seen.insert(line.clone()), "duplicate line {}", line);
  }

  // Residual comes back in service order.
  let prios: Vec<u32> = residual.iter().map(|m| m.priority()).collect();
  let mut sorted = prios.clone();
  sorted.sort();
  assert_eq!(prios, sorted);

  // The caller owns the returned buffers.
  for msg in residual {
    let line = String::from_utf8(msg.into_payload()).unwrap();
    assert!(seen.insert(line.trim_end().to_string()), "duplicate {:?}", line);
  }
  assert_eq!(seen.len(), ITEMS_LOW);
}

#[test]
fn written_lines_respect_per_priority_fifo() {
  let Fixture { dir, logger } = Fixture::new(ITEMS_MEDIUM + 1);
  let target = dir.path().join("out.txt");

  for i in 0..ITEMS_MEDIUM {
    let prio = (i % 3) as u32;
    logger
      .send_log(format!("{} {}\n", prio, i).as_bytes(), &target, prio, false)
      .unwrap();
  }
  logger.send_close(3, false).unwrap();
  logger.worker().unwrap().run();

  let mut last_prio = 0u32;
  let mut last_seq_per_prio = [None::<usize>; 3];
  for line in read_lines(&target) {
    let (p, i) = line.split_once(' ').unwrap();
    let p: u32 = p.parse().unwrap();
    let i: usize = i.parse().unwrap();
    assert!(p >= last_prio, "priority went backwards");
    last_prio = p;
    if let Some(prev) = last_seq_per_prio[p as usize] {
      assert!(i > prev, "same-priority lines reordered");
    }
    last_seq_per_prio[p as usize] = Some(i);
  }
  assert!(logger.destroy().is_empty());
}

#[test]
fn concurrent_producers_lose_nothing() {
  let Fixture { dir, logger } = Fixture::new(16);
  let target = dir.path().join("out.txt");
  let worker = logger.spawn_worker().unwrap();

  let producers = 4;
  let per_producer = ITEMS_MEDIUM;
  let barrier = Arc::new(std::sync::Barrier::new(producers));
  let handles: Vec<_> = (0..producers)
    .map(|p| {
      let logger = logger.clone();
      let target = target.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait();
        for i in 0..per_producer {
          logger
            .send_log(format!("{}:{}\n", p, i).as_bytes(), &target, 0, true)
            .unwrap();
        }
      })
    })
    .collect();
  for h in handles {
    h.join().unwrap();
  }

  let (summary, residual) = logger.shutdown(0, worker);
  assert!(residual.is_empty());
  let summary = summary.unwrap();
  assert_eq!(summary.executed as usize, producers * per_producer + 1);
  assert_eq!(summary.failed_writes, 0);

  let lines = read_lines(&target);
  assert_eq!(lines.len(), producers * per_producer);

  // Each producer's own lines stay in its send order.
  let mut next = vec![0usize; producers];
  for line in lines {
    let (p, i) = line.split_once(':').unwrap();
    let (p, i): (usize, usize) = (p.parse().unwrap(), i.parse().unwrap());
    assert_eq!(i, next[p]);
    next[p] += 1;
  }
}

#[test]
fn non_blocking_producer_sees_full_and_can_retry() {
  let Fixture { dir, logger } = Fixture::new(2);
  let target = dir.path().join("out.txt");

  logger.send_log(b"1\n", &target, 0, false).unwrap();
  logger.send_log(b"2\n", &target, 0, false).unwrap();
  assert_eq!(logger.send_log(b"3\n", &target, 0, false), Err(SendError::Full));
  logger
    .log_status("queue full, dropped message")
    .expect("status write");

  let worker = logger.spawn_worker().unwrap();
  // Retry with backpressure once the worker drains.
  logger.send_log(b"3\n", &target, 0, true).unwrap();
  let (_, residual) = logger.shutdown(0, worker);
  assert!(residual.is_empty());
  assert_eq!(read_lines(&target), vec!["1", "2", "3"]);
}

#[test]
fn rig_style_session_from_config() {
  let dir = tempfile::tempdir().unwrap();
  let yaml = format!(
    "capacity: 4\nstatus_log_path: {:?}\nresults_path: {:?}\nrecord_separator: \";\"\n",
    dir.path().join("status.log"),
    dir.path().join("tof_vals.txt")
  );
  let config = LoggerConfig::from_yaml_str(&yaml).unwrap();
  let logger = Logger::from_config(&config);
  let worker = logger.spawn_worker().unwrap();

  for n in 0..ITEMS_LOW {
    let record = MeasurementRecord::new(1_700_000_000.0 + n as f64, n as f64 * 0.5, 1e-9);
    let line = record.encode(config.record_separator, false);
    logger
      .send_log(line.as_bytes(), &config.results_path, config.priority, config.blocking)
      .unwrap();
  }

  let (summary, residual) = logger.shutdown(config.priority, worker);
  assert!(summary.unwrap().stopped);
  assert!(residual.is_empty());

  let lines = read_lines(&config.results_path);
  assert_eq!(lines.len(), ITEMS_LOW);
  let last = MeasurementRecord::parse(&lines[ITEMS_LOW - 1], ';').unwrap();
  assert_eq!(last.distance, (ITEMS_LOW - 1) as f64 * 0.5);

  let status = std::fs::read_to_string(&config.status_log_path).unwrap();
  assert!(status.contains("logger worker started"));
  assert!(status.contains("logger worker stopped"));
}
