//! A bounded, blocking priority queue for a single consumer and many producers.
//!
//! The queue keeps its items in a binary heap behind a `parking_lot::Mutex`.
//! Two condition variables carry the blocking contracts: producers wait on
//! `not_full` when a blocking push meets a saturated queue, and the consumer
//! waits on `not_empty` until an item arrives. No operation uses a timeout.
//!
//! Ordering is "lowest priority value first", with ties broken by arrival.
//! Arrival is stamped at the moment of actual insertion, so a producer that
//! blocked on a full queue is ordered by when it got in, not when it called.

use crate::error::PushError;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use parking_lot::{Condvar, Mutex};

/// Anything that can be ordered by the queue.
pub trait Prioritized {
  /// Lower values are served earlier.
  fn priority(&self) -> u32;
}

/// A heap entry: the item plus the key it is ordered by.
struct Slot<T> {
  priority: u32,
  seq: u64,
  item: T,
}

impl<T> PartialEq for Slot<T> {
  fn eq(&self, other: &Self) -> bool {
    self.priority == other.priority && self.seq == other.seq
  }
}

impl<T> Eq for Slot<T> {}

impl<T> Ord for Slot<T> {
  fn cmp(&self, other: &Self) -> Ordering {
    // BinaryHeap is a max-heap: the "greatest" slot is the lowest priority
    // value, then the earliest sequence number.
    other
      .priority
      .cmp(&self.priority)
      .then_with(|| other.seq.cmp(&self.seq))
  }
}

impl<T> PartialOrd for Slot<T> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

/// The mutable state of the queue, only touched under the mutex.
struct QueueState<T> {
  heap: BinaryHeap<Slot<T>>,
  next_seq: u64,
  /// Once set, pushes are rejected. Resident items can still be popped or drained.
  closed: bool,
}

impl<T> QueueState<T> {
  fn insert(&mut self, item: T, priority: u32) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.heap.push(Slot {
      priority,
      seq,
      item,
    });
  }
}

/// A fixed-capacity priority queue with blocking and non-blocking insertion.
pub struct BoundedPriorityQueue<T> {
  capacity: usize,
  state: Mutex<QueueState<T>>,
  not_empty: Condvar,
  not_full: Condvar,
}

impl<T> fmt::Debug for BoundedPriorityQueue<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state.lock();
    f.debug_struct("BoundedPriorityQueue")
      .field("capacity", &self.capacity)
      .field("len", &state.heap.len())
      .field("closed", &state.closed)
      .finish()
  }
}

impl<T: Prioritized> BoundedPriorityQueue<T> {
  /// Creates an empty queue holding at most `capacity` items.
  ///
  /// # Panics
  ///
  /// Panics if `capacity` is zero; such a queue could never admit an item.
  pub fn new(capacity: usize) -> Self {
    assert!(capacity > 0, "BoundedPriorityQueue capacity must be non-zero");
    Self {
      capacity,
      state: Mutex::new(QueueState {
        heap: BinaryHeap::with_capacity(capacity),
        next_seq: 0,
        closed: false,
      }),
      not_empty: Condvar::new(),
      not_full: Condvar::new(),
    }
  }

  /// Like [`new`](Self::new), but returns `None` for a zero capacity.
  pub fn try_new(capacity: usize) -> Option<Self> {
    (capacity > 0).then(|| Self::new(capacity))
  }

  /// Inserts `item` in priority order.
  ///
  /// When the queue is full a blocking push suspends until a concurrent pop
  /// frees a slot; a non-blocking push fails with [`PushError::Full`] and leaves
  /// the queue untouched. A closed queue rejects with [`PushError::Closed`],
  /// including pushers that were blocked when it closed.
  pub fn push(&self, item: T, blocking: bool) -> Result<(), PushError<T>> {
    self.push_inner(item, blocking, false)
  }

  /// Like [`push`](Self::push), but closes the queue to further pushes in the
  /// same critical section that admits `item`.
  ///
  /// Items already resident (and `item` itself) remain available to `pop`.
  pub fn push_last(&self, item: T, blocking: bool) -> Result<(), PushError<T>> {
    self.push_inner(item, blocking, true)
  }

  fn push_inner(&self, item: T, blocking: bool, close_after: bool) -> Result<(), PushError<T>> {
    let mut state = self.state.lock();
    loop {
      if state.closed {
        return Err(PushError::Closed(item));
      }

      if state.heap.len() < self.capacity {
        let priority = item.priority();
        state.insert(item, priority);
        if close_after {
          state.closed = true;
        }
        drop(state);

        self.not_empty.notify_one();
        if close_after {
          // Blocked pushers must wake up to observe the close.
          self.not_full.notify_all();
        }
        return Ok(());
      }

      if !blocking {
        return Err(PushError::Full(item));
      }

      self.not_full.wait(&mut state);
    }
  }

  /// Removes and returns the lowest-priority, earliest-arrived item, blocking
  /// while the queue is empty.
  ///
  /// Returns `None` only once the queue is closed and empty, since nothing can
  /// arrive after that.
  pub fn pop(&self) -> Option<T> {
    let mut state = self.state.lock();
    loop {
      let next = state.heap.pop();
      if let Some(slot) = next {
        drop(state);
        self.not_full.notify_one();
        return Some(slot.item);
      }

      if state.closed {
        return None;
      }

      self.not_empty.wait(&mut state);
    }
  }

  /// Removes the next item if one is resident, without blocking.
  pub fn try_pop(&self) -> Option<T> {
    let mut state = self.state.lock();
    let slot = state.heap.pop()?;
    drop(state);
    self.not_full.notify_one();
    Some(slot.item)
  }

  /// Atomically removes every resident item, returned in service order.
  pub fn drain(&self) -> Vec<T> {
    let mut state = self.state.lock();
    let mut drained = Vec::with_capacity(state.heap.len());
    while let Some(slot) = state.heap.pop() {
      drained.push(slot.item);
    }
    drop(state);

    if !drained.is_empty() {
      self.not_full.notify_all();
    }
    drained
  }

  /// Stops admitting new items and wakes every blocked thread.
  ///
  /// Returns `false` if the queue was already closed.
  pub fn close(&self) -> bool {
    let mut state = self.state.lock();
    if state.closed {
      return false;
    }
    state.closed = true;
    drop(state);

    self.not_full.notify_all();
    self.not_empty.notify_all();
    true
  }

  pub fn is_closed(&self) -> bool {
    self.state.lock().closed
  }

  /// Returns the number of items currently resident.
  pub fn len(&self) -> usize {
    self.state.lock().heap.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Returns the fixed capacity chosen at construction.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn is_full(&self) -> bool {
    self.len() == self.capacity
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::thread;
  use std::time::Duration;

  #[derive(Debug, Clone, PartialEq, Eq)]
  struct Item {
    prio: u32,
    tag: &'static str,
  }

  fn item(prio: u32, tag: &'static str) -> Item {
    Item { prio, tag }
  }

  impl Prioritized for Item {
    fn priority(&self) -> u32 {
      self.prio
    }
  }

  fn tags(items: Vec<Item>) -> Vec<&'static str> {
    items.into_iter().map(|i| i.tag).collect()
  }

  #[test]
  fn pops_in_priority_order() {
    let q = BoundedPriorityQueue::new(8);
    q.push(item(5, "e"), false).unwrap();
    q.push(item(0, "a"), false).unwrap();
    q.push(item(3, "c"), false).unwrap();
    q.push(item(1, "b"), false).unwrap();
    q.push(item(4, "d"), false).unwrap();

    let popped: Vec<_> = (0..5).map(|_| q.pop().unwrap().tag).collect();
    assert_eq!(popped, vec!["a", "b", "c", "d", "e"]);
    assert!(q.is_empty());
  }

  #[test]
  fn equal_priorities_keep_arrival_order() {
    let q = BoundedPriorityQueue::new(6);
    q.push(item(2, "x1"), false).unwrap();
    q.push(item(1, "y1"), false).unwrap();
    q.push(item(2, "x2"), false).unwrap();
    q.push(item(1, "y2"), false).unwrap();
    q.push(item(2, "x3"), false).unwrap();

    assert_eq!(tags(q.drain()), vec!["y1", "y2", "x1", "x2", "x3"]);
  }

  #[test]
  fn full_queue_rejects_non_blocking_push() {
    let q = BoundedPriorityQueue::new(2);
    q.push(item(5, "a"), false).unwrap();
    q.push(item(1, "b"), false).unwrap();
    assert!(q.is_full());

    let err = q.push(item(3, "c"), false).unwrap_err();
    assert!(err.is_full());
    assert_eq!(err.into_inner().tag, "c");
    assert_eq!(q.len(), 2);

    assert_eq!(q.pop().unwrap().tag, "b");
    assert_eq!(q.pop().unwrap().tag, "a");
  }

  #[test]
  fn blocking_push_waits_for_pop() {
    let q = Arc::new(BoundedPriorityQueue::new(1));
    q.push(item(0, "first"), true).unwrap();

    let producer = {
      let q = q.clone();
      thread::spawn(move || q.push(item(0, "second"), true))
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!producer.is_finished(), "push should have blocked");
    assert_eq!(q.len(), 1);

    assert_eq!(q.pop().unwrap().tag, "first");
    producer.join().unwrap().unwrap();
    assert_eq!(q.pop().unwrap().tag, "second");
  }

  #[test]
  fn blocked_push_is_ordered_at_insertion_time() {
    let q = Arc::new(BoundedPriorityQueue::new(2));
    q.push(item(1, "resident"), true).unwrap();
    q.push(item(1, "filler"), true).unwrap();

    // Called while full; it is only stamped once a slot opens.
    let producer = {
      let q = q.clone();
      thread::spawn(move || q.push(item(1, "late"), true))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!producer.is_finished());

    assert_eq!(q.pop().unwrap().tag, "resident");
    producer.join().unwrap().unwrap();

    assert_eq!(tags(q.drain()), vec!["filler", "late"]);
  }

  #[test]
  fn blocked_push_takes_its_priority_when_admitted() {
    let q = Arc::new(BoundedPriorityQueue::new(2));
    q.push(item(5, "x"), true).unwrap();
    q.push(item(5, "y"), true).unwrap();

    let producer = {
      let q = q.clone();
      thread::spawn(move || q.push(item(0, "urgent"), true))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!producer.is_finished());

    assert_eq!(q.pop().unwrap().tag, "x");
    producer.join().unwrap().unwrap();

    // Admitted after "y", yet served before it.
    assert_eq!(tags(q.drain()), vec!["urgent", "y"]);
  }

  #[test]
  fn drain_returns_everything_in_service_order() {
    let q = BoundedPriorityQueue::new(4);
    q.push(item(9, "z"), false).unwrap();
    q.push(item(0, "a"), false).unwrap();
    q.push(item(9, "zz"), false).unwrap();

    assert_eq!(tags(q.drain()), vec!["a", "z", "zz"]);
    assert!(q.is_empty());
    assert!(q.drain().is_empty());
  }

  #[test]
  fn drain_unblocks_waiting_producer() {
    let q = Arc::new(BoundedPriorityQueue::new(1));
    q.push(item(0, "a"), true).unwrap();

    let producer = {
      let q = q.clone();
      thread::spawn(move || q.push(item(0, "b"), true))
    };
    thread::sleep(Duration::from_millis(50));

    assert_eq!(tags(q.drain()), vec!["a"]);
    producer.join().unwrap().unwrap();
    assert_eq!(q.len(), 1);
  }

  #[test]
  fn close_rejects_pushes_but_keeps_residents() {
    let q = BoundedPriorityQueue::new(4);
    q.push(item(0, "a"), false).unwrap();
    assert!(q.close());
    assert!(!q.close());

    let err = q.push(item(0, "b"), true).unwrap_err();
    assert!(err.is_closed());

    assert_eq!(q.pop().unwrap().tag, "a");
    // Closed and empty: pop no longer blocks.
    assert_eq!(q.pop(), None);
  }

  #[test]
  fn close_wakes_blocked_producer_with_closed() {
    let q = Arc::new(BoundedPriorityQueue::new(1));
    q.push(item(0, "a"), true).unwrap();

    let producer = {
      let q = q.clone();
      thread::spawn(move || q.push(item(0, "b"), true))
    };
    thread::sleep(Duration::from_millis(50));
    q.close();

    let err = producer.join().unwrap().unwrap_err();
    assert!(err.is_closed());
    assert_eq!(err.into_inner().tag, "b");
    assert_eq!(q.len(), 1);
  }

  #[test]
  fn close_wakes_blocked_consumer() {
    let q: Arc<BoundedPriorityQueue<Item>> = Arc::new(BoundedPriorityQueue::new(1));
    let consumer = {
      let q = q.clone();
      thread::spawn(move || q.pop())
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!consumer.is_finished());

    q.close();
    assert_eq!(consumer.join().unwrap(), None);
  }

  #[test]
  fn push_last_admits_item_then_closes() {
    let q = BoundedPriorityQueue::new(4);
    q.push(item(3, "log"), false).unwrap();
    q.push_last(item(3, "stop"), false).unwrap();
    assert!(q.is_closed());
    assert!(q.push(item(0, "after"), false).unwrap_err().is_closed());

    assert_eq!(q.pop().unwrap().tag, "log");
    assert_eq!(q.pop().unwrap().tag, "stop");
    assert_eq!(q.pop(), None);
  }

  #[test]
  fn pop_blocks_until_push() {
    let q = Arc::new(BoundedPriorityQueue::new(2));
    let consumer = {
      let q = q.clone();
      thread::spawn(move || q.pop())
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!consumer.is_finished(), "pop should block on an empty queue");

    q.push(item(7, "wake"), false).unwrap();
    assert_eq!(consumer.join().unwrap().unwrap().tag, "wake");
  }

  #[test]
  fn try_pop_does_not_block() {
    let q = BoundedPriorityQueue::new(1);
    assert_eq!(q.try_pop(), None);
    q.push(item(0, "a"), false).unwrap();
    assert_eq!(q.try_pop().unwrap().tag, "a");
  }

  #[test]
  fn try_new_rejects_zero_capacity() {
    assert!(BoundedPriorityQueue::<Item>::try_new(0).is_none());
    assert_eq!(BoundedPriorityQueue::<Item>::try_new(3).unwrap().capacity(), 3);
  }

  #[test]
  #[should_panic(expected = "capacity must be non-zero")]
  fn zero_capacity_panics() {
    let _ = BoundedPriorityQueue::<Item>::new(0);
  }
}
