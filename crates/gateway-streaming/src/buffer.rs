//! Internal buffer shapes backing each [`crate::config::BackpressureMode`].
//!
//! A background task (spawned by [`crate::transport::StreamTransport`])
//! drains the provider's raw chunk source into one of these as fast as
//! it can; the transport's consumer loop drains the buffer on its own
//! schedule. `Buffer`/`Error` are backed by a bounded `mpsc` channel
//! (the channel itself gives blocking-producer and reject-on-full
//! semantics respectively); `DropOldest`/`Latest` need bespoke shapes
//! since `mpsc` doesn't support evicting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gateway_core::stream::StreamChunk;
use tokio::sync::{Mutex, Notify};

/// Ring buffer of at most `capacity` chunks; pushing past capacity drops
/// the oldest unread chunk.
pub(crate) struct RingBuffer {
    queue: Mutex<VecDeque<StreamChunk>>,
    notify: Notify,
    capacity: usize,
    done: AtomicBool,
}

impl RingBuffer {
    pub(crate) fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            done: AtomicBool::new(false),
        })
    }

    /// Returns `true` if an unread chunk was dropped to make room.
    pub(crate) async fn push(&self, chunk: StreamChunk) -> bool {
        let mut queue = self.queue.lock().await;
        let dropped = if queue.len() >= self.capacity {
            queue.pop_front();
            true
        } else {
            false
        };
        queue.push_back(chunk);
        drop(queue);
        self.notify.notify_one();
        dropped
    }

    pub(crate) async fn pop(&self) -> Option<StreamChunk> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(chunk) = self.queue.lock().await.pop_front() {
                return Some(chunk);
            }
            if self.done.load(Ordering::SeqCst) {
                return self.queue.lock().await.pop_front();
            }
            notified.await;
        }
    }

    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// Single-slot buffer; a new push always overwrites whatever hasn't been
/// read yet.
pub(crate) struct LatestSlot {
    slot: Mutex<Option<StreamChunk>>,
    notify: Notify,
    done: AtomicBool,
}

impl LatestSlot {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
            done: AtomicBool::new(false),
        })
    }

    /// Returns `true` if an unread chunk was overwritten.
    pub(crate) async fn set(&self, chunk: StreamChunk) -> bool {
        let mut slot = self.slot.lock().await;
        let overwritten = slot.is_some();
        *slot = Some(chunk);
        drop(slot);
        self.notify.notify_one();
        overwritten
    }

    pub(crate) async fn pop(&self) -> Option<StreamChunk> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(chunk) = self.slot.lock().await.take() {
                return Some(chunk);
            }
            if self.done.load(Ordering::SeqCst) {
                return self.slot.lock().await.take();
            }
            notified.await;
        }
    }

    pub(crate) fn mark_done(&self) {
        self.done.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::response::{FinishReason, Usage};
    use uuid::Uuid;

    fn delta(index: u64) -> StreamChunk {
        StreamChunk::Delta {
            request_id: Uuid::nil(),
            index,
            content: index.to_string(),
        }
    }

    fn done(index: u64) -> StreamChunk {
        StreamChunk::Done {
            request_id: Uuid::nil(),
            index,
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }
    }

    #[tokio::test]
    async fn ring_buffer_drops_oldest_over_capacity() {
        let ring = RingBuffer::new(2);
        assert!(!ring.push(delta(0)).await);
        assert!(!ring.push(delta(1)).await);
        assert!(ring.push(delta(2)).await);

        assert_eq!(ring.pop().await.unwrap().index(), 1);
        assert_eq!(ring.pop().await.unwrap().index(), 2);
    }

    #[tokio::test]
    async fn ring_buffer_pop_returns_none_after_done_and_drained() {
        let ring = RingBuffer::new(4);
        ring.push(done(0)).await;
        ring.mark_done();
        assert!(ring.pop().await.is_some());
        assert!(ring.pop().await.is_none());
    }

    #[tokio::test]
    async fn latest_slot_overwrites_unread_chunk() {
        let slot = LatestSlot::new();
        assert!(!slot.set(delta(0)).await);
        assert!(slot.set(delta(1)).await);
        assert_eq!(slot.pop().await.unwrap().index(), 1);
    }

    #[tokio::test]
    async fn latest_slot_pop_returns_none_after_done_and_drained() {
        let slot = LatestSlot::new();
        slot.mark_done();
        assert!(slot.pop().await.is_none());
    }
}
