//! Decoded mouse event queue
//!
//! Filled from interrupt context, drained by tasks. Both sides are lock-free
//! so the interrupt handler never waits on a consumer.

use super::mouse::MouseEvent;
use core::{
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    task::{Context, Poll},
};
use crossbeam_queue::ArrayQueue;
use futures_util::{stream::Stream, task::AtomicWaker};
use log::warn;

/// Bounded queue of mouse events; the oldest event is dropped when full
pub struct MouseEventQueue {
    events: ArrayQueue<MouseEvent>,
    waker: AtomicWaker,
    dropped: AtomicU64,
}

impl MouseEventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: ArrayQueue::new(capacity),
            waker: AtomicWaker::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue an event and wake the waiting consumer
    pub fn push(&self, event: MouseEvent) {
        if self.events.force_push(event).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Mouse event buffer overflow");
        }
        self.waker.wake();
    }

    pub fn pop(&self) -> Option<MouseEvent> {
        self.events.pop()
    }

    /// Take the next event, or register `cx` to be woken by the next push
    pub fn poll_event(&self, cx: &mut Context<'_>) -> Poll<MouseEvent> {
        if let Some(event) = self.events.pop() {
            return Poll::Ready(event);
        }

        self.waker.register(cx.waker());

        // An event pushed between the pop and the registration would
        // otherwise go unnoticed until the next one arrives
        match self.events.pop() {
            Some(event) => {
                self.waker.take();
                Poll::Ready(event)
            }
            None => Poll::Pending,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events lost to overflow
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discard everything queued
    pub fn clear(&self) {
        while self.events.pop().is_some() {}
    }

    pub fn stream(&self) -> MouseStream<'_> {
        MouseStream { queue: self }
    }
}

/// Stream that yields mouse events
pub struct MouseStream<'a> {
    queue: &'a MouseEventQueue,
}

impl Stream for MouseStream<'_> {
    type Item = MouseEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.queue.poll_event(cx).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::ps2_dev::packet::MouseButtons;
    use futures_util::{stream::StreamExt, task::noop_waker_ref};

    fn event(dx: i16) -> MouseEvent {
        MouseEvent {
            buttons: MouseButtons::default(),
            dx,
            dy: 0,
            x: 0,
            y: 0,
        }
    }

    #[test]
    fn events_come_out_in_order() {
        let queue = MouseEventQueue::new(4);
        queue.push(event(1));
        queue.push(event(2));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|e| e.dx), Some(1));
        assert_eq!(queue.pop().map(|e| e.dx), Some(2));
        assert!(queue.is_empty());
    }

    #[test]
    fn overflow_drops_the_oldest_event() {
        let queue = MouseEventQueue::new(2);
        for dx in 1..=3 {
            queue.push(event(dx));
        }

        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.pop().map(|e| e.dx), Some(2));
        assert_eq!(queue.pop().map(|e| e.dx), Some(3));
    }

    #[test]
    fn stream_is_pending_until_an_event_arrives() {
        let queue = MouseEventQueue::new(4);
        let mut cx = Context::from_waker(noop_waker_ref());
        let mut stream = queue.stream();

        assert_eq!(stream.poll_next_unpin(&mut cx), Poll::Pending);
        queue.push(event(7));
        assert_eq!(
            stream.poll_next_unpin(&mut cx).map(|e| e.map(|e| e.dx)),
            Poll::Ready(Some(7))
        );
    }

    #[test]
    fn clear_empties_the_queue() {
        let queue = MouseEventQueue::new(4);
        queue.push(event(1));
        queue.clear();
        assert!(queue.pop().is_none());
    }
}
