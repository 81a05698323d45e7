// Copyright (c) 2026 Stratus Authors
// SPDX-License-Identifier: AGPL-3.0
//! # Event Dispatcher
//!
//! A lazily-created, mutex-guarded singleton that fans platform
//! state-change notifications out to subscribers over tokio broadcast
//! channels.
//!
//! Lifecycle: `Uninitialized -> Active -> Closed` (terminal). The first
//! subscription constructs the underlying listener; the lock is held only
//! across the check-and-create step, never across the listener's lifetime.
//! Closing delivers a terminal shutdown item to every attached stream and
//! makes any later subscription fail immediately with the same error. A
//! failed construction leaves the cell `Uninitialized` so the next attempt
//! can retry.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use futures::Stream;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::domain::events::PlatformEvent;
use crate::error::ControllerError;

/// Buffered events per subscriber before old ones are dropped.
const CHANNEL_CAPACITY: usize = 1024;

/// What flows on the fan-out channel: events, then at most one terminal
/// shutdown marker.
#[derive(Debug, Clone)]
pub enum ListenerItem {
    Event(PlatformEvent),
    Shutdown(String),
}

/// The underlying notification source the listener is constructed from.
///
/// `open` attaches the fan-out sink to the source; a source that is
/// unavailable reports the error to the subscriber that triggered
/// construction and must leave no half-initialized state behind.
pub trait EventFeed: Send + Sync {
    fn open(&self, sink: broadcast::Sender<ListenerItem>) -> Result<(), ControllerError>;
}

/// The shared listener. At most one exists at any time.
pub struct EventListener {
    tx: broadcast::Sender<ListenerItem>,
}

impl EventListener {
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

enum DispatcherState {
    Uninitialized,
    Active(Arc<EventListener>),
    Closed(String),
}

pub struct EventDispatcher {
    state: Mutex<DispatcherState>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DispatcherState::Uninitialized),
        }
    }

    /// Attach a new independent subscriber stream, constructing the shared
    /// listener on first demand.
    ///
    /// Concurrent first subscribers race on the mutex; exactly one wins
    /// construction and every other caller observes the winner's result.
    pub fn subscribe(&self, feed: &dyn EventFeed) -> Result<EventStream, ControllerError> {
        let mut state = self.state.lock();
        match &*state {
            DispatcherState::Active(listener) => {
                debug!("reusing active event listener");
                Ok(EventStream::new(listener.tx.subscribe()))
            }
            DispatcherState::Closed(_) => Err(ControllerError::Shutdown),
            DispatcherState::Uninitialized => {
                let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
                // A failed open leaves the cell Uninitialized: the error goes
                // to this subscriber only and later attempts may succeed.
                feed.open(tx.clone())?;
                *state = DispatcherState::Active(Arc::new(EventListener { tx }));
                info!("event listener constructed");
                Ok(EventStream::new(rx))
            }
        }
    }

    /// Terminal close, run exactly once by the shutdown coordinator. Every
    /// attached stream observes the shutdown error and ends; subsequent
    /// subscriptions fail with the same error instead of re-creating the
    /// listener.
    pub fn close(&self, message: &str) {
        let mut state = self.state.lock();
        match &*state {
            DispatcherState::Closed(_) => return,
            DispatcherState::Active(listener) => {
                // No receivers is fine; nothing was attached.
                let _ = listener.tx.send(ListenerItem::Shutdown(message.to_string()));
                info!(subscribers = listener.subscriber_count(), "event listener closed");
            }
            DispatcherState::Uninitialized => {}
        }
        *state = DispatcherState::Closed(message.to_string());
    }

    pub fn is_active(&self) -> bool {
        matches!(&*self.state.lock(), DispatcherState::Active(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(&*self.state.lock(), DispatcherState::Closed(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum EventStreamError {
    #[error("{0}")]
    Shutdown(String),

    #[error("subscriber lagged by {0} events")]
    Lagged(u64),
}

/// One subscriber's independent delivery stream.
///
/// Ends when the dispatcher closes (after yielding the shutdown error) or
/// when the subscriber is dropped; dropping releases only this stream's slot.
#[derive(Debug)]
pub struct EventStream {
    inner: BroadcastStream<ListenerItem>,
    done: bool,
}

impl EventStream {
    fn new(rx: broadcast::Receiver<ListenerItem>) -> Self {
        Self {
            inner: BroadcastStream::new(rx),
            done: false,
        }
    }
}

impl Stream for EventStream {
    type Item = Result<PlatformEvent, EventStreamError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
            Some(Ok(ListenerItem::Event(event))) => Poll::Ready(Some(Ok(event))),
            Some(Ok(ListenerItem::Shutdown(message))) => {
                self.done = true;
                Poll::Ready(Some(Err(EventStreamError::Shutdown(message))))
            }
            Some(Err(BroadcastStreamRecvError::Lagged(n))) => {
                warn!(dropped = n, "event subscriber lagged");
                Poll::Ready(Some(Err(EventStreamError::Lagged(n))))
            }
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{ObjectType, PlatformEvent};
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Feed that records opens and hands the test a publishing handle.
    #[derive(Default)]
    struct TestFeed {
        opens: AtomicUsize,
        sink: Mutex<Option<broadcast::Sender<ListenerItem>>>,
    }

    impl TestFeed {
        fn publish(&self, event: PlatformEvent) {
            let guard = self.sink.lock();
            let sink = guard.as_ref().expect("feed not opened");
            sink.send(ListenerItem::Event(event)).unwrap();
        }
    }

    impl EventFeed for TestFeed {
        fn open(&self, sink: broadcast::Sender<ListenerItem>) -> Result<(), ControllerError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            *self.sink.lock() = Some(sink);
            Ok(())
        }
    }

    struct FailingFeed;

    impl EventFeed for FailingFeed {
        fn open(&self, _sink: broadcast::Sender<ListenerItem>) -> Result<(), ControllerError> {
            Err(ControllerError::internal("notification source unavailable"))
        }
    }

    fn event() -> PlatformEvent {
        PlatformEvent::new(ObjectType::App, "app-1", json!({"name": "web"}))
    }

    #[tokio::test]
    async fn subscribers_share_one_listener() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let feed = Arc::new(TestFeed::default());

        let mut streams = Vec::new();
        for _ in 0..3 {
            streams.push(dispatcher.subscribe(feed.as_ref()).unwrap());
        }
        assert_eq!(feed.opens.load(Ordering::SeqCst), 1);

        feed.publish(event());
        for stream in &mut streams {
            let received = stream.next().await.unwrap().unwrap();
            assert_eq!(received.object_id, "app-1");
        }
    }

    #[tokio::test]
    async fn concurrent_first_subscribers_construct_exactly_once() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let feed = Arc::new(TestFeed::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let dispatcher = dispatcher.clone();
            let feed = feed.clone();
            handles.push(tokio::spawn(async move {
                dispatcher.subscribe(feed.as_ref()).map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(feed.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_terminates_every_stream_with_shutdown_error() {
        let dispatcher = EventDispatcher::new();
        let feed = TestFeed::default();

        let mut first = dispatcher.subscribe(&feed).unwrap();
        let mut second = dispatcher.subscribe(&feed).unwrap();

        dispatcher.close("controller: shutting down");

        for stream in [&mut first, &mut second] {
            match stream.next().await {
                Some(Err(EventStreamError::Shutdown(message))) => {
                    assert_eq!(message, "controller: shutting down");
                }
                other => panic!("expected shutdown error, got {other:?}"),
            }
            assert!(stream.next().await.is_none());
        }

        // Late subscription fails with the same terminal error.
        match dispatcher.subscribe(&feed) {
            Err(ControllerError::Shutdown) => {}
            other => panic!("expected shutdown rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_construction_does_not_block_future_attempts() {
        let dispatcher = EventDispatcher::new();

        assert!(dispatcher.subscribe(&FailingFeed).is_err());
        assert!(!dispatcher.is_active());

        let feed = TestFeed::default();
        assert!(dispatcher.subscribe(&feed).is_ok());
        assert!(dispatcher.is_active());
    }

    #[tokio::test]
    async fn early_disconnect_releases_only_its_slot() {
        let dispatcher = EventDispatcher::new();
        let feed = TestFeed::default();

        let first = dispatcher.subscribe(&feed).unwrap();
        let mut second = dispatcher.subscribe(&feed).unwrap();
        drop(first);

        feed.publish(event());
        assert!(second.next().await.unwrap().is_ok());
        assert!(dispatcher.is_active());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let dispatcher = EventDispatcher::new();
        dispatcher.close("controller: shutting down");
        dispatcher.close("controller: shutting down");
        assert!(dispatcher.is_closed());
    }
}
