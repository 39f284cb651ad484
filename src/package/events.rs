//! Lifecycle events of an install task
//!
//! A task owns an [`EventPublisher`] and hands out receivers through
//! `subscribe`. Every receiver sees the full event history, so subscribing
//! after `install()` returns never misses the early events.

use crate::di::Release;
use crate::package::manifest::Manifest;
use component_core::InstallError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Something that happened to a single install task.
#[derive(Debug, Clone)]
pub enum InstallEvent {
    /// The version range resolved to a release.
    Resolved(Release),
    /// A file transfer is starting.
    File(String),
    /// The task failed. Terminal.
    Error(InstallError),
    /// Every file was written. Terminal.
    End(Arc<Manifest>),
}

impl InstallEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstallEvent::Error(_) | InstallEvent::End(_))
    }
}

/// Replaying broadcast of events to any number of subscribers.
pub struct EventPublisher<E> {
    state: Mutex<PublisherState<E>>,
}

struct PublisherState<E> {
    history: Vec<E>,
    subscribers: Vec<UnboundedSender<E>>,
    closed: bool,
}

impl<E: Clone> EventPublisher<E> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PublisherState {
                history: Vec::new(),
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PublisherState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Receive every event published so far, then live events. The
    /// receiver yields `None` once the publisher is closed.
    pub fn subscribe(&self) -> UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state();
        for event in &state.history {
            // rx is alive, send cannot fail
            let _ = tx.send(event.clone());
        }
        if !state.closed {
            state.subscribers.push(tx);
        }
        rx
    }

    /// Deliver `event` to all subscribers. Ignored once closed.
    pub fn publish(&self, event: E) {
        let mut state = self.state();
        if state.closed {
            return;
        }
        state
            .subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        state.history.push(event);
    }

    /// Stop publishing and end every subscription.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.subscribers.clear();
    }

    /// Events published so far
    pub fn history(&self) -> Vec<E> {
        self.state().history.clone()
    }
}

impl<E: Clone> Default for EventPublisher<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(mut rx: UnboundedReceiver<u32>) -> Vec<u32> {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event);
        }
        seen
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_history() {
        let publisher = EventPublisher::new();
        publisher.publish(1);
        publisher.publish(2);

        let rx = publisher.subscribe();
        publisher.publish(3);
        publisher.close();

        assert_eq!(drain(rx).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_subscribe_after_close() {
        let publisher = EventPublisher::new();
        publisher.publish(7);
        publisher.close();
        publisher.publish(8);

        assert_eq!(drain(publisher.subscribe()).await, vec![7]);
        assert_eq!(publisher.history(), vec![7]);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let publisher = EventPublisher::new();
        let rx = publisher.subscribe();
        drop(rx);
        publisher.publish(1);
        assert!(publisher.state().subscribers.is_empty());
    }

    #[test]
    fn test_terminal_events() {
        assert!(InstallEvent::End(Arc::new(Manifest::default())).is_terminal());
        assert!(InstallEvent::Error(InstallError::directory("x")).is_terminal());
        assert!(!InstallEvent::File("a.js".to_string()).is_terminal());
        assert!(!InstallEvent::Resolved(Release::new("1.0.0")).is_terminal());
    }
}
