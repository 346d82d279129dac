use dashmap::DashMap;
use futures_util::stream::Stream;
use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Weak,
    },
    task::{Context, Poll},
};
use strata_cache::DomainEvent;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

/// Backlog at which a subscriber is first reported as falling behind. Reported again at
/// every doubling after that.
const BACKLOG_WARNING: usize = 1 << 13;

struct Subscriber {
    sender: UnboundedSender<Arc<DomainEvent>>,
    backlog: Arc<AtomicUsize>,
}

struct BusRef {
    next_id: AtomicU64,
    subscribers: DashMap<u64, Subscriber>,
}

/// Fans domain events out to every subscriber.
///
/// Each subscriber gets its own queue, so a slow consumer never holds up the apply
/// loop or the other subscribers. Subscribers only see events published after they
/// subscribed.
#[derive(Clone)]
pub struct EventBus(Arc<BusRef>);

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self(Arc::new(BusRef {
            next_id: AtomicU64::new(0),
            subscribers: DashMap::new(),
        }))
    }

    pub fn subscribe(&self) -> EventStream {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, rx) = unbounded_channel();
        let backlog = Arc::new(AtomicUsize::new(0));
        self.0.subscribers.insert(
            id,
            Subscriber {
                sender,
                backlog: Arc::clone(&backlog),
            },
        );
        EventStream {
            id,
            bus: Arc::downgrade(&self.0),
            inner: UnboundedReceiverStream::new(rx),
            backlog,
        }
    }

    /// Queues the event for every live subscriber and returns how many it reached.
    pub fn publish(&self, event: DomainEvent) -> usize {
        self.publish_shared(Arc::new(event))
    }

    pub(crate) fn publish_shared(&self, event: Arc<DomainEvent>) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        for subscriber in self.0.subscribers.iter() {
            if subscriber.sender.send(Arc::clone(&event)).is_ok() {
                delivered += 1;
                let backlog = subscriber.backlog.fetch_add(1, Ordering::Relaxed) + 1;
                if backlog >= BACKLOG_WARNING && backlog.is_power_of_two() {
                    warn!(subscriber = *subscriber.key(), backlog, "Subscriber is falling behind");
                }
            } else {
                closed.push(*subscriber.key());
            }
        }
        for id in closed {
            debug!(subscriber = id, "Pruning closed subscriber");
            self.0.subscribers.remove(&id);
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.len()
    }

    /// The most events any single subscriber has queued and not read yet.
    pub fn max_backlog(&self) -> usize {
        self.0
            .subscribers
            .iter()
            .map(|s| s.backlog.load(Ordering::Relaxed))
            .max()
            .unwrap_or(0)
    }
}

/// The receiving end of a subscription. Ends once every [`EventBus`] handle is gone.
pub struct EventStream {
    id: u64,
    bus: Weak<BusRef>,
    inner: UnboundedReceiverStream<Arc<DomainEvent>>,
    backlog: Arc<AtomicUsize>,
}

impl EventStream {
    /// Events published to this subscriber that it hasn't read yet.
    pub fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Relaxed)
    }
}

impl Stream for EventStream {
    type Item = Arc<DomainEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(Some(_)) = polled {
            self.backlog.fetch_sub(1, Ordering::Relaxed);
        }
        polled
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.subscribers.remove(&self.id);
        }
    }
}
