use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use strata_cache::{Cache, CacheError, DomainEvent};
use strata_models::{
    gateway::{Dispatch, Ready},
    guild::GuildDelete,
    id::GuildId,
};
use tokio::{
    sync::{
        mpsc::{self, Receiver, Sender, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
    task::JoinHandle,
};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, info, warn};

use crate::{
    bus::EventBus,
    configuration::GatewayConfig,
    decoder::{decode, DecodeError, Envelope, GatewayEvent},
    error::GatewayError,
};

/// Things the connection manager has to act on itself.
#[derive(Debug)]
pub enum ControlEvent {
    /// A non-dispatch event such as `Hello` or `Reconnect`.
    Forward(GatewayEvent),
    /// An envelope that was dropped because it couldn't be decoded.
    DecodeFailed(DecodeError),
}

#[derive(Debug)]
pub enum Outcome {
    Applied(Arc<DomainEvent>),
    /// The dispatch referenced state the cache doesn't have and was skipped.
    Skipped(CacheError),
    Forward(GatewayEvent),
}

/// Applies the dispatches of one connection to the cache and publishes what changed.
pub struct Synchronizer {
    cache: Cache,
    bus: EventBus,
    owned: HashSet<GuildId>,
    last_sequence: Arc<AtomicU64>,
}

impl Synchronizer {
    pub fn new(cache: Cache, bus: EventBus) -> Self {
        Self {
            cache,
            bus,
            owned: HashSet::new(),
            last_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Guilds this connection has delivered and not lost since.
    pub fn owned_guilds(&self) -> &HashSet<GuildId> {
        &self.owned
    }

    pub fn last_sequence(&self) -> Option<u64> {
        match self.last_sequence.load(Ordering::Acquire) {
            0 => None,
            sequence => Some(sequence),
        }
    }

    pub fn process(&mut self, envelope: Envelope) -> Result<Outcome, DecodeError> {
        let event = match decode(envelope) {
            Ok(event) => event,
            Err(err) => {
                error!(error = %err, "Dropping an undecodable envelope");
                self.cache.stats().decode_failures.inc();
                return Err(err);
            }
        };

        match event {
            GatewayEvent::Dispatch { sequence, dispatch } => {
                if let Some(sequence) = sequence {
                    self.record_sequence(sequence);
                }
                Ok(self
                    .apply(&dispatch)
                    .map_or_else(Outcome::Skipped, Outcome::Applied))
            }
            other => Ok(Outcome::Forward(other)),
        }
    }

    /// Applies a dispatch and publishes the resulting event.
    pub fn apply(&mut self, dispatch: &Dispatch) -> Result<Arc<DomainEvent>, CacheError> {
        self.cache.stats().update(dispatch);
        if let Dispatch::Ready(ready) = dispatch {
            self.reconcile(ready);
        }

        let event = match self.cache.update(dispatch) {
            Ok(event) => Arc::new(event),
            Err(err) => {
                warn!(event = dispatch.name(), error = %err, "Skipping dispatch");
                self.cache.stats().inconsistent_references.inc();
                return Err(err);
            }
        };
        self.track(&event);

        let delivered = self.bus.publish_shared(Arc::clone(&event));
        debug!(kind = event.kind(), delivered, "Published event");
        Ok(event)
    }

    fn record_sequence(&self, sequence: u64) {
        let previous = self.last_sequence.fetch_max(sequence, Ordering::AcqRel);
        if sequence <= previous {
            debug!(sequence, previous, "Duplicate or stale sequence number");
        }
    }

    fn track(&mut self, event: &DomainEvent) {
        match event {
            DomainEvent::Ready { guilds, .. } => {
                self.owned = guilds.iter().copied().collect();
            }
            DomainEvent::GuildAvailable { guild, .. } => {
                self.owned.insert(guild.id);
            }
            DomainEvent::GuildUnavailable {
                guild_id,
                unavailable: false,
                ..
            } => {
                self.owned.remove(guild_id);
            }
            _ => {}
        }
    }

    /// Drops the guilds of the previous session that the new one no longer lists.
    fn reconcile(&mut self, ready: &Ready) {
        let listed = ready.guilds.iter().map(|g| g.id).collect::<HashSet<_>>();
        let gone = self.owned.difference(&listed).copied().collect::<Vec<_>>();
        for guild_id in gone {
            info!(guild = ?guild_id, "Guild was left while disconnected");
            let delete = GuildDelete {
                id: guild_id,
                unavailable: false,
            };
            if let Ok(event) = self.cache.update(&delete) {
                self.track(&event);
                self.bus.publish(event);
            }
        }
    }

    fn sequence_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.last_sequence)
    }
}

pub struct Gateway;

impl Gateway {
    /// Spawns the apply loop for one connection. Must be called from within a tokio runtime.
    pub fn start(
        config: &GatewayConfig,
        cache: Cache,
        bus: EventBus,
    ) -> Result<GatewayHandle, GatewayError> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let synchronizer = Synchronizer::new(cache, bus);
        let last_sequence = synchronizer.sequence_handle();
        let task = tokio::spawn(run(synchronizer, receiver, control_tx, stop_rx));

        Ok(GatewayHandle {
            sender,
            stop: stop_tx,
            task,
            last_sequence,
            control: Some(control_rx),
        })
    }
}

async fn run(
    mut synchronizer: Synchronizer,
    mut receiver: Receiver<Envelope>,
    control: UnboundedSender<ControlEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            envelope = receiver.recv() => match envelope {
                Some(envelope) => handle(&mut synchronizer, envelope, &control),
                None => return,
            },
        }
    }

    receiver.close();
    while let Some(envelope) = receiver.recv().await {
        handle(&mut synchronizer, envelope, &control);
    }
    debug!("Apply loop drained");
}

fn handle(
    synchronizer: &mut Synchronizer,
    envelope: Envelope,
    control: &UnboundedSender<ControlEvent>,
) {
    match synchronizer.process(envelope) {
        Ok(Outcome::Forward(event)) => {
            control.send(ControlEvent::Forward(event)).ok();
        }
        Ok(Outcome::Applied(_) | Outcome::Skipped(_)) => {}
        Err(err) => {
            control.send(ControlEvent::DecodeFailed(err)).ok();
        }
    }
}

pub struct GatewayHandle {
    sender: Sender<Envelope>,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
    last_sequence: Arc<AtomicU64>,
    control: Option<UnboundedReceiver<ControlEvent>>,
}

impl GatewayHandle {
    /// Queues an envelope, waiting while the queue is full.
    pub async fn send(&self, envelope: Envelope) -> Result<(), GatewayError> {
        self.sender
            .send(envelope)
            .await
            .map_err(|_| GatewayError::closed())
    }

    pub fn last_sequence(&self) -> Option<u64> {
        match self.last_sequence.load(Ordering::Acquire) {
            0 => None,
            sequence => Some(sequence),
        }
    }

    /// The control events of this connection. Can only be taken once.
    pub fn control(&mut self) -> Option<UnboundedReceiverStream<ControlEvent>> {
        self.control.take().map(UnboundedReceiverStream::new)
    }

    /// Stops accepting envelopes, applies everything already queued and waits for the loop to end.
    pub async fn stop(self) -> Result<(), GatewayError> {
        let Self {
            sender, stop, task, ..
        } = self;
        drop(sender);
        stop.send(()).ok();
        task.await?;
        Ok(())
    }
}
