//! The event bus: registry, hand-off point and dispatch workers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::BusConfig;
use crate::error::{BusError, Result};
use crate::event::Event;
use crate::handler::EventHandler;
use crate::state::BusState;
use crate::tracker::{InFlight, Tracker};

type SharedHandler<E> = Arc<dyn EventHandler<E>>;

/// An event travelling from a publisher to a worker.
struct Delivery<E> {
    event: E,
    accepted: oneshot::Sender<()>,
    in_flight: InFlight,
}

/// Kind → handlers map. Read on every fan-out, written on registration.
struct Registry<E: Event> {
    handlers: Mutex<HashMap<E::Kind, Vec<SharedHandler<E>>>>,
}

impl<E: Event> Registry<E> {
    fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    fn add(&self, kind: E::Kind, handler: SharedHandler<E>) {
        lock(&self.handlers).entry(kind).or_default().push(handler);
    }

    fn count(&self, kind: E::Kind) -> usize {
        lock(&self.handlers).get(&kind).map_or(0, Vec::len)
    }

    /// Copies the current handler list so the lock is not held while spawning.
    fn snapshot(&self, kind: E::Kind) -> Vec<SharedHandler<E>> {
        lock(&self.handlers).get(&kind).cloned().unwrap_or_default()
    }
}

/// What a dispatch worker needs. Holds no lifecycle state, so dropping every
/// [`EventBus`] handle closes the hand-off channel and ends the workers.
struct Dispatcher<E: Event> {
    registry: Arc<Registry<E>>,
    tracker: Arc<Tracker>,
}

impl<E: Event> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<E: Event> Dispatcher<E> {
    /// Spawns one task per registered handler and returns without waiting.
    fn fan_out(&self, event: E) {
        let kind = event.kind();
        let handlers = self.registry.snapshot(kind);

        if handlers.is_empty() {
            metrics::counter!("event_bus_unrouted_total", "kind" => kind.to_string()).increment(1);
            return;
        }

        let spawned = handlers.len() as u64;
        for handler in handlers {
            let event = event.clone();
            let in_flight = InFlight::enter(&self.tracker);
            self.tracker.record_spawn();

            tokio::spawn(async move {
                let _in_flight = in_flight;
                if let Err(error) = handler.handle(event).await {
                    metrics::counter!("event_bus_handler_failures_total", "kind" => kind.to_string())
                        .increment(1);
                    tracing::warn!(%kind, %error, "event handler failed");
                }
            });
        }

        metrics::counter!("event_bus_handler_tasks_total", "kind" => kind.to_string())
            .increment(spawned);
    }
}

async fn run_worker<E: Event>(
    worker: usize,
    dispatcher: Dispatcher<E>,
    receiver: Arc<AsyncMutex<mpsc::Receiver<Delivery<E>>>>,
) {
    tracing::debug!(worker, "dispatch worker started");

    loop {
        let next = receiver.lock().await.recv().await;
        let Some(Delivery {
            event,
            accepted,
            in_flight,
        }) = next
        else {
            break;
        };

        // The publisher may have gone away; the event is still ours to dispatch.
        let _ = accepted.send(());
        dispatcher.fan_out(event);
        drop(in_flight);
    }

    tracing::debug!(worker, "dispatch worker stopped");
}

struct Lifecycle<E> {
    state: BusState,
    sender: Option<mpsc::Sender<Delivery<E>>>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared<E: Event> {
    config: BusConfig,
    dispatcher: Dispatcher<E>,
    lifecycle: Mutex<Lifecycle<E>>,
}

/// In-process publish/subscribe bus.
///
/// Publishing is a rendezvous: [`publish`](Self::publish) returns once a
/// dispatch worker has accepted the event, never later. The worker then
/// spawns one independent task per handler registered for the event's kind
/// and goes straight back to accepting events. Handler tasks are not awaited,
/// cancelled or timed out by the bus; [`drain`](Self::drain) lets callers wait
/// for them.
///
/// Cloning yields another handle to the same bus.
pub struct EventBus<E: Event> {
    shared: Arc<Shared<E>>,
}

impl<E: Event> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl<E: Event> std::fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.shared.config)
            .field("state", &self.state())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl<E: Event> EventBus<E> {
    /// Creates a stopped bus. Call [`start`](Self::start) before publishing.
    pub fn new(config: BusConfig) -> Self {
        let dispatcher = Dispatcher {
            registry: Arc::new(Registry::new()),
            tracker: Arc::new(Tracker::default()),
        };

        Self {
            shared: Arc::new(Shared {
                config,
                dispatcher,
                lifecycle: Mutex::new(Lifecycle {
                    state: BusState::Stopped,
                    sender: None,
                    workers: Vec::new(),
                }),
            }),
        }
    }

    /// Creates a bus and starts its workers.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn started(config: BusConfig) -> Self {
        let bus = Self::new(config);
        bus.start();
        bus
    }

    pub fn config(&self) -> BusConfig {
        self.shared.config
    }

    pub fn state(&self) -> BusState {
        lock(&self.shared.lifecycle).state
    }

    /// Appends `handler` to the handlers of `kind`.
    ///
    /// Registering the same handler twice makes it fire twice. A registration
    /// racing with an in-flight publish of the same kind may or may not see
    /// that event.
    pub fn register<H>(&self, kind: E::Kind, handler: H)
    where
        H: EventHandler<E> + 'static,
    {
        self.shared.dispatcher.registry.add(kind, Arc::new(handler));
        tracing::debug!(%kind, "event handler registered");
    }

    /// Returns the number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.shared.dispatcher.registry.count(kind)
    }

    /// Spawns the configured number of dispatch workers. No-op when running.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = lock(&self.shared.lifecycle);
        if lifecycle.state == BusState::Running {
            return;
        }

        // Capacity one plus the acceptance ack gives a single-slot hand-off.
        let (sender, receiver) = mpsc::channel(1);
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let workers = self.shared.config.workers.max(1);

        lifecycle.workers = (0..workers)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    self.shared.dispatcher.clone(),
                    Arc::clone(&receiver),
                ))
            })
            .collect();
        lifecycle.sender = Some(sender);
        lifecycle.state = BusState::Running;

        tracing::info!(workers, "event bus started");
    }

    /// Closes the hand-off point and waits for the workers to exit.
    ///
    /// Publishers already waiting for a worker are still served; later calls
    /// to [`publish`](Self::publish) fail with [`BusError::Stopped`]. Handler
    /// tasks that are already running are left alone.
    pub async fn stop(&self) {
        let workers = {
            let mut lifecycle = lock(&self.shared.lifecycle);
            if lifecycle.state == BusState::Stopped {
                return;
            }
            lifecycle.state = BusState::Stopped;
            lifecycle.sender = None;
            std::mem::take(&mut lifecycle.workers)
        };

        for worker in workers {
            if let Err(error) = worker.await {
                tracing::error!(%error, "dispatch worker terminated abnormally");
            }
        }

        tracing::info!("event bus stopped");
    }

    /// Hands `event` to a dispatch worker.
    ///
    /// Suspends until a worker accepts the event. Success says nothing about
    /// the handlers: they run afterwards, on their own tasks.
    #[tracing::instrument(name = "bus.publish", skip_all, fields(kind = %event.kind()))]
    pub async fn publish(&self, event: E) -> Result<()> {
        let kind = event.kind();
        let sender = lock(&self.shared.lifecycle)
            .sender
            .clone()
            .ok_or(BusError::Stopped)?;

        let (accepted, acceptance) = oneshot::channel();
        let delivery = Delivery {
            event,
            accepted,
            in_flight: InFlight::enter(&self.shared.dispatcher.tracker),
        };

        sender
            .send(delivery)
            .await
            .map_err(|_| BusError::Stopped)?;
        drop(sender);

        acceptance.await.map_err(|_| BusError::Stopped)?;

        metrics::counter!("event_bus_published_total", "kind" => kind.to_string()).increment(1);
        tracing::debug!("event accepted by dispatch worker");
        Ok(())
    }

    /// Waits until no publish is pending and no handler task is running.
    ///
    /// Events published by handlers while draining are waited for as well, so
    /// a chain of reactions is fully settled when this returns. A handler
    /// that never finishes keeps this from returning.
    pub async fn drain(&self) {
        self.shared.dispatcher.tracker.wait_idle().await;
    }

    /// Pending hand-offs plus running handler tasks.
    pub fn in_flight(&self) -> usize {
        self.shared.dispatcher.tracker.in_flight()
    }

    /// Total handler tasks spawned since the bus was created.
    pub fn spawned_tasks(&self) -> u64 {
        self.shared.dispatcher.tracker.spawned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
