use std::sync::Arc;

use super::{config::SupervisorConfig, supervisor::Supervisor};
use crate::device::SensorPort;
use crate::events::Bus;
use crate::sink::TelemetrySink;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Supervisor`] with optional subscribers.
pub struct SupervisorBuilder<S, T> {
    cfg: SupervisorConfig,
    sensor: S,
    sink: T,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<S: SensorPort, T: TelemetrySink> SupervisorBuilder<S, T> {
    pub fn new(cfg: SupervisorConfig, sensor: S, sink: T) -> Self {
        Self {
            cfg,
            sensor,
            sink,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (bring-up, readings, backoff, ...)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the supervisor, spawning one worker per subscriber.
    ///
    /// Must be called inside a tokio runtime. The maintenance schedule starts
    /// counting from this call.
    pub fn build(self) -> Supervisor<S, T> {
        let bus = Bus::new(self.cfg.bus_capacity);
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        Supervisor::new_internal(self.cfg, self.sensor, self.sink, bus, subs)
    }
}
