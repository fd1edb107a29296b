//! # Supervisor: outer retry state machine around one sensor and one sink.
//!
//! The [`Supervisor`] exclusively owns a [`SensorPort`] and a [`TelemetrySink`],
//! the backoff state, and the maintenance schedule. It never exits on a
//! recoverable error: every failed cycle is torn down and retried after an
//! exponentially growing delay, until the stop token is cancelled.
//!
//! ## State machine
//! ```text
//!            ┌──────────────────────────────────────────────────────────────┐
//!            ▼                                                              │
//! Idle ─► Connecting ─► Measuring ─► Publishing(loop) ─► Stopping ─► (return)
//!            │  sensor.connect()      announce()           │
//!            │  sink.connect()        Session::run()       │ error
//!            │  start_measurement()                        ▼
//!            └──── error ──────────────────────────────► Teardown ─► Backoff ─┘
//! ```
//!
//! ## Per-cycle flow (`run`)
//! ```text
//! loop {
//!   ├─► token cancelled?            → break
//!   ├─► publish BringUpStarting{attempt}
//!   ├─► cycle():
//!   │     ├─ bring_up()            (both connects always attempted, sensor first)
//!   │     ├─ publish Connected
//!   │     ├─ Session::announce()   (identity → attributes)
//!   │     └─ Session::run(token)   (Ok on stop, Err on poll/publish failure)
//!   ├─► teardown()                 (always; best-effort; safe when nothing is open)
//!   ├─► Ok  → break
//!   └─► Err → publish CycleFailed, BackoffScheduled{delay}
//!             select! { sleep(delay), token.cancelled() → break }
//! }
//! publish Stopped
//! ```
//!
//! ## Rules
//! - At most one sensor connection and one sink connection exist; both are
//!   released before the next bring-up.
//! - The backoff delay is **never reset**: a later failure episode continues
//!   from the last delay, up to the cap. Steady-state failures consume the
//!   same progression as bring-up failures.
//! - Jitter (if configured) shortens the actual sleep only; the un-jittered
//!   delay drives the progression.
//! - The stop token interrupts the pacing and backoff sleeps but never an
//!   in-flight collaborator call.
//! - The maintenance timestamp starts at construction and survives reconnects.
//!
//! ## Example
//! ```no_run
//! use sen5x_bridge::{Config, ConfigLoader, LogWriter, Supervisor, ThingsBoardSink, open_linux};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config: Config = ConfigLoader::from_env().load()?;
//!     let sensor = open_linux(config.i2c_port.clone());
//!     let sink = ThingsBoardSink::new(config.thingsboard_settings());
//!
//!     Supervisor::builder(config.supervisor_config(), sensor, sink)
//!         .with_subscribers(vec![Arc::new(LogWriter::new())])
//!         .build()
//!         .serve()
//!         .await;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use tokio::{select, sync::broadcast::error::RecvError, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::{
    builder::SupervisorBuilder, config::SupervisorConfig, maintenance::MaintenanceSchedule,
    session::Session, shutdown,
};
use crate::device::SensorPort;
use crate::error::{CycleError, DeviceError, SinkError};
use crate::events::{Bus, Event, EventKind};
use crate::sink::TelemetrySink;
use crate::subscribers::SubscriberSet;

/// Owns both collaborators and drives connect → measure → publish → maintain.
pub struct Supervisor<S, T> {
    cfg: SupervisorConfig,
    sensor: S,
    sink: T,
    bus: Bus,
    /// Taken by the subscriber listener when `run` starts.
    subs: Option<SubscriberSet>,
    maintenance: MaintenanceSchedule,
    /// Last un-jittered backoff delay; `None` only before the first failure.
    prev_delay: Option<Duration>,
    /// Bring-up attempt counter (monotonic, never resets).
    attempt: u32,
}

impl<S: SensorPort, T: TelemetrySink> Supervisor<S, T> {
    /// Creates a supervisor without subscribers.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(cfg: SupervisorConfig, sensor: S, sink: T) -> Self {
        SupervisorBuilder::new(cfg, sensor, sink).build()
    }

    /// Starts a builder for attaching subscribers.
    pub fn builder(cfg: SupervisorConfig, sensor: S, sink: T) -> SupervisorBuilder<S, T> {
        SupervisorBuilder::new(cfg, sensor, sink)
    }

    pub(super) fn new_internal(
        cfg: SupervisorConfig,
        sensor: S,
        sink: T,
        bus: Bus,
        subs: SubscriberSet,
    ) -> Self {
        let maintenance = MaintenanceSchedule::new(cfg.cleaning_interval, time::Instant::now());
        Self {
            cfg,
            sensor,
            sink,
            bus,
            subs: Some(subs),
            maintenance,
            prev_delay: None,
            attempt: 0,
        }
    }

    /// Event bus; subscribe before calling `run` to observe every event.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs until SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere).
    ///
    /// If signal handlers cannot be installed the error is logged and the
    /// supervisor keeps running.
    pub async fn serve(self) {
        let token = CancellationToken::new();
        let watcher = {
            let token = token.clone();
            let bus = self.bus.clone();
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown_signal().await {
                    Ok(()) => {
                        bus.publish(Event::new(EventKind::ShutdownRequested));
                        token.cancel();
                    }
                    Err(e) => warn!(error = %e, "cannot install signal handlers"),
                }
            })
        };

        self.run(token).await;
        watcher.abort();
    }

    /// Runs the retry state machine until `token` is cancelled.
    ///
    /// After a stop, teardown has run and no connection remains open.
    pub async fn run(mut self, token: CancellationToken) {
        let listener = self.subscriber_listener();

        loop {
            if token.is_cancelled() {
                break;
            }

            self.attempt += 1;
            self.bus
                .publish(Event::new(EventKind::BringUpStarting).with_attempt(self.attempt));

            let outcome = self.cycle(&token).await;
            self.teardown().await;

            let err = match outcome {
                Ok(()) => break,
                Err(err) => err,
            };
            self.bus.publish(
                Event::new(EventKind::CycleFailed)
                    .with_attempt(self.attempt)
                    .with_label(err.as_label())
                    .with_reason(err.to_string()),
            );
            if token.is_cancelled() {
                break;
            }

            let delay = self.schedule_backoff();
            self.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_attempt(self.attempt)
                    .with_delay(delay)
                    .with_reason(err.to_string()),
            );
            select! {
                _ = time::sleep(delay) => {}
                _ = token.cancelled() => break,
            }
        }

        self.bus.publish(Event::new(EventKind::Stopped));
        if let Some(listener) = listener {
            let _ = listener.await;
        }
    }

    /// One bring-up plus the steady-state episode that follows it.
    async fn cycle(&mut self, token: &CancellationToken) -> Result<(), CycleError> {
        self.bring_up().await?;
        self.bus
            .publish(Event::new(EventKind::Connected).with_attempt(self.attempt));

        let mut session = Session {
            sensor: &mut self.sensor,
            sink: &mut self.sink,
            bus: &self.bus,
            maintenance: &mut self.maintenance,
            publish_interval: self.cfg.publish_interval,
        };
        session.announce().await?;
        session.run(token).await
    }

    /// Connects both collaborators and starts measuring.
    ///
    /// Both connects are attempted even if the first fails, so both causes are
    /// reported. Whatever did open is released by the following teardown.
    async fn bring_up(&mut self) -> Result<(), CycleError> {
        let sensor = self.sensor.connect().await;
        let sink = self.sink.connect().await;

        if sensor.is_err() || sink.is_err() {
            let mut causes = Vec::with_capacity(2);
            if let Err(e) = sensor {
                causes.push(format!("sensor: {e}"));
            }
            if let Err(e) = sink {
                causes.push(format!("sink: {e}"));
            }
            return Err(CycleError::BringUp {
                error: causes.join("; "),
            });
        }

        self.sensor
            .start_measurement()
            .await
            .map_err(|e| CycleError::StartMeasurement {
                error: e.to_string(),
            })
    }

    /// Best-effort release of both collaborators. Never fails.
    async fn teardown(&mut self) {
        match self.sensor.stop_measurement().await {
            Ok(()) | Err(DeviceError::NotConnected) => {}
            Err(e) => self.teardown_failed("stop_measurement", &e),
        }
        self.sensor.disconnect().await;

        match self.sink.disconnect().await {
            Ok(()) | Err(SinkError::NotConnected) => {}
            Err(e) => self.teardown_failed("sink_disconnect", &e),
        }
        self.bus.publish(Event::new(EventKind::TeardownCompleted));
    }

    fn teardown_failed(&self, step: &'static str, err: &dyn std::error::Error) {
        self.bus.publish(
            Event::new(EventKind::TeardownFailed)
                .with_label(step)
                .with_reason(err.to_string()),
        );
    }

    /// Advances the backoff progression and returns the sleep to take.
    fn schedule_backoff(&mut self) -> Duration {
        let base = self.cfg.backoff.next(self.prev_delay);
        self.prev_delay = Some(base);
        self.cfg.backoff.jittered(base)
    }

    /// Forwards bus events to the subscriber set until `Stopped` is seen,
    /// then drains the subscriber queues. No task is spawned without subscribers.
    fn subscriber_listener(&mut self) -> Option<JoinHandle<()>> {
        let set = self.subs.take().filter(|set| !set.is_empty())?;
        let mut rx = self.bus.subscribe();
        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let last = ev.kind == EventKind::Stopped;
                        set.emit(&ev);
                        if last {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        }))
    }
}
