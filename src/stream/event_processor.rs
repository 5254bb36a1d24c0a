//! Event ingestion pipeline
//!
//! The processor consumes decoded events from a bounded queue and, while
//! running, fans each one out to the attached listeners, bumps the cumulative
//! counters, feeds the rolling rate windows and keeps the last few events
//! around for display.
//!
//! Control goes through a single-slot `watch` channel, so only the most
//! recent signal matters. The ingestion loop prefers control updates over
//! data when both are ready.

use crate::config::MonitorConfig;
use crate::core::Event;
use crate::error::{MonitorError, Result};
use crate::stream::rolling_window::RollingCounter;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Something that wants to see every processed event.
pub trait EventListener: Send + Sync {
    fn on_event_received(&self, event: &Event) -> Result<()>;
}

/// Lifecycle of the ingestion loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Terminal, the loop and background tasks are gone
    Stopped,
    /// Incoming events are dropped without any accounting
    Paused,
    Running,
}

impl std::fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessorState::Stopped => write!(f, "stopped"),
            ProcessorState::Paused => write!(f, "paused"),
            ProcessorState::Running => write!(f, "running"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Window {
    Events,
    Readings,
}

pub struct EventProcessor {
    config: MonitorConfig,
    control: watch::Sender<ProcessorState>,
    source: Mutex<Option<mpsc::Receiver<Event>>>,
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
    total_events: AtomicU64,
    total_readings: AtomicU64,
    /// f64 bit patterns
    events_rate: AtomicU64,
    readings_rate: AtomicU64,
    event_window: Mutex<RollingCounter>,
    reading_window: Mutex<RollingCounter>,
    recent: Mutex<VecDeque<Event>>,
}

impl EventProcessor {
    pub fn new(config: MonitorConfig, source: mpsc::Receiver<Event>) -> Self {
        let (control, _) = watch::channel(ProcessorState::Running);
        let window = || Mutex::new(RollingCounter::new(config.rate_window, config.rate_resolution));

        Self {
            control,
            source: Mutex::new(Some(source)),
            listeners: RwLock::new(Vec::new()),
            total_events: AtomicU64::new(0),
            total_readings: AtomicU64::new(0),
            events_rate: AtomicU64::new(0f64.to_bits()),
            readings_rate: AtomicU64::new(0f64.to_bits()),
            event_window: window(),
            reading_window: window(),
            recent: Mutex::new(VecDeque::with_capacity(config.recent_events)),
            config,
        }
    }

    /// Register a fan-out target. Listeners are invoked in attachment order.
    pub fn attach_listener(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner).push(listener);
    }

    pub fn activate(&self) {
        self.signal(ProcessorState::Running);
    }

    pub fn deactivate(&self) {
        self.signal(ProcessorState::Paused);
    }

    /// Terminate the loop and every background task. There is no way back.
    pub fn stop(&self) {
        self.signal(ProcessorState::Stopped);
    }

    fn signal(&self, next: ProcessorState) {
        let applied = self.control.send_if_modified(|state| {
            if *state == ProcessorState::Stopped || *state == next {
                return false;
            }
            *state = next;
            true
        });
        if applied {
            info!(state = %next, "event processor state change requested");
        }
    }

    /// Last requested state
    pub fn state(&self) -> ProcessorState {
        *self.control.borrow()
    }

    pub fn total_number_events(&self) -> u64 {
        self.total_events.load(Ordering::Relaxed)
    }

    pub fn total_number_readings(&self) -> u64 {
        self.total_readings.load(Ordering::Relaxed)
    }

    pub fn events_per_second_last_minute(&self) -> f64 {
        f64::from_bits(self.events_rate.load(Ordering::Relaxed))
    }

    pub fn readings_per_second_last_minute(&self) -> f64 {
        f64::from_bits(self.readings_rate.load(Ordering::Relaxed))
    }

    /// Most recent events, oldest first
    pub fn last_events(&self) -> Vec<Event> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner).iter().cloned().collect()
    }

    pub fn last_events_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.last_events())?)
    }

    /// Drive the ingestion loop until stopped or until the event source is
    /// closed. Can only be called once per processor.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let mut source = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(MonitorError::AlreadyRunning)?;

        let capacity = self.config.credit_capacity.max(1);
        let (event_credits, event_credit_rx) = mpsc::channel::<()>(capacity);
        let (reading_credits, reading_credit_rx) = mpsc::channel::<()>(capacity);

        let tasks: Vec<JoinHandle<()>> = vec![
            task::spawn(Arc::clone(&self).drain_credits(Window::Events, event_credit_rx)),
            task::spawn(Arc::clone(&self).drain_credits(Window::Readings, reading_credit_rx)),
            task::spawn(Arc::clone(&self).sample_rates(self.control.subscribe())),
        ];

        let mut control = self.control.subscribe();
        let mut state = *control.borrow_and_update();
        info!(state = %state, "event processor started");

        while state != ProcessorState::Stopped {
            tokio::select! {
                biased;

                changed = control.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    state = *control.borrow_and_update();
                    info!(state = %state, "event processor state changed");
                }
                received = source.recv() => {
                    let Some(event) = received else {
                        info!("event source closed, stopping event processor");
                        break;
                    };
                    if state == ProcessorState::Running {
                        self.process_event(event, &event_credits, &reading_credits).await;
                    } else {
                        debug!(event_id = %event.id, "dropping event while paused");
                    }
                }
            }
        }

        self.control.send_replace(ProcessorState::Stopped);
        drop(event_credits);
        drop(reading_credits);

        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "event processor task ended abnormally");
            }
        }

        info!(
            total_events = self.total_number_events(),
            total_readings = self.total_number_readings(),
            "event processor stopped"
        );
        Ok(())
    }

    async fn process_event(
        &self,
        event: Event,
        event_credits: &mpsc::Sender<()>,
        reading_credits: &mpsc::Sender<()>,
    ) {
        // Listeners run on the blocking pool. The loop still waits for them,
        // so a slow listener stalls ingestion but not the runtime.
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner).clone();
        let event = match task::spawn_blocking(move || {
            notify_listeners(&listeners, &event);
            event
        })
        .await
        {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "listener fan-out did not complete");
                return;
            }
        };

        let readings = event.readings.len();
        self.total_events.fetch_add(1, Ordering::Relaxed);
        self.total_readings.fetch_add(readings as u64, Ordering::Relaxed);

        // A full queue suspends the loop until the drain task catches up.
        let _ = event_credits.send(()).await;
        for _ in 0..readings {
            let _ = reading_credits.send(()).await;
        }

        if self.config.recent_events == 0 {
            return;
        }
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        while recent.len() >= self.config.recent_events {
            recent.pop_front();
        }
        recent.push_back(event);
    }

    /// Append one unit per credit. Ends once the loop drops its sender,
    /// which happens on stop; a blocked credit push can never outlive it.
    async fn drain_credits(self: Arc<Self>, window: Window, mut credits: mpsc::Receiver<()>) {
        let counter = match window {
            Window::Events => &self.event_window,
            Window::Readings => &self.reading_window,
        };

        while credits.recv().await.is_some() {
            let appended = lock(counter).append(1);
            if let Err(e) = appended {
                warn!(window = ?window, error = %e, "dropping rate sample");
            }
        }

        debug!(window = ?window, "credit drain finished");
    }

    async fn sample_rates(self: Arc<Self>, mut control: watch::Receiver<ProcessorState>) {
        let mut interval = time::interval(self.config.rate_sample_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while *control.borrow_and_update() != ProcessorState::Stopped {
            tokio::select! {
                biased;

                changed = control.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    let now = time::Instant::now();
                    let events = lock(&self.event_window).rate_at(now);
                    let readings = lock(&self.reading_window).rate_at(now);
                    self.events_rate.store(events.to_bits(), Ordering::Relaxed);
                    self.readings_rate.store(readings.to_bits(), Ordering::Relaxed);
                }
            }
        }

        debug!("rate sampler finished");
    }
}

fn notify_listeners(listeners: &[Arc<dyn EventListener>], event: &Event) {
    for (index, listener) in listeners.iter().enumerate() {
        match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event_received(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(listener = index, event_id = %event.id, error = %e, "listener failed");
            }
            Err(_) => {
                warn!(listener = index, event_id = %event.id, "listener panicked");
            }
        }
    }
}

fn lock(counter: &Mutex<RollingCounter>) -> std::sync::MutexGuard<'_, RollingCounter> {
    counter.lock().unwrap_or_else(PoisonError::into_inner)
}
