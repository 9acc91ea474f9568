//! Rate-limited recomputation.
//!
//! [`Throttle`] is the clock-injected scheduling primitive: the first request
//! after a quiet period runs immediately, requests inside the interval collapse
//! into one trailing run at the end of it. Intermediate states are dropped; the
//! last one always lands.
//!
//! [`Dispatcher`] drives a [`FilterEngine`] with it on a tokio task and
//! publishes every recompute on a `watch` channel.

use crate::features::PointFeature;
use crate::filter::{FilterDimension, FilterEngine, Range, VisibleSet};
use crate::geometry::GeoPoint;
use crate::prelude::{CoreError, CoreResult};
use crate::telemetry::{LogManager, MetricsSnapshot};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Run now.
    Run,
    /// A trailing run is scheduled for the given instant.
    Deferred(Instant),
}

#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_run: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            pending: false,
        }
    }

    pub fn request(&mut self, now: Instant) -> ThrottleDecision {
        match self.last_run {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.pending = true;
                ThrottleDecision::Deferred(last + self.interval)
            }
            _ => {
                self.last_run = Some(now);
                self.pending = false;
                ThrottleDecision::Run
            }
        }
    }

    /// When the pending trailing run is due, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        if !self.pending {
            return None;
        }
        self.last_run.map(|last| last + self.interval)
    }

    /// Returns true, and consumes the pending run, once its deadline passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.last_run = Some(now);
                self.pending = false;
                true
            }
            _ => false,
        }
    }
}

enum Command {
    SetFilter {
        dimension: FilterDimension,
        range: Range,
        reply: oneshot::Sender<CoreResult<()>>,
    },
    Nearest {
        position: GeoPoint,
        reply: oneshot::Sender<CoreResult<Option<PointFeature>>>,
    },
    Metrics {
        reply: oneshot::Sender<MetricsSnapshot>,
    },
}

enum Wake {
    Command(Option<Command>),
    Deadline,
}

/// Cloneable front door to a running [`Dispatcher`].
#[derive(Clone)]
pub struct DispatcherHandle {
    commands: mpsc::Sender<Command>,
}

impl DispatcherHandle {
    /// Applies a filter change. The state update is immediate; the recompute
    /// it triggers may be folded into a later one.
    pub async fn set_filter(&self, dimension: FilterDimension, range: Range) -> CoreResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::SetFilter {
            dimension,
            range,
            reply,
        })
        .await?;
        response.await.map_err(|_| CoreError::DispatcherClosed)?
    }

    /// Nearest visible event to a geographic position, as of the last publish.
    pub async fn nearest(&self, position: GeoPoint) -> CoreResult<Option<PointFeature>> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Nearest { position, reply }).await?;
        response.await.map_err(|_| CoreError::DispatcherClosed)?
    }

    pub async fn metrics(&self) -> CoreResult<MetricsSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Metrics { reply }).await?;
        response.await.map_err(|_| CoreError::DispatcherClosed)
    }

    async fn send(&self, command: Command) -> CoreResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::DispatcherClosed)
    }
}

pub struct Dispatcher {
    engine: FilterEngine,
    throttle: Throttle,
    commands: mpsc::Receiver<Command>,
    published: watch::Sender<Arc<VisibleSet>>,
    logger: LogManager,
}

impl Dispatcher {
    /// Runs the initial recompute and wires up the channels. Spawn
    /// [`run`](Self::run) on any tokio runtime to start serving.
    pub fn new(
        mut engine: FilterEngine,
        interval: Duration,
    ) -> (Self, DispatcherHandle, watch::Receiver<Arc<VisibleSet>>) {
        let mut throttle = Throttle::new(interval);
        throttle.request(Instant::now());
        let initial = engine.recompute();

        let (commands_tx, commands) = mpsc::channel(64);
        let (published, visible) = watch::channel(Arc::new(initial));

        let dispatcher = Self {
            engine,
            throttle,
            commands,
            published,
            logger: LogManager::new("dispatcher"),
        };
        (
            dispatcher,
            DispatcherHandle {
                commands: commands_tx,
            },
            visible,
        )
    }

    /// Serves until every handle is dropped. A pending trailing recompute is
    /// flushed before returning.
    pub async fn run(mut self) {
        loop {
            let deadline = self.throttle.deadline();
            let wake = tokio::select! {
                command = self.commands.recv() => Wake::Command(command),
                _ = wait_until(deadline) => Wake::Deadline,
            };

            match wake {
                Wake::Command(Some(command)) => self.handle(command),
                Wake::Command(None) => break,
                Wake::Deadline => {
                    if self.throttle.poll(Instant::now()) {
                        self.publish();
                    }
                }
            }
        }

        if self.throttle.deadline().is_some() {
            self.publish();
        }
        self.logger.detail("dispatcher stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SetFilter {
                dimension,
                range,
                reply,
            } => {
                let result = self.engine.set_filter(dimension, range);
                if result.is_ok() {
                    match self.throttle.request(Instant::now()) {
                        ThrottleDecision::Run => self.publish(),
                        ThrottleDecision::Deferred(_) => self.engine.record_deferred(),
                    }
                }
                let _ = reply.send(result);
            }
            Command::Nearest { position, reply } => {
                let result = self
                    .engine
                    .nearest_to(position)
                    .map(|hit| hit.cloned());
                let _ = reply.send(result);
            }
            Command::Metrics { reply } => {
                let _ = reply.send(self.engine.metrics());
            }
        }
    }

    fn publish(&mut self) {
        let visible = self.engine.recompute();
        self.published.send_replace(Arc::new(visible));
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{AtmosphericData, Event, Observation};
    use crate::features;

    const INTERVAL: Duration = Duration::from_millis(40);

    #[test]
    fn first_request_runs_immediately() {
        let mut throttle = Throttle::new(INTERVAL);
        assert_eq!(throttle.request(Instant::now()), ThrottleDecision::Run);
        assert!(throttle.deadline().is_none());
    }

    #[test]
    fn burst_collapses_into_one_trailing_run() {
        let start = Instant::now();
        let mut throttle = Throttle::new(INTERVAL);
        assert_eq!(throttle.request(start), ThrottleDecision::Run);

        let due = start + INTERVAL;
        for offset in [5, 10, 20, 39] {
            let decision = throttle.request(start + Duration::from_millis(offset));
            assert_eq!(decision, ThrottleDecision::Deferred(due));
        }

        assert!(!throttle.poll(start + Duration::from_millis(39)));
        assert!(throttle.poll(due));
        assert!(!throttle.poll(due + INTERVAL));
        assert!(throttle.deadline().is_none());
    }

    #[test]
    fn request_after_quiet_period_runs_again() {
        let start = Instant::now();
        let mut throttle = Throttle::new(INTERVAL);
        throttle.request(start);
        assert_eq!(
            throttle.request(start + INTERVAL + Duration::from_millis(1)),
            ThrottleDecision::Run
        );
    }

    fn engine() -> FilterEngine {
        let events: Vec<Event> = (0..6)
            .map(|i| Event {
                id: format!("e{i}"),
                observations: vec![Observation {
                    station_code: "OSL".into(),
                    station_latitude: Some(59.9),
                    station_longitude: Some(10.7),
                    observation_start_time: Some(1000.0 * (i + 1) as f64),
                }],
                atmospheric_data: Some(AtmosphericData {
                    start_position_north: Some(60.0),
                    start_position_east: Some(10.0 + i as f64),
                    end_position_north: Some(60.2),
                    end_position_east: Some(10.3 + i as f64),
                    start_height: Some(95.0),
                    end_height: Some(70.0),
                    ..Default::default()
                }),
                orbital_data: None,
            })
            .collect();
        FilterEngine::new(Arc::new(features::build(&events)))
    }

    #[tokio::test]
    async fn dispatcher_publishes_settled_state() {
        let (dispatcher, handle, mut visible) = Dispatcher::new(engine(), INTERVAL);
        assert_eq!(visible.borrow().point_count(), 6);
        let task = tokio::spawn(dispatcher.run());

        for upper in [5500.0, 4500.0, 3500.0, 2500.0] {
            handle
                .set_filter(FilterDimension::Time, Range::new(0.0, upper))
                .await
                .unwrap();
        }

        let settled = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let current = visible.borrow_and_update();
                    if current.filter_state().time.upper == 2500.0 {
                        break Arc::clone(&*current);
                    }
                }
                visible.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
        assert_eq!(settled.point_count(), 2);

        let hit = handle
            .nearest(GeoPoint::new(20.0, 60.2))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.attributes.event_id, "e1");

        let metrics = handle.metrics().await.unwrap();
        assert!(metrics.recomputes >= 2);
        assert!(metrics.recomputes <= 5);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn dispatcher_rejects_invalid_bounds() {
        let (dispatcher, handle, visible) = Dispatcher::new(engine(), INTERVAL);
        let task = tokio::spawn(dispatcher.run());

        let err = handle
            .set_filter(FilterDimension::StartHeight, Range::new(120.0, 80.0))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBounds { .. }));
        assert_eq!(handle.metrics().await.unwrap().rejected, 1);
        assert_eq!(visible.borrow().point_count(), 6);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn closed_dispatcher_is_reported() {
        let (dispatcher, handle, _visible) = Dispatcher::new(engine(), INTERVAL);
        drop(dispatcher);
        let err = handle.metrics().await.unwrap_err();
        assert!(matches!(err, CoreError::DispatcherClosed));
    }
}
