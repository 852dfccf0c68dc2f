//! RA auto-adjust
//!
//! Guiding corrections on the RA axis are evidence of drift in the tracking
//! rate. The controller collects them in a [`SampleWindow`], and on every tick
//! feeds their sum through a low-pass [`DigitalFilter`]. The filter output, in
//! milliseconds of RA motion per interval, becomes a change to the mount's
//! tracking adjustment.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use stargo_filter::{DigitalFilter, FilterSpec};
use stargo_protocol::{GuideDirection, GuidingSpeeds};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::AutoAdjustConfig;
use crate::error::MountError;
use crate::events::{FilterSummary, MountEvent};
use crate::mount::Mount;

/// The slice of mount control the controller needs
pub trait MountQuery: Send + Sync + 'static {
    fn guiding_speeds(&self) -> impl Future<Output = Result<GuidingSpeeds, MountError>> + Send;

    /// RA tracking adjustment in percent
    fn tracking_adjustment(&self) -> impl Future<Output = Result<f64, MountError>> + Send;

    fn set_tracking_adjustment(
        &self,
        percent: f64,
    ) -> impl Future<Output = Result<(), MountError>> + Send;
}

impl<T> MountQuery for Mount<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn guiding_speeds(&self) -> Result<GuidingSpeeds, MountError> {
        self.get_guiding_speeds().await
    }

    async fn tracking_adjustment(&self) -> Result<f64, MountError> {
        self.get_tracking_adjustment().await
    }

    async fn set_tracking_adjustment(&self, percent: f64) -> Result<(), MountError> {
        Mount::set_tracking_adjustment(self, percent).await
    }
}

/// Signed RA corrections waiting for the next tick
///
/// Values are milliseconds of sidereal-equivalent RA motion. Appends and the
/// drain take the same lock, so a drain sees every sample appended before it
/// and none appended after.
#[derive(Debug, Default)]
pub struct SampleWindow {
    samples: Mutex<Vec<f64>>,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, sample: f64) {
        self.samples.lock().push(sample);
    }

    /// Remove every sample and return their sum
    pub fn drain_sum(&self) -> f64 {
        let samples = std::mem::take(&mut *self.samples.lock());
        samples.iter().sum()
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

/// Snapshot of the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentState {
    pub enabled: bool,
    /// Sum of the filter outputs since the last enable, in milliseconds
    pub cumulative_correction: f64,
}

struct Inner<M> {
    mount: M,
    config: AutoAdjustConfig,
    window: SampleWindow,
    filter: Mutex<DigitalFilter>,
    enabled: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    event_tx: broadcast::Sender<MountEvent>,
}

/// Periodic closed loop on the RA tracking adjustment
pub struct AutoAdjustController<M> {
    inner: Arc<Inner<M>>,
}

impl<M> Clone for AutoAdjustController<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: MountQuery> AutoAdjustController<M> {
    /// Create a disabled controller
    pub fn new(
        mount: M,
        filter: FilterSpec,
        config: AutoAdjustConfig,
        event_tx: broadcast::Sender<MountEvent>,
    ) -> Result<Self, MountError> {
        if let Err(e) = config.validate() {
            warn!("Rejected auto-adjust config {:?}: {}", config, e);
            return Err(e);
        }
        let filter = DigitalFilter::new(filter)?;
        Ok(Self {
            inner: Arc::new(Inner {
                mount,
                config,
                window: SampleWindow::new(),
                filter: Mutex::new(filter),
                enabled: AtomicBool::new(false),
                task: Mutex::new(None),
                event_tx,
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> AdjustmentState {
        AdjustmentState {
            enabled: self.is_enabled(),
            cumulative_correction: self.inner.filter.lock().cumulative_correction(),
        }
    }

    pub fn filter_summary(&self) -> FilterSummary {
        FilterSummary::from(&*self.inner.filter.lock())
    }

    pub fn pending_samples(&self) -> usize {
        self.inner.window.len()
    }

    /// Zero the mount's trim, clear all history and start the periodic tick
    ///
    /// Enabling an enabled controller starts over.
    pub async fn enable(&self) {
        if let Err(e) = self.inner.mount.set_tracking_adjustment(0.0).await {
            warn!("Unable to clear RA tracking adjustment: {}", e);
        }
        self.inner.filter.lock().reset();
        self.inner.window.clear();
        self.inner.enabled.store(true, Ordering::SeqCst);

        let handle = spawn_ticker(Arc::downgrade(&self.inner), self.inner.config.interval());
        if let Some(previous) = self.inner.task.lock().replace(handle) {
            previous.abort();
        }

        info!(
            "RA auto-adjust enabled ({}s interval)",
            self.inner.config.interval_secs
        );
        let _ = self.inner.event_tx.send(MountEvent::AutoAdjust { enabled: true });
    }

    /// Stop the periodic tick and drop pending samples; the trim is left as is
    pub fn disable(&self) {
        let was_enabled = self.inner.enabled.swap(false, Ordering::SeqCst);
        if let Some(task) = self.inner.task.lock().take() {
            task.abort();
        }
        self.inner.window.clear();

        if was_enabled {
            info!("RA auto-adjust disabled");
            let _ = self.inner.event_tx.send(MountEvent::AutoAdjust { enabled: false });
        }
    }

    /// Record a guide pulse on the RA axis
    pub async fn add_sample(
        &self,
        direction: GuideDirection,
        duration_ms: u32,
    ) -> Result<(), MountError> {
        if !self.is_enabled() {
            return Err(MountError::AutoAdjustDisabled);
        }
        let sign = direction
            .ra_sign()
            .ok_or(MountError::InvalidDirection(direction))?;

        let speeds = match self.inner.mount.guiding_speeds().await {
            Ok(speeds) => speeds,
            Err(e) => {
                warn!("Dropping {:?} {}ms sample: {}", direction, duration_ms, e);
                return Err(e);
            }
        };

        let sample = sign * f64::from(duration_ms) * speeds.ra_fraction();
        self.inner.window.push(sample);
        debug!(
            "RA sample {:?} {}ms at {}% -> {:+.1}ms",
            direction, duration_ms, speeds.ra_percent, sample
        );
        Ok(())
    }

    /// Run one adjustment step
    ///
    /// Returns the new trim when one was written.
    pub async fn tick(&self) -> Result<Option<f64>, MountError> {
        let inner = &self.inner;
        let sum = inner.window.drain_sum();

        let current = match inner.mount.tracking_adjustment().await {
            Ok(current) => current,
            Err(e) => {
                // keep the samples for the next tick
                if sum != 0.0 {
                    inner.window.push(sum);
                }
                warn!("Skipping RA auto-adjust tick: {}", e);
                return Err(e);
            }
        };

        let delta = inner.filter.lock().add_sample(sum);
        let change = delta / inner.config.interval_ms() * 100.0;
        let max = inner.config.max_trim_percent;
        let target = (current + change).clamp(-max, max);

        if (target - current).abs() < inner.config.threshold_percent {
            debug!(
                "RA drift {:+.1}ms filtered to {:+.3}ms; {:+.4}% below threshold",
                sum, delta, change
            );
            return Ok(None);
        }

        inner.mount.set_tracking_adjustment(target).await?;
        info!(
            "RA auto-adjust {:+.3}% -> {:+.3}% (drift {:+.1}ms)",
            current, target, sum
        );
        let _ = inner.event_tx.send(MountEvent::TrackingAdjusted {
            from: current,
            to: target,
        });
        Ok(Some(target))
    }

    /// Replace the drift filter; a rejected spec leaves the current one in place
    pub fn rebuild_filter(&self, spec: FilterSpec) -> Result<FilterSummary, MountError> {
        let mut filter = self.inner.filter.lock();
        if let Err(e) = filter.rebuild(spec) {
            warn!("Rejected filter {:?}: {}", spec, e);
            return Err(e.into());
        }
        let summary = FilterSummary::from(&*filter);
        drop(filter);

        info!(
            "RA drift filter now {} order {}, corner {:.1} samples",
            summary.name, summary.order, summary.corner_period
        );
        let _ = self
            .inner
            .event_tx
            .send(MountEvent::FilterRebuilt(summary.clone()));
        Ok(summary)
    }
}

fn spawn_ticker<M: MountQuery>(weak: Weak<Inner<M>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };
            let controller = AutoAdjustController { inner };
            if !controller.is_enabled() {
                break;
            }
            // errors are logged in tick; the loop carries on
            let _ = controller.tick().await;
        }
    })
}
