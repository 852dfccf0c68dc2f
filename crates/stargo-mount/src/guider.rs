//! Guide pulses
//!
//! The controller runs a pulse on its own once started and reports nothing
//! back, so completion is timed locally. Each axis has one pending completion
//! timer; a new pulse on the same axis cancels it and starts over.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use stargo_protocol::command::MAX_PULSE_MS;
use stargo_protocol::{Axis, GuideDirection};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::adjust::AutoAdjustController;
use crate::error::MountError;
use crate::events::MountEvent;
use crate::mount::Mount;

/// Sends guide pulses and feeds RA corrections to auto-adjust
pub struct Guider<T> {
    mount: Mount<T>,
    adjust: Option<AutoAdjustController<Mount<T>>>,
    timers: Arc<Mutex<[Option<JoinHandle<()>>; 2]>>,
}

impl<T> Guider<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(mount: Mount<T>) -> Self {
        Self {
            mount,
            adjust: None,
            timers: Arc::new(Mutex::new([None, None])),
        }
    }

    /// Forward east/west pulses to `adjust` while it is enabled
    pub fn with_auto_adjust(mut self, adjust: AutoAdjustController<Mount<T>>) -> Self {
        self.adjust = Some(adjust);
        self
    }

    /// Start a guide pulse and schedule its completion
    pub async fn guide(
        &self,
        direction: GuideDirection,
        duration_ms: u32,
    ) -> Result<(), MountError> {
        let duration_ms = duration_ms.min(MAX_PULSE_MS);
        self.mount.guide_pulse(direction, duration_ms).await?;
        debug!("Guiding {:?} for {}ms", direction, duration_ms);
        self.schedule_completion(direction.axis(), duration_ms);

        if let Some(adjust) = &self.adjust {
            if direction.ra_sign().is_some() && adjust.is_enabled() {
                if let Err(e) = adjust.add_sample(direction, duration_ms).await {
                    warn!("RA auto-adjust sample dropped: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Whether a pulse on `axis` is still running
    pub fn is_guiding(&self, axis: Axis) -> bool {
        self.timers.lock()[usize::from(axis.index())]
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    fn schedule_completion(&self, axis: Axis, duration_ms: u32) {
        let event_tx = self.mount.event_sender();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(u64::from(duration_ms))).await;
            debug!("Guide pulse on {:?} complete", axis);
            let _ = event_tx.send(MountEvent::GuideComplete { axis });
        });

        let mut timers = self.timers.lock();
        if let Some(previous) = timers[usize::from(axis.index())].replace(timer) {
            if !previous.is_finished() {
                debug!("Replacing pending {:?} guide pulse", axis);
            }
            previous.abort();
        }
    }
}

impl<T> Drop for Guider<T> {
    fn drop(&mut self) {
        for timer in self.timers.lock().iter_mut() {
            if let Some(t) = timer.take() {
                t.abort();
            }
        }
    }
}
