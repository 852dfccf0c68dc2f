//! stargod - StarGo mount daemon
//!
//! Connects to a StarGo controller (or the built-in virtual mount), applies
//! the configured guiding speeds, trim and drift filter, and keeps the RA
//! auto-adjust loop running until Ctrl-C. Guide pulses and other operator
//! commands are read from stdin.
//!
//! Usage: `stargod [settings.json]`

mod console;
mod settings;

use std::path::PathBuf;

use anyhow::Context;
use stargo_mount::{AutoAdjustController, Guider, Mount, MountEvent};
use stargo_sim::{spawn_virtual_mount, VirtualMount, VirtualMountCommand};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::console::Console;
use crate::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stargod=info,stargo_protocol=info,stargo_filter=info,stargo_mount=info,stargo_sim=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stargod");

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(path.as_deref());
    debug!("Settings: {:?}", settings);

    if settings.is_virtual() {
        info!("Using virtual mount");
        let (link, handle) = spawn_virtual_mount(VirtualMount::new("virtual"));
        let mount = Mount::new(link, settings.engine.clone());
        let result = run(mount, &settings).await;
        let _ = handle.commands.send(VirtualMountCommand::Shutdown).await;
        result
    } else {
        let mount =
            Mount::connect_serial(&settings.port, settings.baud_rate, settings.engine.clone())
                .with_context(|| format!("opening {}", settings.port))?;
        run(mount, &settings).await
    }
}

async fn run<T>(mount: Mount<T>, settings: &Settings) -> anyhow::Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let logger = tokio::spawn(log_events(mount.subscribe()));

    if let Some(speeds) = settings.guiding_speeds {
        mount
            .set_guiding_speeds(speeds.ra_percent, speeds.dec_percent)
            .await
            .context("setting guiding speeds")?;
    }

    let adjust = AutoAdjustController::new(
        mount.clone(),
        settings.filter,
        settings.auto_adjust.clone(),
        mount.event_sender(),
    )
    .context("setting up RA auto-adjust")?;
    let summary = adjust.filter_summary();
    info!(
        "RA drift filter {} order {}, corner {:.1} samples",
        summary.name, summary.order, summary.corner_period
    );

    if settings.auto_adjust_enabled {
        if settings.tracking_adjustment.is_some() {
            warn!("Manual tracking adjustment ignored while auto-adjust is enabled");
        }
        adjust.enable().await;
    } else if let Some(percent) = settings.tracking_adjustment {
        mount
            .set_tracking_adjustment(percent)
            .await
            .context("setting tracking adjustment")?;
    }

    let guider = Guider::new(mount.clone()).with_auto_adjust(adjust.clone());
    let console = Console {
        mount,
        adjust,
        guider,
    };

    let result = tokio::select! {
        signal = tokio::signal::ctrl_c() => signal.context("waiting for Ctrl-C"),
        result = async {
            console.run().await?;
            // stdin closed: keep running until Ctrl-C
            std::future::pending::<anyhow::Result<()>>().await
        } => result,
    };

    info!("Shutting down");
    console.adjust.disable();
    logger.abort();
    result
}

async fn log_events(mut events: broadcast::Receiver<MountEvent>) {
    loop {
        match events.recv().await {
            Ok(MountEvent::Status(state)) => debug!("Mount {}", state),
            Ok(MountEvent::GuideComplete { axis }) => debug!("{:?} guide pulse complete", axis),
            Ok(MountEvent::TrackingAdjusted { from, to }) => {
                info!("Tracking adjustment {:+.2}% -> {:+.2}%", from, to)
            }
            Ok(MountEvent::FilterRebuilt(summary)) => info!(
                "Drift filter now {} order {} (gain {:.4})",
                summary.name, summary.order, summary.gain
            ),
            Ok(MountEvent::AutoAdjust { enabled }) => {
                info!("Auto-adjust {}", if enabled { "on" } else { "off" })
            }
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("Event log skipped {} events", n),
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
