//! Integration tests for the StarGo mount link
//!
//! These tests drive the engine, the typed commands, the auto-adjust
//! controller and the guider against the virtual mount, covering:
//! - Status frames interleaved with replies
//! - Minimum spacing between commands as seen by the controller
//! - Typed command round trips
//! - Trim written by the auto-adjust loop, manually and on its own tick
//! - Guide pulses feeding the auto-adjust window

use std::time::Duration;

use stargo_filter::{FilterDesign, FilterSpec, Transform};
use stargo_mount::{
    AutoAdjustConfig, AutoAdjustController, EngineConfig, Guider, Mount, MountError, MountEvent,
};
use stargo_protocol::{Axis, GuideDirection, MotorsState, SlewRate, TrackMode};
use stargo_sim::{spawn_virtual_mount, VirtualMount, VirtualMountCommand, VirtualMountHandle};
use tokio::io::DuplexStream;
use tokio::sync::broadcast;

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Connect a mount handle to a freshly spawned virtual mount
    pub fn connect(sim: VirtualMount) -> (Mount<DuplexStream>, VirtualMountHandle) {
        let (link, handle) = spawn_virtual_mount(sim);
        (Mount::new(link, EngineConfig::default()), handle)
    }

    /// First-order filter with a short corner, so a few pulses move the trim
    pub fn responsive_filter() -> FilterSpec {
        FilterSpec {
            design: FilterDesign::Butterworth,
            order: 1,
            corner_multiplier: 2.5,
            transform: Transform::Bilinear,
            ..FilterSpec::default()
        }
    }

    pub fn controller(
        mount: &Mount<DuplexStream>,
        spec: FilterSpec,
    ) -> AutoAdjustController<Mount<DuplexStream>> {
        AutoAdjustController::new(
            mount.clone(),
            spec,
            AutoAdjustConfig::default(),
            mount.event_sender(),
        )
        .unwrap()
    }

    /// Commands the virtual mount has seen so far
    pub fn drain_commands(handle: &mut VirtualMountHandle) -> Vec<stargo_sim::VirtualMountEvent> {
        let mut out = Vec::new();
        while let Ok(event) = handle.events.try_recv() {
            out.push(event);
        }
        out
    }

    pub fn drain_events(rx: &mut broadcast::Receiver<MountEvent>) -> Vec<MountEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    /// Trim currently held by the virtual mount, in percent
    pub async fn sim_trim(mount: &Mount<DuplexStream>) -> f64 {
        mount.get_tracking_adjustment().await.unwrap()
    }
}

use helpers::*;

// ============================================================================
// Protocol Engine
// ============================================================================

#[tokio::test]
async fn test_status_frames_around_reply_are_routed() {
    let mut sim = VirtualMount::new("sim");
    sim.set_tracking_adjustment_hundredths(-40);
    sim.set_status(3, 1, 2);
    sim.set_status_chatter(true);
    let (mount, _handle) = connect(sim);
    let mut events = mount.subscribe();

    let reply = mount
        .query(":X42#", b'#', Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(reply, "or-040");

    let statuses: Vec<_> = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, MountEvent::Status(_)))
        .collect();
    assert_eq!(statuses.len(), 2);

    let state = mount.state();
    assert_eq!(state.motors(), MotorsState::On);
    assert_eq!(state.tracking(), TrackMode::Lunar);
    assert_eq!(state.slew_rate(), SlewRate::Find);
}

#[tokio::test]
async fn test_unsolicited_status_is_picked_up_by_next_query() {
    let (mount, handle) = connect(VirtualMount::new("sim"));

    handle
        .commands
        .send(VirtualMountCommand::SetStatus {
            motors: 2,
            tracking: 0,
            slew: 0,
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // drained before the command goes out, not mistaken for the reply
    let speeds = mount.get_guiding_speeds().await.unwrap();
    assert_eq!(speeds.ra_percent, 30);
    assert_eq!(mount.state().motors(), MotorsState::RaOnly);
    // tracking digit 0 leaves the mode alone
    assert_eq!(mount.state().tracking(), TrackMode::Sidereal);
    assert_eq!(mount.state().slew_rate(), SlewRate::Guide);
}

#[tokio::test]
async fn test_legacy_status_frames() {
    let mut sim = VirtualMount::new("sim");
    sim.set_legacy_status(true);
    sim.set_status(1, 2, 1);
    sim.set_status_chatter(true);
    let (mount, _handle) = connect(sim);

    mount.get_tracking_adjustment().await.unwrap();
    assert_eq!(mount.state().motors(), MotorsState::DecOnly);
    assert_eq!(mount.state().tracking(), TrackMode::Solar);
    assert_eq!(mount.state().slew_rate(), SlewRate::Centering);
}

#[tokio::test(start_paused = true)]
async fn test_commands_reach_the_mount_spaced() {
    let (mount, mut handle) = connect(VirtualMount::new("sim"));

    mount.guide_pulse(GuideDirection::North, 100).await.unwrap();
    mount.guide_pulse(GuideDirection::East, 100).await.unwrap();
    mount.get_guiding_speeds().await.unwrap();
    mount.set_tracking_adjustment(0.5).await.unwrap();
    mount.get_tracking_adjustment().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let received = drain_commands(&mut handle);
    assert_eq!(received.len(), 5);
    for pair in received.windows(2) {
        let gap = pair[1].received_at - pair[0].received_at;
        assert!(
            gap >= Duration::from_millis(50),
            "{} followed {} after {:?}",
            pair[1].command,
            pair[0].command,
            gap
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_query_fails() {
    let (mount, _handle) = connect(VirtualMount::new("sim"));

    let result = mount.query(":X99#", b'#', Duration::from_millis(300)).await;
    assert!(matches!(result, Err(MountError::NoReply { .. })));
}

// ============================================================================
// Typed Commands
// ============================================================================

#[tokio::test]
async fn test_typed_commands_round_trip() {
    let mut sim = VirtualMount::new("sim");
    sim.set_gear_ratio(Axis::Ra, 0x0002_5800);
    sim.set_motor_steps(Axis::Dec, -1234);
    let (mount, _handle) = connect(sim);

    mount.set_tracking_adjustment(-1.234).await.unwrap();
    assert_eq!(sim_trim(&mount).await, -1.23);

    mount.set_guiding_speeds(45, 70).await.unwrap();
    let speeds = mount.get_guiding_speeds().await.unwrap();
    assert_eq!((speeds.ra_percent, speeds.dec_percent), (45, 70));

    assert_eq!(mount.gear_ratio(Axis::Ra).await.unwrap(), 0x0002_5800);
    assert_eq!(mount.motor_steps(Axis::Dec).await.unwrap(), -1234);
    assert_eq!(mount.motor_steps(Axis::Ra).await.unwrap(), 0);
}

#[tokio::test]
async fn test_trim_beyond_range_is_clamped() {
    let (mount, _handle) = connect(VirtualMount::new("sim"));

    mount.set_tracking_adjustment(7.5).await.unwrap();
    assert_eq!(sim_trim(&mount).await, 5.0);
}

// ============================================================================
// Auto-Adjust Controller
// ============================================================================

#[tokio::test]
async fn test_enable_clears_mount_trim() {
    let mut sim = VirtualMount::new("sim");
    sim.set_tracking_adjustment_hundredths(120);
    let (mount, _handle) = connect(sim);
    let adjust = controller(&mount, FilterSpec::default());

    adjust.enable().await;
    assert_eq!(sim_trim(&mount).await, 0.0);
    adjust.disable();
}

#[tokio::test]
async fn test_tick_writes_trim_to_mount() {
    let mut sim = VirtualMount::new("sim");
    sim.set_guide_speed(Axis::Ra, 50);
    let (mount, _handle) = connect(sim);
    let mut events = mount.subscribe();
    let adjust = controller(&mount, responsive_filter());

    adjust.enable().await;
    for _ in 0..3 {
        adjust.add_sample(GuideDirection::East, 500).await.unwrap();
    }
    let written = adjust.tick().await.unwrap().unwrap();
    assert!(written < 0.0);

    let on_mount = sim_trim(&mount).await;
    assert_eq!(on_mount, (written * 100.0).round() / 100.0);

    let adjusted = drain_events(&mut events)
        .into_iter()
        .any(|e| {
            matches!(e, MountEvent::TrackingAdjusted { from, to } if from == 0.0 && to == written)
        });
    assert!(adjusted);
    adjust.disable();
}

#[tokio::test]
async fn test_disable_leaves_trim_on_mount() {
    let mut sim = VirtualMount::new("sim");
    sim.set_guide_speed(Axis::Ra, 50);
    let (mount, _handle) = connect(sim);
    let adjust = controller(&mount, responsive_filter());

    adjust.enable().await;
    adjust.add_sample(GuideDirection::West, 2000).await.unwrap();
    adjust.tick().await.unwrap();
    let before = sim_trim(&mount).await;
    assert!(before > 0.0);

    adjust.disable();
    assert!(!adjust.is_enabled());
    assert_eq!(sim_trim(&mount).await, before);
}

#[tokio::test(start_paused = true)]
async fn test_periodic_tick_runs_without_caller() {
    let mut sim = VirtualMount::new("sim");
    sim.set_guide_speed(Axis::Ra, 50);
    let (mount, _handle) = connect(sim);
    let adjust = controller(&mount, responsive_filter());

    adjust.enable().await;
    adjust.add_sample(GuideDirection::East, 2000).await.unwrap();

    tokio::time::sleep(Duration::from_secs(19)).await;
    assert_eq!(adjust.pending_samples(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(adjust.pending_samples(), 0);
    assert!(sim_trim(&mount).await < 0.0);
    adjust.disable();
}

// ============================================================================
// Guider
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_guider_feeds_auto_adjust() {
    let (mount, mut handle) = connect(VirtualMount::new("sim"));
    let mut events = mount.subscribe();
    let adjust = controller(&mount, responsive_filter());
    adjust.enable().await;
    let guider = Guider::new(mount.clone()).with_auto_adjust(adjust.clone());

    guider.guide(GuideDirection::East, 300).await.unwrap();
    guider.guide(GuideDirection::South, 200).await.unwrap();
    guider.guide(GuideDirection::West, 12_000).await.unwrap();
    assert_eq!(adjust.pending_samples(), 2);

    let pulses: Vec<String> = drain_commands(&mut handle)
        .into_iter()
        .map(|e| e.command)
        .filter(|c| c.starts_with(":Mg"))
        .collect();
    assert_eq!(pulses, vec![":Mge0300#", ":Mgs0200#", ":Mgw9999#"]);

    tokio::time::sleep(Duration::from_secs(11)).await;
    let completed: Vec<Axis> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            MountEvent::GuideComplete { axis } => Some(axis),
            _ => None,
        })
        .collect();
    // the east pulse timer was replaced by the west one
    assert_eq!(completed, vec![Axis::Dec, Axis::Ra]);
    adjust.disable();
}

#[tokio::test(start_paused = true)]
async fn test_guider_without_auto_adjust() {
    let (mount, _handle) = connect(VirtualMount::new("sim"));
    let guider = Guider::new(mount.clone());

    guider.guide(GuideDirection::West, 100).await.unwrap();
    assert!(guider.is_guiding(Axis::Ra));
    assert!(!guider.is_guiding(Axis::Dec));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!guider.is_guiding(Axis::Ra));
}

