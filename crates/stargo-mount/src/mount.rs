//! Shared mount handle
//!
//! [`Mount`] is the single entry point to the controller. Every caller, from
//! the auto-adjust loop to the guider, goes through [`Mount::query`], which
//! serializes access to the link so only one command is in flight at a time.

use std::sync::Arc;
use std::time::Duration;

use stargo_protocol::reply::{parse_gear_ratio, parse_motor_steps, parse_tracking_adjustment};
use stargo_protocol::{Axis, GuideDirection, GuidingSpeeds, MountState, StarGoCommand};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, watch, Mutex};
use tokio_serial::SerialStream;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::engine::ProtocolEngine;
use crate::error::MountError;
use crate::events::{MountEvent, EVENT_CAPACITY};
use crate::transport::TransportChannel;

/// Pause between the two guiding speed commands
const GUIDE_SPEED_SETTLE: Duration = Duration::from_millis(100);

/// Cloneable handle to a connected mount
pub struct Mount<T> {
    engine: Arc<Mutex<ProtocolEngine<T>>>,
    state_rx: watch::Receiver<MountState>,
    event_tx: broadcast::Sender<MountEvent>,
    reply_timeout: Duration,
}

impl<T> Clone for Mount<T> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            state_rx: self.state_rx.clone(),
            event_tx: self.event_tx.clone(),
            reply_timeout: self.reply_timeout,
        }
    }
}

impl Mount<SerialStream> {
    /// Connect to a mount on a serial port
    pub fn connect_serial(
        port_name: &str,
        baud_rate: u32,
        config: EngineConfig,
    ) -> Result<Self, MountError> {
        let transport = TransportChannel::open(port_name, baud_rate, config.max_frame_len)?;
        info!("Opened {} at {} baud", port_name, baud_rate);
        Ok(Self::with_transport(transport, config))
    }
}

impl<T> Mount<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already open I/O stream
    pub fn new(io: T, config: EngineConfig) -> Self {
        let transport = TransportChannel::new(io, config.max_frame_len);
        Self::with_transport(transport, config)
    }

    fn with_transport(transport: TransportChannel<T>, config: EngineConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(MountState::default());
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let reply_timeout = config.reply_timeout();
        let engine = ProtocolEngine::new(transport, config, state_tx, event_tx.clone());
        Self {
            engine: Arc::new(Mutex::new(engine)),
            state_rx,
            event_tx,
            reply_timeout,
        }
    }

    /// Send a raw command and return its reply
    ///
    /// See [`ProtocolEngine::query`] for the reply contract.
    pub async fn query(
        &self,
        command: &str,
        terminator: u8,
        wait: Duration,
    ) -> Result<String, MountError> {
        let mut engine = self.engine.lock().await;
        engine.query(command, terminator, wait).await
    }

    /// Send a typed command, waiting for a reply only if it has one
    pub async fn execute(&self, command: &StarGoCommand) -> Result<String, MountError> {
        let text = command.encode()?;
        let wait = if command.expects_reply() {
            self.reply_timeout
        } else {
            Duration::ZERO
        };
        self.query(&text, command.reply_terminator(), wait).await
    }

    /// Current RA tracking adjustment in percent
    pub async fn get_tracking_adjustment(&self) -> Result<f64, MountError> {
        let reply = self.execute(&StarGoCommand::GetTrackingAdjustment).await?;
        parse_tracking_adjustment(&reply).map_err(|e| {
            warn!("Unable to parse tracking adjustment: {}", e);
            e.into()
        })
    }

    /// Set the RA tracking adjustment in percent, clamped to the controller's range
    pub async fn set_tracking_adjustment(&self, percent: f64) -> Result<(), MountError> {
        self.execute(&StarGoCommand::SetTrackingAdjustment { percent })
            .await?;
        if percent == 0.0 {
            info!("RA tracking adjustment cleared");
        } else {
            info!("RA tracking adjustment set to {:+.2}%", percent);
        }
        Ok(())
    }

    pub async fn get_guiding_speeds(&self) -> Result<GuidingSpeeds, MountError> {
        let reply = self.execute(&StarGoCommand::GetGuidingSpeeds).await?;
        GuidingSpeeds::parse(&reply).map_err(|e| {
            warn!("Unexpected guiding speed reply: {}", e);
            e.into()
        })
    }

    /// Set both guiding speeds in percent of sidereal rate
    pub async fn set_guiding_speeds(
        &self,
        ra_percent: u8,
        dec_percent: u8,
    ) -> Result<(), MountError> {
        self.execute(&StarGoCommand::SetGuidingSpeed {
            axis: Axis::Ra,
            percent: ra_percent,
        })
        .await?;
        tokio::time::sleep(GUIDE_SPEED_SETTLE).await;
        self.execute(&StarGoCommand::SetGuidingSpeed {
            axis: Axis::Dec,
            percent: dec_percent,
        })
        .await?;
        info!("Guiding speeds set to RA {}% DEC {}%", ra_percent, dec_percent);
        Ok(())
    }

    /// Start a guide pulse; the controller does not acknowledge it
    pub async fn guide_pulse(
        &self,
        direction: GuideDirection,
        duration_ms: u32,
    ) -> Result<(), MountError> {
        self.execute(&StarGoCommand::GuidePulse {
            direction,
            duration_ms,
        })
        .await?;
        Ok(())
    }

    pub async fn gear_ratio(&self, axis: Axis) -> Result<i32, MountError> {
        let reply = self.execute(&StarGoCommand::GetGearRatio(axis)).await?;
        Ok(parse_gear_ratio(&reply)?)
    }

    /// Motor step position of an axis
    pub async fn motor_steps(&self, axis: Axis) -> Result<i32, MountError> {
        let reply = self.execute(&StarGoCommand::GetMotorSteps(axis)).await?;
        Ok(parse_motor_steps(&reply)?)
    }
}

impl<T> Mount<T> {
    /// Last state reported by a status frame
    pub fn state(&self) -> MountState {
        *self.state_rx.borrow()
    }

    /// Watch channel that follows the mount state
    pub fn watch_state(&self) -> watch::Receiver<MountState> {
        self.state_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MountEvent> {
        self.event_tx.subscribe()
    }

    /// Sender for publishing controller events alongside status events
    pub fn event_sender(&self) -> broadcast::Sender<MountEvent> {
        self.event_tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    /// Answer each command from a fixed table, in order; the stream is
    /// handed back so the link stays open until the test ends
    fn scripted_peer(
        mut peer: DuplexStream,
        script: Vec<(&'static str, &'static str)>,
    ) -> tokio::task::JoinHandle<DuplexStream> {
        tokio::spawn(async move {
            for (expected, reply) in script {
                let mut cmd = Vec::new();
                let mut byte = [0u8; 1];
                while byte[0] != b'#' {
                    peer.read_exact(&mut byte).await.unwrap();
                    cmd.push(byte[0]);
                }
                assert_eq!(String::from_utf8(cmd).unwrap(), expected);
                if !reply.is_empty() {
                    peer.write_all(reply.as_bytes()).await.unwrap();
                }
            }
            peer
        })
    }

    fn assert_send<F: Send>(_: F) {}

    #[test]
    fn test_queries_are_send() {
        let (client, _peer) = duplex(64);
        let mount = Mount::new(client, EngineConfig::default());
        assert_send(mount.get_tracking_adjustment());
        assert_send(mount.get_guiding_speeds());
        assert_send(mount.set_tracking_adjustment(0.0));
        assert_send(crate::adjust::MountQuery::tracking_adjustment(&mount));
    }

    #[tokio::test]
    async fn test_typed_queries() {
        let (client, peer) = duplex(256);
        let mount = Mount::new(client, EngineConfig::default());
        let script = scripted_peer(
            peer,
            vec![
                (":X42#", "or-120#"),
                (":X22#", ":Z1303#40b60#"),
                (":X480#", "i:0000<3?0#"),
                (":TTGMs1#", "????????d#"),
            ],
        );

        assert_eq!(mount.get_tracking_adjustment().await.unwrap(), -1.2);
        let speeds = mount.get_guiding_speeds().await.unwrap();
        assert_eq!(speeds.ra_percent, 40);
        assert_eq!(speeds.dec_percent, 60);
        assert_eq!(mount.gear_ratio(Axis::Ra).await.unwrap(), 0xC3F0);
        assert_eq!(mount.motor_steps(Axis::Dec).await.unwrap(), -1);
        assert_eq!(mount.state().motors(), stargo_protocol::MotorsState::On);

        let _peer = script.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_guiding_speeds_sends_both_axes() {
        let (client, peer) = duplex(256);
        let mount = Mount::new(client, EngineConfig::default());
        let script = scripted_peer(peer, vec![(":X2030#", ""), (":X2150#", "")]);

        mount.set_guiding_speeds(30, 50).await.unwrap();
        let _peer = script.await.unwrap();
    }

    #[tokio::test]
    async fn test_unparsable_reply_is_reported() {
        let (client, peer) = duplex(256);
        let mount = Mount::new(client, EngineConfig::default());
        let script = scripted_peer(peer, vec![(":X42#", "garbage#")]);

        let result = mount.get_tracking_adjustment().await;
        assert!(matches!(result, Err(MountError::Parse(_))));
        let _peer = script.await.unwrap();
    }

    #[tokio::test]
    async fn test_set_tracking_adjustment_is_clamped_on_the_wire() {
        let (client, peer) = duplex(256);
        let mount = Mount::new(client, EngineConfig::default());
        let script = scripted_peer(peer, vec![(":X41-500#", "")]);

        mount.set_tracking_adjustment(-8.0).await.unwrap();
        let _peer = script.await.unwrap();
    }
}
