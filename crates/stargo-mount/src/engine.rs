//! Command/response engine
//!
//! The controller interleaves unsolicited status frames with replies, so
//! every frame read goes through [`MotionStatusParser`] first. Anything that
//! is not a status frame is a reply; only the first one per query is kept.
//!
//! The engine also enforces a minimum gap between transmits. StarGo firmware
//! drops commands that follow each other too closely.

use std::time::Duration;

use stargo_protocol::{MotionStatusParser, MountState, TERMINATOR};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::error::{MountError, TransportError};
use crate::events::MountEvent;
use crate::transport::TransportChannel;

/// Owns the transport and the mount state parsed from it
pub struct ProtocolEngine<T> {
    transport: TransportChannel<T>,
    config: EngineConfig,
    state: MountState,
    state_tx: watch::Sender<MountState>,
    event_tx: broadcast::Sender<MountEvent>,
    last_transmit: Option<Instant>,
    /// Classification of every frame read, oldest first
    #[cfg(test)]
    frames: Vec<&'static str>,
}

impl<T> ProtocolEngine<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        transport: TransportChannel<T>,
        config: EngineConfig,
        state_tx: watch::Sender<MountState>,
        event_tx: broadcast::Sender<MountEvent>,
    ) -> Self {
        let state = *state_tx.borrow();
        Self {
            transport,
            config,
            state,
            state_tx,
            event_tx,
            last_transmit: None,
            #[cfg(test)]
            frames: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> MountState {
        self.state
    }

    /// Send `command` and collect its reply
    ///
    /// Frames already waiting are routed first. The first receive waits up to
    /// `wait`; once a reply is captured the remaining frames are only picked
    /// up if already available. A zero `wait` means the command has no reply
    /// and an empty string is returned.
    pub async fn query(
        &mut self,
        command: &str,
        terminator: u8,
        wait: Duration,
    ) -> Result<String, MountError> {
        debug!(
            "Query {} (end {:?}, wait {:?})",
            command,
            char::from(terminator),
            wait
        );

        self.drain().await?;
        if let Some(next) = self.next_transmit() {
            trace!("Pacing for {:?}", next - Instant::now());
            sleep_until(next).await;
        }

        self.last_transmit = Some(Instant::now());
        if let Err(e) = self.transport.transmit(command).await {
            warn!("Failed to transmit {}: {}", command, e);
            return Err(e.into());
        }

        let mut timeout = wait;
        let mut reply: Option<String> = None;
        loop {
            match self.transport.receive(terminator, timeout).await {
                Ok(frame) => {
                    if self.route(&frame) {
                        continue;
                    }
                    if wait.is_zero() {
                        debug!("Discarding {:?} received after {}", frame, command);
                    } else if reply.is_none() {
                        self.record("reply");
                        reply = Some(frame);
                    } else {
                        debug!("Discarding extra frame {:?} for {}", frame, command);
                    }
                    timeout = Duration::ZERO;
                }
                Err(TransportError::Timeout) => {
                    if !timeout.is_zero() {
                        warn!("No reply to {} within {:?}", command, wait);
                    }
                    break;
                }
                Err(e) => {
                    warn!("Failed to receive reply to {}: {}", command, e);
                    return Err(e.into());
                }
            }
        }

        if wait.is_zero() {
            return Ok(String::new());
        }
        reply.ok_or_else(|| MountError::NoReply {
            command: command.to_string(),
        })
    }

    /// Route every frame that is already available
    async fn drain(&mut self) -> Result<(), MountError> {
        loop {
            match self.transport.receive(TERMINATOR, Duration::ZERO).await {
                Ok(frame) => {
                    if !self.route(&frame) {
                        debug!("Discarding stale frame {:?}", frame);
                    }
                }
                Err(TransportError::Timeout) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Earliest instant the next transmit may go out, if still ahead
    fn next_transmit(&self) -> Option<Instant> {
        let next = self.last_transmit? + self.config.command_spacing();
        (next > Instant::now()).then_some(next)
    }

    #[cfg(test)]
    fn record(&mut self, kind: &'static str) {
        self.frames.push(kind);
    }

    #[cfg(not(test))]
    fn record(&mut self, _kind: &'static str) {}

    /// Apply `frame` to the mount state if it is a status frame
    fn route(&mut self, frame: &str) -> bool {
        if !MotionStatusParser::update(&mut self.state, frame) {
            return false;
        }
        trace!("Status {:?}: {}", frame, self.state);
        self.record("status");
        self.state_tx.send_replace(self.state);
        let _ = self.event_tx.send(MountEvent::Status(self.state));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stargo_protocol::{MotorsState, SlewRate, TrackMode};
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn engine(
        client: DuplexStream,
    ) -> (
        ProtocolEngine<DuplexStream>,
        broadcast::Receiver<MountEvent>,
    ) {
        let (state_tx, _) = watch::channel(MountState::default());
        let (event_tx, event_rx) = broadcast::channel(32);
        let engine = ProtocolEngine::new(
            TransportChannel::new(client, 64),
            EngineConfig::default(),
            state_tx,
            event_tx,
        );
        (engine, event_rx)
    }

    async fn read_command(peer: &mut DuplexStream) -> String {
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            peer.read_exact(&mut byte).await.unwrap();
            out.push(byte[0]);
            if byte[0] == b'#' {
                return String::from_utf8(out).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_status_frames_around_reply() {
        let (client, mut peer) = duplex(256);
        let (mut engine, mut events) = engine(client);

        let mount = tokio::spawn(async move {
            assert_eq!(read_command(&mut peer).await, ":X42#");
            peer.write_all(b":Z1303#:Z1332#or+025#:Z1210#")
                .await
                .unwrap();
            peer
        });

        let reply = engine
            .query(":X42#", b'#', Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(reply, "or+025");

        let mut statuses = Vec::new();
        while let Ok(MountEvent::Status(s)) = events.try_recv() {
            statuses.push(s);
        }
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0].motors(), MotorsState::On);
        assert_eq!(statuses[1].slew_rate(), SlewRate::Find);
        assert_eq!(statuses[2].motors(), MotorsState::RaOnly);
        assert_eq!(engine.state().tracking(), TrackMode::Lunar);
        assert_eq!(engine.frames, ["status", "status", "reply", "status"]);

        let _peer = mount.await.unwrap();
    }

    #[tokio::test]
    async fn test_fire_and_forget_returns_empty() {
        let (client, mut peer) = duplex(256);
        let (mut engine, _events) = engine(client);

        let reply = engine
            .query(":X41+025#", b'#', Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(reply, "");
        assert_eq!(read_command(&mut peer).await, ":X41+025#");
    }

    #[tokio::test]
    async fn test_stale_frames_are_drained_before_transmit() {
        let (client, mut peer) = duplex(256);
        let (mut engine, _events) = engine(client);

        peer.write_all(b":Z1200#junk#").await.unwrap();
        engine
            .query(":Mgw0100#", b'#', Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(engine.state().motors(), MotorsState::RaOnly);
        assert_eq!(read_command(&mut peer).await, ":Mgw0100#");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_reply_is_an_error() {
        let (client, _peer) = duplex(256);
        let (mut engine, _events) = engine(client);

        let result = engine.query(":X22#", b'#', Duration::from_secs(2)).await;
        assert!(matches!(result, Err(MountError::NoReply { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_commands_are_spaced() {
        let (client, mut peer) = duplex(256);
        let (mut engine, _events) = engine(client);

        let start = Instant::now();
        engine.query(":X2030#", b'#', Duration::ZERO).await.unwrap();
        engine.query(":X2150#", b'#', Duration::ZERO).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));

        assert_eq!(read_command(&mut peer).await, ":X2030#");
        assert_eq!(read_command(&mut peer).await, ":X2150#");
    }

    #[tokio::test]
    async fn test_closed_link_fails_query() {
        let (client, peer) = duplex(256);
        let (mut engine, _events) = engine(client);
        drop(peer);

        let result = engine.query(":X42#", b'#', Duration::from_millis(100)).await;
        assert!(matches!(result, Err(MountError::Transport(_))));
    }
}
