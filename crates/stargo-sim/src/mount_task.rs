//! Virtual mount actor task
//!
//! Owns a [`VirtualMount`] and serves it over an async stream. The task uses
//! a select! loop to:
//! - Read `#`-terminated commands from the stream and write their replies
//! - Handle status and shutdown commands from a channel
//! - Report every received command on a broadcast channel

use std::io;

use tokio::io::{duplex, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::VirtualMount;

/// Size of the in-memory link created by [`spawn_virtual_mount`]
const LINK_BUFFER: usize = 1024;

/// Commands that can be sent to a virtual mount actor
#[derive(Debug, Clone)]
pub enum VirtualMountCommand {
    /// Write one status frame for the current state
    EmitStatus,
    /// Change the status digits and emit a frame for them
    SetStatus { motors: u8, tracking: u8, slew: u8 },
    /// Wrap every reply in status frames
    SetStatusChatter(bool),
    /// Shutdown the virtual mount actor
    Shutdown,
}

/// A command received by the virtual mount
#[derive(Debug, Clone)]
pub struct VirtualMountEvent {
    pub command: String,
    /// When the terminator of the command arrived
    pub received_at: Instant,
    /// Reply written back, if any, terminator included
    pub reply: Option<String>,
}

/// Run the virtual mount actor task
///
/// Returns when the stream closes, on [`VirtualMountCommand::Shutdown`], or
/// when the command channel is dropped.
pub async fn run_virtual_mount_task<S>(
    mut stream: S,
    mut mount: VirtualMount,
    mut cmd_rx: mpsc::Receiver<VirtualMountCommand>,
    event_tx: broadcast::Sender<VirtualMountEvent>,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 256];
    let mut pending: Vec<u8> = Vec::new();

    info!("Starting virtual mount task for {}", mount.id());

    loop {
        tokio::select! {
            result = stream.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        debug!("Virtual mount stream closed for {}", mount.id());
                        break;
                    }
                    Ok(n) => {
                        pending.extend_from_slice(&buf[..n]);
                        while let Some(pos) = pending.iter().position(|&b| b == b'#') {
                            let raw: Vec<u8> = pending.drain(..=pos).collect();
                            let command = String::from_utf8_lossy(&raw).into_owned();
                            let received_at = Instant::now();
                            let reply = mount.process_command(&command);
                            debug!(
                                "Virtual mount {} {:?} -> {:?}",
                                mount.id(), command, reply
                            );

                            if let Some(reply) = &reply {
                                let mut out = String::new();
                                if mount.status_chatter() {
                                    out.push_str(&mount.status_frame());
                                }
                                out.push_str(reply);
                                if mount.status_chatter() {
                                    out.push_str(&mount.status_frame());
                                }
                                write_frames(&mut stream, &out).await?;
                            }

                            let _ = event_tx.send(VirtualMountEvent {
                                command,
                                received_at,
                                reply,
                            });
                        }
                    }
                    Err(e) => {
                        warn!("Virtual mount {} stream error: {}", mount.id(), e);
                        return Err(e);
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(VirtualMountCommand::EmitStatus) => {
                        write_frames(&mut stream, &mount.status_frame()).await?;
                    }
                    Some(VirtualMountCommand::SetStatus { motors, tracking, slew }) => {
                        mount.set_status(motors, tracking, slew);
                        write_frames(&mut stream, &mount.status_frame()).await?;
                    }
                    Some(VirtualMountCommand::SetStatusChatter(enabled)) => {
                        debug!("Virtual mount {} status chatter {}", mount.id(), enabled);
                        mount.set_status_chatter(enabled);
                    }
                    Some(VirtualMountCommand::Shutdown) => {
                        info!("Shutdown requested for virtual mount {}", mount.id());
                        break;
                    }
                    None => {
                        debug!("Command channel closed for virtual mount {}", mount.id());
                        break;
                    }
                }
            }
        }
    }

    info!("Virtual mount task ended for {}", mount.id());
    Ok(())
}

async fn write_frames<S>(stream: &mut S, text: &str) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(text.as_bytes()).await?;
    stream.flush().await
}

/// Control side of a spawned virtual mount
pub struct VirtualMountHandle {
    pub commands: mpsc::Sender<VirtualMountCommand>,
    pub events: broadcast::Receiver<VirtualMountEvent>,
    pub task: JoinHandle<io::Result<()>>,
}

/// Spawn `mount` on an in-memory link and return the driver's end of it
pub fn spawn_virtual_mount(mount: VirtualMount) -> (DuplexStream, VirtualMountHandle) {
    let (client, server) = duplex(LINK_BUFFER);
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, event_rx) = broadcast::channel(256);
    let task = tokio::spawn(run_virtual_mount_task(server, mount, cmd_rx, event_tx));
    (
        client,
        VirtualMountHandle {
            commands: cmd_tx,
            events: event_rx,
            task,
        },
    )
}
