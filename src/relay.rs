//! Network relay
//!
//! Accepts TCP listeners that exchange newline-delimited JSON messages. Gait
//! samples from every connection are funneled into one core task that owns
//! the processor, so samples are filtered strictly one at a time. Commands
//! produced by the core are broadcast to every connected listener.

use crate::config::GaitConfig;
use crate::error::GaitError;
use crate::pipeline::GaitProcessor;
use crate::types::{Command, Sample};
use crate::wire::{self, InboundMessage};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default relay port
pub const DEFAULT_PORT: u16 = 536;

/// Samples waiting for the core task
const SAMPLE_QUEUE_CAPACITY: usize = 1024;

/// Commands buffered per listener before it is considered lagging
const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Pause after a failed accept, so descriptor exhaustion does not spin
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP relay between sensor clients and command listeners
pub struct Relay {
    listener: TcpListener,
    config: GaitConfig,
}

impl Relay {
    /// Bind the relay to `addr` with a validated configuration
    pub async fn bind(addr: impl ToSocketAddrs, config: GaitConfig) -> Result<Self, GaitError> {
        config.validate()?;
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, GaitError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped.
    ///
    /// Failed accepts are logged and retried; they never stop the relay.
    pub async fn run(self) -> Result<(), GaitError> {
        let processor = GaitProcessor::with_config(self.config)?;
        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_QUEUE_CAPACITY);
        let (command_tx, _) = broadcast::channel(COMMAND_QUEUE_CAPACITY);

        tokio::spawn(run_core(processor, sample_rx, command_tx.clone()));

        info!(addr = %self.listener.local_addr()?, "relay listening");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let id = Uuid::new_v4();
            info!(%id, %peer, "listener connected");

            // Subscribe before spawning so no command after the accept is missed
            let commands = command_tx.subscribe();
            tokio::spawn(handle_connection(stream, id, sample_tx.clone(), commands));
        }
    }
}

async fn run_core(
    mut processor: GaitProcessor,
    mut samples: mpsc::Receiver<Sample>,
    commands: broadcast::Sender<Command>,
) {
    while let Some(sample) = samples.recv().await {
        match processor.ingest_sample(&sample) {
            Ok(Some(command)) => {
                if commands.send(command).is_err() {
                    debug!("no listeners for command");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "sample rejected"),
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    id: Uuid,
    samples: mpsc::Sender<Sample>,
    commands: broadcast::Receiver<Command>,
) {
    match serve_connection(stream, id, samples, commands).await {
        Ok(()) => info!(%id, "listener disconnected"),
        Err(e) => warn!(%id, error = %e, "listener dropped"),
    }
}

async fn serve_connection(
    stream: TcpStream,
    id: Uuid,
    samples: mpsc::Sender<Sample>,
    mut commands: broadcast::Receiver<Command>,
) -> Result<(), GaitError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    write_line(&mut writer, &wire::greeting()?).await?;

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => forward_line(id, &line, &samples),
                None => return Ok(()),
            },
            command = commands.recv() => match command {
                Ok(command) => write_line(&mut writer, &wire::encode_command(&command)?).await?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%id, skipped, "listener lagging, commands dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// Hand a sample to the core without waiting, so a full queue never stalls
/// this connection's command stream
fn forward_line(id: Uuid, line: &str, samples: &mpsc::Sender<Sample>) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }

    match wire::parse_message(trimmed) {
        Ok(InboundMessage::Gait(sample)) => {
            match samples.try_send(sample) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => warn!(%id, "sample queue full, sample dropped"),
                Err(TrySendError::Closed(_)) => warn!(%id, "core task stopped, sample dropped"),
            }
        }
        Ok(InboundMessage::Gesture(gesture)) => {
            info!(%id, gesture = ?gesture.gesture, "gesture received");
        }
        Err(e) => warn!(%id, error = %e, "message dropped"),
    }
}

async fn write_line(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    message: &str,
) -> Result<(), GaitError> {
    writer.write_all(message.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}
