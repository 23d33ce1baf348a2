//! Per-connection session state machine
//!
//! Each connection gets one serial message loop: a message is handled to
//! completion (including a full pipeline run on `stop`) before the next is
//! read, so the audio buffer needs no locking. Outbound delivery goes
//! through an mpsc queue drained by a forwarding task that owns the socket
//! sink, which lets the broadcaster and keepalive write concurrently with a
//! running pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use super::RelayState;
use super::protocol::{ClientCommand, Outbound, ServerStatus};
use crate::audio::{AudioBuffer, pcm8_to_wav};
use crate::{Error, Result};

/// Outbound queue depth per session
const OUTBOUND_QUEUE: usize = 64;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, nothing buffered, no pipeline in flight
    Idle,
    /// Accumulating binary audio frames
    Buffering,
    /// A pipeline run is in flight; new frames queue in the transport and
    /// are buffered for a future turn once the loop resumes
    Processing,
}

/// One client's connection plus its buffering/processing state
struct Session {
    id: Uuid,
    addr: SocketAddr,
    buffer: AudioBuffer,
    state: SessionState,
    tx: mpsc::Sender<Outbound>,
}

/// Drive one websocket connection to completion
pub(super) async fn handle_socket(socket: WebSocket, addr: SocketAddr, relay: Arc<RelayState>) {
    let id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_QUEUE);

    // Forwarding task: sole owner of the socket sink. Exits when the queue
    // closes or the transport rejects a write, which in turn fails every
    // later queue send (the signal the broadcaster keys removal off).
    let forward = tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            let message = match item {
                Outbound::Status(status) => match serde_json::to_string(&status) {
                    Ok(json) => Message::Text(json.into()),
                    Err(e) => {
                        tracing::error!(error = %e, "status envelope serialization failed");
                        continue;
                    }
                },
                Outbound::Audio(chunk) => Message::Binary(chunk.into()),
                Outbound::Ping => Message::Ping(Vec::new().into()),
            };
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    relay.registry.add(id, tx.clone()).await;
    tracing::info!(session = %id, %addr, "session connected");

    let mut session = Session {
        id,
        addr,
        buffer: AudioBuffer::new(),
        state: SessionState::Idle,
        tx,
    };

    let keepalive_after = relay.config.keepalive_interval;
    let idle_limit = relay.config.keepalive_interval + relay.config.keepalive_timeout;
    let mut keepalive = tokio::time::interval(keepalive_after);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_inbound = Instant::now();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(message)) => {
                    last_inbound = Instant::now();
                    if session.handle_message(message, &relay).await.is_none() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(session = %id, error = %e, "transport error");
                    break;
                }
                None => break,
            },
            _ = keepalive.tick() => {
                if last_inbound.elapsed() > idle_limit {
                    tracing::info!(session = %id, "closing idle session");
                    break;
                }
                let _ = session.tx.send(Outbound::Ping).await;
            }
        }
    }

    relay.registry.remove(id).await;
    forward.abort();
    tracing::info!(
        session = %id,
        state = ?session.state,
        buffered = session.buffer.len(),
        "session disconnected"
    );
}

impl Session {
    /// Classify and handle one inbound payload. Returns `None` when the
    /// connection should close; errors are contained to this session.
    async fn handle_message(&mut self, message: Message, relay: &RelayState) -> Option<()> {
        match message {
            Message::Binary(frame) => self.on_frame(&frame),
            Message::Text(text) => {
                if let Err(e) = self.on_command(&text, relay).await {
                    tracing::warn!(session = %self.id, error = %e, "message handling failed");
                    self.send(ServerStatus::error(e.to_string())).await;
                }
            }
            Message::Close(_) => {
                tracing::info!(session = %self.id, "closed by client");
                return None;
            }
            // axum answers pings itself; pongs already refreshed the idle clock
            Message::Ping(_) | Message::Pong(_) => {}
        }
        Some(())
    }

    /// Binary frame: accumulate and (re)enter `Buffering`
    fn on_frame(&mut self, frame: &[u8]) {
        self.buffer.append(frame);
        self.state = SessionState::Buffering;
        tracing::trace!(
            session = %self.id,
            frame_bytes = frame.len(),
            buffered = self.buffer.len(),
            "audio frame buffered"
        );
    }

    /// Text frame: parse the command envelope and dispatch
    async fn on_command(&mut self, text: &str, relay: &RelayState) -> Result<()> {
        let command = ClientCommand::parse(text)?;
        match command {
            ClientCommand::Ping => {
                self.send(ServerStatus::pong()).await;
            }
            ClientCommand::Pause => {
                // Advisory only: the buffer is retained, state unchanged
                tracing::debug!(session = %self.id, buffered = self.buffer.len(), "pause");
                self.send(ServerStatus::paused()).await;
            }
            ClientCommand::Stop => {
                self.run_turn(relay).await?;
            }
        }
        Ok(())
    }

    /// `stop`: drain the buffer, run the pipeline, broadcast the reply.
    ///
    /// An empty buffer still runs the pipeline, which short-circuits with
    /// "no speech detected".
    async fn run_turn(&mut self, relay: &RelayState) -> Result<()> {
        let pcm = self.buffer.drain();
        tracing::info!(
            session = %self.id,
            addr = %self.addr,
            utterance_bytes = pcm.len(),
            "stop received, starting pipeline"
        );

        let wav = pcm8_to_wav(&pcm, relay.config.sample_rate)?;
        self.state = SessionState::Processing;
        self.send(ServerStatus::processing("processing your audio")).await;

        match relay.pipeline.run(&wav, &self.tx).await {
            Ok(output) => {
                tracing::info!(
                    session = %self.id,
                    transcript = %output.transcript,
                    reply = %output.reply_text,
                    reply_bytes = output.waveform.len(),
                    "pipeline complete, streaming reply"
                );
                relay.broadcaster.stream(&output.waveform).await;
                self.send(ServerStatus::success("reply audio delivered")).await;
            }
            Err(Error::NoSpeechDetected) => {
                tracing::info!(session = %self.id, "no speech detected");
                self.send(ServerStatus::error("no speech detected")).await;
            }
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "pipeline failed");
                self.send(ServerStatus::error(e.to_string())).await;
            }
        }

        self.state = SessionState::Idle;
        Ok(())
    }

    /// Best-effort status delivery to this session only
    async fn send(&self, status: ServerStatus) {
        let _ = self.tx.send(Outbound::Status(status)).await;
    }
}
