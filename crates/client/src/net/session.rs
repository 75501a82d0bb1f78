//! Connection lifecycle: connect, serve, back off, reconnect.
//!
//! Connecting -> Ready -> Disconnected -> (backoff) -> Connecting -> ...
//!
//! One task owns the connection. Callers talk to it through a cloneable
//! [`SessionHandle`]; nothing is written to the transport before the first
//! successful open.
//!
//! - Outbound commands wait in an unbounded queue that is only drained while
//!   Ready, so a command issued offline goes out after the next connect.
//! - Subscriptions are not queued. A single `watch` slot holds the most
//!   recently requested chunk set; whenever the session is Ready and the slot
//!   changes (or a connection opens) the latest set is sent, unless its wire
//!   form equals the subscription already active on this connection.

use std::sync::Arc;
use std::time::Duration;

use cubopolis_engine::world::block::Block;
use cubopolis_engine::world::position::{ChunkPos, Position};
use indexmap::IndexSet;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};

use super::transport::Connector;
use super::wire::{self, Command};
use crate::router::EventRouter;

/// Reconnect delay: starts at `floor`, grows by `step` per failed attempt,
/// never exceeds `ceiling`, and resets to `floor` after a successful open.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    step: Duration,
    ceiling: Duration,
    next: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, step: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            step,
            ceiling,
            next: floor,
        }
    }

    pub fn reset(&mut self) {
        self.next = self.floor;
    }

    /// Delay before the next attempt. The cap applies to the returned delay;
    /// the increment applies afterwards.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next.min(self.ceiling);
        self.next = delay + self.step;
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(2000),
            Duration::from_millis(2000),
            Duration::from_millis(30_000),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Ready,
    Disconnected,
}

/// Caller-side API. Every request is deferred until the session is Ready.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    subscription: Arc<watch::Sender<Option<Vec<ChunkPos>>>>,
    state: watch::Receiver<SessionState>,
}

/// The session's side of the channels created by [`channel`].
pub struct Mailbox {
    commands: mpsc::UnboundedReceiver<Command>,
    subscription: watch::Receiver<Option<Vec<ChunkPos>>>,
    state: watch::Sender<SessionState>,
}

/// Create a handle and the mailbox a [`Session`] will serve it from.
///
/// Split from [`Session::new`] so collaborators that need a handle (the local
/// player, views) can be built before the router they plug into.
pub fn channel() -> (SessionHandle, Mailbox) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (subscription_tx, subscription_rx) = watch::channel(None);
    let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
    (
        SessionHandle {
            commands: commands_tx,
            subscription: Arc::new(subscription_tx),
            state: state_rx,
        },
        Mailbox {
            commands: commands_rx,
            subscription: subscription_rx,
            state: state_tx,
        },
    )
}

impl SessionHandle {
    /// Subscribe to exactly `chunks`, replacing any earlier request.
    /// Duplicates are dropped; order is kept.
    pub fn request_subscription(&self, chunks: impl IntoIterator<Item = ChunkPos>) {
        let chunks: IndexSet<ChunkPos> = chunks.into_iter().collect();
        self.subscription
            .send_replace(Some(chunks.into_iter().collect()));
    }

    pub fn request_set_cell(&self, pos: Position, block: Option<Block>) {
        self.send(Command::SetCell { pos, block });
    }

    pub fn request_send_text(&self, text: impl Into<String>) {
        self.send(Command::Text(text.into()));
    }

    pub fn request_move_player(&self, pos: Position) {
        self.send(Command::Move(pos));
    }

    pub fn request_chunk_reload(&self, chunk: ChunkPos) {
        self.send(Command::Reload(chunk));
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Session is gone, dropping outbound command");
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Resolve once the session is Ready.
    pub async fn wait_until_ready(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == SessionState::Ready).await;
    }
}

impl Mailbox {
    /// Take every queued command without sending it.
    pub fn drain_commands(&mut self) -> Vec<Command> {
        let mut drained = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            drained.push(command);
        }
        drained
    }
}

/// Why a connection stopped being served.
enum Closed {
    ByPeer,
    /// Every handle is gone; nothing can ever be sent again.
    Shutdown,
}

/// Owns the connection and the reconnect loop.
pub struct Session<C: Connector> {
    connector: C,
    mailbox: Mailbox,
    router: EventRouter,
    backoff: Backoff,
    /// Wire form of the subscription sent on the current connection.
    active_signature: Option<String>,
}

impl<C: Connector> Session<C> {
    pub fn new(connector: C, mailbox: Mailbox, router: EventRouter, backoff: Backoff) -> Self {
        Self {
            connector,
            mailbox,
            router,
            backoff,
            active_signature: None,
        }
    }

    /// Run until every handle is dropped and the command queue is empty.
    /// Transport failures never escape: they end the current connection and
    /// schedule a reconnect.
    ///
    /// Collaborators wired into the router usually hold a handle of their
    /// own, in which case this only ends when the task is aborted.
    pub async fn run(mut self) {
        let peer = self.connector.describe();
        loop {
            self.set_state(SessionState::Connecting);
            tracing::info!("Connecting to {}", peer);

            match self.connector.connect().await {
                Ok((reader, writer)) => {
                    self.on_open();
                    let outcome = self.serve(reader, writer).await;
                    self.on_close();
                    match outcome {
                        Ok(Closed::ByPeer) => tracing::warn!("Connection to {} closed", peer),
                        Ok(Closed::Shutdown) => {
                            tracing::info!("All session handles dropped, stopping");
                            return;
                        }
                        Err(e) => tracing::warn!("Connection to {} failed: {}", peer, e),
                    }
                }
                Err(e) => {
                    self.set_state(SessionState::Disconnected);
                    tracing::warn!("Could not connect to {}: {}", peer, e);
                }
            }

            if self.mailbox.commands.is_closed() && self.mailbox.commands.is_empty() {
                tracing::info!("All session handles dropped, stopping");
                return;
            }

            let delay = self.backoff.next_delay();
            tracing::info!("Will try to reconnect in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn set_state(&self, state: SessionState) {
        self.mailbox.state.send_replace(state);
    }

    fn on_open(&mut self) {
        self.set_state(SessionState::Ready);
        self.backoff.reset();
        self.router.now_online();
    }

    fn on_close(&mut self) {
        self.set_state(SessionState::Disconnected);
        // The next connection starts unsubscribed and must send again.
        self.active_signature = None;
        self.router.now_offline();
    }

    async fn serve(&mut self, reader: C::Reader, mut writer: C::Writer) -> std::io::Result<Closed> {
        let mut reader = BufReader::new(reader);
        // Survives cancelled reads: partial lines stay here until completed.
        let mut line = Vec::new();
        self.sync_subscription(&mut writer).await?;

        loop {
            tokio::select! {
                biased;

                read = reader.read_until(b'\n', &mut line) => {
                    if read? == 0 {
                        return Ok(Closed::ByPeer);
                    }
                    self.receive(&line);
                    line.clear();
                }
                changed = self.mailbox.subscription.changed() => {
                    if changed.is_err() {
                        return Ok(Closed::Shutdown);
                    }
                    self.sync_subscription(&mut writer).await?;
                }
                command = self.mailbox.commands.recv() => match command {
                    Some(command) => write_line(&mut writer, &wire::encode(&command)).await?,
                    None => return Ok(Closed::Shutdown),
                },
            }
        }
    }

    /// Handle one raw inbound line. Anything malformed costs only that line.
    fn receive(&mut self, raw: &[u8]) {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Dropping frame {:?}: {}", String::from_utf8_lossy(raw), e);
                return;
            }
        };
        if line.trim().is_empty() {
            return;
        }
        match wire::decode(line) {
            Ok(event) => self.router.dispatch(event),
            Err(e) => tracing::warn!("Dropping frame {:?}: {}", line, e),
        }
    }

    /// Send the latest requested subscription if it differs from the active
    /// one.
    async fn sync_subscription<W: AsyncWrite + Unpin>(&mut self, writer: &mut W) -> std::io::Result<()> {
        let latest = self.mailbox.subscription.borrow_and_update().clone();
        let Some(chunks) = latest else {
            return Ok(());
        };
        let signature = wire::encode(&Command::Listen(chunks.clone()));
        if self.active_signature.as_deref() == Some(signature.as_str()) {
            tracing::debug!("Subscription to {} chunks already active", chunks.len());
            return Ok(());
        }

        write_line(writer, &signature).await?;
        tracing::info!("Subscribed to {} chunks", chunks.len());
        self.active_signature = Some(signature);
        self.router.subscription_changed(&chunks);
        Ok(())
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
