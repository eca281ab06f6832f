use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use super::protocol::InboundMessage;
use crate::domain::{ChannelError, ConnectionState};

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub heartbeat_interval: Duration,
    pub reconnect_delay: Duration,
    /// Sent verbatim as a text frame on every heartbeat tick.
    pub heartbeat_token: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3000/ws".to_string(),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            heartbeat_token: "ping".to_string(),
        }
    }
}

/// What the owner of the channel gets to see.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelUpdate {
    State(ConnectionState),
    Message(InboundMessage),
}

/// Raw events produced by socket tasks and timers. Every event carries the
/// epoch of the connection attempt it belongs to.
#[derive(Debug)]
enum Event {
    Opened { epoch: u64 },
    Frame { epoch: u64, text: String },
    Failed { epoch: u64, error: ChannelError },
    Closed { epoch: u64 },
    ReconnectDue { epoch: u64 },
}

impl Event {
    fn epoch(&self) -> u64 {
        match self {
            Event::Opened { epoch }
            | Event::Frame { epoch, .. }
            | Event::Failed { epoch, .. }
            | Event::Closed { epoch }
            | Event::ReconnectDue { epoch } => *epoch,
        }
    }
}

/// Owns the push channel: one socket task at a time, its heartbeat, and the
/// reconnect timer. Reconnects forever at a fixed delay.
pub struct ConnectionManager {
    config: ChannelConfig,
    epoch: u64,
    state: ConnectionState,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    socket_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
    /// Held by a socket task for its whole life. A superseded task gives it
    /// back only once its future is dropped.
    socket_slot: Arc<Semaphore>,
    live_heartbeats: Arc<AtomicUsize>,
}

impl ConnectionManager {
    pub fn new(config: ChannelConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            epoch: 0,
            state: ConnectionState::Disconnected,
            tx,
            rx,
            socket_task: None,
            reconnect_task: None,
            socket_slot: Arc::new(Semaphore::new(1)),
            live_heartbeats: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of heartbeat tickers currently running.
    pub fn live_heartbeats(&self) -> usize {
        self.live_heartbeats.load(Ordering::SeqCst)
    }

    /// Start a new connection attempt, superseding any live socket and any
    /// pending reconnect. The new socket opens only after the superseded task
    /// has been torn down.
    pub fn connect(&mut self) {
        self.abort_tasks();
        self.epoch += 1;
        self.state = ConnectionState::Connecting;

        tracing::info!(epoch = self.epoch, url = %self.config.url, "opening push channel");
        self.socket_task = Some(tokio::spawn(run_socket(
            self.config.clone(),
            self.epoch,
            self.tx.clone(),
            Arc::clone(&self.socket_slot),
            Arc::clone(&self.live_heartbeats),
        )));
    }

    /// Close the channel for good. Nothing is rescheduled afterwards.
    pub fn shutdown(&mut self) {
        self.abort_tasks();
        self.epoch += 1;
        self.state = ConnectionState::Disconnected;
        tracing::info!("push channel shut down");
    }

    /// Wait for the next lifecycle change or inbound message. Malformed frames
    /// and events from superseded connections are skipped.
    pub async fn recv(&mut self) -> Option<ChannelUpdate> {
        loop {
            let event = self.rx.recv().await?;
            if let Some(update) = self.handle(event) {
                return Some(update);
            }
        }
    }

    /// Like [`Self::recv`], but only looks at events that are already queued.
    pub fn try_recv(&mut self) -> Option<ChannelUpdate> {
        while let Ok(event) = self.rx.try_recv() {
            if let Some(update) = self.handle(event) {
                return Some(update);
            }
        }
        None
    }

    fn handle(&mut self, event: Event) -> Option<ChannelUpdate> {
        if event.epoch() != self.epoch {
            tracing::trace!(
                event_epoch = event.epoch(),
                epoch = self.epoch,
                "ignoring event from superseded connection"
            );
            return None;
        }

        match event {
            Event::Opened { .. } => {
                tracing::info!(epoch = self.epoch, "push channel connected");
                self.state = ConnectionState::Connected;
            }
            Event::Frame { text, .. } => {
                return match InboundMessage::parse(&text) {
                    Ok(message) => Some(ChannelUpdate::Message(message)),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping inbound frame");
                        None
                    }
                };
            }
            Event::Failed { error, .. } => {
                tracing::warn!(epoch = self.epoch, error = %error, "push channel error");
                self.state = ConnectionState::Error;
            }
            Event::Closed { .. } => {
                tracing::info!(
                    epoch = self.epoch,
                    delay_ms = self.config.reconnect_delay.as_millis() as u64,
                    "push channel closed, scheduling reconnect"
                );
                self.state = ConnectionState::Disconnected;
                self.socket_task = None;
                self.schedule_reconnect();
            }
            Event::ReconnectDue { .. } => {
                self.reconnect_task = None;
                self.connect();
            }
        }
        Some(ChannelUpdate::State(self.state))
    }

    fn schedule_reconnect(&mut self) {
        let epoch = self.epoch;
        let delay = self.config.reconnect_delay;
        let tx = self.tx.clone();
        if let Some(previous) = self.reconnect_task.take() {
            previous.abort();
        }
        self.reconnect_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::ReconnectDue { epoch });
        }));
    }

    fn abort_tasks(&mut self) {
        if let Some(task) = self.socket_task.take() {
            task.abort();
        }
        if let Some(task) = self.reconnect_task.take() {
            task.abort();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Counts a running heartbeat for as long as it is alive, including when the
/// owning task is aborted.
struct HeartbeatGuard(Arc<AtomicUsize>);

impl HeartbeatGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn run_socket(
    config: ChannelConfig,
    epoch: u64,
    tx: mpsc::UnboundedSender<Event>,
    socket_slot: Arc<Semaphore>,
    live_heartbeats: Arc<AtomicUsize>,
) {
    // The slot is never closed.
    let Ok(_slot) = socket_slot.acquire_owned().await else {
        return;
    };

    let stream = match connect_async(config.url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            let _ = tx.send(Event::Failed {
                epoch,
                error: ChannelError::Transport(e.to_string()),
            });
            let _ = tx.send(Event::Closed { epoch });
            return;
        }
    };

    let heartbeat = HeartbeatGuard::new(live_heartbeats);
    let _ = tx.send(Event::Opened { epoch });

    let (mut write, mut read) = stream.split();
    let mut ticker = interval_at(
        Instant::now() + config.heartbeat_interval,
        config.heartbeat_interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if tx.send(Event::Frame { epoch, text: text.to_string() }).is_err() {
                        return;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = tx.send(Event::Failed {
                        epoch,
                        error: ChannelError::Transport(e.to_string()),
                    });
                    break;
                }
            },
            _ = ticker.tick() => {
                if let Err(e) = write.send(WsMessage::Text(config.heartbeat_token.clone().into())).await {
                    let _ = tx.send(Event::Failed {
                        epoch,
                        error: ChannelError::Transport(e.to_string()),
                    });
                    break;
                }
                tracing::trace!(epoch, "heartbeat sent");
            }
        }
    }

    drop(heartbeat);
    let _ = tx.send(Event::Closed { epoch });
}
