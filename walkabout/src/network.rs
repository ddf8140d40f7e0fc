use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::messages::{ClientMessage, PingMessage, ServerMessage};
use crate::utils::now_millis;

/// Fixed wait between a dropped connection and the next attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// No server configured.
    Disabled,
    Connecting,
    Open,
    Closed,
    Error,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkStatus::Disabled => "disabled",
            LinkStatus::Connecting => "connecting",
            LinkStatus::Open => "open",
            LinkStatus::Closed => "closed",
            LinkStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Non-blocking handle to the WebSocket connection.
///
/// The socket lives in a background task that reconnects on its own; the
/// frame loop only queues outbound frames and drains inbound ones.
pub struct NetworkLink {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    status: watch::Receiver<LinkStatus>,
    task: Option<JoinHandle<()>>,
}

impl NetworkLink {
    /// Start connecting to `url`. Must be called from within a tokio runtime.
    pub fn spawn(url: &str, reconnect_delay: Duration) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(LinkStatus::Connecting);

        let task = tokio::spawn(run_link(
            url.to_string(),
            reconnect_delay,
            status_tx,
            inbound_tx,
            outbound_rx,
        ));

        Self {
            outbound: outbound_tx,
            inbound: inbound_rx,
            status: status_rx,
            task: Some(task),
        }
    }

    /// A link that never connects. Sends are dropped.
    pub fn disabled() -> Self {
        let (outbound, _) = mpsc::unbounded_channel();
        let (_, inbound) = mpsc::unbounded_channel();
        let (_, status) = watch::channel(LinkStatus::Disabled);
        Self {
            outbound,
            inbound,
            status,
            task: None,
        }
    }

    pub fn status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    /// Queue a frame. It is dropped unless the link is open when the
    /// background task gets to it.
    pub fn send(&self, msg: ClientMessage) {
        if self.outbound.send(msg).is_err() {
            log::debug!("Network link is gone, dropping outbound message");
        }
    }

    /// Everything received since the last call, oldest first.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbound.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Wait for the next inbound message. `None` once the link is shut down.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.inbound.recv().await
    }

    /// Wait until the status satisfies `f`, returning the matching status.
    pub async fn wait_for_status<F>(&mut self, f: F) -> Option<LinkStatus>
    where
        F: FnMut(&LinkStatus) -> bool,
    {
        self.status.wait_for(f).await.ok().map(|status| *status)
    }
}

impl Drop for NetworkLink {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_link(
    url: String,
    reconnect_delay: Duration,
    status: watch::Sender<LinkStatus>,
    inbound: mpsc::UnboundedSender<ServerMessage>,
    mut outbound: mpsc::UnboundedReceiver<ClientMessage>,
) {
    if let Err(e) = url.as_str().into_client_request() {
        log::warn!("Invalid WS_URL {}: {}", url, e);
        status.send_replace(LinkStatus::Error);
        return;
    }

    loop {
        status.send_replace(LinkStatus::Connecting);
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                log::info!("WS open {}", url);
                // Anything queued while we were offline is stale. Drop it before
                // reporting open so frames queued after that are kept.
                while outbound.try_recv().is_ok() {}
                status.send_replace(LinkStatus::Open);
                match run_session(stream, &inbound, &mut outbound).await {
                    Ok(()) => {
                        log::info!("WS closed");
                        status.send_replace(LinkStatus::Closed);
                    }
                    Err(e) => {
                        log::warn!("WS error: {}", e);
                        status.send_replace(LinkStatus::Error);
                    }
                }
            }
            Err(e) => {
                log::warn!("Failed to connect to {}: {}", url, e);
                status.send_replace(LinkStatus::Error);
            }
        }

        if inbound.is_closed() {
            return;
        }

        log::debug!("Reconnecting in {:?}", reconnect_delay);
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn run_session(
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    inbound: &mpsc::UnboundedSender<ServerMessage>,
    outbound: &mut mpsc::UnboundedReceiver<ClientMessage>,
) -> Result<()> {
    let (mut sink, mut source) = stream.split();

    let ping = ClientMessage::Ping(PingMessage {
        client_time: now_millis(),
    });
    sink.send(Message::Text(ping.to_json()?)).await?;

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => match ServerMessage::parse(&text) {
                    Ok(msg) => {
                        log::debug!("ws msg {:?}", msg);
                        if inbound.send(msg).is_err() {
                            return Ok(());
                        }
                    }
                    Err(e) => {
                        log::debug!("Failed to parse message: {} (Error: {})", text, e);
                    }
                },
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            msg = outbound.recv() => match msg {
                Some(msg) => sink.send(Message::Text(msg.to_json()?)).await?,
                None => {
                    let _ = sink.close().await;
                    return Ok(());
                }
            },
        }
    }
}
