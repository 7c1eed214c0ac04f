use crate::app::Application;
use crate::dispatch::Outbox;
use crate::error::Error;
use crate::models::io::Message;
use crate::reader::FrameReader;
use crate::state::ConnectionState;
use crate::types::HeartbeatInterval;
use crate::utils;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, trace, warn, Instrument};
use uuid::Uuid;

/// Everything the message handlers need to know about one client.
pub(crate) struct Connection {
    pub(crate) id: Uuid,
    pub(crate) state: ConnectionState,
    pub(crate) outbox: Outbox,
    pub(crate) heartbeat: Option<Heartbeat>,
}
impl Connection {
    pub(crate) fn new(id: Uuid, outbox: Outbox) -> Self {
        Self {
            id,
            state: ConnectionState::default(),
            outbox,
            heartbeat: None,
        }
    }
}

/// A running heartbeat task; stopped when dropped.
pub(crate) struct Heartbeat {
    task: JoinHandle<()>,
}
impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts sending Heartbeat frames every `deciseconds / 10` seconds. Zero starts nothing.
pub(crate) fn heartbeat(deciseconds: HeartbeatInterval, outbox: Outbox) -> Option<Heartbeat> {
    if deciseconds == 0 {
        return None;
    }
    let period = Duration::from_millis(u64::from(deciseconds) * 100);
    debug!("Pinging every {period:?}.");
    let task = tokio::spawn(
        async move {
            let mut interval = interval_at(Instant::now() + period, period);
            'heartbeat: loop {
                interval.tick().await;
                if outbox.send(Message::Heartbeat).is_err() {
                    break 'heartbeat;
                }
            }
        }
        .in_current_span(),
    );
    Some(Heartbeat { task })
}

/// Reads and handles messages until the client leaves, misbehaves, or can no longer be written to.
pub(crate) async fn connection(application: Arc<Application>, id: Uuid, stream: TcpStream) {
    info!("Accepting new connection");
    let (read_stream, write_stream) = stream.into_split();
    let (outbox, inbox) = unbounded_channel();
    let mut writer = tokio::spawn(outgoing(application.clone(), write_stream, inbox).in_current_span());
    let mut writer_finished = false;

    let mut reader = FrameReader::new(read_stream);
    let mut connection = Connection::new(id, outbox);

    let end_reason: Result<(), Error> = 'connected: loop {
        let next = tokio::select! {
            next = reader.next_message() => next,
            _ = &mut writer => {
                writer_finished = true;
                break 'connected Ok(());
            }
        };
        match next {
            Ok(Some(message)) => {
                if let Err(error) = application.handle_message(&mut connection, message).await {
                    break 'connected Err(error);
                }
            }
            Ok(None) => break 'connected Ok(()),
            Err(error) => break 'connected Err(error),
        }
    };

    match end_reason {
        Ok(()) => info!("Dropping connection..."),
        Err(Error::Transport(error)) => info!("Dropping connection after stream error: {error}"),
        Err(error) => {
            warn!("ERROR: {error}");
            if error.is_reportable() {
                _ = connection.outbox.send(Message::Error(error.to_string()));
            }
        }
    }

    application.disconnect(&connection).await;
    // Dropping the last outbox lets the writer drain and shut the stream down.
    drop(connection);
    if !writer_finished {
        _ = writer.await;
    }
}

/// Owns the write half. Stops after writing an Error frame or on the first failed write; any
/// tickets it did not manage to write go back to the pending queue.
async fn outgoing<W>(application: Arc<Application>, mut stream: W, mut inbox: UnboundedReceiver<Message>)
where
    W: AsyncWrite + Unpin,
{
    let mut unsent = Vec::new();
    'write: while let Some(message) = inbox.recv().await {
        let output = match message.to_bytes() {
            Ok(output) => output,
            Err(error) => {
                warn!("Not sending {message:?}: {error}");
                continue 'write;
            }
        };
        if let Err(error) = stream.write_all(&output).await {
            debug!("Write failed: {error}");
            if let Message::Ticket(ticket) = message {
                unsent.push(ticket);
            }
            break 'write;
        }
        trace!(">>> {}", utils::u8s_to_hex_str(&output));
        if let Message::Error(_) = message {
            break 'write;
        }
    }

    inbox.close();
    while let Ok(message) = inbox.try_recv() {
        if let Message::Ticket(ticket) = message {
            unsent.push(ticket);
        }
    }
    if !unsent.is_empty() {
        warn!("Requeueing {} undelivered tickets", unsent.len());
        application.requeue(unsent).await;
    }
    _ = stream.shutdown().await;
}
