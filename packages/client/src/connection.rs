//! WebSocket connection driver.
//!
//! One task per connection multiplexes the socket, the prompt commands and
//! the session timers with `tokio::select!`. The timers are locals of
//! [`run_connection`], so returning from it cancels every one of them.

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use keyroom_shared::{protocol::encode_frame, time::Clock};
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior, interval, interval_at},
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};

use crate::{
    command::Command,
    error::ClientError,
    session::{ClientSession, SessionEvent},
};

/// Why a connection ended without a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user asked to quit.
    Quit,
    /// The server closed the connection.
    Closed,
}

/// Drive `session` over an open WebSocket until it closes.
///
/// The session is always left in the disconnected state on return, and
/// every event it raised has been forwarded to `events`.
///
/// # Errors
///
/// Returns a [`ClientError`] when the transport fails or an outbound frame
/// cannot be encoded.
pub async fn run_connection<S>(
    session: &mut ClientSession,
    stream: S,
    clock: &dyn Clock,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> Result<SessionEnd, ClientError>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Unpin,
{
    session.on_transport_open(clock.now_millis());
    let result = drive(session, stream, clock, commands, events).await;
    session.on_transport_closed();
    forward_events(session, events);
    result
}

async fn drive<S>(
    session: &mut ClientSession,
    stream: S,
    clock: &dyn Clock,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> Result<SessionEnd, ClientError>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Unpin,
{
    let (mut sender, mut receiver) = stream.split();

    let sync_config = *session.clock().config();
    let flush_interval = session.batcher().config().flush_interval;

    let mut sync_timer = interval_at(
        Instant::now() + sync_config.sync_interval,
        sync_config.sync_interval,
    );
    let mut flush_timer = interval(flush_interval);
    flush_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut smoothing_timer = interval(sync_config.step_interval());
    smoothing_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        send_outbox(session, &mut sender).await?;
        forward_events(session, events);

        let was_smoothing = session.clock().is_smoothing();

        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Err(e) = session.on_frame(text.as_str(), clock.now_millis()) {
                        tracing::warn!("Dropping malformed frame: {}", e);
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    tracing::info!("Server closed the connection");
                    return Ok(SessionEnd::Closed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            command = commands.recv() => match command {
                Some(Command::Quit) | None => {
                    // Notes of the open flush window still go out before closing.
                    session.flush_input();
                    send_outbox(session, &mut sender).await?;
                    if let Err(e) = sender.close().await {
                        tracing::debug!("Close handshake failed: {}", e);
                    }
                    return Ok(SessionEnd::Quit);
                }
                Some(command) => {
                    if let Err(violation) = session.execute(command, clock.now_millis()) {
                        tracing::debug!("Command refused: {}", violation);
                        let _ = events.send(SessionEvent::Rejected(violation));
                    }
                }
            },
            _ = sync_timer.tick() => session.sync_tick(clock.now_millis()),
            _ = flush_timer.tick() => session.flush_input(),
            _ = smoothing_timer.tick(), if was_smoothing => {
                session.smoothing_tick();
            }
        }

        // A new smoothing run steps from now, not from a stale tick.
        if !was_smoothing && session.clock().is_smoothing() {
            smoothing_timer.reset();
        }
    }
}

async fn send_outbox<W>(session: &mut ClientSession, sender: &mut W) -> Result<(), ClientError>
where
    W: Sink<WsMessage, Error = WsError> + Unpin,
{
    let outbox = session.take_outbox();
    if !outbox.is_empty() {
        let frame = encode_frame(&outbox)?;
        sender.send(WsMessage::Text(frame.into())).await?;
    }
    Ok(())
}

fn forward_events(session: &mut ClientSession, events: &mpsc::UnboundedSender<SessionEvent>) {
    for event in session.take_events() {
        if events.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
            break;
        }
    }
}
