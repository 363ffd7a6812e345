//! Client execution logic with reconnection support.

use std::time::Duration;

use keyroom_shared::{protocol::RoomSettings, time::SystemClock};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;

use crate::{
    batcher::BatcherConfig,
    clock::ClockSyncConfig,
    command::Command,
    connection::{SessionEnd, run_connection},
    error::ClientError,
    session::{ClientSession, SessionEvent},
    ui::{print_events, spawn_prompt},
};

/// Fixed-interval reconnection policy; there is no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    /// Whether to try again after `failed_attempts` consecutive failures.
    pub fn should_attempt_reconnect(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub room_id: String,
    pub room_settings: Option<RoomSettings>,
    pub name: Option<String>,
    pub reconnect: ReconnectPolicy,
}

/// Run the interactive client until the user quits or reconnection gives up.
///
/// # Errors
///
/// Returns [`ClientError::ConnectionError`] once `max_attempts` consecutive
/// connection attempts have failed.
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let clock = SystemClock;
    let mut session = ClientSession::new(
        options.name.clone(),
        ClockSyncConfig::default(),
        BatcherConfig::default(),
    );
    session.request_join(options.room_id.clone(), options.room_settings.clone());

    let (command_tx, mut commands) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let _prompt = spawn_prompt(command_tx);
    let printer = tokio::spawn(print_events(event_rx));

    let result = reconnect_loop(&options, &mut session, &clock, &mut commands, &event_tx).await;

    drop(event_tx);
    if let Err(e) = printer.await {
        tracing::debug!("Printer task failed: {}", e);
    }
    result
}

async fn reconnect_loop(
    options: &ClientOptions,
    session: &mut ClientSession,
    clock: &SystemClock,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> Result<(), ClientError> {
    let policy = options.reconnect;

    loop {
        session.begin_connect();
        tracing::info!(
            "Attempting to connect to {} (attempt {}/{})",
            options.url,
            session.connect_attempts() + 1,
            policy.max_attempts
        );

        match connect_async(&options.url).await {
            Ok((ws_stream, _)) => {
                tracing::info!("Connected to {}", options.url);
                match run_connection(session, ws_stream, clock, commands, events).await {
                    Ok(SessionEnd::Quit) => {
                        tracing::info!("Client session ended normally");
                        return Ok(());
                    }
                    Ok(SessionEnd::Closed) => tracing::warn!("Connection closed by server"),
                    Err(e) => tracing::warn!("Connection lost: {}", e),
                }
            }
            Err(e) => {
                tracing::warn!("{}", ClientError::ConnectionError(e.to_string()));
                session.on_transport_closed();
                for event in session.take_events() {
                    let _ = events.send(event);
                }
            }
        }

        if !policy.should_attempt_reconnect(session.connect_attempts()) {
            tracing::error!(
                "Failed to reconnect after {} attempts. Exiting.",
                policy.max_attempts
            );
            return Err(ClientError::ConnectionError(format!(
                "gave up after {} attempts",
                policy.max_attempts
            )));
        }

        tracing::info!(
            "Reconnecting in {} seconds... (attempt {}/{})",
            policy.interval.as_secs(),
            session.connect_attempts() + 1,
            policy.max_attempts
        );
        if wait_offline(policy.interval, session, commands, events).await == SessionEnd::Quit {
            return Ok(());
        }
    }
}

/// Wait out the reconnect interval while still accepting commands.
///
/// Commands that need a connection are refused; `/join` updates the room
/// joined on the next connection.
async fn wait_offline(
    delay: Duration,
    session: &mut ClientSession,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> SessionEnd {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return SessionEnd::Closed,
            command = commands.recv() => match command {
                Some(Command::Quit) | None => return SessionEnd::Quit,
                Some(command) => {
                    if let Err(violation) = session.execute(command, 0) {
                        let _ = events.send(SessionEvent::Rejected(violation));
                    }
                    for event in session.take_events() {
                        let _ = events.send(event);
                    }
                }
            },
        }
    }
}
