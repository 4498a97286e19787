// pool.rs: Connection lifecycle for the event loop, the notification
// subscription and the idle watchdog

use crate::artwork::{ArtworkPublisher, ImageHost, ThumbnailCache};
use crate::event::Synchronizer;
use crate::plex::{MediaServer, PlaybackEvent, PlexClient, PlexError};
use crate::presence::PresenceBroadcaster;
use crate::state::{SharedState, ShutdownSignal, ShutdownTrigger, shutdown_channel};
use crate::watchdog::IdleWatchdog;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const EVENT_QUEUE: usize = 8;

const CONNECT_FAILED: &str = "Failed to connect to specified server. The plex API only supports getting session data for servers you own.";

/// The tasks belonging to one server connection.
pub struct Listener {
    trigger: ShutdownTrigger,
    signal: ShutdownSignal,
    tasks: Vec<JoinHandle<()>>,
}

impl Listener {
    /// Spawns the event loop and the watchdog under a fresh shutdown signal.
    pub fn spawn(
        sync: Synchronizer,
        watchdog: IdleWatchdog,
        events: mpsc::Receiver<PlaybackEvent>,
    ) -> Self {
        let (trigger, signal) = shutdown_channel();
        let tasks = vec![
            tokio::spawn(run_events(sync, events, signal.clone())),
            tokio::spawn(watchdog.run(signal.clone())),
        ];
        Self {
            trigger,
            signal,
            tasks,
        }
    }

    /// Feeds `events` from the server's notification websocket. A full
    /// queue pauses the socket read rather than dropping events.
    pub fn spawn_subscription(&mut self, url: String, events: mpsc::Sender<PlaybackEvent>) {
        let signal = self.signal.clone();
        self.tasks.push(tokio::spawn(crate::plex::events::subscribe(
            url,
            events,
            |e| tracing::warn!(error = %e, "Notification subscription error"),
            signal,
        )));
    }

    /// Requests shutdown and waits for every task to finish. An event
    /// already being processed completes; queued events are dropped.
    pub async fn stop(self) {
        self.trigger.trigger();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Listener task ended abnormally");
            }
        }
    }
}

/// Processes events one at a time, each to completion before the next.
async fn run_events(
    sync: Synchronizer,
    mut events: mpsc::Receiver<PlaybackEvent>,
    mut shutdown: ShutdownSignal,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            maybe_event = events.recv() => match maybe_event {
                Some(event) => {
                    sync.process_event(&event).await;
                }
                None => break,
            },
        }
    }
}

/// Long-lived bridge between one account and the presence service. Owns at
/// most one live connection at a time.
pub struct Bridge {
    token: String,
    poll_interval: Duration,
    cache: ThumbnailCache,
    host: Arc<dyn ImageHost>,
    broadcaster: Arc<dyn PresenceBroadcaster>,
    state: SharedState,
    listener: Option<Listener>,
}

impl Bridge {
    pub fn new(
        username: &str,
        token: &str,
        poll_interval: Duration,
        cache: ThumbnailCache,
        host: Arc<dyn ImageHost>,
        broadcaster: Arc<dyn PresenceBroadcaster>,
    ) -> Self {
        Self {
            token: token.to_string(),
            poll_interval,
            cache,
            host,
            broadcaster,
            state: SharedState::new(username),
            listener: None,
        }
    }

    /// Connects to the first reachable address of the chosen server and
    /// starts listening. Any previous connection is fully stopped first so
    /// two watchdogs never race on the broadcaster.
    pub async fn start_listening(&mut self, server_urls: &[String]) -> Result<(), PlexError> {
        self.stop().await;

        let client = match PlexClient::connect(server_urls, &self.token).await {
            Ok(client) => client,
            Err(e) => {
                self.state.set_status(CONNECT_FAILED).await;
                return Err(e);
            }
        };
        let url = client.notification_url();
        let server_url = client.base_url().to_string();
        let server: Arc<dyn MediaServer> = Arc::new(client);

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let mut listener = self.spawn_listener(server, events_rx);
        listener.spawn_subscription(url, events_tx);
        self.listener = Some(listener);

        let username = self.state.username().await;
        self.state
            .set_status(format!("Listening for events from {server_url} for {username}"))
            .await;
        Ok(())
    }

    fn spawn_listener(
        &self,
        server: Arc<dyn MediaServer>,
        events: mpsc::Receiver<PlaybackEvent>,
    ) -> Listener {
        let artwork = ArtworkPublisher::new(server.clone(), self.host.clone(), self.cache.clone());
        let sync = Synchronizer::new(
            server.clone(),
            artwork,
            self.broadcaster.clone(),
            self.state.clone(),
        );
        let watchdog = IdleWatchdog::new(
            server,
            self.broadcaster.clone(),
            self.state.clone(),
            self.poll_interval,
        );
        Listener::spawn(sync, watchdog, events)
    }

    pub async fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.stop().await;
            tracing::info!("Stopped listening");
        }
    }

    /// Human-readable state for display.
    pub async fn status(&self) -> String {
        self.state.status().await
    }
}
