//! # devserve Live-Reload Channel
//!
//! File: cli/src/srv/reload.rs
//!
//! ## Overview
//!
//! Tracks the browsers currently listening on `/reload` and pushes a `reload`
//! event to all of them when the watcher reports a change.
//!
//! ## Architecture
//!
//! - [`ReloadChannel`] owns the client registry: a mutex-guarded map from
//!   [`ClientId`] to the sending half of a per-client channel. It is cloned
//!   into the router state; clones share one registry.
//! - [`ReloadChannel::register`] returns a [`ReloadSubscription`], a `Stream` of
//!   events that the router wraps in an SSE response. Dropping the
//!   subscription (the client went away and axum dropped the response body)
//!   removes its registry entry.
//! - [`ReloadChannel::close_all`] revokes every subscription from the server
//!   side; their streams end and the connections close cleanly.
//! - [`ReloadChannel::broadcast`] is best effort. A client that vanished
//!   between its disconnect and its removal is skipped with a debug log.
//!
//! The module also carries the small browser snippet injected into HTML pages
//! while watch mode is on.
//!
use futures_util::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// URL path of the event stream.
pub const RELOAD_PATH: &str = "/reload";

/// Script appended to HTML pages in watch mode. Reconnects after errors and
/// reloads the page on every `reload` event.
pub const CLIENT_SNIPPET: &str = r#"<script>
(() => {
  const connect = () => {
    const source = new EventSource("/reload");
    source.addEventListener("reload", () => location.reload());
    source.onerror = () => {
      source.close();
      setTimeout(connect, 1000);
    };
  };
  connect();
})();
</script>
"#;

/// Identifier of one registered connection. Never reused within a channel.
pub type ClientId = u64;

/// Events pushed to reload clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadEvent {
    Reload,
}

impl ReloadEvent {
    /// SSE event name.
    pub fn name(self) -> &'static str {
        match self {
            ReloadEvent::Reload => "reload",
        }
    }
}

type ClientMap = HashMap<ClientId, mpsc::UnboundedSender<ReloadEvent>>;

/// Registry of open reload connections plus the broadcast operation.
#[derive(Debug, Clone, Default)]
pub struct ReloadChannel {
    clients: Arc<Mutex<ClientMap>>,
    next_id: Arc<AtomicU64>,
}

fn lock(clients: &Mutex<ClientMap>) -> MutexGuard<'_, ClientMap> {
    // A panic while holding the lock cannot leave the map half-updated.
    clients.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ReloadChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Register Client (`register`)
    ///
    /// Adds a new client and returns its subscription. The entry lives exactly
    /// as long as the subscription does.
    pub fn register(&self) -> ReloadSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let total = {
            let mut clients = lock(&self.clients);
            clients.insert(id, tx);
            clients.len()
        };
        debug!("Reload client {} connected ({} open)", id, total);

        ReloadSubscription {
            id,
            rx,
            clients: Arc::downgrade(&self.clients),
        }
    }

    /// # Broadcast Reload (`broadcast`)
    ///
    /// Sends one reload event to every registered client and returns how many
    /// accepted it. Clients already closing are skipped.
    pub fn broadcast(&self) -> usize {
        let clients = lock(&self.clients);
        let mut delivered = 0;
        for (id, tx) in clients.iter() {
            match tx.send(ReloadEvent::Reload) {
                Ok(()) => delivered += 1,
                Err(_) => debug!("Reload client {} is closing, skipped", id),
            }
        }
        debug!(
            "Broadcast reload to {} of {} client(s)",
            delivered,
            clients.len()
        );
        delivered
    }

    /// Number of currently registered clients.
    #[cfg(test)]
    pub fn client_count(&self) -> usize {
        lock(&self.clients).len()
    }

    /// Ends every open subscription from the server side.
    pub fn close_all(&self) {
        let closed = {
            let mut clients = lock(&self.clients);
            let closed = clients.len();
            clients.clear();
            closed
        };
        if closed > 0 {
            debug!("Closed {} reload stream(s)", closed);
        }
    }
}

/// # Reload Subscription (`ReloadSubscription`)
///
/// One client's view of the channel. Yields events until the server revokes
/// it, and unregisters itself when dropped.
#[derive(Debug)]
pub struct ReloadSubscription {
    id: ClientId,
    rx: mpsc::UnboundedReceiver<ReloadEvent>,
    clients: Weak<Mutex<ClientMap>>,
}

#[cfg(test)]
impl ReloadSubscription {
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Waits for the next event; `None` once the server closed the stream.
    pub async fn recv(&mut self) -> Option<ReloadEvent> {
        self.rx.recv().await
    }
}

impl Stream for ReloadSubscription {
    type Item = ReloadEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for ReloadSubscription {
    fn drop(&mut self) {
        if let Some(clients) = self.clients.upgrade() {
            if lock(&clients).remove(&self.id).is_some() {
                debug!("Reload client {} disconnected", self.id);
            }
        }
    }
}

/// # Inject Client Snippet (`inject_client`)
///
/// Inserts [`CLIENT_SNIPPET`] before the last `</body>` (any case), or appends
/// it when the page has no body close tag. Other bytes are left untouched.
pub fn inject_client(mut html: Vec<u8>) -> Vec<u8> {
    const BODY_CLOSE: &[u8] = b"</body>";
    let position = html
        .windows(BODY_CLOSE.len())
        .rposition(|window| window.eq_ignore_ascii_case(BODY_CLOSE));

    match position {
        Some(index) => {
            html.splice(index..index, CLIENT_SNIPPET.bytes());
        }
        None => html.extend_from_slice(CLIENT_SNIPPET.as_bytes()),
    }
    html
}
