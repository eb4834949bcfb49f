//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use skiff_markup::{attributes, Element, Node};
use tokio::sync::broadcast;

/// Path of the live reload WebSocket.
pub const RELOAD_SOCKET_PATH: &str = "/__skiff/ws";

/// Path of the live reload client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__skiff/reload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// A build pass succeeded; reload the page
    Reload,

    /// A build pass failed; the previous output is still served
    BuildFailed {
        /// Error description
        message: String,
    },
}

/// Hub for broadcasting reload messages to all connected browsers.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Send a message to all connected browsers.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Number of connected browsers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// The `<script>` element loading the client script, for injection into
/// every page head.
pub fn reload_script_node() -> Node {
    Element::new(
        "script",
        attributes([("src", RELOAD_SCRIPT_PATH)]),
        vec![],
    )
    .map(Node::from)
    .expect("Invalid reload script element")
}

/// Generate the client-side live reload script.
pub fn reload_client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const url = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '{}';
  let attempts = 0;

  function connect() {{
    const ws = new WebSocket(url);

    ws.onopen = function() {{
      if (attempts > 0) {{
        location.reload();
      }}
      attempts = 0;
    }};

    ws.onmessage = function(event) {{
      const msg = JSON.parse(event.data);

      switch (msg.type) {{
        case 'reload':
          location.reload();
          break;

        case 'build_failed':
          console.error('[skiff] Build failed:\n' + msg.message);
          break;
      }}
    }};

    ws.onclose = function() {{
      if (attempts < 10) {{
        attempts++;
        setTimeout(connect, 500 * attempts);
      }}
    }};
  }}

  connect();
}})();
"#,
        RELOAD_SOCKET_PATH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        match rx.try_recv() {
            Ok(ReloadMessage::Reload) => {}
            other => panic!("Expected Reload message, got {:?}", other),
        }
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn sending_without_subscribers_is_fine() {
        ReloadHub::new().send(ReloadMessage::Reload);
    }

    #[test]
    fn serializes_messages() {
        let json = serde_json::to_string(&ReloadMessage::BuildFailed {
            message: "boom".to_string(),
        })
        .unwrap();

        assert_eq!(json, r#"{"type":"build_failed","message":"boom"}"#);
    }

    #[test]
    fn script_targets_the_socket() {
        assert!(reload_client_script().contains(RELOAD_SOCKET_PATH));
        assert_eq!(
            reload_script_node().to_string(),
            "<script src=\"/__skiff/reload.js\"></script>"
        );
    }
}
