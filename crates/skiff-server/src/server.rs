//! Development server implementation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use skiff_static::{Builder, ChangeSet};
use tower_http::services::ServeDir;

use crate::dev::DevLoop;
use crate::watcher::FileWatcher;
use crate::websocket::{
    reload_client_script, reload_script_node, ReloadHub, ReloadMessage, RELOAD_SCRIPT_PATH,
    RELOAD_SOCKET_PATH,
};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory watched for changes
    pub root: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Directory not found: {0}. Run 'skiff build' first.")]
    MissingOutput(PathBuf),
}

impl DevServerConfig {
    fn addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ServerError::InvalidAddress(addr))
    }
}

/// Development server: builds the site, rebuilds on change and serves the
/// output with live reload.
pub struct DevServer {
    config: DevServerConfig,
    builder: Builder,
}

impl DevServer {
    pub fn new(config: DevServerConfig, mut builder: Builder) -> Self {
        builder.inject_head([reload_script_node()]);
        Self { config, builder }
    }

    /// Start the development server.
    ///
    /// The watcher is running before the initial pass, so edits saved while
    /// it runs are handled right after it. A failing initial pass is logged
    /// and the server keeps waiting for changes.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = self.config.addr()?;
        let output = self.builder.config().output_dir.clone();
        let (watcher, rx) = FileWatcher::for_site(&self.config.root, self.builder.config())?;

        let hub = ReloadHub::new();
        let mut dev = DevLoop::new(self.builder, hub.clone());
        if dev.pass(&ChangeSet::initial()).await.is_none() {
            tracing::warn!("Initial build failed, waiting for changes");
        }

        tokio::spawn(async move {
            dev.run(rx).await;
        });

        tracing::info!("Starting dev server at http://{}", addr);
        listen(&self.config, router(&output, hub)).await?;

        // Keep the watcher alive for as long as the server runs
        drop(watcher);
        Ok(())
    }
}

/// Serve an already built site, without rebuilding or live reload.
pub async fn preview(dir: &Path, config: &DevServerConfig) -> Result<(), ServerError> {
    if !dir.is_dir() {
        return Err(ServerError::MissingOutput(dir.to_path_buf()));
    }

    tracing::info!(
        "Serving {} at http://{}",
        dir.display(),
        config.addr()?
    );
    listen(config, static_router(dir)).await
}

/// Bind the configured address, open the browser if asked and serve `app`.
async fn listen(config: &DevServerConfig, app: Router) -> Result<(), ServerError> {
    let addr = config.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

    if config.open {
        let url = format!("http://{}", addr);
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::BindError(addr, e.to_string()))
}

/// Routes serving the files of `output`.
pub fn static_router(output: &Path) -> Router {
    Router::new().fallback_service(ServeDir::new(output))
}

/// Routes serving `output` plus the live reload endpoints.
pub fn router(output: &Path, hub: ReloadHub) -> Router {
    Router::new()
        .route(RELOAD_SOCKET_PATH, get(ws_handler))
        .route(RELOAD_SCRIPT_PATH, get(script_handler))
        .with_state(hub)
        .merge(static_router(output))
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    if send(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    while let Ok(msg) = rx.recv().await {
        if send(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).unwrap_or_default();
    socket.send(Message::Text(json.into())).await
}

async fn script_handler() -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        reload_client_script(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn fetch(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    async fn spawn(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn default_config() {
        let config = DevServerConfig::default();

        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn serves_output_and_client_script() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("about")).unwrap();
        fs::write(temp.path().join("about/index.html"), "<h1>About</h1>").unwrap();

        let addr = spawn(router(temp.path(), ReloadHub::new())).await;

        let page = fetch(addr, "/about/").await;
        assert!(page.starts_with("HTTP/1.1 200"));
        assert!(page.contains("<h1>About</h1>"));

        let script = fetch(addr, RELOAD_SCRIPT_PATH).await;
        assert!(script.contains("application/javascript"));
        assert!(script.contains(RELOAD_SOCKET_PATH));

        let missing = fetch(addr, "/nope/").await;
        assert!(missing.starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn static_router_has_no_reload_endpoints() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("index.html"), "<h1>Home</h1>").unwrap();

        let addr = spawn(static_router(temp.path())).await;

        assert!(fetch(addr, "/").await.contains("<h1>Home</h1>"));
        assert!(fetch(addr, RELOAD_SCRIPT_PATH)
            .await
            .starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn preview_requires_a_built_site() {
        let temp = tempdir().unwrap();
        let config = DevServerConfig {
            open: false,
            ..Default::default()
        };

        let err = preview(&temp.path().join("out"), &config).await.unwrap_err();

        assert!(matches!(err, ServerError::MissingOutput(_)));
        assert!(err.to_string().contains("skiff build"));
    }

    #[test]
    fn rejects_invalid_hosts() {
        let config = DevServerConfig {
            host: "not a host".to_string(),
            ..Default::default()
        };

        assert!(matches!(config.addr(), Err(ServerError::InvalidAddress(_))));
    }
}
