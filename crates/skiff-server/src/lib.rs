//! Development server with live reload for skiff.
//!
//! Watches the project for changes, feeds them to a single [`DevLoop`] that
//! owns the builder, and tells connected browsers to reload after every
//! successful pass.

pub mod dev;
pub mod server;
pub mod watcher;
pub mod websocket;

pub use dev::DevLoop;
pub use server::{preview, router, static_router, DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, QUIET_PERIOD};
pub use websocket::{reload_client_script, reload_script_node, ReloadHub, ReloadMessage};
