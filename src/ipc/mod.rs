//! IPC listener that accepts commands over a Unix socket.
//!
//! Front ends (pickers, key-bind helpers, scripts) connect to the socket
//! and send newline-delimited JSON commands.

pub mod listener;
