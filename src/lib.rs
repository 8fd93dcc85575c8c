//! **yabswitch** is a fuzzy window switcher and space organizer for yabai.
//!
//! The engine keeps a ranked, searchable inventory of open windows and
//! installed applications in front of the user, and computes multi-step
//! plans over live window-manager state: spreading a display's windows
//! across spaces, consolidating one application's windows into a single
//! space, and reclaiming empty spaces.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::Executor`] abstracts running one external command so the
//!   repository and dispatcher are not coupled to the concrete daemon
//!   binary.
//! * [`traits::CommandSource`] abstracts the transport that delivers
//!   user intent (a Unix socket, a test harness, ...) so the main loop is
//!   not coupled to any specific IPC mechanism.
//!
//! Around these, [`repo`] holds typed snapshots plus the persisted cache,
//! [`plan`] computes pure allocation plans, [`dispatch`] applies them step
//! by step, [`rank`] filters and orders search results, and [`switcher`]
//! orchestrates the whole thing from a single command loop.  The concrete
//! yabai backend lives in [`yabai`]; the socket listener in [`ipc`].

pub mod command;
pub mod config;
pub mod dispatch;
pub mod ipc;
pub mod model;
pub mod plan;
pub mod rank;
pub mod repo;
pub mod switcher;
pub mod traits;
pub mod yabai;
