//! mst-daemon library target: exposes the boot sequence, router, state, and
//! job bodies for the `main.rs` binary and for the `mst` CLI's `daemon run`
//! subcommand.

pub mod api_types;
pub mod boot;
pub mod jobs;
pub mod routes;
pub mod state;

pub use boot::run;
