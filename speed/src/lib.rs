//! Speed Daemon: cameras report plate sightings, the server spots average-speed violations and
//! hands tickets to whichever dispatcher is responsible for the road.

pub mod app;
pub mod correlator;
pub mod dispatch;
pub mod error;
pub(crate) mod handles;
pub mod ledger;
pub mod models;
pub mod parser;
pub mod reader;
pub mod state;
pub mod types;
pub(crate) mod utils;

pub use app::{Application, Config};
pub use error::{Error, RoleViolation};
pub use models::io::Message;
