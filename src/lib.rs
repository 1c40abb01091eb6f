//! Organizational chart client.
//! Reads members and chart data from the chart service, lets a position be
//! edited and committed back, and exports the rendered chart as page images.

pub mod app;
pub mod config;
pub mod edit;
pub mod error;
pub mod export;
pub mod font;
pub mod logging;
pub mod model;
pub mod photo;
pub mod positions;
pub mod render;
pub mod status;
pub mod store;

pub use app::{App, AppState};
pub use config::Config;
pub use error::{CommitError, StoreError, ValidationError};
pub use store::{HttpStore, RemoteStore, WriteOutcome};
