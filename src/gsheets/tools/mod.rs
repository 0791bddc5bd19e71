pub mod batch;
pub mod browse;
pub mod config;
pub mod connector;
pub mod credentials;
pub mod dataset;
pub mod dates;
pub mod error;
pub mod importer;
pub mod io;
pub mod logging;
pub mod model;
pub mod recipe;
pub mod sheets;
pub mod slug;
pub mod sync;

pub use error::{Result, ToolError};
