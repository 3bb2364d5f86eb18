pub mod error;
pub mod logging;
pub mod metrics;
pub mod prelude;
pub mod process;
pub mod settings;
pub mod suite;
pub mod tracegen;

pub use error::{Error, Result};
