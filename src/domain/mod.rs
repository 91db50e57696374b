//! Domain layer: error taxonomy, URI addressing, core types, and the port
//! traits implemented by `crate::providers`/`crate::infrastructure`.

pub mod error;
pub mod ports;
pub mod types;
pub mod uri;

pub use error::{Error, ErrorCode, Result};
pub use uri::{Scope, VikingUri};
