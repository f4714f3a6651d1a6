pub mod config;
pub mod error;
pub mod extensions;
pub mod naming;
pub mod types;

pub use error::{CloudyError, Result};
pub use extensions::ExtensionCategory;
pub use types::{Credentials, ProviderType};
