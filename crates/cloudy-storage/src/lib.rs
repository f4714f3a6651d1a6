pub mod driver;
pub mod factory;
pub mod local;
pub mod object;
pub mod signing;
pub mod storage;
pub mod url;

#[cfg(feature = "s3")]
pub mod s3;

#[cfg(feature = "gcs")]
pub mod gcs;

#[cfg(feature = "azure")]
pub mod azure;

pub use driver::{ByteReader, Capabilities, Container, Metadata, ObjectDescriptor, StorageDriver};
pub use factory::{DriverRegistry, create_driver};
pub use object::Object;
pub use storage::{Storage, UploadOptions, UploadSource};
pub use crate::url::{UrlOptions, UrlResolver};
