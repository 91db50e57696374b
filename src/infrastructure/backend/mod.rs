//! Physical backend adapters implementing `domain::ports::ObjectStore`.

pub mod local;
#[cfg(feature = "s3-backend")]
pub mod s3;

pub use local::LocalObjectStore;
#[cfg(feature = "s3-backend")]
pub use s3::S3LikeObjectStore;
