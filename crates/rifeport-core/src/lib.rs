pub mod augment;
pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
#[cfg(feature = "image")]
pub mod marshal;
pub mod model;
pub mod sequence;
pub mod tiling;

pub use backend::*;
pub use cache::CacheStatus;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use frame::*;
pub use model::*;
pub use sequence::*;
