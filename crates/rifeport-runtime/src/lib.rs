pub mod pool;
pub mod request;
pub mod scheduler;
pub mod worker;
pub mod worker_engine;

pub use pool::*;
pub use request::*;
pub use scheduler::*;
pub use worker::*;
pub use worker_engine::*;
