pub mod cache_control;
pub mod operation;

pub use cache_control::CacheControl;
pub use operation::AdminOperations;
