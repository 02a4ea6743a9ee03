/// Content providers and the cached content catalog.
pub mod content;
/// Record sinks receiving finished sessions.
pub mod records;
/// Storage error types shared by providers and sinks.
pub mod storage;
