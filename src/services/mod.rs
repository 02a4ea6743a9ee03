/// Async task owning a session and feeding it commands and ticks.
pub mod driver;
/// Point computations.
pub mod scoring;
/// Randomized selection and shuffling.
pub mod selector;
