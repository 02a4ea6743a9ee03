//! Library crate for party-quiz-engine: game sessions for short party and quiz games.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod games;
pub mod services;
pub mod state;

pub use error::{EngineError, NotReadyReason};
pub use games::GameKind;
pub use state::{Session, SessionStatus};
