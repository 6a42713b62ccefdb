//! Connection-level options loaded from files or the environment

pub mod defaults;
mod settings;

pub use settings::Options;
