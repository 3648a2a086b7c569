// Frameworks: process bootstrap, configuration and system adapters.

pub mod clock;
pub mod config;
pub mod runtime;
