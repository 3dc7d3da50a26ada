//! CLI command implementations.

mod config;
mod doctor;
mod export;
mod generate;
mod synthesize;

pub use config::run_config;
pub use doctor::run_doctor;
pub use export::run_export;
pub use generate::run_generate;
pub use synthesize::run_synthesize;
