//! CLI command implementations.

mod config;
mod doctor;
mod generate;
mod init;
mod next;
mod resume;
mod runs;
mod status;

pub use config::run_config;
pub use doctor::run_doctor;
pub use generate::run_generate;
pub use init::run_init;
pub use next::run_next;
pub use resume::run_resume;
pub use runs::run_runs;
pub use status::run_status;
