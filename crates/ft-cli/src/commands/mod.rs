//! CLI subcommand implementations.

pub mod recover;
pub mod report;
pub mod status;
pub mod track;
pub mod util;
