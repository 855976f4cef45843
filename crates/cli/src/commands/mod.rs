// CLI subcommands

pub mod abilities;
pub mod run;
pub mod validate;
