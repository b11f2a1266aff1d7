// sheetsort CLI support: sort-argument parsing, exit codes, log setup

pub mod exit_codes;
pub mod logging;
pub mod spec_arg;
