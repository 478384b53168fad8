pub mod brew;
pub mod brewfile;
pub mod commands;
pub mod metadata;
pub mod runtime;
