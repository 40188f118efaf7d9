//! Entry points behind the two binaries.

pub mod install;
pub mod run;
