//! CLI commands.
//!
//!   run: fork a child, run PROGRAM inside it with captured stdio, report the outcome

pub mod run;
