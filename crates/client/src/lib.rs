//! Command-line front end for the prescription entry workflow.

pub mod app;
pub mod cli;
pub mod menu;
pub mod render;
