//! Job service that turns a steel/slag treatment request into an Equilib run
//! and reports the additive mass the solver settles on.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
