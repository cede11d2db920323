//! Route tables

pub mod metrics;
pub mod questions;
pub mod tags;
