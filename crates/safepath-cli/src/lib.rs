//! SafePath CLI - host-side harness for the planning core.
//!
//! This crate provides:
//! - plan_route: plan a built-in scenario and print the route
//! - walk_route: simulated walker following live guidance ticks

pub mod config;
pub mod guidance;
pub mod sim;

pub use config::CliConfig;
pub use guidance::{guidance_tick, plan_on_worker, GuidanceEvent};
