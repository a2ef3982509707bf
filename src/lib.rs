pub mod api;
pub mod classify;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dataset;
pub mod latency;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod poll;
pub mod report;
pub mod runner;
pub mod submit;
pub mod util;
