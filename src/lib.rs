//! aqtraffic - air-quality and traffic dashboard data layer
//!
//! - quality: index → band/color classification, continuous color scale
//! - filter: visible map locations under band switches, debounced
//! - ranking: fixed-interval leaderboard poller
//! - chart: hourly air/traffic series
//! - client: backend HTTP API
//! - config / logging: ambient setup

pub mod chart;
pub mod client;
pub mod config;
pub mod debounce;
pub mod filter;
pub mod logging;
pub mod model;
pub mod quality;
pub mod ranking;
