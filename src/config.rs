//! # Global runtime configuration.
//!
//! Provides [`Config`], the centralized settings for the super-server.
//!
//! Config is used in two places:
//! 1. **Loading**: `parser::load_services(&cfg.config_path, cfg.max_services_clamped())`
//! 2. **Supervisor creation**: `Supervisor::new(config, subscribers)`
//!
//! ## Field semantics
//! - `config_path`: service table file, one service per line
//! - `max_services`: hard cap on honored services; extra lines are ignored
//! - `backlog`: fixed listen backlog for stream services
//! - `bus_capacity`: event bus ring buffer size (min 1; clamped)
//! - `reap_capacity`: reap channel depth (min 1; clamped)

use std::path::PathBuf;

/// Global configuration for the super-server runtime.
///
/// All fields are public for flexibility. Prefer the helper accessors to
/// avoid sprinkling clamp logic across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path of the service table read once at startup.
    pub config_path: PathBuf,

    /// Maximum number of services honored from the table.
    ///
    /// Lines beyond the cap are ignored without a report.
    pub max_services: usize,

    /// Listen backlog applied to every stream service.
    pub backlog: i32,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Depth of the reap channel between worker watchers and the loop.
    pub reap_capacity: usize,
}

impl Config {
    /// Returns the service cap clamped to a minimum of 1.
    #[inline]
    pub fn max_services_clamped(&self) -> usize {
        self.max_services.max(1)
    }

    /// Returns the listen backlog clamped to a minimum of 1.
    #[inline]
    pub fn backlog_clamped(&self) -> i32 {
        self.backlog.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the reap channel depth clamped to a minimum of 1.
    #[inline]
    pub fn reap_capacity_clamped(&self) -> usize {
        self.reap_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `config_path = "initd.conf.txt"`
    /// - `max_services = 10`
    /// - `backlog = 10`
    /// - `bus_capacity = 1024`
    /// - `reap_capacity = 64`
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("initd.conf.txt"),
            max_services: 10,
            backlog: 10,
            bus_capacity: 1024,
            reap_capacity: 64,
        }
    }
}
