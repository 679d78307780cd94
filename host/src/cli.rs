// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use tv_input_core::HostConfig;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

fn parse_capacity(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("capacity must be at least 1".to_string()),
        Ok(capacity) => Ok(capacity),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the log level (RUST_LOG takes precedence when set)
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info, env = "TVI_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Capacity of each observer notification queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY, value_parser = parse_capacity, env = "TVI_OBSERVER_QUEUE_CAPACITY")]
    pub observer_queue: usize,

    /// Capacity of each session callback queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY, value_parser = parse_capacity, env = "TVI_CALLBACK_QUEUE_CAPACITY")]
    pub callback_queue: usize,

    /// Log every task executed by the host worker (also enabled by TVI_VERBOSE_DISPATCH)
    #[arg(long)]
    pub verbose_dispatch: bool,

    /// Report a loopback hardware device with this id after start-up
    #[arg(long, env = "TVI_DEMO_DEVICE")]
    pub demo_device: Option<u32>,
}

impl Cli {
    /// Worker configuration from the environment with command line flags on top.
    pub fn host_config(&self) -> HostConfig {
        self.apply_to(HostConfig::from_env())
    }

    fn apply_to(&self, mut config: HostConfig) -> HostConfig {
        config.verbose_dispatch |= self.verbose_dispatch;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["tv_input_host", "--observer-queue", "4", "--verbose-dispatch", "-l", "debug"]);
        assert_eq!(cli.observer_queue, 4);
        assert_eq!(cli.callback_queue, DEFAULT_QUEUE_CAPACITY);
        assert!(cli.apply_to(HostConfig::default()).verbose_dispatch);
        assert_eq!(cli.log_level.to_level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn verbose_from_environment_is_kept_without_flag() {
        let cli = Cli::parse_from(["tv_input_host", "--demo-device", "3"]);
        assert!(cli.apply_to(HostConfig { verbose_dispatch: true }).verbose_dispatch);
        assert!(!cli.apply_to(HostConfig::default()).verbose_dispatch);
        assert_eq!(cli.demo_device, Some(3));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(Cli::try_parse_from(["tv_input_host", "--callback-queue", "0"]).is_err());
        assert!(Cli::try_parse_from(["tv_input_host", "--observer-queue", "many"]).is_err());
    }
}
