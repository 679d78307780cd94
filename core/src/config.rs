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

use log::warn;

pub const VERBOSE_DISPATCH_ENV: &str = "TVI_VERBOSE_DISPATCH";

/// Tunables of the host worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostConfig {
    /// Log every executed task at debug level.
    pub verbose_dispatch: bool,
}

impl HostConfig {
    /// Defaults overridden by `TVI_*` environment variables. Unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(verbose) = parse_var(&lookup, VERBOSE_DISPATCH_ENV, parse_flag) {
            config.verbose_dispatch = verbose;
        }
        config
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    let raw = lookup(key)?;
    if raw.trim().is_empty() {
        return None;
    }
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!("Ignoring invalid value {:?} of {}", raw, key);
    }
    parsed
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> HostConfig {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        HostConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config_from(&[]), HostConfig::default());
    }

    #[test]
    fn verbose_flag_accepts_common_spellings() {
        for raw in ["1", "true", " YES ", "on"] {
            assert!(config_from(&[(VERBOSE_DISPATCH_ENV, raw)]).verbose_dispatch, "{raw}");
        }
        for raw in ["0", "false", "no", "Off"] {
            assert!(!config_from(&[(VERBOSE_DISPATCH_ENV, raw)]).verbose_dispatch, "{raw}");
        }
    }

    #[test]
    fn invalid_values_are_ignored() {
        assert_eq!(config_from(&[(VERBOSE_DISPATCH_ENV, "")]), HostConfig::default());
        assert_eq!(config_from(&[(VERBOSE_DISPATCH_ENV, "loud")]), HostConfig::default());
    }
}
