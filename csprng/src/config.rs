//! A flat, prefix-scoped configuration list with `{name}` interpolation
//! against environment variables (§6 "External interfaces / Configuration").

/// A list of `key = value` configuration entries. Recognised key prefixes:
/// `collector.<classname>` (enable a named collector), `config.<classname>.*`
/// (per-collector options), `config.prng.seeds.SeedStorage.*` (storage
/// flush periods and backend choice), `network.source.<classname>`
/// (weighted network-collector enabling). This workspace ships no network
/// collectors, so that prefix is accepted and ignored rather than
/// rejected, matching the spec's "recognised prefixes" framing for an
/// open-ended plugin surface.
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: Vec<(String, String)>,
}

impl Config {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `key = value` entry.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// The interpolated value for `key`, if present. `{name}` placeholders
    /// in the raw value are replaced with the environment variable `name`,
    /// or left verbatim if unset.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| interpolate(v))
    }

    /// All entries whose key starts with `prefix`, with the prefix
    /// stripped from the returned key and the value interpolated.
    pub fn subsection(&self, prefix: &str) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix).map(|rest| (rest.to_string(), interpolate(v)))
            })
            .collect()
    }

    /// Whether `collector.<name>` is present and not explicitly `false`.
    pub fn collector_enabled(&self, name: &str) -> bool {
        match self.get(&format!("collector.{name}")) {
            Some(value) => value != "false",
            None => false,
        }
    }
}

fn interpolate(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 1..start + end];
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &rest[start + end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_literal_value_with_no_placeholders() {
        let config = Config::new().set("prng.logging", "false");
        assert_eq!(config.get("prng.logging"), Some("false".to_string()));
    }

    #[test]
    fn interpolates_known_environment_variable() {
        std::env::set_var("CSPRNG_TEST_INTERPOLATION_VAR", "bob");
        let config = Config::new().set("user.name", "{CSPRNG_TEST_INTERPOLATION_VAR}");
        assert_eq!(config.get("user.name"), Some("bob".to_string()));
        std::env::remove_var("CSPRNG_TEST_INTERPOLATION_VAR");
    }

    #[test]
    fn leaves_unset_placeholder_verbatim() {
        let config = Config::new().set("k", "{CSPRNG_TEST_UNSET_VAR_XYZ}");
        assert_eq!(config.get("k"), Some("{CSPRNG_TEST_UNSET_VAR_XYZ}".to_string()));
    }

    #[test]
    fn subsection_strips_prefix() {
        let config = Config::new()
            .set("config.prng.seeds.SeedStorage.period", "5")
            .set("collector.Jitter", "true");
        let storage_config = config.subsection("config.prng.seeds.SeedStorage.");
        assert_eq!(storage_config, vec![("period".to_string(), "5".to_string())]);
    }

    #[test]
    fn collector_enabled_reflects_presence_and_value() {
        let config = Config::new().set("collector.Jitter", "true").set("collector.Memory", "false");
        assert!(config.collector_enabled("Jitter"));
        assert!(!config.collector_enabled("Memory"));
        assert!(!config.collector_enabled("Unregistered"));
    }
}
