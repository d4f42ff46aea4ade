//! Config utils.

use std::collections::HashMap;

/// Parses config value string, which consists of two parts - name and options.
///
/// For example, `RandomProbe[seed=42]` is split into name `RandomProbe` and options string `seed=42`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.trim().split_once('[') {
        Some((l, r)) => (l.trim().to_string(), Some(r.trim_end_matches(']').to_string())),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_value() {
        assert_eq!(parse_config_value("FirstFit"), ("FirstFit".to_string(), None));
        let (name, options) = parse_config_value("RandomProbe[seed=42, probes=3]");
        assert_eq!(name, "RandomProbe");
        let options = parse_options(&options.unwrap());
        assert_eq!(options.get("seed").unwrap(), "42");
        assert_eq!(options.get("probes").unwrap(), "3");
        assert_eq!(options.get("other"), None);
    }
}
