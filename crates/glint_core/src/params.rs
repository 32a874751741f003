use std::collections::BTreeMap;
use std::fmt;

/// A string key/value table of render parameters.
///
/// Option strings from the command line (`--render-options`, the payload
/// of `--integrator` and `--filter`) are parsed into one of these, and
/// the consumers look values up with typed getters. Getter keys may list
/// aliases separated by commas, tried in order, so long and short option
/// names resolve to the same parameter.
#[derive(Debug, Clone, Default)]
pub struct RenderParams {
    values: BTreeMap<String, String>,
}

impl RenderParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `K=V[,K2=V2...]` option string into this table.
    ///
    /// A bare `K` with no `=` is recorded as the boolean "true".
    pub fn parse(&mut self, opts: &str) -> Result<(), String> {
        for item in opts.split(',').filter(|s| !s.is_empty()) {
            match item.split_once('=') {
                Some((k, v)) if !k.is_empty() => self.set(k.trim(), v.trim()),
                Some(_) => return Err(format!("{item}: missing parameter name")),
                None => self.set(item.trim(), "true"),
            }
        }
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Look up the first of the comma-separated aliases in `keys`.
    pub fn get_str(&self, keys: &str) -> Option<&str> {
        keys.split(',')
            .find_map(|k| self.values.get(k).map(String::as_str))
    }

    pub fn get_float(&self, keys: &str, default: f32) -> f32 {
        self.get_str(keys)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_uint(&self, keys: &str, default: u32) -> u32 {
        self.get_str(keys)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, keys: &str, default: bool) -> bool {
        match self.get_str(keys) {
            Some("true") | Some("yes") | Some("1") | Some("on") => true,
            Some("false") | Some("no") | Some("0") | Some("off") => false,
            _ => default,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for RenderParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}
