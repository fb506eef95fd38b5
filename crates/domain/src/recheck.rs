use crate::errors::ConfigError;

/// Recheck interval bounds in seconds, parsed from the `INT[smhdw]-INT[smhdw]`
/// grammar used by the hosts file. A bare integer means seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecheckRange {
    pub min_seconds: u64,
    pub max_seconds: u64,
}

impl RecheckRange {
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let (min, max) = spec
            .split_once('-')
            .ok_or_else(|| invalid(spec, "expected '<min>-<max>'"))?;

        Ok(Self {
            min_seconds: parse_time(min).map_err(|reason| invalid(spec, reason))?,
            max_seconds: parse_time(max).map_err(|reason| invalid(spec, reason))?,
        })
    }
}

fn invalid(spec: &str, reason: &str) -> ConfigError {
    ConfigError::Validation(format!("invalid recheck interval '{}': {}", spec, reason))
}

fn parse_time(time: &str) -> Result<u64, &'static str> {
    let (digits, multiplier) = match time.as_bytes().last() {
        Some(b's') => (&time[..time.len() - 1], 1),
        Some(b'm') => (&time[..time.len() - 1], 60),
        Some(b'h') => (&time[..time.len() - 1], 60 * 60),
        Some(b'd') => (&time[..time.len() - 1], 60 * 60 * 24),
        Some(b'w') => (&time[..time.len() - 1], 60 * 60 * 24 * 7),
        _ => (time, 1),
    };

    digits
        .parse::<u64>()
        .map(|n| n * multiplier)
        .map_err(|_| "expected an integer with an optional s/m/h/d/w unit")
}
