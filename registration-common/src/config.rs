use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    /// Base URL of the registration REST API.
    #[envconfig(from = "API_BASE_URL", default = "http://localhost:8080/api")]
    pub api_base_url: String,

    /// Quiet window between a keystroke and the suggestion lookup it issues.
    #[envconfig(default = "300")]
    pub suggestion_debounce: EnvMsDuration,

    #[envconfig(default = "5000")]
    pub request_timeout: EnvMsDuration,
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_millisecond_durations() {
        let duration = "300".parse::<EnvMsDuration>().expect("parses");
        assert_eq!(duration.0, time::Duration::from_millis(300));

        assert!(matches!(
            "not-a-number".parse::<EnvMsDuration>(),
            Err(ParseEnvMsDurationError)
        ));
    }
}
