use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum SynthError {
    /// Bad fundamental, harmonic count, envelope ordering or config value.
    InvalidArgument(String),
    /// Operation on a session or node in the wrong lifecycle state.
    InvalidState(String),
    Config(ConfigError),
    Io(io::Error),
    Wav(hound::Error),
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: io::Error },
    Parse(serde_json::Error),
}

impl SynthError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        SynthError::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        SynthError::InvalidState(msg.into())
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, SynthError::InvalidArgument(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, SynthError::InvalidState(_))
    }
}

impl fmt::Display for SynthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            SynthError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            SynthError::Config(e) => write!(f, "Config error: {e}"),
            SynthError::Io(e) => write!(f, "I/O error: {e}"),
            SynthError::Wav(e) => write!(f, "WAV error: {e}"),
        }
    }
}

impl std::error::Error for SynthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SynthError::Config(e) => Some(e),
            SynthError::Io(e) => Some(e),
            SynthError::Wav(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "cannot read '{}': {source}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "malformed config JSON: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SynthError {
    fn from(e: ConfigError) -> Self {
        SynthError::Config(e)
    }
}

impl From<io::Error> for SynthError {
    fn from(e: io::Error) -> Self {
        SynthError::Io(e)
    }
}

impl From<hound::Error> for SynthError {
    fn from(e: hound::Error) -> Self {
        SynthError::Wav(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_category() {
        let e = SynthError::invalid_argument("fundamental must be positive, got 0");
        assert_eq!(
            e.to_string(),
            "Invalid argument: fundamental must be positive, got 0"
        );
        assert!(e.is_invalid_argument());
        assert!(!e.is_invalid_state());
    }

    #[test]
    fn config_parse_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: SynthError = ConfigError::from(parse).into();
        assert!(e.to_string().starts_with("Config error: malformed config JSON"));
        assert!(std::error::Error::source(&e).is_some());
    }
}
