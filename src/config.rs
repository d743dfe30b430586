use crate::decoder::DecodeMode;

/// Construction options for a CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub mode: DecodeMode,
    /// Whether instrumentation hooks fire from the start.
    pub callbacks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: DecodeMode::default(),
            callbacks: true,
        }
    }
}

impl Config {
    pub fn with_mode(self, mode: DecodeMode) -> Self {
        Self { mode, ..self }
    }

    pub fn with_callbacks(self, callbacks: bool) -> Self {
        Self { callbacks, ..self }
    }
}
