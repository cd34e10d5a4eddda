use crate::{Error, Result};

const DEFAULT_TOAST_TIMEOUT_MS: i64 = 4000;
const DEFAULT_TIMER_STEP_LIMIT: usize = 10_000;
const DEFAULT_TRACE_LOG_LIMIT: usize = 10_000;

const ENV_TOAST_TIMEOUT_MS: &str = "PAGE_BEHAVIORS_TOAST_TIMEOUT_MS";
const ENV_TIMEOUT_PARSE: &str = "PAGE_BEHAVIORS_TIMEOUT_PARSE";
const ENV_TIMER_STEP_LIMIT: &str = "PAGE_BEHAVIORS_TIMER_STEP_LIMIT";
const ENV_TRACE: &str = "PAGE_BEHAVIORS_TRACE";

/// How `data-timeout` values are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutParseMode {
    /// Base-10 integer prefix: `"12abc"` reads as 12, `"abc"` falls back to
    /// the default.
    #[default]
    Lenient,
    /// The whole value must be an integer. Anything else falls back to the
    /// default.
    Strict,
}

impl TimeoutParseMode {
    fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lenient" => Some(Self::Lenient),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub default_toast_timeout_ms: i64,
    pub timeout_parse: TimeoutParseMode,
    pub timer_step_limit: usize,
    pub trace: bool,
    pub trace_log_limit: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            default_toast_timeout_ms: DEFAULT_TOAST_TIMEOUT_MS,
            timeout_parse: TimeoutParseMode::default(),
            timer_step_limit: DEFAULT_TIMER_STEP_LIMIT,
            trace: false,
            trace_log_limit: DEFAULT_TRACE_LOG_LIMIT,
        }
    }
}

impl PageConfig {
    /// Defaults overlaid with any `PAGE_BEHAVIORS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TOAST_TIMEOUT_MS) {
            config.default_toast_timeout_ms = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::Config(format!("{ENV_TOAST_TIMEOUT_MS}={raw}")))?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_PARSE) {
            config.timeout_parse = TimeoutParseMode::from_name(&raw)
                .ok_or_else(|| Error::Config(format!("{ENV_TIMEOUT_PARSE}={raw}")))?;
        }
        if let Some(raw) = lookup(ENV_TIMER_STEP_LIMIT) {
            config.timer_step_limit = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| Error::Config(format!("{ENV_TIMER_STEP_LIMIT}={raw}")))?;
        }
        if let Some(raw) = lookup(ENV_TRACE) {
            config.trace = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => return Err(Error::Config(format!("{ENV_TRACE}={raw}"))),
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_default_toast_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.default_toast_timeout_ms = timeout_ms;
        self
    }

    pub fn with_timeout_parse(mut self, mode: TimeoutParseMode) -> Self {
        self.timeout_parse = mode;
        self
    }

    pub fn with_timer_step_limit(mut self, max_steps: usize) -> Self {
        self.timer_step_limit = max_steps;
        self
    }

    pub fn with_trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }

    pub fn with_trace_log_limit(mut self, max_entries: usize) -> Self {
        self.trace_log_limit = max_entries;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_toast_timeout_ms < 0 {
            return Err(Error::Config(format!(
                "default toast timeout must be non-negative (got {})",
                self.default_toast_timeout_ms
            )));
        }
        if self.timer_step_limit == 0 {
            return Err(Error::Config(
                "timer step limit requires at least 1 step".into(),
            ));
        }
        if self.trace_log_limit == 0 {
            return Err(Error::Config(
                "trace log limit requires at least 1 entry".into(),
            ));
        }
        Ok(())
    }
}
