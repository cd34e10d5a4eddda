use fancy_regex::Regex;

use crate::config::TimeoutParseMode;
use crate::{Error, Result};

/// Reads toast `data-timeout` values into millisecond delays.
///
/// Absent, empty and unparseable values resolve to the configured
/// default. They never resolve to an immediate removal. Negative values
/// clamp to zero.
#[derive(Debug, Clone)]
pub struct TimeoutParser {
    mode: TimeoutParseMode,
    default_ms: i64,
    pattern: Regex,
}

impl TimeoutParser {
    pub fn new(mode: TimeoutParseMode, default_ms: i64) -> Result<Self> {
        let source = match mode {
            TimeoutParseMode::Lenient => r"^\s*([+-]?[0-9]+)",
            TimeoutParseMode::Strict => r"^\s*([+-]?[0-9]+)\s*$",
        };
        let pattern = Regex::new(source).map_err(|err| Error::Pattern(err.to_string()))?;
        Ok(Self {
            mode,
            default_ms: default_ms.max(0),
            pattern,
        })
    }

    pub fn mode(&self) -> TimeoutParseMode {
        self.mode
    }

    pub fn default_ms(&self) -> i64 {
        self.default_ms
    }

    /// Resolves a raw attribute value. `None` means the attribute is absent.
    pub fn resolve(&self, raw: Option<&str>) -> i64 {
        self.parse(raw).unwrap_or(self.default_ms)
    }

    /// The parsed delay, or `None` when the default applies.
    pub fn parse(&self, raw: Option<&str>) -> Option<i64> {
        let raw = raw.filter(|value| !value.is_empty())?;
        let captures = self.pattern.captures(raw).ok().flatten()?;
        let digits = captures.get(1)?.as_str();
        Some(saturating_parse(digits).max(0))
    }
}

fn saturating_parse(digits: &str) -> i64 {
    digits.parse::<i64>().unwrap_or_else(|_| {
        if digits.starts_with('-') {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient() -> Result<TimeoutParser> {
        TimeoutParser::new(TimeoutParseMode::Lenient, 4000)
    }

    fn strict() -> Result<TimeoutParser> {
        TimeoutParser::new(TimeoutParseMode::Strict, 4000)
    }

    #[test]
    fn absent_and_empty_use_default() -> Result<()> {
        let parser = lenient()?;
        assert_eq!(parser.resolve(None), 4000);
        assert_eq!(parser.resolve(Some("")), 4000);
        Ok(())
    }

    #[test]
    fn plain_integers_parse_in_both_modes() -> Result<()> {
        for parser in [lenient()?, strict()?] {
            assert_eq!(parser.resolve(Some("1000")), 1000);
            assert_eq!(parser.resolve(Some(" 250")), 250);
            assert_eq!(parser.resolve(Some("+7")), 7);
            assert_eq!(parser.resolve(Some("0")), 0);
        }
        Ok(())
    }

    #[test]
    fn non_numeric_values_never_mean_immediate_removal() -> Result<()> {
        for parser in [lenient()?, strict()?] {
            assert_eq!(parser.resolve(Some("abc")), 4000);
            assert_eq!(parser.resolve(Some("NaN")), 4000);
            assert_eq!(parser.resolve(Some("   ")), 4000);
            assert_eq!(parser.resolve(Some("-")), 4000);
        }
        Ok(())
    }

    #[test]
    fn lenient_mode_reads_numeric_prefix() -> Result<()> {
        let parser = lenient()?;
        assert_eq!(parser.resolve(Some("12abc")), 12);
        assert_eq!(parser.resolve(Some("1500ms")), 1500);
        assert_eq!(parser.resolve(Some("2.9")), 2);
        assert_eq!(parser.resolve(Some("0x10")), 0);
        Ok(())
    }

    #[test]
    fn strict_mode_rejects_trailing_garbage() -> Result<()> {
        let parser = strict()?;
        assert_eq!(parser.resolve(Some("12abc")), 4000);
        assert_eq!(parser.resolve(Some("2.9")), 4000);
        assert_eq!(parser.resolve(Some("300 ")), 300);
        Ok(())
    }

    #[test]
    fn negative_and_huge_values_clamp() -> Result<()> {
        let parser = lenient()?;
        assert_eq!(parser.resolve(Some("-50")), 0);
        assert_eq!(parser.resolve(Some("99999999999999999999999")), i64::MAX);
        assert_eq!(parser.resolve(Some("-99999999999999999999999")), 0);
        Ok(())
    }
}
