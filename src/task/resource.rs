// src/task/resource.rs

//! Request/limit value objects for task resources (wall time, memory).
//!
//! A user writes either a single value, which applies to both the request and
//! the limit, or a table with separate keys:
//!
//! ```toml
//! time = "1h"
//! memory = { request = "2 GB", limit = "4 GB" }
//! ```

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::errors::{GridError, Result};

static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*([a-z]+)").expect("static duration regex")
});

static MEMORY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*([kmgtp]?i?b?)\s*$").expect("static memory regex")
});

/// A single scalar as written in the config: text or a bare integer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Integer(u64),
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(n) => write!(f, "{n}"),
            ScalarValue::Text(s) => f.write_str(s),
        }
    }
}

/// Raw resource input before parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ResourceSpec {
    Scalar(ScalarValue),
    Map {
        #[serde(default)]
        request: Option<ScalarValue>,
        #[serde(default)]
        limit: Option<ScalarValue>,
    },
}

impl ResourceSpec {
    pub fn scalar(value: impl Into<String>) -> Self {
        ResourceSpec::Scalar(ScalarValue::Text(value.into()))
    }

    pub fn map(request: Option<&str>, limit: Option<&str>) -> Self {
        ResourceSpec::Map {
            request: request.map(|s| ScalarValue::Text(s.to_string())),
            limit: limit.map(|s| ScalarValue::Text(s.to_string())),
        }
    }
}

/// A quantity that can appear in a [`ResourceRequest`].
pub trait ResourceValue: Sized + Clone + PartialEq + fmt::Debug {
    /// Human name used in error messages ("time", "memory").
    const KIND: &'static str;

    fn parse_text(text: &str) -> std::result::Result<Self, String>;

    fn from_integer(n: u64) -> Self;

    fn parse_scalar(value: &ScalarValue) -> Result<Self> {
        match value {
            ScalarValue::Integer(n) => Ok(Self::from_integer(*n)),
            ScalarValue::Text(text) => Self::parse_text(text).map_err(|e| {
                GridError::config(format!("invalid {} value '{}': {}", Self::KIND, text, e))
            }),
        }
    }
}

/// Immutable request/limit pair. At least one side is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRequest<T> {
    request: Option<T>,
    limit: Option<T>,
}

impl<T: ResourceValue> ResourceRequest<T> {
    /// Parse a raw spec.
    ///
    /// - scalar: request = limit = value
    /// - only `request`: limit stays unset
    /// - only `limit`: request = limit = value
    /// - both: as given
    /// - neither: [`GridError::ConfigError`]
    pub fn parse(spec: &ResourceSpec) -> Result<Self> {
        match spec {
            ResourceSpec::Scalar(value) => {
                let v = T::parse_scalar(value)?;
                Ok(Self {
                    request: Some(v.clone()),
                    limit: Some(v),
                })
            }
            ResourceSpec::Map { request, limit } => match (request, limit) {
                (None, None) => Err(GridError::config(format!(
                    "{} resource must define `request`, `limit` or both",
                    T::KIND
                ))),
                (Some(req), None) => Ok(Self {
                    request: Some(T::parse_scalar(req)?),
                    limit: None,
                }),
                (None, Some(lim)) => {
                    let v = T::parse_scalar(lim)?;
                    Ok(Self {
                        request: Some(v.clone()),
                        limit: Some(v),
                    })
                }
                (Some(req), Some(lim)) => Ok(Self {
                    request: Some(T::parse_scalar(req)?),
                    limit: Some(T::parse_scalar(lim)?),
                }),
            },
        }
    }

    pub fn request(&self) -> Option<&T> {
        self.request.as_ref()
    }

    pub fn limit(&self) -> Option<&T> {
        self.limit.as_ref()
    }

    /// The value schedulers should enforce: the limit, or the request when no
    /// limit was given.
    pub fn effective_limit(&self) -> &T {
        match (&self.limit, &self.request) {
            (Some(limit), _) => limit,
            (None, Some(request)) => request,
            (None, None) => unreachable!("ResourceRequest always holds a request or a limit"),
        }
    }

    /// The value schedulers should reserve: the request, or the limit.
    pub fn effective_request(&self) -> &T {
        match (&self.request, &self.limit) {
            (Some(request), _) => request,
            (None, Some(limit)) => limit,
            (None, None) => unreachable!("ResourceRequest always holds a request or a limit"),
        }
    }
}

/// Wall-clock duration, e.g. `"90s"`, `"1h30m"`, `"2d"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSpan(Duration);

impl TimeSpan {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// Whole minutes, rounded up.
    pub fn as_minutes(&self) -> u64 {
        self.0.as_secs().div_ceil(60)
    }

    /// `HH:MM:SS`, hours not wrapped at 24.
    pub fn to_hms(&self) -> String {
        let secs = self.0.as_secs();
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

impl ResourceValue for TimeSpan {
    const KIND: &'static str = "time";

    fn parse_text(text: &str) -> std::result::Result<Self, String> {
        parse_duration(text).map(TimeSpan)
    }

    fn from_integer(n: u64) -> Self {
        TimeSpan(Duration::from_secs(n))
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hms())
    }
}

/// Parse a duration such as `"500ms"`, `"3s"`, `"1h30m"` or `"2 days"`.
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut rest = s;
    let mut total = Duration::ZERO;

    while !rest.trim().is_empty() {
        let caps = DURATION_PART
            .captures(rest)
            .ok_or_else(|| format!("cannot parse duration '{}'", s))?;
        let value: f64 = caps[1]
            .parse()
            .map_err(|e| format!("invalid duration number '{}': {}", &caps[1], e))?;
        let unit = caps[2].to_lowercase();

        let unit_secs = match unit.as_str() {
            "ms" | "milli" | "millis" => 0.001,
            "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
            "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
            "h" | "hour" | "hours" => 3600.0,
            "d" | "day" | "days" => 86_400.0,
            _ => {
                return Err(format!(
                    "unsupported duration unit '{}'; expected ms, s, m, h or d",
                    unit
                ));
            }
        };

        let part = Duration::try_from_secs_f64(value * unit_secs)
            .map_err(|_| format!("duration '{}' is out of range", s))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| format!("duration '{}' is out of range", s))?;
        rest = &rest[caps.get(0).map(|m| m.end()).unwrap_or(rest.len())..];
    }

    Ok(total)
}

/// Memory amount in bytes, e.g. `"512 MB"`, `"4G"`, `"1.5 GB"`.
///
/// Units are binary multiples (1 KB = 1024 B).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemorySize(u64);

impl MemorySize {
    pub fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }

    /// Whole mebibytes, rounded up.
    pub fn as_mega(&self) -> u64 {
        self.0.div_ceil(1 << 20)
    }
}

impl ResourceValue for MemorySize {
    const KIND: &'static str = "memory";

    fn parse_text(text: &str) -> std::result::Result<Self, String> {
        let caps = MEMORY_VALUE
            .captures(text)
            .ok_or_else(|| format!("cannot parse memory '{}'", text.trim()))?;
        let value: f64 = caps[1]
            .parse()
            .map_err(|e| format!("invalid memory number '{}': {}", &caps[1], e))?;
        let unit = caps[2].to_uppercase();
        let exponent = match unit.chars().next() {
            None | Some('B') => 0,
            Some('K') => 1,
            Some('M') => 2,
            Some('G') => 3,
            Some('T') => 4,
            Some('P') => 5,
            Some(other) => return Err(format!("unsupported memory unit '{}'", other)),
        };
        let bytes = (value * 1024f64.powi(exponent)).round();
        if !bytes.is_finite() || bytes >= u64::MAX as f64 {
            return Err(format!("memory '{}' is out of range", text.trim()));
        }
        Ok(MemorySize(bytes as u64))
    }

    fn from_integer(n: u64) -> Self {
        MemorySize(n)
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
        let mut value = self.0 as f64;
        let mut idx = 0;
        while value >= 1024.0 && idx < UNITS.len() - 1 {
            value /= 1024.0;
            idx += 1;
        }
        if value.fract() == 0.0 {
            write!(f, "{} {}", value as u64, UNITS[idx])
        } else {
            write!(f, "{:.1} {}", value, UNITS[idx])
        }
    }
}
