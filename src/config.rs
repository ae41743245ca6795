//! Pool configuration options

use std::time::Duration;

/// Configuration for resource-limiting pool behavior
///
/// # Examples
///
/// ```
/// use limiting_pool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_max_size(10)
///     .with_max_strict(true)
///     .with_blocking(true)
///     .with_block_timeout(Duration::from_secs(5))
///     .with_trim_interval(Duration::from_secs(60));
///
/// assert_eq!(config.max_size, Some(10));
/// assert!(config.max_strict);
/// assert_eq!(config.block_timeout, Some(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfiguration {
    /// Name used in log records and metric labels
    pub name: String,

    /// Maximum number of objects kept by the pool; `None` means unlimited
    pub max_size: Option<usize>,

    /// Whether the pool refuses to create more than `max_size` objects
    pub max_strict: bool,

    /// Whether a strict pool at capacity makes callers wait for an object
    pub blocking: bool,

    /// How long a blocked caller waits; `None` waits indefinitely
    #[cfg_attr(
        feature = "serde",
        serde(rename = "block_timeout_ms", with = "optional_millis")
    )]
    pub block_timeout: Option<Duration>,

    /// Minimum interval between automatic trims; `None` disables trimming
    #[cfg_attr(
        feature = "serde",
        serde(rename = "trim_interval_ms", with = "optional_millis")
    )]
    pub trim_interval: Option<Duration>,

    /// Record every outstanding object for leak diagnosis
    pub tracing: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            name: "pool".to_string(),
            max_size: None,
            max_strict: false,
            blocking: false,
            block_timeout: None,
            trim_interval: None,
            tracing: false,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the maximum pool size
    ///
    /// A size of zero means the pool is unlimited.
    ///
    /// # Examples
    ///
    /// ```
    /// use limiting_pool::PoolConfiguration;
    ///
    /// assert_eq!(PoolConfiguration::new().with_max_size(8).max_size, Some(8));
    /// assert_eq!(PoolConfiguration::new().with_max_size(0).max_size, None);
    /// ```
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = (size > 0).then_some(size);
        self
    }

    /// Refuse to create objects beyond the maximum size
    pub fn with_max_strict(mut self, strict: bool) -> Self {
        self.max_strict = strict;
        self
    }

    /// Block callers of a strict pool at capacity instead of failing
    pub fn with_blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Set how long a blocked caller waits. A zero duration waits indefinitely.
    pub fn with_block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Enable trimming of idle objects. A zero interval disables trimming.
    pub fn with_trim_interval(mut self, interval: Duration) -> Self {
        self.trim_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Enable checkout tracing
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing = enabled;
        self
    }

    /// Effective size limit
    pub(crate) fn limit(&self) -> usize {
        self.max_size.unwrap_or(usize::MAX)
    }
}

#[cfg(feature = "serde")]
mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => {
                serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_u64(0),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?.unwrap_or(0);
        Ok((millis > 0).then(|| Duration::from_millis(millis)))
    }
}
