//! Run configuration.
//!
//! [`AutomationConfig`] is resolved once at startup and passed by value
//! into the orchestrator. Nothing reads timing or safety settings from
//! process-wide state after that point.

use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;
use crate::keys::KeyName;

/// Default provider HTTP port.
pub const DEFAULT_PROVIDER_PORT: u16 = 8080;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Delays applied between automation steps.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    /// Pause after each drug is entered.
    pub paste_delay: Duration,
    /// Pause before typing into a field, letting it take focus.
    pub field_focus_delay: Duration,
    /// Pause before pressing the submit key.
    pub submit_delay: Duration,
    /// Pause before handing off to the e-signature browser.
    pub browser_delay: Duration,
    /// Seconds counted down before drug entry starts.
    pub countdown_secs: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingPreset::Default.timing()
    }
}

/// Named timing profiles for slower or faster prescription software.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingPreset {
    Default,
    Fast,
    Slow,
    Debug,
}

impl TimingPreset {
    pub fn timing(self) -> TimingConfig {
        let (paste, focus, submit, browser) = match self {
            Self::Default => (1.0, 0.5, 2.0, 3.0),
            Self::Fast => (0.5, 0.2, 1.0, 2.0),
            Self::Slow => (2.0, 1.0, 3.0, 5.0),
            Self::Debug => (3.0, 2.0, 5.0, 3.0),
        };
        TimingConfig {
            paste_delay: Duration::from_secs_f64(paste),
            field_focus_delay: Duration::from_secs_f64(focus),
            submit_delay: Duration::from_secs_f64(submit),
            browser_delay: Duration::from_secs_f64(browser),
            countdown_secs: 5,
        }
    }
}

impl FromStr for TimingPreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "fast" => Ok(Self::Fast),
            "slow" => Ok(Self::Slow),
            "debug" => Ok(Self::Debug),
            _ => Err(CoreError::Validation(format!(
                "Invalid timing preset '{s}'. Must be one of: default, fast, slow, debug"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Target software, safety, network, signature, development
// ---------------------------------------------------------------------------

/// How the target prescription software expects to be driven.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareConfig {
    pub name: String,
    /// Pressed after every drug to advance to the next field.
    pub field_separator: KeyName,
    /// Pressed once to submit the prescription.
    pub submit_key: KeyName,
}

impl Default for SoftwareConfig {
    fn default() -> Self {
        Self {
            name: "Default".into(),
            field_separator: KeyName::Enter,
            submit_key: KeyName::Function(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SafetyConfig {
    /// Abort when the pointer is moved into the top-left screen corner.
    pub failsafe_enabled: bool,
    /// Pause after every injected key or text event.
    pub action_pause: Duration,
    /// Runs with more drugs than this are refused before any typing.
    pub max_drugs_per_session: usize,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            failsafe_enabled: true,
            action_pause: Duration::from_millis(100),
            max_drugs_per_session: 50,
        }
    }
}

/// HTTP settings for the provider client.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Per-request timeout.
    pub connection_timeout: Duration,
    /// Extra attempts for idempotent GETs after a connection failure.
    pub retry_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(5),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureConfig {
    /// URL opened for the e-signature step when none is given on the
    /// command line.
    pub default_url: Option<String>,
    /// Browser executable; the platform opener is used when unset.
    pub browser_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DevelopmentConfig {
    /// Log input events instead of injecting them.
    pub dry_run: bool,
    /// Actually sleep for configured delays. Fail-safe checks still run
    /// when this is off.
    pub simulate_delays: bool,
}

impl Default for DevelopmentConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            simulate_delays: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Everything a run needs besides the provider address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutomationConfig {
    pub timing: TimingConfig,
    pub software: SoftwareConfig,
    pub safety: SafetyConfig,
    pub network: NetworkConfig,
    pub signature: SignatureConfig,
    pub development: DevelopmentConfig,
}

impl AutomationConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default   |
    /// |--------------------------|-----------|
    /// | `TIMING_PRESET`          | `default` |
    /// | `PASTE_DELAY_SECS`       | preset    |
    /// | `FIELD_FOCUS_DELAY_SECS` | preset    |
    /// | `SUBMIT_DELAY_SECS`      | preset    |
    /// | `BROWSER_DELAY_SECS`     | preset    |
    /// | `COUNTDOWN_SECS`         | `5`       |
    /// | `SOFTWARE_NAME`          | `Default` |
    /// | `FIELD_SEPARATOR_KEY`    | `enter`   |
    /// | `SUBMIT_KEY`             | `f4`      |
    /// | `FAILSAFE_ENABLED`       | `true`    |
    /// | `ACTION_PAUSE_SECS`      | `0.1`     |
    /// | `MAX_DRUGS_PER_SESSION`  | `50`      |
    /// | `CONNECTION_TIMEOUT_SECS`| `5`       |
    /// | `RETRY_ATTEMPTS`         | `3`       |
    /// | `RETRY_DELAY_SECS`       | `1`       |
    /// | `ESIGN_URL`              | unset     |
    /// | `BROWSER_PATH`           | unset     |
    /// | `DRY_RUN`                | `false`   |
    /// | `SIMULATE_DELAYS`        | `true`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through
    /// `lookup`, so callers can supply a map instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let preset = env.parse("TIMING_PRESET", TimingPreset::Default)?;
        let base = preset.timing();
        let timing = TimingConfig {
            paste_delay: env.secs("PASTE_DELAY_SECS", base.paste_delay)?,
            field_focus_delay: env.secs("FIELD_FOCUS_DELAY_SECS", base.field_focus_delay)?,
            submit_delay: env.secs("SUBMIT_DELAY_SECS", base.submit_delay)?,
            browser_delay: env.secs("BROWSER_DELAY_SECS", base.browser_delay)?,
            countdown_secs: env.parse("COUNTDOWN_SECS", base.countdown_secs)?,
        };

        let software_defaults = SoftwareConfig::default();
        let software = SoftwareConfig {
            name: env.get("SOFTWARE_NAME").unwrap_or(software_defaults.name),
            field_separator: env.parse("FIELD_SEPARATOR_KEY", software_defaults.field_separator)?,
            submit_key: env.parse("SUBMIT_KEY", software_defaults.submit_key)?,
        };

        let safety_defaults = SafetyConfig::default();
        let safety = SafetyConfig {
            failsafe_enabled: env.parse("FAILSAFE_ENABLED", safety_defaults.failsafe_enabled)?,
            action_pause: env.secs("ACTION_PAUSE_SECS", safety_defaults.action_pause)?,
            max_drugs_per_session: env
                .parse("MAX_DRUGS_PER_SESSION", safety_defaults.max_drugs_per_session)?,
        };

        let network_defaults = NetworkConfig::default();
        let network = NetworkConfig {
            connection_timeout: env
                .secs("CONNECTION_TIMEOUT_SECS", network_defaults.connection_timeout)?,
            retry_attempts: env.parse("RETRY_ATTEMPTS", network_defaults.retry_attempts)?,
            retry_delay: env.secs("RETRY_DELAY_SECS", network_defaults.retry_delay)?,
        };

        let signature = SignatureConfig {
            default_url: env.get("ESIGN_URL"),
            browser_path: env.get("BROWSER_PATH"),
        };

        let development_defaults = DevelopmentConfig::default();
        let development = DevelopmentConfig {
            dry_run: env.parse("DRY_RUN", development_defaults.dry_run)?,
            simulate_delays: env.parse("SIMULATE_DELAYS", development_defaults.simulate_delays)?,
        };

        Ok(Self {
            timing,
            software,
            safety,
            network,
            signature,
            development,
        })
    }
}

/// Build the provider base URL from a host (or full URL) and port.
///
/// A value that already carries a scheme is used as-is, minus any
/// trailing slash.
pub fn provider_base_url(host: &str, port: u16) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}:{port}")
    }
}

// ---- private helpers ----

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty, trimmed value for `key`.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, CoreError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| CoreError::Config {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn secs(&self, key: &str, default: Duration) -> Result<Duration, CoreError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        let secs: f64 = raw.parse().map_err(|_| CoreError::Config {
            key: key.to_string(),
            message: format!("'{raw}' is not a number of seconds"),
        })?;
        Duration::try_from_secs_f64(secs).map_err(|_| CoreError::Config {
            key: key.to_string(),
            message: format!("'{raw}' must be a non-negative number of seconds"),
        })
    }
}
