//! Validated session settings and `Set-Cookie` rendering.

use std::time::Duration;

use thiserror::Error;

use crate::config::SessionConfig;

/// Default session lifetime in seconds.
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Upper bound on the session lifetime (400 days, the cap browsers apply to
/// `Max-Age`).
pub const MAX_MAX_AGE_SECS: u64 = 400 * 24 * 60 * 60;

/// Default name of the cookie carrying the session id.
pub const DEFAULT_COOKIE_NAME: &str = "id";

/// Default period of the expiration sweeper.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SettingsError {
    #[error("session max age must be greater than zero")]
    ZeroMaxAge,
    #[error("session max age must not exceed 400 days")]
    MaxAgeTooLarge,
    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,
    #[error("invalid cookie name: {0:?}")]
    InvalidCookieName(String),
}

/// Settings shared by every session a registry creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    max_age_secs: u64,
    cookie_name: String,
    secure: bool,
    sweep_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure: false,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SessionSettings {
    /// Settings with the given lifetime and every other value at its default.
    pub fn with_max_age(max_age_secs: u64) -> Result<Self, SettingsError> {
        if max_age_secs == 0 {
            return Err(SettingsError::ZeroMaxAge);
        }
        if max_age_secs > MAX_MAX_AGE_SECS {
            return Err(SettingsError::MaxAgeTooLarge);
        }
        Ok(Self {
            max_age_secs,
            ..Self::default()
        })
    }

    /// Replace the cookie name.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Result<Self, SettingsError> {
        let name = name.into();
        if !is_valid_cookie_name(&name) {
            return Err(SettingsError::InvalidCookieName(name));
        }
        self.cookie_name = name;
        Ok(self)
    }

    /// Append the `Secure` attribute to every directive.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Replace the sweeper period.
    pub fn sweep_interval(mut self, interval: Duration) -> Result<Self, SettingsError> {
        if interval.is_zero() {
            return Err(SettingsError::ZeroSweepInterval);
        }
        self.sweep_interval = interval;
        Ok(self)
    }

    #[must_use]
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    #[must_use]
    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn sweep_period(&self) -> Duration {
        self.sweep_interval
    }

    /// `Set-Cookie` value that stores `id` on the client for the session lifetime.
    #[must_use]
    pub fn directive(&self, id: &str) -> String {
        self.render(id, self.max_age_secs)
    }

    /// `Set-Cookie` value that makes the client drop the session cookie.
    #[must_use]
    pub fn removal_directive(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age_secs: u64) -> String {
        let mut directive = format!(
            "{}={value}; Max-Age={max_age_secs}; SameSite=Strict; HttpOnly",
            self.cookie_name
        );
        if self.secure {
            directive.push_str("; Secure");
        }
        directive
    }
}

impl TryFrom<&SessionConfig> for SessionSettings {
    type Error = SettingsError;

    fn try_from(config: &SessionConfig) -> Result<Self, Self::Error> {
        Ok(Self::with_max_age(config.max_age_secs)?
            .cookie_name(config.cookie_name.clone())?
            .secure(config.secure)
            .sweep_interval(Duration::from_secs(config.sweep_interval_secs))?)
    }
}

/// RFC 6265 `cookie-name` is an RFC 7230 token.
fn is_valid_cookie_name(name: &str) -> bool {
    const SEPARATORS: &[char] = &[
        '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}',
    ];
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_graphic() && !SEPARATORS.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        let settings = SessionSettings::default();
        assert_eq!(
            settings.directive("abc"),
            "id=abc; Max-Age=3600; SameSite=Strict; HttpOnly"
        );
    }

    #[test]
    fn test_secure_directive() {
        let settings = SessionSettings::with_max_age(60)
            .unwrap()
            .cookie_name("sid")
            .unwrap()
            .secure(true);
        assert_eq!(
            settings.directive("abc"),
            "sid=abc; Max-Age=60; SameSite=Strict; HttpOnly; Secure"
        );
    }

    #[test]
    fn test_removal_directive() {
        let settings = SessionSettings::default();
        assert_eq!(
            settings.removal_directive(),
            "id=; Max-Age=0; SameSite=Strict; HttpOnly"
        );
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert_eq!(
            SessionSettings::with_max_age(0),
            Err(SettingsError::ZeroMaxAge)
        );
        assert_eq!(
            SessionSettings::with_max_age(MAX_MAX_AGE_SECS + 1),
            Err(SettingsError::MaxAgeTooLarge)
        );
        assert_eq!(
            SessionSettings::default().sweep_interval(Duration::ZERO),
            Err(SettingsError::ZeroSweepInterval)
        );
    }

    #[test]
    fn test_rejects_bad_cookie_names() {
        for name in ["", "a b", "a;b", "a=b", "sé", "a\tb"] {
            assert!(
                SessionSettings::default().cookie_name(name).is_err(),
                "{name:?} should be rejected"
            );
        }
        assert!(SessionSettings::default().cookie_name("__Host-sid").is_ok());
    }

    #[test]
    fn test_from_config() {
        let config = SessionConfig {
            max_age_secs: 120,
            cookie_name: "sid".to_string(),
            secure: false,
            sweep_interval_secs: 5,
        };
        let settings = SessionSettings::try_from(&config).unwrap();
        assert_eq!(settings.max_age(), Duration::from_secs(120));
        assert_eq!(settings.name(), "sid");
        assert_eq!(settings.sweep_period(), Duration::from_secs(5));
    }
}
