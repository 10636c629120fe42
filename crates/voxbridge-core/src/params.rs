//! Playback parameter resolution against the "follow system" sentinel.
//!
//! Rate and pitch each independently may equal [`FOLLOW_SYSTEM`], in which
//! case the effective value comes from the caller's [`SystemDefaults`] and the
//! engine is told the value is following. Volume is always literal.

use serde::{Deserialize, Serialize};

/// Sentinel meaning "use the ambient system default"
pub const FOLLOW_SYSTEM: i32 = 0;

/// Configured speech parameters of one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechParameters {
    /// Speaking rate, or [`FOLLOW_SYSTEM`]
    pub rate: i32,
    /// Pitch, or [`FOLLOW_SYSTEM`]
    pub pitch: i32,
    /// Volume, always literal
    pub volume: i32,
}

impl Default for SpeechParameters {
    fn default() -> Self {
        Self {
            rate: FOLLOW_SYSTEM,
            pitch: FOLLOW_SYSTEM,
            volume: 50,
        }
    }
}

impl SpeechParameters {
    /// Create parameters from literal values
    #[must_use]
    pub const fn new(rate: i32, pitch: i32, volume: i32) -> Self {
        Self { rate, pitch, volume }
    }

    /// Whether the configured rate follows the system default
    #[must_use]
    pub const fn is_rate_following_system(&self) -> bool {
        is_following_system(self.rate)
    }

    /// Whether the configured pitch follows the system default
    #[must_use]
    pub const fn is_pitch_following_system(&self) -> bool {
        is_following_system(self.pitch)
    }
}

/// Check a single configured value against the sentinel
#[must_use]
pub const fn is_following_system(value: i32) -> bool {
    value == FOLLOW_SYSTEM
}

/// Ambient defaults supplied by the caller for following values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemDefaults {
    /// Rate used when the configured rate follows the system
    pub rate: i32,
    /// Pitch used when the configured pitch follows the system
    pub pitch: i32,
}

impl Default for SystemDefaults {
    fn default() -> Self {
        Self { rate: 50, pitch: 50 }
    }
}

/// Effective parameters handed to an engine for one synthesis call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedParams {
    /// Effective rate
    pub rate: i32,
    /// Effective pitch
    pub pitch: i32,
    /// Volume, copied literally
    pub volume: i32,
    /// The rate came from the system default
    pub rate_follows_system: bool,
    /// The pitch came from the system default
    pub pitch_follows_system: bool,
}

/// Pure resolver for configured parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterResolver {
    defaults: SystemDefaults,
}

impl ParameterResolver {
    /// Create a resolver backed by the given system defaults
    #[must_use]
    pub const fn new(defaults: SystemDefaults) -> Self {
        Self { defaults }
    }

    /// System defaults this resolver substitutes
    #[must_use]
    pub const fn defaults(&self) -> SystemDefaults {
        self.defaults
    }

    /// Resolve the effective rate
    #[must_use]
    pub const fn resolve_rate(&self, configured: i32) -> i32 {
        if is_following_system(configured) {
            self.defaults.rate
        } else {
            configured
        }
    }

    /// Resolve the effective pitch
    #[must_use]
    pub const fn resolve_pitch(&self, configured: i32) -> i32 {
        if is_following_system(configured) {
            self.defaults.pitch
        } else {
            configured
        }
    }

    /// Resolve a full parameter set
    #[must_use]
    pub const fn resolve(&self, params: &SpeechParameters) -> ResolvedParams {
        ResolvedParams {
            rate: self.resolve_rate(params.rate),
            pitch: self.resolve_pitch(params.pitch),
            volume: params.volume,
            rate_follows_system: params.is_rate_following_system(),
            pitch_follows_system: params.is_pitch_following_system(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_parameters_follow_system() {
        let params = SpeechParameters::default();
        assert!(params.is_rate_following_system());
        assert!(params.is_pitch_following_system());
        assert_eq!(params.volume, 50);
    }

    #[test]
    fn test_resolve_following_values() {
        let resolver = ParameterResolver::new(SystemDefaults { rate: 70, pitch: 30 });
        let resolved = resolver.resolve(&SpeechParameters::new(0, 0, 0));

        assert_eq!(resolved.rate, 70);
        assert_eq!(resolved.pitch, 30);
        assert_eq!(resolved.volume, 0);
        assert!(resolved.rate_follows_system);
        assert!(resolved.pitch_follows_system);
    }

    #[test]
    fn test_rate_and_pitch_are_independent() {
        let resolver = ParameterResolver::new(SystemDefaults { rate: 70, pitch: 30 });
        let resolved = resolver.resolve(&SpeechParameters::new(20, 0, 80));

        assert_eq!(resolved.rate, 20);
        assert!(!resolved.rate_follows_system);
        assert_eq!(resolved.pitch, 30);
        assert!(resolved.pitch_follows_system);
        assert_eq!(resolved.volume, 80);
    }

    proptest! {
        #[test]
        fn prop_following_iff_sentinel(value in any::<i32>()) {
            let params = SpeechParameters::new(value, value, 50);
            prop_assert_eq!(params.is_rate_following_system(), value == 0);
            prop_assert_eq!(params.is_pitch_following_system(), value == 0);
        }

        #[test]
        fn prop_non_zero_values_pass_through(
            rate in any::<i32>().prop_filter("non-zero", |v| *v != 0),
            pitch in any::<i32>().prop_filter("non-zero", |v| *v != 0),
            volume in any::<i32>(),
        ) {
            let resolver = ParameterResolver::default();
            let resolved = resolver.resolve(&SpeechParameters::new(rate, pitch, volume));
            prop_assert_eq!(resolved.rate, rate);
            prop_assert_eq!(resolved.pitch, pitch);
            prop_assert_eq!(resolved.volume, volume);
        }
    }
}
