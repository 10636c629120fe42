//! Human-readable engine descriptions.
//!
//! Description text goes through an explicit [`Localizer`] so nothing here
//! depends on an ambient UI context.

use crate::params::SpeechParameters;

/// Localization and markup collaborator for description text
pub trait Localizer: Send + Sync {
    /// Token shown instead of a value that follows the system default
    fn follow_token(&self) -> String;

    /// Wrap a value in emphasis markup
    fn bold(&self, value: &str) -> String {
        format!("<b>{value}</b>")
    }

    /// Assemble the parameter line from already formatted values
    fn play_params(&self, rate: &str, volume: &str, pitch: &str) -> String;
}

/// English strings with HTML bold markup
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishLocalizer;

impl Localizer for EnglishLocalizer {
    fn follow_token(&self) -> String {
        "Follow".to_string()
    }

    fn play_params(&self, rate: &str, volume: &str, pitch: &str) -> String {
        format!("Rate: {rate} | Volume: {volume} | Pitch: {pitch}")
    }
}

/// Render the rate/volume/pitch description of an engine.
///
/// Rate and pitch show the bolded follow token when they follow the system;
/// volume is always numeric.
#[must_use]
pub fn describe_params(params: &SpeechParameters, localizer: &dyn Localizer) -> String {
    let follow = localizer.bold(&localizer.follow_token());
    let rate = if params.is_rate_following_system() {
        follow.clone()
    } else {
        localizer.bold(&params.rate.to_string())
    };
    let pitch = if params.is_pitch_following_system() {
        follow
    } else {
        localizer.bold(&params.pitch.to_string())
    };
    let volume = localizer.bold(&params.volume.to_string());

    localizer.play_params(&rate, &volume, &pitch)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PlainLocalizer;

    impl Localizer for PlainLocalizer {
        fn follow_token(&self) -> String {
            "sys".to_string()
        }

        fn bold(&self, value: &str) -> String {
            format!("*{value}*")
        }

        fn play_params(&self, rate: &str, volume: &str, pitch: &str) -> String {
            format!("{rate}/{volume}/{pitch}")
        }
    }

    #[test]
    fn test_literal_values() {
        let text = describe_params(&SpeechParameters::new(20, 40, 60), &EnglishLocalizer);
        assert_eq!(text, "Rate: <b>20</b> | Volume: <b>60</b> | Pitch: <b>40</b>");
    }

    #[test]
    fn test_following_values_use_follow_token() {
        let text = describe_params(&SpeechParameters::new(0, 0, 0), &EnglishLocalizer);
        assert_eq!(
            text,
            "Rate: <b>Follow</b> | Volume: <b>0</b> | Pitch: <b>Follow</b>"
        );
    }

    #[test]
    fn test_pitch_follows_independently() {
        let text = describe_params(&SpeechParameters::new(35, 0, 90), &PlainLocalizer);
        assert_eq!(text, "*35*/*90*/*sys*");
    }
}
