//! Status enums for participants.

use serde::{Deserialize, Serialize};

use super::email::Email;

/// Whether a participant studies at the host institution.
///
/// Derived once at registration from the e-mail domain and stored on the
/// profile; it is never recomputed when the address changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StudentType {
    /// E-mail address in the institution's domain.
    Internal,
    /// Any other address.
    #[default]
    External,
}

impl StudentType {
    /// Classify an address against the institution's e-mail domain.
    ///
    /// ```
    /// use varnothsava_core::{Email, StudentType};
    ///
    /// let internal = Email::parse("asha@sode-edu.in").unwrap();
    /// let external = Email::parse("asha@gmail.com").unwrap();
    /// assert_eq!(StudentType::classify(&internal, "sode-edu.in"), StudentType::Internal);
    /// assert_eq!(StudentType::classify(&external, "sode-edu.in"), StudentType::External);
    /// ```
    #[must_use]
    pub fn classify(email: &Email, institution_domain: &str) -> Self {
        if email.is_in_domain(institution_domain) {
            Self::Internal
        } else {
            Self::External
        }
    }
}

impl std::fmt::Display for StudentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::External => write!(f, "external"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_is_case_insensitive() {
        let email = Email::parse("ASHA@SODE-EDU.IN").unwrap();
        assert_eq!(StudentType::classify(&email, "sode-edu.in"), StudentType::Internal);
    }

    #[test]
    fn test_classify_rejects_lookalike_domains() {
        let email = Email::parse("asha@sode-edu.in.example.com").unwrap();
        assert_eq!(StudentType::classify(&email, "sode-edu.in"), StudentType::External);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&StudentType::Internal).unwrap(),
            "\"internal\""
        );
        let parsed: StudentType = serde_json::from_str("\"external\"").unwrap();
        assert_eq!(parsed, StudentType::External);
    }
}
