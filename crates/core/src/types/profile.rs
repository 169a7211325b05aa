//! Participant profiles.
//!
//! The profile is the single document the portal keeps per participant. The
//! server stores it verbatim (plus a creation stamp) and the client mirrors it
//! into local storage, so its JSON shape is the wire format of both
//! `/api/me` and `/api/register`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{EventId, UserId};
use super::status::StudentType;

/// Team name used when a participant registers alone.
pub const SOLO_TEAM_NAME: &str = "Solo Participation";

/// Errors that can occur when parsing a [`ProfileCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileCodeError {
    #[error("profile code must be exactly {expected} characters (got {actual})")]
    Length { expected: usize, actual: usize },
    #[error("profile code may only contain 0-9 and A-Z")]
    InvalidCharacter,
}

/// Short human-shareable participant reference, e.g. `K7Q2ZD`.
///
/// Team leads type their teammates' codes when registering for team events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileCode(String);

impl ProfileCode {
    /// Number of characters in a code.
    pub const LENGTH: usize = 6;

    const ALPHABET: &'static [u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    /// Generate a random code from `0-9A-Z`.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let code = (0..Self::LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..Self::ALPHABET.len());
                Self::ALPHABET.get(idx).copied().map_or('0', char::from)
            })
            .collect();
        Self(code)
    }

    /// Parse a code, accepting lowercase input.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is not six ASCII alphanumerics.
    pub fn parse(s: &str) -> Result<Self, ProfileCodeError> {
        let code = s.trim().to_ascii_uppercase();
        let actual = code.chars().count();
        if actual != Self::LENGTH {
            return Err(ProfileCodeError::Length {
                expected: Self::LENGTH,
                actual,
            });
        }
        if !code.bytes().all(|b| Self::ALPHABET.contains(&b)) {
            return Err(ProfileCodeError::InvalidCharacter);
        }
        Ok(Self(code))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProfileCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ProfileCode {
    type Error = ProfileCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProfileCode> for String {
    fn from(code: ProfileCode) -> Self {
        code.0
    }
}

/// An event the participant signed up for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredEvent {
    pub id: EventId,
    pub team_name: String,
}

impl RegisteredEvent {
    /// Register for an event, falling back to [`SOLO_TEAM_NAME`] for a blank team.
    #[must_use]
    pub fn new(id: EventId, team_name: Option<&str>) -> Self {
        let team_name = team_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(SOLO_TEAM_NAME)
            .to_owned();
        Self { id, team_name }
    }

    /// A solo registration.
    #[must_use]
    pub fn solo(id: EventId) -> Self {
        Self::new(id, None)
    }
}

/// The public face of a profile, as shown to a team lead entering codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub profile_code: ProfileCode,
    pub name: String,
}

/// Fields a participant fills in on the registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    pub email: Email,
    pub usn: String,
    pub college_name: String,
    pub age: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_card_url: Option<String>,
}

/// A participant profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity-provider uid.
    pub id: UserId,
    pub name: String,
    pub email: Email,
    /// University seat number.
    pub usn: String,
    pub college_name: String,
    pub age: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_card_url: Option<String>,
    pub profile_code: ProfileCode,
    #[serde(default)]
    pub has_paid: bool,
    #[serde(default)]
    pub registered_events: Vec<RegisteredEvent>,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub student_type: StudentType,
    /// Legacy demo field from locally stored accounts. Never written by
    /// registration; credentials live with the identity provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Last local mutation, used for last-write-wins at the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Build a fresh, unpaid profile from registration fields.
    #[must_use]
    pub fn from_registration(
        id: UserId,
        fields: NewProfile,
        profile_code: ProfileCode,
        student_type: StudentType,
        avatar: String,
    ) -> Self {
        Self {
            id,
            name: fields.name,
            email: fields.email,
            usn: fields.usn,
            college_name: fields.college_name,
            age: fields.age,
            phone: fields.phone,
            id_card_url: fields.id_card_url,
            profile_code,
            has_paid: false,
            registered_events: Vec::new(),
            avatar,
            student_type,
            password: None,
            updated_at: None,
        }
    }

    #[must_use]
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            profile_code: self.profile_code.clone(),
            name: self.name.clone(),
        }
    }

    /// Whether the participant is registered for `event`.
    #[must_use]
    pub fn is_registered_for(&self, event: &EventId) -> bool {
        self.registered_events.iter().any(|e| &e.id == event)
    }

    /// Merge new registrations, keeping existing entries untouched.
    ///
    /// Ids already present (or repeated within `events`) are dropped.
    /// Returns the number of entries added.
    pub fn merge_registered_events<I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = RegisteredEvent>,
    {
        let before = self.registered_events.len();
        for event in events {
            if !self.is_registered_for(&event.id) {
                self.registered_events.push(event);
            }
        }
        self.registered_events.len() - before
    }

    /// Whether this copy carries a strictly later `updatedAt` than `other`.
    ///
    /// Any stamped copy is newer than a missing one; an unstamped copy is
    /// never newer.
    #[must_use]
    pub fn is_newer_than(&self, other: Option<&Self>) -> bool {
        let Some(stamp) = self.updated_at else {
            return false;
        };
        other.is_none_or(|other| other.updated_at.is_none_or(|theirs| stamp > theirs))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn profile() -> UserProfile {
        UserProfile::from_registration(
            UserId::new("uid-1"),
            NewProfile {
                name: "Asha".to_string(),
                email: Email::parse("asha@sode-edu.in").unwrap(),
                usn: "4SO21CS001".to_string(),
                college_name: "SMVITM".to_string(),
                age: "19".to_string(),
                phone: "9999999999".to_string(),
                id_card_url: None,
            },
            ProfileCode::parse("ABC123").unwrap(),
            StudentType::Internal,
            String::new(),
        )
    }

    #[test]
    fn test_generated_codes_are_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = ProfileCode::generate(&mut rng);
            assert_eq!(ProfileCode::parse(code.as_str()), Ok(code));
        }
    }

    #[test]
    fn test_profile_code_parse() {
        assert_eq!(ProfileCode::parse("k7q2zd").unwrap().as_str(), "K7Q2ZD");
        assert!(matches!(
            ProfileCode::parse("ABC"),
            Err(ProfileCodeError::Length { actual: 3, .. })
        ));
        assert_eq!(
            ProfileCode::parse("ABC-12"),
            Err(ProfileCodeError::InvalidCharacter)
        );
    }

    #[test]
    fn test_merge_drops_existing_ids() {
        let mut p = profile();
        let added = p.merge_registered_events([RegisteredEvent::new(
            EventId::new("hackathon"),
            Some("Null Pointers"),
        )]);
        assert_eq!(added, 1);

        let added = p.merge_registered_events([
            RegisteredEvent::new(EventId::new("hackathon"), Some("Renamed")),
            RegisteredEvent::solo(EventId::new("quiz")),
        ]);
        assert_eq!(added, 1);
        assert_eq!(p.registered_events.len(), 2);
        assert_eq!(p.registered_events[0].team_name, "Null Pointers");
    }

    #[test]
    fn test_merge_drops_duplicates_within_batch() {
        let mut p = profile();
        let added = p.merge_registered_events([
            RegisteredEvent::solo(EventId::new("quiz")),
            RegisteredEvent::new(EventId::new("quiz"), Some("Again")),
        ]);
        assert_eq!(added, 1);
        assert_eq!(p.registered_events.len(), 1);
    }

    #[test]
    fn test_blank_team_name_is_solo() {
        let event = RegisteredEvent::new(EventId::new("quiz"), Some("   "));
        assert_eq!(event.team_name, SOLO_TEAM_NAME);
    }

    #[test]
    fn test_is_newer_than() {
        let base = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut older = profile();
        older.updated_at = Some(base);
        let mut newer = profile();
        newer.updated_at = Some(base + chrono::Duration::seconds(1));

        assert!(newer.is_newer_than(Some(&older)));
        assert!(!older.is_newer_than(Some(&newer)));
        assert!(!older.is_newer_than(Some(&older)));
        assert!(older.is_newer_than(None));
        assert!(older.is_newer_than(Some(&profile())));
        assert!(!profile().is_newer_than(None));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = serde_json::to_value(profile()).unwrap();
        assert_eq!(json["collegeName"], "SMVITM");
        assert_eq!(json["profileCode"], "ABC123");
        assert_eq!(json["hasPaid"], false);
        assert_eq!(json["studentType"], "internal");
        assert!(json.get("password").is_none());
        assert!(json.get("idCardUrl").is_none());
    }

    #[test]
    fn test_deserialize_ignores_server_stamps() {
        let mut json = serde_json::to_value(profile()).unwrap();
        json["createdAt"] = serde_json::json!("2026-01-01T00:00:00Z");
        let parsed: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, profile());
    }
}
