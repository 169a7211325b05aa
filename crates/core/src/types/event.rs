//! Festival events and cart items.

use serde::{Deserialize, Serialize};

use super::fee::Fee;
use super::id::EventId;

/// Top-level event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Technical,
    Cultural,
    Gaming,
}

impl EventCategory {
    /// All categories in catalog display order.
    pub const ALL: [Self; 3] = [Self::Technical, Self::Cultural, Self::Gaming];
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Technical => write!(f, "Technical"),
            Self::Cultural => write!(f, "Cultural"),
            Self::Gaming => write!(f, "Gaming"),
        }
    }
}

impl std::str::FromStr for EventCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "technical" | "tech" => Ok(Self::Technical),
            "cultural" => Ok(Self::Cultural),
            "gaming" => Ok(Self::Gaming),
            _ => Err(format!("invalid event category: {s}")),
        }
    }
}

/// Sub-track for cultural events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CulturalTrack {
    #[serde(rename = "Hobby Club")]
    HobbyClub,
    General,
    Promotional,
}

impl std::fmt::Display for CulturalTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HobbyClub => write!(f, "Hobby Club"),
            Self::General => write!(f, "General"),
            Self::Promotional => write!(f, "Promotional"),
        }
    }
}

impl std::str::FromStr for CulturalTrack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "hobbyclub" => Ok(Self::HobbyClub),
            "general" => Ok(Self::General),
            "promotional" => Ok(Self::Promotional),
            _ => Err(format!("invalid cultural track: {s}")),
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub category: EventCategory,
    /// Only cultural events carry a track.
    #[serde(rename = "category", default, skip_serializing_if = "Option::is_none")]
    pub track: Option<CulturalTrack>,
    pub fee: Fee,
    /// Poster or card image reference.
    #[serde(default)]
    pub visual: String,
}

/// An event waiting in the cart for checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: EventId,
    pub title: String,
    pub category: EventCategory,
    pub fee: Fee,
    pub image: String,
}

impl From<&Event> for CartItem {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            category: event.category,
            fee: event.fee,
            image: event.visual.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_names() {
        let json = r#"{
            "id": "dance-off",
            "title": "Dance Off",
            "description": "Group dance battle",
            "type": "Cultural",
            "category": "Hobby Club",
            "fee": 300,
            "visual": "/events/dance.webp"
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.category, EventCategory::Cultural);
        assert_eq!(event.track, Some(CulturalTrack::HobbyClub));
        assert_eq!(event.fee, Fee::rupees(300));
    }

    #[test]
    fn test_track_is_optional() {
        let json = r#"{"id":"ctf","title":"CTF","type":"Technical","fee":0}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.track, None);
        assert!(event.description.is_empty());

        let out = serde_json::to_value(&event).unwrap();
        assert!(out.get("category").is_none());
    }

    #[test]
    fn test_cart_item_from_event() {
        let json = r#"{"id":"valorant","title":"Valorant Cup","type":"Gaming","fee":250,"visual":"v.png"}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        let item = CartItem::from(&event);
        assert_eq!(item.id, EventId::new("valorant"));
        assert_eq!(item.category, EventCategory::Gaming);
        assert_eq!(item.image, "v.png");
    }

    #[test]
    fn test_parse_category_and_track() {
        assert_eq!("gaming".parse::<EventCategory>(), Ok(EventCategory::Gaming));
        assert!("sports".parse::<EventCategory>().is_err());
        assert_eq!("hobby-club".parse::<CulturalTrack>(), Ok(CulturalTrack::HobbyClub));
        assert_eq!("Hobby Club".parse::<CulturalTrack>(), Ok(CulturalTrack::HobbyClub));
    }
}
