//! Push notification types
//!
//! Outgoing request headers, VAPID claims and the notification payload that the
//! site's service worker renders.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::Error;

// =============================================================================
// Push Message Types
// =============================================================================

#[derive(Debug, Clone)]
pub struct PushHeader {
    pub ttl: i64,
    pub urgency: Urgency,
}

/// Notification content for a single broadcast. Serialized as-is (absent
/// fields omitted) and encrypted separately for every subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

impl NotificationPayload {
    pub fn parse(data: &[u8]) -> Result<NotificationPayload, Error> {
        let payload: NotificationPayload = serde_json::from_slice(data)
            .map_err(|e| Error::InvalidPayload(e.to_string()))?;
        payload.validate()?;
        Ok(payload)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let filled =
            |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

        if !filled(&self.title) && !filled(&self.body) {
            return Err(Error::InvalidPayload(String::from(
                "title or body is required",
            )));
        }

        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }
}

// =============================================================================
// Urgency Enum
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    VeryLow,
    Low,
    Normal,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Urgency::VeryLow => write!(f, "very-low"),
            Urgency::Low => write!(f, "low"),
            Urgency::Normal => write!(f, "normal"),
            Urgency::High => write!(f, "high"),
        }
    }
}

impl FromStr for Urgency {
    type Err = Error;

    fn from_str(value: &str) -> Result<Urgency, Self::Err> {
        match value {
            "very-low" => Ok(Urgency::VeryLow),
            "low" => Ok(Urgency::Low),
            "normal" => Ok(Urgency::Normal),
            "high" => Ok(Urgency::High),
            _ => Err(Error::InvalidOption {
                option: format!("urgency {}", value),
            }),
        }
    }
}

// =============================================================================
// JWT Claims
// =============================================================================

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub aud: String,
    pub sub: String,
    pub exp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_requires_title_or_body() {
        assert!(NotificationPayload::parse(r#"{"title": "注意"}"#.as_bytes()).is_ok());
        assert!(
            NotificationPayload::parse(r#"{"body": "本日は中止です"}"#.as_bytes()).is_ok()
        );

        let err =
            NotificationPayload::parse(br#"{"title": "", "body": ""}"#)
                .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));

        let err = NotificationPayload::parse(br#"{"url": "/blocks"}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[test]
    fn test_payload_rejects_malformed_json() {
        let err = NotificationPayload::parse(b"not json").unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));

        let err = NotificationPayload::parse(b"null").unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[test]
    fn test_payload_omits_absent_fields() {
        let payload = NotificationPayload {
            title: Some(String::from("注意")),
            tag: Some(String::from("announcement")),
            ..Default::default()
        };

        let value: serde_json::Value =
            serde_json::from_slice(&payload.to_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"title": "注意", "tag": "announcement"})
        );
    }

    #[test]
    fn test_urgency_parse() {
        assert_eq!(Urgency::from_str("very-low").unwrap(), Urgency::VeryLow);
        assert_eq!(Urgency::from_str("high").unwrap().to_string(), "high");
        assert!(Urgency::from_str("urgent").is_err());
    }
}
