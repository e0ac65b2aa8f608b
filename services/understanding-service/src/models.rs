use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// Beacon body as sent by the page script. Every field may be missing or null.
#[derive(Debug, Default, Deserialize)]
pub struct UnderstandingPayload {
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub dark_mode: Option<bool>,
    pub url: Option<String>,
    pub timestamp: Option<String>,
}

/// One row of `understanding_data`, minus the store-assigned `created_at`.
#[derive(Clone, Debug, PartialEq)]
pub struct UnderstandingRecord {
    pub ip_address: String,
    pub referrer: String,
    pub user_agent: String,
    pub dark_mode: Option<bool>,
    pub url: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl UnderstandingRecord {
    pub fn from_payload(
        ip_address: String,
        payload: UnderstandingPayload,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            ip_address,
            referrer: payload.referrer.unwrap_or_default(),
            user_agent: payload.user_agent.unwrap_or_default(),
            dark_mode: payload.dark_mode,
            url: payload.url.unwrap_or_default(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn null_strings_become_empty() {
        let payload: UnderstandingPayload =
            serde_json::from_str(r#"{"referrer":null,"dark_mode":false,"extra":1}"#)
                .expect("payload");
        let record = UnderstandingRecord::from_payload(
            "1.2.3.4".into(),
            payload,
            Utc::now().fixed_offset(),
        );
        assert_eq!(record.referrer, "");
        assert_eq!(record.user_agent, "");
        assert_eq!(record.url, "");
        assert_eq!(record.dark_mode, Some(false));
    }

    #[test]
    fn dark_mode_absent_stays_none() {
        let payload: UnderstandingPayload = serde_json::from_str("{}").expect("payload");
        assert_eq!(payload.dark_mode, None);
    }
}
