//! Optional timestamps. The browser store writes `""` for "not yet", so an
//! empty string reads back as `None`.

pub mod optional {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(s)
                .map(|ts| Some(ts.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::models::Offer;

    #[test]
    fn empty_verified_at_reads_as_none() {
        let offer: Offer = serde_json::from_value(serde_json::json!({
            "offerId": "OFFER_1",
            "propertyId": "PROP_1",
            "buyerId": "USER_B",
            "sellerId": "USER_S",
            "offerAmount": 1200.0,
            "status": "PENDING",
            "verifiedAt": "",
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(offer.verified_at, None);
    }
}
