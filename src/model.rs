use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use secrecy::Secret;
use serde::{Deserialize, Deserializer, Serialize};

/// Response from the OAuth 2.0 refresh-token exchange
#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

/// A cached OAuth access token and its expiry
#[derive(Debug)]
pub struct AccessToken {
    pub token: Secret<String>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: Secret::new(token),
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// True when the token expires within `threshold` from now
    pub fn expires_soon(&self, threshold: Duration) -> bool {
        Utc::now() + threshold >= self.expires_at
    }
}

/// Marker for a check-in-day bid modifier. The criterion is carried by the
/// resource name, so the marker itself has no fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelCheckInDayInfo {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelLengthOfStayInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_nights: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nights: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdGroupBidModifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid_modifier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_check_in_day: Option<HotelCheckInDayInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotel_length_of_stay: Option<HotelLengthOfStayInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdGroupBidModifierOperation {
    pub create: AdGroupBidModifier,
}

#[derive(Debug, Serialize)]
pub struct MutateAdGroupBidModifiersRequest {
    pub operations: Vec<AdGroupBidModifierOperation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutateAdGroupBidModifierResult {
    pub resource_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MutateAdGroupBidModifiersResponse {
    #[serde(default)]
    pub results: Vec<MutateAdGroupBidModifierResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPathElement {
    pub field_name: String,
    #[serde(
        default,
        deserialize_with = "int64_from_number_or_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub index: Option<i64>,
}

/// proto3 JSON may encode int64 values as decimal strings
fn int64_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(i64),
        Text(String),
    }

    match Option::<Int64>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Int64::Number(value)) => Ok(Some(value)),
        Some(Int64::Text(text)) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocation {
    #[serde(default)]
    pub field_path_elements: Vec<FieldPathElement>,
}

/// A single error inside a [`GoogleAdsFailure`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAdsError {
    /// One-entry map such as `{"fieldError": "REQUIRED"}`
    #[serde(default)]
    pub error_code: BTreeMap<String, String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
}

impl GoogleAdsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Adds a field path element to the error location
    pub fn on_field(mut self, field_name: impl Into<String>) -> Self {
        self.location
            .get_or_insert_with(ErrorLocation::default)
            .field_path_elements
            .push(FieldPathElement {
                field_name: field_name.into(),
                index: None,
            });
        self
    }

    /// Field names along the error location, outermost first
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.location
            .iter()
            .flat_map(|location| location.field_path_elements.iter())
            .map(|element| element.field_name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleAdsFailure {
    #[serde(default)]
    pub errors: Vec<GoogleAdsError>,
}

/// The `GoogleAdsFailure` entry of a REST error's `details` list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAdsFailureDetail {
    #[serde(default)]
    pub errors: Vec<GoogleAdsError>,
    pub request_id: Option<String>,
}

/// REST error envelope: `{"error": {...}}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiErrorStatus,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorStatus {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

impl ApiErrorStatus {
    /// Finds and decodes the `GoogleAdsFailure` detail, if any
    pub fn google_ads_failure(&self) -> Option<GoogleAdsFailureDetail> {
        self.details
            .iter()
            .filter(|detail| {
                detail
                    .get("@type")
                    .and_then(serde_json::Value::as_str)
                    .is_some_and(|type_url| type_url.ends_with("GoogleAdsFailure"))
            })
            .find_map(|detail| match serde_json::from_value(detail.clone()) {
                Ok(failure) => Some(failure),
                Err(e) => {
                    tracing::warn!("Skipping undecodable GoogleAdsFailure detail: {}", e);
                    None
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_in_day_modifier_omits_unset_fields() {
        let modifier = AdGroupBidModifier {
            resource_name: Some("customers/1/adGroupBidModifiers/2_60".to_string()),
            bid_modifier: Some(1.5),
            hotel_check_in_day: Some(HotelCheckInDayInfo {}),
            ..AdGroupBidModifier::default()
        };

        let value = serde_json::to_value(&modifier).unwrap();
        assert_eq!(
            value,
            json!({
                "resourceName": "customers/1/adGroupBidModifiers/2_60",
                "bidModifier": 1.5,
                "hotelCheckInDay": {}
            })
        );
    }

    #[test]
    fn test_length_of_stay_serializes_camel_case() {
        let modifier = AdGroupBidModifier {
            ad_group: Some("customers/1/adGroups/2".to_string()),
            bid_modifier: Some(1.7),
            hotel_length_of_stay: Some(HotelLengthOfStayInfo {
                min_nights: Some(3),
                max_nights: Some(7),
            }),
            ..AdGroupBidModifier::default()
        };

        let value = serde_json::to_value(&modifier).unwrap();
        assert_eq!(value["adGroup"], "customers/1/adGroups/2");
        assert_eq!(value["hotelLengthOfStay"]["minNights"], 3);
        assert_eq!(value["hotelLengthOfStay"]["maxNights"], 7);
        assert!(value.get("resourceName").is_none());
    }

    #[test]
    fn test_empty_mutate_response_has_no_results() {
        let response: MutateAdGroupBidModifiersResponse = serde_json::from_str("{}").unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_error_envelope_finds_google_ads_failure() {
        let envelope: ApiErrorEnvelope = serde_json::from_value(json!({
            "error": {
                "code": 400,
                "message": "Request contains an invalid argument.",
                "status": "INVALID_ARGUMENT",
                "details": [
                    { "@type": "type.googleapis.com/google.rpc.BadRequest" },
                    {
                        "@type": "type.googleapis.com/google.ads.googleads.v0.errors.GoogleAdsFailure",
                        "errors": [{
                            "errorCode": { "rangeError": "TOO_LOW" },
                            "message": "Too low.",
                            "location": { "fieldPathElements": [
                                { "fieldName": "operations", "index": 1 },
                                { "fieldName": "create" }
                            ]}
                        }],
                        "requestId": "req-42"
                    }
                ]
            }
        }))
        .unwrap();

        let detail = envelope.error.google_ads_failure().unwrap();
        assert_eq!(detail.request_id.as_deref(), Some("req-42"));
        assert_eq!(detail.errors.len(), 1);
        assert_eq!(
            detail.errors[0].field_names().collect::<Vec<_>>(),
            vec!["operations", "create"]
        );
        assert_eq!(detail.errors[0].error_code["rangeError"], "TOO_LOW");
    }

    #[test]
    fn test_field_path_index_accepts_string_or_number() {
        let elements: Vec<FieldPathElement> = serde_json::from_value(json!([
            { "fieldName": "operations", "index": "1" },
            { "fieldName": "operations", "index": 2 },
            { "fieldName": "create" }
        ]))
        .unwrap();

        assert_eq!(elements[0].index, Some(1));
        assert_eq!(elements[1].index, Some(2));
        assert_eq!(elements[2].index, None);

        let bad = serde_json::from_value::<FieldPathElement>(
            json!({ "fieldName": "operations", "index": "first" }),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_access_token_expiry() {
        let token = AccessToken::new("abc".to_string(), Utc::now() + Duration::minutes(3));
        assert!(!token.is_expired());
        assert!(token.expires_soon(Duration::minutes(5)));
        assert!(!token.expires_soon(Duration::minutes(1)));
    }
}
