use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;

pub const MOCK_ACCESS_TOKEN: &str = "mock_access_token_12345";

pub fn mock_oauth_token(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/token")
            .body_contains("grant_type=refresh_token");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "access_token": MOCK_ACCESS_TOKEN,
                "expires_in": 3599,
                "token_type": "Bearer"
            }));
    })
}

pub fn mock_oauth_token_invalid_grant(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST).path("/token");
        then.status(400)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            }));
    })
}

fn mutate_path(customer_id: &str) -> String {
    format!("/v0/customers/{customer_id}/adGroupBidModifiers:mutate")
}

pub fn mock_mutate_bid_modifiers<'a>(
    server: &'a MockServer,
    customer_id: &str,
    resource_names: &[&str],
) -> Mock<'a> {
    let results: Vec<_> = resource_names
        .iter()
        .map(|name| json!({ "resourceName": name }))
        .collect();

    server.mock(|when, then| {
        when.method(POST)
            .path(mutate_path(customer_id))
            .header("authorization", format!("Bearer {MOCK_ACCESS_TOKEN}"));
        then.status(200)
            .header("content-type", "application/json")
            .header("request-id", "mock-request-ok")
            .json_body(json!({ "results": results }));
    })
}

/// Rejects the batch with a `GoogleAdsFailure`. Each error is a message and
/// its field path.
pub fn mock_mutate_bid_modifiers_failure<'a>(
    server: &'a MockServer,
    customer_id: &str,
    request_id: &str,
    status: &str,
    errors: &[(&str, &[&str])],
) -> Mock<'a> {
    let errors: Vec<_> = errors
        .iter()
        .map(|(message, fields)| {
            let elements: Vec<_> = fields
                .iter()
                .map(|field| json!({ "fieldName": field }))
                .collect();
            json!({
                "errorCode": { "fieldError": "INVALID_VALUE" },
                "message": message,
                "location": { "fieldPathElements": elements }
            })
        })
        .collect();

    server.mock(|when, then| {
        when.method(POST).path(mutate_path(customer_id));
        then.status(400)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": {
                    "code": 400,
                    "message": "Request contains an invalid argument.",
                    "status": status,
                    "details": [{
                        "@type": "type.googleapis.com/google.ads.googleads.v0.errors.GoogleAdsFailure",
                        "errors": errors,
                        "requestId": request_id
                    }]
                }
            }));
    })
}

pub fn mock_mutate_bid_modifiers_unavailable<'a>(
    server: &'a MockServer,
    customer_id: &str,
) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST).path(mutate_path(customer_id));
        then.status(503)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": {
                    "code": 503,
                    "message": "The service is currently unavailable.",
                    "status": "UNAVAILABLE"
                }
            }));
    })
}
