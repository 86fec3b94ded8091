//! Resource name builders for Google Ads entities.
//!
//! Resource names are account-scoped paths such as
//! `customers/1234567890/adGroups/42`. Identifiers are inserted verbatim.

/// Canonical resource name of an ad group.
pub fn ad_group_path(customer_id: &str, ad_group_id: &str) -> String {
    format!("customers/{customer_id}/adGroups/{ad_group_id}")
}

/// Canonical resource name of an ad group bid modifier.
///
/// `leaf` is the composite `{ad_group_id}_{criterion_id}` identifier, see
/// [`composite_id`].
pub fn ad_group_bid_modifier_path(customer_id: &str, leaf: &str) -> String {
    format!("customers/{customer_id}/adGroupBidModifiers/{leaf}")
}

/// Joins two identifiers into a composite resource leaf.
pub fn composite_id(first: impl std::fmt::Display, second: impl std::fmt::Display) -> String {
    format!("{first}_{second}")
}
