//! Hotel ad group bid modifier submission.
//!
//! Two modifiers are created on a hotel ad group in a single batch:
//!
//! - a check-in-day modifier. The check-in day is selected by the criterion
//!   id embedded in the resource name, so no ad group is set on it;
//! - a length-of-stay modifier, which sets the ad group instead of a
//!   resource name.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;

use crate::client::{Error, GoogleAdsException};
use crate::client_trait::BidModifierClient;
use crate::model::{
    AdGroupBidModifier, AdGroupBidModifierOperation, HotelCheckInDayInfo, HotelLengthOfStayInfo,
    MutateAdGroupBidModifiersResponse,
};
use crate::resources::{ad_group_bid_modifier_path, ad_group_path, composite_id};

/// Criterion id of Monday in the check-in-day criteria table
pub const DEFAULT_CHECK_IN_CRITERION_ID: i64 = 60;
pub const CHECK_IN_DAY_BID_MODIFIER: f64 = 1.5;
pub const LENGTH_OF_STAY_BID_MODIFIER: f64 = 1.7;
pub const MIN_NIGHTS: i64 = 3;
pub const MAX_NIGHTS: i64 = 7;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "add_hotel_ad_group_bid_modifiers")]
#[command(about = "Adds ad group bid modifiers to a hotel ad group.")]
pub struct BidModifierArgs {
    /// The Google Ads customer ID
    #[arg(short = 'c', long = "customer_id")]
    pub customer_id: String,

    /// The ad group ID of the hotel ad group
    #[arg(short = 'a', long = "ad_group_id")]
    pub ad_group_id: String,

    /// The criterion ID referring to the check-in day. Defaults to 60, which
    /// selects Monday. See the table of check-in days and criterion IDs at
    /// https://developers.google.com/google-ads/api/docs/hotel-ads/create-ad-group-bid-modifier
    #[arg(
        short = 'd',
        long = "check_in_criterion_id",
        default_value_t = DEFAULT_CHECK_IN_CRITERION_ID,
        allow_negative_numbers = true
    )]
    pub check_in_criterion_id: i64,

    /// Path to google-ads.yaml (defaults to the home directory)
    #[arg(long = "config", env = "GOOGLE_ADS_CONFIGURATION_FILE_PATH")]
    pub config: Option<PathBuf>,
}

/// How a submission ended when the API answered
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Resource names of the created modifiers, in operation order
    Created(Vec<String>),
    Rejected(GoogleAdsException),
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Created(_) => 0,
            Outcome::Rejected(_) => 1,
        }
    }
}

pub fn check_in_day_operation(
    customer_id: &str,
    ad_group_id: &str,
    check_in_criterion_id: i64,
) -> AdGroupBidModifierOperation {
    let leaf = composite_id(ad_group_id, check_in_criterion_id);
    AdGroupBidModifierOperation {
        create: AdGroupBidModifier {
            resource_name: Some(ad_group_bid_modifier_path(customer_id, &leaf)),
            bid_modifier: Some(CHECK_IN_DAY_BID_MODIFIER),
            hotel_check_in_day: Some(HotelCheckInDayInfo {}),
            ..AdGroupBidModifier::default()
        },
    }
}

pub fn length_of_stay_operation(customer_id: &str, ad_group_id: &str) -> AdGroupBidModifierOperation {
    AdGroupBidModifierOperation {
        create: AdGroupBidModifier {
            ad_group: Some(ad_group_path(customer_id, ad_group_id)),
            bid_modifier: Some(LENGTH_OF_STAY_BID_MODIFIER),
            hotel_length_of_stay: Some(HotelLengthOfStayInfo {
                min_nights: Some(MIN_NIGHTS),
                max_nights: Some(MAX_NIGHTS),
            }),
            ..AdGroupBidModifier::default()
        },
    }
}

/// The batch submitted per run: check-in day first, then length of stay
pub fn build_operations(args: &BidModifierArgs) -> Vec<AdGroupBidModifierOperation> {
    vec![
        check_in_day_operation(&args.customer_id, &args.ad_group_id, args.check_in_criterion_id),
        length_of_stay_operation(&args.customer_id, &args.ad_group_id),
    ]
}

/// Submits both modifiers and writes the result to `out`.
///
/// A validation failure from the API is rendered and returned as
/// [`Outcome::Rejected`].
///
/// # Errors
///
/// Transport, authentication and parsing errors are returned untouched, as
/// are failures to write to `out`
pub async fn run<C, W>(client: &C, args: &BidModifierArgs, out: &mut W) -> Result<Outcome, Error>
where
    C: BidModifierClient + ?Sized,
    W: Write,
{
    let operations = build_operations(args);
    tracing::debug!(
        "Submitting {} bid modifier operations for customer {} ad group {}",
        operations.len(),
        args.customer_id,
        args.ad_group_id
    );

    match client
        .mutate_ad_group_bid_modifiers(&args.customer_id, operations)
        .await
    {
        Ok(response) => {
            render_created(out, &response)?;
            Ok(Outcome::Created(
                response
                    .results
                    .into_iter()
                    .map(|result| result.resource_name)
                    .collect(),
            ))
        }
        Err(Error::GoogleAds(exception)) => {
            render_failure(out, &exception)?;
            Ok(Outcome::Rejected(exception))
        }
        Err(other) => Err(other),
    }
}

pub fn render_created<W: Write>(
    out: &mut W,
    response: &MutateAdGroupBidModifiersResponse,
) -> std::io::Result<()> {
    writeln!(
        out,
        "Added {} hotel ad group bid modifiers:",
        response.results.len()
    )?;
    for result in &response.results {
        writeln!(out, "{}", result.resource_name)?;
    }
    Ok(())
}

pub fn render_failure<W: Write>(out: &mut W, exception: &GoogleAdsException) -> std::io::Result<()> {
    writeln!(
        out,
        "Request with ID \"{}\" failed with status \"{}\" and includes the following errors:",
        exception.request_id, exception.code
    )?;
    for error in &exception.failure.errors {
        writeln!(out, "\tError with message \"{}\".", error.message)?;
        for field_name in error.field_names() {
            writeln!(out, "\t\tOn field: {field_name}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoogleAdsError, GoogleAdsFailure, MutateAdGroupBidModifierResult};

    fn args(customer_id: &str, ad_group_id: &str, criterion_id: i64) -> BidModifierArgs {
        BidModifierArgs {
            customer_id: customer_id.to_string(),
            ad_group_id: ad_group_id.to_string(),
            check_in_criterion_id: criterion_id,
            config: None,
        }
    }

    #[test]
    fn test_check_in_day_operation() {
        let op = check_in_day_operation("1234567890", "555", 61);
        assert_eq!(
            op.create.resource_name.as_deref(),
            Some("customers/1234567890/adGroupBidModifiers/555_61")
        );
        assert_eq!(op.create.bid_modifier, Some(1.5));
        assert_eq!(op.create.hotel_check_in_day, Some(HotelCheckInDayInfo {}));
        assert_eq!(op.create.ad_group, None);
        assert_eq!(op.create.hotel_length_of_stay, None);
    }

    #[test]
    fn test_length_of_stay_operation() {
        let op = length_of_stay_operation("1234567890", "555");
        assert_eq!(
            op.create.ad_group.as_deref(),
            Some("customers/1234567890/adGroups/555")
        );
        assert_eq!(op.create.bid_modifier, Some(1.7));
        let info = op.create.hotel_length_of_stay.unwrap();
        assert_eq!(info.min_nights, Some(3));
        assert_eq!(info.max_nights, Some(7));
        assert_eq!(op.create.resource_name, None);
    }

    #[test]
    fn test_build_operations_order() {
        let ops = build_operations(&args("1", "2", 60));
        assert_eq!(ops.len(), 2);
        assert!(ops[0].create.hotel_check_in_day.is_some());
        assert!(ops[1].create.hotel_length_of_stay.is_some());
    }

    #[test]
    fn test_render_created() {
        let response = MutateAdGroupBidModifiersResponse {
            results: vec![
                MutateAdGroupBidModifierResult {
                    resource_name: "r1".to_string(),
                },
                MutateAdGroupBidModifierResult {
                    resource_name: "r2".to_string(),
                },
            ],
        };
        let mut out = Vec::new();
        render_created(&mut out, &response).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Added 2 hotel ad group bid modifiers:\nr1\nr2\n"
        );
    }

    #[test]
    fn test_render_failure_skips_missing_location() {
        let exception = GoogleAdsException {
            request_id: "req-9".to_string(),
            code: "INVALID_ARGUMENT".to_string(),
            failure: GoogleAdsFailure {
                errors: vec![
                    GoogleAdsError::new("no location"),
                    GoogleAdsError::new("nested")
                        .on_field("operations")
                        .on_field("create"),
                ],
            },
        };
        let mut out = Vec::new();
        render_failure(&mut out, &exception).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Request with ID \"req-9\" failed with status \"INVALID_ARGUMENT\" and includes the following errors:\n\
             \tError with message \"no location\".\n\
             \tError with message \"nested\".\n\
             \t\tOn field: operations\n\
             \t\tOn field: create\n"
        );
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Outcome::Created(vec![]).exit_code(), 0);
        let rejected = Outcome::Rejected(GoogleAdsException {
            request_id: String::new(),
            code: String::new(),
            failure: GoogleAdsFailure::default(),
        });
        assert_eq!(rejected.exit_code(), 1);
    }
}
