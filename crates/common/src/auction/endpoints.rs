//! HTTP entry point for `POST /v2/auction/{ad_type}`.

use error_stack::{Report, ResultExt};
use http::{header, HeaderMap, Response, StatusCode};
use serde_json::json;
use validator::Validate;

use crate::ad::AdType;
use crate::constants::HEADER_X_BIDON_VERSION;
use crate::error::{BidonError, IntoHttpResponse};
use crate::event::LoggerEngine;
use crate::geo::GeoData;
use crate::schema::{AuctionRequest, SdkVersion};
use crate::segment::SegmentFetcher;

use super::config::ConfigFetcher;
use super::orchestrator::AuctionOrchestrator;

/// Decodes and validates an auction request.
///
/// # Errors
///
/// - [`BidonError::InvalidSdkVersion`] when the version header is missing or malformed
/// - [`BidonError::BadRequest`] for an unknown ad type, an undecodable body or a failed validation
pub fn parse_auction_request(
    ad_type_path: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<AuctionRequest, Report<BidonError>> {
    let sdk_version = headers
        .get(HEADER_X_BIDON_VERSION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    SdkVersion::parse(&sdk_version)?;

    let ad_type = AdType::from_path(ad_type_path).ok_or_else(|| {
        Report::new(BidonError::BadRequest {
            message: format!("unknown ad type '{ad_type_path}'"),
        })
    })?;

    let mut request: AuctionRequest =
        serde_json::from_slice(body).change_context(BidonError::BadRequest {
            message: "failed to decode auction request".to_string(),
        })?;
    request
        .validate()
        .change_context(BidonError::BadRequest {
            message: "auction request failed validation".to_string(),
        })?;

    request.ad_type = ad_type;
    request.sdk_version = sdk_version;
    Ok(request)
}

/// Renders an error as the JSON body SDKs expect.
#[must_use]
pub fn to_error_response(report: &Report<BidonError>) -> Response<Vec<u8>> {
    let error = report.current_context();
    json_response(
        error.status_code(),
        &json!({ "error": { "code": error.status_code().as_u16(), "message": error.user_message() } }),
    )
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Vec<u8>> {
    let mut response = Response::new(body.to_string().into_bytes());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

/// Handles one auction call end to end.
///
/// `app_id` and `geo` are resolved upstream from the app key and client IP.
pub async fn handle_auction<S, C, E>(
    orchestrator: &AuctionOrchestrator<S, C, E>,
    ad_type_path: &str,
    headers: &HeaderMap,
    body: &[u8],
    app_id: i64,
    geo: &GeoData,
) -> Response<Vec<u8>>
where
    S: SegmentFetcher,
    C: ConfigFetcher,
    E: LoggerEngine,
{
    let request = match parse_auction_request(ad_type_path, headers, body) {
        Ok(request) => request,
        Err(report) => {
            log::info!("Rejected auction request: {:?}", report);
            return to_error_response(&report);
        }
    };

    match orchestrator.run(app_id, request, geo).await {
        Ok(response) => json_response(StatusCode::OK, &response.to_value()),
        Err(report) => {
            if report.current_context().is_categorical() {
                log::info!("Auction finished without ads: {}", report.current_context());
            } else {
                log::error!("Auction failed: {:?}", report);
            }
            to_error_response(&report)
        }
    }
}
