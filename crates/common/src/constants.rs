use http::header::HeaderName;

pub const HEADER_X_BIDON_VERSION: HeaderName = HeaderName::from_static("x-bidon-version");

/// Auction timeout used when a configuration carries a non-positive value.
pub const DEFAULT_AUCTION_TIMEOUT_MS: u32 = 30_000;

/// Per ad-unit load timeout handed to the SDK.
pub const DEFAULT_AD_UNIT_TIMEOUT_MS: i32 = 6_000;
pub const ADMOB_AD_UNIT_TIMEOUT_MS: i32 = 10_000;

/// Opaque auction token returned to the SDK. Token signing is not implemented.
pub const EMPTY_AUCTION_TOKEN: &str = "{}";
