//! Effective price floor of an auction.

use crate::schema::AuctionRequest;

use super::config::AuctionConfig;

/// Mediators that cascade client-side and report the previous winner's price.
pub const DEFAULT_CUSTOM_MEDIATORS: [&str; 2] = ["max", "level_play"];

/// Folds the request, cache, config and mediator floors into one value.
///
/// The previous auction price only counts for custom mediators, and only when
/// it is a finite number.
#[must_use]
pub fn effective_price_floor<S: AsRef<str>>(
    request: &AuctionRequest,
    config: &AuctionConfig,
    custom_mediators: &[S],
) -> f64 {
    let cache_max = request
        .ad_cache
        .iter()
        .map(|cached| cached.price)
        .fold(request.imp.price_floor, f64::max);
    let floor = cache_max.max(config.price_floor);

    let is_custom = request
        .mediator()
        .is_some_and(|mediator| custom_mediators.iter().any(|m| m.as_ref() == mediator));

    match request.previous_auction_price() {
        Some(previous) if is_custom => floor.max(previous),
        _ => floor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AdCacheObject;

    fn request(floor: f64, cache: &[f64], ext: &str) -> AuctionRequest {
        let mut request = AuctionRequest {
            ext: ext.to_string(),
            ad_cache: cache
                .iter()
                .map(|price| AdCacheObject {
                    demand_id: "admob".to_string(),
                    price: *price,
                })
                .collect(),
            ..Default::default()
        };
        request.imp.price_floor = floor;
        request
    }

    fn config(floor: f64) -> AuctionConfig {
        AuctionConfig {
            price_floor: floor,
            ..Default::default()
        }
    }

    fn floor(request: &AuctionRequest, config: &AuctionConfig) -> f64 {
        effective_price_floor(request, config, &DEFAULT_CUSTOM_MEDIATORS)
    }

    #[test]
    fn custom_mediator_previous_price_raises_floor() {
        let req = request(
            0.01,
            &[0.02],
            r#"{"mediator":"max","previous_auction_price":0.25}"#,
        );
        assert_eq!(floor(&req, &config(0.05)), 0.25);
    }

    #[test]
    fn custom_mediator_previous_price_below_config() {
        let req = request(
            0.01,
            &[0.02],
            r#"{"mediator":"max","previous_auction_price":0.03}"#,
        );
        assert_eq!(floor(&req, &config(0.05)), 0.05);
    }

    #[test]
    fn non_custom_mediator_ignores_previous_price() {
        let req = request(
            0.01,
            &[0.02],
            r#"{"mediator":"regular","previous_auction_price":0.25}"#,
        );
        assert_eq!(floor(&req, &config(0.05)), 0.05);

        let req = request(0.01, &[0.02], r#"{"previous_auction_price":0.25}"#);
        assert_eq!(floor(&req, &config(0.05)), 0.05);
    }

    #[test]
    fn highest_cached_price_wins() {
        let req = request(0.01, &[0.02, 0.07, 0.03], "");
        assert_eq!(floor(&req, &config(0.05)), 0.07);
    }

    #[test]
    fn request_floor_and_empty_cache() {
        let req = request(0.4, &[], "");
        assert_eq!(floor(&req, &config(0.05)), 0.4);
        assert_eq!(floor(&request(0.0, &[], ""), &config(0.0)), 0.0);
    }

    #[test]
    fn level_play_negative_previous_price_does_not_lower_floor() {
        let req = request(
            0.01,
            &[],
            r#"{"mediator":"level_play","previous_auction_price":-1.0}"#,
        );
        assert_eq!(floor(&req, &config(0.05)), 0.05);
    }

    #[test]
    fn custom_mediator_set_is_configurable() {
        let req = request(
            0.0,
            &[],
            r#"{"mediator":"regular","previous_auction_price":0.9}"#,
        );
        assert_eq!(effective_price_floor(&req, &config(0.1), &["regular"]), 0.9);
    }
}
