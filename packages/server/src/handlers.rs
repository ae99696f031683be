//! HTTP handler functions for the parcel API.
//!
//! Lookups never fail once their parameters are valid: source failures
//! are absorbed by the resolver and surface as an empty collection.

use actix_web::{HttpResponse, web};
use parcel_api_server_models::{
    ApiError, ApiHealth, ApiRoot, ApnQueryParams, BboxQueryParams, InvalidParam,
    PointQueryParams,
};

use crate::AppState;

fn bad_request(err: InvalidParam) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::from(err))
}

/// `GET /`
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(ApiRoot::default())
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /parcels`
///
/// Parcels intersecting a bounding box.
pub async fn parcels_in_bbox(
    state: web::Data<AppState>,
    params: web::Query<BboxQueryParams>,
) -> HttpResponse {
    let limit = match params.limit() {
        Ok(limit) => limit,
        Err(e) => return bad_request(e),
    };

    let collection = state.resolver.by_bbox(params.bbox(), limit).await;
    HttpResponse::Ok().json(collection)
}

/// `GET /parcels/point`
///
/// Parcels containing a point.
pub async fn parcels_at_point(
    state: web::Data<AppState>,
    params: web::Query<PointQueryParams>,
) -> HttpResponse {
    let limit = match params.limit() {
        Ok(limit) => limit,
        Err(e) => return bad_request(e),
    };

    let collection = state.resolver.at_point(params.lon, params.lat, limit).await;
    HttpResponse::Ok().json(collection)
}

/// `GET /parcels/by-apn`
///
/// Parcels matching an assessor parcel number, optionally within a state
/// and county.
pub async fn parcels_by_apn(
    state: web::Data<AppState>,
    params: web::Query<ApnQueryParams>,
) -> HttpResponse {
    let query = match params.into_inner().into_query() {
        Ok(query) => query,
        Err(e) => return bad_request(e),
    };

    let collection = state.resolver.by_apn(query).await;
    HttpResponse::Ok().json(collection)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test, web};
    use parcel_api_parcel_models::ParcelFeature;
    use parcel_api_resolver::Resolver;
    use parcel_api_source::demo::DemoSource;
    use serde_json::json;

    use crate::{AppState, configure};

    fn demo_parcel(apn: &str, owner_key: &str, lon: f64, lat: f64) -> ParcelFeature {
        ParcelFeature::from_value(&json!({
            "type": "Feature",
            "properties": {"apn": apn, (owner_key): "DOE JANE", "state": "TX", "county": "Harris"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [lon, lat], [lon + 0.01, lat], [lon + 0.01, lat + 0.01],
                    [lon, lat + 0.01], [lon, lat]
                ]]
            }
        }))
        .unwrap()
    }

    fn state() -> web::Data<AppState> {
        let demo = DemoSource::from_features(vec![
            demo_parcel("11-444-000-40007", "owner_name", -95.40, 29.70),
            demo_parcel("22-555", "owner", -95.30, 29.80),
            demo_parcel("33-666", "owner", -95.29, 29.80),
        ]);
        let resolver = Resolver::new(None, None, Arc::new(demo));
        web::Data::new(AppState {
            resolver: Arc::new(resolver),
        })
    }

    async fn get_json(uri: &str) -> (u16, serde_json::Value) {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = resp.status().as_u16();
        let body: serde_json::Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn root_lists_endpoints() {
        let (status, body) = get_json("/").await;
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Parcel API");
        assert!(body["endpoints"]["parcels_point"].is_string());
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, 200);
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn bbox_returns_feature_collection() {
        let (status, body) =
            get_json("/parcels?min_lon=-95.5&min_lat=29.6&max_lon=-95.0&max_lat=30.0&limit=2")
                .await;
        assert_eq!(status, 200);
        assert_eq!(body["type"], "FeatureCollection");
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["type"], "Feature");
        assert_eq!(features[0]["properties"]["apn"], "11-444-000-40007");
        assert_eq!(features[0]["properties"]["owner"], "DOE JANE");
        assert_eq!(features[1]["properties"]["apn"], "22-555");
    }

    #[actix_web::test]
    async fn empty_area_is_an_empty_collection() {
        let (status, body) =
            get_json("/parcels?min_lon=10.0&min_lat=10.0&max_lon=11.0&max_lat=11.0").await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({"type": "FeatureCollection", "features": []}));
    }

    #[actix_web::test]
    async fn bbox_limit_over_maximum_is_rejected() {
        let (status, body) =
            get_json("/parcels?min_lon=-95.5&min_lat=29.6&max_lon=-95.0&max_lat=30.0&limit=2001")
                .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "limit must be at most 2000 (got 2001)");
    }

    #[actix_web::test]
    async fn missing_parameter_is_a_json_400() {
        let (status, body) = get_json("/parcels?min_lon=-95.5&min_lat=29.6").await;
        assert_eq!(status, 400);
        assert!(body["error"].is_string());

        let (status, _) = get_json("/parcels/point?lat=29.7").await;
        assert_eq!(status, 400);
    }

    #[actix_web::test]
    async fn point_lookup_uses_demo_envelope() {
        let (status, body) = get_json("/parcels/point?lat=29.705&lon=-95.395").await;
        assert_eq!(status, 200);
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["apn"], "11-444-000-40007");

        let (status, _) = get_json("/parcels/point?lat=29.705&lon=-95.395&limit=21").await;
        assert_eq!(status, 400);
    }

    #[actix_web::test]
    async fn apn_lookup_ignores_formatting() {
        let (status, body) = get_json("/parcels/by-apn?apn=1144400040007").await;
        assert_eq!(status, 200);
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["properties"]["apn"], "11-444-000-40007");
    }

    #[actix_web::test]
    async fn apn_lookup_applies_state_and_county_together() {
        let (_, body) = get_json("/parcels/by-apn?apn=22555&state=tx&county=harris").await;
        assert_eq!(body["features"].as_array().unwrap().len(), 1);

        let (_, body) = get_json("/parcels/by-apn?apn=22555&state=CA&county=Orange").await;
        assert!(body["features"].as_array().unwrap().is_empty());

        let (_, body) = get_json("/parcels/by-apn?apn=22555&state=CA").await;
        assert_eq!(body["features"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn blank_apn_is_rejected() {
        let (status, body) = get_json("/parcels/by-apn?apn=%20").await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "apn must not be blank");

        let (status, _) = get_json("/parcels/by-apn").await;
        assert_eq!(status, 400);
    }
}
