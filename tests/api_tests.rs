use axum::http::StatusCode;
use routeweaver::error::ProviderError;
use serde_json::json;
use std::collections::HashSet;
use tower::ServiceExt;

mod common;

use common::{body_json, build_app, get, post_json, RuleGenerator, StubRouting, TestDeps};

fn kochi_munnar_generator() -> RuleGenerator {
    RuleGenerator::failing()
        .with_rule("driving route", Ok(common::KOCHI_MUNNAR_ANSWER.to_string()))
        .with_rule(
            "Estimate the cost",
            Ok("Here you go:\n```json\n{\"fuel\": \"INR 3,000\", \"totalCost\": \"INR 14,500\"}\n```\nEnjoy!".to_string()),
        )
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = build_app(&TestDeps::new(RuleGenerator::failing()));

    let response = app.oneshot(get("/debug/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["database"]["backend"], "memory");
    assert_eq!(json["checks"]["cache"]["backend"], "memory");
    assert_eq!(json["checks"]["routing"], "stub");
}

#[tokio::test]
async fn test_suggestions_require_origin_and_destination() {
    let app = build_app(&TestDeps::new(RuleGenerator::failing()));

    let response = app
        .oneshot(post_json("/suggest/suggestions", json!({"origin": "Kochi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Origin and destination are required");
}

#[tokio::test]
async fn test_suggestions_have_no_duplicate_names_and_are_cached() {
    let deps = TestDeps::new(kochi_munnar_generator());
    let app = build_app(&deps);
    let request = json!({"origin": "Kochi", "destination": "Munnar", "keyword": "waterfalls"});

    let response = app
        .clone()
        .oneshot(post_json("/suggest/suggestions", request.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);

    let names: Vec<String> = json["primary"]
        .as_array()
        .unwrap()
        .iter()
        .chain(json["secondary"].as_array().unwrap())
        .map(|p| p["name"].as_str().unwrap().to_lowercase())
        .collect();
    assert_eq!(json["primary"].as_array().unwrap().len(), 8);
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len());

    let prompts = deps.generator.prompt_count();
    let response = app
        .oneshot(post_json("/suggest/suggestions", request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(deps.generator.prompt_count(), prompts);
}

#[tokio::test]
async fn test_fallback_suggestions_are_not_cached_through_an_outage() {
    let deps = TestDeps::new(kochi_munnar_generator().in_outage());
    let app = build_app(&deps);
    let request = json!({"origin": "Kochi", "destination": "Munnar"});

    let response = app
        .clone()
        .oneshot(post_json("/suggest/suggestions", request.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["primary"][0]["name"], "Vagamon");

    deps.generator.recover();

    let response = app
        .oneshot(post_json("/suggest/suggestions", request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["primary"][0]["name"], "Cheeyappara Waterfalls");
    assert_eq!(json["primary"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_suggestion_photos_survive_failed_lookups() {
    let deps = TestDeps::new(kochi_munnar_generator()).with_places(common::DamPhotos);
    let app = build_app(&deps);

    let response = app
        .oneshot(post_json(
            "/suggest/suggestions",
            json!({"origin": "Kochi", "destination": "Munnar"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    for place in json["primary"].as_array().unwrap() {
        let name = place["name"].as_str().unwrap();
        if name.contains("Dam") {
            assert!(place["imageUrl"].as_str().unwrap().starts_with("https://photos.test/"));
        } else {
            assert!(place.get("imageUrl").is_none(), "{} should have no photo", name);
        }
    }
}

#[tokio::test]
async fn test_route_falls_back_when_router_times_out() {
    let deps = TestDeps::new(RuleGenerator::failing())
        .with_routing(StubRouting::failing(ProviderError::Timeout));
    let app = build_app(&deps);

    let response = app
        .oneshot(post_json(
            "/suggest/route",
            json!({
                "origin": {"latitude": 9.9312, "longitude": 76.2673},
                "destination": {"latitude": 10.0889, "longitude": 77.0595},
                "waypoints": [{
                    "name": "Bhoothathankettu Dam",
                    "coordinates": {"latitude": 10.1380, "longitude": 76.6640}
                }]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["route"]["isFallback"], true);
    assert_eq!(json["route"]["fallbackReason"], "provider_timeout");
    assert!(json["route"]["geometry"].as_array().unwrap().len() >= 2);
    assert!(json["route"]["distanceMeters"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_route_rejects_invalid_coordinates() {
    let app = build_app(&TestDeps::new(RuleGenerator::failing()));

    let response = app
        .oneshot(post_json(
            "/suggest/route",
            json!({
                "origin": {"latitude": 95.0, "longitude": 76.2673},
                "destination": {"latitude": 10.0889, "longitude": 77.0595}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_geocode_endpoint() {
    let app = build_app(&TestDeps::new(RuleGenerator::failing()));

    let response = app.clone().oneshot(get("/suggest/geocode")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/suggest/geocode?place=Atlantis"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/suggest/geocode?place=Munnar")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["source"], "nominatim");
    assert_eq!(json["confidence"], "medium");
    assert_eq!(json["coordinates"]["latitude"], 10.0889);
}

#[tokio::test]
async fn test_cost_estimate_from_fenced_json() {
    let app = build_app(&TestDeps::new(kochi_munnar_generator()));

    let response = app
        .oneshot(post_json(
            "/travel/cost",
            json!({"origin": "Kochi", "destination": "Munnar", "numPeople": 3}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["totalCost"], "INR 14,500");
    assert_eq!(json["breakdown"]["fuel"], "INR 3,000");
}

#[tokio::test]
async fn test_cost_estimate_degrades_when_generator_fails() {
    let app = build_app(&TestDeps::new(RuleGenerator::failing()));

    let response = app
        .oneshot(post_json(
            "/travel/cost",
            json!({"origin": "Kochi", "destination": "Munnar"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["totalCost"], "unknown");
    assert_eq!(json["error"], "failed to generate cost estimate");
}

#[tokio::test]
async fn test_nearby_needs_both_coordinates_or_a_location() {
    let app = build_app(&TestDeps::new(RuleGenerator::failing()));

    let response = app
        .clone()
        .oneshot(get("/travel/nearby?lat=9.93"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/travel/nearby?lat=9.9312&lng=76.2673"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["origin"], "Kochi, Kerala");
    // the generator is down, so these are the fixed fallbacks
    assert!(!json["places"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_popular_without_places_provider_is_upstream_error() {
    let app = build_app(&TestDeps::new(RuleGenerator::failing()));

    let response = app
        .oneshot(get("/travel/popular?origin=Kochi"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["success"], false);
}

#[tokio::test]
async fn test_popular_destinations_window() {
    let deps = TestDeps::new(RuleGenerator::failing()).with_places(common::DamPhotos);
    let app = build_app(&deps);

    let response = app
        .clone()
        .oneshot(get("/travel/popular?origin=Kochi&minKm=30&maxKm=150&limit=1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["destinations"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get("/travel/popular?origin=Kochi&minKm=150&maxKm=30"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_smartvacay_validation_and_bands() {
    let app = build_app(&TestDeps::new(RuleGenerator::failing()));

    let response = app
        .clone()
        .oneshot(get("/smartvacay/suggestions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get("/smartvacay/suggestions?location=Kochi&tripDays=0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get("/smartvacay/suggestions?location=Kochi&tripDays=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["shortDistance"].is_array());
    assert!(json["mediumDistance"].is_array());
    assert!(json["longDistance"].is_array());
}

#[tokio::test]
async fn test_rate_limit_spares_health_checks() {
    let deps = TestDeps::new(RuleGenerator::failing()).with_rate_limit(1);
    let app = build_app(&deps);

    let geocode = || {
        let mut request = get("/suggest/geocode?place=Kochi");
        request
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.4".parse().unwrap());
        request
    };

    let first = app.clone().oneshot(geocode()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(geocode()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(second).await["success"], false);

    let health = app.oneshot(get("/debug/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}
