mod common;

use axum::http::StatusCode;
use secrecy::Secret;
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use owlstore::domain::LocationBatch;
use owlstore::infrastructure::AppState;
use owlstore::seed;
use owlstore::services::location_service;

use common::{admin, app, customer, get, post, setup, setup_with, test_config};

async fn seeded(state: &AppState) {
    location_service::clear_cache();
    let counts = seed::seed_locations(state).await.expect("seed");
    assert_eq!(counts.provinces, 3);
}

#[tokio::test]
#[serial]
async fn test_browse_the_hierarchy() {
    let state = setup().await;
    seeded(&state).await;
    let app = app(&state);

    let (status, provinces) = get(&app, "/api/locations/provinces", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = provinces
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Hà Nội", "Hồ Chí Minh", "Đà Nẵng"]);

    let (_, districts) = get(&app, "/api/locations/provinces/01/districts", None).await;
    assert_eq!(districts.as_array().unwrap().len(), 2);

    let (_, wards) = get(&app, "/api/locations/districts/001/wards", None).await;
    assert_eq!(wards.as_array().unwrap().len(), 3);

    let (status, ward) = get(&app, "/api/locations/wards/00004", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ward["name_with_type"], "Phường Trúc Bạch");

    let (status, _) = get(&app, "/api/locations/provinces/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, stats) = get(&app, "/api/locations/statistics", None).await;
    assert_eq!(stats, json!({ "provinces": 3, "districts": 4, "wards": 9 }));
}

#[tokio::test]
#[serial]
async fn test_search_ignores_diacritics() {
    let state = setup().await;
    seeded(&state).await;
    let app = app(&state);

    let (status, found) = get(&app, "/api/locations/search?q=phuc", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["wards"].as_array().unwrap().len(), 3);
    assert!(found["provinces"].as_array().unwrap().is_empty());

    let (_, found) = get(&app, "/api/locations/search?q=p", None).await;
    assert!(found["wards"].as_array().unwrap().is_empty());

    let (_, results) = get(
        &app,
        "/api/locations/autocomplete?q=ben%20nghe&level=ward",
        None,
    )
    .await;
    assert_eq!(results[0]["code"], "26740");
    assert_eq!(results[0]["type"], "ward");
    assert_eq!(results[0]["parent"]["code"], "760");
    assert_eq!(results[0]["parent"]["province"]["code"], "79");

    let (_, results) = get(&app, "/api/locations/autocomplete?q=ha%20noi", None).await;
    assert_eq!(results[0]["type"], "province");
    assert!(results[0]["parent"].is_null());
}

#[tokio::test]
#[serial]
async fn test_resolve_and_validate() {
    let state = setup().await;
    seeded(&state).await;
    let app = app(&state);

    let (status, resolved) = get(&app, "/api/locations/resolve/00037", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["district_code"], "002");
    assert_eq!(resolved["province_code"], "01");
    assert_eq!(
        resolved["full_address"],
        "Phường Phúc Tân, Quận Hoàn Kiếm, Thành phố Hà Nội"
    );

    let (status, _) = get(&app, "/api/locations/resolve/99999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = post(
        &app,
        "/api/locations/validate",
        None,
        json!({ "province_code": "01", "district_code": "002", "ward_code": "00037" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    // Ward from another district
    let (_, body) = post(
        &app,
        "/api/locations/validate",
        None,
        json!({ "province_code": "01", "district_code": "001", "ward_code": "00037" }),
    )
    .await;
    assert_eq!(body["valid"], false);

    let (status, body) = post(
        &app,
        "/api/locations/validate",
        None,
        json!({ "province_code": "01", "ward_code": "00037" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "All codes are required");
}

#[tokio::test]
#[serial]
async fn test_import_requires_admin_and_upserts() {
    let state = setup().await;
    location_service::clear_cache();
    let app = app(&state);
    let (_, buyer) = customer(&state, "lan@example.vn").await;
    let (_, admin_token) = admin(&state).await;

    let payload = json!({
        "provinces": [{
            "code": "92",
            "name": "Cần Thơ",
            "type": "thanh-pho",
            "districts": [{
                "code": "916",
                "name": "Ninh Kiều",
                "type": "quan",
                "wards": [{ "code": "31117", "name": "Cái Khế", "type": "phuong" }],
            }],
        }],
    });

    let (status, _) = post(&app, "/api/locations/admin/import", Some(&buyer), payload.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, counts) = post(&app, "/api/locations/admin/import", Some(&admin_token), payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(counts, json!({ "provinces": 1, "districts": 1, "wards": 1 }));

    // Re-importing the same codes updates in place
    post(&app, "/api/locations/admin/import", Some(&admin_token), payload).await;
    let (_, stats) = get(&app, "/api/locations/statistics", None).await;
    assert_eq!(stats, json!({ "provinces": 1, "districts": 1, "wards": 1 }));

    let (_, resolved) = get(&app, "/api/locations/resolve/31117", None).await;
    // Without name_with_type the plain name is used
    assert_eq!(resolved["full_address"], "Cái Khế, Ninh Kiều, Cần Thơ");
}

#[tokio::test]
#[serial]
async fn test_ghn_sync_maps_carrier_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/province"))
        .and(header("Token", "ghn-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "Success",
            "data": [
                { "ProvinceID": 201, "ProvinceName": "Hà Nội", "NameExtension": ["TP.Hà Nội"] },
                { "ProvinceID": 999, "ProvinceName": "Atlantis" },
            ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/district"))
        .and(body_json(json!({ "province_id": 201 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "Success",
            "data": [{ "DistrictID": 1484, "DistrictName": "Quận Ba Đình" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/district"))
        .and(body_json(json!({ "province_id": 999 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "Success", "data": [],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ward"))
        .and(body_json(json!({ "district_id": 1484 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "Success",
            "data": [
                { "WardCode": "1A0101", "WardName": "Phường Phúc Xá" },
                { "WardCode": "1A0199", "WardName": "Phường Không Tồn Tại" },
            ],
        })))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.ghn_api_url = server.uri();
    config.ghn_api_token = Some(Secret::new("ghn-secret".to_string()));
    let state = setup_with(config).await;
    seeded(&state).await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;

    let (status, report) = post(&app, "/api/locations/admin/sync-ghn", Some(&admin_token), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["provinces"], json!({ "matched": 1, "unmatched": 1 }));
    assert_eq!(report["districts"], json!({ "matched": 1, "unmatched": 0 }));
    assert_eq!(report["wards"], json!({ "matched": 1, "unmatched": 1 }));

    let (_, province) = get(&app, "/api/locations/provinces/01", None).await;
    assert_eq!(province["ghn_id"], 201);
    let (_, ward) = get(&app, "/api/locations/wards/00001", None).await;
    assert_eq!(ward["ghn_code"], "1A0101");

    // Carrier ids survive a re-import
    seed::seed_locations(&state).await.expect("seed");
    let (_, district) = get(&app, "/api/locations/districts/001", None).await;
    assert_eq!(district["ghn_id"], 1484);
}

#[tokio::test]
#[serial]
async fn test_ghn_sync_needs_a_token() {
    let state = setup().await;
    seeded(&state).await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;

    let (status, body) = post(&app, "/api/locations/admin/sync-ghn", Some(&admin_token), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "GHN_API_TOKEN is not configured");
}

#[tokio::test]
#[serial]
async fn test_import_is_all_or_nothing() {
    let state = setup().await;
    location_service::clear_cache();
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;

    let payload = json!({
        "provinces": [
            { "code": "92", "name": "Cần Thơ", "districts": [] },
            {
                "code": "93",
                "name": "Hậu Giang",
                "districts": [{ "code": "", "name": "Vị Thanh" }],
            },
        ],
    });
    let (status, body) = post(&app, "/api/locations/admin/import", Some(&admin_token), payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Every district needs a code and a name");

    let (_, stats) = get(&app, "/api/locations/statistics", None).await;
    assert_eq!(stats, json!({ "provinces": 0, "districts": 0, "wards": 0 }));
}

#[tokio::test]
#[serial]
async fn test_failed_ghn_sync_writes_nothing_and_drops_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/province"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "Success",
            "data": [{ "ProvinceID": 201, "ProvinceName": "Hà Nội" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/district"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "Success",
            "data": [{ "DistrictID": 1484, "DistrictName": "Quận Ba Đình" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ward"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.ghn_api_url = server.uri();
    config.ghn_api_token = Some(Secret::new("ghn-secret".to_string()));
    let state = setup_with(config).await;
    seeded(&state).await;
    let app = app(&state);
    let (_, admin_token) = admin(&state).await;

    // Warm the cache, then change the row behind its back
    let (_, before) = get(&app, "/api/locations/provinces/01", None).await;
    assert_eq!(before["sort_order"], 1);
    let mut row = state.location_repo.province("01").await.unwrap().unwrap();
    row.sort_order = 7;
    state
        .location_repo
        .write_batch(LocationBatch {
            provinces: vec![row],
            ..Default::default()
        })
        .await
        .unwrap();

    let (status, body) = post(&app, "/api/locations/admin/sync-ghn", Some(&admin_token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY, "{}", body);

    let (_, after) = get(&app, "/api/locations/provinces/01", None).await;
    assert_eq!(after["sort_order"], 7);
    assert!(after["ghn_id"].is_null());
    let (_, district) = get(&app, "/api/locations/districts/001", None).await;
    assert!(district["ghn_id"].is_null());
}
