use hgm_api::store::TOKEN_KEY;
use hgm_api::{
    login_flow, ApiClient, ApiError, ClientConfig, Destination, FamilyRegistration, FamilyUpdate,
    FileKind, KvStore, LoginOutcome, PlantPhotoMeta, RoutingPolicy,
};
use hgm_test_utils::{StubResponse, StubServer};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn client(server: &StubServer) -> ApiClient {
    ApiClient::new(ClientConfig::new(server.url())).unwrap()
}

#[test]
fn test_connection_succeeds_for_any_status_but_404() {
    for status in [200, 401, 500] {
        let server = StubServer::start();
        server.on("POST", "/login", StubResponse::json(status, "{}"));
        let result = client(&server).test_connection();
        assert!(result.success, "status {status}");
        assert_eq!(result.message, format!("Status: {status}"));

        let probe = &server.requests_to("/login")[0];
        assert_eq!(probe.json(), json!({"username": "", "password": ""}));
    }

    let server = StubServer::start();
    let result = client(&server).test_connection();
    assert!(!result.success);
    assert_eq!(result.message, "Status: 404");
}

#[test]
fn test_connection_reports_transport_failure() {
    let client = ApiClient::new(ClientConfig::new(StubServer::refused_url())).unwrap();
    let result = client.test_connection();
    assert!(!result.success);
    assert!(!result.message.is_empty());
}

#[test]
fn test_connection_timeout() {
    let server = StubServer::start();
    server.on(
        "POST",
        "/login",
        StubResponse::json(200, "{}").delayed(Duration::from_secs(3)),
    );
    let config = ClientConfig {
        probe_timeout: Duration::from_millis(200),
        ..ClientConfig::new(server.url())
    };
    let result = ApiClient::new(config).unwrap().test_connection();
    assert!(!result.success);
    assert_eq!(result.message, "Connection timeout");
}

#[test]
fn test_login_stores_token_and_routes_to_anganwadi_dashboard() {
    let server = StubServer::start();
    server.on(
        "POST",
        "/login",
        StubResponse::json(
            200,
            r#"{"success":true,"user":{"role":"anganwadi"},"token":"abc"}"#,
        ),
    );
    server.on("GET", "/search2", StubResponse::json(200, r#"{"total_students":3}"#));

    let home = tempfile::tempdir().unwrap();
    let store = KvStore::open(home.path()).unwrap();
    let client = client(&server).with_store(store.clone());

    let outcome = login_flow(&client, "CGAB001", "x", RoutingPolicy::default());
    assert_eq!(outcome, LoginOutcome::Routed(Destination::AnganwadiDashboard));
    assert_eq!(client.token().as_deref(), Some("abc"));
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));

    let login = server
        .requests_to("/login")
        .into_iter()
        .find(|r| r.json()["username"] == "CGAB001")
        .unwrap();
    assert_eq!(login.json(), json!({"username": "CGAB001", "password": "x"}));

    // subsequent calls carry the token
    client.fetch_totals().unwrap();
    let totals = &server.requests_to("/search2")[0];
    assert_eq!(totals.header("authorization"), Some("Bearer abc"));

    // a new client restores the persisted session
    let restored = ApiClient::new(ClientConfig::new(server.url()))
        .unwrap()
        .with_store(store);
    assert_eq!(restored.restore_session().unwrap().unwrap().token, "abc");
}

#[test]
fn test_failed_login_is_rejected_with_server_message() {
    for status in [200, 401] {
        let server = StubServer::start();
        server.on(
            "POST",
            "/login",
            StubResponse::json(status, r#"{"success":false,"message":"invalid"}"#),
        );
        let home = tempfile::tempdir().unwrap();
        let store = KvStore::open(home.path()).unwrap();
        let client = client(&server).with_store(store.clone());

        let outcome = login_flow(&client, "CGAB001", "wrong", RoutingPolicy::default());
        assert_eq!(outcome, LoginOutcome::Rejected("invalid".into()), "status {status}");
        assert_eq!(client.token(), None);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }
}

#[test]
fn test_login_flow_short_circuits() {
    let server = StubServer::start();
    let client = client(&server);
    assert_eq!(
        login_flow(&client, "  ", "x", RoutingPolicy::default()),
        LoginOutcome::MissingCredentials
    );
    assert!(server.requests().is_empty());

    // no /login route: the probe sees 404
    assert_eq!(
        login_flow(&client, "CGAB001", "x", RoutingPolicy::default()),
        LoginOutcome::ConnectionFailed("Status: 404".into())
    );
}

#[test]
fn test_logout_clears_session_even_when_server_fails() {
    let server = StubServer::start();
    server.on(
        "POST",
        "/login",
        StubResponse::json(200, r#"{"success":true,"user":{"role":"family"},"token":"t1"}"#),
    );
    server.on("POST", "/logout", StubResponse::text(500, "boom"));

    let home = tempfile::tempdir().unwrap();
    let store = KvStore::open(home.path()).unwrap();
    let client = client(&server).with_store(store.clone());
    client.login("CGPV104", "x").unwrap();
    assert!(store.get(TOKEN_KEY).unwrap().is_some());

    let err = client.logout().unwrap_err();
    assert_eq!(err.to_string(), "boom");
    assert_eq!(client.token(), None);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(
        server.requests_to("/logout")[0].header("authorization"),
        Some("Bearer t1")
    );
}

#[test]
fn test_registration_round_trips_through_search() {
    let server = StubServer::start();
    let rows: Arc<Mutex<Vec<Value>>> = Arc::default();

    {
        let rows = rows.clone();
        server.on_fn("POST", "/families/register", move |req| {
            let form = req.json();
            let mut rows = rows.lock().unwrap();
            let id = rows.len() + 1;
            let parent = if form["motherName"].as_str().unwrap_or("").is_empty() {
                form["fatherName"].clone()
            } else {
                form["motherName"].clone()
            };
            rows.push(json!({
                "id": id,
                "childName": form["childName"],
                "parentName": parent,
                "mobileNumber": form["mobileNumber"],
                "village": form["village"],
                "plantDistributed": 1
            }));
            StubResponse::json(201, json!({"success": true, "familyId": id}).to_string())
        });
    }
    {
        let rows = rows.clone();
        server.on_fn("GET", "/search", move |req| {
            let q = req.query_param("query").unwrap_or("").to_string();
            let hits: Vec<Value> = rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r["childName"].as_str().unwrap_or("").contains(&q)
                        || r["mobileNumber"].as_str().unwrap_or("").contains(&q)
                })
                .cloned()
                .collect();
            StubResponse::json(200, Value::Array(hits).to_string())
        });
    }

    let client = client(&server);
    let form = FamilyRegistration {
        child_name: "आरव".into(),
        mother_name: "सुनीता".into(),
        mobile_number: "9876543210".into(),
        village: "Rampur".into(),
        ..Default::default()
    };
    let registered = client.register_family(&form).unwrap();
    assert!(registered.success);
    assert_eq!(registered.family_id.as_deref(), Some("1"));

    let found = client.search_households("आरव");
    assert_eq!(found.len(), 1);
    let family = &found[0];
    assert_eq!(family.child_name, form.child_name);
    assert_eq!(family.parent_name, form.parent_name());
    assert_eq!(family.mobile_number, form.mobile_number);
    assert_eq!(family.village, form.village);
    assert!(family.plant_distributed);

    // the query went out percent-encoded and decoded back intact
    assert_eq!(
        server.requests_to("/search")[0].query_param("query"),
        Some("आरव")
    );
}

#[test]
fn test_invalid_registration_is_not_sent() {
    let server = StubServer::start();
    let form = FamilyRegistration {
        child_name: "Aarav".into(),
        mother_name: "Sunita".into(),
        mobile_number: "12345".into(),
        village: "Rampur".into(),
        ..Default::default()
    };
    let err = client(&server).register_family(&form).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
    assert!(server.requests().is_empty());
}

#[test]
fn test_search_tolerates_non_array_and_failures() {
    let server = StubServer::start();
    server.on("GET", "/search", StubResponse::json(200, r#"{"rows":[]}"#));
    let client = client(&server);
    assert!(client.search_households("a").is_empty());

    server.on("GET", "/search", StubResponse::json(500, r#"{"error":"db down"}"#));
    assert!(client.search_households("a").is_empty());

    let err = client
        .try_search_households("a", &hgm_api::CancelToken::never())
        .unwrap_err();
    assert_eq!(err.to_string(), "db down");
    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
}

#[test]
fn test_error_message_extraction() {
    let server = StubServer::start();
    server.on("GET", "/photos/total", StubResponse::text(503, "maintenance"));
    server.on("GET", "/search2", StubResponse::text(500, ""));
    server.on(
        "GET",
        "/families/7",
        StubResponse::json(404, r#"{"message":"Family not found","error":"x"}"#),
    );

    let client = client(&server);
    assert_eq!(client.get_total_images().unwrap_err().to_string(), "maintenance");
    assert_eq!(
        client.fetch_totals().unwrap_err().to_string(),
        "HTTP error Internal Server Error"
    );
    assert_eq!(
        client.get_family_details("7").unwrap_err().to_string(),
        "Family not found"
    );
}

#[test]
fn test_search_families_passes_center_code() {
    let server = StubServer::start();
    server.on(
        "GET",
        "/families/search",
        StubResponse::json(200, r#"[{"id":"3","childName":"Diya","mobileNumber":9123456780}]"#),
    );
    let client = client(&server);
    let found = client.search_families("Diya", Some("AWC 12")).unwrap();
    assert_eq!(found[0].mobile_number, "9123456780");

    let req = &server.requests_to("/families/search")[0];
    assert_eq!(req.query_param("q"), Some("Diya"));
    assert_eq!(req.query_param("centerCode"), Some("AWC 12"));
}

#[test]
fn test_update_family_uses_put_with_only_set_fields() {
    let server = StubServer::start();
    server.on(
        "PUT",
        "/families/42",
        StubResponse::json(200, r#"{"success":true,"message":"updated"}"#),
    );
    let client = client(&server);

    let update = FamilyUpdate {
        plant_distributed: Some(true),
        ..Default::default()
    };
    let response = client.update_family("42", &update).unwrap();
    assert_eq!(response.message, "updated");
    assert_eq!(
        server.requests_to("/families/42")[0].json(),
        json!({"plantDistributed": true})
    );

    assert!(matches!(
        client.update_family("42", &FamilyUpdate::default()),
        Err(ApiError::InvalidInput(_))
    ));
}

#[test]
fn test_plant_photo_upload_multipart() {
    let server = StubServer::start();
    server.on(
        "POST",
        "/upload_plant_photo",
        StubResponse::json(200, r#"{"success":true,"photoId":5,"fileUrl":"/uploads/a.png"}"#),
    );

    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("leaf.png");
    std::fs::write(&photo, b"\x89PNG fake image").unwrap();
    let uri = format!("file://{}", photo.display());

    let response = client(&server)
        .upload_plant_photo(
            &uri,
            PlantPhotoMeta {
                username: "CGPV104",
                name: "Sunita",
                plant_stage: "sapling",
                description: "week 3",
            },
        )
        .unwrap();
    assert_eq!(response.photo_id.as_deref(), Some("5"));

    let req = &server.requests_to("/upload_plant_photo")[0];
    assert!(req
        .header("content-type")
        .unwrap()
        .starts_with("multipart/form-data"));
    let body = req.body_text();
    for (field, value) in [
        ("username", "CGPV104"),
        ("name", "Sunita"),
        ("plant_stage", "sapling"),
        ("description", "week 3"),
    ] {
        assert!(
            body.contains(&format!("name=\"{field}\"\r\n\r\n{value}\r\n")),
            "missing field {field}"
        );
    }
    assert!(body.contains("name=\"photo\"; filename=\"plant_photo_CGPV104_"));
    assert!(body.contains(".png\"\r\nContent-Type: image/png"));
    assert!(body.contains("PNG fake image"));
}

#[test]
fn test_generic_file_upload() {
    let server = StubServer::start();
    server.on(
        "POST",
        "/upload/file",
        StubResponse::json(200, r#"{"success":true,"fileUrl":"/f/1.pdf"}"#),
    );

    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("pledge.pdf");
    std::fs::write(&doc, b"%PDF-1.4").unwrap();

    let extra = BTreeMap::from([("familyId".to_string(), "42".to_string())]);
    let response = client(&server)
        .upload_file(doc.to_str().unwrap(), FileKind::Document, &extra)
        .unwrap();
    assert_eq!(response.file_url.as_deref(), Some("/f/1.pdf"));

    let body = server.requests_to("/upload/file")[0].body_text();
    assert!(body.contains("name=\"type\"\r\n\r\ndocument\r\n"));
    assert!(body.contains("name=\"familyId\"\r\n\r\n42\r\n"));
    assert!(body.contains("filename=\"generic_file_"));
    assert!(body.contains("Content-Type: application/pdf"));
}

#[test]
fn test_totals_and_image_count() {
    let server = StubServer::start();
    server.on(
        "GET",
        "/search2",
        StubResponse::json(200, r#"{"total_students":120,"total_images_uploaded":87}"#),
    );
    server.on("GET", "/photos/total", StubResponse::json(200, r#"{"totalImages":87}"#));

    let client = client(&server);
    let totals = client.fetch_totals().unwrap();
    assert_eq!(totals.total_students, Some(120));
    assert_eq!(totals.total_images_uploaded, Some(87));
    assert_eq!(client.get_total_images().unwrap().total_images, 87);
}

#[test]
fn test_lookup_contact() {
    let server = StubServer::start();
    server.on(
        "GET",
        "/data1",
        StubResponse::json(
            200,
            r#"[{"contact_number":"111","worker_name":"Sunita Devi"},{"phone":9876543210,"child_name":"Aarav"}]"#,
        ),
    );
    let client = client(&server);

    let hit = client.lookup_contact("9876543210");
    assert!(hit.success);
    let user = hit.user.unwrap();
    assert_eq!(user.name.as_deref(), Some("Aarav"));
    assert_eq!(user.role, Some(hgm_api::Role::Family));

    let miss = client.lookup_contact("000");
    assert!(!miss.success);
    assert_eq!(miss.message, "User not found in external table");

    server.on("GET", "/data1", StubResponse::json(200, r#"{"rows":1}"#));
    assert_eq!(
        client.lookup_contact("111").message,
        "Invalid data format received from server"
    );
}
