//! JSON API integration tests
//!
//! Drive the full router with `oneshot` against an in-memory database.

mod helpers;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use gg_common::db::users;
use gg_common::RoleName;
use helpers::*;
use serde_json::json;

fn local(url: &str) -> &str {
    url.strip_prefix(BASE).unwrap_or(url)
}

#[tokio::test]
async fn test_404() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "john", RoleName::Student).await;

    let (status, body) = call(&app, "GET", "/wrong/url", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");

    let (status, body) = call(&app, "GET", "/api/v1.0/nothing/here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
}

#[tokio::test]
async fn test_unknown_page_is_html_for_browsers() {
    let (state, _dir) = test_state().await;
    let response = send(
        &app(&state),
        Request::builder().uri("/wrong/url").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_no_auth() {
    let (state, _dir) = test_state().await;
    let (status, body) = call(&app(&state), "GET", "/api/v1.0/schools/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert!(body["schools"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_auth() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "john", RoleName::Student).await;

    let (status, body) = call(&app, "GET", "/api/v1.0/schools/", Some(("john", "dog")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_token_auth() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "john", RoleName::Student).await;

    // bad token
    let (status, _) = call(&app, "GET", "/api/v1.0/schools/", Some(("bad-token", "")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, "GET", "/api/v1.0/token", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["expiration"], 3600);

    let (status, _) = call(&app, "GET", "/api/v1.0/schools/", Some((&token, "")), None).await;
    assert_eq!(status, StatusCode::OK);

    // a token cannot mint another token
    let (status, _) = call(&app, "GET", "/api/v1.0/token", Some((&token, "")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_anonymous() {
    let (state, _dir) = test_state().await;
    let app = app(&state);

    let (status, _) = call(&app, "GET", "/api/v1.0/schools/", Some(("", "")), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", "/api/v1.0/token", Some(("", "")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_unconfirmed_account() {
    let (state, _dir) = test_state().await;
    users::create(
        &state.db,
        users::NewUser {
            email: Some("john@example.com".into()),
            username: Some("john".into()),
            password: Some("cat".into()),
            confirmed: false,
            ..Default::default()
        },
        None,
    )
    .await
    .unwrap();

    let (status, body) = call(&app(&state), "GET", "/api/v1.0/schools/", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Unconfirmed account");
}

#[tokio::test]
async fn test_schools() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "admin", RoleName::Administrator).await;
    let teacher = add_user(&state, "susan", RoleName::Teacher).await;
    let student = add_user(&state, "john", RoleName::Student).await;
    let admin = Some(("admin", "cat"));

    // students cannot create schools
    let (status, _) = call(
        &app,
        "POST",
        "/api/v1.0/schools/",
        Some(("john", "cat")),
        Some(json!({"name": "Central"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // a school needs a name
    let (status, body) = call(&app, "POST", "/api/v1.0/schools/", admin, Some(json!({"description": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad request");

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1.0/schools/",
            admin,
            Some(json!({"name": "Central", "description": "Downtown"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.starts_with("http://localhost/api/v1.0/schools/"));

    let (status, body) = call(&app, "GET", local(&location), admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Central");
    assert_eq!(body["description"], "Downtown");
    let id = body["id"].as_i64().unwrap();

    let (status, body) = call(&app, "PUT", local(&location), admin, Some(json!({"name": "North"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "North");

    // without a name nothing changes
    let (status, body) = call(&app, "PUT", local(&location), admin, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "North");

    let teachers = format!("/api/v1.0/schools/{}/teachers/", id);
    let students = format!("/api/v1.0/schools/{}/students/", id);

    let (status, body) = call(&app, "PUT", &teachers, admin, Some(json!({"id": teacher.id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["school"]["id"], id);

    let (status, _) = call(&app, "PUT", &students, admin, Some(json!({"id": student.id.to_string()}))).await;
    assert_eq!(status, StatusCode::OK);

    // wrong role
    let (status, _) = call(&app, "PUT", &teachers, admin, Some(json!({"id": student.id}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // missing user
    let (status, _) = call(&app, "PUT", &students, admin, Some(json!({"id": 999}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "PUT", &students, admin, Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&app, "GET", &teachers, admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["teachers"][0]["username"], "susan");

    let (status, body) = call(&app, "GET", &students, admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["students"][0]["username"], "john");

    let (status, body) = call(&app, "GET", &format!("/api/v1.0/users/{}/schools/", student.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["schools"][0]["name"], "North");

    let (status, _) = call(&app, "GET", "/api/v1.0/schools/abc", admin, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_garbage_page_falls_back_to_first() {
    let (state, _dir) = test_state().await;
    gg_common::db::schools::create(&state.db, "central", None).await.unwrap();
    let app = app(&state);

    let (status, body) = call(&app, "GET", "/api/v1.0/schools/?page=abc&per_page=xyz", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["schools"][0]["name"], "central");
    assert!(body["prev"].is_null());
}

#[tokio::test]
async fn test_out_of_range_pages_are_empty() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "john", RoleName::Student).await;
    let john = Some(("john", "cat"));

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1.0/scores/",
        john,
        Some(json!({"game": "g", "state": "won", "score": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1.0/users/john/games/g/scores?page={}&per_page=10", i64::MAX);
    let (status, body) = call(&app, "GET", &uri, john, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert!(body["scores"].as_array().unwrap().is_empty());
    assert!(body["next"].is_null());

    // oversized page sizes are capped, and the links carry the capped size
    let uri = format!("/api/v1.0/users/john/games/g/scores?per_page={}", i64::MAX);
    let (status, body) = call(&app, "GET", &uri, john, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scores"].as_array().unwrap().len(), 1);

    let uri = format!("/api/v1.0/users/john/games/g/scores?page=3&per_page={}", i64::MAX);
    let (_, body) = call(&app, "GET", &uri, john, None).await;
    assert_eq!(
        body["prev"],
        "http://localhost/api/v1.0/users/john/games/g/scores?page=2&per_page=100"
    );

    let (status, body) = call(&app, "GET", "/api/v1.0/schools/?page=-9223372036854775808", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["prev"].is_null());
}

#[tokio::test]
async fn test_school_pagination_links() {
    let (state, _dir) = test_state().await;
    for n in 0..25 {
        gg_common::db::schools::create(&state.db, &format!("school_{}", n), None)
            .await
            .unwrap();
    }
    let app = app(&state);

    let (_, body) = call(&app, "GET", "/api/v1.0/schools/", None, None).await;
    assert_eq!(body["count"], 25);
    assert_eq!(body["schools"].as_array().unwrap().len(), 20);
    assert!(body["prev"].is_null());
    assert_eq!(body["next"], "http://localhost/api/v1.0/schools/?page=2");

    let (_, body) = call(&app, "GET", "/api/v1.0/schools/?page=2", None, None).await;
    assert_eq!(body["schools"].as_array().unwrap().len(), 5);
    assert_eq!(body["prev"], "http://localhost/api/v1.0/schools/?page=1");
    assert!(body["next"].is_null());
}

#[tokio::test]
async fn test_users() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    let john = add_user(&state, "john", RoleName::Student).await;

    let (status, body) = call(&app, "GET", &format!("/api/v1.0/users/{}", john.id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "john");
    assert_eq!(body["role"], "Student");

    let (status, _) = call(&app, "GET", "/api/v1.0/users/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "john", RoleName::Student).await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1.0/login",
        None,
        Some(json!({"username": "john", "password": "dog"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1.0/login",
        None,
        Some(json!({"username": "john", "password": "cat"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "john");

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1.0/login",
        None,
        Some(json!({"username": "nobody", "password": "cat"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_scores() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "john", RoleName::Student).await;
    let john = Some(("john", "cat"));

    let (status, _) = call(&app, "GET", "/api/v1.0/users/john/games/g1/max_score", john, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // game and state are required
    let (status, _) = call(&app, "POST", "/api/v1.0/scores/", john, Some(json!({"score": 3}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1.0/scores/",
            john,
            Some(json!({"game": "g1", "state": "won", "score": "10", "max_score": 30, "duration": 12})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let body = body_json(response).await;
    assert_eq!(body["score"], 10);
    assert_eq!(body["is_exam"], false);

    let (status, body) = call(&app, "GET", local(&location), john, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game"], "g1");

    for (game, score) in [("g1", 21), ("g1", 5), ("g2", 7)] {
        let (status, _) = call(
            &app,
            "POST",
            "/api/v1.0/scores/",
            john,
            Some(json!({"game": game, "state": "won", "score": score})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(&app, "GET", "/api/v1.0/users/john/games/g1/max_score", john, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["max_score"], 21);

    let (status, body) = call(&app, "GET", "/api/v1.0/users/john/games/g1/scores", john, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let values: Vec<i64> = body["scores"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["score"].as_i64().unwrap())
        .collect();
    assert_eq!(values, vec![10, 21, 5]);

    let (_, body) = call(&app, "GET", "/api/v1.0/users/john/games/g1/scores?per_page=2", john, None).await;
    assert_eq!(body["scores"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["next"],
        "http://localhost/api/v1.0/users/john/games/g1/scores?page=2&per_page=2"
    );

    let (status, body) = call(&app, "GET", "/api/v1.0/users/john/scores/best", john, None).await;
    assert_eq!(status, StatusCode::OK);
    let best = body["scores"].as_array().unwrap();
    assert_eq!(best.len(), 2);
    assert_eq!(best[0]["game"], "g1");
    assert_eq!(best[0]["score"], 21);

    let (status, body) = call(&app, "GET", "/api/v1.0/users/john/scores/last", john, None).await;
    assert_eq!(status, StatusCode::OK);
    let last = body["scores"].as_array().unwrap();
    assert_eq!(last.len(), 2);
    assert_eq!(last[0]["score"], 5);
}

#[tokio::test]
async fn test_score_visibility() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "admin", RoleName::Administrator).await;
    let teacher = add_user(&state, "susan", RoleName::Teacher).await;
    let john = add_user(&state, "john", RoleName::Student).await;
    add_user(&state, "mary", RoleName::Student).await;

    let (status, _) = call(&app, "GET", "/api/v1.0/users/john/scores/best", Some(("mary", "cat")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "GET", "/api/v1.0/users/john/scores/best", Some(("susan", "cat")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/v1.0/users/{}", john.id),
        Some(("admin", "cat")),
        Some(json!({"teacher_id": teacher.id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "GET", "/api/v1.0/users/john/scores/best", Some(("susan", "cat")), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", "/api/v1.0/users/john/scores/last", Some(("admin", "cat")), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/v1.0/users/{}/students/", teacher.id),
        Some(("susan", "cat")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["students"][0]["username"], "john");

    let (status, _) = call(&app, "GET", "/api/v1.0/users/nobody/scores/best", Some(("admin", "cat")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lessons() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "john", RoleName::Student).await;
    let john = Some(("john", "cat"));

    let (status, _) = call(&app, "POST", "/api/v1.0/lessons/", john, Some(json!({"clicks_menu": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let lessons = [
        json!({"lesson": "lesson_danger", "is_finished": false, "total_pages_viewed": "4"}),
        json!({"lesson": "lesson_danger", "is_finished": true, "way_exit": "end"}),
        json!({"lesson": "lesson_labtools", "is_finished": 0}),
    ];
    let mut location = String::new();
    for lesson in lessons {
        let response = send(&app, json_request("POST", "/api/v1.0/lessons/", john, Some(lesson))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    }

    let (status, body) = call(&app, "GET", local(&location), john, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lesson"], "lesson_labtools");

    let (status, body) = call(&app, "GET", "/api/v1.0/lessons/finished", john, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"lesson_danger": true, "lesson_labtools": false}));
}

#[tokio::test]
async fn test_screens() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "john", RoleName::Student).await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/v1.0/screens/",
            Some(("john", "cat")),
            Some(json!({"name": "Login", "action": "open", "duration": "30"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();

    let (status, body) = call(&app, "GET", local(&location), Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Login");
    assert_eq!(body["duration"], 30);
}

#[tokio::test]
async fn test_user_update() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    let john = add_user(&state, "john", RoleName::Student).await;
    add_user(&state, "mary", RoleName::Student).await;
    let uri = format!("/api/v1.0/users/{}", john.id);

    let (status, body) = call(&app, "POST", &uri, Some(("john", "cat")), Some(json!({"username": "pepe"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "pepe");

    let (status, _) = call(&app, "GET", "/api/v1.0/token", Some(("pepe", "cat")), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", "/api/v1.0/token", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // another student
    let (status, _) = call(&app, "POST", &uri, Some(("mary", "cat")), Some(json!({"name": "Mary"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // administrator-only field
    let (status, _) = call(&app, "POST", &uri, Some(("pepe", "cat")), Some(json!({"confirmed": false}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // not an attribute
    let (status, _) = call(&app, "POST", &uri, Some(("pepe", "cat")), Some(json!({"shoe_size": 9}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // taken username
    let (status, body) = call(&app, "POST", &uri, Some(("pepe", "cat")), Some(json!({"username": "mary"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_game_stats_job() {
    let (state, dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "admin", RoleName::Administrator).await;
    add_user(&state, "john", RoleName::Student).await;

    let (status, _) = call(&app, "POST", "/api/v1.0/jobs/game-stats", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "POST", "/api/v1.0/jobs/game-stats", Some(("admin", "cat")), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = body["job_id"].as_str().unwrap().to_string();
    let status_url = body["status_url"].as_str().unwrap().to_string();
    assert_eq!(status_url, format!("http://localhost/api/v1.0/jobs/{}", job_id));

    let mut job = serde_json::Value::Null;
    for _ in 0..100 {
        let (status, body) = call(&app, "GET", local(&status_url), Some(("admin", "cat")), None).await;
        assert_eq!(status, StatusCode::OK);
        if body["state"] == "finished" || body["state"] == "failed" {
            job = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(job["state"], "finished", "job did not finish: {}", job);
    assert_eq!(job["result_url"], format!("/objects/jobs/{}.csv", job_id));
    assert!(job["finished"].is_string());

    let report = std::fs::read_to_string(dir.path().join("objects/jobs").join(format!("{}.csv", job_id))).unwrap();
    assert!(report.starts_with("user_id\tschool\tteacher\tusername"));
    assert!(report.contains("john"));

    let (status, _) = call(&app, "GET", "/api/v1.0/jobs/no-such-job", Some(("admin", "cat")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_asset_upload() {
    let (state, dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "admin", RoleName::Administrator).await;
    add_user(&state, "john", RoleName::Student).await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/v1.0/assets/",
        Some(("john", "cat")),
        Some(json!({"file_name": "logo.png"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        "POST",
        "/api/v1.0/assets/",
        Some(("admin", "cat")),
        Some(json!({"file_name": "logo.png", "file_type": "image/png"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["url"], "/objects/assets/logo.png");
    let upload_url = body["upload_url"].as_str().unwrap().to_string();
    let id = body["id"].as_i64().unwrap();

    // the signed URL needs no other credentials
    let request = Request::builder()
        .method("PUT")
        .uri(local(&upload_url))
        .body(Body::from(vec![0x89, b'P', b'N', b'G']))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = std::fs::read(dir.path().join("objects/assets/logo.png")).unwrap();
    assert_eq!(stored, vec![0x89, b'P', b'N', b'G']);

    // a forged token is not enough
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/v1.0/assets/{}/content?token=forged", id))
        .body(Body::from("x"))
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "GET", "/api/v1.0/assets/", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assets"][0]["file_name"], "logo.png");
}

#[tokio::test]
async fn test_game_data() {
    let (state, _dir) = test_state().await;
    let app = app(&state);
    add_user(&state, "admin", RoleName::Administrator).await;
    add_user(&state, "john", RoleName::Student).await;

    let (status, body) = call(&app, "GET", "/api/v1.0/game_data/", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game_data"].as_array().unwrap().len(), 5);

    // registered but never uploaded
    let (status, _) = call(&app, "GET", "/api/v1.0/game_data/rooms.json", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        "PUT",
        "/api/v1.0/game_data/quiz.json",
        Some(("john", "cat")),
        Some(json!({"questions": []})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        "PUT",
        "/api/v1.0/game_data/quiz.json",
        Some(("admin", "cat")),
        Some(json!({"questions": [1, 2]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", "/api/v1.0/game_data/quiz.json", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"questions": [1, 2]}));

    let request = Request::builder()
        .method("PUT")
        .uri("/api/v1.0/game_data/quiz.json")
        .header(header::AUTHORIZATION, basic("admin", "cat"))
        .body(Body::from("not json"))
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "GET", "/api/v1.0/game_data/other.json", Some(("john", "cat")), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let (state, _dir) = test_state().await;
    let (status, body) = call(&app(&state), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "gamegen");
    assert_eq!(body["commit"], env!("GAMEGEN_COMMIT"));
}
