use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use balancebeam::config::Config;
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // Single connection so every request sees the same in-memory database.
    config.general.max_db_connections = 1;
    config.auth.signing_key = "integration-test-signing-key".to_string();
    config.server.secure_cookies = false;

    let state = balancebeam::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    balancebeam::api::router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Register a user and return (access token, user id, Set-Cookie value).
async fn register(app: &Router, username: &str, password: &str) -> (String, i64, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "username": username,
                        "password": password,
                        "verified_password": password,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("registration should set the session cookie")
        .to_str()
        .unwrap()
        .to_string();

    let json = body_json(response).await;
    let token = json["data"]["access_token"].as_str().unwrap().to_string();
    let user_id = json["data"]["user"]["id"].as_i64().unwrap();
    (token, user_id, cookie)
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let app = spawn_app().await;

    for uri in ["/api/teams", "/api/teams/1", "/api/users", "/api/users/someone"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "GET {uri}");
    }

    // A made-up bearer token is no better than none.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/teams")
                .header(header::AUTHORIZATION, "Bearer not-a-real-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registration_issues_a_working_session() {
    let app = spawn_app().await;

    let (token, user_id, cookie) = register(&app, "alex", "correct horse").await;
    assert!(user_id > 0);
    assert!(cookie.starts_with("balancebeam_token="));

    // The bearer token works on a protected route.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/alex")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "alex");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = spawn_app().await;

    register(&app, "taken", "password1").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "username": "taken",
                        "password": "password2",
                        "verified_password": "password2",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_validates_password_confirmation() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "username": "mismatched",
                        "password": "one",
                        "verified_password": "two",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_verifies_credentials() {
    let app = spawn_app().await;
    register(&app, "casey", "right-password").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "username": "casey",
                        "password": "wrong-password",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/token")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "username": "casey",
                        "password": "right-password",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::SET_COOKIE));

    let json = body_json(response).await;
    assert_eq!(json["data"]["token_type"], "Bearer");
    assert_eq!(json["data"]["user"]["username"], "casey");
}

#[tokio::test]
async fn token_echo_reflects_the_session_cookie() {
    let app = spawn_app().await;

    // No cookie: not an error, just no session.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/token").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"].is_null());

    let (token, _, cookie) = register(&app, "echo", "password").await;
    let cookie_pair = cookie.split(';').next().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/token")
                .header(header::COOKIE, cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["access_token"], token);
    assert_eq!(json["data"]["user"]["username"], "echo");
}

#[tokio::test]
async fn team_crud_flow() {
    let app = spawn_app().await;
    let (token, user_id, _) = register(&app, "owner", "password").await;
    let auth = format!("Bearer {token}");

    // Create two teams with different ranks.
    let mut team_ids = Vec::new();
    for (name, rank) in [("Georgia", 3), ("Michigan", 14)] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/teams")
                    .header(header::AUTHORIZATION, &auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": name,
                            "rank": rank,
                            "wins": 12,
                            "losses": 1,
                            "web_id": 333,
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["name"], name);
        assert_eq!(json["data"]["rank"], rank);
        assert!(json["data"]["user_id"].is_null());
        team_ids.push(json["data"]["id"].as_i64().unwrap());
    }

    // Listing is ordered by rank descending.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/teams")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let teams = json["data"].as_array().unwrap();
    assert_eq!(teams.len(), 2);
    assert_eq!(teams[0]["name"], "Michigan");
    assert_eq!(teams[1]["name"], "Georgia");

    // Fetch one by id; a missing id is a 404.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/teams/{}", team_ids[0]))
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/teams/9999")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Updating a team claims it for the caller and persists nothing else,
    // whatever the body says.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/teams/{}", team_ids[0]))
                .header(header::AUTHORIZATION, &auth)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "name": "Renamed",
                        "rank": 99,
                        "wins": 0,
                        "losses": 99,
                        "web_id": 1,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user_id"].as_i64().unwrap(), user_id);
    assert_eq!(json["data"]["name"], "Georgia");
    assert_eq!(json["data"]["rank"], 3);
}

#[tokio::test]
async fn standings_aggregate_owned_teams() {
    let app = spawn_app().await;
    let (token, first_id, _) = register(&app, "first", "password").await;
    let (_, second_id, _) = register(&app, "second", "password").await;
    register(&app, "benched", "password").await;
    let auth = format!("Bearer {token}");

    for (rank, losses, owner) in [(10, 2, first_id), (4, 3, first_id), (3, 1, second_id)] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/teams")
                    .header(header::AUTHORIZATION, &auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": "Team",
                            "rank": rank,
                            "wins": 0,
                            "losses": losses,
                            "web_id": 1,
                            "user_id": owner,
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let standings = json["data"].as_array().unwrap();
    assert_eq!(standings.len(), 3);

    // Ascending by summed rank: benched (0), second (3), first (14).
    assert_eq!(standings[0]["username"], "benched");
    assert_eq!(standings[0]["rank"], 0);
    assert_eq!(standings[0]["points"], 0);

    assert_eq!(standings[1]["username"], "second");
    assert_eq!(standings[1]["rank"], 3);
    assert_eq!(standings[1]["losses"], 1);
    assert_eq!(standings[1]["points"], 5);

    assert_eq!(standings[2]["username"], "first");
    assert_eq!(standings[2]["rank"], 14);
    assert_eq!(standings[2]["losses"], 5);
    assert_eq!(standings[2]["points"], 25);
}

#[tokio::test]
async fn missing_user_lookup_is_404() {
    let app = spawn_app().await;
    let (token, _, _) = register(&app, "seeker", "password").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/users/ghost")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
