use serde_json::json;

use crate::common::{TestApp, TestResponse, routes};

mod accounts {
    use super::*;

    #[tokio::test]
    async fn register_then_login_as_plain_user() {
        let app = TestApp::spawn().await;
        let body = json!({"username": "kassenwart", "password": "securepass"});

        let reg = app.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "{}", reg.text);
        assert!(reg.body["id"].is_number());

        let login = app.post_without_token(routes::LOGIN, &body).await;
        assert_eq!(login.status, 200, "{}", login.text);
        assert!(login.body["token"].is_string());
        assert_eq!(login.body["username"], "kassenwart");
        assert_eq!(login.body["role"], "user");
    }

    #[tokio::test]
    async fn username_is_unique() {
        let app = TestApp::spawn().await;
        let body = json!({"username": "kassenwart", "password": "securepass"});

        assert_eq!(app.post_without_token(routes::REGISTER, &body).await.status, 201);
        let res = app.post_without_token(routes::REGISTER, &body).await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "USERNAME_TAKEN");
    }

    #[tokio::test]
    async fn rejects_malformed_registrations() {
        let app = TestApp::spawn().await;
        let cases = [
            json!({"username": "kassenwart", "password": "short"}),
            json!({"username": "kassenwart", "password": "a".repeat(129)}),
            json!({"username": "no spaces!", "password": "securepass"}),
            json!({"username": "   ", "password": "securepass"}),
            json!({"username": "a".repeat(33), "password": "securepass"}),
            json!({"username": "kassenwart"}),
        ];

        for body in cases {
            let res = app.post_without_token(routes::REGISTER, &body).await;
            assert_eq!(res.status, 400, "accepted {body}");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("kassenwart", "securepass").await;

        for body in [
            json!({"username": "kassenwart", "password": "wrongpass"}),
            json!({"username": "niemand", "password": "securepass"}),
        ] {
            let res = app.post_without_token(routes::LOGIN, &body).await;
            assert_eq!(res.status, 401);
            assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(app.url(routes::REGISTER))
            .header("Content-Type", "application/json")
            .body("not valid json")
            .send()
            .await
            .expect("Failed to send request");

        let res = TestResponse::from_response(res).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod sessions {
    use super::*;

    #[tokio::test]
    async fn me_reports_the_session() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("kassenwart", "securepass").await;

        let res = app.get_with_token(routes::ME, &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["username"], "kassenwart");
        assert_eq!(res.body["role"], "user");

        let admin = app.create_admin("buergermeister").await;
        let res = app.get_with_token(routes::ME, &admin).await;
        assert_eq!(res.body["role"], "admin");
    }

    #[tokio::test]
    async fn missing_or_bad_tokens_are_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");

        let res = app.get_with_token(routes::ME, "not-a-valid-jwt").await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");

        let res = app
            .client
            .get(app.url(routes::ME))
            .header("Authorization", "Basic abc123")
            .send()
            .await
            .expect("Failed to send request");
        let res = TestResponse::from_response(res).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn file_management_is_admin_only() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("kassenwart", "securepass").await;

        let res = app.get_with_token(routes::FILES, &token).await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let res = app.post_with_token(routes::CLEANUP, &json!({}), &token).await;
        assert_eq!(res.status, 403);

        let res = app.get_without_token(routes::ORPHANS).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}
