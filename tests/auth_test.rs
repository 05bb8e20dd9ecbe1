mod common;

use axum::http::Method;
use cloud_uploader::client::api::ApiClient;
use cloud_uploader::client::auth::{Authenticator, IdentityInput, IdentityMode};
use cloud_uploader::common::config::ApiConfig;
use cloud_uploader::common::error::{ApiError, ClientError, ErrorKind};

use common::{Behavior, FakeApi, Reply};

fn authenticator(api: &FakeApi) -> Authenticator {
    Authenticator::new(ApiClient::new(api.api_config()).unwrap())
}

#[tokio::test]
async fn test_root_identity_yields_credential_in_one_call() {
    let api = FakeApi::start().await;
    let identity = IdentityInput::root("me@example.com", "secret").unwrap();

    let credential = authenticator(&api).authenticate(&identity).await.unwrap();

    assert_eq!(credential.api_key(), "K");
    assert_eq!(credential.token(), "T");

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, "/v1/auth");
    assert_eq!(
        requests[0].json(),
        serde_json::json!({"email": "me@example.com", "password": "secret"})
    );
}

#[tokio::test]
async fn test_sam_identity_sends_operator_and_user() {
    let api = FakeApi::start().await;
    let identity = IdentityInput::sam("OP0012345678", "uploader", "secret").unwrap();

    let credential = authenticator(&api).authenticate(&identity).await.unwrap();
    assert_eq!(credential.api_key(), "K");

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].json(),
        serde_json::json!({
            "password": "secret",
            "operatorId": "OP0012345678",
            "userName": "uploader"
        })
    );
}

#[tokio::test]
async fn test_empty_fields_fail_without_network() {
    let api = FakeApi::start().await;

    // (mode, email, operator id, user name, password) as a form would submit them.
    let forms = [
        (IdentityMode::Root, "", "", "", "pw"),
        (IdentityMode::Root, "me@example.com", "", "", ""),
        (IdentityMode::Root, "", "OP1", "user", "pw"),
        (IdentityMode::Sam, "", "", "user", "pw"),
        (IdentityMode::Sam, "", "OP1", "", "pw"),
        (IdentityMode::Sam, "me@example.com", "OP1", "user", ""),
    ];

    for (mode, email, operator_id, user_name, password) in forms {
        let err = IdentityInput::from_form(mode, email, operator_id, user_name, password)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{} {:?}", mode, email);
    }
    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn test_rejection_surfaces_server_message() {
    let api = FakeApi::start_with(Behavior {
        auth: Reply::Reject {
            status: 401,
            message: Some("Invalid email or password"),
        },
        ..Behavior::default()
    })
    .await;
    let identity = IdentityInput::root("me@example.com", "wrong").unwrap();

    let err = authenticator(&api).authenticate(&identity).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(
        err.to_string(),
        "Authentication failed: Invalid email or password"
    );
    assert_eq!(api.request_count(), 1);
}

#[tokio::test]
async fn test_rejection_without_message_falls_back() {
    let api = FakeApi::start_with(Behavior {
        auth: Reply::Reject {
            status: 500,
            message: None,
        },
        ..Behavior::default()
    })
    .await;
    let identity = IdentityInput::root("me@example.com", "secret").unwrap();

    let err = authenticator(&api).authenticate(&identity).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Auth(ApiError::Status {
            status: 500,
            message: None
        })
    ));
    assert_eq!(
        err.to_string(),
        "Authentication failed: request rejected with status 500"
    );
}

#[tokio::test]
async fn test_response_missing_token_is_rejected() {
    let api = FakeApi::start_with(Behavior {
        auth_body: serde_json::json!({"apiKey": "K"}),
        ..Behavior::default()
    })
    .await;
    let identity = IdentityInput::root("me@example.com", "secret").unwrap();

    let err = authenticator(&api).authenticate(&identity).await.unwrap_err();

    assert!(matches!(err, ClientError::Auth(ApiError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_auth_error() {
    // Reserve a port, then close it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = ApiClient::new(ApiConfig::with_base_url(format!("http://{}/v1", addr))).unwrap();
    let identity = IdentityInput::root("me@example.com", "secret").unwrap();

    let err = Authenticator::new(api)
        .authenticate(&identity)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Auth(ApiError::Transport(_))));
    assert!(err.to_string().starts_with("Authentication failed: "));
}
