use std::sync::Once;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use authrelay::{AccessToken, Config, Error, SessionClient, SessionStore};

static INIT: Once = Once::new();
fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn bearer(req: &Request) -> String {
    req.headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn non_auth_failures_bypass_the_refresh_flow() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = Config::new(server.uri()).expect("config");
    let client = SessionClient::new(config).expect("client");
    client.session().set_access_token(AccessToken::new("t1"));

    let err = client.get("/api/data").await.expect_err("must fail");
    match err {
        Error::Api(status, body) => {
            assert_eq!(status.as_u16(), 503);
            assert!(body.contains("unavailable"));
        }
        other => panic!("expected Api passthrough, got {other}"),
    }

    // Coordinator state and session untouched.
    assert!(client.session().is_authenticated());
    assert_eq!(client.session().access_token().expect("token").reveal(), "t1");
}

#[tokio::test]
async fn refresh_wire_contract_is_configurable() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(move |req: &Request| {
            if bearer(req) == "Bearer t2" {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true }))
            } else {
                ResponseTemplate::new(401).set_body_string("token expired")
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    // The unprefixed variant: `/refresh`, token under `token`.
    Mock::given(method("POST"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token": "t2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::new(server.uri()).expect("config");
    config.refresh_path = "/refresh".into();
    config.token_field = "token".into();

    let client = SessionClient::new(config).expect("client");
    client.session().set_access_token(AccessToken::new("t1"));

    client.get("/api/data").await.expect("refresh via custom contract");
    assert_eq!(client.session().access_token().expect("token").reveal(), "t2");
}
