use std::sync::Once;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authrelay::{AccessToken, Config, Error, SessionClient, SessionEvent, SessionStore};

static INIT: Once = Once::new();
fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn client_with_token(server: &MockServer, token: &str) -> SessionClient {
    let config = Config::new(server.uri()).expect("config");
    let client = SessionClient::new(config).expect("client");
    client.session().set_access_token(AccessToken::new(token));
    client
}

#[tokio::test]
async fn rejected_refresh_fails_every_waiter_and_ends_the_session_once() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(3)
        .mount(&server)
        .await;

    // The refresh credential itself is rejected. The delay holds the refresh
    // open long enough for all three callers to queue behind it.
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string("refresh token revoked")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "t1");
    let mut events = client.subscribe();

    let (r1, r2, r3) = tokio::join!(
        client.get("/api/data"),
        client.get("/api/data"),
        client.get("/api/data"),
    );

    for result in [r1, r2, r3] {
        match result {
            Err(Error::RefreshFailed(reason)) => {
                assert!(reason.contains("401"), "reason should carry the status: {reason}")
            }
            other => panic!("expected RefreshFailed, got {:?}", other.map(|_| ())),
        }
    }

    // One teardown for the whole batch, and no replays or second refresh.
    assert_eq!(events.try_recv().expect("session ended"), SessionEvent::Ended);
    assert!(events.try_recv().is_err(), "exactly one session-ended signal");
    let session = client.session();
    assert!(!session.is_authenticated());
    assert!(session.access_token().is_none());
}

#[tokio::test]
async fn refresh_server_error_is_terminal_too() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "t1");
    let mut events = client.subscribe();

    let err = client.get("/api/data").await.expect_err("must fail");
    assert!(matches!(err, Error::RefreshFailed(_)), "got {err}");

    assert_eq!(events.try_recv().expect("session ended"), SessionEvent::Ended);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn malformed_refresh_body_is_a_refresh_failure() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&server)
        .await;

    // 200 with no token field in the body.
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "t1");
    let mut events = client.subscribe();

    let err = client.get("/api/data").await.expect_err("must fail");
    assert!(matches!(err, Error::RefreshFailed(_)), "got {err}");
    assert_eq!(events.try_recv().expect("session ended"), SessionEvent::Ended);
}
