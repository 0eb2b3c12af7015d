/// API client and session tests against a local fake backend.
///
/// Each test starts a `tiny_http` server on an ephemeral port that answers
/// from a routing closure and records every request it sees, so the tests
/// can check paths, query strings, bodies and the `Authorization` header.
use std::io::Read;
use std::net::TcpListener;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chatstat::api::models::{MessageFilters, MessageQuery, RegisterRequest, StatsFilter};
use chatstat::api::{ApiClient, ApiError};
use chatstat::config::schema::ApiConfig;
use chatstat::session::Session;
use chatstat::session::credentials::{CredentialStore, MemoryCredentialStore};
use tiny_http::{Header, Response, Server};

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    url: String,
    authorization: Option<String>,
    body: String,
}

struct FakeBackend {
    base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeBackend {
    /// Serve until no request arrives for a few seconds.
    fn start(route: impl Fn(&str, &str) -> (u16, String) + Send + 'static) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        thread::spawn(move || {
            while let Ok(Some(mut request)) = server.recv_timeout(Duration::from_secs(5)) {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let recorded = Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    authorization: request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Authorization"))
                        .map(|h| h.value.as_str().to_string()),
                    body,
                };
                let (status, reply) = route(&recorded.method, &recorded.url);
                log.lock().unwrap().push(recorded);

                let response = Response::from_string(reply)
                    .with_status_code(status)
                    .with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .unwrap(),
                    );
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    fn client(&self, store: Rc<dyn CredentialStore>) -> ApiClient {
        let config = ApiConfig {
            base_url: self.base_url.clone(),
            timeout_ms: 5_000,
        };
        ApiClient::new(&config, store)
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn ok(body: &str) -> (u16, String) {
    (200, body.to_string())
}

const STATS_BODY: &str = r#"{
    "total_messages": 14, "total_words": 40, "total_characters": 200,
    "messages_last_24_hours": 3, "average_messages_per_day": 2.5,
    "most_active_day": {"date": "2024-03-01", "count": 7},
    "least_active_day": {"date": "2024-03-02", "count": 2},
    "daily_messages": [{"date": "2024-03-01", "count": 7}]
}"#;

// ---------------------------------------------------------------------------
// Bearer token
// ---------------------------------------------------------------------------

#[test]
fn no_token_means_no_authorization_header() {
    let backend = FakeBackend::start(|_, _| ok(STATS_BODY));
    let client = backend.client(Rc::new(MemoryCredentialStore::default()));

    let stats = client.message_stats().unwrap();
    assert_eq!(stats.total_messages, 14);
    assert_eq!(stats.most_active_day.unwrap().count, 7);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/api/stats/message-stats/");
    assert!(requests[0].authorization.is_none());
}

#[test]
fn stored_token_is_sent_as_bearer() {
    let backend = FakeBackend::start(|_, _| ok(STATS_BODY));
    let client = backend.client(Rc::new(MemoryCredentialStore::with_token("tok-123")));

    client.message_stats().unwrap();

    let requests = backend.requests();
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer tok-123"));
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[test]
fn not_found_carries_backend_message() {
    let backend =
        FakeBackend::start(|_, _| (404, r#"{"error": "User ghost not found"}"#.to_string()));
    let client = backend.client(Rc::new(MemoryCredentialStore::with_token("t")));

    let err = client.user_profile("ghost").unwrap_err();
    match err {
        ApiError::NotFound { path, detail } => {
            assert_eq!(path, "/api/discorduser/ghost/");
            assert_eq!(detail.as_deref(), Some("User ghost not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn expired_token_is_unauthorized() {
    let backend = FakeBackend::start(|_, _| {
        (401, r#"{"detail": "Given token not valid"}"#.to_string())
    });
    let client = backend.client(Rc::new(MemoryCredentialStore::with_token("old")));

    let err = client.message_timeline().unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized { status: 401 }));
}

#[test]
fn server_error_keeps_status_and_body() {
    let backend = FakeBackend::start(|_, _| (500, "boom".to_string()));
    let client = backend.client(Rc::new(MemoryCredentialStore::default()));

    match client.recent_messages().unwrap_err() {
        ApiError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_body_is_invalid_response() {
    let backend = FakeBackend::start(|_, _| ok("{\"intervals\": 12"));
    let client = backend.client(Rc::new(MemoryCredentialStore::default()));

    let err = client.message_timeline().unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse { .. }));
}

#[test]
fn unreachable_backend_is_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ApiConfig {
        base_url: format!("http://127.0.0.1:{port}"),
        timeout_ms: 2_000,
    };
    let client = ApiClient::new(&config, Rc::new(MemoryCredentialStore::default()));

    let err = client.message_stats().unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }), "{err:?}");
}

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[test]
fn user_stats_sends_exclusions() {
    let backend = FakeBackend::start(|_, _| {
        ok(r#"{"total_messages": 3, "users": [{"user_name": "alice", "message_count": 3}]}"#)
    });
    let client = backend.client(Rc::new(MemoryCredentialStore::default()));

    let filter = StatsFilter {
        exclude_bots: true,
        exclude_users: vec!["mee6".to_string()],
        exclude_channels: Vec::new(),
    };
    let list = client.user_stats(&filter).unwrap();
    assert_eq!(list.records[0].name, "alice");

    let url = &backend.requests()[0].url;
    assert!(url.starts_with("/api/stats/users/?"), "{url}");
    assert!(url.contains("exclude_bots=true"), "{url}");
    assert!(url.contains("exclude_user=mee6"), "{url}");
    assert!(!url.contains("exclude_channel"), "{url}");
}

#[test]
fn channel_stats_sends_user_exclusions_as_exclude() {
    let backend = FakeBackend::start(|_, _| ok(r#"{"channels": []}"#));
    let client = backend.client(Rc::new(MemoryCredentialStore::default()));

    let filter = StatsFilter {
        exclude_bots: true,
        exclude_users: vec!["mee6".to_string()],
        exclude_channels: vec!["spam".to_string()],
    };
    client.channel_stats(&filter).unwrap();

    let url = &backend.requests()[0].url;
    assert!(url.contains("exclude=mee6"), "{url}");
    assert!(!url.contains("exclude_bots"), "{url}");
}

#[test]
fn database_query_and_pagination() {
    let backend = FakeBackend::start(|_, _| {
        ok(r#"{
            "results": [{
                "id": "1190000000000000001", "server_name": "Guild",
                "channel_name": "general", "user_name": "alice",
                "timestamp": "2024-03-01T10:15:00Z", "char_count": 5, "word_count": 1,
                "contains_attachment": false, "contains_mention": false, "contains_emoji": false,
                "message_content": "hello"
            }],
            "count": 120, "next": "http://x/?page=2", "previous": null
        }"#)
    });
    let client = backend.client(Rc::new(MemoryCredentialStore::default()));

    let query = MessageQuery {
        page: 1,
        page_size: 50,
        timezone: "America/Chicago".to_string(),
        filters: MessageFilters {
            channel: Some("general".to_string()),
            date: Some("2024-03-01".to_string()),
            ..MessageFilters::default()
        },
    };
    let page = client.database_messages(&query).unwrap();
    assert_eq!(page.results[0].id, "1190000000000000001");
    assert!(page.has_more());
    assert_eq!(page.total_pages(50), 3);

    let url = &backend.requests()[0].url;
    assert!(url.contains("page=1"), "{url}");
    assert!(url.contains("page_size=50"), "{url}");
    assert!(url.contains("channel=general"), "{url}");
    assert!(url.contains("date=2024-03-01"), "{url}");
    assert!(url.contains("timezone=America%2FChicago"), "{url}");
}

#[test]
fn delete_uses_delete_method() {
    let backend = FakeBackend::start(|_, _| (204, String::new()));
    let client = backend.client(Rc::new(MemoryCredentialStore::with_token("t")));

    client.delete_message("42").unwrap();

    let requests = backend.requests();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].url, "/api/database/messages/42/");
}

#[test]
fn register_posts_account_fields() {
    let backend = FakeBackend::start(|_, _| (201, r#"{"id": 7, "username": "dana"}"#.to_string()));
    let client = backend.client(Rc::new(MemoryCredentialStore::with_token("admin-tok")));

    let created = client
        .register(&RegisterRequest {
            username: "dana",
            password: "s3cret",
            first_name: "Dana",
            last_name: "Scully",
        })
        .unwrap();
    assert_eq!(created.id, Some(7));
    assert_eq!(created.username, "dana");

    let requests = backend.requests();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, "/api/user/register/");
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer admin-tok"));
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "username": "dana",
            "password": "s3cret",
            "first_name": "Dana",
            "last_name": "Scully"
        })
    );
}

#[test]
fn register_errors_keep_their_status() {
    let backend = FakeBackend::start(|_, _| {
        (400, r#"{"username": ["A user with that username already exists."]}"#.to_string())
    });
    let client = backend.client(Rc::new(MemoryCredentialStore::with_token("t")));
    let request = RegisterRequest {
        username: "dana",
        password: "pw",
        first_name: "",
        last_name: "",
    };
    match client.register(&request).unwrap_err() {
        ApiError::Status { status, body, .. } => {
            assert_eq!(status, 400);
            assert!(body.contains("already exists"), "{body}");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let backend = FakeBackend::start(|_, _| (401, "{}".to_string()));
    let client = backend.client(Rc::new(MemoryCredentialStore::default()));
    assert!(matches!(
        client.register(&request),
        Err(ApiError::Unauthorized { status: 401 })
    ));
}

#[test]
fn profile_names_are_percent_encoded() {
    let backend = FakeBackend::start(|_, _| {
        ok(r#"{"id": "9", "name": "off topic", "type": "text", "total_messages": 2}"#)
    });
    let client = backend.client(Rc::new(MemoryCredentialStore::default()));

    let channel = client.channel_profile("off topic").unwrap();
    assert_eq!(channel.kind.as_deref(), Some("text"));
    assert_eq!(backend.requests()[0].url, "/api/channel/off%20topic/");
}

// ---------------------------------------------------------------------------
// Login flow
// ---------------------------------------------------------------------------

fn auth_route(method: &str, url: &str) -> (u16, String) {
    match (method, url) {
        ("POST", "/api/token/") => ok(r#"{"access": "acc-1", "refresh": "ref-1"}"#),
        ("GET", "/api/user/me/") => ok(
            r#"{"id": 1, "username": "admin", "first_name": "Ada", "last_name": "Lovelace"}"#,
        ),
        _ => (404, r#"{"error": "no route"}"#.to_string()),
    }
}

#[test]
fn login_stores_tokens_and_display_name() {
    let backend = FakeBackend::start(auth_route);
    let store = Rc::new(MemoryCredentialStore::default());
    let client = backend.client(store.clone());
    let session = Session::restore(store.clone());
    assert!(!session.is_authorized());

    let state = session.login(&client, "admin", "hunter2").unwrap();
    assert!(state.authorized);
    assert_eq!(state.display_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(session.state(), state);

    let stored = store.load();
    assert_eq!(stored.access.as_deref(), Some("acc-1"));
    assert_eq!(stored.refresh.as_deref(), Some("ref-1"));
    assert_eq!(stored.username.as_deref(), Some("admin"));

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["username"], "admin");
    assert_eq!(body["password"], "hunter2");
    assert!(requests[0].authorization.is_none());
    // The profile lookup already carries the fresh token.
    assert_eq!(requests[1].authorization.as_deref(), Some("Bearer acc-1"));

    session.logout().unwrap();
    assert!(!session.is_authorized());
    assert!(store.load().is_empty());
}

#[test]
fn login_without_refresh_token_fails() {
    let backend = FakeBackend::start(|_, _| ok(r#"{"access": "acc-only"}"#));
    let store = Rc::new(MemoryCredentialStore::default());
    let client = backend.client(store.clone());
    let session = Session::restore(store.clone());

    assert!(session.login(&client, "admin", "pw").is_err());
    assert!(!session.is_authorized());
    assert!(store.load().is_empty());
}

#[test]
fn failed_profile_lookup_keeps_login() {
    let backend = FakeBackend::start(|method, url| match (method, url) {
        ("POST", "/api/token/") => ok(r#"{"access": "a", "refresh": "r"}"#),
        _ => (500, "down".to_string()),
    });
    let store = Rc::new(MemoryCredentialStore::default());
    let client = backend.client(store.clone());
    let session = Session::restore(store);

    let state = session.login(&client, "admin", "pw").unwrap();
    assert!(state.authorized);
    assert_eq!(state.username.as_deref(), Some("admin"));
    assert!(state.display_name.is_none());
}

#[test]
fn bad_credentials_are_rejected() {
    let backend = FakeBackend::start(|_, _| {
        (401, r#"{"detail": "No active account found"}"#.to_string())
    });
    let store = Rc::new(MemoryCredentialStore::default());
    let client = backend.client(store.clone());
    let session = Session::restore(store);

    let err = session.login(&client, "admin", "wrong").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ApiError>(),
        Some(ApiError::Unauthorized { status: 401 })
    ));
}
