use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use eventhub_server::config::Config;
use eventhub_server::models::{Organization, User};
use eventhub_server::repository::InMemoryEventStore;
use eventhub_server::routes::create_routes;
use eventhub_server::services::payments::{ConnectAccounts, ConnectedAccount, PaymentsError};
use eventhub_server::state::AppState;

struct StubPayments {
    fail: bool,
}

#[async_trait]
impl ConnectAccounts for StubPayments {
    async fn create_account(&self, owner: &str) -> Result<ConnectedAccount, PaymentsError> {
        if self.fail {
            Err(PaymentsError::Rejected {
                status: 400,
                message: "No such platform".to_string(),
            })
        } else {
            Ok(ConnectedAccount {
                id: format!("acct_{}", owner),
            })
        }
    }
}

struct TestApp {
    router: Router,
    store: Arc<InMemoryEventStore>,
}

fn test_config() -> Config {
    Config::from_lookup(|_| None)
}

fn app_with(fail_payments: bool) -> TestApp {
    let store = Arc::new(InMemoryEventStore::new());
    let state = AppState::new(store.clone(), Arc::new(StubPayments { fail: fail_payments }));
    TestApp {
        router: create_routes(state, &test_config()),
        store,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn seed(&self) -> (Organization, User) {
        let org = self.store.add_organization("Rustaceans", Some("logo.png")).await;
        let user = self.store.add_user("Ada", "ada@example.com").await;
        (org, user)
    }
}

fn event_body() -> Value {
    json!({
        "title": "RustConf",
        "startDate": "2031-09-01",
        "endDate": "2031-09-03T18:00:00Z",
        "virtualLink": "",
        "type": "IN_PERSON",
        "maxAttendees": 1,
        "customFields": [
            { "name": "t-shirt size", "type": "select", "options": "S, M, L" },
            { "name": "dietary", "type": "text", "required": false }
        ],
        "tickets": [
            {
                "name": "General",
                "category": "GENERAL",
                "price": 0,
                "limit": 10,
                "ticketsPerPurchase": 2
            }
        ]
    })
}

#[tokio::test]
async fn test_health_check() {
    let app = app_with(false);

    let (status, body) = app.send(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_empty_public_listing() {
    let app = app_with(false);

    let (status, body) = app.send(Method::GET, "/events/public", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["emptyMessage"], "No events found");
    assert_eq!(body["data"]["header"], "Events near you");

    let (_, body) = app
        .send(Method::GET, "/events/public?showHeader=false", None)
        .await;
    assert_eq!(body["data"]["header"], Value::Null);
}

#[tokio::test]
async fn test_create_event_normalizes_input() {
    let app = app_with(false);
    let (org, _) = app.seed().await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/organizations/{}/events", org.id),
            Some(event_body()),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let event = &body["data"];
    assert_eq!(event["virtualLink"], Value::Null);
    assert!(event["startDate"]
        .as_str()
        .unwrap()
        .starts_with("2031-09-01T00:00:00"));
    assert_eq!(event["requiresApproval"], false);
    assert_eq!(event["customFields"][0]["required"], true);

    let (status, fetched) = app
        .send(Method::GET, &format!("/events/{}", event["id"].as_str().unwrap()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["title"], "RustConf");

    let (_, listing) = app.send(Method::GET, "/events/public", None).await;
    assert_eq!(listing["data"]["events"][0]["organization"]["name"], "Rustaceans");
    assert_eq!(listing["data"]["emptyMessage"], Value::Null);
}

#[tokio::test]
async fn test_create_event_reports_every_field() {
    let app = app_with(false);
    let (org, _) = app.seed().await;

    let mut body = event_body();
    body["title"] = json!("");
    body["virtualLink"] = json!("not-a-url");
    body["tickets"][0]["price"] = json!(-1);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/organizations/{}/events", org.id),
            Some(body),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let paths: Vec<&str> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["path"].as_str())
        .collect();
    assert!(paths.contains(&"title"));
    assert!(paths.contains(&"virtualLink"));
    assert!(paths.contains(&"tickets.0.price"));
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = app_with(false);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/organizations/any/events")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_event_is_404() {
    let app = app_with(false);

    let (status, body) = app.send(Method::GET, "/events/missing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_registration_flow() {
    let app = app_with(false);
    let (org, ada) = app.seed().await;
    let bob = app.store.add_user("Bob", "bob@example.com").await;

    let (_, created) = app
        .send(
            Method::POST,
            &format!("/organizations/{}/events", org.id),
            Some(event_body()),
        )
        .await;
    let event_id = created["data"]["id"].as_str().unwrap().to_string();
    let ticket_id = created["data"]["tickets"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/events/{}/registrations", event_id);

    let (status, body) = app
        .send(
            Method::POST,
            &uri,
            Some(json!({ "userId": ada.id, "customFields": { "t-shirt size": "XL" } })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"][0]["path"], "customFields.t-shirt size");

    let (status, body) = app
        .send(
            Method::POST,
            &uri,
            Some(json!({
                "userId": ada.id,
                "customFields": { "t-shirt size": "M" },
                "tickets": [{ "ticketId": ticket_id, "quantity": 2 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "APPROVED");
    assert_eq!(body["data"]["tickets"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .send(
            Method::POST,
            &uri,
            Some(json!({ "userId": bob.id, "customFields": { "t-shirt size": "S" } })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "Event is full");

    let (status, body) = app.send(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_onboarding_flow() {
    let app = app_with(false);

    let (_, body) = app
        .send(Method::GET, "/billing/connect-accounts/org_1", None)
        .await;
    assert_eq!(body["data"]["view"]["headline"], "Get ready for take off");
    assert_eq!(body["data"]["view"]["signUpAvailable"], true);

    let (status, body) = app
        .send(
            Method::POST,
            "/billing/connect-accounts",
            Some(json!({ "accountId": "org_1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"]["connectedAccountId"], "acct_org_1");
    assert_eq!(
        body["data"]["view"]["headline"],
        "Add information to start accepting money"
    );

    let (status, _) = app
        .send(
            Method::POST,
            "/billing/connect-accounts",
            Some(json!({ "accountId": "org_1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(Method::POST, "/billing/connect-accounts/org_1/exit", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["view"]["callouts"][1],
        "The Account Onboarding component has exited"
    );
}

#[tokio::test]
async fn test_onboarding_requires_account_id() {
    let app = app_with(false);

    let (status, body) = app
        .send(
            Method::POST,
            "/billing/connect-accounts",
            Some(json!({ "accountId": "" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"][0]["path"], "accountId");
}

#[tokio::test]
async fn test_failed_account_creation_shows_generic_error() {
    let app = app_with(true);

    let (status, body) = app
        .send(
            Method::POST,
            "/billing/connect-accounts",
            Some(json!({ "accountId": "org_1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["message"], "Something went wrong!");

    let (_, body) = app
        .send(Method::GET, "/billing/connect-accounts/org_1", None)
        .await;
    assert_eq!(body["data"]["view"]["errorMessage"], "Something went wrong!");
    assert_eq!(body["data"]["view"]["signUpAvailable"], true);
}
