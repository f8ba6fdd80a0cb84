//! Admin console against a mocked backend.

use serde_json::json;
use sttcast_client_lib::admin::{AdminConsole, ApplyOutcome, CategoryForm, ItemClass, ItemRef};
use sttcast_client_lib::api::{ApiClient, LlmProposal};
use sttcast_client_lib::config::ClientConfig;
use sttcast_client_lib::error::AppError;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn console(server: &MockServer) -> AdminConsole {
    let config = ClientConfig {
        base_url: server.uri(),
        base_path: Some("/sttcast".into()),
        session_cookie: Some("session=abc".into()),
        wake_lock: None,
        ..ClientConfig::default()
    };
    AdminConsole::new(ApiClient::new(&config).unwrap())
}

fn proposal() -> LlmProposal {
    serde_json::from_value(json!({
        "categories": [
            {
                "name": "Ciencia", "slug": "ciencia", "is_primary": true,
                "children": [
                    {"name": "Física", "slug": "fisica", "is_primary": false},
                    {"name": "Química", "slug": "quimica", "is_primary": false}
                ]
            },
            {"name": "Historia", "slug": "historia", "is_primary": true}
        ],
        "assignments": [
            {"query_id": 1, "category_slugs": ["fisica", "historia"], "confidence": 0.9},
            {"query_id": 2, "category_slugs": ["quimica"], "confidence": 0.7}
        ],
        "reparents": [
            {"category_slug": "historia", "new_parent_slug": null, "reason": "root"}
        ],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "cost_usd": 0.001}
    }))
    .unwrap()
}

async fn mount_reloads(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tree": [], "flat": []})))
        .expect(expected)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/queries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queries": []})))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_apply_sends_only_checked_items_then_reloads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sttcast/api/admin/apply_categories"))
        .and(header("cookie", "session=abc"))
        .and(body_json(json!({
            "categories": [
                {"name": "Física", "slug": "fisica", "is_primary": false, "children": []},
                {"name": "Historia", "slug": "historia", "is_primary": true, "children": []}
            ],
            "assignments": [
                {"query_id": 1, "category_slugs": ["fisica", "historia"], "confidence": 0.9}
            ],
            "reparents": []
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "created_categories": 2, "applied_assignments": 1, "applied_reparents": 0
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_reloads(&server, 1).await;

    let mut console = console(&server);
    console.review_mut().load(proposal());
    // parent unchecked, one child kept: the child becomes a root category
    console.review_mut().set(ItemRef::Category(0), false).unwrap();
    console.review_mut().set(ItemRef::Child(0, 1), false).unwrap();
    console
        .review_mut()
        .toggle_all(ItemClass::Reparents, false)
        .unwrap();

    let mut asked = Vec::new();
    let mut confirm = |m: &str| {
        asked.push(m.to_string());
        true
    };
    let outcome = console.apply_proposal(&mut confirm).await.unwrap();
    match outcome {
        ApplyOutcome::Applied(result) => {
            assert_eq!(result.to_string(), "Categories: 2, assignments: 1");
        }
        ApplyOutcome::Cancelled => panic!("expected the proposal to be applied"),
    }
    assert_eq!(
        asked,
        vec!["Apply 2 categories, 1 assignments and 0 reparents?"]
    );
    assert!(console.review().proposal().is_none());
}

#[tokio::test]
async fn test_apply_with_nothing_selected_never_calls_backend() {
    let server = MockServer::start().await;
    let mut console = console(&server);
    console.review_mut().load(proposal());
    for class in [
        ItemClass::Categories,
        ItemClass::Assignments,
        ItemClass::Reparents,
    ] {
        console.review_mut().toggle_all(class, false).unwrap();
    }

    let mut confirm = |_: &str| -> bool { panic!("must not ask for confirmation") };
    let err = console.apply_proposal(&mut confirm).await.unwrap_err();
    assert!(err.is_validation());
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(console.review().proposal().is_some());
}

#[tokio::test]
async fn test_declined_confirmation_keeps_proposal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sttcast/api/admin/apply_categories"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut console = console(&server);
    console.review_mut().load(proposal());
    let mut confirm = |_: &str| false;
    assert_eq!(
        console.apply_proposal(&mut confirm).await.unwrap(),
        ApplyOutcome::Cancelled
    );
    assert!(console.review().proposal().is_some());
}

#[tokio::test]
async fn test_suggestion_requires_featured_queries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/queries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queries": [
            {"id": 1, "uuid": Uuid::new_v4(), "query_text": "a", "featured": false}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sttcast/api/admin/suggest_categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let mut console = console(&server);
    console.load_queries().await.unwrap();
    assert!(!console.prerequisites().ready());
    let err = console.request_proposal("gpt-4o-mini").await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_suggestion_is_held_for_review() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/queries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queries": [
            {"id": 1, "uuid": Uuid::new_v4(), "query_text": "¿Qué es la entropía?", "featured": true}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sttcast/api/admin/suggest_categories"))
        .and(body_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::to_value(proposal()).unwrap()))
        .expect(1)
        .mount(&server)
        .await;

    let mut console = console(&server);
    console.load_queries().await.unwrap();
    let summary = console.request_proposal("gpt-4o-mini").await.unwrap();
    assert_eq!(summary.categories.len(), 2);
    assert_eq!(summary.assignments[0].query, "¿Qué es la entropía?");
    assert_eq!(summary.assignments[1].query, "Query #2");
    assert_eq!(summary.reparents[0].parent, "(root)");
    assert!(summary.usage.unwrap().starts_with("Tokens: 10 in + 5 out"));

    console.discard_proposal();
    assert!(console.review().proposal().is_none());
}

#[tokio::test]
async fn test_toggle_featured_applies_returned_value() {
    let server = MockServer::start().await;
    let uuid = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/queries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"queries": [
            {"id": 1, "uuid": uuid, "query_text": "a", "featured": false}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/sttcast/api/admin/toggle_featured/{}", uuid)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"featured": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut console = console(&server);
    console.load_queries().await.unwrap();
    assert!(console.toggle_featured(&uuid.to_string()).await.unwrap());
    assert!(console.queries().queries()[0].featured);
    assert_eq!(console.queries().filter("", true, "").len(), 1);
}

#[tokio::test]
async fn test_new_category_is_posted_with_generated_slug() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sttcast/api/admin/categories"))
        .and(body_json(json!({
            "name": "Física Cuántica",
            "slug": "fisica-cuantica",
            "description": "",
            "parent_id": 3,
            "is_primary": false,
            "display_order": 0
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 9})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tree": [], "flat": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut console = console(&server);
    let form = CategoryForm {
        name: "Física Cuántica".into(),
        parent_id: Some(3),
        ..Default::default()
    };
    console.save_category(&form).await.unwrap();
}

#[tokio::test]
async fn test_existing_category_is_updated_with_put() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/sttcast/api/admin/categories/4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tree": [], "flat": []})))
        .mount(&server)
        .await;

    let mut console = console(&server);
    let form = CategoryForm {
        id: Some(4),
        name: "Historia".into(),
        slug: "historia".into(),
        ..Default::default()
    };
    console.save_category(&form).await.unwrap();
}

#[tokio::test]
async fn test_delete_needs_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/sttcast/api/admin/categories/4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tree": [], "flat": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut console = console(&server);
    let mut no = |_: &str| false;
    assert!(!console.delete_category(4, &mut no).await.unwrap());
    let mut yes = |_: &str| true;
    assert!(console.delete_category(4, &mut yes).await.unwrap());
}

#[tokio::test]
async fn test_assignment_reloads_queries_and_categories() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sttcast/api/admin/assign_category"))
        .and(body_json(json!({"query_id": 1, "category_id": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;
    mount_reloads(&server, 1).await;

    let mut console = console(&server);
    console.assign(1, 4).await.unwrap();
}

#[tokio::test]
async fn test_expired_session_stops_with_login_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sttcast/api/admin/queries"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut console = console(&server);
    match console.load_queries().await.unwrap_err() {
        AppError::Unauthorized { login_url } => assert!(login_url.ends_with("/sttcast/admin/login")),
        other => panic!("expected unauthorized, got {:?}", other),
    }
}
