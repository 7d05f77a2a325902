use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};
use sprintdesk_client::{
    InMemoryCredentialStore, ReqwestTransport, ReqwestTransportConfig, ResourceClient, SprintKind,
};
use sprintdesk_domain::{ClientError, Credentials, NewSprint, ProjectId, SprintId};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct MockState {
    authorizations: Arc<Mutex<Vec<Option<String>>>>,
    created: Arc<Mutex<Vec<Value>>>,
    deleted: Arc<Mutex<Vec<u64>>>,
}

impl MockState {
    fn record_authorization(&self, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        self.authorizations
            .lock()
            .expect("authorizations lock")
            .push(value);
    }
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "correct" {
        (
            StatusCode::OK,
            Json(json!({"access": "access-1", "refresh": "refresh-1"})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "invalid credentials"})),
        )
    }
}

async fn list_sprints(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    state.record_authorization(&headers);
    let project = query
        .get("proyecto_id")
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or_default();
    Json(json!([
        {"id": 1, "nombre_sprint": "Kickoff", "fecha_inicio": "2024-01-01", "fecha_fin": "2024-01-14", "proyecto": project},
        {"id": 2, "nombre_sprint": "Build", "fecha_inicio": "2024-01-15", "fecha_fin": "2024-01-28", "proyecto": {"id": project}}
    ]))
}

async fn create_sprint(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.record_authorization(&headers);
    state.created.lock().expect("created lock").push(body.clone());
    if body["nombre_sprint"] == "Duplicate" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"nombre_sprint": ["sprint with this name already exists."]})),
        );
    }
    let mut created = body;
    created["id"] = json!(3);
    (StatusCode::CREATED, Json(created))
}

async fn delete_sprint(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path(sprint_id): Path<u64>,
) -> StatusCode {
    state.record_authorization(&headers);
    state.deleted.lock().expect("deleted lock").push(sprint_id);
    if sprint_id == 404 {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn spawn_mock_server() -> (String, MockState, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/login/", post(login))
        .route("/api/sprints/getSprintsPerProyecto/", get(list_sprints))
        .route("/api/sprints/", post(create_sprint))
        .route("/api/sprints/{sprint_id}/", delete(delete_sprint))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server listener");
    let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        server.await.expect("run mock server");
    });
    (format!("http://{address}/api/"), state, shutdown_tx, handle)
}

fn client_for(base_url: String) -> ResourceClient {
    let transport = ReqwestTransport::new(
        ReqwestTransportConfig::new(base_url, 3).expect("transport config"),
    )
    .expect("build transport");
    ResourceClient::new(Arc::new(transport), Arc::new(InMemoryCredentialStore::default()))
}

fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date")
}

#[tokio::test]
async fn sprint_lifecycle_round_trips_through_http() {
    let (base_url, state, shutdown_tx, server_task) = spawn_mock_server().await;
    let client = client_for(base_url);

    client
        .login(&Credentials {
            email: "ana@example.com".to_owned(),
            password: "correct".to_owned(),
        })
        .await
        .expect("login");

    let sprints = client
        .list::<SprintKind>(Some(ProjectId::new(8)))
        .await
        .expect("list sprints");
    assert_eq!(sprints.len(), 2);
    assert!(sprints.iter().all(|sprint| sprint.project == ProjectId::new(8)));

    let created = client
        .create::<SprintKind>(&NewSprint {
            name: "Polish".to_owned(),
            start_date: date("2024-01-29"),
            end_date: date("2024-02-11"),
            project: ProjectId::new(8),
        })
        .await
        .expect("create sprint");
    assert_eq!(created.id, SprintId::new(3));
    assert_eq!(created.start_date, Some(date("2024-01-29")));

    client
        .remove::<SprintKind>(SprintId::new(3))
        .await
        .expect("delete sprint");
    let missing = client
        .remove::<SprintKind>(SprintId::new(404))
        .await
        .expect_err("delete missing sprint");
    assert!(missing.is_not_found());

    let rejected = client
        .create::<SprintKind>(&NewSprint {
            name: "Duplicate".to_owned(),
            start_date: date("2024-03-01"),
            end_date: date("2024-03-10"),
            project: ProjectId::new(8),
        })
        .await
        .expect_err("duplicate sprint");
    assert!(matches!(
        rejected,
        ClientError::Validation { ref fields } if fields[0].field == "nombre_sprint"
    ));

    let authorizations = state
        .authorizations
        .lock()
        .expect("authorizations lock")
        .clone();
    assert!(!authorizations.is_empty());
    assert!(authorizations
        .iter()
        .all(|value| value.as_deref() == Some("Bearer access-1")));
    let created_bodies = state.created.lock().expect("created lock").clone();
    assert_eq!(created_bodies[0]["proyecto"], 8);
    assert_eq!(created_bodies[0]["fecha_inicio"], "2024-01-29");
    assert_eq!(
        state.deleted.lock().expect("deleted lock").clone(),
        vec![3, 404]
    );

    let _ = shutdown_tx.send(());
    server_task.await.expect("join mock server");
}

#[tokio::test]
async fn rejected_login_leaves_credentials_empty() {
    let (base_url, _state, shutdown_tx, server_task) = spawn_mock_server().await;
    let client = client_for(base_url);

    let error = client
        .login(&Credentials {
            email: "ana@example.com".to_owned(),
            password: "wrong".to_owned(),
        })
        .await
        .expect_err("login rejected");

    assert_eq!(error.status(), Some(401));
    assert_eq!(client.credentials().bearer_token(), None);

    let _ = shutdown_tx.send(());
    server_task.await.expect("join mock server");
}

#[tokio::test]
async fn unreachable_server_maps_to_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let address = listener.local_addr().expect("probe local addr");
    drop(listener);

    let client = client_for(format!("http://{address}/api"));
    let error = client
        .list::<SprintKind>(Some(ProjectId::new(1)))
        .await
        .expect_err("connection refused");

    assert!(matches!(error, ClientError::Network(_)));
}
