//! End-to-end HTTP tests over the full router with a file-backed SQLite
//! store and a scripted model runtime.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use csvchat::agent::{AgentEvent, AgentRuntime, RunInput, UpstreamError};
use csvchat::config::Config;
use csvchat::entities::AnyStore;
use csvchat::registry::SessionRegistry;
use csvchat::routes;
use csvchat::state::AppState;

const SALES_CSV: &str = "id,name,sales,month\n\
                         1,Product A,100,Jan\n\
                         2,Product B,200,Feb\n\
                         3,Product A,150,Mar\n\
                         4,Product B,250,Apr\n\
                         5,Product A,180,May\n";

/// Pops one scripted outcome per run; empty script means upstream failure.
struct Scripted {
    outcomes: Mutex<Vec<Result<Vec<AgentEvent>, UpstreamError>>>,
}

impl Scripted {
    fn failing() -> Self {
        Self { outcomes: Mutex::new(Vec::new()) }
    }

    fn replying(text: &str) -> Self {
        Self {
            outcomes: Mutex::new(vec![Ok(vec![AgentEvent::Text { text: text.to_owned() }])]),
        }
    }
}

#[async_trait]
impl AgentRuntime for Scripted {
    async fn run(&self, _input: RunInput<'_>) -> Result<Vec<AgentEvent>, UpstreamError> {
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .pop()
            .unwrap_or_else(|| Err(UpstreamError("scripted upstream failure".into())))
    }
}

async fn test_app(runtime: Arc<dyn AgentRuntime>) -> Router {
    let path = std::env::temp_dir().join(format!("csvchat-api-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let store = AnyStore::connect(&url).await.expect("test store connects");

    let mut config = Config::from_env();
    config.database_url = url;
    config.enable_swagger = false;

    routes::build(Arc::new(AppState {
        config: Arc::new(config),
        store: Arc::new(store),
        sessions: Arc::new(SessionRegistry::new()),
        runtime,
    }))
}

const BOUNDARY: &str = "csvchat-test-boundary";

fn multipart_upload(filename: &str, contents: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {contents}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

fn json_post(path: &str, body: Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is json")
}

async fn upload_sales(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(multipart_upload("sales.csv", SALES_CSV))
        .await
        .expect("upload request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["session_id"].as_str().expect("session id").to_owned()
}

#[tokio::test]
async fn upload_then_info_reports_same_shape() {
    let app = test_app(Arc::new(Scripted::failing())).await;

    let response = app
        .clone()
        .oneshot(multipart_upload("sales.csv", SALES_CSV))
        .await
        .expect("upload request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "File uploaded successfully");
    assert_eq!(body["rows"], 5);
    assert_eq!(body["columns"], json!(["id", "name", "sales", "month"]));
    assert_eq!(body["preview"].as_array().map(Vec::len), Some(5));
    let id = body["session_id"].as_str().expect("session id");

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/session/{id}/info"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("info request");
    assert_eq!(response.status(), StatusCode::OK);
    let info = body_json(response).await;
    assert_eq!(info["rows"], 5);
    assert_eq!(info["columns"], json!(["id", "name", "sales", "month"]));
    assert_eq!(info["dtypes"]["sales"], "int64");
    assert_eq!(info["dtypes"]["name"], "object");
    assert_eq!(info["message_count"], 0);
}

#[tokio::test]
async fn upload_rejects_non_csv_filename() {
    let app = test_app(Arc::new(Scripted::failing())).await;
    let response = app
        .oneshot(multipart_upload("data.txt", SALES_CSV))
        .await
        .expect("upload request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "File must be a CSV");
}

#[tokio::test]
async fn upload_rejects_header_only_csv() {
    let app = test_app(Arc::new(Scripted::failing())).await;
    let response = app
        .oneshot(multipart_upload("empty.csv", "id,name,sales,month\n"))
        .await
        .expect("upload request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "CSV file contains no data");
}

#[tokio::test]
async fn query_on_unknown_session_is_not_found() {
    let app = test_app(Arc::new(Scripted::failing())).await;
    let response = app
        .oneshot(json_post(
            "/query",
            json!({ "session_id": "missing", "query": "mean sales" }),
        ))
        .await
        .expect("query request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(
        body["error"],
        "No data found for this session. Please upload a CSV file first."
    );
}

#[tokio::test]
async fn query_falls_back_when_model_is_unreachable() {
    let app = test_app(Arc::new(Scripted::failing())).await;
    let id = upload_sales(&app).await;

    let response = app
        .clone()
        .oneshot(json_post(
            "/query",
            json!({ "session_id": id, "query": "What is the mean of sales?" }),
        ))
        .await
        .expect("query request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], "Mean of sales: 176.00");
    assert_eq!(body["source"], "fallback");

    // Both turns were persisted even though the model never answered.
    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/session/{id}/messages"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("messages request");
    assert_eq!(response.status(), StatusCode::OK);
    let transcript = body_json(response).await;
    let transcript = transcript.as_array().expect("array");
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0]["role"], "user");
    assert_eq!(transcript[1]["role"], "assistant");
    assert_eq!(transcript[1]["metadata"]["source"], "fallback");
}

#[tokio::test]
async fn query_returns_agent_reply_verbatim() {
    let app = test_app(Arc::new(Scripted::replying("The total is 880."))).await;
    let id = upload_sales(&app).await;

    let response = app
        .oneshot(json_post(
            "/query",
            json!({ "session_id": id, "query": "sum of sales?" }),
        ))
        .await
        .expect("query request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["response"], "The total is 880.");
    assert_eq!(body["source"], "agent");
}

#[tokio::test]
async fn delete_cascades_to_messages() {
    let app = test_app(Arc::new(Scripted::failing())).await;
    let id = upload_sales(&app).await;

    app.clone()
        .oneshot(json_post(
            "/query",
            json!({ "session_id": id, "query": "mean sales" }),
        ))
        .await
        .expect("query request");

    let response = app
        .clone()
        .oneshot(
            Request::get("/sessions")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("list request");
    assert_eq!(response.status(), StatusCode::OK);
    let sessions = body_json(response).await;
    let sessions = sessions.as_array().expect("array");
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["message_count"], 2);

    let response = app
        .clone()
        .oneshot(
            Request::delete(format!("/session/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("delete request");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["deleted"], true);

    let response = app
        .clone()
        .oneshot(
            Request::get(format!("/session/{id}/messages"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("messages request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::delete(format!("/session/{id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("second delete");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
