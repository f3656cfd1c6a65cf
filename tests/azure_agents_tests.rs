//! The agent service client against a local stand-in for the REST API and
//! the Entra token endpoint.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use parking_lot::Mutex;
use serde_json::{json, Value};

use property_stock_report::agents::{
    instructions::all_profiles, AzureAgentsClient, ClientCredentials, ClientCredentialsToken,
    GenerationCapability, GenerationError, StaticToken, TokenSource, ENGLISH_REPORT,
};
use property_stock_report::config::AgentsConfig;

/// Tokens are handed out as `tok-1`, `tok-2`, ...; `tok-1` is refused as if
/// it had been revoked.
#[derive(Default)]
struct FakeService {
    token_requests: AtomicUsize,
    calls: Mutex<Vec<String>>,
    thread_bodies: Mutex<Vec<Value>>,
    run_bodies: Mutex<Vec<Value>>,
}

impl FakeService {
    fn authorized(&self, req: &HttpRequest) -> bool {
        let header = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        header.starts_with("Bearer tok-") && header != "Bearer tok-1"
    }

    fn record(&self, req: &HttpRequest) {
        let query = req.query_string();
        let after = query
            .split('&')
            .find(|pair| pair.starts_with("after="))
            .map(|pair| format!("?{}", pair))
            .unwrap_or_default();
        self.calls
            .lock()
            .push(format!("{} {}{}", req.method(), req.path(), after));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

async fn token(
    state: web::Data<FakeService>,
    form: web::Form<HashMap<String, String>>,
) -> HttpResponse {
    assert_eq!(form.get("grant_type").map(String::as_str), Some("client_credentials"));
    assert_eq!(form.get("scope").map(String::as_str), Some("https://ai.azure.com/.default"));
    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;
    HttpResponse::Ok().json(json!({
        "token_type": "Bearer",
        "expires_in": 3599,
        "access_token": format!("tok-{}", n)
    }))
}

async fn list_agents(state: web::Data<FakeService>, req: HttpRequest) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    state.record(&req);
    if req.query_string().contains("after=asst_other") {
        HttpResponse::Ok().json(json!({
            "data": [{"id": "asst_eng", "name": "eng-report-agent"}],
            "has_more": false,
            "last_id": "asst_eng"
        }))
    } else {
        HttpResponse::Ok().json(json!({
            "data": [{"id": "asst_other", "name": "someone-elses-agent"}],
            "has_more": true,
            "last_id": "asst_other"
        }))
    }
}

async fn create_agent(
    state: web::Data<FakeService>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    state.record(&req);
    let name = body["name"].as_str().unwrap_or_default();
    HttpResponse::Ok().json(json!({ "id": format!("asst_new_{}", name) }))
}

async fn update_agent(
    state: web::Data<FakeService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    state.record(&req);
    HttpResponse::Ok().json(json!({ "id": path.into_inner() }))
}

async fn create_thread(
    state: web::Data<FakeService>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    state.record(&req);
    state.thread_bodies.lock().push(body.into_inner());
    HttpResponse::Ok().json(json!({ "id": "thread_ok" }))
}

async fn create_run(
    state: web::Data<FakeService>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    state.record(&req);
    match path.as_str() {
        "thread_invalid" => HttpResponse::BadRequest().json(json!({
            "error": {"message": "thread is not valid"}
        })),
        "thread_busy" => HttpResponse::ServiceUnavailable().finish(),
        _ => {
            state.run_bodies.lock().push(body.into_inner());
            HttpResponse::Ok().json(json!({ "id": "run_ok", "status": "queued" }))
        }
    }
}

async fn list_runs(
    state: web::Data<FakeService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> HttpResponse {
    if !state.authorized(&req) {
        return HttpResponse::Unauthorized().finish();
    }
    state.record(&req);
    let data = if path.as_str() == "thread_ok" {
        json!([{ "id": "run_ok" }])
    } else {
        json!([])
    };
    HttpResponse::Ok().json(json!({ "data": data, "has_more": false }))
}

fn start_fake_service() -> (SocketAddr, web::Data<FakeService>) {
    let state = web::Data::new(FakeService::default());
    let data = state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/{tenant}/oauth2/v2.0/token", web::post().to(token))
            .route("/assistants", web::get().to(list_agents))
            .route("/assistants", web::post().to(create_agent))
            .route("/assistants/{id}", web::post().to(update_agent))
            .route("/threads", web::post().to(create_thread))
            .route("/threads/{tid}/runs", web::post().to(create_run))
            .route("/threads/{tid}/runs", web::get().to(list_runs))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    (addr, state)
}

fn agents_config(addr: SocketAddr) -> AgentsConfig {
    AgentsConfig {
        endpoint: format!("http://{}", addr),
        model_deployment: "gpt-4o".to_string(),
        api_token: None,
        credentials: None,
        api_version: "v1".to_string(),
    }
}

fn service_principal(addr: SocketAddr) -> Arc<dyn TokenSource> {
    Arc::new(ClientCredentialsToken::new(
        ClientCredentials {
            tenant_id: "tenant-1".to_string(),
            client_id: "report-service".to_string(),
            client_secret: "secret".to_string(),
            authority_host: format!("http://{}", addr),
            scope: "https://ai.azure.com/.default".to_string(),
        },
        reqwest::Client::new(),
    ))
}

#[actix_web::test]
async fn test_revoked_token_is_replaced_and_agents_are_paged() {
    let (addr, state) = start_fake_service();
    let client = AzureAgentsClient::new(
        agents_config(addr),
        service_principal(addr),
        reqwest::Client::new(),
    );

    client.ensure_agents(&all_profiles()).await.unwrap();

    assert_eq!(state.token_requests.load(Ordering::SeqCst), 2);
    let calls = state.calls();
    assert_eq!(
        calls,
        vec![
            "GET /assistants".to_string(),
            "GET /assistants?after=asst_other".to_string(),
            "POST /assistants/asst_eng".to_string(),
            "POST /assistants".to_string(),
            "POST /assistants".to_string(),
        ]
    );
}

#[actix_web::test]
async fn test_thread_carries_message_and_run_can_be_found() {
    let (addr, state) = start_fake_service();
    let client = AzureAgentsClient::new(
        agents_config(addr),
        Arc::new(StaticToken::new("tok-static")),
        reqwest::Client::new(),
    );
    client.ensure_agents(&all_profiles()).await.unwrap();

    let thread_id = client.create_thread("{\"hint\":\"h\"}").await.unwrap();
    assert_eq!(thread_id, "thread_ok");
    let bodies = state.thread_bodies.lock().clone();
    assert_eq!(bodies[0]["messages"][0]["role"], "user");
    assert_eq!(bodies[0]["messages"][0]["content"], "{\"hint\":\"h\"}");

    let run = client.start_run(&ENGLISH_REPORT, &thread_id).await.unwrap();
    assert_eq!(run.run_id, "run_ok");
    assert_eq!(state.run_bodies.lock()[0]["assistant_id"], "asst_eng");

    let found = client.find_run(&thread_id).await.unwrap();
    assert_eq!(found, Some(run));
    assert_eq!(client.find_run("thread_empty").await.unwrap(), None);
}

#[actix_web::test]
async fn test_failures_are_classified_by_status() {
    let (addr, _state) = start_fake_service();
    let client = AzureAgentsClient::new(
        agents_config(addr),
        Arc::new(StaticToken::new("tok-static")),
        reqwest::Client::new(),
    );
    client.ensure_agents(&all_profiles()).await.unwrap();

    let rejected = client
        .start_run(&ENGLISH_REPORT, "thread_invalid")
        .await
        .unwrap_err();
    assert!(matches!(rejected, GenerationError::Rejected(_)));
    assert!(!rejected.is_transient());

    let busy = client
        .start_run(&ENGLISH_REPORT, "thread_busy")
        .await
        .unwrap_err();
    assert!(matches!(busy, GenerationError::Submit(_)));
    assert!(busy.is_transient());
}

#[actix_web::test]
async fn test_fixed_token_that_is_refused_reports_auth_failure() {
    let (addr, _state) = start_fake_service();
    let client = AzureAgentsClient::new(
        agents_config(addr),
        Arc::new(StaticToken::new("tok-1")),
        reqwest::Client::new(),
    );

    let err = client.ensure_agents(&all_profiles()).await.unwrap_err();
    assert!(err.is_auth_failure());
}
