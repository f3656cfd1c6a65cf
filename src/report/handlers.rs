use std::path::{Component, Path};

use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Local, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use utoipa::{IntoParams, ToSchema};

use super::bundle::build_zip;
use super::converter::Artifacts;
use super::format::ResponseFormat;
use super::job::Job;
use crate::auth::validate_api_key;
use crate::payload::ReportPayload;
use crate::{AppState, ErrorResponse};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// links (default), zip, pdf, docx or html; case-insensitive
    pub format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportLinks {
    pub html: String,
    pub pdf: String,
    pub docx: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReportLinksResponse {
    pub message: String,
    pub files: ReportLinks,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub agents_ready: bool,
    pub init_error: Option<String>,
    pub time: String,
}

#[utoipa::path(
    context_path = "/api",
    tag = "Report Service",
    post,
    path = "/report",
    params(ReportQuery),
    request_body(
        content = String,
        content_type = "application/json",
        description = "Report payload: title, period, generated_on and the per-sector stock data"
    ),
    responses(
        (status = 200, description = "Report generated; links JSON or the requested file", body = ReportLinksResponse),
        (status = 400, description = "Unsupported format, malformed JSON or invalid payload", body = ErrorResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
        (status = 500, description = "Job directory or conversion failure", body = ErrorResponse),
        (status = 503, description = "Text generation unavailable or failed", body = ErrorResponse)
    )
)]
pub async fn create_report(
    req: HttpRequest,
    query: web::Query<ReportQuery>,
    body: web::Bytes,
    data: web::Data<AppState>,
) -> HttpResponse {
    if let Err(response) = validate_api_key(&req, data.config.api_key.as_deref()) {
        return response;
    }

    let format = match ResponseFormat::parse(query.format.as_deref()) {
        Ok(format) => format,
        Err(e) => return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&e.to_string())),
    };

    let document = match serde_json::from_slice::<Value>(&body) {
        Ok(value @ Value::Object(_)) => value,
        _ => {
            warn!("Rejected report request with a non-object JSON body");
            return HttpResponse::BadRequest().json(ErrorResponse::bad_request("Invalid JSON body"));
        }
    };
    let mut payload: ReportPayload = match serde_json::from_value(document) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Payload does not match the report schema: {}", e);
            return HttpResponse::BadRequest()
                .json(ErrorResponse::bad_request(&format!("Invalid payload: {}", e)));
        }
    };
    if let Err(errors) = payload.validate() {
        warn!("Payload validation failed with {} error(s)", errors.len());
        return HttpResponse::BadRequest().json(ErrorResponse::bad_request(&errors.to_message()));
    }
    payload.ensure_generated_on(&Local::now().format("%Y-%m-%d").to_string());

    let job = match Job::create(&data.config.output_dir, payload.title(), Local::now()) {
        Ok(job) => job,
        Err(e) => {
            error!("Failed to create job: {}", e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error("Failed to create report job"));
        }
    };
    info!("Job {} started (format {})", job.id, format);

    // Dropping this handler future (client gone) cancels pending generation.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let document = match data.orchestrator.orchestrate(&payload, &job, &cancel).await {
        Ok(document) => document,
        Err(e) => {
            error!("Job {} failed during generation: {}", job.id, e);
            return HttpResponse::ServiceUnavailable()
                .json(ErrorResponse::service_unavailable(&e.to_string()));
        }
    };

    let artifacts = match data.converter.convert(&job, &document.html).await {
        Ok(artifacts) => artifacts,
        Err(e) => {
            error!("Job {} failed during conversion: {}", job.id, e);
            return HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&e.to_string()));
        }
    };
    guard.disarm();
    info!("Job {} completed", job.id);

    respond(&req, format, &job, artifacts).await
}

async fn respond(req: &HttpRequest, format: ResponseFormat, job: &Job, artifacts: Artifacts) -> HttpResponse {
    match format {
        ResponseFormat::Links => HttpResponse::Ok().json(ReportLinksResponse {
            message: "Report generated.".to_string(),
            files: ReportLinks {
                html: job.download_url("html"),
                pdf: job.download_url("pdf"),
                docx: job.download_url("docx"),
            },
            id: job.id.clone(),
        }),
        ResponseFormat::Zip => match web::block(move || build_zip(&artifacts)).await {
            Ok(Ok(bytes)) => HttpResponse::Ok()
                .content_type("application/zip")
                .insert_header(attachment(job.file_name("zip")))
                .body(bytes),
            Ok(Err(e)) => {
                error!("Job {}: failed to build zip: {}", job.id, e);
                HttpResponse::InternalServerError()
                    .json(ErrorResponse::internal_error("Failed to build zip bundle"))
            }
            Err(e) => {
                error!("Job {}: zip task failed: {}", job.id, e);
                HttpResponse::InternalServerError()
                    .json(ErrorResponse::internal_error("Failed to build zip bundle"))
            }
        },
        ResponseFormat::Pdf => serve_attachment(req, &artifacts.pdf).await,
        ResponseFormat::Docx => serve_attachment(req, &artifacts.docx).await,
        ResponseFormat::Html => serve_attachment(req, &artifacts.html).await,
    }
}

fn attachment(filename: String) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename)],
    }
}

async fn serve_attachment(req: &HttpRequest, path: &Path) -> HttpResponse {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match NamedFile::open_async(path).await {
        Ok(file) => file
            .set_content_disposition(attachment(filename))
            .into_response(req),
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            HttpResponse::NotFound().json(ErrorResponse::not_found(&format!("File '{}' not found", filename)))
        }
    }
}

/// A single plain path segment: no separators, no parent references, nothing
/// a filename sanitizer would rewrite.
fn is_plain_segment(segment: &str) -> bool {
    if segment.is_empty() || segment.contains("..") || segment.contains('/') || segment.contains('\\') {
        return false;
    }
    let path = Path::new(segment);
    if path.is_absolute() {
        return false;
    }
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && sanitize_filename::sanitize(segment) == segment
}

#[utoipa::path(
    tag = "Report Service",
    get,
    path = "/download/{job_id}/{filename}",
    params(
        ("job_id" = String, Path, description = "Job identifier returned by POST /api/report"),
        ("filename" = String, Path, description = "Artifact file name, e.g. {job_id}.pdf")
    ),
    responses(
        (status = 200, description = "Artifact as an attachment"),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
        (status = 403, description = "Path escapes the job directory", body = ErrorResponse),
        (status = 404, description = "Unknown job or file", body = ErrorResponse)
    )
)]
pub async fn download_artifact(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    data: web::Data<AppState>,
) -> HttpResponse {
    if let Err(response) = validate_api_key(&req, data.config.api_key.as_deref()) {
        return response;
    }

    let (job_id, filename) = path.into_inner();
    if !is_plain_segment(&job_id) || !is_plain_segment(&filename) {
        warn!("Rejected download of {}/{}: unsafe path", job_id, filename);
        return HttpResponse::Forbidden().json(ErrorResponse::forbidden("Forbidden"));
    }

    let job_dir = data.config.output_dir.join(&job_id);
    let target = job_dir.join(&filename);
    let (Ok(root), Ok(resolved)) = (job_dir.canonicalize(), target.canonicalize()) else {
        debug!("Download of missing artifact {}/{}", job_id, filename);
        return HttpResponse::NotFound()
            .json(ErrorResponse::not_found(&format!("File '{}' not found", filename)));
    };
    if !resolved.starts_with(&root) {
        warn!("Rejected download of {}/{}: resolves outside the job", job_id, filename);
        return HttpResponse::Forbidden().json(ErrorResponse::forbidden("Forbidden"));
    }
    if !resolved.is_file() {
        return HttpResponse::NotFound()
            .json(ErrorResponse::not_found(&format!("File '{}' not found", filename)));
    }

    serve_attachment(&req, &resolved).await
}

#[utoipa::path(
    tag = "System",
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse)
    )
)]
pub async fn health(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    if let Err(response) = validate_api_key(&req, data.config.api_key.as_deref()) {
        return response;
    }

    // Touching the provider triggers lazy initialisation; failures show up in init_error.
    if let Err(e) = data.provider.get().await {
        debug!("Health check: agents not ready: {}", e);
    }
    let status = data.provider.status();

    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        agents_ready: status.ready,
        init_error: status.init_error,
        time: Utc::now().to_rfc3339(),
    })
}
