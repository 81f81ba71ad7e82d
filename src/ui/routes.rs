//! # Web Server Routes for the Prediction Service
//!
//! This module defines the Actix web server routes and handlers: the static
//! front-end page, the single-record JSON prediction endpoint, and the batch
//! CSV prediction endpoint.

use actix_web::{web, App, Error, HttpResponse, HttpServer, Responder};
use actix_files::NamedFile;
use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use log::{info, warn};
use serde_json::Value;

use crate::batch;
use crate::config::ServerConfig;
use crate::features::RawInput;
use crate::predictor::{PredictResponse, Predictor};

/// Serves the main HTML page (`index.html`) for the prediction UI.
///
/// This function handles GET requests to the root path (`/`). It
/// asynchronously opens and returns the `index.html` file; a missing file
/// surfaces as the framework's not-found error rather than a panic.
pub async fn index() -> actix_web::Result<NamedFile> {
    Ok(NamedFile::open_async("./src/ui/index.html").await?)
}

/// Handles single-record predictions on `POST /predict`.
///
/// The body is a JSON object with the five chip parameters; values may be
/// numbers or numeric strings, which is what the deployed form submits.
///
/// Every outcome is a `200 OK` with a `status`-tagged JSON body: successes
/// carry the prediction fields, failures carry `{status: "error", message}`.
/// Existing clients branch on the payload tag rather than the HTTP status,
/// so validation and internal failures deliberately keep the 200 code.
pub async fn predict(state: web::Data<Predictor>, body: web::Bytes) -> impl Responder {
    HttpResponse::Ok().json(predict_payload(&state, &body))
}

fn predict_payload(predictor: &Predictor, body: &[u8]) -> PredictResponse {
    let data: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!("rejected /predict body: {}", e);
            return PredictResponse::error(format!("invalid JSON body: {}", e));
        }
    };
    let input = match RawInput::from_json(&data) {
        Ok(input) => input,
        Err(e) => {
            warn!("rejected /predict input: {}", e);
            return PredictResponse::error(e.to_string());
        }
    };
    match predictor.predict_record(&input) {
        Ok(prediction) => PredictResponse::Success(prediction),
        Err(e) => {
            warn!("prediction failed: {}", e);
            PredictResponse::error(e.to_string())
        }
    }
}

/// Handles batch predictions on `POST /batch_predict`.
///
/// Expects `multipart/form-data` with a `file` field holding a CSV that
/// carries the five required columns. The whole upload is buffered in memory
/// and processed in one pass.
///
/// # Returns
/// - **200 OK** with a `text/csv` attachment named `predictions.csv`: the
///   input table with a `Predicted Count` column appended.
/// - **400 Bad Request** with plain text when no `file` field is present
///   (`No file uploaded`), when the filename is empty (`No file selected`),
///   or when required columns are missing.
/// - **500 Internal Server Error** with plain text for any other processing
///   failure. A bad upload never takes the server down.
pub async fn batch_predict(
    state: web::Data<Predictor>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != "file" {
            continue;
        }
        // Fields without a filename attribute are ordinary form values, not
        // file uploads.
        let filename = match field.content_disposition().get_filename() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            bytes.extend_from_slice(&chunk);
        }
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = match upload {
        Some(upload) => upload,
        None => {
            warn!("batch request without a file field");
            return Ok(plain_text(HttpResponse::BadRequest(), "No file uploaded"));
        }
    };
    if filename.is_empty() {
        warn!("batch request with an empty filename");
        return Ok(plain_text(HttpResponse::BadRequest(), "No file selected"));
    }

    info!("batch upload '{}' ({} bytes)", filename, bytes.len());
    match batch::predict_csv(state.model(), &bytes) {
        Ok(csv_bytes) => Ok(HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header((
                "Content-Disposition",
                "attachment; filename=\"predictions.csv\"",
            ))
            .body(csv_bytes)),
        Err(e) if e.is_client_error() => {
            warn!("batch upload '{}' rejected: {}", filename, e);
            Ok(plain_text(HttpResponse::BadRequest(), e.to_string()))
        }
        Err(e) => {
            warn!("batch upload '{}' failed: {}", filename, e);
            Ok(plain_text(HttpResponse::InternalServerError(), e.to_string()))
        }
    }
}

fn plain_text(mut builder: actix_web::HttpResponseBuilder, body: impl Into<String>) -> HttpResponse {
    builder.content_type("text/plain").body(body.into())
}

/// Registers the service routes on an Actix `App`. Shared between the binary
/// and the integration tests so both exercise the same routing table.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/predict", web::post().to(predict))
        .route("/batch_predict", web::post().to(batch_predict));
}

/// Initializes and runs the Actix web server with the predictor as shared
/// read-only state. The predictor is constructed once by the caller and
/// injected here; handlers never reach for globals.
///
/// # Returns
/// A `std::io::Result<()>` which is `Ok(())` if the server runs to
/// completion, or an `Err` if binding or serving fails.
pub async fn run_server(config: ServerConfig, predictor: Predictor) -> std::io::Result<()> {
    let state = web::Data::new(predictor);
    info!("starting server at http://{}:{}/", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
