//! tiny_http adapter.
//!
//! Routes the two wire endpoints onto the api module. Requests are handled
//! one at a time; each verification or enrollment is independent and
//! synchronous, so there is no shared mutable state beyond the store.

use std::io::Cursor;
use std::io::Read as _;
use std::time::Duration;

use anyhow::Result;
use log::{info, warn};
use serde::{de::DeserializeOwned, Serialize};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::api::{self, EnrollRequest, ErrorResponse, VerifyFaceRequest};
use crate::config::Config;
use crate::encoder::FaceEncoder;
use crate::store::FileStore;
use crate::verify::Verifier;

/// Serve until the process is stopped.
pub fn serve(cfg: &Config, encoder: &mut impl FaceEncoder) -> Result<()> {
    let mut store = FileStore::open(&cfg.data_dir)?;
    let verifier = Verifier::from_config(cfg);
    let budget = Duration::from_millis(cfg.request_timeout_ms);

    let server = tiny_http::Server::http(&cfg.listen)
        .map_err(|err| anyhow::anyhow!("binding {}: {err}", cfg.listen))?;
    info!("listening on {}", cfg.listen);

    for mut request in server.incoming_requests() {
        let response = handle(&mut request, &mut store, encoder, &verifier, budget);
        if let Err(err) = request.respond(response) {
            warn!("failed to send response: {err}");
        }
    }
    Ok(())
}

fn handle<E: FaceEncoder>(
    request: &mut Request,
    store: &mut FileStore,
    encoder: &mut E,
    verifier: &Verifier,
    budget: Duration,
) -> Response<Cursor<Vec<u8>>> {
    let method = request.method().clone();
    let path = request.url().trim_end_matches('/').to_string();

    match (&method, path.as_str()) {
        (&Method::Post, "/api/face/verify") => {
            match read_json_body::<VerifyFaceRequest>(request) {
                Ok(req) => {
                    let (status, body) = api::verify_face(store, encoder, verifier, &req);
                    json_response(&body, status)
                }
                Err(error) => json_response(&ErrorResponse { error }, 400),
            }
        }
        (&Method::Post, "/api/face/upload-encoding") => {
            match read_json_body::<EnrollRequest>(request) {
                Ok(req) => match api::upload_encoding(store, encoder, budget, &req) {
                    Ok(body) => json_response(&body, 200),
                    Err(err) => json_response(
                        &ErrorResponse {
                            error: err.to_string(),
                        },
                        api::enroll_status(&err),
                    ),
                },
                Err(error) => json_response(&ErrorResponse { error }, 400),
            }
        }
        _ => json_response(
            &ErrorResponse {
                error: format!("no such endpoint: {method} {path}"),
            },
            404,
        ),
    }
}

fn read_json_body<T: DeserializeOwned>(request: &mut Request) -> Result<T, String> {
    let mut body = String::new();
    request
        .as_reader()
        .read_to_string(&mut body)
        .map_err(|err| format!("failed to read request body: {err}"))?;
    serde_json::from_str(&body).map_err(|err| format!("invalid JSON: {err}"))
}

fn json_response<T: Serialize>(data: &T, status: u16) -> Response<Cursor<Vec<u8>>> {
    let json = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
    Response::from_data(json.into_bytes())
        .with_header(Header::from_bytes("Content-Type", "application/json").unwrap())
        .with_status_code(StatusCode(status))
}
