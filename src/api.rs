//! Wire boundary: request/response payloads, transport decoding, and the
//! HTTP status mapping.
//!
//! The types here are framework-agnostic; the `server` module only wires
//! them to a listener. The verification endpoint is deliberately callable
//! without prior login — the photo itself is the credential.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::encoder::FaceEncoder;
use crate::enroll::{self, EnrollError};
use crate::models::ProblemKind;
use crate::store::Store;
use crate::verify::{Decision, Failure, Outcome, Verifier, VerifyRequest};

#[derive(Debug, Deserialize)]
pub struct VerifyFaceRequest {
    /// Data-URI-style payload: everything before the first comma is
    /// transport framing and is stripped before base64 decoding.
    pub live_photo: String,
    pub agent_id: u32,
    pub problem_type: ProblemKind,
    pub machine_id: u32,
}

#[derive(Debug, Serialize)]
pub struct VerifyFaceResponse {
    pub is_match: bool,
    pub is_authorized: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervention_id: Option<u32>,
}

impl From<&Decision> for VerifyFaceResponse {
    fn from(decision: &Decision) -> Self {
        VerifyFaceResponse {
            is_match: decision.is_match(),
            is_authorized: decision.is_authorized(),
            message: decision.message(),
            intervention_id: decision.intervention_id(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub agent_id: u32,
    /// Same base64 image format as the verification photo.
    pub photo: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Decode a `<prefix>,<base64>` photo payload. A payload without a comma is
/// treated as bare base64.
pub fn decode_photo(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let data = payload
        .split_once(',')
        .map(|(_, rest)| rest)
        .unwrap_or(payload);
    BASE64.decode(data.trim())
}

/// HTTP status for a verification decision.
pub fn status_code(decision: &Decision) -> u16 {
    match &decision.outcome {
        Outcome::Authorized { .. } => 200,
        Outcome::Denied(_) => 403,
        Outcome::Failed(failure) => match failure {
            Failure::Validation(_)
            | Failure::NoFaceDetected
            | Failure::InvalidImage
            | Failure::NotEnrolled => 400,
            Failure::AgentNotFound(_) | Failure::MachineNotFound(_) => 404,
            Failure::Timeout | Failure::Technical(_) => 500,
        },
    }
}

/// HTTP status for an enrollment failure.
pub fn enroll_status(err: &EnrollError) -> u16 {
    match err {
        EnrollError::AgentNotFound(_) => 404,
        EnrollError::NoFace | EnrollError::InvalidImage => 400,
        EnrollError::Timeout | EnrollError::Technical(_) => 500,
    }
}

/// Run a verification from its wire request.
pub fn verify_face<S: Store, E: FaceEncoder>(
    store: &mut S,
    encoder: &mut E,
    verifier: &Verifier,
    req: &VerifyFaceRequest,
) -> (u16, VerifyFaceResponse) {
    let photo = match decode_photo(&req.live_photo) {
        Ok(bytes) => bytes,
        Err(_) => {
            let decision = Decision {
                outcome: Outcome::Failed(Failure::Validation(
                    "live_photo is not valid base64 image data".into(),
                )),
            };
            return (status_code(&decision), VerifyFaceResponse::from(&decision));
        }
    };

    let decision = verifier.verify(
        store,
        encoder,
        &VerifyRequest {
            agent_id: req.agent_id,
            machine_id: req.machine_id,
            problem: req.problem_type,
            photo,
        },
    );
    (status_code(&decision), VerifyFaceResponse::from(&decision))
}

/// Run an enrollment from its wire request.
pub fn upload_encoding<S: Store, E: FaceEncoder>(
    store: &mut S,
    encoder: &mut E,
    budget: Duration,
    req: &EnrollRequest,
) -> Result<MessageResponse, EnrollError> {
    let photo = decode_photo(&req.photo).map_err(|_| EnrollError::InvalidImage)?;
    enroll::enroll(store, encoder, req.agent_id, &photo, budget)?;
    Ok(MessageResponse {
        message: "Face reference saved.".to_string(),
    })
}
