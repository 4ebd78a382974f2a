//! Verification orchestrator.
//!
//! A request walks a fixed sequence — field validation, agent/machine
//! lookup, role check, face encoding, reference lookup, comparison — and
//! short-circuits to a terminal outcome at the first step that fails. The
//! role check runs before any biometric work so an unauthorized caller
//! learns nothing about whether their photo would have matched. An
//! intervention record is written only when the flow reaches the authorized
//! terminal state.

use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};

use crate::config::Config;
use crate::deadline::Deadline;
use crate::encoder::{EncodeError, FaceEncoder};
use crate::matcher::Matcher;
use crate::models::{InterventionStatus, NewIntervention, ProblemKind, Role};
use crate::policy;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub agent_id: u32,
    pub machine_id: u32,
    pub problem: ProblemKind,
    /// Raw image bytes; transport decoding happens at the wire boundary.
    pub photo: Vec<u8>,
}

/// Policy-driven refusals: the request was well-formed and everything was
/// found, but access is not granted.
#[derive(Debug)]
pub enum Denial {
    Forbidden { role: Role, problem: ProblemKind },
    NoMatch,
}

/// Requests that never reached a grant/deny decision.
#[derive(Debug)]
pub enum Failure {
    Validation(String),
    AgentNotFound(u32),
    MachineNotFound(u32),
    NoFaceDetected,
    InvalidImage,
    NotEnrolled,
    Timeout,
    /// Catch-all; the cause is kept for logs, callers get a generic message.
    Technical(anyhow::Error),
}

#[derive(Debug)]
pub enum Outcome {
    Authorized { intervention_id: u32 },
    Denied(Denial),
    Failed(Failure),
}

/// Terminal result of a verification. The two booleans are derived from the
/// outcome alone: `is_authorized` implies `is_match` by construction.
#[derive(Debug)]
pub struct Decision {
    pub outcome: Outcome,
}

impl Decision {
    pub fn is_match(&self) -> bool {
        matches!(self.outcome, Outcome::Authorized { .. })
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self.outcome, Outcome::Authorized { .. })
    }

    pub fn intervention_id(&self) -> Option<u32> {
        match self.outcome {
            Outcome::Authorized { intervention_id } => Some(intervention_id),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match &self.outcome {
            Outcome::Authorized { .. } => "Verification succeeded, access granted.".to_string(),
            Outcome::Denied(Denial::Forbidden { role, problem }) => format!(
                "Access denied: role '{role}' is not authorized for a '{problem}' problem."
            ),
            Outcome::Denied(Denial::NoMatch) => {
                "The face does not match the stored reference.".to_string()
            }
            Outcome::Failed(failure) => match failure {
                Failure::Validation(detail) => format!("Invalid request: {detail}."),
                Failure::AgentNotFound(_) => "Agent not found.".to_string(),
                Failure::MachineNotFound(_) => "Machine not found.".to_string(),
                Failure::NoFaceDetected => {
                    "No face detected in the photo. Please retry.".to_string()
                }
                Failure::InvalidImage => "The photo could not be decoded.".to_string(),
                Failure::NotEnrolled => {
                    "No usable face reference for this agent; enrollment is required.".to_string()
                }
                Failure::Timeout => "Verification timed out. Please retry.".to_string(),
                Failure::Technical(_) => "Technical error, please try again later.".to_string(),
            },
        }
    }
}

pub struct Verifier {
    matcher: Matcher,
    budget: Duration,
}

impl Verifier {
    pub fn new(matcher: Matcher, budget: Duration) -> Self {
        Verifier { matcher, budget }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Verifier::new(
            Matcher::new(cfg.tolerance),
            Duration::from_millis(cfg.request_timeout_ms),
        )
    }

    pub fn verify<S: Store, E: FaceEncoder>(
        &self,
        store: &mut S,
        encoder: &mut E,
        req: &VerifyRequest,
    ) -> Decision {
        let deadline = Deadline::after(self.budget);
        let outcome = self.run(store, encoder, req, deadline);

        match &outcome {
            Outcome::Authorized { intervention_id } => info!(
                "agent {} authorized on machine {} for '{}' (intervention {})",
                req.agent_id, req.machine_id, req.problem, intervention_id
            ),
            Outcome::Denied(denial) => info!(
                "agent {} denied on machine {}: {:?}",
                req.agent_id, req.machine_id, denial
            ),
            Outcome::Failed(Failure::Technical(cause)) => {
                error!("verification for agent {} failed: {:#}", req.agent_id, cause)
            }
            Outcome::Failed(failure) => info!(
                "verification for agent {} did not complete: {:?}",
                req.agent_id, failure
            ),
        }

        Decision { outcome }
    }

    fn run<S: Store, E: FaceEncoder>(
        &self,
        store: &mut S,
        encoder: &mut E,
        req: &VerifyRequest,
        deadline: Deadline,
    ) -> Outcome {
        if req.photo.is_empty() {
            return Outcome::Failed(Failure::Validation("live photo payload is empty".into()));
        }

        let agent = match store.agent(req.agent_id, deadline) {
            Ok(Some(agent)) => agent,
            Ok(None) => return Outcome::Failed(Failure::AgentNotFound(req.agent_id)),
            Err(err) => return Outcome::Failed(store_failure(err)),
        };
        let machine = match store.machine(req.machine_id, deadline) {
            Ok(Some(machine)) => machine,
            Ok(None) => return Outcome::Failed(Failure::MachineNotFound(req.machine_id)),
            Err(err) => return Outcome::Failed(store_failure(err)),
        };

        // Authorization first: the encoder must not run for a caller whose
        // role cannot resolve this problem kind.
        if !policy::authorized(agent.role, req.problem) {
            return Outcome::Denied(Denial::Forbidden {
                role: agent.role,
                problem: req.problem,
            });
        }

        let live = match encoder.encode(&req.photo, deadline) {
            Ok(vector) => vector,
            Err(EncodeError::NoFace) => return Outcome::Failed(Failure::NoFaceDetected),
            Err(EncodeError::InvalidImage) => return Outcome::Failed(Failure::InvalidImage),
            Err(EncodeError::Timeout) => return Outcome::Failed(Failure::Timeout),
            Err(EncodeError::Backend(cause)) => return Outcome::Failed(Failure::Technical(cause)),
        };

        let reference = match &agent.reference {
            Some(reference) => reference,
            None => return Outcome::Failed(Failure::NotEnrolled),
        };
        if reference.model != encoder.model_version() {
            warn!(
                "agent {} reference was produced by encoder '{}', current encoder is '{}'",
                agent.id,
                reference.model,
                encoder.model_version()
            );
            return Outcome::Failed(Failure::NotEnrolled);
        }

        if !self.matcher.matches(&reference.vector, &live) {
            return Outcome::Denied(Denial::NoMatch);
        }

        let now = Utc::now();
        let new = NewIntervention {
            machine_id: machine.id,
            agent_id: agent.id,
            problem: req.problem,
            status: InterventionStatus::Resolved,
            blocked_at: now,
            unlocked_at: Some(now),
            description: format!(
                "Access granted by face verification for a '{}' problem",
                req.problem
            ),
        };
        match store.create_intervention(new, deadline) {
            Ok(id) => Outcome::Authorized { intervention_id: id },
            Err(err) => Outcome::Failed(store_failure(err)),
        }
    }
}

fn store_failure(err: StoreError) -> Failure {
    match err {
        StoreError::Timeout => Failure::Timeout,
        other => Failure::Technical(anyhow::Error::new(other)),
    }
}
