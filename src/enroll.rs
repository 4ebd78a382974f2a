//! Reference enrollment.
//!
//! Captures an agent's biometric reference from a photo. Re-running simply
//! replaces the stored reference; a failed encoding leaves the previous one
//! untouched.

use std::time::Duration;

use log::info;
use thiserror::Error;

use crate::deadline::Deadline;
use crate::encoder::{EncodeError, FaceEncoder};
use crate::models::FaceReference;
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("agent {0} not found")]
    AgentNotFound(u32),
    #[error("no face detected in the photo")]
    NoFace,
    #[error("the photo could not be decoded")]
    InvalidImage,
    #[error("enrollment timed out")]
    Timeout,
    #[error("enrollment failed")]
    Technical(#[source] anyhow::Error),
}

pub fn enroll<S: Store, E: FaceEncoder>(
    store: &mut S,
    encoder: &mut E,
    agent_id: u32,
    photo: &[u8],
    budget: Duration,
) -> Result<(), EnrollError> {
    let deadline = Deadline::after(budget);

    let agent = match store.agent(agent_id, deadline) {
        Ok(Some(agent)) => agent,
        Ok(None) => return Err(EnrollError::AgentNotFound(agent_id)),
        Err(err) => return Err(store_failure(err)),
    };

    let vector = encoder.encode(photo, deadline).map_err(|err| match err {
        EncodeError::NoFace => EnrollError::NoFace,
        EncodeError::InvalidImage => EnrollError::InvalidImage,
        EncodeError::Timeout => EnrollError::Timeout,
        EncodeError::Backend(cause) => EnrollError::Technical(cause),
    })?;

    let reference = FaceReference {
        model: encoder.model_version().to_string(),
        vector,
    };
    match store.set_reference(agent_id, reference, deadline) {
        Ok(()) => {
            info!("reference enrolled for agent {} ({})", agent.id, agent.name);
            Ok(())
        }
        Err(err) => Err(store_failure(err)),
    }
}

fn store_failure(err: StoreError) -> EnrollError {
    match err {
        StoreError::UnknownAgent(id) => EnrollError::AgentNotFound(id),
        StoreError::Timeout => EnrollError::Timeout,
        other => EnrollError::Technical(anyhow::Error::new(other)),
    }
}
