use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an agent is allowed to work on. Wire names follow the plant's
/// vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "qualité")]
    Quality,
    #[serde(rename = "maintenance")]
    Maintenance,
    #[serde(rename = "admin")]
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Quality => "qualité",
            Role::Maintenance => "maintenance",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Declared category of machine problem driving who may unlock it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemKind {
    #[serde(rename = "matière")]
    Material,
    #[serde(rename = "technique")]
    Technical,
    #[serde(rename = "câblage")]
    Wiring,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemKind::Material => "matière",
            ProblemKind::Technical => "technique",
            ProblemKind::Wiring => "câblage",
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProblemKind {
    type Err = UnknownProblemKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "matière" => Ok(ProblemKind::Material),
            "technique" => Ok(ProblemKind::Technical),
            "câblage" => Ok(ProblemKind::Wiring),
            _ => Err(UnknownProblemKind(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown problem type '{0}', expected matière, technique or câblage")]
pub struct UnknownProblemKind(pub String);

/// Stored biometric reference. The model tag records which encoder produced
/// the vector; vectors from different encoder versions are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceReference {
    pub model: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: u32,
    pub name: String,
    pub role: Role,
    /// Set and overwritten only by enrollment.
    pub reference: Option<FaceReference>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: u32,
    pub name: String,
    pub location: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterventionStatus {
    #[serde(rename = "en_cours")]
    InProgress,
    #[serde(rename = "résolu")]
    Resolved,
}

/// Audit record of a granted access, linking agent, machine and problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub id: u32,
    pub machine_id: u32,
    pub agent_id: u32,
    pub problem: ProblemKind,
    pub status: InterventionStatus,
    /// When the machine was blocked (record creation time).
    pub blocked_at: DateTime<Utc>,
    /// When access was granted; set on creation when auto-resolved.
    pub unlocked_at: Option<DateTime<Utc>>,
    pub description: String,
}

/// An intervention about to be persisted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewIntervention {
    pub machine_id: u32,
    pub agent_id: u32,
    pub problem: ProblemKind,
    pub status: InterventionStatus,
    pub blocked_at: DateTime<Utc>,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub description: String,
}
