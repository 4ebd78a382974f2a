//! End-to-end verification scenarios driven through the wire boundary with
//! an instrumented encoder.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use facegate::api::{self, EnrollRequest, VerifyFaceRequest};
use facegate::deadline::Deadline;
use facegate::encoder::{EncodeError, FaceEncoder};
use facegate::matcher::Matcher;
use facegate::models::{InterventionStatus, ProblemKind, Role};
use facegate::store::FileStore;
use facegate::verify::Verifier;

const MODEL: &str = "test-model";

/// Encoder double that "sees" a fixed face (or none) and counts its calls.
struct ScriptedEncoder {
    vector: Option<Vec<f32>>,
    calls: usize,
}

impl ScriptedEncoder {
    fn seeing(vector: Vec<f32>) -> Self {
        ScriptedEncoder {
            vector: Some(vector),
            calls: 0,
        }
    }

    fn blind() -> Self {
        ScriptedEncoder {
            vector: None,
            calls: 0,
        }
    }
}

impl FaceEncoder for ScriptedEncoder {
    fn encode(&mut self, _image: &[u8], _deadline: Deadline) -> Result<Vec<f32>, EncodeError> {
        self.calls += 1;
        match &self.vector {
            Some(vector) => Ok(vector.clone()),
            None => Err(EncodeError::NoFace),
        }
    }

    fn model_version(&self) -> &str {
        MODEL
    }
}

struct World {
    store: FileStore,
    _dir: tempfile::TempDir,
    verifier: Verifier,
    budget: Duration,
}

fn world() -> World {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    World {
        store,
        _dir: dir,
        verifier: Verifier::new(Matcher::new(0.6), Duration::from_secs(30)),
        budget: Duration::from_secs(30),
    }
}

fn photo_payload() -> String {
    format!("data:image/jpeg;base64,{}", BASE64.encode(b"raw image bytes"))
}

fn wire_request(agent_id: u32, machine_id: u32, problem_type: ProblemKind) -> VerifyFaceRequest {
    VerifyFaceRequest {
        live_photo: photo_payload(),
        agent_id,
        problem_type,
        machine_id,
    }
}

fn enroll(world: &mut World, agent_id: u32, vector: Vec<f32>) {
    let mut encoder = ScriptedEncoder::seeing(vector);
    api::upload_encoding(
        &mut world.store,
        &mut encoder,
        world.budget,
        &EnrollRequest {
            agent_id,
            photo: photo_payload(),
        },
    )
    .unwrap();
}

#[test]
fn scenario_matching_quality_agent_is_granted_access() {
    let mut world = world();
    let agent = world.store.create_agent("Marie Curie", Role::Quality).unwrap();
    let machine = world
        .store
        .create_machine("Presse Hydraulique A-100", "Atelier 1")
        .unwrap();
    enroll(&mut world, agent, vec![0.1, 0.2, 0.3]);

    let mut encoder = ScriptedEncoder::seeing(vec![0.1, 0.2, 0.3]);
    let (status, body) = api::verify_face(
        &mut world.store,
        &mut encoder,
        &world.verifier,
        &wire_request(agent, machine, ProblemKind::Material),
    );

    assert_eq!(status, 200);
    assert!(body.is_match);
    assert!(body.is_authorized);
    let intervention_id = body.intervention_id.unwrap();

    let records = world.store.interventions().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, intervention_id);
    assert_eq!(records[0].agent_id, agent);
    assert_eq!(records[0].machine_id, machine);
    assert_eq!(records[0].status, InterventionStatus::Resolved);
    assert!(records[0].unlocked_at.is_some());
}

#[test]
fn scenario_wrong_role_is_forbidden_before_any_face_comparison() {
    let mut world = world();
    let agent = world.store.create_agent("Marie Curie", Role::Quality).unwrap();
    let machine = world
        .store
        .create_machine("Robot de Soudure B-200", "Atelier 2")
        .unwrap();
    enroll(&mut world, agent, vec![0.1, 0.2, 0.3]);

    let mut encoder = ScriptedEncoder::seeing(vec![0.1, 0.2, 0.3]);
    let (status, body) = api::verify_face(
        &mut world.store,
        &mut encoder,
        &world.verifier,
        &wire_request(agent, machine, ProblemKind::Technical),
    );

    assert_eq!(status, 403);
    assert!(!body.is_match);
    assert!(!body.is_authorized);
    assert_eq!(encoder.calls, 0, "encoder must not run for a forbidden role");
    assert!(world.store.interventions().unwrap().is_empty());
}

#[test]
fn scenario_unenrolled_maintenance_agent_is_rejected() {
    let mut world = world();
    let agent = world
        .store
        .create_agent("Nikola Tesla", Role::Maintenance)
        .unwrap();
    let machine = world
        .store
        .create_machine("Tour CNC C-300", "Atelier 1")
        .unwrap();

    let mut encoder = ScriptedEncoder::seeing(vec![0.1, 0.2, 0.3]);
    let (status, body) = api::verify_face(
        &mut world.store,
        &mut encoder,
        &world.verifier,
        &wire_request(agent, machine, ProblemKind::Wiring),
    );

    assert_eq!(status, 400);
    assert!(!body.is_authorized);
    assert!(body.message.contains("enrollment"));
    assert!(world.store.interventions().unwrap().is_empty());
}

#[test]
fn scenario_photo_without_a_face_is_rejected() {
    let mut world = world();
    let agent = world
        .store
        .create_agent("Nikola Tesla", Role::Maintenance)
        .unwrap();
    let machine = world
        .store
        .create_machine("Tour CNC C-300", "Atelier 1")
        .unwrap();
    enroll(&mut world, agent, vec![0.1, 0.2, 0.3]);

    let mut encoder = ScriptedEncoder::blind();
    let (status, body) = api::verify_face(
        &mut world.store,
        &mut encoder,
        &world.verifier,
        &wire_request(agent, machine, ProblemKind::Technical),
    );

    assert_eq!(status, 400);
    assert!(!body.is_match);
    assert!(!body.is_authorized);
    assert!(world.store.interventions().unwrap().is_empty());
}

#[test]
fn scenario_unknown_agent_is_not_found() {
    let mut world = world();
    let machine = world
        .store
        .create_machine("Ligne d'assemblage D-400", "Atelier 3")
        .unwrap();

    let mut encoder = ScriptedEncoder::seeing(vec![0.1]);
    let (status, body) = api::verify_face(
        &mut world.store,
        &mut encoder,
        &world.verifier,
        &wire_request(42, machine, ProblemKind::Material),
    );

    assert_eq!(status, 404);
    assert!(!body.is_authorized);
    assert_eq!(encoder.calls, 0);
}

#[test]
fn mismatched_face_is_forbidden_and_leaves_no_record() {
    let mut world = world();
    let agent = world.store.create_agent("Marie Curie", Role::Quality).unwrap();
    let machine = world
        .store
        .create_machine("Presse Hydraulique A-100", "Atelier 1")
        .unwrap();
    enroll(&mut world, agent, vec![0.0, 0.0, 0.0]);

    let mut encoder = ScriptedEncoder::seeing(vec![5.0, 5.0, 5.0]);
    let (status, body) = api::verify_face(
        &mut world.store,
        &mut encoder,
        &world.verifier,
        &wire_request(agent, machine, ProblemKind::Material),
    );

    assert_eq!(status, 403);
    assert!(!body.is_match);
    assert!(!body.is_authorized);
    assert!(world.store.interventions().unwrap().is_empty());
}

#[test]
fn wire_enrollment_reports_missing_agent_and_bad_payloads() {
    let mut world = world();
    let budget = world.budget;

    let mut encoder = ScriptedEncoder::seeing(vec![0.1]);
    let err = api::upload_encoding(
        &mut world.store,
        &mut encoder,
        budget,
        &EnrollRequest {
            agent_id: 9,
            photo: photo_payload(),
        },
    )
    .unwrap_err();
    assert_eq!(api::enroll_status(&err), 404);

    let agent = world.store.create_agent("Louis Pasteur", Role::Quality).unwrap();
    let err = api::upload_encoding(
        &mut world.store,
        &mut encoder,
        budget,
        &EnrollRequest {
            agent_id: agent,
            photo: "data:image/png;base64,!!!".to_string(),
        },
    )
    .unwrap_err();
    assert_eq!(api::enroll_status(&err), 400);
}
