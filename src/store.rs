//! Record persistence.
//!
//! The core only needs get-by-id on agents and machines, reference
//! overwrite, and intervention creation; that surface is the [`Store`]
//! trait. [`FileStore`] is the shipped implementation: postcard-encoded
//! record files under a data directory, rewritten whole through a temp file
//! so a crash never leaves a torn file behind.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::deadline::Deadline;
use crate::models::{Agent, FaceReference, Intervention, Machine, NewIntervention, Role};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown agent {0}")]
    UnknownAgent(u32),
    #[error("store call timed out")]
    Timeout,
    #[error("store access failed")]
    Io(#[source] anyhow::Error),
}

pub trait Store {
    fn agent(&self, id: u32, deadline: Deadline) -> Result<Option<Agent>, StoreError>;
    fn machine(&self, id: u32, deadline: Deadline) -> Result<Option<Machine>, StoreError>;
    /// Overwrite the stored biometric reference for an agent. Repeated calls
    /// replace the previous reference.
    fn set_reference(
        &mut self,
        agent_id: u32,
        reference: FaceReference,
        deadline: Deadline,
    ) -> Result<(), StoreError>;
    /// Persist a new intervention record and return its id.
    fn create_intervention(
        &mut self,
        new: NewIntervention,
        deadline: Deadline,
    ) -> Result<u32, StoreError>;
}

const AGENTS_FILE: &str = "agents.bin";
const MACHINES_FILE: &str = "machines.bin";
const INTERVENTIONS_FILE: &str = "interventions.bin";

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;
        Ok(FileStore { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(vec![]);
        }
        let data =
            std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        postcard::from_bytes(&data).with_context(|| format!("decoding {}", path.display()))
    }

    fn save<T: Serialize>(&self, file: &str, records: &[T]) -> Result<()> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        let data = postcard::to_allocvec(records)?;
        std::fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    pub fn agents(&self) -> Result<Vec<Agent>> {
        self.load(AGENTS_FILE)
    }

    pub fn machines(&self) -> Result<Vec<Machine>> {
        self.load(MACHINES_FILE)
    }

    pub fn interventions(&self) -> Result<Vec<Intervention>> {
        self.load(INTERVENTIONS_FILE)
    }

    /// Provision a new agent account (no reference enrolled yet).
    pub fn create_agent(&mut self, name: &str, role: Role) -> Result<u32> {
        let mut agents = self.agents()?;
        let id = next_id(agents.iter().map(|a| a.id));
        agents.push(Agent {
            id,
            name: name.to_string(),
            role,
            reference: None,
            created_at: Utc::now(),
        });
        self.save(AGENTS_FILE, &agents)?;
        Ok(id)
    }

    pub fn create_machine(&mut self, name: &str, location: &str) -> Result<u32> {
        let mut machines = self.machines()?;
        let id = next_id(machines.iter().map(|m| m.id));
        machines.push(Machine {
            id,
            name: name.to_string(),
            location: location.to_string(),
            active: true,
            created_at: Utc::now(),
        });
        self.save(MACHINES_FILE, &machines)?;
        Ok(id)
    }

    pub fn agent_by_name(&self, name: &str) -> Result<Option<Agent>> {
        Ok(self.agents()?.into_iter().find(|a| a.name == name))
    }

    pub fn machine_by_name(&self, name: &str) -> Result<Option<Machine>> {
        Ok(self.machines()?.into_iter().find(|m| m.name == name))
    }
}

fn next_id(ids: impl Iterator<Item = u32>) -> u32 {
    ids.max().map_or(1, |max| max + 1)
}

impl Store for FileStore {
    fn agent(&self, id: u32, deadline: Deadline) -> Result<Option<Agent>, StoreError> {
        if deadline.expired() {
            return Err(StoreError::Timeout);
        }
        let agents = self.agents().map_err(StoreError::Io)?;
        Ok(agents.into_iter().find(|a| a.id == id))
    }

    fn machine(&self, id: u32, deadline: Deadline) -> Result<Option<Machine>, StoreError> {
        if deadline.expired() {
            return Err(StoreError::Timeout);
        }
        let machines = self.machines().map_err(StoreError::Io)?;
        Ok(machines.into_iter().find(|m| m.id == id))
    }

    fn set_reference(
        &mut self,
        agent_id: u32,
        reference: FaceReference,
        deadline: Deadline,
    ) -> Result<(), StoreError> {
        if deadline.expired() {
            return Err(StoreError::Timeout);
        }
        let mut agents = self.agents().map_err(StoreError::Io)?;
        let agent = agents
            .iter_mut()
            .find(|a| a.id == agent_id)
            .ok_or(StoreError::UnknownAgent(agent_id))?;
        agent.reference = Some(reference);
        self.save(AGENTS_FILE, &agents).map_err(StoreError::Io)
    }

    fn create_intervention(
        &mut self,
        new: NewIntervention,
        deadline: Deadline,
    ) -> Result<u32, StoreError> {
        if deadline.expired() {
            return Err(StoreError::Timeout);
        }
        let mut interventions = self.interventions().map_err(StoreError::Io)?;
        let id = next_id(interventions.iter().map(|i| i.id));
        interventions.push(Intervention {
            id,
            machine_id: new.machine_id,
            agent_id: new.agent_id,
            problem: new.problem,
            status: new.status,
            blocked_at: new.blocked_at,
            unlocked_at: new.unlocked_at,
            description: new.description,
        });
        self.save(INTERVENTIONS_FILE, &interventions)
            .map_err(StoreError::Io)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InterventionStatus, ProblemKind};
    use std::time::Duration;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(30))
    }

    #[test]
    fn test_create_and_fetch_agent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let id = store.create_agent("Marie Curie", Role::Quality).unwrap();

        let agent = store.agent(id, deadline()).unwrap().unwrap();
        assert_eq!(agent.name, "Marie Curie");
        assert_eq!(agent.role, Role::Quality);
        assert!(agent.reference.is_none());

        assert!(store.agent(id + 1, deadline()).unwrap().is_none());
    }

    #[test]
    fn test_reference_overwrite_keeps_latest() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let id = store.create_agent("Nikola Tesla", Role::Maintenance).unwrap();

        let first = FaceReference {
            model: "m1".into(),
            vector: vec![1.0, 2.0],
        };
        let second = FaceReference {
            model: "m1".into(),
            vector: vec![3.0, 4.0],
        };
        store.set_reference(id, first, deadline()).unwrap();
        store.set_reference(id, second, deadline()).unwrap();

        let agent = store.agent(id, deadline()).unwrap().unwrap();
        assert_eq!(agent.reference.unwrap().vector, vec![3.0, 4.0]);
    }

    #[test]
    fn test_set_reference_unknown_agent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let reference = FaceReference {
            model: "m1".into(),
            vector: vec![],
        };
        let err = store.set_reference(99, reference, deadline()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownAgent(99)));
    }

    #[test]
    fn test_intervention_ids_are_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let new = |desc: &str| NewIntervention {
            machine_id: 1,
            agent_id: 1,
            problem: ProblemKind::Material,
            status: InterventionStatus::Resolved,
            blocked_at: Utc::now(),
            unlocked_at: Some(Utc::now()),
            description: desc.to_string(),
        };
        let a = store.create_intervention(new("first"), deadline()).unwrap();
        let b = store.create_intervention(new("second"), deadline()).unwrap();
        assert_eq!(b, a + 1);
        assert_eq!(store.interventions().unwrap().len(), 2);
    }

    #[test]
    fn test_expired_deadline_is_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let expired = Deadline::after(Duration::ZERO);
        assert!(matches!(store.agent(1, expired), Err(StoreError::Timeout)));
        assert!(matches!(store.machine(1, expired), Err(StoreError::Timeout)));
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let mut store = FileStore::open(dir.path()).unwrap();
            store.create_machine("Presse Hydraulique A-100", "Atelier 1").unwrap()
        };
        let store = FileStore::open(dir.path()).unwrap();
        let machine = store.machine(id, deadline()).unwrap().unwrap();
        assert_eq!(machine.location, "Atelier 1");
        assert!(machine.active);
    }
}
