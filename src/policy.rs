//! Role-authorization policy.
//!
//! The problem/role mapping is fixed: material problems belong to quality,
//! technical and wiring problems to maintenance. Admins may handle
//! everything.

use crate::models::{ProblemKind, Role};

/// The role the problem category demands (admin override excluded).
pub fn required_role(problem: ProblemKind) -> Role {
    match problem {
        ProblemKind::Material => Role::Quality,
        ProblemKind::Technical => Role::Maintenance,
        ProblemKind::Wiring => Role::Maintenance,
    }
}

/// Whether `role` may resolve a `problem` of the given kind.
pub fn authorized(role: Role, problem: ProblemKind) -> bool {
    role == Role::Admin || role == required_role(problem)
}
