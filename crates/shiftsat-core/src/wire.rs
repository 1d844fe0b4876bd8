//! The wire schema exchanged with the external CP-SAT solver.
//!
//! The solver process itself is an external collaborator; this module only
//! defines the request/response documents that cross that boundary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, ObjectiveTerm};
use crate::reporter::SoftViolation;
use crate::variable::Variable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveSense {
    Minimize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub terms: Vec<ObjectiveTerm>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_workers: Option<u32>,
}

/// The document sent to the external solver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverRequest {
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<Objective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SolverOptions>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SolverStatus {
    Optimal,
    Feasible,
    Infeasible,
    Timeout,
    Error,
}

impl SolverStatus {
    pub fn has_assignments(self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wall_time_seconds: Option<f64>,
}

/// The document returned by the external solver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverResponse {
    pub status: Option<SolverStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<HashMap<String, i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_violations: Option<Vec<SoftViolation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_info: Option<SolutionInfo>,
}
