//! Constraints and penalty terms emitted by rule compilers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Le,
    Ge,
    Eq,
}

impl Comparator {
    pub fn as_wire(self) -> &'static str {
        match self {
            Comparator::Le => "<=",
            Comparator::Ge => ">=",
            Comparator::Eq => "==",
        }
    }
}

/// One `coeff * var` term of a linear expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub var: String,
    pub coeff: i64,
}

impl Term {
    pub fn new(var: impl Into<String>, coeff: i64) -> Self {
        Self {
            var: var.into(),
            coeff,
        }
    }

    pub fn unit(var: impl Into<String>) -> Self {
        Self::new(var, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    Linear {
        terms: Vec<Term>,
        op: Comparator,
        rhs: i64,
    },
    SoftLinear {
        terms: Vec<Term>,
        op: Comparator,
        rhs: i64,
        penalty: i64,
        id: String,
    },
    ExactlyOne {
        vars: Vec<String>,
    },
    AtMostOne {
        vars: Vec<String>,
    },
    Implication {
        #[serde(rename = "if")]
        if_var: String,
        #[serde(rename = "then")]
        then_var: String,
    },
    BoolOr {
        vars: Vec<String>,
    },
    BoolAnd {
        vars: Vec<String>,
    },
    NoOverlap {
        intervals: Vec<String>,
    },
}

/// One `coeff * var` term of the objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTerm {
    pub var: String,
    pub coeff: i64,
}
