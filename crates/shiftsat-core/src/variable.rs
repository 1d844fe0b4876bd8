//! Variables and the intern table that owns them.
//!
//! Variables live exclusively in [`VariableStore`]; every other part of the
//! compiler carries only their names (stable string handles). Redeclaring a
//! name with different parameters is a programmer error, not a recoverable
//! condition, since it means two call sites disagree about what a name
//! means.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A declared decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Variable {
    Bool {
        name: String,
    },
    Int {
        name: String,
        min: i64,
        max: i64,
    },
    Interval {
        name: String,
        start: i64,
        end: i64,
        size: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        presence_var: Option<String>,
    },
}

impl Variable {
    pub fn name(&self) -> &str {
        match self {
            Variable::Bool { name }
            | Variable::Int { name, .. }
            | Variable::Interval { name, .. } => name,
        }
    }
}

/// Append-only variable intern table, keyed by name.
///
/// Variables are returned to callers in declaration order via
/// [`VariableStore::iter`]; this order is what makes the emitted
/// `SolverRequest` deterministic.
#[derive(Debug, Default)]
pub struct VariableStore {
    by_name: BTreeMap<String, usize>,
    order: Vec<Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `var`. If a variable with the same name was already
    /// declared, it must be equal to `var`, or this is a hard error.
    pub fn intern(&mut self, var: Variable) -> Result<(), String> {
        let name = var.name().to_string();
        if let Some(&idx) = self.by_name.get(&name) {
            if self.order[idx] != var {
                return Err(format!(
                    "variable {name:?} redeclared with conflicting parameters"
                ));
            }
            return Ok(());
        }
        self.by_name.insert(name, self.order.len());
        self.order.push(var);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.by_name.get(name).map(|&idx| &self.order[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_new_bool_ok() {
        let mut store = VariableStore::new();
        store
            .intern(Variable::Bool {
                name: "shift:a:2024-02-05".into(),
            })
            .unwrap();
        assert!(store.contains("shift:a:2024-02-05"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn intern_same_var_twice_is_idempotent() {
        let mut store = VariableStore::new();
        let v = Variable::Int {
            name: "fairness:max_assignments".into(),
            min: 0,
            max: 10,
        };
        store.intern(v.clone()).unwrap();
        store.intern(v).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn intern_conflicting_redeclaration_errors() {
        let mut store = VariableStore::new();
        store
            .intern(Variable::Int {
                name: "x".into(),
                min: 0,
                max: 10,
            })
            .unwrap();
        let err = store
            .intern(Variable::Int {
                name: "x".into(),
                min: 0,
                max: 20,
            })
            .unwrap_err();
        assert!(err.contains("conflicting"));
    }

    #[test]
    fn iteration_preserves_declaration_order() {
        let mut store = VariableStore::new();
        store.intern(Variable::Bool { name: "b".into() }).unwrap();
        store.intern(Variable::Bool { name: "a".into() }).unwrap();
        let names: Vec<_> = store.iter().map(Variable::name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
