pub mod aggregate;
pub mod scalar;

use std::collections::HashMap;

use crate::{
    functions::{aggregate::AggregateFunction, scalar::ScalarFunction},
    types::error::{DatabaseError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionDef {
    Scalar(ScalarFunction),
    Aggregate(AggregateFunction),
}

/// Case-insensitive name lookup for every built-in function.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut functions = HashMap::new();
        for f in [
            ScalarFunction::Upper,
            ScalarFunction::Lower,
            ScalarFunction::Length,
            ScalarFunction::ConCat,
        ] {
            functions.insert(f.name().to_string(), FunctionDef::Scalar(f));
        }
        for f in [
            AggregateFunction::Min,
            AggregateFunction::Max,
            AggregateFunction::Sum,
            AggregateFunction::Count,
        ] {
            functions.insert(f.name().to_string(), FunctionDef::Aggregate(f));
        }
        Self { functions }
    }

    pub fn lookup(&self, name: &str) -> Result<FunctionDef> {
        self.functions
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| DatabaseError::config(format!("unknown function '{}'", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
