use crate::error::{Error, Result};
use crate::parser::Operand;
use crate::runtime::Value;
use std::collections::{HashMap, HashSet};

/// The flat global variable table, guarded by the memory flag.
///
/// Locks outlive deallocation: once a name is resistant it stays that way
/// for the rest of the run.
#[derive(Debug, Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
    locked: HashSet<String>,
    allocated: bool,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) {
        self.allocated = true;
    }

    pub fn deallocate(&mut self) {
        self.allocated = false;
        self.variables.clear();
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    pub fn ensure_allocated(&self) -> Result<()> {
        if self.allocated {
            Ok(())
        } else {
            Err(Error::Guard)
        }
    }

    pub fn ensure_writable(&self, name: &str) -> Result<()> {
        if self.locked.contains(name) {
            Err(Error::Resistance {
                name: name.to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub fn is_locked(&self, name: &str) -> bool {
        self.locked.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Binds without consulting the lock set.
    pub fn insert(&mut self, name: String, value: Value) {
        self.variables.insert(name, value);
    }

    pub fn define(&mut self, name: &str, value: Value, resistant: bool) -> Result<()> {
        self.ensure_writable(name)?;
        self.insert(name.to_string(), value);
        if resistant {
            self.locked.insert(name.to_string());
        }
        Ok(())
    }

    /// Names and string literals are looked up by their text. A bound one
    /// yields its value, an unbound one echoes itself.
    pub fn resolve(&self, operand: &Operand) -> Value {
        match operand {
            Operand::Name(text) | Operand::String(text) => self
                .get(text)
                .cloned()
                .unwrap_or_else(|| Value::Str(text.clone())),
            Operand::Integer(n) => Value::Int(*n),
        }
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// True when no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
