//! Elementary operations and the recipe interpreter

use crate::error::InterpretationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of an elementary operation, without its parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Swap,
    Reverse,
    RemoveAt,
}

impl OperationKind {
    /// All operation kinds, in classification order
    pub const ALL: [OperationKind; 3] = [
        OperationKind::Swap,
        OperationKind::Reverse,
        OperationKind::RemoveAt,
    ];

    /// Whether driver calls must carry an integer literal for this operation
    pub fn requires_index(&self) -> bool {
        !matches!(self, OperationKind::Reverse)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Swap => write!(f, "swap"),
            OperationKind::Reverse => write!(f, "reverse"),
            OperationKind::RemoveAt => write!(f, "remove-at"),
        }
    }
}

/// One step of a decryption recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Exchange position 0 with position `index mod length`
    Swap(usize),
    /// Reverse the whole sequence
    Reverse,
    /// Delete the character at `index`
    RemoveAt(usize),
}

impl Operation {
    /// Build an operation from its kind and call-site literal
    ///
    /// Returns `None` when a swap or remove-at has no index.
    pub fn from_kind(kind: OperationKind, index: Option<usize>) -> Option<Self> {
        match (kind, index) {
            (OperationKind::Swap, Some(i)) => Some(Operation::Swap(i)),
            (OperationKind::RemoveAt, Some(i)) => Some(Operation::RemoveAt(i)),
            (OperationKind::Reverse, _) => Some(Operation::Reverse),
            _ => None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Swap(_) => OperationKind::Swap,
            Operation::Reverse => OperationKind::Reverse,
            Operation::RemoveAt(_) => OperationKind::RemoveAt,
        }
    }

    /// Apply this operation in place
    fn apply_to(&self, chars: &mut Vec<char>) -> Result<(), InterpretationError> {
        match *self {
            Operation::Swap(index) => {
                if chars.is_empty() {
                    return Err(InterpretationError::IndexOutOfRange {
                        operation: OperationKind::Swap,
                        index,
                        length: 0,
                    });
                }
                let target = index % chars.len();
                chars.swap(0, target);
            }
            Operation::Reverse => chars.reverse(),
            Operation::RemoveAt(index) => {
                if index >= chars.len() {
                    return Err(InterpretationError::IndexOutOfRange {
                        operation: OperationKind::RemoveAt,
                        index,
                        length: chars.len(),
                    });
                }
                chars.remove(index);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Swap(i) => write!(f, "swap({})", i),
            Operation::Reverse => write!(f, "reverse"),
            Operation::RemoveAt(i) => write!(f, "remove_at({})", i),
        }
    }
}

/// Ordered sequence of operations recovered from a driver function
///
/// The order is the exact execution order of the player's own code. A recipe
/// is immutable once built; a new script version needs a new recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipe {
    operations: Vec<Operation>,
}

impl Recipe {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    /// Apply the recipe to a ciphered signature
    ///
    /// Either every operation succeeds and the full result is returned, or
    /// the first failing operation's error is. Nothing partial escapes.
    pub fn apply(&self, signature: &str) -> Result<String, InterpretationError> {
        let mut chars: Vec<char> = signature.chars().collect();
        for operation in &self.operations {
            operation.apply_to(&mut chars)?;
        }
        Ok(chars.into_iter().collect())
    }
}

impl FromIterator<Operation> for Recipe {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Recipe {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, operation) in self.operations.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", operation)?;
        }
        Ok(())
    }
}
