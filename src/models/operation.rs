//! Operation model.
//!
//! An operation is one node of a match-action program: a table lookup
//! (match), a field-modifying action, or a branch condition.
//!
//! # Reference
//! Bosshart et al. (2013), "Forwarding Metamorphosis" (RMT pipelines)

use serde::{Deserialize, Serialize};

/// Operation classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Table lookup; consumes match units proportional to key width.
    Match,
    /// Header/metadata modification; consumes action-field slots.
    Action,
    /// Branch on a previous result. Costs no resources but runs on the
    /// action processor and unlocks its successors immediately.
    Condition,
}

impl OperationKind {
    /// Whether the operation runs on the action processor
    /// (actions and conditions).
    #[inline]
    pub fn is_action_class(self) -> bool {
        !matches!(self, OperationKind::Match)
    }
}

/// A schedulable operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation identifier.
    pub id: String,
    /// Operation kind.
    pub kind: OperationKind,
    /// Match key width in bits (match operations only).
    pub key_width: u32,
    /// Number of action fields written (action operations only).
    pub num_fields: u32,
}

impl Operation {
    /// Creates a match operation.
    pub fn match_op(id: impl Into<String>, key_width: u32) -> Self {
        Self {
            id: id.into(),
            kind: OperationKind::Match,
            key_width,
            num_fields: 0,
        }
    }

    /// Creates an action operation.
    pub fn action(id: impl Into<String>, num_fields: u32) -> Self {
        Self {
            id: id.into(),
            kind: OperationKind::Action,
            key_width: 0,
            num_fields,
        }
    }

    /// Creates a condition operation.
    pub fn condition(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: OperationKind::Condition,
            key_width: 0,
            num_fields: 0,
        }
    }

    /// Match units needed: `ceil(key_width / match_unit_size)`, zero for
    /// non-match operations.
    #[inline]
    pub fn match_units(&self, match_unit_size: u32) -> u32 {
        match self.kind {
            OperationKind::Match => self.key_width.div_ceil(match_unit_size.max(1)),
            _ => 0,
        }
    }

    /// Action fields needed, zero for matches and conditions.
    #[inline]
    pub fn action_fields(&self) -> u32 {
        match self.kind {
            OperationKind::Action => self.num_fields,
            _ => 0,
        }
    }

    /// Whether this is a match operation.
    #[inline]
    pub fn is_match(&self) -> bool {
        self.kind == OperationKind::Match
    }

    /// Whether this is a condition operation.
    #[inline]
    pub fn is_condition(&self) -> bool {
        self.kind == OperationKind::Condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_units_round_up() {
        assert_eq!(Operation::match_op("m", 80).match_units(80), 1);
        assert_eq!(Operation::match_op("m", 81).match_units(80), 2);
        assert_eq!(Operation::match_op("m", 160).match_units(80), 2);
        assert_eq!(Operation::match_op("m", 0).match_units(80), 0);
    }

    #[test]
    fn test_demand_by_kind() {
        let a = Operation::action("a", 3);
        assert_eq!(a.match_units(80), 0);
        assert_eq!(a.action_fields(), 3);

        let c = Operation::condition("c");
        assert_eq!(c.action_fields(), 0);
        assert!(c.kind.is_action_class());
        assert!(c.is_condition());
        assert!(!OperationKind::Match.is_action_class());
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&OperationKind::Condition).unwrap();
        assert_eq!(json, "\"condition\"");
    }
}
