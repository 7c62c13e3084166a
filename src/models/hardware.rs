//! Hardware resource limits.
//!
//! `HardwareSpec` is the loose form read from a hardware description, with
//! every field optional. `HardwareLimits` is the checked, immutable form
//! every solver consumes.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Per-slot hardware capacities of one processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HardwareLimits {
    /// Match units available per slot.
    pub match_unit_limit: u32,
    /// Key bits one match unit holds.
    pub match_unit_size: u32,
    /// Action fields writable per slot.
    pub action_fields_limit: u32,
    /// Packets that may be matching in the same slot.
    pub match_proc_limit: u32,
    /// Packets that may be acting in the same slot.
    pub action_proc_limit: u32,
}

/// Unchecked hardware description.
///
/// Fields mirror [`HardwareLimits`]; any may be absent until conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSpec {
    pub match_unit_limit: Option<u32>,
    pub match_unit_size: Option<u32>,
    pub action_fields_limit: Option<u32>,
    pub match_proc_limit: Option<u32>,
    pub action_proc_limit: Option<u32>,
}

impl HardwareLimits {
    /// Creates limits, rejecting zero fields.
    pub fn new(
        match_unit_limit: u32,
        match_unit_size: u32,
        action_fields_limit: u32,
        match_proc_limit: u32,
        action_proc_limit: u32,
    ) -> Result<Self> {
        let limits = Self {
            match_unit_limit,
            match_unit_size,
            action_fields_limit,
            match_proc_limit,
            action_proc_limit,
        };
        limits.check()?;
        Ok(limits)
    }

    fn check(&self) -> Result<()> {
        let fields = [
            ("match_unit_limit", self.match_unit_limit),
            ("match_unit_size", self.match_unit_size),
            ("action_fields_limit", self.action_fields_limit),
            ("match_proc_limit", self.match_proc_limit),
            ("action_proc_limit", self.action_proc_limit),
        ];
        for (field, value) in fields {
            if value == 0 {
                return Err(ScheduleError::InvalidHardware { field, value });
            }
        }
        Ok(())
    }
}

impl TryFrom<HardwareSpec> for HardwareLimits {
    type Error = ScheduleError;

    fn try_from(spec: HardwareSpec) -> Result<Self> {
        fn require(value: Option<u32>, field: &'static str) -> Result<u32> {
            value.ok_or(ScheduleError::MissingHardwareField(field))
        }

        HardwareLimits::new(
            require(spec.match_unit_limit, "match_unit_limit")?,
            require(spec.match_unit_size, "match_unit_size")?,
            require(spec.action_fields_limit, "action_fields_limit")?,
            require(spec.match_proc_limit, "match_proc_limit")?,
            require(spec.action_proc_limit, "action_proc_limit")?,
        )
    }
}

impl<'de> Deserialize<'de> for HardwareLimits {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let spec = HardwareSpec::deserialize(deserializer)?;
        HardwareLimits::try_from(spec).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_zero() {
        let err = HardwareLimits::new(2, 80, 0, 1, 1).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::InvalidHardware {
                field: "action_fields_limit",
                value: 0
            }
        );
    }

    #[test]
    fn test_spec_missing_field() {
        let spec = HardwareSpec {
            match_unit_limit: Some(2),
            match_unit_size: Some(80),
            action_fields_limit: Some(4),
            match_proc_limit: None,
            action_proc_limit: Some(1),
        };
        assert_eq!(
            HardwareLimits::try_from(spec).unwrap_err(),
            ScheduleError::MissingHardwareField("match_proc_limit")
        );
    }

    #[test]
    fn test_deserialize_complete() {
        let json = r#"{
            "match_unit_limit": 8,
            "match_unit_size": 80,
            "action_fields_limit": 32,
            "match_proc_limit": 1,
            "action_proc_limit": 1
        }"#;
        let limits: HardwareLimits = serde_json::from_str(json).unwrap();
        assert_eq!(limits.match_unit_limit, 8);
        assert_eq!(limits.action_fields_limit, 32);
    }

    #[test]
    fn test_deserialize_incomplete_is_error() {
        let json = r#"{ "match_unit_limit": 8, "match_unit_size": 80 }"#;
        let err = serde_json::from_str::<HardwareLimits>(json).unwrap_err();
        assert!(err.to_string().contains("action_fields_limit"));
    }
}
