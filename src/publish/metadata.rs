//! Declared metadata of the published dose PV and its alarm annotation.

use serde::{Deserialize, Serialize};

/// Value type of a declared PV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PvType {
    Float,
}

/// Metadata handed to the transport when the output PV is declared.
///
/// These are configuration constants; the engine passes them through and
/// only uses the thresholds to annotate updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvMetadata {
    #[serde(rename = "type")]
    pub value_type: PvType,
    /// Number of decimal digits shown to clients
    pub prec: usize,
    pub unit: String,
    pub low: f64,
    pub high: f64,
    pub lolo: f64,
    pub hihi: f64,
}

impl Default for PvMetadata {
    fn default() -> Self {
        Self {
            value_type: PvType::Float,
            prec: 3,
            unit: "uSv".to_string(),
            low: -0.1,
            high: 1.5,
            lolo: -0.1,
            hihi: 2.0,
        }
    }
}

impl PvMetadata {
    /// Classify a value against the alarm thresholds.
    ///
    /// Major limits take precedence over minor ones; limits are inclusive.
    pub fn alarm(&self, value: f64) -> AlarmState {
        let (status, severity) = if value >= self.hihi {
            (AlarmStatus::HiHi, AlarmSeverity::Major)
        } else if value <= self.lolo {
            (AlarmStatus::LoLo, AlarmSeverity::Major)
        } else if value >= self.high {
            (AlarmStatus::High, AlarmSeverity::Minor)
        } else if value <= self.low {
            (AlarmStatus::Low, AlarmSeverity::Minor)
        } else {
            (AlarmStatus::NoAlarm, AlarmSeverity::NoAlarm)
        };
        AlarmState { status, severity }
    }

    /// Render a value with the declared precision and unit.
    pub fn format_value(&self, value: f64) -> String {
        format!("{:.*} {}", self.prec, value, self.unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmStatus {
    NoAlarm,
    #[serde(rename = "HIHI")]
    HiHi,
    High,
    Low,
    #[serde(rename = "LOLO")]
    LoLo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmSeverity {
    NoAlarm,
    Minor,
    Major,
}

/// Alarm annotation attached to each published update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmState {
    pub status: AlarmStatus,
    pub severity: AlarmSeverity,
}

impl AlarmState {
    pub fn is_alarm(&self) -> bool {
        self.severity != AlarmSeverity::NoAlarm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metadata() {
        let meta = PvMetadata::default();
        assert_eq!(meta.value_type, PvType::Float);
        assert_eq!(meta.prec, 3);
        assert_eq!(meta.unit, "uSv");
        assert_eq!((meta.low, meta.high, meta.lolo, meta.hihi), (-0.1, 1.5, -0.1, 2.0));
    }

    #[test]
    fn test_alarm_thresholds() {
        let meta = PvMetadata::default();
        assert_eq!(meta.alarm(0.5).status, AlarmStatus::NoAlarm);
        assert!(!meta.alarm(0.0).is_alarm());
        assert_eq!(meta.alarm(1.5).status, AlarmStatus::High);
        assert_eq!(meta.alarm(1.7).severity, AlarmSeverity::Minor);
        assert_eq!(meta.alarm(2.0).status, AlarmStatus::HiHi);
        assert_eq!(meta.alarm(3.0).severity, AlarmSeverity::Major);
        // low == lolo, so the major limit wins
        assert_eq!(meta.alarm(-0.1).status, AlarmStatus::LoLo);
        assert_eq!(meta.alarm(-0.05).status, AlarmStatus::NoAlarm);
    }

    #[test]
    fn test_format_and_serde_names() {
        let meta = PvMetadata::default();
        assert_eq!(meta.format_value(1.23456), "1.235 uSv");

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "float");
        assert_eq!(json["hihi"], 2.0);

        let state = serde_json::to_value(meta.alarm(2.5)).unwrap();
        assert_eq!(state["status"], "HIHI");
        assert_eq!(state["severity"], "MAJOR");
    }
}
