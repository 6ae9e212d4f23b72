/*!
Binary command protocol for the oscilloscope device.

This module provides the pure command codec: every configuration and
control value maps to a fixed single-byte command code. The device is a
passive responder; only the start-capture command produces a reply.
*/

use crate::error::ScopeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single-byte command token understood by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCode(pub u8);

impl CommandCode {
    /// The raw wire byte for this command
    pub fn as_byte(self) -> u8 {
        self.0
    }
}

/// Start-capture command; the device answers with one raw sample buffer
pub const START_CAPTURE: CommandCode = CommandCode(0x10);

/// Arm the trigger circuit
pub const TRIGGER_ENABLE: CommandCode = CommandCode(0x31);

/// Disarm the trigger circuit (free-running capture)
pub const TRIGGER_DISABLE: CommandCode = CommandCode(0x32);

/// Encode a trigger-enable state as its command code
pub fn encode_trigger_enable(enabled: bool) -> CommandCode {
    if enabled {
        TRIGGER_ENABLE
    } else {
        TRIGGER_DISABLE
    }
}

/// Supported timebase values (sampling duration per screen division)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timebase {
    #[serde(rename = "20 us")]
    Us20,
    #[serde(rename = "50 us")]
    Us50,
    #[serde(rename = "100 us")]
    Us100,
    #[serde(rename = "200 us")]
    Us200,
    #[serde(rename = "500 us")]
    Us500,
    #[serde(rename = "1 ms")]
    Ms1,
    #[serde(rename = "2 ms")]
    Ms2,
    #[serde(rename = "5 ms")]
    Ms5,
    #[serde(rename = "10 ms")]
    Ms10,
    #[serde(rename = "20 ms")]
    Ms20,
}

impl Timebase {
    /// All supported timebases, slowest-sampling first
    pub const ALL: [Timebase; 10] = [
        Timebase::Us20,
        Timebase::Us50,
        Timebase::Us100,
        Timebase::Us200,
        Timebase::Us500,
        Timebase::Ms1,
        Timebase::Ms2,
        Timebase::Ms5,
        Timebase::Ms10,
        Timebase::Ms20,
    ];

    /// The command code configuring the device for this timebase
    pub fn command_code(self) -> CommandCode {
        match self {
            Timebase::Us20 => CommandCode(0x21),
            Timebase::Us50 => CommandCode(0x22),
            Timebase::Us100 => CommandCode(0x23),
            Timebase::Us200 => CommandCode(0x24),
            Timebase::Us500 => CommandCode(0x25),
            Timebase::Ms1 => CommandCode(0x26),
            Timebase::Ms2 => CommandCode(0x27),
            Timebase::Ms5 => CommandCode(0x28),
            Timebase::Ms10 => CommandCode(0x29),
            Timebase::Ms20 => CommandCode(0x2a),
        }
    }

    /// Duration of one screen division in seconds
    pub fn seconds_per_division(self) -> f64 {
        match self {
            Timebase::Us20 => 20e-6,
            Timebase::Us50 => 50e-6,
            Timebase::Us100 => 100e-6,
            Timebase::Us200 => 200e-6,
            Timebase::Us500 => 500e-6,
            Timebase::Ms1 => 1e-3,
            Timebase::Ms2 => 2e-3,
            Timebase::Ms5 => 5e-3,
            Timebase::Ms10 => 10e-3,
            Timebase::Ms20 => 20e-3,
        }
    }

    /// Interval between consecutive samples in seconds
    pub fn seconds_per_sample(self) -> f64 {
        self.seconds_per_division() / crate::protocol::SAMPLES_PER_DIVISION as f64
    }
}

impl fmt::Display for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Timebase::Us20 => "20 us",
            Timebase::Us50 => "50 us",
            Timebase::Us100 => "100 us",
            Timebase::Us200 => "200 us",
            Timebase::Us500 => "500 us",
            Timebase::Ms1 => "1 ms",
            Timebase::Ms2 => "2 ms",
            Timebase::Ms5 => "5 ms",
            Timebase::Ms10 => "10 ms",
            Timebase::Ms20 => "20 ms",
        };
        f.write_str(label)
    }
}

impl FromStr for Timebase {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "20 us" => Ok(Timebase::Us20),
            "50 us" => Ok(Timebase::Us50),
            "100 us" => Ok(Timebase::Us100),
            "200 us" => Ok(Timebase::Us200),
            "500 us" => Ok(Timebase::Us500),
            "1 ms" => Ok(Timebase::Ms1),
            "2 ms" => Ok(Timebase::Ms2),
            "5 ms" => Ok(Timebase::Ms5),
            "10 ms" => Ok(Timebase::Ms10),
            "20 ms" => Ok(Timebase::Ms20),
            other => Err(ScopeError::unsupported(format!("timebase '{other}'"))),
        }
    }
}

/// Signal transition that arms a capture when triggering is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEdge {
    Rising,
    Falling,
    Any,
}

impl TriggerEdge {
    /// All supported trigger edges
    pub const ALL: [TriggerEdge; 3] = [TriggerEdge::Rising, TriggerEdge::Falling, TriggerEdge::Any];

    /// The command code selecting this edge on the device
    pub fn command_code(self) -> CommandCode {
        match self {
            TriggerEdge::Rising => CommandCode(0x33),
            TriggerEdge::Falling => CommandCode(0x34),
            TriggerEdge::Any => CommandCode(0x35),
        }
    }
}

impl fmt::Display for TriggerEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TriggerEdge::Rising => "Rising",
            TriggerEdge::Falling => "Falling",
            TriggerEdge::Any => "Any",
        };
        f.write_str(label)
    }
}

impl FromStr for TriggerEdge {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Rising" | "rising" => Ok(TriggerEdge::Rising),
            "Falling" | "falling" => Ok(TriggerEdge::Falling),
            "Any" | "any" => Ok(TriggerEdge::Any),
            other => Err(ScopeError::unsupported(format!("trigger edge '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timebase_command_codes() {
        let expected: [(Timebase, u8); 10] = [
            (Timebase::Us20, 0x21),
            (Timebase::Us50, 0x22),
            (Timebase::Us100, 0x23),
            (Timebase::Us200, 0x24),
            (Timebase::Us500, 0x25),
            (Timebase::Ms1, 0x26),
            (Timebase::Ms2, 0x27),
            (Timebase::Ms5, 0x28),
            (Timebase::Ms10, 0x29),
            (Timebase::Ms20, 0x2a),
        ];
        for (timebase, code) in expected {
            assert_eq!(timebase.command_code().as_byte(), code);
        }
    }

    #[test]
    fn test_trigger_command_codes() {
        assert_eq!(encode_trigger_enable(true).as_byte(), 0x31);
        assert_eq!(encode_trigger_enable(false).as_byte(), 0x32);
        assert_eq!(TriggerEdge::Rising.command_code().as_byte(), 0x33);
        assert_eq!(TriggerEdge::Falling.command_code().as_byte(), 0x34);
        assert_eq!(TriggerEdge::Any.command_code().as_byte(), 0x35);
        assert_eq!(START_CAPTURE.as_byte(), 0x10);
    }

    #[test]
    fn test_timebase_parse_roundtrip() {
        for timebase in Timebase::ALL {
            let parsed: Timebase = timebase.to_string().parse().unwrap();
            assert_eq!(parsed, timebase);
        }
    }

    #[test]
    fn test_unsupported_values_rejected() {
        assert!(matches!(
            "30 us".parse::<Timebase>(),
            Err(ScopeError::UnsupportedValue(_))
        ));
        assert!(matches!(
            "Both".parse::<TriggerEdge>(),
            Err(ScopeError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_seconds_per_sample() {
        // 20 ms per division, 10 samples per division
        assert!((Timebase::Ms20.seconds_per_sample() - 2e-3).abs() < 1e-12);
        assert!((Timebase::Us20.seconds_per_sample() - 2e-6).abs() < 1e-12);
    }
}
