//! Hardware-inventory configuration: how many reservation stations of each
//! kind exist and how many cycles each operation takes.

use crate::common::error::ConfigError;
use crate::core::station::StationKind;

/// Default per-kind unit counts and cycle counts, matching the documented
/// out-of-the-box inventory.
pub mod defaults {
    /// `(units, exec_cycles, addr_cycles)` for load, in declaration order.
    pub const LOAD: (u32, u32, u32) = (2, 2, 1);
    pub const STORE: (u32, u32, u32) = (2, 2, 1);
    pub const BEQ: (u32, u32, u32) = (1, 1, 0);
    pub const CALL: (u32, u32, u32) = (1, 1, 0);
    pub const ADD: (u32, u32, u32) = (3, 2, 0);
    pub const SUB: (u32, u32, u32) = (1, 2, 0);
    pub const NOR: (u32, u32, u32) = (1, 1, 0);
    pub const MUL: (u32, u32, u32) = (2, 10, 0);
}

/// One line of the hardware-inventory file: unit count, execution cycles,
/// and (for load/store only) address-computation cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationSpec {
    pub units: u32,
    pub exec_cycles: u32,
    pub addr_cycles: u32,
}

/// The full 8-kind inventory, in the fixed declaration order
/// {load, store, beq, call, add, sub, nor, mul}.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareInventory {
    pub load: StationSpec,
    pub store: StationSpec,
    pub beq: StationSpec,
    pub call: StationSpec,
    pub add: StationSpec,
    pub sub: StationSpec,
    pub nor: StationSpec,
    pub mul: StationSpec,
}

impl Default for HardwareInventory {
    fn default() -> Self {
        let spec = |(units, exec_cycles, addr_cycles): (u32, u32, u32)| StationSpec {
            units,
            exec_cycles,
            addr_cycles,
        };
        Self {
            load: spec(defaults::LOAD),
            store: spec(defaults::STORE),
            beq: spec(defaults::BEQ),
            call: spec(defaults::CALL),
            add: spec(defaults::ADD),
            sub: spec(defaults::SUB),
            nor: spec(defaults::NOR),
            mul: spec(defaults::MUL),
        }
    }
}

impl HardwareInventory {
    #[must_use]
    pub fn spec_for(&self, kind: StationKind) -> StationSpec {
        match kind {
            StationKind::Load => self.load,
            StationKind::Store => self.store,
            StationKind::Beq => self.beq,
            StationKind::CallRet => self.call,
            StationKind::Add => self.add,
            StationKind::Sub => self.sub,
            StationKind::Nor => self.nor,
            StationKind::Mul => self.mul,
        }
    }

    /// Parses the 8-line hardware-inventory format: one line per kind, in
    /// order {load, store, beq, call, add, sub, nor, mul}, each
    /// `n_units exec_cycles [addr_cycles]` (`addr_cycles` only meaningful,
    /// and required, for the first two lines).
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let lines: Vec<&str> = source
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        if lines.len() != 8 {
            return Err(ConfigError::WrongInventoryLineCount { found: lines.len() });
        }

        let memory_kinds = [true, true, false, false, false, false, false, false];
        let mut specs = Vec::with_capacity(8);
        for (idx, (line, is_memory)) in lines.iter().zip(memory_kinds).enumerate() {
            let line_no = idx + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (units_tok, exec_tok, addr_tok) = match (is_memory, fields.as_slice()) {
                (true, [u, e, a]) => (*u, *e, Some(*a)),
                (false, [u, e]) => (*u, *e, None),
                (false, [u, e, a]) => (*u, *e, Some(*a)),
                _ => {
                    return Err(ConfigError::BadInventoryLine {
                        line: line_no,
                        detail: format!("expected 2 or 3 fields, found {}", fields.len()),
                    });
                }
            };
            let units: u32 = units_tok.parse().map_err(|_| ConfigError::BadInventoryLine {
                line: line_no,
                detail: format!("invalid unit count `{units_tok}`"),
            })?;
            let exec_cycles: u32 = exec_tok.parse().map_err(|_| ConfigError::BadInventoryLine {
                line: line_no,
                detail: format!("invalid exec cycle count `{exec_tok}`"),
            })?;
            let addr_cycles = match addr_tok {
                Some(tok) => tok.parse().map_err(|_| ConfigError::BadInventoryLine {
                    line: line_no,
                    detail: format!("invalid addr cycle count `{tok}`"),
                })?,
                None => 0,
            };
            specs.push(StationSpec {
                units,
                exec_cycles,
                addr_cycles,
            });
        }

        Ok(Self {
            load: specs[0],
            store: specs[1],
            beq: specs[2],
            call: specs[3],
            add: specs[4],
            sub: specs[5],
            nor: specs[6],
            mul: specs[7],
        })
    }

    /// Confirms that every kind used by `used_kinds` has at least one unit.
    pub fn validate_against_usage(&self, used_kinds: &[StationKind]) -> Result<(), ConfigError> {
        for &kind in used_kinds {
            if self.spec_for(kind).units == 0 {
                return Err(ConfigError::ZeroUnitsForUsedKind { kind });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_inventory() {
        let inv = HardwareInventory::default();
        assert_eq!(inv.load, StationSpec { units: 2, exec_cycles: 2, addr_cycles: 1 });
        assert_eq!(inv.mul, StationSpec { units: 2, exec_cycles: 10, addr_cycles: 0 });
    }

    #[test]
    fn parses_eight_line_inventory() {
        let text = "2 2 1\n2 2 1\n1 1\n1 1\n3 2\n1 2\n1 1\n2 10\n";
        let inv = HardwareInventory::parse(text).unwrap();
        assert_eq!(inv, HardwareInventory::default());
    }

    #[test]
    fn rejects_wrong_line_count() {
        let err = HardwareInventory::parse("2 2 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::WrongInventoryLineCount { found: 1 }));
    }

    #[test]
    fn flags_zero_units_for_used_kind() {
        let mut inv = HardwareInventory::default();
        inv.mul.units = 0;
        let err = inv.validate_against_usage(&[StationKind::Mul]).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroUnitsForUsedKind { kind: StationKind::Mul }));
    }
}
