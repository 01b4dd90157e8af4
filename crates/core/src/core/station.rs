//! Reservation station data model.

use crate::isa::instruction::Opcode;

/// A globally unique, strictly-positive identifier for a reservation
/// station. `0` means "no producer" wherever it appears in `qj`, `qk`, or a
/// register-status entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StationId(pub u32);

impl StationId {
    pub const NONE: Self = Self(0);

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }
}

/// Indexes the per-kind station pools. Distinct from [`Category`][crate::isa::Category]
/// only in that `Call` and `Ret` share one kind here (`CallRet`), matching
/// the shared station pool they are issued into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    Load,
    Store,
    Beq,
    CallRet,
    Add,
    Sub,
    Nor,
    Mul,
}

impl StationKind {
    pub const ALL: [Self; 8] = [
        Self::Load,
        Self::Store,
        Self::Beq,
        Self::CallRet,
        Self::Add,
        Self::Sub,
        Self::Nor,
        Self::Mul,
    ];

    /// Whether stations of this kind go through the two-phase
    /// address/memory execution path rather than the single-phase one.
    #[must_use]
    pub const fn is_memory(self) -> bool {
        matches!(self, Self::Load | Self::Store)
    }
}

impl From<Opcode> for StationKind {
    fn from(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Load => Self::Load,
            Opcode::Store => Self::Store,
            Opcode::Beq => Self::Beq,
            Opcode::Call | Opcode::Ret => Self::CallRet,
            Opcode::Add => Self::Add,
            Opcode::Sub => Self::Sub,
            Opcode::Nor => Self::Nor,
            Opcode::Mul => Self::Mul,
        }
    }
}

/// A mutable reservation-station slot: when `busy`, it holds an in-flight
/// instruction and its operand-availability state.
#[derive(Debug, Clone)]
pub struct ReservationStation {
    pub name: String,
    pub id: StationId,
    pub busy: bool,
    pub captured_opcode: Option<Opcode>,

    pub vj: u16,
    pub vk: u16,
    pub qj: StationId,
    pub qk: StationId,

    pub address: u16,
    pub cycles_per_exec: u32,
    pub cycles_per_addr: u32,
    pub remaining_exec: u32,
    pub remaining_addr: u32,

    pub owning_instruction_index: usize,
    pub last_computed_result: u16,

    /// Whether `address` has already been resolved (base + offset) for the
    /// in-flight memory op. Not part of the observable field list; tracks
    /// the address/memory phase boundary even when `cycles_per_addr` is
    /// configured to zero.
    pub(crate) address_resolved: bool,
}

impl ReservationStation {
    #[must_use]
    pub fn new(name: String, id: StationId, cycles_per_exec: u32, cycles_per_addr: u32) -> Self {
        Self {
            name,
            id,
            busy: false,
            captured_opcode: None,
            vj: 0,
            vk: 0,
            qj: StationId::NONE,
            qk: StationId::NONE,
            address: 0,
            cycles_per_exec,
            cycles_per_addr,
            remaining_exec: 0,
            remaining_addr: 0,
            owning_instruction_index: 0,
            last_computed_result: 0,
            address_resolved: false,
        }
    }

    /// Clears the slot back to empty, as on writeback or a speculative
    /// flush.
    pub fn clear(&mut self) {
        self.busy = false;
        self.captured_opcode = None;
        self.vj = 0;
        self.vk = 0;
        self.qj = StationId::NONE;
        self.qk = StationId::NONE;
        self.address = 0;
        self.remaining_exec = 0;
        self.remaining_addr = 0;
        self.owning_instruction_index = 0;
        self.last_computed_result = 0;
        self.address_resolved = false;
    }

    /// Whether this station's operands have all arrived.
    #[must_use]
    pub const fn operands_ready(&self) -> bool {
        self.qj.is_none() && self.qk.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_to_construction_defaults() {
        let mut station = ReservationStation::new("Add1".to_owned(), StationId(3), 2, 0);
        station.busy = true;
        station.vj = 7;
        station.qk = StationId(5);
        station.address_resolved = true;
        station.clear();
        assert!(!station.busy);
        assert_eq!(station.vj, 0);
        assert_eq!(station.qk, StationId::NONE);
        assert!(!station.address_resolved);
        assert_eq!(station.id, StationId(3));
    }
}
