//! Assembles a parsed program, a hardware inventory, and a memory image
//! into a runnable [`Engine`][crate::core::Engine].

pub mod loader;

use crate::common::error::SimError;
use crate::config::HardwareInventory;
use crate::core::engine::Engine;
use crate::core::station::StationKind;
use crate::isa::instruction::Instruction;
use crate::isa::parse;

/// The fully-resolved inputs to a run: a decoded program, the hardware
/// inventory that will back it, and the initial memory contents.
#[derive(Debug)]
pub struct RunInputs {
    pub program: Vec<Instruction>,
    pub inventory: HardwareInventory,
    pub memory: crate::core::memory::Memory,
    pub initial_pc: usize,
}

/// Parses `program_source` and, if given, `hardware_source` and
/// `memory_source`, validating the inventory against the kinds the program
/// actually uses before returning the assembled inputs.
pub fn prepare(
    program_source: &str,
    hardware_source: Option<&str>,
    memory_source: Option<&str>,
    initial_pc: usize,
) -> Result<RunInputs, SimError> {
    let program = parse::parse_program(program_source)?;

    let inventory = match hardware_source {
        Some(text) => HardwareInventory::parse(text)?,
        None => HardwareInventory::default(),
    };

    let used_kinds: std::collections::HashSet<StationKind> =
        program.iter().map(|i| StationKind::from(i.opcode)).collect();
    let used_kinds: Vec<StationKind> = used_kinds.into_iter().collect();
    inventory.validate_against_usage(&used_kinds)?;

    let memory = match memory_source {
        Some(text) => loader::load_memory_image(text)?,
        None => crate::core::memory::Memory::new(),
    };

    Ok(RunInputs {
        program,
        inventory,
        memory,
        initial_pc,
    })
}

/// Builds an [`Engine`] from already-prepared inputs.
#[must_use]
pub fn build_engine(inputs: RunInputs) -> Engine {
    Engine::new(inputs.program, &inputs.inventory, inputs.memory, inputs.initial_pc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_defaults_inventory_and_memory_when_absent() {
        let inputs = prepare("add r1 r0 r0\nret\n", None, None, 0).unwrap();
        assert_eq!(inputs.program.len(), 2);
        assert_eq!(inputs.inventory, HardwareInventory::default());
        assert_eq!(inputs.memory.read(0), 0);
    }

    #[test]
    fn prepare_rejects_zero_units_for_used_kind() {
        let hardware = "2 2 1\n2 2 1\n1 1\n1 1\n0 2\n1 2\n1 1\n2 10\n";
        let err = prepare("add r1 r0 r0\n", Some(hardware), None, 0).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn prepare_propagates_parse_errors() {
        let err = prepare("xor r1 r2 r3\n", None, None, 0).unwrap_err();
        assert!(matches!(err, SimError::Parse(_)));
    }
}
