//! Issue stage: binds the instruction at `pc` to a free station of the
//! right kind, captures operands, and claims renames.

use crate::core::engine::Engine;
use crate::core::station::{StationId, StationKind};
use crate::isa::instruction::Opcode;

/// Attempts to issue the instruction at the program counter. Does nothing
/// if `pc` is past the program or no station of the right kind is free.
pub fn try_issue(engine: &mut Engine) {
    if call_stall(engine) {
        tracing::trace!(pc = engine.pc, cycle = engine.cycle, "issue stalled: CALL in flight");
        return;
    }
    let Some(instr) = engine.program.get(engine.pc) else {
        return;
    };
    let opcode = instr.opcode;
    let kind = StationKind::from(opcode);
    let kind_idx = engine.kind_index(kind);

    let Some(slot) = engine.stations[kind_idx].iter().position(|s| !s.busy) else {
        tracing::trace!(pc = engine.pc, cycle = engine.cycle, ?kind, "issue stalled: no free station");
        return;
    };

    let current_cycle = engine.cycle;
    let source_reg_s = instr.source_reg_s;
    let source_reg_t = instr.source_reg_t;
    let dest_reg_d = instr.dest_reg_d;
    let immediate = instr.immediate;
    let pc = engine.pc;

    let effective = engine.effective_register_status().clone();

    let (vj, qj) = capture_operand(&effective, &engine.registers, source_reg_s);
    let station_id = engine.stations[kind_idx][slot].id;

    let station = &mut engine.stations[kind_idx][slot];
    station.busy = true;
    station.owning_instruction_index = pc;
    station.captured_opcode = Some(opcode);
    station.address = immediate as u16;
    station.remaining_addr = station.cycles_per_addr;
    station.remaining_exec = station.cycles_per_exec;
    station.vj = vj;
    station.qj = qj;

    if !matches!(opcode, Opcode::Load | Opcode::Call) {
        let (vk, qk) = capture_operand(&effective, &engine.registers, source_reg_t);
        let station = &mut engine.stations[kind_idx][slot];
        station.vk = vk;
        station.qk = qk;
    }

    if matches!(opcode, Opcode::Load | Opcode::Add | Opcode::Sub | Opcode::Nor | Opcode::Mul) {
        engine.claim_register(dest_reg_d, station_id);
    }

    if matches!(opcode, Opcode::Load | Opcode::Store) {
        engine.load_store_queue.push_back(pc);
    }

    if matches!(opcode, Opcode::Beq | Opcode::Call | Opcode::Ret) {
        let live = engine.register_status.clone();
        engine.speculation.push(current_cycle, &live);
    }

    engine.program[pc].issue_cycle = current_cycle;

    if matches!(opcode, Opcode::Call) {
        // CALL resolves its target at writeback; re-issuing the same pc is
        // prevented by the in-flight-CALL stall check below.
    } else {
        engine.pc += 1;
    }

    tracing::debug!(pc, cycle = current_cycle, station = station_id.0, ?opcode, "issued");
}

/// Captures one operand under the producer/value rule: a pending producer
/// yields `(0, producer_id)`; an available value yields `(value, NONE)`.
fn capture_operand(
    status: &crate::core::register::RegisterStatusTable,
    registers: &crate::core::register::RegisterFile,
    reg: u8,
) -> (u16, StationId) {
    let producer = status.producer(reg);
    if producer.is_none() {
        (registers.read(reg), StationId::NONE)
    } else {
        (0, producer)
    }
}

/// Whether issue must stall this cycle because the top of the speculation
/// stack belongs to an in-flight CALL: re-issuing the same `pc` would bind
/// two stations to one CALL.
pub fn call_stall(engine: &Engine) -> bool {
    let Some(instr) = engine.program.get(engine.pc) else {
        return false;
    };
    if !matches!(instr.opcode, Opcode::Call) {
        return false;
    }
    engine.find_station_at(engine.pc, StationKind::CallRet).is_some()
}
