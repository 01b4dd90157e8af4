//! Execute stage: advances every busy station's countdown by one cycle and
//! computes results when a countdown reaches zero.

use crate::core::engine::Engine;
use crate::core::station::StationKind;
use crate::isa::instruction::Opcode;

/// Advances execution for every busy station by one cycle, in kind order
/// {beq, call/ret, add, sub, nor, mul} for non-memory stations and
/// {load, store} for the two-phase memory stations.
pub fn advance_execution(engine: &mut Engine) {
    advance_non_memory(engine, StationKind::Beq);
    advance_non_memory(engine, StationKind::CallRet);
    advance_non_memory(engine, StationKind::Add);
    advance_non_memory(engine, StationKind::Sub);
    advance_non_memory(engine, StationKind::Nor);
    advance_non_memory(engine, StationKind::Mul);
    advance_memory(engine);
}

/// Advances every busy, operand-ready station of `kind` by one cycle.
/// Gated on two conditions besides readiness: the owning instruction must
/// have issued strictly before this cycle, and — while a speculation is
/// outstanding — the owning instruction must not be younger than the head
/// (oldest unresolved) speculation, matching the ground-truth source's
/// `if self.states and ... issue > self.states[0].issue: continue` gate.
/// Memory stations are exempted: their own two-phase address/queue
/// ordering already serializes them (see `advance_address_phase`).
fn advance_non_memory(engine: &mut Engine, kind: StationKind) {
    let current_cycle = engine.cycle;
    let kind_idx = engine.kind_index(kind);
    for slot in 0..engine.stations[kind_idx].len() {
        let station = &engine.stations[kind_idx][slot];
        if !station.busy || !station.operands_ready() || station.remaining_exec == 0 {
            continue;
        }
        let owning = station.owning_instruction_index;
        if engine.program[owning].issue_cycle >= current_cycle {
            continue;
        }
        if engine
            .speculation
            .head()
            .is_some_and(|h| engine.program[owning].issue_cycle > h.issue_cycle)
        {
            continue;
        }
        if engine.program[owning].exec_start_cycle == current_cycle {
            // Rewoken by this cycle's broadcast: counting down starts next cycle.
            continue;
        }
        if engine.program[owning].exec_start_cycle == 0 {
            engine.program[owning].exec_start_cycle = current_cycle;
        }

        let station = &mut engine.stations[kind_idx][slot];
        station.remaining_exec -= 1;
        if station.remaining_exec == 0 {
            let opcode = station.captured_opcode.expect("busy station has a captured opcode");
            let result = compute_result(opcode, station.vj, station.vk, owning);
            station.last_computed_result = result;
            engine.program[owning].exec_end_cycle = current_cycle;
            let station_id = engine.stations[kind_idx][slot].id.0;
            tracing::trace!(cycle = current_cycle, station = station_id, result, "execute complete");
        }
    }
}

fn compute_result(opcode: Opcode, vj: u16, vk: u16, owning_instruction_index: usize) -> u16 {
    match opcode {
        Opcode::Add => vj.wrapping_add(vk),
        Opcode::Sub => vj.wrapping_sub(vk),
        Opcode::Nor => !(vj | vk),
        Opcode::Mul => ((u32::from(vj) * u32::from(vk)) & 0xFFFF) as u16,
        Opcode::Beq => u16::from(vj == vk),
        Opcode::Call => (owning_instruction_index as u16).wrapping_add(1),
        Opcode::Ret => vj,
        Opcode::Load | Opcode::Store => unreachable!("memory ops use advance_memory"),
    }
}

fn advance_memory(engine: &mut Engine) {
    let current_cycle = engine.cycle;

    // Snapshot in-flight LOAD memory-phase state before mutating anything,
    // so STORE's WAR/RAW guard sees state from the start of this cycle.
    let load_idx = engine.kind_index(StationKind::Load);
    let loads_in_memory_phase: Vec<(u64, u16)> = engine.stations[load_idx]
        .iter()
        .filter(|s| s.busy && s.address_resolved && s.remaining_exec > 0)
        .map(|s| (engine.program[s.owning_instruction_index].issue_cycle, s.address))
        .collect();

    advance_address_phase(engine, StationKind::Load, current_cycle);
    advance_address_phase(engine, StationKind::Store, current_cycle);

    advance_load_memory_phase(engine, current_cycle);
    advance_store_memory_phase(engine, current_cycle, &loads_in_memory_phase);
}

fn advance_address_phase(engine: &mut Engine, kind: StationKind, current_cycle: u64) {
    let kind_idx = engine.kind_index(kind);
    for slot in 0..engine.stations[kind_idx].len() {
        let station = &engine.stations[kind_idx][slot];
        if !station.busy || station.address_resolved || station.qj.is_some() {
            continue;
        }
        let owning = station.owning_instruction_index;
        if engine.load_store_queue.front() != Some(owning) {
            continue;
        }

        let at_addr_start = station.remaining_addr == station.cycles_per_addr;
        let about_to_resolve = station.remaining_addr == 0;

        if at_addr_start && engine.program[owning].exec_start_cycle == 0 {
            engine.program[owning].exec_start_cycle = current_cycle;
        }

        let station = &mut engine.stations[kind_idx][slot];
        if !about_to_resolve {
            station.remaining_addr -= 1;
        }
        if about_to_resolve || station.remaining_addr == 0 {
            station.address = station.address.wrapping_add(station.vj);
            station.address_resolved = true;
            let _ = engine.load_store_queue.pop_front();
        }
    }
}

fn advance_load_memory_phase(engine: &mut Engine, current_cycle: u64) {
    let kind_idx = engine.kind_index(StationKind::Load);
    for slot in 0..engine.stations[kind_idx].len() {
        let station = &mut engine.stations[kind_idx][slot];
        if !station.busy || !station.address_resolved || station.remaining_exec == 0 {
            continue;
        }
        station.remaining_exec -= 1;
        if station.remaining_exec == 0 {
            let address = station.address;
            let owning = station.owning_instruction_index;
            let result = engine.memory.read(address);
            let station = &mut engine.stations[kind_idx][slot];
            station.last_computed_result = result;
            engine.program[owning].exec_end_cycle = current_cycle;
        }
    }
}

fn advance_store_memory_phase(engine: &mut Engine, current_cycle: u64, loads_in_memory_phase: &[(u64, u16)]) {
    let kind_idx = engine.kind_index(StationKind::Store);
    for slot in 0..engine.stations[kind_idx].len() {
        let station = &engine.stations[kind_idx][slot];
        if !station.busy || !station.address_resolved || station.remaining_exec == 0 {
            continue;
        }
        let owning = station.owning_instruction_index;
        let store_issue_cycle = engine.program[owning].issue_cycle;
        let store_address = station.address;
        let blocked = loads_in_memory_phase
            .iter()
            .any(|&(load_issue_cycle, load_address)| load_issue_cycle < store_issue_cycle && load_address == store_address);
        if blocked {
            continue;
        }
        let station = &mut engine.stations[kind_idx][slot];
        station.remaining_exec -= 1;
        if station.remaining_exec == 0 {
            engine.program[owning].exec_end_cycle = current_cycle;
        }
    }
}
