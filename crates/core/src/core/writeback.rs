//! Writeback stage: selects at most one store and one non-store result per
//! cycle, commits it, and broadcasts over the common data bus.

use crate::core::engine::Engine;
use crate::core::station::{StationId, StationKind};
use crate::isa::instruction::Opcode;

struct Candidate {
    kind_idx: usize,
    slot: usize,
    issue_cycle: u64,
}

pub fn do_writeback(engine: &mut Engine) {
    let current_cycle = engine.cycle;

    if let Some(candidate) = select_store(engine, current_cycle) {
        writeback_store(engine, candidate, current_cycle);
    }
    if let Some(candidate) = select_non_store(engine, current_cycle) {
        writeback_non_store(engine, candidate, current_cycle);
    }
}

fn select_store(engine: &Engine, current_cycle: u64) -> Option<Candidate> {
    let kind_idx = engine.kind_index(StationKind::Store);
    engine.stations[kind_idx]
        .iter()
        .enumerate()
        .filter(|(_, s)| {
            s.busy && s.remaining_exec == 0 && s.qk.is_none() && engine.program[s.owning_instruction_index].exec_end_cycle < current_cycle
        })
        .map(|(slot, s)| Candidate {
            kind_idx,
            slot,
            issue_cycle: engine.program[s.owning_instruction_index].issue_cycle,
        })
        .min_by_key(|c| c.issue_cycle)
}

fn select_non_store(engine: &Engine, current_cycle: u64) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for kind in StationKind::ALL {
        if matches!(kind, StationKind::Store) {
            continue;
        }
        let kind_idx = engine.kind_index(kind);
        for (slot, s) in engine.stations[kind_idx].iter().enumerate() {
            if !s.busy || s.remaining_exec != 0 {
                continue;
            }
            if engine.program[s.owning_instruction_index].exec_end_cycle >= current_cycle {
                continue;
            }
            let issue_cycle = engine.program[s.owning_instruction_index].issue_cycle;
            let replace = match &best {
                Some(b) => issue_cycle < b.issue_cycle,
                None => true,
            };
            if replace {
                best = Some(Candidate { kind_idx, slot, issue_cycle });
            }
        }
    }
    best
}

fn writeback_store(engine: &mut Engine, candidate: Candidate, current_cycle: u64) {
    let station = &mut engine.stations[candidate.kind_idx][candidate.slot];
    let address = station.address;
    let value = station.vk;
    let owning = station.owning_instruction_index;
    station.clear();
    engine.memory.write(address, value);
    engine.program[owning].writeback_cycle = current_cycle;
    tracing::debug!(cycle = current_cycle, address, value, "store writeback");
}

fn writeback_non_store(engine: &mut Engine, candidate: Candidate, current_cycle: u64) {
    let station = &mut engine.stations[candidate.kind_idx][candidate.slot];
    let id = station.id;
    let opcode = station.captured_opcode.expect("busy station has a captured opcode");
    let result = station.last_computed_result;
    let owning = station.owning_instruction_index;
    let dest_reg = engine.program[owning].dest_reg_d;
    let immediate = engine.program[owning].immediate;

    station.clear();
    engine.program[owning].writeback_cycle = current_cycle;
    engine.completed_instructions += 1;

    tracing::debug!(cycle = current_cycle, station = id.0, ?opcode, result, "non-store writeback");

    match opcode {
        Opcode::Load | Opcode::Add | Opcode::Sub | Opcode::Nor | Opcode::Mul => {
            commit_and_broadcast(engine, id, dest_reg, result, current_cycle);
        }
        Opcode::Beq => writeback_beq(engine, owning, result, immediate, current_cycle),
        Opcode::Call => writeback_call(engine, owning, immediate, current_cycle),
        Opcode::Ret => writeback_ret(engine, owning, current_cycle),
        Opcode::Store => unreachable!("stores are handled by writeback_store"),
    }
}

/// Writes `result` into every register whose *effective* status entry
/// (the speculation tail while active, else the live table) equals `id`,
/// then broadcasts the value to every busy station waiting on it.
fn commit_and_broadcast(engine: &mut Engine, id: StationId, dest_reg: u8, result: u16, current_cycle: u64) {
    if dest_reg != 0 {
        engine.registers.write(dest_reg, result);
        if let Some(snapshot) = engine.speculation.tail_mut() {
            snapshot.table.clear_if_match(dest_reg, id);
        } else {
            engine.register_status.clear_if_match(dest_reg, id);
        }
    }

    for station in engine.stations.iter_mut().flatten() {
        if !station.busy {
            continue;
        }
        let mut touched = false;
        if station.qj == id {
            station.vj = result;
            station.qj = StationId::NONE;
            touched = true;
        }
        if station.qk == id {
            station.vk = result;
            station.qk = StationId::NONE;
            touched = true;
        }
        if touched && station.operands_ready() {
            station.remaining_exec = station.cycles_per_exec;
            engine.program[station.owning_instruction_index].exec_start_cycle = current_cycle;
        }
    }
}

fn writeback_beq(engine: &mut Engine, owning: usize, result: u16, offset: i16, current_cycle: u64) {
    engine.branches_seen += 1;
    let beq_issue_cycle = engine.program[owning].issue_cycle;
    if result == 1 {
        engine.mispredictions += 1;
        engine.pc = target_pc(owning, offset);
        engine.speculation.drop_all();
        engine.flush_younger_than(beq_issue_cycle);
        tracing::debug!(cycle = current_cycle, pc = engine.pc, "branch mispredicted, flushing");
    } else {
        engine.pc = owning + 1;
        if let Some(snapshot) = engine.speculation.pop_head() {
            engine.register_status = snapshot.table;
        }
    }
}

fn writeback_call(engine: &mut Engine, owning: usize, offset: i16, current_cycle: u64) {
    engine.registers.write(1, (owning as u16).wrapping_add(1));
    engine.pc = target_pc(owning, offset);
    let call_issue_cycle = engine.program[owning].issue_cycle;
    engine.speculation.drop_all();
    engine.flush_younger_than(call_issue_cycle);
    tracing::debug!(cycle = current_cycle, pc = engine.pc, "call writeback");
}

fn writeback_ret(engine: &mut Engine, owning: usize, current_cycle: u64) {
    engine.pc = engine.registers.read(1) as usize;
    let ret_issue_cycle = engine.program[owning].issue_cycle;
    engine.speculation.drop_all();
    engine.flush_younger_than(ret_issue_cycle);
    tracing::debug!(cycle = current_cycle, pc = engine.pc, "ret writeback");
}

fn target_pc(owning: usize, offset: i16) -> usize {
    let target = owning as i64 + 1 + i64::from(offset);
    usize::try_from(target).unwrap_or(usize::MAX)
}
