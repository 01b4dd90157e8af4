//! The per-cycle driver: composes issue, writeback, and execute, and owns
//! every piece of architectural and microarchitectural state.

use crate::common::error::RuntimeBoundError;
use crate::config::HardwareInventory;
use crate::core::loadstore::LoadStoreQueue;
use crate::core::memory::Memory;
use crate::core::register::{RegisterFile, RegisterStatusTable};
use crate::core::speculation::SpeculationStack;
use crate::core::station::{ReservationStation, StationId, StationKind};
use crate::core::{execute, issue, writeback};
use crate::isa::instruction::Instruction;
use crate::stats::PerformanceReport;

/// Default implementation-defined safety ceiling on cycle count, guarding
/// against deadlock/livelock in a simulated schedule.
pub const DEFAULT_CYCLE_CEILING: u64 = 100_000;

/// A read-only view of microarchitectural state for post-mortem inspection
/// or front-end display.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub cycle: u64,
    pub stations: Vec<ReservationStation>,
    pub register_status: RegisterStatusTable,
    pub registers: RegisterFile,
}

pub struct Engine {
    pub program: Vec<Instruction>,
    pub pc: usize,
    pub cycle: u64,
    pub registers: RegisterFile,
    pub register_status: RegisterStatusTable,
    pub memory: Memory,
    pub stations: [Vec<ReservationStation>; 8],
    pub load_store_queue: LoadStoreQueue,
    pub speculation: SpeculationStack,
    pub completed_instructions: u64,
    pub branches_seen: u64,
    pub mispredictions: u64,
    pub cycle_ceiling: u64,
}

impl Engine {
    #[must_use]
    pub fn new(program: Vec<Instruction>, inventory: &HardwareInventory, memory: Memory, initial_pc: usize) -> Self {
        let mut next_id = 1u32;
        let stations = StationKind::ALL.map(|kind| {
            let spec = inventory.spec_for(kind);
            (0..spec.units)
                .map(|i| {
                    let id = StationId(next_id);
                    next_id += 1;
                    ReservationStation::new(format!("{kind:?}{}", i + 1), id, spec.exec_cycles, spec.addr_cycles)
                })
                .collect::<Vec<_>>()
        });

        Self {
            program,
            pc: initial_pc,
            cycle: 1,
            registers: RegisterFile::new(),
            register_status: RegisterStatusTable::new(),
            memory,
            stations,
            load_store_queue: LoadStoreQueue::new(),
            speculation: SpeculationStack::new(),
            completed_instructions: 0,
            branches_seen: 0,
            mispredictions: 0,
            cycle_ceiling: DEFAULT_CYCLE_CEILING,
        }
    }

    #[must_use]
    pub fn kind_index(&self, kind: StationKind) -> usize {
        StationKind::ALL.iter().position(|k| *k == kind).expect("StationKind::ALL is exhaustive")
    }

    /// The register-status table that issue-time operand capture and
    /// rename claims should read/write: the speculation stack's tail
    /// snapshot while speculation is active, or the live table otherwise.
    #[must_use]
    pub fn effective_register_status(&self) -> &RegisterStatusTable {
        self.speculation.tail().map_or(&self.register_status, |s| &s.table)
    }

    /// Claims `reg` for `station`, routing the write into the speculation
    /// tail's copy while speculation is active, per the rename-under-
    /// speculation rule.
    pub fn claim_register(&mut self, reg: u8, station: StationId) {
        if let Some(snapshot) = self.speculation.tail_mut() {
            snapshot.table.set_producer(reg, station);
        } else {
            self.register_status.set_producer(reg, station);
        }
    }

    /// Finds a busy station of `kind` whose owning instruction index is
    /// `program_index`.
    #[must_use]
    pub fn find_station_at(&self, program_index: usize, kind: StationKind) -> Option<usize> {
        let idx = self.kind_index(kind);
        self.stations[idx]
            .iter()
            .position(|s| s.busy && s.owning_instruction_index == program_index)
    }

    /// Locates a station anywhere in the bank by id. Linear scan: station
    /// counts are small (tens), so no index is warranted.
    #[must_use]
    pub fn find_station_by_id(&self, id: StationId) -> Option<(usize, usize)> {
        for (kind_idx, bank) in self.stations.iter().enumerate() {
            if let Some(slot) = bank.iter().position(|s| s.id == id) {
                return Some((kind_idx, slot));
            }
        }
        None
    }

    #[must_use]
    pub fn all_stations(&self) -> impl Iterator<Item = &ReservationStation> {
        self.stations.iter().flatten()
    }

    fn all_stations_mut(&mut self) -> impl Iterator<Item = &mut ReservationStation> {
        self.stations.iter_mut().flatten()
    }

    /// Flushes every busy station (and its register-status claim) whose
    /// owning instruction issued strictly after `threshold_issue_cycle`.
    pub fn flush_younger_than(&mut self, threshold_issue_cycle: u64) {
        let issue_cycles: Vec<u64> = self.program.iter().map(|instr| instr.issue_cycle).collect();
        for station in self.all_stations_mut() {
            if station.busy && issue_cycles[station.owning_instruction_index] > threshold_issue_cycle {
                station.clear();
            }
        }
        // Clear any register-status entries still pointing at a now-flushed
        // (non-busy) station id.
        let busy_ids: std::collections::HashSet<u32> =
            self.all_stations().filter(|s| s.busy).map(|s| s.id.0).collect();
        for reg in 0..crate::core::register::NUM_REGISTERS as u8 {
            let producer = self.register_status.producer(reg);
            if !producer.is_none() && !busy_ids.contains(&producer.0) {
                self.register_status.clear_if_match(reg, producer);
            }
        }
        let program = &self.program;
        self.load_store_queue
            .flush_younger_than(threshold_issue_cycle, |pc| program[pc].issue_cycle);
    }

    /// Runs exactly one cycle: issue, then writeback, then execute, then
    /// advances the cycle counter. Returns `true` if the run has
    /// terminated (pc past the program and no station busy).
    pub fn step(&mut self) -> bool {
        issue::try_issue(self);
        writeback::do_writeback(self);
        execute::advance_execution(self);
        self.cycle += 1;
        self.is_terminated()
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.pc >= self.program.len() && self.all_stations().all(|s| !s.busy)
    }

    /// Runs to completion, aborting with [`RuntimeBoundError`] if the cycle
    /// ceiling is exceeded first.
    pub fn run(&mut self) -> Result<(), RuntimeBoundError> {
        while !self.is_terminated() {
            if self.cycle > self.cycle_ceiling {
                return Err(RuntimeBoundError { ceiling: self.cycle_ceiling });
            }
            let _ = self.step();
        }
        Ok(())
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cycle: self.cycle,
            stations: self.all_stations().cloned().collect(),
            register_status: self.register_status.clone(),
            registers: self.registers.clone(),
        }
    }

    #[must_use]
    pub fn performance_report(&self) -> PerformanceReport {
        let cycles = self.cycle.saturating_sub(1);
        PerformanceReport::new(cycles, self.completed_instructions, self.branches_seen, self.mispredictions)
    }
}
