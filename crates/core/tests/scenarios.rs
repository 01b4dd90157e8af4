//! End-to-end cycle-accuracy checks against concrete traces with known
//! expected timestamps and final architectural state.

use pretty_assertions::assert_eq;
use tomasulo_core::config::HardwareInventory;
use tomasulo_core::core::engine::Engine;
use tomasulo_core::core::memory::Memory;
use tomasulo_core::isa::parse::parse_program;

fn engine_for(source: &str, regs: &[(u8, u16)]) -> Engine {
    let program = parse_program(source).unwrap();
    let inventory = HardwareInventory::default();
    let mut engine = Engine::new(program, &inventory, Memory::new(), 0);
    for &(reg, value) in regs {
        engine.registers.write(reg, value);
    }
    engine
}

#[test]
fn straight_line_add_completes_in_four_cycles() {
    let mut engine = engine_for("add r1 r2 r3\n", &[(2, 3), (3, 4)]);
    engine.run().unwrap();

    assert_eq!(engine.program[0].issue_cycle, 1);
    assert_eq!(engine.program[0].exec_start_cycle, 2);
    assert_eq!(engine.program[0].exec_end_cycle, 3);
    assert_eq!(engine.program[0].writeback_cycle, 4);
    assert_eq!(engine.registers.read(1), 7);

    let report = engine.performance_report();
    assert_eq!(report.cycles, 4);
    assert!((report.ipc - 0.25).abs() < f64::EPSILON);
}

#[test]
fn raw_dependency_resolves_through_the_common_data_bus() {
    let mut engine = engine_for("add r1 r2 r3\nadd r4 r1 r1\n", &[(2, 1), (3, 2)]);
    engine.run().unwrap();

    assert_eq!(engine.program[1].issue_cycle, 2);
    assert_eq!(engine.program[1].exec_start_cycle, 5);
    assert_eq!(engine.program[1].exec_end_cycle, 6);
    assert_eq!(engine.program[1].writeback_cycle, 7);
    assert_eq!(engine.registers.read(4), 6);
}

#[test]
fn load_after_store_to_the_same_address_observes_the_write() {
    let mut engine = engine_for("store r1 0 r2\nload r3 0 r2\n", &[(1, 9), (2, 4)]);
    engine.run().unwrap();

    assert!(engine.program[1].writeback_cycle > engine.program[0].writeback_cycle);
    assert_eq!(engine.registers.read(3), 9);
}

#[test]
fn mispredicted_not_taken_beq_flushes_the_speculated_instructions() {
    // The offset is chosen so the taken target lands past both speculated
    // adds (index 3), matching the writeback target formula in the commit
    // stage rather than the narrative arithmetic, which is internally
    // inconsistent about whether the example offset is 1 or 2.
    let mut engine = engine_for("beq r1 r1 2\nadd r2 r3 r4\nadd r5 r6 r7\n", &[]);
    engine.run().unwrap();

    assert_eq!(engine.mispredictions, 1);
    assert_eq!(engine.branches_seen, 1);
    let report = engine.performance_report();
    assert!((report.misprediction_rate - 1.0).abs() < f64::EPSILON);
    assert_eq!(engine.program[1].writeback_cycle, 0);
    assert_eq!(engine.program[2].writeback_cycle, 0);
}

#[test]
fn call_ret_round_trip_flushes_then_re_executes_the_body() {
    let mut engine = engine_for("call 2\nadd r2 r3 r4\nadd r5 r6 r7\nret\n", &[(3, 1), (4, 1), (6, 1), (7, 1)]);
    engine.run().unwrap();

    assert_eq!(engine.registers.read(1), 1);
    assert_eq!(engine.program[1].writeback_cycle, 0, "first speculative issue of the body must be flushed");
    assert_eq!(engine.completed_instructions, 4, "call, ret, and the two re-fetched adds");
    assert_eq!(engine.registers.read(2), 2);
    assert_eq!(engine.registers.read(5), 2);
}

#[test]
fn multiply_takes_ten_cycles_and_masks_to_sixteen_bits() {
    let mut engine = engine_for("mul r1 r2 r3\n", &[(2, 0x8000), (3, 2)]);
    engine.run().unwrap();

    assert_eq!(engine.registers.read(1), 0);
    assert_eq!(engine.program[0].exec_end_cycle - engine.program[0].exec_start_cycle + 1, 10);
}

#[test]
fn younger_instruction_stalls_behind_an_unresolved_branch() {
    // mul takes 10 cycles, so the beq behind it (itself waiting on r1) stays
    // the oldest unresolved speculation for a long stretch. The trailing add
    // must not begin executing until that beq writes back, even though the
    // add's own operands are ready immediately.
    let mut engine = engine_for("mul r1 r2 r3\nbeq r1 r4 0\nadd r5 r6 r7\n", &[(2, 1), (3, 1), (6, 2), (7, 3)]);
    engine.run().unwrap();

    assert_eq!(engine.mispredictions, 0);
    assert_eq!(engine.branches_seen, 1);
    assert!(
        engine.program[2].exec_start_cycle >= engine.program[1].writeback_cycle,
        "add must not begin executing before the beq ahead of it resolves"
    );
    assert_eq!(engine.registers.read(5), 5);
}

#[test]
fn register_zero_is_never_written_by_writeback() {
    let mut engine = engine_for("add r0 r1 r2\n", &[(1, 5), (2, 6)]);
    engine.run().unwrap();
    assert_eq!(engine.registers.read(0), 0);
}
