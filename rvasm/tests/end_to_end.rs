//! Assemble-then-run scenarios exercising `rvasm` and `rvcore` together.

use rvcore::constants::BASE_ADDRESS;
use rvcore::{Simulator, StepResult};

fn run_to_halt(source: &str) -> Simulator {
    let program = rvasm::assemble(source).expect("assembly should succeed");
    let mut sim = Simulator::new();
    sim.load(&program).expect("load should succeed");
    loop {
        match sim.step() {
            StepResult::Continue => continue,
            StepResult::Halt(_) => break,
        }
    }
    sim
}

#[test]
fn sums_one_to_five_with_a_branch_loop() {
    let source = r#"
        addi t0, x0, 0      # accumulator
        addi t1, x0, 1      # counter
        addi t2, x0, 6      # limit (exclusive)
    loop:
        beq t1, t2, done
        add t0, t0, t1
        addi t1, t1, 1
        beq x0, x0, loop
    done:
    "#;
    let sim = run_to_halt(source);
    let snapshot = sim.snapshot(BASE_ADDRESS, 0);
    assert_eq!(snapshot.registers[5], 15); // t0 = 1+2+3+4+5
}

#[test]
fn la_loads_a_data_word_through_an_absolute_address() {
    let source = r#"
        la a0, value
        lw a1, 0(a0)
    value:
        .word 0x2a
    "#;
    let sim = run_to_halt(source);
    let snapshot = sim.snapshot(BASE_ADDRESS, 0);
    assert_eq!(snapshot.registers[11], 0x2a);
}

#[test]
fn jal_and_jalr_implement_a_call_and_return() {
    let source = r#"
        jal ra, func
        addi a0, a0, 100
        beq x0, x0, end
    func:
        addi a0, x0, 1
        jalr x0, ra, 0
    end:
    "#;
    let sim = run_to_halt(source);
    let snapshot = sim.snapshot(BASE_ADDRESS, 0);
    assert_eq!(snapshot.registers[10], 101);
}

#[test]
fn store_then_load_byte_round_trips_with_sign_extension() {
    let source = r#"
        addi t0, x0, -1
        sb t0, 0(x0)
        lb t1, 0(x0)
        lbu t2, 0(x0)
    "#;
    let sim = run_to_halt(source);
    let snapshot = sim.snapshot(BASE_ADDRESS, 0);
    assert_eq!(snapshot.registers[6] as i32, -1);
    assert_eq!(snapshot.registers[7], 0xff);
}

#[test]
fn division_and_remainder_use_signed_semantics() {
    let source = r#"
        addi t0, x0, -7
        addi t1, x0, 2
        div t2, t0, t1
        rem t3, t0, t1
    "#;
    let sim = run_to_halt(source);
    let snapshot = sim.snapshot(BASE_ADDRESS, 0);
    assert_eq!(snapshot.registers[7] as i32, -3);
    assert_eq!(snapshot.registers[28] as i32, -1);
}

#[test]
fn floating_point_add_and_word_conversion_round_trip() {
    let source = r#"
        addi t0, x0, 4
        fcvt.s.w f0, t0
        addi t1, x0, 3
        fcvt.s.w f1, t1
        fadd.s f2, f0, f1
        fcvt.w.s t2, f2
    "#;
    let sim = run_to_halt(source);
    let snapshot = sim.snapshot(BASE_ADDRESS, 0);
    assert_eq!(snapshot.registers[7], 7);
}

#[test]
fn unknown_label_reference_fails_before_any_bytes_are_produced() {
    let err = rvasm::assemble("jal x1, nowhere\n").unwrap_err();
    assert!(matches!(err, rvasm::AssemblyError::UnknownLabel { .. }));
}
