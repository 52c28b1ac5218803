//! Timing of values inside a casing and across casing boundaries.

use lattice_integration_tests::{controlled_line, install, probe_log};
use lattice_machine::{Emitter, Face, Probe, Relay, Value};
use proptest::prelude::*;

const TICKS: usize = 10;

/// Emitter and probe on two faces of the same casing.
fn direct(start: Value, increment: Value) -> Vec<(u64, Value)> {
    let (mut world, casings) = controlled_line(1, 8);
    let x = casings[0];
    install(&mut world, x, Face::East, Emitter::new(Face::NorthEast).starting_at(start).with_increment(increment));
    install(&mut world, x, Face::NorthEast, Probe::new());
    for _ in 0..TICKS {
        world.tick();
    }
    probe_log(&world, x, Face::NorthEast)
}

/// Emitter on one casing, probe on the neighbor across the East face.
fn across(start: Value, increment: Value) -> Vec<(u64, Value)> {
    let (mut world, casings) = controlled_line(2, 8);
    let (x, y) = (casings[0], casings[1]);
    install(&mut world, x, Face::NorthEast, Emitter::new(Face::East).starting_at(start).with_increment(increment));
    install(&mut world, y, Face::NorthEast, Probe::new());
    for _ in 0..TICKS {
        world.tick();
    }
    probe_log(&world, y, Face::NorthEast)
}

#[test]
fn direct_delivery_is_same_tick() {
    let log = direct(0, 1);
    let expected: Vec<(u64, Value)> = (0..TICKS as u64).map(|t| (t, t as Value)).collect();
    assert_eq!(log, expected);
}

#[test]
fn crossing_a_boundary_costs_one_tick() {
    let direct = direct(0, 1);
    let across = across(0, 1);

    assert_eq!(across.len(), direct.len() - 1);
    for ((t_direct, v_direct), (t_across, v_across)) in direct.iter().zip(&across) {
        assert_eq!(*t_across, t_direct + 1);
        assert_eq!(v_across, v_direct);
    }
}

#[test]
fn three_casing_line_takes_two_boundaries() {
    // Controller, then near, middle and far casings towards East.
    let (mut world, casings) = controlled_line(3, 8);
    let (near, middle, far) = (casings[0], casings[1], casings[2]);
    install(&mut world, far, Face::NorthEast, Emitter::new(Face::West).starting_at(7));
    install(&mut world, middle, Face::NorthEast, Relay::new(Face::East, Face::West));
    install(&mut world, near, Face::NorthEast, Probe::new());

    for _ in 0..TICKS {
        world.tick();
    }

    let log = probe_log(&world, near, Face::NorthEast);
    assert!(!log.is_empty());
    // Written during tick n, observed no earlier than n + 2.
    for (i, (tick, value)) in log.iter().enumerate() {
        assert_eq!(*value, 7 + i as Value);
        assert!(*tick >= i as u64 + 2);
    }
    assert_eq!(log[0].0, 2);
}

#[test]
fn lanes_share_a_boundary_without_mixing() {
    // Both emitters write towards East, on the NE and Up lanes.
    let (mut world, casings) = controlled_line(2, 8);
    let (x, y) = (casings[0], casings[1]);
    install(&mut world, x, Face::NorthEast, Emitter::new(Face::East).starting_at(100));
    install(&mut world, x, Face::Up, Emitter::new(Face::East).starting_at(-100).with_increment(-1));
    install(&mut world, y, Face::Up, Relay::new(Face::West, Face::SouthEast));
    install(&mut world, y, Face::NorthEast, Probe::new());
    install(&mut world, y, Face::SouthEast, Probe::new());

    for _ in 0..TICKS {
        world.tick();
    }

    let first: Vec<Value> = probe_log(&world, y, Face::NorthEast).into_iter().map(|(_, v)| v).collect();
    let second: Vec<Value> = probe_log(&world, y, Face::SouthEast).into_iter().map(|(_, v)| v).collect();
    assert_eq!(first, (100..100 + first.len() as Value).collect::<Vec<_>>());
    assert_eq!(second, (0..second.len() as Value).map(|i| -100 - i).collect::<Vec<_>>());
}

proptest! {
    #[test]
    fn values_cross_bit_for_bit(start in any::<i16>(), increment in any::<i16>()) {
        let direct = direct(start, increment);
        let across = across(start, increment);
        let direct_values: Vec<Value> = direct.iter().map(|(_, v)| *v).collect();
        let across_values: Vec<Value> = across.iter().map(|(_, v)| *v).collect();
        prop_assert_eq!(&direct_values[..across_values.len()], &across_values[..]);
    }
}
