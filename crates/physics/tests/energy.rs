use physics::{Dynamics, Integrator, LinkState};

fn double_pendulum(integrator: Integrator) -> Dynamics {
    Dynamics::chain(2, &[9.81, 0.4, 1.0, 0.4, 1.0], integrator).unwrap()
}

#[test]
fn rk4_conserves_energy_without_actuation() {
    let dynamics = double_pendulum(Integrator::Rk4);
    let mut state = LinkState::from_vec(vec![0.3, 1.1, 0.0, 0.0]).unwrap();
    let start = dynamics.energy(&state);
    for _ in 0..500 {
        state = dynamics.integrate(&state, &[0.0, 0.0], 0.001).unwrap();
    }
    let end = dynamics.energy(&state);
    assert!((end - start).abs() < 1e-2 * start.abs().max(1.0), "start={start} end={end}");
}

#[test]
fn three_link_chain_stays_finite() {
    let dynamics = Dynamics::chain(3, &[9.81, 0.3, 1.0, 0.3, 0.5, 0.2, 0.25], Integrator::Rk4).unwrap();
    let mut state = LinkState::from_vec(vec![0.1, 0.5, 1.5, 0.0, 0.0, 0.0]).unwrap();
    for _ in 0..1000 {
        state = dynamics.integrate(&state, &[0.0, 0.0, 0.0], 0.001).unwrap();
    }
    assert!(state.is_finite());
}

#[test]
fn integration_is_deterministic() {
    let dynamics = double_pendulum(Integrator::Rk4);
    let run = || {
        let mut state = LinkState::from_vec(vec![0.3, 1.1, 0.2, -0.4]).unwrap();
        for i in 0..200 {
            let tau = (i as f32 * 0.1).sin();
            state = dynamics.integrate(&state, &[tau, -tau], 0.01).unwrap();
        }
        state
    };
    assert_eq!(run().as_slice(), run().as_slice());
}
