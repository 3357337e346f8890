//! Smoke tests combining the utilities the way wave components use them.

use tlm_utilities::{
    Delay, FirstOrderLowPassFilter, FirstOrderTransferFunction, Matrix, Vector, ludcmp, solvlu,
};

#[test]
fn delayed_step_reaches_filter_after_delay() {
    let ts = 0.001;
    let mut delay = Delay::new_time(0.01, ts, 0.0).unwrap();
    let mut filter = FirstOrderLowPassFilter::new(ts, 1000.0, 0.0, 0.0).unwrap();

    let mut outputs = Vec::new();
    for _ in 0..200 {
        let delayed = delay.update(1.0);
        outputs.push(filter.update(delayed));
    }
    assert!(outputs[..10].iter().all(|y| *y == 0.0));
    assert!(outputs[10] > 0.0);
    assert!((outputs[199] - 1.0).abs() < 1e-6);
}

#[test]
fn integrator_tracks_ramp_area() {
    let ts = 0.01;
    let mut integ = FirstOrderTransferFunction::new(ts, [1.0, 0.0], [0.0, 1.0], 0.0, 0.0).unwrap();
    for k in 1..=100 {
        integ.update(k as f64 * ts);
    }
    // Trapezoidal rule is exact for a ramp: integral of t from 0 to 1.
    assert!((integ.value() - 0.5).abs() < 1e-12);
}

#[test]
fn factors_are_reusable_for_several_right_hand_sides() {
    let mut a = Matrix::from_row_slice(3, 3, &[2.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 2.0]);
    let original = a.clone();
    let mut order = vec![0; 3];
    assert!(ludcmp(&mut a, &mut order));

    for rhs in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]] {
        let b = Vector::from_row_slice(&rhs);
        let mut x = Vector::zeros(3);
        solvlu(&a, &b, &mut x, &order).unwrap();
        assert!((&original * &x - &b).norm() < 1e-12);
    }
}
