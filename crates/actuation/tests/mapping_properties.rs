use actuation::{ControlMapping, ControlSample};

#[test]
fn steering_duty_stays_in_servo_range_and_is_monotonic() {
    let mapping = ControlMapping::default();
    let mut prev = f64::NEG_INFINITY;
    for raw in 0..=255 {
        let duty = mapping.servo_duty(raw);
        assert!((7.7..=11.7).contains(&duty), "raw {raw} -> {duty}");
        assert!(duty >= prev, "not monotonic at raw {raw}");
        prev = duty;
    }
}

#[test]
fn throttle_is_zero_past_center() {
    let mapping = ControlMapping::default();
    for raw in 128..=255 {
        assert_eq!(mapping.motor_duty(raw), 0.0, "raw {raw}");
    }
}

#[test]
fn throttle_forward_range_is_positive_and_capped() {
    let mapping = ControlMapping::default();
    let mut prev = 0.0;
    // Pushing the stick forward lowers the raw value and raises the duty.
    for raw in (0..128).rev() {
        let duty = mapping.motor_duty(raw);
        assert!(duty > 0.0 && duty <= 80.0, "raw {raw} -> {duty}");
        assert!(duty >= prev, "not monotonic at raw {raw}");
        prev = duty;
    }
    assert_eq!(mapping.motor_duty(0), 80.0);
    assert_eq!(mapping.motor_duty(-20), 80.0);
}

#[test]
fn duties_map_each_axis_independently() {
    let mapping = ControlMapping::default();
    let a = mapping.duties(ControlSample::new(0, 64));
    let b = mapping.duties(ControlSample::new(255, 64));
    assert_eq!(a.motor, b.motor);
    assert!(a.servo < b.servo);
}
