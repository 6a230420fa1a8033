use std::time::Duration;

use sorter_hardware::sim::{BLACK_LEVEL, EMPTY_LEVEL, NEUTRAL_PULSE, WHITE_LEVEL};
use sorter_hardware::{SimHopper, SimMarble, SimulatedButton, SimulatedSensor, SimulatedServo};
use sorter_traits::{AnalogSensor, ButtonInput, ServoDriver};

#[test]
fn single_lane_drains_in_order() {
    let hopper = SimHopper::new([SimMarble::Black, SimMarble::White, SimMarble::Black]);
    let mut sensor = SimulatedSensor::new(hopper.clone());
    let mut servo = SimulatedServo::with_hopper(hopper.clone(), NEUTRAL_PULSE);

    let mut seen = Vec::new();
    loop {
        let r = sensor.read_channel(0).unwrap();
        if r == EMPTY_LEVEL {
            break;
        }
        seen.push(r);
        servo.set_pulse(0, 650).unwrap();
        servo.set_pulse(0, NEUTRAL_PULSE).unwrap();
    }
    assert_eq!(seen, vec![BLACK_LEVEL, WHITE_LEVEL, BLACK_LEVEL]);
    assert_eq!(hopper.delivered().len(), 3);
    assert_eq!(servo.pulses().len(), 6);
}

#[test]
fn deflecting_an_empty_lane_takes_nothing() {
    let hopper = SimHopper::new([SimMarble::White]);
    let mut servo = SimulatedServo::with_hopper(hopper.clone(), NEUTRAL_PULSE);
    servo.set_pulse(1, 2_275).unwrap();
    servo.set_pulse(1, NEUTRAL_PULSE).unwrap();
    assert_eq!(hopper.remaining(), 1);
    assert!(hopper.delivered().is_empty());
}

#[test]
fn pushed_marbles_join_the_back() {
    let hopper = SimHopper::default();
    let mut sensor = SimulatedSensor::new(hopper.clone());
    assert_eq!(sensor.read_channel(0).unwrap(), EMPTY_LEVEL);
    hopper.push(SimMarble::Black);
    assert_eq!(sensor.read_channel(0).unwrap(), BLACK_LEVEL);
}

#[test]
fn servo_rejects_third_flap() {
    let mut servo = SimulatedServo::new();
    assert!(servo.set_pulse(2, NEUTRAL_PULSE).is_err());
    assert!(servo.pulses().is_empty());
}

#[test]
fn press_for_releases_afterwards() {
    let mut button = SimulatedButton::new();
    let handle = button.handle();
    let t = std::thread::spawn(move || handle.press_for(Duration::from_millis(20)));
    t.join().unwrap();
    assert!(button.is_high().unwrap());
}
