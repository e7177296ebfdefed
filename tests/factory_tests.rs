//! Form factor registry and service wiring tests

use chassis_buttons::config::button_config;
use chassis_buttons::{
    ButtonConfig, ButtonKind, ButtonService, ButtonState, Control, DebouncePolicy, DecodedState,
    Env, Error, GpioDefinitions, GpioLevel, MemoryLineSource, MomentaryButton, Reactor, Registry,
    Result, StateSink, StateUpdate,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Default)]
struct RecordingSink(Rc<RefCell<Vec<StateUpdate>>>);

impl StateSink for RecordingSink {
    fn publish_state(&mut self, update: &StateUpdate) -> Result<()> {
        self.0.borrow_mut().push(update.clone());
        Ok(())
    }
}

fn setup() -> (Rc<RefCell<MemoryLineSource>>, RecordingSink, Env) {
    let _ = env_logger::builder().is_test(true).try_init();
    let src = Rc::new(RefCell::new(MemoryLineSource::new()));
    let sink = RecordingSink::default();
    let env = Env::new(
        src.clone(),
        Rc::new(RefCell::new(sink.clone())),
        DebouncePolicy::EdgeCompare,
    );
    (src, sink, env)
}

fn selector_entry(lines: [u32; 3]) -> serde_json::Value {
    json!({
        "name": "HOST_SELECTOR",
        "group_gpio_config": lines
            .iter()
            .map(|l| json!({ "pin": l, "direction": "both" }))
            .collect::<Vec<_>>(),
        "host_selector_map": { "000": 0, "001": 1, "010": 2, "011": 3 },
        "max_position": 4
    })
}

#[test]
fn test_builtin_form_factors() {
    let registry = Registry::with_builtin();
    assert!(registry.contains("HOST_SELECTOR"));
    assert!(registry.contains("ID_BTN"));
    assert!(registry.contains("DEBUG_SELECTOR_BUTTON"));
    assert!(!registry.contains("POWER_BUTTON"));
    assert_eq!(registry.names().count(), 3);
}

#[test]
fn test_create_known_and_unknown() {
    let (_src, _sink, env) = setup();
    let registry = Registry::with_builtin();

    let cfg = button_config(&selector_entry([1, 2, 3]), 0).unwrap();
    let control = registry.create("HOST_SELECTOR", &env, &cfg).unwrap();
    assert!(matches!(control, Some(Control::HostSelector(_))));

    let cfg = button_config(&json!({ "name": "UNKNOWN_TYPE", "pin": 7, "direction": "in" }), 0)
        .unwrap();
    assert!(registry.create("UNKNOWN_TYPE", &env, &cfg).unwrap().is_none());
}

fn build_power_as_id(env: &Env, config: &ButtonConfig) -> Result<Control> {
    MomentaryButton::new(ButtonKind::Id, env, config).map(Control::Button)
}

fn build_never(_env: &Env, config: &ButtonConfig) -> Result<Control> {
    Err(Error::Config {
        form_factor: config.form_factor.clone(),
        message: "not expected to be called".to_string(),
    })
}

#[test]
fn test_duplicate_registration_keeps_first() {
    let (_src, _sink, env) = setup();
    let mut registry = Registry::new();
    assert!(registry.register("POWER_BUTTON", build_power_as_id));
    assert!(!registry.register("POWER_BUTTON", build_never));

    let cfg = button_config(&json!({ "name": "POWER_BUTTON", "pin": 5, "direction": "in" }), 0)
        .unwrap();
    let control = registry.create("POWER_BUTTON", &env, &cfg).unwrap().unwrap();
    assert_eq!(control.lines(), vec![5]);
    assert_eq!(control.form_factor(), "POWER_BUTTON");
}

#[test]
fn test_busy_line_is_isolated_and_partial_claims_released() {
    let (src, sink, env) = setup();
    src.borrow_mut().mark_busy(42);
    let registry = Registry::with_builtin();

    let cfg = button_config(&selector_entry([40, 41, 42]), 0).unwrap();
    let err = registry.create("HOST_SELECTOR", &env, &cfg).err().unwrap();

    match &err {
        Error::HardwareAcquisition { line, .. } => assert_eq!(*line, 42),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(!err.is_fatal());
    assert_eq!(err.form_factor(), Some("HOST_SELECTOR"));
    assert!(!src.borrow().is_claimed(40));
    assert!(!src.borrow().is_claimed(41));
    assert!(sink.0.borrow().is_empty());
}

#[test]
fn test_build_skips_bad_entries() {
    let (src, sink, env) = setup();
    src.borrow_mut().mark_busy(20);
    let text = json!({
        "gpio_definitions": [
            selector_entry([10, 11, 12]),
            { "name": "ID_BTN", "pin": 3 },
            { "name": "POWER_BUTTON", "pin": 4, "direction": "both" },
            { "name": "DEBUG_SELECTOR_BUTTON", "pin": 20, "direction": "both" },
            { "name": "ID_BTN", "pin": 30, "direction": "both" },
            { "name": "ID_BTN_SHARED", "form_factor": "ID_BTN", "pin": 30, "direction": "both" }
        ]
    })
    .to_string();
    let defs = GpioDefinitions::parse(&text).unwrap();
    assert_eq!(defs.len(), 6);

    let service = ButtonService::build(
        &Registry::with_builtin(),
        &env,
        defs.button_configs(0),
        Reactor::new(src.clone()),
    )
    .unwrap();

    let names: Vec<String> = service
        .controls()
        .iter()
        .map(|c| c.borrow().name().to_string())
        .collect();
    assert_eq!(names, vec!["HOST_SELECTOR", "ID_BTN"]);
    assert_eq!(service.reactor().handler_count(), 4);
    assert!(!src.borrow().is_claimed(4));
    assert!(!src.borrow().is_claimed(20));
    // initial state of both surviving controls
    assert_eq!(sink.0.borrow().len(), 2);
}

#[test]
fn test_service_dispatches_to_each_control() {
    let (src, sink, env) = setup();
    let text = json!({
        "gpio_definitions": [
            selector_entry([10, 11, 12]),
            { "name": "ID_BTN", "pin": 30, "direction": "both" }
        ]
    })
    .to_string();
    let defs = GpioDefinitions::parse(&text).unwrap();
    let mut service = ButtonService::build(
        &Registry::with_builtin(),
        &env,
        defs.button_configs(0),
        Reactor::new(src.clone()),
    )
    .unwrap();
    sink.0.borrow_mut().clear();

    src.borrow_mut().set_level(30, GpioLevel::High);
    src.borrow_mut().set_level(11, GpioLevel::High);
    service.turn(Some(Duration::ZERO)).unwrap();

    let updates = sink.0.borrow();
    assert_eq!(updates.len(), 2);
    assert!(updates
        .iter()
        .any(|u| u.control == "ID_BTN" && u.state == DecodedState::Button(ButtonState::Pressed)));
    assert!(updates
        .iter()
        .any(|u| u.control == "HOST_SELECTOR" && u.state == DecodedState::Position(2)));
}

#[test]
fn test_remove_releases_lines() {
    let (src, _sink, env) = setup();
    let cfg = button_config(&selector_entry([10, 11, 12]), 0).unwrap();
    let registry = Registry::with_builtin();
    let mut service = ButtonService::new(Reactor::new(src.clone()));
    let control = registry.create("HOST_SELECTOR", &env, &cfg).unwrap().unwrap();
    service.attach(control).unwrap();
    assert!(service.reactor().is_registered(11));

    assert!(service.remove("HOST_SELECTOR"));
    assert!(!service.remove("HOST_SELECTOR"));
    assert_eq!(service.reactor().handler_count(), 0);
    assert!(!src.borrow().is_claimed(10));
    assert!(!src.borrow().is_claimed(11));
    assert!(!src.borrow().is_claimed(12));
}

#[test]
fn test_run_returns_when_stopped_or_empty() {
    let (src, _sink, _env) = setup();
    let mut service = ButtonService::new(Reactor::new(src.clone()));
    // nothing registered: the loop has nothing to wait for
    service.run().unwrap();

    let (src, _sink, env) = setup();
    let cfg = button_config(&json!({ "name": "ID_BTN", "pin": 1, "direction": "in" }), 0).unwrap();
    let control = Registry::with_builtin()
        .create("ID_BTN", &env, &cfg)
        .unwrap()
        .unwrap();
    let mut service = ButtonService::new(Reactor::new(src.clone()));
    service.attach(control).unwrap();
    service.reactor().stop_handle().stop();
    service.run().unwrap();
}
