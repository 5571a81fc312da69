//! Load / unload ordering, rollback and multi-instance behaviour.

use std::time::Duration;

use mbb_skr::SkrModule;
use mbb_skr::config::{FirstTick, SkrConfig};
use mbb_skr::error::{Error, HostError};

use crate::mock_fw::*;

fn data_group() -> Vec<&'static str> {
    mbb_skr::publish::ATTRIBUTES.iter().map(|a| a.name).collect()
}

#[test]
fn load_creates_node_then_group_and_starts_zeroed() {
    let fw = ScriptedFirmware::always(Reply::Buffer(key_buffer(1)));
    let host = MockHost::new();
    let log = host.log();

    let module = SkrModule::on_load(&SkrConfig::default(), fw.clone(), host).unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            HostCall::CreateNode("mbb_skr".into()),
            HostCall::CreateGroup("mbb_skr".into(), data_group()),
        ]
    );
    // Default policy waits one 500 ms interval before the first tick.
    assert_eq!(module.snapshot(), [0u8; 32]);
    assert_eq!(fw.calls(), 0);
    assert!(module.is_polling());
    module.on_unload();
}

#[test]
fn unload_stops_polling_before_removing_endpoints() {
    let fw = ScriptedFirmware::always(Reply::Buffer(key_buffer(1)));
    let host = MockHost::new();
    let log = host.log();

    let module = SkrModule::on_load(&fast_config(), fw.clone(), host).unwrap();
    assert!(eventually(|| fw.calls() >= 3));
    module.on_unload();

    let calls = fw.calls();
    let log = log.lock().unwrap();
    assert_eq!(
        log[2..],
        [
            HostCall::RemoveGroup("mbb_skr".into()),
            HostCall::RemoveNode("mbb_skr".into()),
        ]
    );
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(fw.calls(), calls, "tick ran after unload returned");
}

#[test]
fn group_failure_removes_node_and_never_polls() {
    let fw = ScriptedFirmware::always(Reply::Buffer(key_buffer(1)));
    let host = MockHost::new().failing_group(HostError::OutOfMemory);
    let log = host.log();

    let err = SkrModule::on_load(&fast_config(), fw.clone(), host).err().unwrap();
    assert_eq!(err, Error::Host(HostError::OutOfMemory));
    assert_eq!(err.errno(), -12);
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            HostCall::CreateNode("mbb_skr".into()),
            HostCall::CreateGroup("mbb_skr".into(), data_group()),
            HostCall::RemoveNode("mbb_skr".into()),
        ]
    );
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(fw.calls(), 0);
}

#[test]
fn duplicate_node_fails_with_eexist() {
    let registry = Registry::default();
    let first = SkrModule::on_load(
        &SkrConfig::default(),
        ScriptedFirmware::always(Reply::Null),
        MockHost::sharing(registry.clone()),
    )
    .unwrap();

    let second = MockHost::sharing(registry.clone());
    let log = second.log();
    let err = SkrModule::on_load(&SkrConfig::default(), ScriptedFirmware::always(Reply::Null), second)
        .err()
        .unwrap();
    assert_eq!(err.errno(), -17);
    // nothing beyond the failed node creation was attempted
    assert_eq!(*log.lock().unwrap(), vec![HostCall::CreateNode("mbb_skr".into())]);

    first.on_unload();
    assert!(registry.lock().unwrap().is_empty());
}

#[test]
fn invalid_config_fails_before_touching_the_host() {
    let host = MockHost::new();
    let log = host.log();
    let config = SkrConfig {
        poll_interval_ms: 0,
        ..SkrConfig::default()
    };
    let err = SkrModule::on_load(&config, ScriptedFirmware::always(Reply::Null), host)
        .err()
        .unwrap();
    assert_eq!(err.errno(), -22);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn independent_instances_keep_separate_snapshots() {
    let registry = Registry::default();
    let mut a_cfg = fast_config();
    a_cfg.node_name = "skr_a".try_into().unwrap();
    let mut b_cfg = fast_config();
    b_cfg.node_name = "skr_b".try_into().unwrap();

    let a = SkrModule::on_load(
        &a_cfg,
        ScriptedFirmware::always(Reply::Buffer(key_buffer(0xA0))),
        MockHost::sharing(registry.clone()),
    )
    .unwrap();
    let b = SkrModule::on_load(
        &b_cfg,
        ScriptedFirmware::always(Reply::Buffer(key_buffer(0xB0))),
        MockHost::sharing(registry.clone()),
    )
    .unwrap();

    assert!(eventually(|| a.snapshot()[0] == 0xA0 && b.snapshot()[0] == 0xB0));
    assert_eq!(registry.lock().unwrap().len(), 2);

    a.on_unload();
    assert!(b.is_polling());
    b.on_unload();
    assert!(registry.lock().unwrap().is_empty());
}

#[test]
fn dropping_the_module_tears_down() {
    let fw = ScriptedFirmware::always(Reply::Null);
    let host = MockHost::new();
    let log = host.log();
    {
        let _module = SkrModule::on_load(&fast_config(), fw.clone(), host).unwrap();
    }
    assert_eq!(log.lock().unwrap().last(), Some(&HostCall::RemoveNode("mbb_skr".into())));
    let calls = fw.calls();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(fw.calls(), calls);
}

#[test]
fn unload_waits_for_an_in_flight_call() {
    let fw = ScriptedFirmware::always(Reply::Buffer(key_buffer(1)))
        .with_delay(Duration::from_millis(150));
    let config = SkrConfig {
        first_tick: FirstTick::Immediate,
        ..SkrConfig::default()
    };
    let module = SkrModule::on_load(&config, fw.clone(), MockHost::new()).unwrap();
    assert!(eventually(|| fw.in_flight()));

    module.on_unload();
    assert!(!fw.in_flight(), "unload returned while the call was running");
    assert_eq!(fw.calls(), 1);
}
