//! End-to-end polling scenarios against a scripted firmware.

use std::time::Duration;

use mbb_skr::SkrModule;
use mbb_skr::error::{CallFailure, FirmwareError};
use mbb_skr::firmware::{EV20_METHOD, ObjectType};

use crate::log_capture;
use crate::mock_fw::*;

fn load(fw: &ScriptedFirmware) -> SkrModule<MockHost> {
    SkrModule::on_load(&fast_config(), fw.clone(), MockHost::new()).unwrap()
}

#[test]
fn valid_buffer_is_published_verbatim() {
    let fw = ScriptedFirmware::always(Reply::Buffer(key_buffer(0x01)));
    let module = load(&fw);

    assert!(eventually(|| module.snapshot()[0] == 0x01));
    let snap = module.snapshot();
    assert_eq!(snap.to_vec(), key_buffer(0x01));
    assert!(fw.methods().iter().all(|m| m == EV20_METHOD));
    module.on_unload();
}

#[test]
fn failure_after_success_clears_the_snapshot() {
    let fw = ScriptedFirmware::always(Reply::Fail(CallFailure::Exception))
        .queue([Reply::Buffer(key_buffer(0x01))]);
    let module = load(&fw);

    assert!(eventually(|| fw.calls() >= 3));
    assert_eq!(module.snapshot(), [0u8; 32]);
    let stats = module.stats();
    assert_eq!(stats.successes, 1);
    assert!(stats.failures >= 2);
    assert_eq!(
        stats.last_error,
        Some(FirmwareError::CallFailed(CallFailure::Exception))
    );
    module.on_unload();
}

#[test]
fn non_buffer_object_clears_the_snapshot() {
    let fw = ScriptedFirmware::always(Reply::Integer(0x1f))
        .queue([Reply::Buffer(key_buffer(0x02))]);
    let module = load(&fw);

    assert!(eventually(|| module.stats().failures >= 1));
    assert_eq!(module.snapshot(), [0u8; 32]);
    assert_eq!(
        module.stats().last_error,
        Some(FirmwareError::WrongType(ObjectType::Integer))
    );
    module.on_unload();
}

#[test]
fn short_and_long_buffers_are_rejected() {
    for len in [16usize, 33, 64] {
        let fw = ScriptedFirmware::always(Reply::Buffer(vec![0xFF; len]));
        let module = load(&fw);
        assert!(eventually(|| module.stats().failures >= 2));
        assert_eq!(module.snapshot(), [0u8; 32], "len {len}");
        assert_eq!(module.stats().last_error, Some(FirmwareError::WrongSize(len)));
        module.on_unload();
    }
}

#[test]
fn wrong_size_is_logged_as_a_warning() {
    log_capture::install();
    let fw = ScriptedFirmware::always(Reply::Buffer(vec![0xFF; 17]));
    let config = mbb_skr::config::SkrConfig {
        warn_per_sec: 100,
        ..fast_config()
    };
    let module = SkrModule::on_load(&config, fw, MockHost::new()).unwrap();

    assert!(eventually(|| log_capture::warned("wrong response size (17 bytes)")));
    assert_eq!(module.snapshot(), [0u8; 32]);
    module.on_unload();
}

#[test]
fn loop_keeps_running_through_persistent_failure() {
    let fw = ScriptedFirmware::always(Reply::Buffer(key_buffer(0x03)))
        .queue(std::iter::repeat_n(Reply::Null, 30));
    let module = load(&fw);

    assert!(eventually(|| module.snapshot()[0] == 0x03));
    let stats = module.stats();
    assert!(stats.failures >= 30);
    assert_eq!(stats.consecutive_failures, 0);
    module.on_unload();
}

#[test]
fn readers_never_observe_a_torn_snapshot() {
    let fw = ScriptedFirmware::cycling(vec![
        Reply::Buffer(vec![0xAA; 32]),
        Reply::Buffer(vec![0x55; 32]),
        Reply::Fail(CallFailure::Unavailable),
    ]);
    let module = load(&fw);
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let reader = module.reader();
            std::thread::spawn(move || {
                let deadline = std::time::Instant::now() + Duration::from_millis(200);
                while std::time::Instant::now() < deadline {
                    let snap = reader.snapshot();
                    assert!(snap.iter().all(|b| *b == snap[0]), "torn: {snap:02x?}");
                    assert!(matches!(snap[0], 0x00 | 0xAA | 0x55));
                }
            })
        })
        .collect();
    for r in readers {
        r.join().unwrap();
    }
    module.on_unload();
}

#[test]
fn reader_outlives_unload_and_reports_last_state() {
    let fw = ScriptedFirmware::always(Reply::Buffer(key_buffer(0x04)));
    let module = load(&fw);
    let reader = module.reader();
    assert!(eventually(|| reader.snapshot()[0] == 0x04));
    module.on_unload();

    let mut out = [0u8; 32];
    assert_eq!(reader.read_into(&mut out), Ok(32));
    assert_eq!(out.to_vec(), key_buffer(0x04));
}

#[cfg(feature = "configurable-interval")]
#[test]
fn interval_attribute_reschedules_the_worker() {
    let fw = ScriptedFirmware::always(Reply::Null);
    let module = load(&fw);
    let interval = module.interval_attribute();
    assert_eq!(interval.show(), "10\n");

    assert!(interval.store("60000").is_ok());
    // one tick may still be pending on the old 10 ms schedule
    std::thread::sleep(Duration::from_millis(50));
    let calls = fw.calls();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(fw.calls(), calls);

    assert!(interval.store("5").is_err());
    assert_eq!(interval.show(), "60000\n");
    module.on_unload();
}

#[test]
fn first_tick_lands_within_one_interval() {
    let fw = ScriptedFirmware::always(Reply::Null);
    let config = mbb_skr::config::SkrConfig {
        first_tick: mbb_skr::config::FirstTick::AfterInterval,
        ..fast_config()
    };
    let module = SkrModule::on_load(&config, fw.clone(), MockHost::new()).unwrap();
    assert!(eventually(|| fw.calls() >= 1));
    assert!(eventually(|| fw.calls() >= 5), "ticks stopped");
    module.on_unload();
}

#[test]
fn identical_polls_keep_the_snapshot_stable() {
    let fw = ScriptedFirmware::always(Reply::Buffer(key_buffer(0x07)));
    let module = load(&fw);
    assert!(eventually(|| module.snapshot()[0] == 0x07));
    let first = module.snapshot();
    assert!(eventually(|| module.stats().successes >= 5));
    assert_eq!(module.snapshot(), first);
    module.on_unload();
}

#[test]
fn no_cache_mutation_after_unload() {
    let fw = ScriptedFirmware::cycling(vec![
        Reply::Buffer(key_buffer(0x08)),
        Reply::Fail(CallFailure::Exception),
    ]);
    let module = load(&fw);
    let reader = module.reader();
    assert!(eventually(|| module.cache_mutations() >= 4));

    module.on_unload();
    let settled = reader.mutations();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(reader.mutations(), settled);
}
