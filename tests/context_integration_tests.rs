//! Context lifecycle tests against the simulated driver

use liblorcon2::native::sim::SimDriver;
use liblorcon2::{
    find_driver, list_drivers, Context, LorconBackend, LorconError, MacAddr, Mode, SimulatedLorcon,
};
use std::sync::Arc;

/// Beacon with BSSID 00:21:21:21:21:21
const BEACON: [u8; 61] = [
    0x80, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x21, 0x21, 0x21, 0x21,
    0x21, 0x00, 0x21, 0x21, 0x21, 0x21, 0x21, 0x90, 0x83, 0x50, 0x8c, 0xf4, 0x38, 0x23, 0x00,
    0x00, 0x00, 0x64, 0x00, 0x11, 0x04, 0x00, 0x04, 0x58, 0x58, 0x58, 0x58, 0x01, 0x08, 0x82,
    0x84, 0x8b, 0x96, 0x24, 0x30, 0x48, 0x6c, 0x03, 0x01, 0x01, 0x32, 0x04, 0x0c, 0x12, 0x18,
    0x60,
];

fn sim() -> SimulatedLorcon {
    SimulatedLorcon::builder()
        .driver("mac80211", "Linux mac80211 VAP creation")
        .with_driver(SimDriver::new("rtfile", "Pcap file replay").injection(false))
        .interface("wlan0mon", "mac80211")
        .interface("wlan1", "mac80211")
        .interface("capture0", "rtfile")
        .max_frame_len(256)
        .build()
}

fn context(sim: &SimulatedLorcon, interface: &str) -> Context {
    let backend: Arc<dyn LorconBackend> = Arc::new(sim.clone());
    Context::new(backend, interface).unwrap()
}

#[test]
fn test_construct_starts_closed() {
    let sim = sim();
    for name in ["wlan0mon", "wlan1", "not-a-real-interface", "x"] {
        let ctx = context(&sim, name);
        assert_eq!(ctx.mode(), Mode::Closed);
        assert!(!ctx.is_open());
    }
    assert_eq!(sim.live_handles(), 0);
}

#[test]
fn test_injection_monitor_scenario() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");

    ctx.open_injection_monitor().unwrap();
    assert_eq!(ctx.mode(), Mode::MonitorInjection);

    ctx.set_channel(1).unwrap();
    assert_eq!(ctx.channel().unwrap(), 1);
    assert_eq!(ctx.configured_channel(), Some(1));

    let sent = ctx.send_bytes(&BEACON).unwrap();
    assert!(sent <= BEACON.len());

    let frames = sim.sent_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].bytes, BEACON.to_vec());
    assert_eq!(ctx.driver_name().unwrap(), "mac80211");
}

#[test]
fn test_operations_on_closed_context() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");

    assert!(matches!(ctx.send_bytes(&BEACON), Err(LorconError::NotOpen { .. })));
    assert!(matches!(ctx.set_channel(6), Err(LorconError::NotOpen { .. })));
    assert!(matches!(ctx.channel(), Err(LorconError::NotOpen { .. })));
    assert!(matches!(ctx.driver_name(), Err(LorconError::NotOpen { .. })));
    assert!(matches!(
        ctx.set_virtual_access_point("wlan0vap"),
        Err(LorconError::NotOpen { .. })
    ));
    assert!(matches!(ctx.hardware_address(), Err(LorconError::NotOpen { .. })));
    assert!(matches!(ctx.capture_interface(), Err(LorconError::NotOpen { .. })));
    assert_eq!(ctx.last_error(), None);
    assert!(sim.sent_frames().is_empty());
}

#[test]
fn test_double_open_is_rejected() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");

    ctx.open_monitor().unwrap();
    match ctx.open_monitor() {
        Err(LorconError::AlreadyOpen { mode, .. }) => assert_eq!(mode, Mode::Monitor),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(ctx.open_injection(), Err(LorconError::AlreadyOpen { .. })));
    assert_eq!(sim.live_handles(), 1);
}

#[test]
fn test_close_is_idempotent() {
    let sim = sim();
    let mut never_opened = context(&sim, "wlan1");
    never_opened.close();
    never_opened.close();

    let mut ctx = context(&sim, "wlan0mon");
    ctx.open_injection().unwrap();
    assert!(sim.is_claimed("wlan0mon"));

    ctx.close();
    ctx.close();
    assert_eq!(ctx.mode(), Mode::Closed);
    assert!(!sim.is_claimed("wlan0mon"));
    assert_eq!(sim.live_handles(), 0);

    // Reopening after close is allowed
    ctx.open_monitor().unwrap();
    assert_eq!(ctx.mode(), Mode::Monitor);
}

#[test]
fn test_drop_releases_handle() {
    let sim = sim();
    {
        let mut ctx = context(&sim, "wlan0mon");
        ctx.open_injection_monitor().unwrap();
        assert_eq!(sim.live_handles(), 1);
    }
    assert_eq!(sim.live_handles(), 0);
    assert!(!sim.is_claimed("wlan0mon"));
}

#[test]
fn test_failed_open_releases_handle() {
    let sim = sim();

    let mut missing = context(&sim, "wlan9");
    let backend: Arc<dyn LorconBackend> = Arc::new(sim.clone());
    let mut explicit = Context::builder(backend, "wlan9").driver("mac80211").build().unwrap();
    assert!(matches!(missing.open_monitor(), Err(LorconError::Device { .. })));
    assert!(matches!(explicit.open_monitor(), Err(LorconError::Device { .. })));

    let mut passive = context(&sim, "capture0");
    assert!(matches!(passive.open_injection(), Err(LorconError::Device { .. })));
    assert_eq!(passive.mode(), Mode::Closed);

    assert_eq!(sim.live_handles(), 0);

    // Same context can still open in a mode the driver supports
    passive.open_monitor().unwrap();
    assert_eq!(sim.live_handles(), 1);
}

#[test]
fn test_interface_claimed_by_another_context() {
    let sim = sim();
    let mut first = context(&sim, "wlan0mon");
    let mut second = context(&sim, "wlan0mon");

    first.open_monitor().unwrap();
    match second.open_monitor() {
        Err(LorconError::Device { message, .. }) => assert!(message.contains("busy")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(sim.live_handles(), 1);

    first.close();
    second.open_monitor().unwrap();
}

#[test]
fn test_send_requires_injection_mode() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");
    ctx.open_monitor().unwrap();

    assert!(matches!(
        ctx.send_bytes(&BEACON),
        Err(LorconError::IncompatibleMode { mode: Mode::Monitor, .. })
    ));
}

#[test]
fn test_oversized_frame_is_transmit_error() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");
    ctx.open_injection().unwrap();

    let frame = vec![0u8; 300];
    match ctx.send_bytes(&frame) {
        Err(LorconError::Transmit { len, message, .. }) => {
            assert_eq!(len, 300);
            assert!(message.contains("exceeds"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(ctx.last_error().is_some());
}

#[test]
fn test_rejected_channel() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");
    ctx.open_monitor().unwrap();

    ctx.set_channel(11).unwrap();
    assert!(matches!(ctx.set_channel(15), Err(LorconError::Channel { channel: 15, .. })));
    assert_eq!(ctx.channel().unwrap(), 11);
    assert_eq!(ctx.configured_channel(), Some(11));
}

#[test]
fn test_timeout_round_trip() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");
    assert_eq!(ctx.timeout().unwrap(), None);

    for t in [0_i64, 1, 100, 123, 5_000, i32::MAX as i64] {
        ctx.set_timeout(t).unwrap();
        assert_eq!(ctx.timeout().unwrap(), Some(t));
    }
    assert!(matches!(
        ctx.set_timeout(i32::MAX as i64 + 1),
        Err(LorconError::InvalidArgument(_))
    ));

    ctx.open_monitor().unwrap();
    assert_eq!(ctx.timeout().unwrap(), Some(i32::MAX as i64));
    ctx.set_timeout(250).unwrap();
    assert_eq!(ctx.timeout().unwrap(), Some(250));

    assert!(matches!(ctx.set_timeout(-1), Err(LorconError::InvalidArgument(_))));
    assert_eq!(ctx.timeout().unwrap(), Some(250));
}

#[test]
fn test_open_reads_default_timeout_from_handle() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");
    ctx.open_monitor().unwrap();
    assert_eq!(ctx.timeout().unwrap(), Some(100));

    let backend: Arc<dyn LorconBackend> = Arc::new(sim.clone());
    let mut configured = Context::builder(backend, "wlan1").timeout(40).build().unwrap();
    configured.open_monitor().unwrap();
    assert_eq!(configured.timeout().unwrap(), Some(40));
}

#[test]
fn test_interface_with_nul_is_invalid_argument() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0\0mon");

    assert!(matches!(ctx.open_injection(), Err(LorconError::InvalidArgument(_))));
    assert_eq!(ctx.mode(), Mode::Closed);
    assert_eq!(sim.live_handles(), 0);
}

#[test]
fn test_vap_round_trip() {
    let sim = sim();
    let mut ctx = context(&sim, "wlan0mon");
    ctx.open_injection_monitor().unwrap();

    for vap in ["wlan0", "wlan0vap", "mon1"] {
        ctx.set_virtual_access_point(vap).unwrap();
        assert_eq!(ctx.virtual_access_point().as_deref(), Some(vap));
    }
    assert_eq!(ctx.capture_interface().unwrap(), "mon1");
    assert!(matches!(
        ctx.set_virtual_access_point(""),
        Err(LorconError::InvalidArgument(_))
    ));
}

#[test]
fn test_vap_name_kept_by_any_driver() {
    let sim = sim();
    let mut ctx = context(&sim, "capture0");
    ctx.open_monitor().unwrap();
    assert_eq!(ctx.virtual_access_point(), None);

    ctx.set_virtual_access_point("capvap").unwrap();
    assert_eq!(ctx.virtual_access_point().as_deref(), Some("capvap"));
}

#[test]
fn test_vap_from_builder_applied_on_open() {
    let sim = sim();
    let backend: Arc<dyn LorconBackend> = Arc::new(sim.clone());
    let mut ctx = Context::builder(backend, "wlan0mon").vap("wlan0vap").build().unwrap();

    assert_eq!(ctx.virtual_access_point().as_deref(), Some("wlan0vap"));
    ctx.open_injection_monitor().unwrap();
    assert_eq!(ctx.capture_interface().unwrap(), "wlan0vap");
}

#[test]
fn test_hardware_address() {
    let sim = SimulatedLorcon::builder()
        .driver("mac80211", "Linux mac80211 VAP creation")
        .interface("wlan0mon", "mac80211")
        .hwmac([0x00, 0x21, 0x21, 0x21, 0x21, 0x21])
        .build();
    let mut ctx = context(&sim, "wlan0mon");
    ctx.open_monitor().unwrap();

    assert_eq!(ctx.hardware_address().unwrap().to_string(), "00:21:21:21:21:21");

    let mac: MacAddr = "02:11:22:33:44:55".parse().unwrap();
    ctx.set_hardware_address(mac).unwrap();
    assert_eq!(ctx.hardware_address().unwrap(), mac);
}

#[test]
fn test_driver_queries() {
    let sim = sim();
    assert!(matches!(
        find_driver(&sim, "nonexistent_driver_xyz"),
        Err(LorconError::NotFound(_))
    ));

    let empty = SimulatedLorcon::builder().build();
    assert!(list_drivers(&empty).is_empty());
    assert_eq!(list_drivers(&sim).len(), 2);
}
