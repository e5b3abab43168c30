use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tablelink_frame::{Frame, FrameConfig, FrameReader, FrameWriter, Message, Setting, Side};
use tablelink_peer::{
    spawn, spawn_local, DeviceState, Dispatcher, DispatcherConfig, PeerError, SimulatorConfig,
    SimulatorHandle, ERROR_NONMATCHING_CHECKSUMS,
};
use tablelink_transport::LinkStream;

fn simulator_config() -> SimulatorConfig {
    SimulatorConfig {
        poll_interval: Duration::from_millis(10),
        min_goal_delay: Duration::from_millis(20),
        max_goal_delay: Duration::from_millis(60),
        seed: Some(2024),
        ..SimulatorConfig::default()
    }
}

fn local_with(state: DeviceState) -> (Dispatcher, SimulatorHandle) {
    spawn_local(
        DispatcherConfig::default(),
        SimulatorConfig {
            initial_state: state,
            ..simulator_config()
        },
    )
    .expect("local link should start")
}

fn local() -> (Dispatcher, SimulatorHandle) {
    local_with(DeviceState::default())
}

#[test]
fn getter_returns_value_with_request_id() {
    let (dispatcher, _simulator) = local_with(DeviceState {
        ai_difficulty: 5,
        ..DeviceState::default()
    });

    let response = dispatcher
        .call("GET; AI DIFFICULTY", "")
        .expect("getter should succeed");
    assert_eq!(response.id, 0);
    assert_eq!(response.values, vec![5]);
}

#[test]
fn out_of_range_air_speed_is_clamped() {
    let (dispatcher, _simulator) = local();

    let ack = dispatcher
        .call("SET; TABLE AIR SPEED", "150")
        .expect("setter should succeed");
    assert!(ack.values.is_empty());

    let response = dispatcher
        .call("GET; TABLE AIR SPEED", "")
        .expect("getter should succeed");
    assert_eq!(response.values, vec![100]);
}

#[test]
fn goals_arrive_only_while_active() {
    let (dispatcher, _simulator) = local();

    thread::sleep(Duration::from_millis(150));
    assert_eq!(dispatcher.poll_unsolicited().expect("poll"), None);

    dispatcher.set_game_active(true).expect("start game");
    let mut goals = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    while goals.len() < 3 && Instant::now() < deadline {
        if let Some(goal) = dispatcher.poll_unsolicited().expect("poll") {
            goals.push(goal);
        } else {
            thread::sleep(Duration::from_millis(5));
        }
    }
    assert_eq!(goals.len(), 3, "expected three goals while active");
    for goal in &goals {
        assert_eq!(goal.id, 100);
        assert!(matches!(goal.side, Side::PlayerOne | Side::Ai));
        assert!((1..=100).contains(&goal.speed));
    }

    dispatcher.set_game_active(false).expect("stop game");
    while dispatcher.poll_unsolicited().expect("drain").is_some() {}
    thread::sleep(Duration::from_millis(200));
    assert_eq!(dispatcher.poll_unsolicited().expect("poll"), None);
}

#[test]
fn ids_wrap_after_ninety_nine() {
    let (dispatcher, _simulator) = local();

    let ids: Vec<u8> = (0..101)
        .map(|_| {
            dispatcher
                .call("GET; AI STATE", "")
                .expect("call should succeed")
                .id
        })
        .collect();

    let expected: Vec<u8> = (0..=99).chain(std::iter::once(0)).collect();
    assert_eq!(ids, expected);
}

#[test]
fn unknown_token_is_protocol_error() {
    let (dispatcher, _simulator) = local();

    match dispatcher.call("INVALID MESSAGE", "") {
        Err(PeerError::Protocol { id, body }) => {
            assert_eq!(id, 0);
            assert_eq!(body, "ERROR! UNRECOGNIZED MESSAGE");
        }
        other => panic!("expected protocol error, got {other:?}"),
    }

    match dispatcher.call("SET; AI STATE", "on") {
        Err(PeerError::Protocol { body, .. }) => assert_eq!(body, "ERROR! INVALID ARGUMENT"),
        other => panic!("expected protocol error, got {other:?}"),
    }
}

#[test]
fn concurrent_calls_each_get_their_own_response() {
    let (dispatcher, _simulator) = local();
    let dispatcher = Arc::new(dispatcher);

    let workers: Vec<_> = (0..8)
        .map(|worker| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                (0..10)
                    .map(|_| {
                        let response = dispatcher
                            .call("GET; LIGHTING VALUE", "")
                            .expect("concurrent call should succeed");
                        assert_eq!(response.values, vec![0], "worker {worker}");
                        response.id
                    })
                    .collect::<Vec<u8>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for worker in workers {
        for id in worker.join().expect("worker should finish") {
            assert!(seen.insert(id), "id {id} answered twice");
        }
    }
    assert_eq!(seen.len(), 80);
}

#[test]
fn corrupted_request_is_answered_with_checksum_error() {
    let (controller, device) = LinkStream::pair().expect("pair");
    let _simulator = spawn(device, simulator_config()).expect("simulator should start");

    let mut writer = FrameWriter::new(controller.try_clone().expect("clone"));
    let mut reader = FrameReader::with_config_link(
        controller,
        FrameConfig {
            read_timeout: Some(Duration::from_secs(2)),
            ..FrameConfig::default()
        },
    )
    .expect("reader");

    let mut frame = Frame::from(Message::new(17, "GET; AI STATE").expect("message"));
    frame.checksum = (frame.checksum + 1) % 100;
    assert!(!frame.validate());
    writer.write_frame(&frame).expect("write");

    let reply = reader.read_frame().expect("reply");
    assert_eq!(reply.id, 17);
    assert_eq!(reply.body, ERROR_NONMATCHING_CHECKSUMS);
    assert!(reply.validate());
}

#[test]
fn every_setting_roundtrips_through_the_link() {
    let (dispatcher, simulator) = local();

    for setting in Setting::ALL {
        if setting == Setting::GameState {
            continue;
        }
        let target = *setting.range().end();
        dispatcher.set(setting, target).expect("set");
        assert_eq!(dispatcher.get(setting).expect("get"), target, "{setting:?}");
    }

    let state = simulator.stop().expect("simulator should stop cleanly");
    assert_eq!(state.lighting, 0x00FF_FFFF);
    assert!(state.ai_active);
}

#[test]
fn stopped_simulator_disconnects_callers() {
    let (dispatcher, simulator) = local();
    simulator.stop().expect("stop");

    let err = dispatcher
        .call("GET; AI STATE", "")
        .expect_err("call should fail after the device is gone");
    assert!(matches!(err, PeerError::Disconnected(_)), "{err:?}");
}
