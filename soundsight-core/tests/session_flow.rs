use std::time::Duration;

use soundsight_core::ipc::events::{NavigationEvent, SessionStatus};
use soundsight_core::navigation::catalog;
use soundsight_core::voice::FALLBACK_RESPONSE;
use soundsight_core::{
    HazardPolicy, ListeningState, NavStatus, NavigationStep, RecognizerHandle, Role,
    SessionConfig, SimulatedDetectionSource, SimulatedRecognizer, SoundSightError,
    SoundSightSession, SourceHandle, StepDirection,
};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

fn fast_config() -> SessionConfig {
    SessionConfig {
        frame_interval: Duration::from_millis(5),
        pulse_period: Duration::from_millis(8),
        step_interval: Duration::from_millis(10),
        recognition_delay: Duration::from_millis(20),
        ..SessionConfig::default()
    }
}

fn session(config: SessionConfig) -> SoundSightSession {
    SoundSightSession::new(
        config,
        SourceHandle::new(SimulatedDetectionSource::with_seed(5)),
        RecognizerHandle::new(SimulatedRecognizer::with_seed(5)),
    )
}

async fn recv_with_timeout<T: Clone>(rx: &mut broadcast::Receiver<T>, timeout: Duration) -> T {
    loop {
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Ok(event)) => return event,
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(broadcast::error::RecvError::Closed)) => panic!("channel closed unexpectedly"),
            Err(_) => panic!("timed out waiting for event"),
        }
    }
}

async fn wait_for_status(
    rx: &mut broadcast::Receiver<NavigationEvent>,
    wanted: NavStatus,
) -> NavigationEvent {
    loop {
        let event = recv_with_timeout(rx, Duration::from_secs(2)).await;
        if event.snapshot.status == wanted {
            return event;
        }
    }
}

fn cafe_route() -> Vec<NavigationStep> {
    vec![
        NavigationStep::new("Walk straight for 15 meters", "15m", StepDirection::Straight, &[]),
        NavigationStep::new("Turn right at the door", "2m", StepDirection::Right, &["door frame"]),
        NavigationStep::new("arrived", "0m", StepDirection::Arrived, &[]),
    ]
}

#[tokio::test]
async fn detection_loop_broadcasts_scenes_until_stopped() {
    let session = session(fast_config());
    let mut scenes = session.subscribe_scene();
    assert_eq!(session.status(), SessionStatus::Idle);

    session.start_detection().expect("start detection");
    assert!(matches!(
        session.start_detection(),
        Err(SoundSightError::AlreadyRunning)
    ));

    let mut last_seq = None;
    for _ in 0..5 {
        let event = recv_with_timeout(&mut scenes, Duration::from_secs(2)).await;
        assert_eq!(event.summary.count, event.cues.len() + event.issues.len());
        assert!(event.issues.is_empty());
        for cue in &event.cues {
            assert!((0.2..=1.0).contains(&cue.intensity));
        }
        if let Some(prev) = last_seq {
            assert!(event.seq > prev);
        }
        last_seq = Some(event.seq);
    }

    session.stop_detection().expect("stop detection");
    assert_eq!(session.status(), SessionStatus::Stopped);
    assert!(matches!(
        session.stop_detection(),
        Err(SoundSightError::NotRunning)
    ));
    assert!(session.diagnostics_snapshot().frames_in >= 5);
}

#[tokio::test]
async fn step_driver_walks_route_to_arrived() {
    let session = session(fast_config());
    let mut nav = session.subscribe_navigation();

    let started = session.start_route("Café", cafe_route()).expect("start");
    assert_eq!(started.status, NavStatus::Active(0));

    let at_door = wait_for_status(&mut nav, NavStatus::Active(1)).await;
    assert_eq!(
        at_door.snapshot.current_step.expect("step").hazards,
        vec!["door frame".to_string()]
    );

    let arrived = wait_for_status(&mut nav, NavStatus::Arrived).await;
    assert!(!arrived.snapshot.state.is_active);
    assert!(arrived.snapshot.progress.is_none());

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(session.navigation_snapshot().status, NavStatus::Arrived);
    assert_eq!(session.diagnostics_snapshot().nav_ticks, 2);
}

#[tokio::test]
async fn stop_mid_route_discards_pending_ticks() {
    let session = session(fast_config());
    let mut nav = session.subscribe_navigation();

    session.start_navigation("Nearest Exit").expect("start");
    wait_for_status(&mut nav, NavStatus::Active(1)).await;

    session.stop_navigation();
    wait_for_status(&mut nav, NavStatus::Idle).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    loop {
        match nav.try_recv() {
            Ok(event) => assert_eq!(event.snapshot.status, NavStatus::Idle),
            Err(TryRecvError::Empty) => break,
            Err(e) => panic!("unexpected channel state: {e:?}"),
        }
    }
    assert!(matches!(
        session.current_step(),
        Err(SoundSightError::NoActiveRoute)
    ));
}

#[tokio::test]
async fn unknown_destination_and_empty_route_are_rejected() {
    let session = session(fast_config());
    assert!(matches!(
        session.start_navigation("Rooftop"),
        Err(SoundSightError::UnknownDestination(_))
    ));
    assert!(matches!(
        session.start_route("Nowhere", Vec::new()),
        Err(SoundSightError::EmptyRoute)
    ));
    assert_eq!(session.navigation_snapshot().status, NavStatus::Idle);
}

#[tokio::test]
async fn hold_policy_pauses_on_hazard_until_resumed() {
    let session = session(SessionConfig {
        hazard_policy: HazardPolicy::Hold,
        ..fast_config()
    });
    let mut nav = session.subscribe_navigation();

    session.start_navigation("Café").expect("start");
    let held = wait_for_status(&mut nav, NavStatus::Active(1)).await;
    assert!(held.snapshot.held);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(session.navigation_snapshot().status, NavStatus::Active(1));
    assert!(session.diagnostics_snapshot().nav_ticks_held > 0);

    session.resume_navigation();
    let next = wait_for_status(&mut nav, NavStatus::Active(2)).await;
    assert_eq!(
        next.snapshot.current_step.expect("step").hazards,
        vec!["person ahead".to_string()]
    );
    assert_eq!(catalog::demo_route()[2].hazards, vec!["person ahead"]);
}

#[tokio::test]
async fn manual_advance_without_driver() {
    let session = session(SessionConfig {
        auto_advance: false,
        ..fast_config()
    });
    session.start_route("Café", cafe_route()).expect("start");

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(session.navigation_snapshot().status, NavStatus::Active(0));

    assert_eq!(session.advance_navigation(), NavStatus::Active(1));
    assert_eq!(session.advance_navigation(), NavStatus::Arrived);
    assert_eq!(session.advance_navigation(), NavStatus::Arrived);
}

#[tokio::test]
async fn listening_completes_with_one_exchange() {
    let session = session(fast_config());
    let mut convo = session.subscribe_conversation();

    session.start_listening().expect("listen");
    assert_eq!(session.listening_state(), ListeningState::Listening);
    assert!(matches!(
        session.start_listening(),
        Err(SoundSightError::AlreadyListening)
    ));

    let event = recv_with_timeout(&mut convo, Duration::from_secs(2)).await;
    assert_eq!(event.turns.len(), 2);
    assert_eq!(event.turns[0].role, Role::User);
    assert_eq!(event.turns[1].role, Role::Assistant);
    assert_ne!(event.turns[1].text, FALLBACK_RESPONSE);

    assert_eq!(session.listening_state(), ListeningState::Idle);
    assert_eq!(session.conversation_history().len(), 2);
}

#[tokio::test]
async fn cancelled_listening_never_dispatches() {
    let session = session(fast_config());
    let mut convo = session.subscribe_conversation();

    session.start_listening().expect("listen");
    assert!(session.cancel_listening());
    assert!(!session.cancel_listening());

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(matches!(convo.try_recv(), Err(TryRecvError::Empty)));
    assert!(session.conversation_history().is_empty());
    assert_eq!(session.listening_state(), ListeningState::Idle);
    assert_eq!(session.diagnostics_snapshot().recognitions_discarded, 1);
}

#[tokio::test]
async fn conversation_view_is_bounded_but_history_is_not() {
    let session = session(fast_config());
    for utterance in ["Where is the door?", "gibberish", "Find the stairs", "x", "y"] {
        session.dispatch_voice(utterance);
    }
    assert_eq!(session.conversation_history().len(), 10);
    let view = session.conversation_view();
    assert_eq!(view.len(), 6);
    assert_eq!(view[0].seq, 4);
    assert_eq!(session.last_exchange().expect("exchange").command, "y");
    assert_eq!(session.conversation_history().len(), 10);
}

#[tokio::test]
async fn shutdown_stops_everything() {
    let session = session(fast_config());
    session.start_detection().unwrap();
    session.start_navigation("Elevator").unwrap();
    session.start_listening().unwrap();

    session.shutdown();
    assert!(!session.is_detecting());
    assert_eq!(session.navigation_snapshot().status, NavStatus::Idle);
    assert_eq!(session.listening_state(), ListeningState::Idle);
    session.shutdown();
}
