//! Engine-level lifecycle tests against the silent backend: real mix
//! thread, real wall-clock pacing, no audio device required.

use std::thread::sleep;
use std::time::{Duration, Instant};

use aurica::{AuricaEngine, AuricaEvent, EngineDesc};

fn sine_mono(frequency: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
    let frames = (seconds * sample_rate as f32) as usize;
    (0..frames)
        .map(|i| (i as f32 * frequency * std::f32::consts::TAU / sample_rate as f32).sin())
        .collect()
}

#[test]
fn short_source_plays_to_completion() {
    let mut engine = AuricaEngine::new(false);
    engine.startup(EngineDesc::new().sample_rate(44100)).unwrap();

    // A 440 Hz tone at a 25 kHz buffer rate, mixed up to the output rate.
    let buffer = engine.create_buffer();
    assert!(engine.set_buffer_data_32f(buffer, &sine_mono(440.0, 0.1, 25000), 1, 25000));

    let source = engine.create_source();
    assert!(engine.attach_buffer_to_source(source, buffer));
    assert!(engine.set_source_gain(source, 0.1));
    assert!(engine.play_source(source));
    assert_eq!(engine.is_source_playing(source), Some(true));

    // 0.1 s of audio; give the tick loop ample slack.
    let deadline = std::time::Instant::now() + Duration::from_secs(3);
    while engine.is_source_playing(source) == Some(true) && std::time::Instant::now() < deadline {
        sleep(Duration::from_millis(20));
    }
    assert_eq!(engine.is_source_playing(source), Some(false));

    engine.shutdown();
}

#[test]
fn looping_source_keeps_playing() {
    let mut engine = AuricaEngine::new(false);
    engine.startup(EngineDesc::default()).unwrap();

    let buffer = engine.create_buffer();
    assert!(engine.set_buffer_data_32f(buffer, &sine_mono(220.0, 0.05, 48000), 1, 48000));
    let source = engine.create_source();
    assert!(engine.attach_buffer_to_source(source, buffer));
    assert!(engine.set_source_looping(source, true));
    assert!(engine.play_source(source));

    sleep(Duration::from_millis(300));
    assert_eq!(engine.is_source_playing(source), Some(true));

    engine.shutdown();
}

#[test]
fn destroying_a_buffer_stops_its_source() {
    let mut engine = AuricaEngine::new(false);
    engine.startup(EngineDesc::default()).unwrap();

    let buffer = engine.create_buffer();
    assert!(engine.set_buffer_data_32f(buffer, &sine_mono(220.0, 0.05, 48000), 1, 48000));
    let source = engine.create_source();
    assert!(engine.attach_buffer_to_source(source, buffer));
    assert!(engine.set_source_looping(source, true));
    assert!(engine.play_source(source));
    sleep(Duration::from_millis(100));
    assert_eq!(engine.is_source_playing(source), Some(true));

    // Pull the buffer out from under the playing source; the next tick
    // detaches and stops it instead of reading destroyed storage.
    assert!(engine.destroy_buffer(buffer));
    let deadline = std::time::Instant::now() + Duration::from_secs(3);
    while engine.is_source_playing(source) == Some(true) && std::time::Instant::now() < deadline {
        sleep(Duration::from_millis(20));
    }
    assert_eq!(engine.is_source_playing(source), Some(false));

    engine.shutdown();
}

#[test]
fn positional_scene_tracks_an_approaching_source() {
    use aurica::math::{Mat3, Vec3};

    let mut engine = AuricaEngine::new(false);
    engine.startup(EngineDesc::default()).unwrap();
    assert!(engine.init_3d_scene());

    // Ears straddling the origin.
    assert!(engine.set_listener_3d_state_channel(
        0,
        Mat3::IDENTITY,
        Vec3::new(-0.12, 0.05, -0.05),
        Vec3::ZERO
    ));
    assert!(engine.set_listener_3d_state_channel(
        1,
        Mat3::IDENTITY,
        Vec3::new(0.12, 0.05, -0.05),
        Vec3::ZERO
    ));

    let buffer = engine.create_buffer();
    assert!(engine.set_buffer_data_32f(buffer, &sine_mono(440.0, 0.05, 48000), 1, 48000));
    let source = engine.create_source();
    assert!(engine.attach_buffer_to_source(source, buffer));
    assert!(engine.set_source_looping(source, true));
    assert!(engine.enable_source_3d_audio(source, true));
    assert!(engine.set_source_speed_of_sound(source, 343.0));
    assert!(engine.set_source_falloff(source, 1.0, 0.2, 0.08));

    // Walk the source toward the listener and let the solver run.
    let velocity = Vec3::new(-6.0, -1.5, 0.0);
    let mut position = Vec3::new(7.0, 5.5, -3.2);
    assert!(engine.play_source(source));
    for _ in 0..10 {
        assert!(engine.set_source_3d_state_channel(
            source,
            0,
            Mat3::IDENTITY,
            position,
            velocity
        ));
        position += velocity * 0.02;
        sleep(Duration::from_millis(20));
    }
    assert_eq!(engine.is_source_playing(source), Some(true));

    engine.shutdown();
}

#[test]
fn completion_events_are_delivered() {
    let mut engine = AuricaEngine::new(false);
    engine.startup(EngineDesc::default()).unwrap();
    let buffer = engine.create_buffer();
    assert!(engine.set_buffer_data_32f(buffer, &sine_mono(440.0, 0.05, 48000), 1, 48000));
    let source = engine.create_source();
    assert!(engine.attach_buffer_to_source(source, buffer));
    assert!(engine.play_source(source));

    let deadline = Instant::now() + Duration::from_secs(3);
    let mut events = Vec::new();
    while Instant::now() < deadline {
        events.extend(engine.poll_events());
        if events.contains(&AuricaEvent::SourceCompleted { source }) {
            break;
        }
        sleep(Duration::from_millis(20));
    }
    assert!(events.contains(&AuricaEvent::SourceCompleted { source }));
    engine.shutdown();
}

#[test]
fn engine_survives_shutdown_with_live_sources() {
    let mut engine = AuricaEngine::new(false);
    engine.startup(EngineDesc::default()).unwrap();
    let buffer = engine.create_buffer();
    assert!(engine.set_buffer_data_16s(buffer, &vec![0i16; 9600], 2, 48000));
    let source = engine.create_source();
    assert!(engine.attach_buffer_to_source(source, buffer));
    assert!(engine.set_source_looping(source, true));
    assert!(engine.play_source(source));
    sleep(Duration::from_millis(50));
    engine.shutdown();

    // State survives; a second startup picks the sources back up.
    engine.startup(EngineDesc::default()).unwrap();
    assert_eq!(engine.is_source_playing(source), Some(true));
    engine.shutdown();
}
