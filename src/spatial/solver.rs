//! Positional scene solver.
//!
//! Once per tick, before the mixer runs, every 3D-enabled source gets a
//! fresh `(gain, doppler_shift)` table per source channel, one entry per
//! listener channel. The mixer consumes the tables without recomputing any
//! geometry.

use std::collections::HashMap;

use crate::listener::Listener;
use crate::math::lerp;
use crate::source::{Source, SourceId};
use crate::spatial::MixParam;

const DOPPLER_MIN: f32 = 0.25;
const DOPPLER_MAX: f32 = 4.0;

/// Fill the per-pair parameter tables for all 3D-enabled sources against
/// the current listener.
pub(crate) fn update_scene(listener: &Listener, sources: &mut HashMap<SourceId, Source>) {
    let listener_channels = listener.spatial.num_channels();

    for source in sources.values_mut() {
        if !source.spatial.enabled() {
            continue;
        }
        let source_channels = source.spatial.num_channels();

        // Size every table up front so stale pairings never leak between
        // ticks, even for pairs the distance guard skips below.
        for state in source.spatial.states_mut() {
            state.mix.resize(listener_channels, MixParam::default());
        }

        for ch_l in 0..listener_channels {
            let Some(listener_state) = listener.spatial.state(ch_l) else {
                continue;
            };
            let listener_pos = listener_state.position;
            let listener_vel = listener_state.velocity;
            let right_l = listener.spatial.dir_right(ch_l);
            let forward_l = listener.spatial.dir_forward(ch_l);

            for ch_s in 0..source_channels {
                let forward_s = source.spatial.dir_forward(ch_s);
                let Some(state_s) = source.spatial.state_mut(ch_s) else {
                    continue;
                };

                let dir = state_s.position - listener_pos;
                if dir.length_squared() < 1e-9 {
                    continue; // coincident; keep the previous params
                }
                let dir_ls = dir.normalize();
                let dir_sl = -dir_ls;

                // Radial velocities along the source-to-listener line.
                let v_listener = listener_vel.dot(dir_sl);
                let v_source = state_s.velocity.dot(dir_sl);

                let c = source.speed_of_sound;
                let doppler_shift = if c > 0.0 {
                    let shift = ((c + v_listener) / (c - v_source)).clamp(DOPPLER_MIN, DOPPLER_MAX);
                    if shift.is_finite() {
                        shift
                    } else {
                        1.0
                    }
                } else {
                    1.0
                };

                let dist = dir.length().max(1e-6);
                let distance_gain = source.falloff.distance_gain(dist);

                // Listener ear panning from the angle to the source.
                let pan = right_l.dot(dir_ls);
                let pan_weight = if listener_channels >= 2 {
                    match ch_l {
                        0 => 0.5 * (1.0 - pan),
                        1 => 0.5 * (1.0 + pan),
                        _ => 1.0,
                    }
                } else {
                    1.0
                };

                let cos_angle = forward_s.dot(dir_sl);
                let directivity_weight = source.directivity.weight(cos_angle);

                // Sounds behind the listener are muffled toward the combined
                // rear attenuation of source and listener.
                let frontness = forward_l.dot(dir_ls);
                let t = (0.5 * (1.0 + frontness)).clamp(0.0, 1.0);
                let rear_weight = lerp(
                    source.directivity.rear_attenuation * listener.rear_attenuation,
                    1.0,
                    t.powf(0.7),
                );

                let gain = (distance_gain * pan_weight * directivity_weight * rear_weight)
                    .clamp(0.0, 1.0);
                state_s.mix[ch_l] = MixParam {
                    gain,
                    doppler_shift,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DirectivityPattern;
    use glam::{Mat3, Vec3};
    use std::f32::consts::PI;

    fn scene_with_source(position: Vec3) -> (Listener, HashMap<SourceId, Source>) {
        let mut listener = Listener::default();
        listener.spatial.set_num_channels(2);
        listener
            .spatial
            .set_channel_state(0, Mat3::IDENTITY, Vec3::new(-0.12, 0.05, -0.05), Vec3::ZERO);
        listener
            .spatial
            .set_channel_state(1, Mat3::IDENTITY, Vec3::new(0.12, 0.05, -0.05), Vec3::ZERO);

        let mut source = Source::new();
        source.spatial.set_enabled(true);
        source.spatial.set_num_channels(1);
        source
            .spatial
            .set_channel_state(0, Mat3::IDENTITY, position, Vec3::ZERO);

        let mut sources = HashMap::new();
        sources.insert(1, source);
        (listener, sources)
    }

    fn params(sources: &HashMap<SourceId, Source>, ch_s: usize) -> Vec<MixParam> {
        sources[&1].spatial.state(ch_s).unwrap().mix.clone()
    }

    #[test]
    fn stationary_scene_has_unit_doppler() {
        let (listener, mut sources) = scene_with_source(Vec3::new(7.0, 5.5, -3.2));
        sources.get_mut(&1).unwrap().speed_of_sound = 343.0;
        update_scene(&listener, &mut sources);
        for param in params(&sources, 0) {
            assert_eq!(param.doppler_shift, 1.0);
        }
    }

    #[test]
    fn tables_are_sized_to_the_listener() {
        let (listener, mut sources) = scene_with_source(Vec3::new(3.0, 0.0, 0.0));
        update_scene(&listener, &mut sources);
        assert_eq!(params(&sources, 0).len(), 2);
    }

    #[test]
    fn gain_decreases_with_distance() {
        let (listener, mut sources) = scene_with_source(Vec3::new(0.0, 0.0, 5.0));
        update_scene(&listener, &mut sources);
        let near = params(&sources, 0)[0].gain;

        let source = sources.get_mut(&1).unwrap();
        source
            .spatial
            .set_channel_state(0, Mat3::IDENTITY, Vec3::new(0.0, 0.0, 50.0), Vec3::ZERO);
        update_scene(&listener, &mut sources);
        let far = params(&sources, 0)[0].gain;
        assert!(near > far, "near {near} vs far {far}");
    }

    #[test]
    fn approaching_source_raises_pitch_receding_lowers_it() {
        let (listener, mut sources) = scene_with_source(Vec3::new(0.0, 0.0, 20.0));
        {
            let source = sources.get_mut(&1).unwrap();
            source.speed_of_sound = 343.0;
            // Moving toward the origin listener.
            source.spatial.set_channel_state(
                0,
                Mat3::IDENTITY,
                Vec3::new(0.0, 0.0, 20.0),
                Vec3::new(0.0, 0.0, -10.0),
            );
        }
        update_scene(&listener, &mut sources);
        assert!(params(&sources, 0)[0].doppler_shift > 1.0);

        {
            let source = sources.get_mut(&1).unwrap();
            source.spatial.set_channel_state(
                0,
                Mat3::IDENTITY,
                Vec3::new(0.0, 0.0, 20.0),
                Vec3::new(0.0, 0.0, 10.0),
            );
        }
        update_scene(&listener, &mut sources);
        assert!(params(&sources, 0)[0].doppler_shift < 1.0);
    }

    #[test]
    fn doppler_disabled_without_speed_of_sound() {
        let (listener, mut sources) = scene_with_source(Vec3::new(0.0, 0.0, 20.0));
        sources.get_mut(&1).unwrap().spatial.set_channel_state(
            0,
            Mat3::IDENTITY,
            Vec3::new(0.0, 0.0, 20.0),
            Vec3::new(0.0, 0.0, -100.0),
        );
        update_scene(&listener, &mut sources);
        assert_eq!(params(&sources, 0)[0].doppler_shift, 1.0);
    }

    #[test]
    fn doppler_shift_is_clamped() {
        let (listener, mut sources) = scene_with_source(Vec3::new(0.0, 0.0, 20.0));
        {
            let source = sources.get_mut(&1).unwrap();
            source.speed_of_sound = 10.0;
            // Source closing at nearly the speed of sound.
            source.spatial.set_channel_state(
                0,
                Mat3::IDENTITY,
                Vec3::new(0.0, 0.0, 20.0),
                Vec3::new(0.0, 0.0, -9.9),
            );
        }
        update_scene(&listener, &mut sources);
        assert_eq!(params(&sources, 0)[0].doppler_shift, DOPPLER_MAX);
    }

    #[test]
    fn source_on_the_right_favors_the_right_ear() {
        // Default convention is X-left, so the right ear looks down -X.
        let (listener, mut sources) = scene_with_source(Vec3::new(-5.0, 0.0, 0.0));
        update_scene(&listener, &mut sources);
        let table = params(&sources, 0);
        assert!(
            table[1].gain > table[0].gain,
            "right {} vs left {}",
            table[1].gain,
            table[0].gain
        );
    }

    #[test]
    fn rotating_listener_sweeps_the_pan() {
        // A listener spinning about +Y in front of a fixed source should
        // trade gain between the ears as the source crosses sides.
        let (mut listener, mut sources) = scene_with_source(Vec3::new(0.0, 0.0, 2.0));
        let mut left_gains = Vec::new();
        for step in 0..8 {
            let angle = step as f32 * PI / 4.0;
            let rotation = Mat3::from_rotation_y(angle);
            listener
                .spatial
                .set_channel_state(0, rotation, Vec3::new(-0.12, 0.0, 0.0), Vec3::ZERO);
            listener
                .spatial
                .set_channel_state(1, rotation, Vec3::new(0.12, 0.0, 0.0), Vec3::ZERO);
            update_scene(&listener, &mut sources);
            left_gains.push(params(&sources, 0)[0].gain);
        }
        let max = left_gains.iter().cloned().fold(f32::MIN, f32::max);
        let min = left_gains.iter().cloned().fold(f32::MAX, f32::min);
        assert!(max - min > 0.2, "pan did not sweep: {left_gains:?}");
        // One full turn returns to the starting balance.
        assert!((left_gains[0]
            - {
                listener.spatial.set_channel_state(
                    0,
                    Mat3::from_rotation_y(2.0 * PI),
                    Vec3::new(-0.12, 0.0, 0.0),
                    Vec3::ZERO,
                );
                listener.spatial.set_channel_state(
                    1,
                    Mat3::from_rotation_y(2.0 * PI),
                    Vec3::new(0.12, 0.0, 0.0),
                    Vec3::ZERO,
                );
                update_scene(&listener, &mut sources);
                params(&sources, 0)[0].gain
            })
        .abs()
            < 1e-4);
    }

    #[test]
    fn cardioid_source_is_silent_facing_away() {
        let (listener, mut sources) = scene_with_source(Vec3::new(0.0, 0.0, 10.0));
        {
            let source = sources.get_mut(&1).unwrap();
            source.directivity.alpha = 1.0;
            source.directivity.pattern = DirectivityPattern::Cardioid;
            // Default frame is +Z forward; the source sits on +Z and faces
            // +Z, straight away from the origin listener.
            update_scene(&listener, &mut sources);
        }
        for param in params(&sources, 0) {
            assert!(param.gain < 1e-6);
        }

        // Turn it around to face the listener: full pattern weight.
        {
            let source = sources.get_mut(&1).unwrap();
            source.spatial.set_channel_state(
                0,
                Mat3::from_rotation_y(PI),
                Vec3::new(0.0, 0.0, 10.0),
                Vec3::ZERO,
            );
        }
        update_scene(&listener, &mut sources);
        let table = params(&sources, 0);
        assert!(table[0].gain > 0.0);
    }

    #[test]
    fn coincident_pair_keeps_previous_params() {
        let (listener, mut sources) = scene_with_source(Vec3::new(0.0, 0.0, 10.0));
        update_scene(&listener, &mut sources);
        let before = params(&sources, 0);

        sources.get_mut(&1).unwrap().spatial.set_channel_state(
            0,
            Mat3::IDENTITY,
            Vec3::new(-0.12, 0.05, -0.05),
            Vec3::ZERO,
        );
        update_scene(&listener, &mut sources);
        // Left ear pairing is now coincident and skipped; its params are
        // unchanged while the right ear pairing updates.
        assert_eq!(params(&sources, 0)[0], before[0]);
        assert_ne!(params(&sources, 0)[1], before[1]);
    }
}
