//! Block mixer: accumulates every active source into one interleaved
//! output block.
//!
//! Two paths share the same cursor math and linear interpolation. The flat
//! path maps source channels onto output channels directly; the 3D path
//! weights every (source channel, listener channel) pairing with the
//! solver's gain table and advances the cursor with a single unified
//! Doppler shift — the pairing whose shift deviates most from 1.0 wins,
//! rather than resampling each output channel separately.

use std::collections::HashMap;

use crate::buffer::{AudioBuffer, BufferId};
use crate::sample::{accumulate, sample_value, Sample, SILENCE};
use crate::source::{Source, SourceId};

/// What one mix pass did besides filling the block: which sources reached
/// their end, which wrapped, which self-healed off a destroyed buffer.
#[derive(Debug, Default)]
pub(crate) struct MixResult {
    pub completed: Vec<SourceId>,
    pub looped: Vec<SourceId>,
    pub detached: Vec<(SourceId, BufferId)>,
}

/// Mix one block of `out.len() / out_channels` frames. Runs under the
/// engine state lock; the caller hands the block to the backend ring
/// afterwards.
pub(crate) fn mix_block(
    sources: &mut HashMap<SourceId, Source>,
    buffers: &HashMap<BufferId, AudioBuffer>,
    out: &mut [Sample],
    out_channels: usize,
    out_sample_rate: u32,
    spatial_ready: bool,
    master_gain: f32,
) -> MixResult {
    let mut result = MixResult::default();
    out.fill(SILENCE);
    if out_channels == 0 || out_sample_rate == 0 {
        return result;
    }
    let frames = out.len() / out_channels;

    for (id, source) in sources.iter_mut() {
        if !source.playing || source.buffer_id == 0 {
            continue;
        }

        let Some(buffer) = buffers.get(&source.buffer_id) else {
            // The buffer was destroyed under us; drop the reference and
            // stop rather than read freed storage.
            log::warn!(
                "source {id}: buffer {} no longer exists, detaching",
                source.buffer_id
            );
            result.detached.push((*id, source.buffer_id));
            source.detach();
            continue;
        };
        if !buffer.is_uploaded() {
            source.playing = false;
            continue;
        }

        let samples = buffer.samples();
        let buf_len = samples.len();
        let src_channels = buffer.channels() as usize;
        let step = source.pitch as f64 * buffer.sample_rate() as f64 / out_sample_rate as f64;

        let use_3d = spatial_ready && source.spatial.enabled() && source.spatial.num_channels() > 0;

        // For the 3D path, snapshot the solver's tables once per block: a
        // flat gain matrix plus the unified Doppler shift.
        let mut pair_gains = Vec::new();
        let mut doppler = 1.0f32;
        if use_3d {
            pair_gains.resize(src_channels * out_channels, 1.0f32);
            for c in 0..src_channels {
                let Some(state) = source.spatial.state(c) else {
                    continue;
                };
                for l in 0..out_channels {
                    let param = state.mix.get(l).copied().unwrap_or_default();
                    pair_gains[c * out_channels + l] = param.gain;
                    if (param.doppler_shift - 1.0).abs() > (doppler - 1.0).abs() {
                        doppler = param.doppler_shift;
                    }
                }
            }
        }

        let gain = source.gain * master_gain;
        let mut pos = source.play_pos;
        let mut wrapped = false;

        for f in 0..frames {
            let mut idx = pos as usize * src_channels;
            if idx + src_channels > buf_len {
                if source.looping {
                    pos = 0.0;
                    idx = 0;
                    wrapped = true;
                } else {
                    source.playing = false;
                    result.completed.push(*id);
                    break;
                }
            }

            // Linear interpolation at the fractional cursor; the final
            // frame clamps its successor to itself.
            let frac = (pos - pos.floor()) as f32;
            let mut v = [0.0f32; 2];
            for c in 0..src_channels {
                let s1 = sample_value(samples[idx + c]);
                let next = idx + src_channels + c;
                let s2 = if next < buf_len {
                    sample_value(samples[next])
                } else {
                    s1
                };
                v[c] = (1.0 - frac) * s1 + frac * s2;
            }

            if src_channels == 2 {
                if let Some(pan) = source.pan {
                    v[0] *= 1.0 - pan;
                    v[1] *= pan;
                }
            }

            if use_3d {
                for l in 0..out_channels {
                    let mut mixed = 0.0f32;
                    for c in 0..src_channels {
                        mixed += v[c] * pair_gains[c * out_channels + l];
                    }
                    accumulate(&mut out[f * out_channels + l], mixed * gain);
                }
                pos += step * doppler as f64;
            } else {
                if src_channels == out_channels {
                    for c in 0..src_channels {
                        accumulate(&mut out[f * out_channels + c], v[c] * gain);
                    }
                } else if src_channels == 1 && out_channels == 2 {
                    accumulate(&mut out[f * 2], v[0] * gain);
                    accumulate(&mut out[f * 2 + 1], v[0] * gain);
                } else if src_channels == 2 && out_channels == 1 {
                    accumulate(&mut out[f], 0.5 * (v[0] + v[1]) * gain);
                }
                pos += step;
            }
        }

        if wrapped {
            result.looped.push(*id);
        }
        source.play_pos = pos;
    }

    result
}
