//! # Audio Capture Module
//!
//! Real-time microphone capture via CPAL. Callback data is accumulated
//! into fixed-length sample blocks and handed to the analysis thread over
//! a crossbeam channel; if the analysis loop falls behind, blocks are
//! dropped rather than queued without bound, so the pipeline always works
//! on recent audio.
//!
//! CPAL gives no portable anti-alias filter, so captured blocks arrive at
//! the full device bandwidth. Hosts that decimate aggressively should
//! low-pass upstream (or accept the aliasing the decimator contract
//! documents).

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;
use log::{error, info};

/// Starts capture from the default input device.
///
/// Selects a mono f32 configuration as close as possible to `target_rate`,
/// accumulates callback data into `block_size`-sample blocks, and
/// `try_send`s each block to `sender`.
///
/// Returns the live stream handle (capture stops when it is dropped) and
/// the sample rate actually negotiated, which callers must feed back into
/// their configuration if it differs from the target.
pub fn start_capture(
    sender: Sender<Vec<f32>>,
    target_rate: u32,
    block_size: usize,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no input device available"))?;

    info!("using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported = find_supported_config(configs, target_rate)
        .ok_or_else(|| anyhow!("no suitable mono f32 input format found"))?;

    let rate = target_rate
        .clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
    let config = supported.with_sample_rate(cpal::SampleRate(rate));
    let actual_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    info!("selected sample rate: {actual_rate} Hz, block size: {block_size}");

    let err_fn = |err| error!("audio stream error: {err}");

    // Accumulates callback data until a full block is available.
    let mut pending = Vec::with_capacity(block_size * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);
            while pending.len() >= block_size {
                let block = pending[..block_size].to_vec();
                // Drop the block if the analysis side is behind; stale
                // audio is worse than missing audio here.
                let _ = sender.try_send(block);
                pending.drain(..block_size);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, actual_rate))
}

/// Names of all input devices on the default host, for device listing.
pub fn input_device_names() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for device in host.input_devices()? {
        names.push(device.name()?);
    }
    Ok(names)
}

/// Picks the supported configuration range closest to the target rate,
/// restricted to mono f32.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            min_diff.min(max_diff)
        })
}
