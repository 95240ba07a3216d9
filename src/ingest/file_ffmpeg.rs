//! Local file frame source using FFmpeg.
//!
//! Decodes the best video stream to RGB24 in memory and keeps frames according
//! to the configured sampling interval. Timestamps come from the decoded frame
//! position and the stream's average frame rate.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use super::file::{Extraction, FileConfig, FileStats};
use super::sampling::FrameSampler;
use crate::frame::{FrameImage, SampledFrame};

pub(crate) struct FfmpegFileSource {
    config: FileConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    sampler: FrameSampler,
    fps: f64,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&config.path)
            .with_context(|| format!("failed to open file input '{}' with ffmpeg", config.path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let rate = input_stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            f64::from(rate)
        } else {
            0.0
        };
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        let sampler = FrameSampler::new(fps, config.fps_interval);
        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            sampler,
            fps,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: connected to {} (ffmpeg, {:.2} fps, keeping every {} frames)",
            self.config.path,
            self.fps,
            self.sampler.step()
        );
        Ok(())
    }

    pub(crate) fn extract(&mut self) -> Result<Extraction> {
        let mut frames = Vec::new();
        let mut decoded = ffmpeg::frame::Video::empty();
        let Self {
            input,
            stream_index,
            decoder,
            scaler,
            sampler,
            ..
        } = self;

        for (stream, packet) in input.packets() {
            if stream.index() != *stream_index {
                continue;
            }
            decoder
                .send_packet(&packet)
                .context("send packet to ffmpeg decoder")?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                keep_if_sampled(sampler, scaler, &decoded, &mut frames)?;
            }
        }

        decoder.send_eof().context("flush ffmpeg decoder")?;
        while decoder.receive_frame(&mut decoded).is_ok() {
            keep_if_sampled(sampler, scaler, &decoded, &mut frames)?;
        }

        Ok(Extraction {
            frames,
            duration_seconds: self.sampler.duration_seconds(),
            source_fps: self.fps,
        })
    }

    pub(crate) fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.sampler.decoded(),
            frames_sampled: self.sampler.kept(),
            path: self.config.path.clone(),
        }
    }
}

fn keep_if_sampled(
    sampler: &mut FrameSampler,
    scaler: &mut ffmpeg::software::scaling::Context,
    decoded: &ffmpeg::frame::Video,
    frames: &mut Vec<SampledFrame>,
) -> Result<()> {
    let Some((index, timestamp)) = sampler.offer() else {
        return Ok(());
    };
    let mut rgb_frame = ffmpeg::frame::Video::empty();
    scaler
        .run(decoded, &mut rgb_frame)
        .context("scale frame to RGB")?;
    let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
    frames.push(SampledFrame::new(
        index,
        timestamp,
        FrameImage::new(pixels, width, height),
    ));
    Ok(())
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0) as usize;
    let data = frame.data(0);

    if stride == row_bytes {
        let len = row_bytes * height as usize;
        let pixels = data.get(..len).context("ffmpeg frame is truncated")?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
