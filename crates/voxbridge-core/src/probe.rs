//! Byte-level audio format probe.
//!
//! Recovers the sample rate and MIME type of an encoded buffer from its
//! container or frame header when the engine did not declare them reliably.
//! A signature must sit at the start of the buffer (after any ID3v2 tag).
//! WAV, Ogg and FLAC headers are read directly; MPEG, ADTS, MP4 and WebM
//! streams are handed to symphonia's demuxers once their framing checks out.

use crate::audio_format::AudioCodec;
use crate::error::{VoxError, VoxResult};
use std::cmp::Ordering;
use std::io::Cursor;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const MPEG1_RATES: [u32; 3] = [44_100, 48_000, 32_000];
const MPEG2_RATES: [u32; 3] = [22_050, 24_000, 16_000];
const MPEG25_RATES: [u32; 3] = [11_025, 12_000, 8_000];

/// Layer III bit rates in kbps; index 0 is free format
const MPEG1_L3_KBPS: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];
const MPEG2_L3_KBPS: [u32; 15] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160];

/// ADTS sampling frequency indexes above this are reserved
const ADTS_RATE_COUNT: usize = 13;
const ADTS_HEADER_LEN: usize = 7;

const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Output sample rate of every Opus decoder
const OPUS_DECODE_RATE: u32 = 48_000;

/// Format recovered from an audio buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbedFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Detected container or codec
    pub codec: AudioCodec,
}

impl ProbedFormat {
    /// MIME type of the detected codec
    #[must_use]
    pub const fn mime(&self) -> &'static str {
        self.codec.mime_type()
    }
}

/// Probe an encoded buffer for its sample rate and MIME type.
///
/// # Errors
///
/// Returns [`VoxError::UnrecognizedFormat`] when no known signature starts
/// the buffer, or a recognized stream is truncated, malformed or carries an
/// invalid sample rate.
pub fn probe(data: &[u8]) -> VoxResult<ProbedFormat> {
    if data.is_empty() {
        return Err(VoxError::unrecognized_format("buffer is empty"));
    }

    if data.starts_with(b"RIFF") {
        return probe_wav(data);
    }
    if data.starts_with(b"OggS") {
        return probe_ogg(data);
    }

    let offset = id3v2_len(data)?;
    let body = &data[offset..];
    if body.starts_with(b"fLaC") {
        return probe_flac(body);
    }

    let codec = container_signature(body)
        .or_else(|| frame_stream(body))
        .ok_or_else(|| {
            VoxError::unrecognized_format(format!(
                "no known signature in {} bytes (leading bytes {})",
                data.len(),
                hex_prefix(data)
            ))
        })?;
    demux(body, codec)
}

fn probe_wav(data: &[u8]) -> VoxResult<ProbedFormat> {
    if data.get(8..12) != Some(b"WAVE".as_slice()) {
        return Err(VoxError::unrecognized_format("RIFF container is not WAVE"));
    }

    let mut pos = 12;
    while let Some(header) = data.get(pos..pos + 8) {
        let size = read_u32_le(&header[4..8]) as usize;
        if &header[..4] == b"fmt " {
            let rate = data
                .get(pos + 12..pos + 16)
                .map(read_u32_le)
                .ok_or_else(|| VoxError::unrecognized_format("truncated WAVE fmt chunk"))?;
            return with_rate(rate, AudioCodec::Wav);
        }
        // RIFF chunks are word aligned
        pos = pos
            .saturating_add(8)
            .saturating_add(size)
            .saturating_add(size & 1);
    }

    Err(VoxError::unrecognized_format("WAVE container has no fmt chunk"))
}

fn probe_ogg(data: &[u8]) -> VoxResult<ProbedFormat> {
    let segments = *data
        .get(26)
        .ok_or_else(|| VoxError::unrecognized_format("truncated Ogg page header"))?
        as usize;
    let payload = data
        .get(27 + segments..)
        .ok_or_else(|| VoxError::unrecognized_format("truncated Ogg segment table"))?;

    if payload.starts_with(b"OpusHead") {
        return with_rate(OPUS_DECODE_RATE, AudioCodec::Opus);
    }
    if payload.first() == Some(&1) && payload.get(1..7) == Some(b"vorbis".as_slice()) {
        let rate = payload
            .get(12..16)
            .map(read_u32_le)
            .ok_or_else(|| VoxError::unrecognized_format("truncated Vorbis identification"))?;
        return with_rate(rate, AudioCodec::Ogg);
    }

    Err(VoxError::unrecognized_format(
        "Ogg stream carries neither Opus nor Vorbis",
    ))
}

fn probe_flac(data: &[u8]) -> VoxResult<ProbedFormat> {
    // marker (4) + block header (4) + STREAMINFO up to the sample rate field
    let block_type = data.get(4).map(|b| b & 0x7f);
    if block_type != Some(0) {
        return Err(VoxError::unrecognized_format(
            "FLAC stream does not start with STREAMINFO",
        ));
    }
    let field = data
        .get(18..21)
        .ok_or_else(|| VoxError::unrecognized_format("truncated FLAC STREAMINFO"))?;
    let rate = (u32::from(field[0]) << 12) | (u32::from(field[1]) << 4) | (u32::from(field[2]) >> 4);
    with_rate(rate, AudioCodec::Flac)
}

fn container_signature(data: &[u8]) -> Option<AudioCodec> {
    if data.starts_with(&EBML_MAGIC) {
        Some(AudioCodec::Webm)
    } else if data.get(4..8) == Some(b"ftyp".as_slice()) {
        Some(AudioCodec::M4a)
    } else {
        None
    }
}

/// A frame-based stream whose first frame starts at offset 0 and is either
/// the whole buffer or followed directly by a frame of the same kind
fn frame_stream(data: &[u8]) -> Option<AudioCodec> {
    let (codec, len) = frame_header(data)?;
    match data.len().cmp(&len) {
        Ordering::Less => None,
        Ordering::Equal => Some(codec),
        Ordering::Greater => frame_header(&data[len..])
            .filter(|(next, _)| *next == codec)
            .map(|_| codec),
    }
}

/// Codec and total frame length of the frame header at the start of `data`
fn frame_header(data: &[u8]) -> Option<(AudioCodec, usize)> {
    adts_frame_len(data)
        .map(|len| (AudioCodec::Aac, len))
        .or_else(|| mpeg_frame_len(data).map(|len| (AudioCodec::Mp3, len)))
}

fn adts_frame_len(data: &[u8]) -> Option<usize> {
    let header = data.get(..ADTS_HEADER_LEN)?;
    // 12-bit sync plus layer bits fixed at zero
    if header[0] != 0xFF || header[1] & 0xF6 != 0xF0 {
        return None;
    }
    if usize::from((header[2] >> 2) & 0x0F) >= ADTS_RATE_COUNT {
        return None;
    }
    let len = (usize::from(header[3] & 0x03) << 11)
        | (usize::from(header[4]) << 3)
        | usize::from(header[5] >> 5);
    (len > ADTS_HEADER_LEN).then_some(len)
}

fn mpeg_frame_len(data: &[u8]) -> Option<usize> {
    let header = data.get(..4)?;
    if header[0] != 0xFF || header[1] & 0xE0 != 0xE0 {
        return None;
    }
    // Layer III only
    if (header[1] >> 1) & 0x03 != 0b01 {
        return None;
    }
    let (rates, kbps, coefficient) = match (header[1] >> 3) & 0x03 {
        0b11 => (&MPEG1_RATES, &MPEG1_L3_KBPS, 144),
        0b10 => (&MPEG2_RATES, &MPEG2_L3_KBPS, 72),
        0b00 => (&MPEG25_RATES, &MPEG2_L3_KBPS, 72),
        _ => return None,
    };
    let sample_rate = *rates.get(usize::from((header[2] >> 2) & 0x03))?;
    let kbps = *kbps.get(usize::from(header[2] >> 4)).filter(|&&kbps| kbps != 0)?;
    let padding = usize::from((header[2] >> 1) & 0x01);
    Some(coefficient * (kbps * 1000) as usize / sample_rate as usize + padding)
}

/// Read the default track's sample rate through symphonia
fn demux(data: &[u8], codec: AudioCodec) -> VoxResult<ProbedFormat> {
    let mut hint = Hint::new();
    hint.with_extension(codec.extension());
    let source = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| VoxError::unrecognized_format(format!("{codec} stream rejected: {e}")))?;
    let sample_rate = probed
        .format
        .default_track()
        .and_then(|track| track.codec_params.sample_rate)
        .ok_or_else(|| {
            VoxError::unrecognized_format(format!("{codec} stream has no track with a sample rate"))
        })?;
    with_rate(sample_rate, codec)
}

/// Length of a leading ID3v2 tag, zero when absent
fn id3v2_len(data: &[u8]) -> VoxResult<usize> {
    if !data.starts_with(b"ID3") {
        return Ok(0);
    }
    let header = data
        .get(..10)
        .ok_or_else(|| VoxError::unrecognized_format("truncated ID3v2 header"))?;
    let size = header[6..10]
        .iter()
        .fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7F));
    let footer = if header[5] & 0x10 != 0 { 10 } else { 0 };
    let total = 10 + size + footer;
    if total >= data.len() {
        return Err(VoxError::unrecognized_format(format!(
            "ID3v2 tag of {total} bytes leaves no audio in a {}-byte buffer",
            data.len()
        )));
    }
    Ok(total)
}

fn with_rate(sample_rate: u32, codec: AudioCodec) -> VoxResult<ProbedFormat> {
    if sample_rate == 0 {
        return Err(VoxError::unrecognized_format(format!(
            "{codec} header declares a zero sample rate"
        )));
    }
    Ok(ProbedFormat { sample_rate, codec })
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn hex_prefix(data: &[u8]) -> String {
    data.iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn wav_bytes(sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..32 {
            writer.write_sample((i * 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_probe_wav() {
        let format = probe(&wav_bytes(16_000)).unwrap();
        assert_eq!(format.sample_rate, 16_000);
        assert_eq!(format.mime(), "audio/wav");
    }

    #[test]
    fn test_probe_wav_skips_leading_chunks() {
        let mut data = b"RIFF\0\0\0\0WAVE".to_vec();
        data.extend_from_slice(b"LIST");
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(b"abc\0"); // odd size plus pad byte
        data.extend_from_slice(b"fmt ");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&22_050u32.to_le_bytes());

        assert_eq!(probe(&data).unwrap().sample_rate, 22_050);
    }

    /// `count` Layer III frames with silent payloads
    fn mpeg_frames(header: [u8; 4], frame_len: usize, count: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for _ in 0..count {
            data.extend_from_slice(&header);
            data.resize(data.len() + frame_len - 4, 0);
        }
        data
    }

    /// ADTS frames at 48 kHz, stereo, no CRC
    fn adts_frames(frame_len: usize, count: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for _ in 0..count {
            data.extend_from_slice(&[
                0xFF,
                0xF1,
                0x4C,
                0x80 | (frame_len >> 11) as u8,
                (frame_len >> 3) as u8,
                ((frame_len & 0x07) as u8) << 5 | 0x1F,
                0xFC,
            ]);
            data.resize(data.len() + frame_len - 7, 0);
        }
        data
    }

    #[test]
    fn test_mpeg_frame_lengths() {
        // MPEG-1 Layer III, 128 kbps, 44.1 kHz
        assert_eq!(mpeg_frame_len(&[0xFF, 0xFB, 0x90, 0x64]), Some(417));
        // MPEG-2 Layer III, 32 kbps, 24 kHz
        assert_eq!(mpeg_frame_len(&[0xFF, 0xF3, 0x44, 0xC4]), Some(96));
        // padding adds one byte
        assert_eq!(mpeg_frame_len(&[0xFF, 0xF3, 0x46, 0xC4]), Some(97));
        // free format, reserved rate and Layer I are refused
        assert_eq!(mpeg_frame_len(&[0xFF, 0xFB, 0x00, 0x64]), None);
        assert_eq!(mpeg_frame_len(&[0xFF, 0xFB, 0x9C, 0x64]), None);
        assert_eq!(mpeg_frame_len(&[0xFF, 0xFF, 0x90, 0x64]), None);
    }

    #[test]
    fn test_probe_mp3_with_id3() {
        // ID3v2.3 tag with a 4-byte body, then MPEG-1 Layer III frames at 44.1 kHz
        let mut data = b"ID3\x03\x00\x00\x00\x00\x00\x04TAG!".to_vec();
        data.extend(mpeg_frames([0xFF, 0xFB, 0x90, 0x64], 417, 3));

        let format = probe(&data).unwrap();
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.mime(), "audio/mpeg");
    }

    #[test]
    fn test_probe_mpeg2_frames() {
        let data = mpeg_frames([0xFF, 0xF3, 0x44, 0xC4], 96, 4);
        let format = probe(&data).unwrap();
        assert_eq!(format.sample_rate, 24_000);
        assert_eq!(format.codec, AudioCodec::Mp3);
    }

    #[test]
    fn test_probe_adts() {
        let format = probe(&adts_frames(64, 4)).unwrap();
        assert_eq!(format.sample_rate, 48_000);
        assert_eq!(format.mime(), "audio/aac");
    }

    #[test]
    fn test_frame_sync_must_start_the_buffer() {
        let frames = mpeg_frames([0xFF, 0xF3, 0x44, 0xC4], 96, 4);

        let mut shifted = b"junk".to_vec();
        shifted.extend_from_slice(&frames);
        assert!(probe(&shifted).is_err());

        // a lone header with the wrong bytes where the next frame should start
        let mut broken = frames[..96].to_vec();
        broken.extend_from_slice(b"not another frame");
        assert!(probe(&broken).is_err());

        // a header claiming more bytes than the buffer holds
        assert!(probe(&frames[..40]).is_err());
    }

    #[test]
    fn test_utf16_text_is_not_mp3() {
        let mut data = vec![0xFF, 0xFE];
        for unit in "{\"error\":\"quota\"}".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        let err = probe(&data).unwrap_err();
        assert!(matches!(err, VoxError::UnrecognizedFormat { .. }));
        assert!(err.to_string().contains("ff fe"));
    }

    #[test]
    fn test_malformed_containers_rejected() {
        // EBML magic with a frame sync hidden in the payload
        let mut webm = EBML_MAGIC.to_vec();
        webm.extend_from_slice(&[0x84, 0xFF, 0xF3, 0x44, 0xC4]);
        let err = probe(&webm).unwrap_err();
        assert!(matches!(err, VoxError::UnrecognizedFormat { .. }));

        let mut mp4 = 16u32.to_be_bytes().to_vec();
        mp4.extend_from_slice(b"ftypM4A \x00\x00\x00\x00");
        assert!(probe(&mp4).is_err());
    }

    #[test]
    fn test_probe_flac() {
        let mut data = b"fLaC".to_vec();
        data.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
        data.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]); // block sizes
        data.extend_from_slice(&[0x00; 6]); // frame sizes
        // 44100 = 0x0AC44 in 20 bits
        data.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0]);

        let format = probe(&data).unwrap();
        assert_eq!(format.sample_rate, 44_100);
        assert_eq!(format.mime(), "audio/flac");
    }

    fn ogg_page(payload: &[u8]) -> Vec<u8> {
        let mut page = b"OggS".to_vec();
        page.extend_from_slice(&[0u8; 22]);
        page.push(1);
        page.push(payload.len() as u8);
        page.extend_from_slice(payload);
        page
    }

    #[test]
    fn test_probe_ogg_opus() {
        let format = probe(&ogg_page(b"OpusHead\x01\x01\x38\x01\x80\x3E\x00\x00")).unwrap();
        assert_eq!(format.sample_rate, 48_000);
        assert_eq!(format.mime(), "audio/opus");
    }

    #[test]
    fn test_probe_ogg_vorbis() {
        let mut ident = b"\x01vorbis".to_vec();
        ident.extend_from_slice(&0u32.to_le_bytes());
        ident.push(2);
        ident.extend_from_slice(&32_000u32.to_le_bytes());

        let format = probe(&ogg_page(&ident)).unwrap();
        assert_eq!(format.sample_rate, 32_000);
        assert_eq!(format.mime(), "audio/ogg");
    }

    #[test]
    fn test_unrecognized_input_is_an_error() {
        let err = probe(b"<html>not audio</html>").unwrap_err();
        assert!(matches!(err, VoxError::UnrecognizedFormat { .. }));
        assert!(err.to_string().contains("3c 68 74 6d"));
    }

    #[test]
    fn test_empty_and_truncated_inputs() {
        assert!(probe(&[]).is_err());
        assert!(probe(b"RIFF\0\0\0\0WAVE").is_err());
        assert!(probe(b"ID3\x03\x00").is_err());
        assert!(probe(b"OggS").is_err());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let mut data = wav_bytes(16_000);
        data[24..28].copy_from_slice(&0u32.to_le_bytes());
        assert!(probe(&data).is_err());
    }
}
