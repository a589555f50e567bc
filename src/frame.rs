//! Sensor frame decoding
//!
//! The radar emits one fixed-layout binary report per second:
//! an 8-byte magic pattern, a 40-byte header (10 little-endian u32 words),
//! a 128-byte vitals payload (34 channel values), an 8-byte TLV header and
//! a 252-byte range profile of 16-bit samples.
//!
//! A magic mismatch is not an error; the decoder scans forward and silently
//! resynchronizes on the next occurrence of the pattern. A buffer holding a
//! matched magic but fewer than a full frame's bytes yields no output.

use tracing::trace;

/// Synchronization pattern preceding every frame.
pub const FRAME_MAGIC: [u8; 8] = [0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07];

/// Total frame length in bytes, magic included.
pub const FRAME_LEN: usize = 436;

/// Number of decoded channel values in the vitals payload.
pub const CHANNEL_COUNT: usize = 34;

/// Number of 16-bit range-profile samples.
pub const RANGE_PROFILE_LEN: usize = 126;

const HEADER_OFFSET: usize = 8;
const PAYLOAD_OFFSET: usize = 48;
const TLV_OFFSET: usize = 176;
const RANGE_OFFSET: usize = 184;

/// One decoded sensor report.
#[derive(Debug, Clone)]
pub struct VitalFrame {
    /// Raw header words (version, packet length, platform, frame number, ...).
    pub header: [u32; 10],
    /// Decoded channel values.
    pub channels: [f64; CHANNEL_COUNT],
    /// TLV type/length words following the vitals payload.
    pub tlv_header: [u32; 2],
    /// Range-profile samples; decoded but unused downstream.
    pub range_profile: [i16; RANGE_PROFILE_LEN],
}

impl VitalFrame {
    pub fn frame_number(&self) -> u32 {
        self.header[3]
    }

    /// Unwrapped-phase peak displacement (mm).
    pub fn phase_peak(&self) -> f64 {
        self.channels[7]
    }

    /// Sensor FFT-based heart rate estimate.
    pub fn heart_fft(&self) -> f64 {
        self.channels[10]
    }

    /// Sensor cross-correlation heart rate estimate.
    pub fn heart_xcorr(&self) -> f64 {
        self.channels[12]
    }

    /// Sensor FFT-based breathing rate estimate.
    pub fn breath_fft(&self) -> f64 {
        self.channels[14]
    }

    /// Sensor cross-correlation breathing rate estimate.
    pub fn breath_xcorr(&self) -> f64 {
        self.channels[15]
    }

    /// Sensor time-domain breathing rate estimate.
    pub fn breath_sensor(&self) -> f64 {
        self.channels[25]
    }

    /// Sensor time-domain heart rate estimate.
    pub fn heart_sensor(&self) -> f64 {
        self.channels[26]
    }
}

/// Reassemble an IEEE-754 binary32 value from an ordered bit array:
/// `bits[0]` is the sign, `bits[1..9]` the exponent (MSB first) and
/// `bits[9..32]` the mantissa (MSB first).
pub fn ieee754_from_bits(bits: &[u8; 32]) -> f32 {
    let mut word: u32 = 0;
    for &bit in bits.iter() {
        word = (word << 1) | u32::from(bit & 1);
    }
    f32::from_bits(word)
}

/// Expand four wire bytes into the bit ordering the payload uses:
/// bytes are taken last-to-first, each contributing its bits MSB first.
fn payload_float_bits(raw: &[u8]) -> [u8; 32] {
    debug_assert_eq!(raw.len(), 4);
    let mut bits = [0u8; 32];
    let mut k = 0;
    for &byte in raw.iter().rev() {
        for shift in (0..8).rev() {
            bits[k] = (byte >> shift) & 1;
            k += 1;
        }
    }
    bits
}

fn read_u32_le(raw: &[u8]) -> u32 {
    u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
}

fn read_u16_pair(raw: &[u8]) -> f64 {
    f64::from(u16::from_le_bytes([raw[0], raw[1]]))
}

/// Stateless frame decoder: scan a read buffer for the magic pattern and
/// decode at most one frame per call.
#[derive(Debug, Default)]
pub struct FrameDecoder;

impl FrameDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Attempt synchronization and decode. Returns `None` when no magic is
    /// present or the buffer is shorter than one frame past the match.
    pub fn decode(&self, buf: &[u8]) -> Option<VitalFrame> {
        let start = buf
            .windows(FRAME_MAGIC.len())
            .position(|window| window == FRAME_MAGIC)?;
        if buf.len() - start < FRAME_LEN {
            trace!(start, available = buf.len() - start, "short frame dropped");
            return None;
        }
        Some(Self::decode_at(&buf[start..start + FRAME_LEN]))
    }

    /// Decode a buffer known to begin with the magic and span a full frame.
    fn decode_at(frame: &[u8]) -> VitalFrame {
        let mut header = [0u32; 10];
        for (i, word) in header.iter_mut().enumerate() {
            let at = HEADER_OFFSET + i * 4;
            *word = read_u32_le(&frame[at..at + 4]);
        }

        let payload = &frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + 128];
        let mut channels = [0.0f64; CHANNEL_COUNT];

        // Channels 0-1: pairs of little-endian 16-bit words.
        channels[0] = read_u16_pair(&payload[0..2]);
        channels[1] = read_u16_pair(&payload[2..4]);

        // Channel 2: bit-packed binary32.
        channels[2] = f64::from(ieee754_from_bits(&payload_float_bits(&payload[4..8])));

        // Channels 3-6: pairs of little-endian 16-bit words.
        for i in 0..4 {
            channels[3 + i] = read_u16_pair(&payload[8 + i * 2..10 + i * 2]);
        }

        // Channels 7-33: bit-packed binary32 values.
        for i in 0..27 {
            let at = 16 + i * 4;
            channels[7 + i] = f64::from(ieee754_from_bits(&payload_float_bits(&payload[at..at + 4])));
        }

        let tlv_header = [
            read_u32_le(&frame[TLV_OFFSET..TLV_OFFSET + 4]),
            read_u32_le(&frame[TLV_OFFSET + 4..TLV_OFFSET + 8]),
        ];

        let mut range_profile = [0i16; RANGE_PROFILE_LEN];
        for (i, sample) in range_profile.iter_mut().enumerate() {
            let at = RANGE_OFFSET + i * 2;
            *sample = i16::from_le_bytes([frame[at], frame[at + 1]]);
        }

        VitalFrame {
            header,
            channels,
            tlv_header,
            range_profile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// The payload's reversed byte walk makes a bit-packed float equal to a
    /// little-endian binary32 on the wire.
    fn write_channel_f32(frame: &mut [u8], channel: usize, value: f32) {
        assert!((7..34).contains(&channel));
        let at = PAYLOAD_OFFSET + 16 + (channel - 7) * 4;
        frame[at..at + 4].copy_from_slice(&value.to_bits().to_le_bytes());
    }

    fn make_frame() -> Vec<u8> {
        let mut frame = vec![0u8; FRAME_LEN];
        frame[..8].copy_from_slice(&FRAME_MAGIC);
        // Frame number is header word 3.
        frame[HEADER_OFFSET + 12..HEADER_OFFSET + 16].copy_from_slice(&42u32.to_le_bytes());
        write_channel_f32(&mut frame, 7, 1.25);
        write_channel_f32(&mut frame, 25, 15.5);
        write_channel_f32(&mut frame, 26, 72.0);
        // First range-profile sample.
        frame[RANGE_OFFSET..RANGE_OFFSET + 2].copy_from_slice(&(-7i16).to_le_bytes());
        frame
    }

    #[test]
    fn test_decode_full_frame() {
        let frame = make_frame();
        let decoded = FrameDecoder::new().decode(&frame).unwrap();

        assert_eq!(decoded.frame_number(), 42);
        assert!((decoded.phase_peak() - 1.25).abs() < 1e-9);
        assert!((decoded.breath_sensor() - 15.5).abs() < 1e-9);
        assert!((decoded.heart_sensor() - 72.0).abs() < 1e-9);
        assert_eq!(decoded.range_profile[0], -7);
    }

    #[test]
    fn test_resync_past_garbage() {
        let mut buf = vec![0xAAu8; 13];
        buf.extend_from_slice(&make_frame());
        let decoded = FrameDecoder::new().decode(&buf).unwrap();
        assert_eq!(decoded.frame_number(), 42);
    }

    #[test]
    fn test_no_magic_yields_nothing() {
        let buf = vec![0u8; FRAME_LEN];
        assert!(FrameDecoder::new().decode(&buf).is_none());
    }

    #[test]
    fn test_truncated_frame_dropped() {
        let frame = make_frame();
        assert!(FrameDecoder::new().decode(&frame[..FRAME_LEN - 1]).is_none());
    }

    #[test]
    fn test_u16_pair_channels() {
        let mut frame = make_frame();
        frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + 2].copy_from_slice(&513u16.to_le_bytes());
        frame[PAYLOAD_OFFSET + 8..PAYLOAD_OFFSET + 10].copy_from_slice(&7u16.to_le_bytes());
        let decoded = FrameDecoder::new().decode(&frame).unwrap();
        assert_eq!(decoded.channels[0], 513.0);
        assert_eq!(decoded.channels[3], 7.0);
    }

    #[test]
    fn test_ieee754_bit_unpack() {
        // -2.5 = sign 1, exponent 128, mantissa 0b010...0
        let mut bits = [0u8; 32];
        bits[0] = 1;
        bits[1] = 1; // exponent 1000_0000
        bits[10] = 1; // mantissa MSB-1
        assert_eq!(ieee754_from_bits(&bits), -2.5);
    }
}
