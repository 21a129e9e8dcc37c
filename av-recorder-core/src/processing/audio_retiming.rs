use crate::models::media::{AudioChunk, MediaTime, SampleTiming};

/// Offset of a raw clock value from the session zero point.
pub fn session_relative(raw: MediaTime, start: MediaTime) -> MediaTime {
    raw - start
}

/// Move a microphone buffer onto the session timeline.
///
/// Every timing entry's decode and presentation time is overwritten with
/// `raw − start`, discarding per-entry offsets inside the buffer. Durations are
/// kept. A chunk without timing entries gets one.
pub fn retime_chunk(mut chunk: AudioChunk, start: MediaTime) -> (AudioChunk, MediaTime) {
    let adjusted = session_relative(chunk.hardware_timestamp, start);
    if chunk.timing.is_empty() {
        chunk.timing.push(SampleTiming::default());
    }
    for entry in &mut chunk.timing {
        entry.decode = adjusted;
        entry.presentation = adjusted;
    }
    (chunk, adjusted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: i64) -> MediaTime {
        MediaTime::from_millis(v)
    }

    #[test]
    fn adjusts_against_zero_point() {
        let chunk = AudioChunk::new(vec![0.0; 64], 1, 44100.0, ms(120));
        let (retimed, adjusted) = retime_chunk(chunk, ms(45));
        assert_eq!(adjusted, ms(75));
        assert_eq!(retimed.timing[0].presentation, ms(75));
        assert_eq!(retimed.timing[0].decode, ms(75));
        assert_eq!(retimed.hardware_timestamp, ms(120));
    }

    #[test]
    fn overwrites_every_timing_entry() {
        let mut chunk = AudioChunk::new(vec![0.0; 64], 1, 44100.0, ms(200));
        chunk.timing = (0..4)
            .map(|i| SampleTiming {
                duration: ms(1),
                presentation: ms(200 + i),
                decode: ms(199 + i),
            })
            .collect();

        let (retimed, adjusted) = retime_chunk(chunk, ms(50));
        assert_eq!(adjusted, ms(150));
        assert_eq!(retimed.timing.len(), 4);
        for entry in &retimed.timing {
            assert_eq!(entry.presentation, ms(150));
            assert_eq!(entry.decode, ms(150));
            assert_eq!(entry.duration, ms(1));
        }
    }

    #[test]
    fn empty_timing_gets_one_entry() {
        let mut chunk = AudioChunk::new(vec![0.0; 8], 2, 48000.0, ms(10));
        chunk.timing.clear();
        let (retimed, _) = retime_chunk(chunk, ms(10));
        assert_eq!(retimed.timing.len(), 1);
        assert_eq!(retimed.timing[0].presentation, MediaTime::ZERO);
    }

    #[test]
    fn chunk_before_zero_point_is_negative() {
        let chunk = AudioChunk::new(vec![0.0; 8], 1, 48000.0, ms(30));
        let (_, adjusted) = retime_chunk(chunk, ms(45));
        assert!(adjusted.is_negative());
    }
}
