//! Maps transcript segments onto scene clips by overlap (spec §4.4).

use videx_media::Segment;

use crate::engine::TranscriptSegment;

/// A transcript segment overlaps a clip when it starts before the clip
/// ends and ends after the clip starts — touching endpoints don't count.
fn overlaps(transcript: &TranscriptSegment, clip: &Segment) -> bool {
    transcript.start_time < clip.end && transcript.end_time > clip.start
}

/// Concatenates the text of every transcript segment overlapping `clip`,
/// in order. Returns `None` if nothing overlaps, meaning the clip gets no
/// transcript field.
pub fn transcript_for_clip(segments: &[TranscriptSegment], clip: &Segment) -> Option<String> {
    let matching: Vec<&str> = segments
        .iter()
        .filter(|s| overlaps(s, clip))
        .map(|s| s.text.as_str())
        .collect();

    if matching.is_empty() {
        None
    } else {
        Some(matching.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment { index: 0, start_time: start, end_time: end, text: text.to_string() }
    }

    #[test]
    fn touching_endpoints_do_not_overlap() {
        let clip = Segment { start: 0.0, end: 5.0 };
        let transcript = seg(5.0, 10.0, "later");
        assert!(!overlaps(&transcript, &clip));
    }

    #[test]
    fn straddling_segment_overlaps() {
        let clip = Segment { start: 5.0, end: 10.0 };
        let transcript = seg(4.0, 6.0, "straddles");
        assert!(overlaps(&transcript, &clip));
    }

    #[test]
    fn multiple_overlapping_segments_concatenate_in_order() {
        let clip = Segment { start: 0.0, end: 10.0 };
        let segments = vec![seg(0.0, 3.0, "first"), seg(3.0, 6.0, "second"), seg(20.0, 25.0, "unrelated")];
        let text = transcript_for_clip(&segments, &clip).unwrap();
        assert_eq!(text, "first second");
    }

    #[test]
    fn no_overlap_returns_none() {
        let clip = Segment { start: 0.0, end: 5.0 };
        let segments = vec![seg(10.0, 15.0, "far away")];
        assert!(transcript_for_clip(&segments, &clip).is_none());
    }
}
