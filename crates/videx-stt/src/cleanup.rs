//! Transcript fragment cleanup and CJK coalescing (spec §4.4).

use regex::Regex;

use crate::engine::TranscriptSegment;

const CJK_LANGUAGES: &[&str] = &["ja", "zh", "ko"];
const MERGE_SILENCE_GAP_SECS: f64 = 1.0;
const MERGE_MAX_DURATION_SECS: f64 = 15.0;
const MERGE_MAX_NON_WHITESPACE_CHARS: usize = 40;

/// Strips `<|...|>` decorator tokens emitted by some STT models and drops
/// fragments left with nothing but punctuation/whitespace.
pub fn strip_decorators(segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    let decorator_re = Regex::new(r"<\|[^|]*\|>").expect("valid regex");
    let punctuation_only_re = Regex::new(r"^[\s.,!?;:\-_。，！？、]*$").expect("valid regex");

    segments
        .into_iter()
        .filter_map(|mut seg| {
            seg.text = decorator_re.replace_all(&seg.text, "").trim().to_string();
            if punctuation_only_re.is_match(&seg.text) {
                None
            } else {
                Some(seg)
            }
        })
        .collect()
}

/// CJK transcription tends to emit one fragment per breath group; merge
/// adjacent fragments until a sentence-ending punctuation mark, a silence
/// gap over 1s, 15s of accumulated duration, or 40 non-whitespace
/// characters is reached, whichever comes first.
pub fn merge_cjk_fragments(language: &str, segments: Vec<TranscriptSegment>) -> Vec<TranscriptSegment> {
    if !CJK_LANGUAGES.contains(&language) || segments.is_empty() {
        return segments;
    }

    let sentence_end_re = Regex::new(r"[.!?。！？]\s*$").expect("valid regex");
    let mut merged = Vec::new();
    let mut pending: Option<TranscriptSegment> = None;

    for seg in segments {
        pending = Some(match pending.take() {
            None => seg,
            Some(mut acc) => {
                let gap = seg.start_time - acc.end_time;
                let combined_text_len = acc.text.chars().filter(|c| !c.is_whitespace()).count()
                    + seg.text.chars().filter(|c| !c.is_whitespace()).count();
                let combined_duration = seg.end_time - acc.start_time;

                let should_flush = gap > MERGE_SILENCE_GAP_SECS
                    || combined_duration > MERGE_MAX_DURATION_SECS
                    || combined_text_len > MERGE_MAX_NON_WHITESPACE_CHARS
                    || sentence_end_re.is_match(&acc.text);

                if should_flush {
                    merged.push(acc);
                    seg
                } else {
                    acc.end_time = seg.end_time;
                    acc.text = format!("{}{}", acc.text, seg.text);
                    acc
                }
            }
        });
    }

    if let Some(last) = pending {
        merged.push(last);
    }

    for (i, seg) in merged.iter_mut().enumerate() {
        seg.index = i;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: usize, start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment { index, start_time: start, end_time: end, text: text.to_string() }
    }

    #[test]
    fn strips_decorator_tokens() {
        let segments = vec![seg(0, 0.0, 1.0, "<|nospeech|>hello<|endoftext|>")];
        let cleaned = strip_decorators(segments);
        assert_eq!(cleaned[0].text, "hello");
    }

    #[test]
    fn drops_punctuation_only_fragments() {
        let segments = vec![seg(0, 0.0, 1.0, "..."), seg(1, 1.0, 2.0, "real text")];
        let cleaned = strip_decorators(segments);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].text, "real text");
    }

    #[test]
    fn non_cjk_language_is_untouched() {
        let segments = vec![seg(0, 0.0, 1.0, "hello"), seg(1, 1.0, 2.0, "world")];
        let merged = merge_cjk_fragments("en", segments.clone());
        assert_eq!(merged, segments);
    }

    #[test]
    fn cjk_fragments_merge_until_sentence_end() {
        let segments = vec![
            seg(0, 0.0, 1.0, "\u{4eca}\u{65e5}\u{306f}"),
            seg(1, 1.0, 2.0, "\u{3044}\u{3044}\u{5929}\u{6c17}。"),
            seg(2, 2.0, 3.0, "\u{6b21}\u{306e}文"),
        ];
        let merged = merge_cjk_fragments("ja", segments);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "\u{4eca}\u{65e5}\u{306f}\u{3044}\u{3044}\u{5929}\u{6c17}。");
        assert_eq!(merged[0].start_time, 0.0);
        assert_eq!(merged[0].end_time, 2.0);
    }

    #[test]
    fn cjk_fragments_split_on_silence_gap_over_one_second() {
        let segments = vec![seg(0, 0.0, 1.0, "\u{4eca}\u{65e5}"), seg(1, 3.0, 4.0, "\u{306f}")];
        let merged = merge_cjk_fragments("ja", segments);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn cjk_fragments_split_after_forty_characters() {
        let long_fragment: String = std::iter::repeat('\u{3042}').take(41).collect();
        let segments = vec![seg(0, 0.0, 1.0, "\u{3042}"), seg(1, 1.0, 2.0, &long_fragment)];
        let merged = merge_cjk_fragments("ja", segments);
        assert_eq!(merged.len(), 2);
    }
}
