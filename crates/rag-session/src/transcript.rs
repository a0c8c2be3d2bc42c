//! Lines printed by the speech-to-text collaborator.

/// Prefix the recorder puts on every finished utterance.
pub const TRANSCRIPTION_MARKER: &str = "[TRANSCRIPTION]";

/// Extract the utterance from a recorder output line.
///
/// Returns `None` for log lines and for empty transcriptions.
pub fn parse_transcription_line(line: &str) -> Option<&str> {
    let text = line.strip_prefix(TRANSCRIPTION_MARKER)?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
