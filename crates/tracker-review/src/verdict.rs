//! Verdict parsing: the wire protocol between worker and reviewer turns
//! (spec §4.6).
//!
//! Grounded on the teacher's `output_parser/return_packet.rs` pattern of
//! "parse canonical format, fall back to a safe default on total failure" —
//! here the safe default is `RequestChanges` with the full transcript as
//! feedback, so a reviewer that forgets the tag still produces forward
//! progress, bounded by `max_rounds`.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    RequestChanges { feedback: String },
}

fn verdict_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<verdict>\s*(APPROVE|REQUEST_CHANGES)\s*</verdict>")
            .expect("static regex is valid")
    })
}

/// Scan `transcript` for `<verdict>(APPROVE|REQUEST_CHANGES)</verdict>`,
/// taking the **last** match (spec §4.6). No match is treated as
/// `REQUEST_CHANGES` with the full transcript as feedback.
pub fn parse_verdict(transcript: &str) -> Verdict {
    match verdict_re().captures_iter(transcript).last() {
        Some(captures) if &captures[1] == "APPROVE" => Verdict::Approve,
        Some(_) => Verdict::RequestChanges {
            feedback: transcript.to_string(),
        },
        None => Verdict::RequestChanges {
            feedback: transcript.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_approve() {
        let transcript = "Looks good.\n<verdict>APPROVE</verdict>";
        assert_eq!(parse_verdict(transcript), Verdict::Approve);
    }

    #[test]
    fn parses_request_changes() {
        let transcript = "Missing tests.\n<verdict>REQUEST_CHANGES</verdict>";
        match parse_verdict(transcript) {
            Verdict::RequestChanges { feedback } => assert_eq!(feedback, transcript),
            other => panic!("expected RequestChanges, got {other:?}"),
        }
    }

    #[test]
    fn takes_last_match_when_multiple_present() {
        let transcript = "<verdict>REQUEST_CHANGES</verdict> reconsidering... \
                           <verdict>APPROVE</verdict>";
        assert_eq!(parse_verdict(transcript), Verdict::Approve);
    }

    #[test]
    fn no_tag_falls_back_to_request_changes_with_full_transcript() {
        let transcript = "I think this is fine but forgot the tag.";
        match parse_verdict(transcript) {
            Verdict::RequestChanges { feedback } => assert_eq!(feedback, transcript),
            other => panic!("expected RequestChanges, got {other:?}"),
        }
    }

    #[test]
    fn tolerates_whitespace_inside_tag() {
        let transcript = "<verdict> APPROVE </verdict>";
        assert_eq!(parse_verdict(transcript), Verdict::Approve);
    }
}
