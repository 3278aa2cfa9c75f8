//! RTSP reply grammar:
//!
//! ```text
//! RTSP/1.0 200 OK
//! CSeq: <n>
//! Session: <id>
//! ```
//!
//! Replies carry no `Content-Length`; the channel is message-oriented by
//! line, matched to the builder/serialize shape the teacher crate uses
//! for its (RFC-general) responses, but with strict positional parsing
//! on the reading side to match the request grammar's strictness.

/// A parsed or to-be-serialized RTSP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtspResponse {
    pub status_code: u16,
    pub status_text: String,
    pub cseq: u32,
    pub session_id: Option<u32>,
}

impl RtspResponse {
    /// 200 OK, always carries a session id (created or already known).
    pub fn ok(cseq: u32, session_id: u32) -> Self {
        Self {
            status_code: 200,
            status_text: "OK".to_string(),
            cseq,
            session_id: Some(session_id),
        }
    }

    /// 404 Not Found — SETUP's media file didn't open. Per spec §9's
    /// fix for the reference's bug, this reply carries no session id.
    pub fn not_found(cseq: u32) -> Self {
        Self {
            status_code: 404,
            status_text: "Not Found".to_string(),
            cseq,
            session_id: None,
        }
    }

    /// Serialize to the wire format: `\n`-terminated lines, no CRLF, no
    /// trailing blank line (the RTSP channel here is message-oriented by
    /// line, not framed by a blank-line terminator).
    pub fn serialize(&self) -> String {
        let mut out = format!(
            "RTSP/1.0 {} {}\n",
            self.status_code, self.status_text
        );
        out.push_str(&format!("CSeq: {}\n", self.cseq));
        if let Some(session) = self.session_id {
            out.push_str(&format!("Session: {}\n", session));
        }
        out
    }

    /// Parse a raw reply using the same positional strictness as
    /// [`super::request::RtspRequest::parse`]: line 0 is the status
    /// line, line 1 is `CSeq: <n>`, line 2 (if present) is
    /// `Session: <id>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let lines: Vec<&str> = raw.split('\n').collect();

        let status_line: Vec<&str> = lines.first()?.split(' ').collect();
        if status_line.len() < 3 || status_line[0] != "RTSP/1.0" {
            return None;
        }
        let status_code: u16 = status_line[1].parse().ok()?;
        let status_text = status_line[2..].join(" ").trim().to_string();

        let cseq_line: Vec<&str> = lines.get(1)?.split(' ').collect();
        if cseq_line.first().copied() != Some("CSeq:") {
            return None;
        }
        let cseq: u32 = cseq_line.get(1)?.trim().parse().ok()?;

        let session_id = lines.get(2).and_then(|line| {
            let parts: Vec<&str> = line.split(' ').collect();
            if parts.first().copied() == Some("Session:") {
                parts.get(1).and_then(|s| s.trim().parse().ok())
            } else {
                None
            }
        });

        Some(RtspResponse {
            status_code,
            status_text,
            cseq,
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_round_trips() {
        let resp = RtspResponse::ok(1, 554321);
        let raw = resp.serialize();
        let parsed = RtspResponse::parse(&raw).unwrap();
        assert_eq!(parsed, resp);
    }

    #[test]
    fn not_found_has_no_session() {
        let resp = RtspResponse::not_found(9);
        let raw = resp.serialize();
        assert!(!raw.contains("Session:"));
        let parsed = RtspResponse::parse(&raw).unwrap();
        assert_eq!(parsed.status_code, 404);
        assert_eq!(parsed.session_id, None);
    }

    #[test]
    fn serialize_matches_exact_grammar() {
        let resp = RtspResponse::ok(1, 554321);
        assert_eq!(resp.serialize(), "RTSP/1.0 200 OK\nCSeq: 1\nSession: 554321\n");
    }
}
