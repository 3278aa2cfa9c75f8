//! RTSP request grammar (line-based, `\n`-separated, case-sensitive method):
//!
//! ```text
//! <METHOD> <filename> RTSP/1.0
//! CSeq: <n>
//! [Transport: RTP/AVP;unicast;client_port=<port>]   // SETUP only
//! [Session: <id>]                                    // PLAY/PAUSE/TEARDOWN
//! ```

/// A parsed RTSP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtspRequest {
    /// RTSP method (`SETUP`, `PLAY`, `PAUSE`, `TEARDOWN`, or anything
    /// else the sender wrote — unrecognized methods parse fine and are
    /// rejected by the caller, not here).
    pub method: String,
    /// The media filename from the request line.
    pub filename: String,
    /// CSeq value from line 2.
    pub cseq: u32,
    /// `client_port=` value from the Transport header (SETUP only).
    pub client_rtp_port: Option<u16>,
    /// Session id from the Session header (PLAY/PAUSE/TEARDOWN only).
    pub session_id: Option<u32>,
}

impl RtspRequest {
    /// Parse a raw RTSP request. Returns `None` on any structural
    /// mismatch — this crate treats a malformed request as "ignore it",
    /// not as an error to propagate (see spec §7, protocol errors).
    pub fn parse(raw: &str) -> Option<Self> {
        let lines: Vec<&str> = raw.split('\n').collect();

        let request_line: Vec<&str> = lines.first()?.split(' ').collect();
        if request_line.len() != 3 {
            return None;
        }
        let method = request_line[0].to_string();
        let filename = request_line[1].to_string();

        let cseq_line: Vec<&str> = lines.get(1)?.split(' ').collect();
        if cseq_line.first().copied() != Some("CSeq:") {
            return None;
        }
        let cseq: u32 = cseq_line.get(1)?.trim().parse().ok()?;

        let mut client_rtp_port = None;
        let mut session_id = None;

        if let Some(line2) = lines.get(2) {
            if method == "SETUP" {
                if let Some(after) = line2.split("client_port=").nth(1) {
                    client_rtp_port = after.split(';').next().and_then(|s| s.trim().parse().ok());
                }
            } else {
                let parts: Vec<&str> = line2.split(' ').collect();
                if parts.first().copied() == Some("Session:") {
                    session_id = parts.get(1).and_then(|s| s.trim().parse().ok());
                }
            }
        }

        Some(RtspRequest {
            method,
            filename,
            cseq,
            client_rtp_port,
            session_id,
        })
    }

    /// Serialize this request back to wire form (used by the RTSP
    /// requester side — `ClientSession`).
    pub fn serialize(&self) -> String {
        let mut out = format!("{} {} RTSP/1.0\n", self.method, self.filename);
        out.push_str(&format!("CSeq: {}\n", self.cseq));

        match (self.method.as_str(), self.client_rtp_port, self.session_id) {
            ("SETUP", Some(port), _) => {
                out.push_str(&format!(
                    "Transport: RTP/AVP;unicast;client_port={}",
                    port
                ));
            }
            (_, _, Some(session)) => {
                out.push_str(&format!("Session: {}", session));
            }
            _ => {}
        }

        out
    }
}
