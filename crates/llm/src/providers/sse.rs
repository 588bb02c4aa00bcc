//! Minimal Server-Sent-Events line parser for the OpenAI-compatible
//! streaming format: events are `data: {json}\n\n`, terminated by a literal
//! `data: [DONE]` line.

/// One parsed SSE data line, or the sentinel signalling the stream is done.
pub(super) enum SseLine {
    Data(String),
    Done,
}

/// Buffers incoming bytes and yields complete SSE lines as they appear.
///
/// Mirrors the teacher crate's Claude SSE parser: accumulate into a string
/// buffer, split on `\n`, and only consume a line once it's complete.
pub(super) struct SseLineBuffer {
    buffer: String,
}

impl SseLineBuffer {
    pub(super) fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    pub(super) fn push(&mut self, chunk: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
    }

    /// Pops and parses the next complete line, if any.
    pub(super) fn next_line(&mut self) -> Option<SseLine> {
        let newline_pos = self.buffer.find('\n')?;
        let line = self.buffer[..newline_pos].trim_end_matches('\r').to_string();
        self.buffer.drain(..=newline_pos);

        let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
            // Blank lines and any other SSE field (event:, id:, comments) are
            // ignored outright; this format only ever sends `data:`.
            return self.next_line_or_none();
        };
        let data = data.trim();
        if data == "[DONE]" {
            Some(SseLine::Done)
        } else if data.is_empty() {
            self.next_line_or_none()
        } else {
            Some(SseLine::Data(data.to_string()))
        }
    }

    fn next_line_or_none(&mut self) -> Option<SseLine> {
        if self.buffer.contains('\n') {
            self.next_line()
        } else {
            None
        }
    }
}

impl Default for SseLineBuffer {
    fn default() -> Self {
        Self::new()
    }
}
