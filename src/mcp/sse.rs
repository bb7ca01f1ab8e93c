//! Incremental Server-Sent Events decoder.
//!
//! Bytes arrive in arbitrary network chunks; the decoder buffers partial
//! lines and partial UTF-8 sequences and yields an [`SseEvent`] each time a
//! blank line terminates an event.

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field, `"message"` when the server omitted it.
    pub event: String,
    /// All `data:` lines joined with `\n`.
    pub data: String,
    pub id: Option<String>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    incomplete_utf8: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.decode(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=pos).collect();
            let line = raw.trim_end_matches(&['\n', '\r'][..]);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                "id" => self.id = Some(value.to_string()),
                _ => {}
            }
        }
        events
    }

    fn decode(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.incomplete_utf8);
        bytes.extend_from_slice(chunk);

        match std::str::from_utf8(&bytes) {
            Ok(text) => self.buffer.push_str(text),
            // Sequence cut at the chunk boundary: hold the tail back.
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                self.buffer
                    .push_str(std::str::from_utf8(&bytes[..valid]).unwrap_or_default());
                self.incomplete_utf8 = bytes[valid..].to_vec();
            }
            Err(_) => self.buffer.push_str(&String::from_utf8_lossy(&bytes)),
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: event.unwrap_or_else(|| "message".into()),
            data,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: endpoint\ndata: /messages/?session_id=abc\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "endpoint");
        assert_eq!(events[0].data, "/messages/?session_id=abc");
    }

    #[test]
    fn default_event_type_is_message() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"id\":1}\n\n");
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: mess").is_empty());
        assert!(decoder.feed(b"age\ndata: {\"a\"").is_empty());
        let events = decoder.feed(b":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"a\":1}");
    }

    #[test]
    fn crlf_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 7\r\ndata: first\r\ndata: second\r\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond");
        assert_eq!(events[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn comments_and_empty_events_skipped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": ping\n\nevent: noop\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn utf8_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let payload = "data: caf\u{e9}\n\n".as_bytes();
        // split inside the two-byte é
        let cut = payload.iter().position(|&b| b == 0xC3).unwrap() + 1;
        assert!(decoder.feed(&payload[..cut]).is_empty());
        let events = decoder.feed(&payload[cut..]);
        assert_eq!(events[0].data, "caf\u{e9}");
    }

    #[test]
    fn several_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: 1\n\ndata: 2\n\ndata: 3");
        assert_eq!(events.len(), 2);
        let events = decoder.feed(b"\n\n");
        assert_eq!(events[0].data, "3");
    }
}
