use crate::models::openai::ChatCompletionChunk;
use bytes::BytesMut;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";
const IGNORED_FIELDS: &[&str] = &["event:", "id:", "retry:"];

/// One meaningful line of an OpenAI-style SSE stream
#[derive(Debug, Clone)]
pub enum SseEvent {
    Chunk(ChatCompletionChunk),
    /// The `data: [DONE]` sentinel
    Done,
}

/// Stateful line framer for `text/event-stream` bodies.
///
/// Network chunks may split a line anywhere (including inside a multi-byte
/// character), so bytes are buffered until a newline arrives. Lines that are
/// not valid JSON are logged and skipped.
pub struct SseLineParser {
    buffer: BytesMut,
    /// Prefix of `buffer` already known to contain no newline
    scanned: usize,
}

impl SseLineParser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            scanned: 0,
        }
    }

    /// Feed new data and extract events from every complete line
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        self.extract_events()
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        self.scanned = 0;
        let rest = self.buffer.split();
        parse_line(&rest).into_iter().collect()
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn extract_events(&mut self) -> Vec<SseEvent> {
        let mut results = Vec::new();

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            if let Some(event) = parse_line(&line) {
                results.push(event);
            }
        }
        self.scanned = self.buffer.len();

        results
    }
}

impl Default for SseLineParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_line(raw: &[u8]) -> Option<SseEvent> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(e) => {
            tracing::warn!("Skipping non-UTF-8 stream line: {}", e);
            return None;
        }
    };

    // blank separators and SSE comments
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    let payload = match line.strip_prefix(DATA_PREFIX) {
        Some(rest) => rest.trim_start(),
        None if IGNORED_FIELDS.iter().any(|f| line.starts_with(f)) => return None,
        None => line,
    };

    if payload == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }

    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => Some(SseEvent::Chunk(chunk)),
        Err(e) => {
            tracing::warn!("Failed to parse stream chunk: {} ({})", payload, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(events: &[SseEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                SseEvent::Chunk(chunk) => chunk.delta_content().map(String::from),
                SseEvent::Done => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_complete_lines() {
        let mut parser = SseLineParser::new();
        let data = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";
        let events = parser.feed(data);

        assert_eq!(events.len(), 2);
        assert_eq!(contents(&events), vec!["Hi"]);
        assert!(matches!(events[1], SseEvent::Done));
    }

    #[test]
    fn test_line_split_across_feeds() {
        let mut parser = SseLineParser::new();

        let chunk1 = b"data: {\"choices\":[{\"delta\":";
        let chunk2 = b"{\"content\":\"te";
        let chunk3 = b"st\"}}]}\n";

        assert!(parser.feed(chunk1).is_empty());
        assert!(parser.feed(chunk2).is_empty());
        let events = parser.feed(chunk3);
        assert_eq!(contents(&events), vec!["test"]);
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_multibyte_char_split() {
        let mut parser = SseLineParser::new();
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xc3).unwrap() + 1;

        assert!(parser.feed(&line[..split]).is_empty());
        let events = parser.feed(&line[split..]);
        assert_eq!(contents(&events), vec!["héllo"]);
    }

    #[test]
    fn test_garbled_line_skipped() {
        let mut parser = SseLineParser::new();
        let data = b"data: {\"choices\":[{\"del\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n";
        let events = parser.feed(data);
        assert_eq!(contents(&events), vec!["ok"]);
    }

    #[test]
    fn test_crlf_and_comments() {
        let mut parser = SseLineParser::new();
        let data = b": keep-alive\r\nevent: message\r\ndata:{\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r\n\r\n";
        let events = parser.feed(data);
        assert_eq!(contents(&events), vec!["a"]);
    }

    #[test]
    fn test_unprefixed_json_line() {
        let mut parser = SseLineParser::new();
        let events = parser.feed(b"{\"choices\":[{\"delta\":{\"content\":\"raw\"}}]}\n");
        assert_eq!(contents(&events), vec!["raw"]);
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut parser = SseLineParser::new();
        assert!(parser.feed(b"data: [DONE]").is_empty());
        let events = parser.finish();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SseEvent::Done));
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_long_line_fed_bytewise() {
        let mut parser = SseLineParser::new();
        let text = "x".repeat(4096);
        let line = format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{}\"}}}}]}}\n\ndata: [DONE]\n",
            text
        );

        let mut events = Vec::new();
        for byte in line.as_bytes() {
            events.extend(parser.feed(std::slice::from_ref(byte)));
            assert!(parser.scanned <= parser.pending());
        }

        assert_eq!(contents(&events), vec![text]);
        assert!(matches!(events.last(), Some(SseEvent::Done)));
        assert_eq!(parser.pending(), 0);
        assert_eq!(parser.scanned, 0);
    }

    #[test]
    fn test_partial_line_kept_after_complete_one() {
        let mut parser = SseLineParser::new();
        let events = parser.feed(b"data: [DONE]\ndata: {\"choices\":[{\"delta\":");
        assert_eq!(events.len(), 1);
        assert_eq!(parser.scanned, parser.pending());

        let events = parser.feed(b"{\"content\":\"late\"}}]}\n");
        assert_eq!(contents(&events), vec!["late"]);
    }
}
