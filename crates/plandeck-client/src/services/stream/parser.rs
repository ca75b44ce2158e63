// Chunk Parser
// Feature: Streaming Chat (031-streaming-chat)
//
// Turns arbitrarily fragmented network chunks into typed stream events.
// Chunks do not align with protocol record boundaries: a record may arrive
// split mid-object or several records may arrive in one chunk, so the parser
// keeps an accumulating buffer and only consumes fully parsed prefixes.
//
// Two wire framings exist across backend endpoints:
// - `SseData`: `data: <json>\n\n` records
// - `JsonStream`: back-to-back JSON objects with no delimiter, located by
//   brace matching

use crate::services::stream::events::{ChunkPayload, StreamEvent};

/// Wire framing of a streaming endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// Server-sent-event style `data:` records separated by blank lines
    #[default]
    SseData,
    /// Concatenated JSON objects with no separator
    JsonStream,
}

/// Incremental parser for one streaming session
#[derive(Debug)]
pub struct ChunkParser {
    format: WireFormat,
    buffer: String,
}

impl ChunkParser {
    pub fn new(format: WireFormat) -> Self {
        Self {
            format,
            buffer: String::new(),
        }
    }

    /// Feed a raw chunk and collect every event completed by it
    ///
    /// Callable with any substring split of the true payload; a complete
    /// payload object is emitted exactly once no matter how it was
    /// fragmented. Malformed payloads are logged and skipped without
    /// terminating the stream.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(chunk);
        match self.format {
            WireFormat::SseData => self.drain_records(),
            WireFormat::JsonStream => self.drain_objects(),
        }
    }

    /// Flush whatever the buffer still holds at end of stream
    ///
    /// An SSE record without its trailing blank line is still a record once
    /// the stream closes; a partial JSON object is unrecoverable and dropped.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            return Vec::new();
        }
        match self.format {
            WireFormat::SseData => parse_record(&rest),
            WireFormat::JsonStream => {
                log::warn!(
                    "dropping {} bytes of incomplete stream payload at end of stream",
                    rest.len()
                );
                Vec::new()
            }
        }
    }

    fn drain_records(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(boundary) = self.buffer.find("\n\n") {
            let record: String = self.buffer.drain(..boundary + 2).collect();
            events.extend(parse_record(record.trim_end()));
        }
        events
    }

    fn drain_objects(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        loop {
            // Discard anything before the next object start
            match self.buffer.find('{') {
                Some(0) => {}
                Some(start) => {
                    let skipped: String = self.buffer.drain(..start).collect();
                    if !skipped.trim().is_empty() {
                        log::warn!("skipping unexpected stream bytes: {:?}", skipped);
                    }
                }
                None => {
                    if !self.buffer.trim().is_empty() {
                        log::warn!("skipping unexpected stream bytes: {:?}", self.buffer);
                    }
                    self.buffer.clear();
                    break;
                }
            }
            match object_end(&self.buffer) {
                Some(end) => {
                    let object: String = self.buffer.drain(..end).collect();
                    events.extend(parse_payload(&object));
                }
                // Object still incomplete; wait for the next chunk
                None => break,
            }
        }
        events
    }
}

/// Parse one SSE record (the part before the blank-line terminator)
fn parse_record(record: &str) -> Vec<StreamEvent> {
    let record = record.trim_start_matches(['\r', '\n']);
    if record.is_empty() {
        return Vec::new();
    }
    match record.strip_prefix("data:") {
        Some(data) => {
            let data = data.trim();
            if data.is_empty() {
                Vec::new()
            } else {
                parse_payload(data)
            }
        }
        None => {
            log::warn!("skipping stream record without data prefix: {:?}", record);
            Vec::new()
        }
    }
}

/// Parse one JSON payload into events; malformed payloads are skipped
fn parse_payload(data: &str) -> Vec<StreamEvent> {
    match serde_json::from_str::<ChunkPayload>(data) {
        Ok(payload) => payload.into_events(),
        Err(err) => {
            log::warn!("skipping malformed stream payload: {} - data: {}", err, data);
            Vec::new()
        }
    }
}

/// Byte index one past the end of the first balanced JSON object, if the
/// buffer holds a complete one. The scan is string- and escape-aware so
/// braces inside string values do not count.
fn object_end(buffer: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in buffer.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Run a fragmentation through a fresh parser and collect all events,
    /// including the end-of-stream flush
    fn collect(format: WireFormat, chunks: &[&str]) -> Vec<StreamEvent> {
        let mut parser = ChunkParser::new(format);
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(parser.feed(chunk));
        }
        events.extend(parser.finish());
        events
    }

    fn text(delta: &str) -> StreamEvent {
        StreamEvent::Text {
            delta: delta.to_string(),
        }
    }

    fn file(delta: &str) -> StreamEvent {
        StreamEvent::FileDelta {
            delta: delta.to_string(),
        }
    }

    #[test]
    fn test_sse_single_chunk_multiple_records() {
        let events = collect(
            WireFormat::SseData,
            &["data: {\"message\":\"Hello \"}\n\ndata: {\"message\":\"world\"}\n\n"],
        );
        assert_eq!(events, vec![text("Hello "), text("world")]);
    }

    #[test]
    fn test_sse_split_invariance() {
        let payload = "data: {\"message\":\"Hello \"}\n\ndata: {\"file\":\"# Plan\\n\"}\n\ndata: {}\n\n";
        let expected = vec![text("Hello "), file("# Plan\n"), StreamEvent::Done];

        // Whole payload at once
        assert_eq!(collect(WireFormat::SseData, &[payload]), expected);

        // Byte-by-byte
        let bytes: Vec<String> = payload.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = bytes.iter().map(String::as_str).collect();
        assert_eq!(collect(WireFormat::SseData, &refs), expected);

        // Split mid-record and mid-prefix
        for split in [3, 7, 12, 26, 30, payload.len() - 1] {
            let (a, b) = payload.split_at(split);
            assert_eq!(
                collect(WireFormat::SseData, &[a, b]),
                expected,
                "split at {}",
                split
            );
        }
    }

    #[test]
    fn test_sse_trailing_record_without_terminator_is_flushed() {
        let events = collect(WireFormat::SseData, &["data: {\"message\":\"tail\"}"]);
        assert_eq!(events, vec![text("tail")]);
    }

    #[test]
    fn test_sse_malformed_record_is_skipped_not_fatal() {
        let events = collect(
            WireFormat::SseData,
            &["data: {not json}\n\ndata: {\"message\":\"ok\"}\n\n"],
        );
        assert_eq!(events, vec![text("ok")]);
    }

    #[test]
    fn test_sse_non_data_record_is_skipped() {
        let events = collect(
            WireFormat::SseData,
            &["event: ping\n\ndata: {\"message\":\"ok\"}\n\n"],
        );
        assert_eq!(events, vec![text("ok")]);
    }

    #[test]
    fn test_json_stream_back_to_back_objects() {
        let events = collect(
            WireFormat::JsonStream,
            &["{\"message\":\"a\"}{\"message\":\"b\"}{}"],
        );
        assert_eq!(events, vec![text("a"), text("b"), StreamEvent::Done]);
    }

    #[test]
    fn test_json_stream_split_invariance() {
        let payload = "{\"message\":\"Hello \"}{\"file\":\"+ PayPal\\n\"}{}";
        let expected = vec![text("Hello "), file("+ PayPal\n"), StreamEvent::Done];

        assert_eq!(collect(WireFormat::JsonStream, &[payload]), expected);

        let bytes: Vec<String> = payload.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = bytes.iter().map(String::as_str).collect();
        assert_eq!(collect(WireFormat::JsonStream, &refs), expected);

        for split in [1, 10, 20, 21, 35, payload.len() - 1] {
            let (a, b) = payload.split_at(split);
            assert_eq!(
                collect(WireFormat::JsonStream, &[a, b]),
                expected,
                "split at {}",
                split
            );
        }
    }

    #[test]
    fn test_json_stream_braces_inside_strings_do_not_close_objects() {
        let events = collect(
            WireFormat::JsonStream,
            &["{\"message\":\"a } b \\\" { c\"}"],
        );
        assert_eq!(events, vec![text("a } b \" { c")]);
    }

    #[test]
    fn test_json_stream_whitespace_between_objects() {
        let events = collect(
            WireFormat::JsonStream,
            &["{\"message\":\"a\"}\n  {\"message\":\"b\"}"],
        );
        assert_eq!(events, vec![text("a"), text("b")]);
    }

    #[test]
    fn test_json_stream_incomplete_tail_is_dropped() {
        let events = collect(WireFormat::JsonStream, &["{\"message\":\"a\"}{\"mess"]);
        assert_eq!(events, vec![text("a")]);
    }

    #[test]
    fn test_multibyte_content_survives_fragmentation() {
        let payload = "data: {\"message\":\"計画を更新\"}\n\n";
        let expected = vec![text("計画を更新")];
        assert_eq!(collect(WireFormat::SseData, &[payload]), expected);
        // Split at a char boundary inside the multibyte run
        let idx = payload.find('を').unwrap();
        let (a, b) = payload.split_at(idx);
        assert_eq!(collect(WireFormat::SseData, &[a, b]), expected);
    }

    #[test]
    fn test_issues_payload() {
        let events = collect(
            WireFormat::SseData,
            &["data: {\"issues\":[{\"project_id\":\"p1\",\"issue_id\":\"7\",\"title\":\"Fix\",\"description\":\"\",\"status\":\"todo\",\"priority\":\"low\",\"comments\":[]}]}\n\n"],
        );
        match &events[..] {
            [StreamEvent::IssuesSnapshot { issues }] => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].issue_id, "7");
            }
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[test]
    fn test_parser_is_restartable_per_session() {
        let mut parser = ChunkParser::new(WireFormat::SseData);
        assert_eq!(parser.feed("data: {\"message\":\"a\"}\n\n"), vec![text("a")]);
        // A fresh parser starts with a clean buffer
        let mut fresh = ChunkParser::new(WireFormat::SseData);
        assert_eq!(fresh.feed("data: {\"message\":\"b\"}\n\n"), vec![text("b")]);
        assert!(parser.finish().is_empty());
    }
}
