//! Streaming Support
//!
//! Decodes Server-Sent Events (SSE) from a chat completions stream into
//! content fragments. Network chunks arrive with arbitrary boundaries, so
//! [`SseDecoder`] buffers bytes until a full line is available.

use bytes::{Buf, BytesMut};
use serde_json::Value;

/// Prefix carrying a frame payload
const DATA_PREFIX: &str = "data: ";

/// Payload signalling the end of the stream
const DONE_SENTINEL: &str = "[DONE]";

/// Non-empty `choices[0].delta.content` of a parsed frame
///
/// Nothing else in the frame is inspected, so unexpected metadata types
/// (numeric ids, non-string finish reasons) never hide the content.
pub fn delta_content(frame: &Value) -> Option<&str> {
    frame
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
}

/// What a single SSE line means to the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Framing noise, keep-alives, malformed or content-free frames
    Skip,

    /// The `[DONE]` sentinel
    Done,

    /// A content fragment
    Content(String),
}

/// Classify one complete SSE line (without its trailing newline)
pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.strip_suffix('\r').unwrap_or(line);

    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        // Blank separators, comments, `event:`, `id:`, `retry:`
        return SseLine::Skip;
    };

    if data == DONE_SENTINEL {
        return SseLine::Done;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(frame) => match delta_content(&frame) {
            Some(content) => SseLine::Content(content.to_string()),
            None => SseLine::Skip,
        },
        Err(e) => {
            tracing::debug!(error = %e, len = data.len(), "skipping unparseable SSE frame");
            SseLine::Skip
        }
    }
}

/// Incremental line decoder for an SSE byte stream
///
/// Bytes are split on `\n` before UTF-8 decoding, so multi-byte characters
/// straddling a chunk boundary are reassembled intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes after the last complete line
    buffer: BytesMut,

    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,

    /// Set once `[DONE]` has been seen
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of buffered bytes not yet forming a complete line
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk, returning the fragments of every line it completes
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut fragments = Vec::new();
        if self.done {
            return fragments;
        }

        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.next_newline() {
            let line = self.buffer.split_to(pos);
            self.buffer.advance(1);
            self.scanned = 0;

            if self.process_line(&line, &mut fragments) {
                self.buffer.clear();
                break;
            }
        }

        fragments
    }

    /// Position of the next `\n`, searching only bytes not yet scanned
    fn next_newline(&mut self) -> Option<usize> {
        let found = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|pos| self.scanned + pos);
        if found.is_none() {
            self.scanned = self.buffer.len();
        }
        found
    }

    /// Flush an unterminated trailing line at end of stream
    pub fn finish(&mut self) -> Vec<String> {
        let mut fragments = Vec::new();
        self.scanned = 0;
        if self.done || self.buffer.is_empty() {
            self.buffer.clear();
            return fragments;
        }

        let line = self.buffer.split();
        self.process_line(&line, &mut fragments);
        fragments
    }

    /// Returns true when the line terminated the stream
    fn process_line(&mut self, line: &[u8], fragments: &mut Vec<String>) -> bool {
        let line = String::from_utf8_lossy(line);
        match parse_sse_line(&line) {
            SseLine::Skip => false,
            SseLine::Done => {
                self.done = true;
                true
            }
            SseLine::Content(content) => {
                fragments.push(content);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HI_FRAME: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n";

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
            })
        )
    }

    fn decode_all(chunks: &[&[u8]]) -> (Vec<String>, bool) {
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(decoder.decode(chunk));
        }
        out.extend(decoder.finish());
        (out, decoder.is_done())
    }

    #[test]
    fn test_parse_sse_line() {
        let line = r#"data: {"id":"chatcmpl-123","object":"chat.completion.chunk","created":1677652288,"model":"gpt-4","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        assert_eq!(parse_sse_line(line), SseLine::Content("Hello".to_string()));
    }

    #[test]
    fn test_unexpected_metadata_types_keep_content() {
        assert_eq!(
            parse_sse_line(r#"data: {"id":123,"choices":[{"delta":{"content":"Hi"}}]}"#),
            SseLine::Content("Hi".to_string())
        );
        assert_eq!(
            parse_sse_line(
                r#"data: {"id":["x"],"model":7,"created":1.5,"choices":[{"index":"0","delta":{"role":1,"content":"Hi"},"finish_reason":0}]}"#
            ),
            SseLine::Content("Hi".to_string())
        );
    }

    #[test]
    fn test_non_string_content_is_skipped() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":42}}]}"#),
            SseLine::Skip
        );
        assert_eq!(parse_sse_line(r#"data: "just a string""#), SseLine::Skip);
    }

    #[test]
    fn test_parse_sse_done() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_sse_line("data: [DONE]\r"), SseLine::Done);
    }

    #[test]
    fn test_parse_sse_ignores_framing() {
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(parse_sse_line("event: message"), SseLine::Skip);
        assert_eq!(parse_sse_line("data:{\"choices\":[]}"), SseLine::Skip);
    }

    #[test]
    fn test_parse_sse_without_content() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        );
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            SseLine::Skip
        );
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":null,"finish_reason":"stop"}]}"#),
            SseLine::Skip
        );
        assert_eq!(parse_sse_line(r#"data: {"choices":[]}"#), SseLine::Skip);
        assert_eq!(parse_sse_line(r#"data: {}"#), SseLine::Skip);
    }

    #[test]
    fn test_every_split_point_yields_one_fragment() {
        let bytes = HI_FRAME.as_bytes();
        for split in 1..bytes.len() {
            let (head, tail) = bytes.split_at(split);
            let (fragments, _) = decode_all(&[head, tail]);
            assert_eq!(fragments, vec!["Hi".to_string()], "split at {}", split);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for byte in frame("one").bytes().chain(frame("two").bytes()) {
            out.extend(decoder.decode(&[byte]));
        }
        assert_eq!(out, vec!["one", "two"]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_long_line_in_small_chunks_scans_incrementally() {
        let input = frame(&"x".repeat(4096));
        let mut decoder = SseDecoder::new();
        let mut out = Vec::new();
        for chunk in input.as_bytes().chunks(3) {
            out.extend(decoder.decode(chunk));
            assert!(decoder.scanned <= decoder.pending_len());
            if decoder.pending_len() > 0 {
                assert_eq!(decoder.scanned, decoder.pending_len());
            }
        }
        assert_eq!(out, vec!["x".repeat(4096)]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_done_alone_yields_nothing() {
        let (fragments, done) = decode_all(&[b"data: [DONE]\n\n".as_slice()]);
        assert!(fragments.is_empty());
        assert!(done);
    }

    #[test]
    fn test_nothing_after_done_is_processed() {
        let input = format!("{}data: [DONE]\n\n{}", frame("kept"), frame("dropped"));
        let mut decoder = SseDecoder::new();
        let out = decoder.decode(input.as_bytes());
        assert_eq!(out, vec!["kept"]);
        assert!(decoder.is_done());

        assert!(decoder.decode(frame("later").as_bytes()).is_empty());
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_malformed_frame_is_skipped() {
        let input = format!("data: {{not json\n\n{}", frame("ok"));
        let (fragments, _) = decode_all(&[input.as_bytes()]);
        assert_eq!(fragments, vec!["ok"]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let input = frame("¡Hola, señor! 🦀");
        let bytes = input.as_bytes();
        let crab = input.find('🦀').unwrap();
        let (fragments, _) = decode_all(&[&bytes[..crab + 2], &bytes[crab + 2..]]);
        assert_eq!(fragments, vec!["¡Hola, señor! 🦀"]);
    }

    #[test]
    fn test_crlf_lines() {
        let input = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r\n\r\ndata: [DONE]\r\n\r\n";
        let (fragments, done) = decode_all(&[input.as_bytes()]);
        assert_eq!(fragments, vec!["a"]);
        assert!(done);
    }

    #[test]
    fn test_unterminated_trailing_line_is_flushed() {
        let input = "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}";
        let mut decoder = SseDecoder::new();
        assert!(decoder.decode(input.as_bytes()).is_empty());
        assert_eq!(decoder.finish(), vec!["tail"]);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn test_fragments_reconstruct_full_text() {
        let parts = ["The ", "quick ", "brown ", "fox"];
        let mut transcript = String::from("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n");
        for part in parts {
            transcript.push_str(&frame(part));
        }
        transcript.push_str(": keep-alive\n\n");
        transcript.push_str("data: [DONE]\n\n");

        let bytes = transcript.as_bytes();
        let chunks: Vec<&[u8]> = bytes.chunks(7).collect();
        let (fragments, done) = decode_all(&chunks);

        assert!(done);
        assert_eq!(fragments.concat(), "The quick brown fox");
    }
}
