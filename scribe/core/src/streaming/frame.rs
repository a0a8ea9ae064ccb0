//! Frame Decoder
//!
//! Turns transport fragments of a server-sent-event style channel into
//! complete logical payloads.
//!
//! # Block Format
//!
//! ```text
//! data: {"text":"he
//! data: llo"}
//! <blank line>
//! ```
//!
//! Blocks are separated by a blank line. Within a block, every line that
//! starts with a recognized field marker (`data:`) contributes its value
//! (marker and one optional space stripped) to the payload; other lines
//! (`event:`, `id:`, comments) are ignored. The joined payload is trimmed.
//!
//! Fragment boundaries carry no meaning: feeding the same bytes split at any
//! position yields the same payload sequence.

/// Field marker for payload lines
pub const DATA_FIELD: &str = "data:";

/// Minimum buffer capacity for the decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Block delimiter (blank line, after carriage returns are dropped)
const BLOCK_DELIMITER: &str = "\n\n";

/// Incremental decoder for chunked event streams
///
/// Not reentrant: callers serialize `feed` calls for one stream.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Pending text not yet terminated by a block delimiter
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence (from `feed_bytes`)
    utf8_carry: Vec<u8>,
    /// Total payloads emitted by this decoder
    emitted: u64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new decoder with default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(MIN_BUFFER_CAPACITY),
            utf8_carry: Vec::new(),
            emitted: 0,
        }
    }

    /// Append a text fragment and return every payload it completes
    ///
    /// An incomplete trailing block stays buffered until its delimiter
    /// arrives or [`flush`](Self::flush) is called.
    pub fn feed(&mut self, fragment: &str) -> Vec<String> {
        // CR is dropped so "\r\n\r\n" and "\n\n" delimit identically even when
        // the CR and LF land in different fragments.
        self.buffer.extend(fragment.chars().filter(|c| *c != '\r'));
        self.drain_complete_blocks()
    }

    /// Append raw transport bytes
    ///
    /// A multi-byte UTF-8 sequence split across calls is held back until it
    /// completes. Invalid sequences decode to U+FFFD.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut pending = std::mem::take(&mut self.utf8_carry);
        pending.extend_from_slice(bytes);

        let mut text = String::with_capacity(pending.len());
        let mut rest = pending.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to guarantees this prefix is UTF-8
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes
                            self.utf8_carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        self.feed(&text)
    }

    /// Best-effort decode of whatever remains when the channel closes
    ///
    /// Data lines in the remainder are joined as usual; a remainder without
    /// any field marker is returned as raw trimmed text. Returns `None` when
    /// nothing meaningful is left.
    pub fn flush(&mut self) -> Option<String> {
        if !self.utf8_carry.is_empty() {
            let carry = std::mem::take(&mut self.utf8_carry);
            self.buffer.push_str(&String::from_utf8_lossy(&carry));
        }

        let remainder = std::mem::take(&mut self.buffer);
        if remainder.trim().is_empty() {
            return None;
        }

        let payload = if has_field_lines(&remainder) {
            extract_payload(&remainder)
        } else {
            remainder.trim().to_string()
        };

        if payload.is_empty() {
            None
        } else {
            self.emitted += 1;
            Some(payload)
        }
    }

    /// Number of buffered bytes awaiting a delimiter
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.utf8_carry.len()
    }

    /// Total payloads emitted so far
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Discard all buffered state
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.utf8_carry.clear();
    }

    fn drain_complete_blocks(&mut self) -> Vec<String> {
        let mut payloads = Vec::new();
        let mut consumed = 0;

        while let Some(idx) = self.buffer[consumed..].find(BLOCK_DELIMITER) {
            let block = &self.buffer[consumed..consumed + idx];
            consumed += idx + BLOCK_DELIMITER.len();

            let payload = extract_payload(block);
            if !payload.is_empty() {
                payloads.push(payload);
            }
        }

        if consumed > 0 {
            self.buffer.drain(..consumed);
        }
        self.emitted += payloads.len() as u64;
        payloads
    }
}

fn has_field_lines(block: &str) -> bool {
    block.lines().any(|line| line.starts_with(DATA_FIELD))
}

/// Join the values of all data lines in a block
fn extract_payload(block: &str) -> String {
    let mut payload = String::new();
    for line in block.lines() {
        if let Some(value) = line.strip_prefix(DATA_FIELD) {
            payload.push_str(value.strip_prefix(' ').unwrap_or(value));
            payload.push('\n');
        }
    }
    payload.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(decoder: &mut FrameDecoder, fragments: &[&str]) -> Vec<String> {
        fragments.iter().flat_map(|f| decoder.feed(f)).collect()
    }

    #[test]
    fn test_single_block() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.feed("data: {\"text\":\"hello\"}\n\n");
        assert_eq!(payloads, vec!["{\"text\":\"hello\"}".to_string()]);
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.emitted(), 1);
    }

    #[test]
    fn test_block_split_across_fragments() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed("data: {\"text\":\"he").is_empty());
        let payloads = decoder.feed("llo\"}\n\n");
        assert_eq!(payloads, vec!["{\"text\":\"hello\"}".to_string()]);
    }

    #[test]
    fn test_delimiter_split_across_fragments() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed("data: a\n").is_empty());
        assert_eq!(decoder.feed("\ndata: b\n\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_multiple_blocks_in_one_fragment() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.feed("data: one\n\ndata: two\n\ndata: thr");
        assert_eq!(payloads, vec!["one", "two"]);
        assert!(decoder.pending_len() > 0);
    }

    #[test]
    fn test_multi_line_data_joined() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.feed("data: {\"a\":\ndata: 1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":\n1}"]);
    }

    #[test]
    fn test_unmarked_lines_ignored() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.feed("event: message\nid: 7\n: keepalive\ndata: x\n\n");
        assert_eq!(payloads, vec!["x"]);
    }

    #[test]
    fn test_block_without_data_is_skipped() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(": ping\n\n").is_empty());
        assert!(decoder.feed("data:\n\n").is_empty());
        assert_eq!(decoder.emitted(), 0);
    }

    #[test]
    fn test_crlf_delimiters() {
        let mut decoder = FrameDecoder::new();
        let mut payloads = decoder.feed("data: a\r");
        payloads.extend(decoder.feed("\n\r\ndata: b\r\n\r\n"));
        assert_eq!(payloads, vec!["a", "b"]);
    }

    #[test]
    fn test_fragmentation_invariance() {
        let stream = "data: {\"text\":\"alpha\"}\n\nevent: x\ndata: beta\n\ndata: [DONE]\n\n";
        let mut whole = FrameDecoder::new();
        let expected = whole.feed(stream);

        for split in 0..stream.len() {
            if !stream.is_char_boundary(split) {
                continue;
            }
            let mut decoder = FrameDecoder::new();
            let got = feed_all(&mut decoder, &[&stream[..split], &stream[split..]]);
            assert_eq!(got, expected, "split at {split}");
        }

        let mut one_by_one = FrameDecoder::new();
        let chars: Vec<String> = stream.chars().map(String::from).collect();
        let refs: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(feed_all(&mut one_by_one, &refs), expected);
    }

    #[test]
    fn test_feed_bytes_split_utf8() {
        let stream = "data: héllo wörld\n\n".as_bytes();
        let mut decoder = FrameDecoder::new();
        let mut payloads = Vec::new();
        for chunk in stream.chunks(1) {
            payloads.extend(decoder.feed_bytes(chunk));
        }
        assert_eq!(payloads, vec!["héllo wörld"]);
    }

    #[test]
    fn test_feed_bytes_invalid_sequence() {
        let mut decoder = FrameDecoder::new();
        let payloads = decoder.feed_bytes(b"data: a\xFFb\n\n");
        assert_eq!(payloads, vec!["a\u{FFFD}b"]);
    }

    #[test]
    fn test_flush_partial_data_block() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed("data: {\"text\":\"tail\"}").is_empty());
        assert_eq!(decoder.flush(), Some("{\"text\":\"tail\"}".to_string()));
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn test_flush_raw_remainder() {
        let mut decoder = FrameDecoder::new();
        decoder.feed("  plain trailing text  ");
        assert_eq!(decoder.flush(), Some("plain trailing text".to_string()));
    }

    #[test]
    fn test_flush_empty() {
        let mut decoder = FrameDecoder::new();
        decoder.feed("data: x\n\n   \n");
        assert_eq!(decoder.flush(), None);
    }

    #[test]
    fn test_clear() {
        let mut decoder = FrameDecoder::new();
        decoder.feed("data: partial");
        decoder.clear();
        assert_eq!(decoder.pending_len(), 0);
        assert_eq!(decoder.flush(), None);
    }
}
