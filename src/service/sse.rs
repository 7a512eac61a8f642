//! Server-sent events decoding over any `BufRead`

use std::io::{self, BufRead};

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// `[DONE]` sentinel used by OpenAI-compatible streams
    pub fn is_done_sentinel(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Reads events line by line; an event is dispatched on a blank line or at EOF
pub struct SseReader<R> {
    reader: R,
    line: String,
    finished: bool,
}

impl<R: BufRead> SseReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for SseReader<R> {
    type Item = io::Result<SseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut event: Option<String> = None;
        let mut data: Vec<String> = Vec::new();

        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.finished = true;
                    if event.is_none() && data.is_empty() {
                        return None;
                    }
                    return Some(Ok(SseEvent {
                        event,
                        data: data.join("\n"),
                    }));
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }

            let line = self.line.trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                if event.is_none() && data.is_empty() {
                    continue;
                }
                return Some(Ok(SseEvent {
                    event,
                    data: data.join("\n"),
                }));
            }

            // Comment / keep-alive
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => event = Some(value.to_string()),
                "data" => data.push(value.to_string()),
                _ => log::trace!("Ignoring SSE field: {}", field),
            }
        }
    }
}
