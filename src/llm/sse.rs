//! Minimal server-sent events reader for streaming completions.

use std::io::BufRead;

use anyhow::{Context, Result};

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseEvent {
    /// Value of the last `event:` field, if any.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Iterator of events read line by line from `reader`.
pub struct SseEvents<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> SseEvents<R> {
    /// Wraps a buffered response body.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for SseEvents<R> {
    type Item = Result<SseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut current = SseEvent::default();
        let mut has_fields = false;
        loop {
            self.line.clear();
            let read = match self
                .reader
                .read_line(&mut self.line)
                .context("failed to read event stream")
            {
                Ok(read) => read,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };
            if read == 0 {
                self.done = true;
                return has_fields.then_some(Ok(current));
            }

            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if has_fields {
                    return Some(Ok(current));
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
                "event" => {
                    current.event = Some(value.to_string());
                    has_fields = true;
                }
                "data" => {
                    if !current.data.is_empty() {
                        current.data.push('\n');
                    }
                    current.data.push_str(value);
                    has_fields = true;
                }
                _ => {}
            }
        }
    }
}

/// Result of decoding one event into answer text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStep {
    /// A text fragment to deliver.
    Text(String),
    /// Bookkeeping event with no text.
    Skip,
    /// The provider signalled the end of the answer.
    Done,
}

/// Adapts decoded SSE events into a stream of text fragments.
pub struct SseTextStream<R, F> {
    events: SseEvents<R>,
    decode: F,
    finished: bool,
}

impl<R, F> SseTextStream<R, F>
where
    R: BufRead,
    F: FnMut(&SseEvent) -> Result<StreamStep>,
{
    /// Builds a text stream using `decode` to interpret each event.
    pub fn new(reader: R, decode: F) -> Self {
        Self {
            events: SseEvents::new(reader),
            decode,
            finished: false,
        }
    }
}

impl<R, F> Iterator for SseTextStream<R, F>
where
    R: BufRead,
    F: FnMut(&SseEvent) -> Result<StreamStep>,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let event = match self.events.next()? {
                Ok(event) => event,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };
            match (self.decode)(&event) {
                Ok(StreamStep::Text(text)) => return Some(Ok(text)),
                Ok(StreamStep::Skip) => continue,
                Ok(StreamStep::Done) => self.finished = true,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}
