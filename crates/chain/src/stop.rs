//! Client-side stop-sequence enforcement.
//!
//! Output ends right before the first occurrence of any stop sequence.
//! While streaming, only the shortest tail that could still grow into a
//! stop sequence is held back; everything else is released immediately.

/// What one [`StopScanner::push`] releases.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Scanned {
    /// Text safe to deliver now.
    pub emit: String,
    /// A stop sequence was found; nothing more will be emitted.
    pub stopped: bool,
}

#[derive(Debug)]
pub struct StopScanner {
    stops: Vec<String>,
    longest: usize,
    pending: String,
    stopped: bool,
}

impl StopScanner {
    pub fn new(stops: &[String]) -> Self {
        let stops: Vec<String> = stops.iter().filter(|s| !s.is_empty()).cloned().collect();
        let longest = stops.iter().map(String::len).max().unwrap_or(0);
        Self {
            stops,
            longest,
            pending: String::new(),
            stopped: false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn push(&mut self, text: &str) -> Scanned {
        if self.stopped {
            return Scanned { emit: String::new(), stopped: true };
        }
        if self.stops.is_empty() {
            return Scanned { emit: text.to_string(), stopped: false };
        }

        self.pending.push_str(text);

        if let Some(at) = self.stops.iter().filter_map(|s| self.pending.find(s.as_str())).min() {
            self.pending.truncate(at);
            self.stopped = true;
            return Scanned {
                emit: std::mem::take(&mut self.pending),
                stopped: true,
            };
        }

        let keep_from = self.hold_start();
        let rest = self.pending.split_off(keep_from);
        Scanned {
            emit: std::mem::replace(&mut self.pending, rest),
            stopped: false,
        }
    }

    /// Release whatever is still held once the stream has ended.
    pub fn finish(&mut self) -> String {
        if self.stopped {
            return String::new();
        }
        std::mem::take(&mut self.pending)
    }

    /// Earliest position whose suffix is a proper prefix of some stop.
    fn hold_start(&self) -> usize {
        let window = self.pending.len().saturating_sub(self.longest - 1);
        self.pending
            .char_indices()
            .map(|(i, _)| i)
            .filter(|&i| i >= window)
            .find(|&i| {
                let tail = &self.pending[i..];
                self.stops.iter().any(|s| s.starts_with(tail))
            })
            .unwrap_or(self.pending.len())
    }
}

/// Cut a complete answer at the first stop sequence.
pub fn truncate_at_stop(text: &str, stops: &[String]) -> String {
    let mut scanner = StopScanner::new(stops);
    let mut out = scanner.push(text).emit;
    out.push_str(&scanner.finish());
    out
}
