use regex::Regex;

/// Small match/search facility over a single pattern.
///
/// `first`/`next` walk successive matches through a string, exposing the
/// match position and length; `is_match` tests the whole string;
/// `match_prefix` reports how many bytes a match anchored at the start of
/// the string would consume. Inputs are small, so three compiled forms per
/// pattern are fine.
#[derive(Debug, Clone)]
pub struct Rex {
    search: Regex,
    anchored: Regex,
    full: Regex,
    /// Byte position of the most recent `first`/`next` match.
    pub pos: usize,
    /// Byte length of the most recent `first`/`next` match.
    pub len: usize,
    cursor: usize,
}

impl Rex {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            search: Regex::new(pattern)?,
            anchored: Regex::new(&format!("^(?:{})", pattern))?,
            full: Regex::new(&format!("^(?:{})$", pattern))?,
            pos: 0,
            len: 0,
            cursor: 0,
        })
    }

    /// Does the pattern match the entire string?
    pub fn is_match(&self, s: &str) -> bool {
        self.full.is_match(s)
    }

    /// Length of the match anchored at the start of `s`, if any.
    pub fn match_prefix(&self, s: &str) -> Option<usize> {
        self.anchored.find(s).map(|m| m.end())
    }

    /// Find the first match in `s`, recording `pos`/`len`.
    pub fn first(&mut self, s: &str) -> bool {
        self.reset();
        self.next(s)
    }

    /// Find the next match after the previous one.
    pub fn next(&mut self, s: &str) -> bool {
        if self.cursor > s.len() {
            return false;
        }
        match self.search.find_at(s, self.cursor) {
            Some(m) => {
                self.pos = m.start();
                self.len = m.len();
                // Empty matches still have to make progress.
                self.cursor = if m.end() > m.start() { m.end() } else { m.end() + 1 };
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
        self.len = 0;
        self.cursor = 0;
    }
}
