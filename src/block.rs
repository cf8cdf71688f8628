//! Source segmentation
//!
//! Splits program text into statement texts and brace markers, each tagged
//! with its 1-based source line. Braces always stand alone, so `} else {`
//! yields a close marker, the text `else` and an open marker. A `;` outside
//! parentheses and brackets ends a statement. `//` starts a comment that runs
//! to the end of the line.

use crate::error::{CompileResult, MmlError};

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text { line: usize, text: String },
    Open { line: usize },
    Close { line: usize },
}

impl Segment {
    pub fn line(&self) -> usize {
        match self {
            Segment::Text { line, .. } | Segment::Open { line } | Segment::Close { line } => *line,
        }
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(at) => &line[..at],
        None => line,
    }
}

struct Splitter {
    segments: Vec<Segment>,
    current: String,
    open_lines: Vec<usize>,
}

impl Splitter {
    fn flush(&mut self, line: usize) {
        let text = self.current.trim();
        if !text.is_empty() {
            self.segments.push(Segment::Text {
                line,
                text: text.to_string(),
            });
        }
        self.current.clear();
    }
}

/// Split `source` into segments and check that braces balance
pub fn segment(source: &str) -> CompileResult<Vec<Segment>> {
    let mut splitter = Splitter {
        segments: Vec::new(),
        current: String::new(),
        open_lines: Vec::new(),
    };

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let mut depth = 0i32;
        for ch in strip_comment(raw).chars() {
            match ch {
                '{' => {
                    splitter.flush(line);
                    splitter.open_lines.push(line);
                    splitter.segments.push(Segment::Open { line });
                }
                '}' => {
                    splitter.flush(line);
                    if splitter.open_lines.pop().is_none() {
                        return Err(MmlError::UnbalancedBraces.at_line(line));
                    }
                    splitter.segments.push(Segment::Close { line });
                }
                ';' if depth <= 0 => splitter.flush(line),
                _ => {
                    match ch {
                        '(' | '[' => depth += 1,
                        ')' | ']' => depth -= 1,
                        _ => {}
                    }
                    splitter.current.push(ch);
                }
            }
        }
        splitter.flush(line);
    }

    if let Some(line) = splitter.open_lines.pop() {
        return Err(MmlError::UnbalancedBraces.at_line(line));
    }
    Ok(splitter.segments)
}
