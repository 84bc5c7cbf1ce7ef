//! Code block accumulation.

/// One accumulated unit of source text paired with its logical filename.
///
/// A block is built line by line while the control channel is read,
/// consumed once by the executor, then discarded.
///
/// # Example
///
/// ```
/// use blockvm_types::CodeBlock;
///
/// let mut block = CodeBlock::new("mod.lua");
/// assert!(block.is_empty());
///
/// block.push_line("x = 1");
/// block.push_line("y = 2");
/// assert_eq!(block.source(), "x = 1\ny = 2\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlock {
    filename: String,
    source: String,
}

impl CodeBlock {
    /// Creates an empty block tagged with `filename`.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: String::new(),
        }
    }

    /// Appends one line of source plus a line terminator.
    pub fn push_line(&mut self, line: &str) {
        self.source.push_str(line);
        self.source.push('\n');
    }

    /// Logical filename used for diagnostics.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Accumulated source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns `true` if no source has been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Number of accumulated lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_is_empty() {
        let block = CodeBlock::new("a.lua");
        assert!(block.is_empty());
        assert_eq!(block.filename(), "a.lua");
        assert_eq!(block.line_count(), 0);
    }

    #[test]
    fn empty_line_makes_block_non_empty() {
        let mut block = CodeBlock::new("a.lua");
        block.push_line("");
        assert!(!block.is_empty());
        assert_eq!(block.source(), "\n");
    }

    #[test]
    fn lines_are_joined_with_terminators() {
        let mut block = CodeBlock::new("a.lua");
        block.push_line("local a = 1");
        block.push_line("return a");
        assert_eq!(block.source(), "local a = 1\nreturn a\n");
        assert_eq!(block.line_count(), 2);
    }
}
