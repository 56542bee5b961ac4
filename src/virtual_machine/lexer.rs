//! Cursor scanning primitives used by the assembler.
//!
//! Every helper takes the source bytes and a cursor and returns the new cursor.
//! A cursor past the end of the buffer yields `None`; the assembler turns that
//! into a syntax error for the program being compiled.

/// Separator allowed between two operands.
pub const SEPARATOR: u8 = b',';

/// Returns true for the bytes treated as whitespace by the assembler.
pub const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Advances `pos` while `pred` holds, failing if `pos` starts past the end.
fn scan_while(src: &[u8], pos: usize, pred: impl Fn(u8) -> bool) -> Option<usize> {
    if pos > src.len() {
        return None;
    }
    let skipped = src[pos..].iter().take_while(|&&b| pred(b)).count();
    Some(pos + skipped)
}

/// Skips spaces, tabs and line breaks.
pub fn skip_whitespace(src: &[u8], pos: usize) -> Option<usize> {
    scan_while(src, pos, is_whitespace)
}

/// Moves to the first whitespace byte (or the end of the buffer).
pub fn next_whitespace(src: &[u8], pos: usize) -> Option<usize> {
    scan_while(src, pos, |b| !is_whitespace(b))
}

/// Skips any number of operand separators, including none.
pub fn skip_separator(src: &[u8], pos: usize) -> Option<usize> {
    scan_while(src, pos, |b| b == SEPARATOR)
}

/// Moves to the next line feed (or the end of the buffer).
pub fn next_line_end(src: &[u8], pos: usize) -> Option<usize> {
    scan_while(src, pos, |b| b != b'\n')
}

/// Converts a byte offset into a 1-based `(line, column)` pair.
pub fn line_col(src: &[u8], offset: usize) -> (usize, usize) {
    let offset = offset.min(src.len());
    let before = &src[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1);
    (line, offset - line_start + 1)
}
