//! Line-level tokenizer for resonance programs

/// Split program text into trimmed line tokens and standalone brace tokens.
///
/// Newlines separate tokens; every `{` and `}` becomes its own
/// one-character token, flushing any text accumulated around it.
/// Blank fragments are dropped. The lexer accepts any text; malformed
/// structure is caught by the block parser.
pub fn tokenize(program: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    let mut flush = |buf: &mut String, out: &mut Vec<String>| {
        let trimmed = buf.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        buf.clear();
    };

    for ch in program.chars() {
        match ch {
            '{' | '}' => {
                flush(&mut current, &mut tokens);
                tokens.push(ch.to_string());
            }
            '\n' => flush(&mut current, &mut tokens),
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut tokens);

    tokens
}
