pub const BASE_OPS: [&str; 32] = [
    "LIT", "INC", "POP", "NIP", "SWP", "ROT", "DUP", "OVR", "EQU", "NEQ", "GTH", "LTH", "JMP", "JCN", "JSR", "STH",
    "LDZ", "STZ", "LDR", "STR", "LDA", "STA", "DEI", "DEO", "ADD", "SUB", "MUL", "DIV", "AND", "ORA", "EOR", "SFT",
];

/// Resolves an opcode mnemonic (with optional `2`/`k`/`r` mode suffix,
/// any order, each at most once) to its encoded byte. `LIT`'s four
/// forms are fixed full-string matches since the keep bit is forced on
/// for that base op; every other base op accepts the generic suffix
/// grammar.
pub fn find_opcode(tok: &str) -> Option<u8> {
    match tok {
        "BRK" => return Some(0x00),
        "LIT" => return Some(0x80),
        "LIT2" => return Some(0xa0),
        "LITr" => return Some(0xc0),
        "LIT2r" => return Some(0xe0),
        _ => {}
    }
    if tok.len() < 3 || !tok.is_char_boundary(3) {
        return None;
    }
    let (name, suffix) = tok.split_at(3);
    let base = BASE_OPS.iter().position(|&b| b == name)?;
    if base == 0 || suffix.len() > 3 {
        return None;
    }
    let mut keep = false;
    let mut ret = false;
    let mut short = false;
    for c in suffix.chars() {
        match c {
            '2' if !short => short = true,
            'k' if !keep => keep = true,
            'r' if !ret => ret = true,
            _ => return None,
        }
    }
    let mut byte = base as u8;
    if keep {
        byte |= 0x80;
    }
    if ret {
        byte |= 0x40;
    }
    if short {
        byte |= 0x20;
    }
    Some(byte)
}

pub fn is_hex(tok: &str) -> bool {
    !tok.is_empty() && tok.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_suffixed() {
        assert_eq!(find_opcode("ADD"), Some(0x18));
        assert_eq!(find_opcode("ADD2"), Some(0x38));
        assert_eq!(find_opcode("ADDk"), Some(0x98));
        assert_eq!(find_opcode("ADD2k"), Some(0xb8));
        assert_eq!(find_opcode("STHkr"), Some(0xcf));
    }

    #[test]
    fn fixed_lit_forms() {
        assert_eq!(find_opcode("BRK"), Some(0x00));
        assert_eq!(find_opcode("LIT"), Some(0x80));
        assert_eq!(find_opcode("LIT2"), Some(0xa0));
        assert_eq!(find_opcode("LITr"), Some(0xc0));
        assert_eq!(find_opcode("LIT2r"), Some(0xe0));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(find_opcode("FOO"), None);
        assert_eq!(find_opcode("ADDz"), None);
        assert_eq!(find_opcode("ADDkk"), None);
    }
}
