//! Two-pass translator: a single streaming pass emits bytes and
//! placeholder bytes for anything that cannot yet be resolved (forward
//! label references), tracking each placeholder as a [`Reference`];
//! a final resolution pass patches them in by rune-specific relocation.

mod error;
mod opcodes;

pub use error::{AsmError, AsmErrorKind};

use std::fs;
use std::path::{Path, PathBuf};

const RUNES: &str = "|$@&,_.-;=!?#\"%~:";

#[derive(Clone)]
struct Label {
    name: String,
    addr: u32,
    refs: u32,
}

#[derive(Clone)]
struct Macro {
    name: String,
    tokens: Vec<(String, usize)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RefKind {
    RelByte,
    ZeroPage,
    Absolute,
    RelShort,
}

#[derive(Clone)]
struct Reference {
    name: String,
    kind: RefKind,
    addr: u32,
    file: PathBuf,
    line: usize,
    scope: String,
}

pub struct Assembled {
    pub rom: Vec<u8>,
    pub symbols: Vec<(u16, String)>,
}

pub struct Assembler {
    mem: Vec<u8>,
    ptr: u32,
    length: u32,
    labels: Vec<Label>,
    macros: Vec<Macro>,
    refs: Vec<Reference>,
    scope: String,
    lambda_stack: Vec<u32>,
    lambda_counter: u32,
    file: PathBuf,
    line: usize,
}

pub fn assemble(path: &Path) -> Result<Assembled, AsmError> {
    let mut a = Assembler::new();
    a.process_file(path)?;
    a.resolve()?;
    a.review();
    let rom = a.mem[0x0100..a.length as usize].to_vec();
    let symbols = a.labels.iter().map(|l| (l.addr as u16, l.name.clone())).collect();
    Ok(Assembled { rom, symbols })
}

/// Serializes a symbol table the way the original tool's `.sym` files
/// are laid out: per label, a big-endian address followed by the
/// NUL-terminated name, in declaration order.
pub fn write_symbols(symbols: &[(u16, String)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (addr, name) in symbols {
        out.push((addr >> 8) as u8);
        out.push((addr & 0xff) as u8);
        out.extend_from_slice(name.as_bytes());
        out.push(0);
    }
    out
}

impl Assembler {
    fn new() -> Self {
        Assembler {
            mem: vec![0; 0x10000],
            ptr: 0,
            length: 0,
            labels: Vec::new(),
            macros: Vec::new(),
            refs: Vec::new(),
            scope: String::new(),
            lambda_stack: Vec::new(),
            lambda_counter: 0,
            file: PathBuf::new(),
            line: 1,
        }
    }

    fn err(&self, kind: AsmErrorKind, detail: impl Into<String>) -> AsmError {
        AsmError::new(kind, detail, &self.file, self.line, &self.scope)
    }

    fn process_file(&mut self, path: &Path) -> Result<(), AsmError> {
        let src = fs::read_to_string(path).map_err(|e| {
            AsmError::new(AsmErrorKind::Include, format!("{path:?}: {e}"), path, 0, &self.scope)
        })?;
        let saved_file = std::mem::replace(&mut self.file, path.to_path_buf());
        let saved_line = self.line;
        self.line = 1;
        let tokens = tokenize(&src);
        let result = self.process_tokens(&tokens);
        self.file = saved_file;
        self.line = saved_line;
        result
    }

    fn process_tokens(&mut self, tokens: &[(String, usize)]) -> Result<(), AsmError> {
        let mut i = 0;
        while i < tokens.len() {
            let (tok, line) = &tokens[i];
            self.line = *line;
            if tok.len() > 63 {
                return Err(self.err(AsmErrorKind::TokenTooLong, tok.as_str()));
            }
            if tok == "[" || tok == "]" {
                i += 1;
                continue;
            }
            if let Some(name) = tok.strip_prefix('%') {
                if i + 1 >= tokens.len() || tokens[i + 1].0 != "{" {
                    return Err(self.err(AsmErrorKind::OutOfRange, "macro missing body"));
                }
                let mut body = Vec::new();
                let mut j = i + 2;
                loop {
                    if j >= tokens.len() {
                        return Err(self.err(AsmErrorKind::UnmatchedBrace, "unterminated macro"));
                    }
                    if tokens[j].0 == "}" {
                        break;
                    }
                    body.push(tokens[j].clone());
                    j += 1;
                }
                self.define_macro(name, body)?;
                i = j + 1;
                continue;
            }
            if let Some(rest) = tok.strip_prefix('~') {
                let include_path = self.resolve_include_path(rest);
                self.process_file(&include_path)?;
                i += 1;
                continue;
            }
            self.process_token(tok)?;
            i += 1;
        }
        Ok(())
    }

    fn resolve_include_path(&self, rest: &str) -> PathBuf {
        match self.file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(rest),
            _ => PathBuf::from(rest),
        }
    }

    fn define_macro(&mut self, name: &str, tokens: Vec<(String, usize)>) -> Result<(), AsmError> {
        self.validate_name(name)?;
        if self.macros.iter().any(|m| m.name == name) {
            return Err(self.err(AsmErrorKind::Duplicate, name));
        }
        if self.macros.len() >= 256 {
            return Err(self.err(AsmErrorKind::TableFull, "macro table full"));
        }
        self.macros.push(Macro { name: name.to_string(), tokens });
        Ok(())
    }

    fn validate_name(&self, name: &str) -> Result<(), AsmError> {
        if name.is_empty() {
            return Err(self.err(AsmErrorKind::EmptyName, "empty name"));
        }
        let first = name.chars().next().unwrap();
        if RUNES.contains(first) || opcodes::is_hex(name) || opcodes::find_opcode(name).is_some() {
            return Err(self.err(AsmErrorKind::OpcodeCollision, name));
        }
        Ok(())
    }

    fn qualify(&self, name: &str) -> String {
        if let Some(rest) = name.strip_prefix('&') {
            format!("{}/{}", self.scope, rest)
        } else if let Some(rest) = name.strip_prefix('/') {
            format!("{}/{}", self.scope, rest)
        } else {
            name.to_string()
        }
    }

    fn lookup_label(&self, name: &str) -> Option<&Label> {
        let qualified = self.qualify(name);
        self.labels.iter().find(|l| l.name == qualified)
    }

    fn emit_byte(&mut self, b: u8) -> Result<(), AsmError> {
        if self.ptr < 0x0100 {
            return Err(self.err(AsmErrorKind::OutOfRange, "write before 0x0100"));
        }
        if self.ptr >= 0x10000 {
            return Err(self.err(AsmErrorKind::OutOfRange, "write beyond memory"));
        }
        self.mem[self.ptr as usize] = b;
        self.ptr += 1;
        self.length = self.length.max(self.ptr);
        Ok(())
    }

    fn emit_short(&mut self, v: u16) -> Result<(), AsmError> {
        self.emit_byte((v >> 8) as u8)?;
        self.emit_byte((v & 0xff) as u8)
    }

    fn add_ref(&mut self, name: &str, kind: RefKind) -> Result<(), AsmError> {
        let qualified = self.qualify(name);
        let addr = self.ptr;
        match kind {
            RefKind::RelByte | RefKind::ZeroPage => self.emit_byte(0xff)?,
            RefKind::Absolute | RefKind::RelShort => self.emit_short(0xffff)?,
        }
        self.refs.push(Reference {
            name: qualified,
            kind,
            addr,
            file: self.file.clone(),
            line: self.line,
            scope: self.scope.clone(),
        });
        Ok(())
    }

    fn pad(&mut self, spec: &str, relative: bool) -> Result<(), AsmError> {
        let target = if opcodes::is_hex(spec) && (spec.len() == 2 || spec.len() == 4) {
            u32::from_str_radix(spec, 16).unwrap()
        } else {
            self.lookup_label(spec).map(|l| l.addr).ok_or_else(|| self.err(AsmErrorKind::UnknownReference, spec))?
        };
        let new_ptr = if relative { self.ptr + target } else { target };
        if new_ptr < self.length && self.length > 0 {
            return Err(self.err(AsmErrorKind::OutOfRange, "pad rewinds below current length"));
        }
        if new_ptr < 0x0100 || new_ptr > 0xffff {
            return Err(self.err(AsmErrorKind::OutOfRange, "pad out of range"));
        }
        self.ptr = new_ptr;
        Ok(())
    }

    fn declare_label(&mut self, name: &str) -> Result<(), AsmError> {
        self.validate_name(name)?;
        if self.labels.iter().any(|l| l.name == name) {
            return Err(self.err(AsmErrorKind::Duplicate, name));
        }
        if self.labels.len() >= 1024 {
            return Err(self.err(AsmErrorKind::TableFull, "label table full"));
        }
        self.labels.push(Label { name: name.to_string(), addr: self.ptr, refs: 0 });
        self.scope = name.to_string();
        Ok(())
    }

    fn declare_sublabel(&mut self, name: &str) -> Result<(), AsmError> {
        if name.is_empty() {
            return Err(self.err(AsmErrorKind::EmptyName, "empty name"));
        }
        let qualified = format!("{}/{}", self.scope, name);
        if self.labels.iter().any(|l| l.name == qualified) {
            return Err(self.err(AsmErrorKind::Duplicate, &qualified));
        }
        if self.labels.len() >= 1024 {
            return Err(self.err(AsmErrorKind::TableFull, "label table full"));
        }
        self.labels.push(Label { name: qualified, addr: self.ptr, refs: 0 });
        Ok(())
    }

    fn declare_lambda(&mut self) -> Result<(), AsmError> {
        let id = self.lambda_stack.pop().ok_or_else(|| self.err(AsmErrorKind::UnmatchedBrace, "} without {"))?;
        let name = lambda_name(id);
        if self.labels.len() >= 1024 {
            return Err(self.err(AsmErrorKind::TableFull, "label table full"));
        }
        self.labels.push(Label { name, addr: self.ptr, refs: 0 });
        Ok(())
    }

    fn open_lambda(&mut self) -> Result<(), AsmError> {
        let id = self.lambda_counter;
        self.lambda_counter += 1;
        self.lambda_stack.push(id);
        self.emit_byte(0x60)?;
        self.add_ref(&lambda_name(id), RefKind::RelShort)
    }

    fn process_token(&mut self, tok: &str) -> Result<(), AsmError> {
        if tok.is_empty() {
            return Ok(());
        }
        let mut chars = tok.chars();
        let rune = chars.next().unwrap();
        let rest = chars.as_str();
        match rune {
            '|' => return self.pad(rest, false),
            '$' => return self.pad(rest, true),
            '@' => return self.declare_label(rest),
            '&' => return self.declare_sublabel(rest),
            '~' => unreachable!("includes are handled in process_tokens"),
            '%' => unreachable!("macros are handled in process_tokens"),
            ',' => {
                self.emit_byte(0x80)?;
                return self.add_ref(rest, RefKind::RelByte);
            }
            '_' => return self.add_ref(rest, RefKind::RelByte),
            '.' => {
                self.emit_byte(0x80)?;
                return self.add_ref(rest, RefKind::ZeroPage);
            }
            '-' => return self.add_ref(rest, RefKind::ZeroPage),
            ';' => {
                self.emit_byte(0xa0)?;
                return self.add_ref(rest, RefKind::Absolute);
            }
            '=' => return self.add_ref(rest, RefKind::Absolute),
            ':' => {
                log::warn!("{}:{}: ':' is a deprecated alias for '='", self.file.display(), self.line);
                return self.add_ref(rest, RefKind::Absolute);
            }
            '?' => {
                self.emit_byte(0x20)?;
                return self.add_ref(rest, RefKind::RelShort);
            }
            '!' => {
                self.emit_byte(0x40)?;
                return self.add_ref(rest, RefKind::RelShort);
            }
            '#' => {
                if opcodes::is_hex(rest) && rest.len() == 2 {
                    self.emit_byte(0x80)?;
                    return self.emit_byte(u8::from_str_radix(rest, 16).unwrap());
                } else if opcodes::is_hex(rest) && rest.len() == 4 {
                    self.emit_byte(0xa0)?;
                    return self.emit_short(u16::from_str_radix(rest, 16).unwrap());
                }
                return Err(self.err(AsmErrorKind::OutOfRange, format!("invalid hex literal #{rest}")));
            }
            '"' => {
                for b in rest.bytes() {
                    self.emit_byte(b)?;
                }
                return Ok(());
            }
            _ => {}
        }

        if tok == "{" {
            return self.open_lambda();
        }
        if tok == "}" {
            return self.declare_lambda();
        }

        if let Some(byte) = opcodes::find_opcode(tok) {
            return self.emit_byte(byte);
        }

        if opcodes::is_hex(tok) && tok.len() == 2 {
            return self.emit_byte(u8::from_str_radix(tok, 16).unwrap());
        }
        if opcodes::is_hex(tok) && tok.len() == 4 {
            return self.emit_short(u16::from_str_radix(tok, 16).unwrap());
        }

        if let Some(m) = self.macros.iter().find(|m| m.name == tok) {
            let body = m.tokens.clone();
            return self.process_tokens(&body);
        }

        // Bare symbol: an implicit call, encoded exactly like `!`/`?`
        // but with the JSI opcode so the return address is pushed.
        self.emit_byte(0x60)?;
        self.add_ref(tok, RefKind::RelShort)
    }

    fn resolve(&mut self) -> Result<(), AsmError> {
        for r in &self.refs {
            let Some(label) = self.labels.iter_mut().find(|l| l.name == r.name) else {
                return Err(AsmError::new(AsmErrorKind::UnknownReference, &r.name, &r.file, r.line, &r.scope));
            };
            label.refs += 1;
            let target = label.addr as i64;
            match r.kind {
                RefKind::RelByte => {
                    let rel = target - r.addr as i64 - 2;
                    if !(-128..=127).contains(&rel) {
                        return Err(AsmError::new(AsmErrorKind::ReferenceOutOfRange, &r.name, &r.file, r.line, &r.scope));
                    }
                    self.mem[r.addr as usize] = rel as i8 as u8;
                }
                RefKind::ZeroPage => {
                    self.mem[r.addr as usize] = target as u8;
                }
                RefKind::Absolute => {
                    self.mem[r.addr as usize] = (target >> 8) as u8;
                    self.mem[r.addr as usize + 1] = (target & 0xff) as u8;
                }
                RefKind::RelShort => {
                    let rel = (target - r.addr as i64 - 2) as u16;
                    self.mem[r.addr as usize] = (rel >> 8) as u8;
                    self.mem[r.addr as usize + 1] = (rel & 0xff) as u8;
                }
            }
        }
        Ok(())
    }

    fn review(&self) {
        for label in &self.labels {
            let short_name = label.name.rsplit('/').next().unwrap_or(&label.name);
            if label.refs == 0 && short_name.chars().next().is_some_and(|c| c.is_lowercase()) {
                log::warn!("{}: unused label {}", self.file.display(), label.name);
            }
        }
    }
}

fn lambda_name(id: u32) -> String {
    format!("\u{3bb}{id:02x}")
}

fn tokenize(src: &str) -> Vec<(String, usize)> {
    let mut tokens = Vec::new();
    let mut line = 1usize;
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' {
            let mut depth = 1;
            i += 1;
            while i < chars.len() && depth > 0 {
                match chars[i] {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    '\n' => line += 1,
                    _ => {}
                }
                i += 1;
            }
            continue;
        }
        let start_line = line;
        let start = i;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        let tok: String = chars[start..i].iter().collect();
        tokens.push((tok, start_line));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn assemble_src(src: &str) -> Assembled {
        let mut f = tempfile::Builder::new().suffix(".tal").tempfile().unwrap();
        f.write_all(src.as_bytes()).unwrap();
        assemble(f.path()).unwrap()
    }

    #[test]
    fn add_literals() {
        let a = assemble_src("|0100 LIT 03 LIT 04 ADD BRK");
        assert_eq!(a.rom, vec![0x80, 0x03, 0x80, 0x04, 0x18, 0x00]);
    }

    #[test]
    fn relative_reference_round_trips() {
        let a = assemble_src("|0100 @loop #01 INC DUP #05 NEQ ?loop BRK");
        assert_eq!(a.rom.last(), Some(&0x00));
        assert_eq!(a.symbols.iter().find(|(_, n)| n == "loop").map(|(addr, _)| *addr), Some(0x0100));
    }

    #[test]
    fn sublabel_scoping() {
        let a = assemble_src("|0100 @foo &bar #01 POP BRK");
        assert!(a.symbols.iter().any(|(_, n)| n == "foo/bar"));
    }

    #[test]
    fn macro_expansion() {
        let a = assemble_src("%two-bytes { #01 #02 } |0100 two-bytes BRK");
        assert_eq!(a.rom, vec![0x80, 0x01, 0x80, 0x02, 0x00]);
    }

    #[test]
    fn unknown_reference_errors() {
        let mut f = tempfile::Builder::new().suffix(".tal").tempfile().unwrap();
        f.write_all(b"|0100 ;missing BRK").unwrap();
        assert!(assemble(f.path()).is_err());
    }
}
