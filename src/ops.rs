//! Opcode execution: one function per instruction byte, dispatched by
//! base operation (low 5 bits) with the three mode bits (keep, return,
//! short) read once and threaded through as plain booleans rather than
//! expanded into 256 monomorphic variants.

use crate::device;
use crate::stack::Stack;
use crate::uxn::Uxn;

/// Executes one instruction fetched at `uxn.pc` (already advanced past
/// the opcode byte by the caller). Returns `false` on BRK, meaning the
/// current `eval` should stop; `true` otherwise.
pub fn execute(uxn: &mut Uxn, instr: u8) -> bool {
    let keep = instr & 0x80 != 0;
    let ret = instr & 0x40 != 0;
    let short = instr & 0x20 != 0;
    let op = instr & 0x1f;

    if op == 0 {
        return immediate(uxn, keep, ret, short);
    }
    basic(uxn, op, keep, ret, short);
    true
}

fn fetch_byte(uxn: &mut Uxn) -> u8 {
    let b = uxn.ram.get(0, uxn.pc);
    uxn.pc = uxn.pc.wrapping_add(1);
    b
}

fn fetch_short(uxn: &mut Uxn) -> u16 {
    let hi = fetch_byte(uxn);
    let lo = fetch_byte(uxn);
    ((hi as u16) << 8) | lo as u16
}

fn immediate(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) -> bool {
    if !keep {
        match (ret, short) {
            (false, false) => return false, // BRK
            (false, true) => {
                // JCI: pop one byte from wst; branch on non-zero.
                let cond = uxn.wst.pop_byte();
                let rel = fetch_short(uxn) as i16;
                if cond != 0 {
                    uxn.pc = uxn.pc.wrapping_add(rel as u16);
                }
            }
            (true, false) => {
                // JMI
                let rel = fetch_short(uxn) as i16;
                uxn.pc = uxn.pc.wrapping_add(rel as u16);
            }
            (true, true) => {
                // JSI
                let ret_addr = uxn.pc.wrapping_add(2);
                uxn.rst.push_short(ret_addr);
                let rel = fetch_short(uxn) as i16;
                uxn.pc = uxn.pc.wrapping_add(rel as u16);
            }
        }
    } else {
        match (ret, short) {
            (false, false) => {
                let v = fetch_byte(uxn);
                uxn.wst.push_byte(v);
            }
            (false, true) => {
                let v = fetch_short(uxn);
                uxn.wst.push_short(v);
            }
            (true, false) => {
                let v = fetch_byte(uxn);
                uxn.rst.push_byte(v);
            }
            (true, true) => {
                let v = fetch_short(uxn);
                uxn.rst.push_short(v);
            }
        }
    }
    true
}

/// Selects the addressed stack (return mode picks `rst`) and the other
/// one (used by STH/JSR).
fn pick<'a>(uxn: &'a mut Uxn, ret: bool) -> (&'a mut Stack, &'a mut Stack) {
    if ret {
        (&mut uxn.rst, &mut uxn.wst)
    } else {
        (&mut uxn.wst, &mut uxn.rst)
    }
}

fn basic(uxn: &mut Uxn, op: u8, keep: bool, ret: bool, short: bool) {
    match op {
        1 => inc(uxn, keep, ret, short),
        2 => pop(uxn, keep, ret, short),
        3 => nip(uxn, keep, ret, short),
        4 => swp(uxn, keep, ret, short),
        5 => rot(uxn, keep, ret, short),
        6 => dup(uxn, keep, ret, short),
        7 => ovr(uxn, keep, ret, short),
        8 => cmp(uxn, keep, ret, short, |a, b| a == b),
        9 => cmp(uxn, keep, ret, short, |a, b| a != b),
        10 => cmp(uxn, keep, ret, short, |a, b| a > b),
        11 => cmp(uxn, keep, ret, short, |a, b| a < b),
        12 => jmp(uxn, keep, ret, short),
        13 => jcn(uxn, keep, ret, short),
        14 => jsr(uxn, keep, ret, short),
        15 => sth(uxn, keep, ret, short),
        16 => ldz(uxn, keep, ret, short),
        17 => stz(uxn, keep, ret, short),
        18 => ldr(uxn, keep, ret, short),
        19 => str_(uxn, keep, ret, short),
        20 => lda(uxn, keep, ret, short),
        21 => sta(uxn, keep, ret, short),
        22 => dei_op(uxn, keep, ret, short),
        23 => deo_op(uxn, keep, ret, short),
        24 => arith(uxn, keep, ret, short, u32::wrapping_add),
        25 => arith(uxn, keep, ret, short, u32::wrapping_sub),
        26 => arith(uxn, keep, ret, short, u32::wrapping_mul),
        27 => divide(uxn, keep, ret, short),
        28 => arith(uxn, keep, ret, short, |a, b| a & b),
        29 => arith(uxn, keep, ret, short, |a, b| a | b),
        30 => arith(uxn, keep, ret, short, |a, b| a ^ b),
        31 => sft(uxn, keep, ret, short),
        _ => unreachable!("base opcode {op} out of range"),
    }
}

fn inc(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        let v = if keep { let mut k = s.ptr; s.kpop_short(&mut k) } else { s.pop_short() };
        s.push_short(v.wrapping_add(1));
    } else {
        let v = if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() };
        s.push_byte(v.wrapping_add(1));
    }
}

fn pop(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    if keep {
        return;
    }
    let (s, _) = pick(uxn, ret);
    if short {
        s.pop_short();
    } else {
        s.pop_byte();
    }
}

fn nip(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        if keep {
            let mut k = s.ptr;
            let b = s.kpop_short(&mut k);
            s.kpop_short(&mut k);
            s.push_short(b);
        } else {
            let b = s.pop_short();
            s.pop_short();
            s.push_short(b);
        }
    } else if keep {
        let mut k = s.ptr;
        let b = s.kpop_byte(&mut k);
        s.kpop_byte(&mut k);
        s.push_byte(b);
    } else {
        let b = s.pop_byte();
        s.pop_byte();
        s.push_byte(b);
    }
}

fn swp(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        if keep {
            let mut k = s.ptr;
            let b = s.kpop_short(&mut k);
            let a = s.kpop_short(&mut k);
            s.push_short(b);
            s.push_short(a);
        } else {
            let b = s.pop_short();
            let a = s.pop_short();
            s.push_short(b);
            s.push_short(a);
        }
    } else if keep {
        let mut k = s.ptr;
        let b = s.kpop_byte(&mut k);
        let a = s.kpop_byte(&mut k);
        s.push_byte(b);
        s.push_byte(a);
    } else {
        let b = s.pop_byte();
        let a = s.pop_byte();
        s.push_byte(b);
        s.push_byte(a);
    }
}

fn rot(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        if keep {
            let mut k = s.ptr;
            let c = s.kpop_short(&mut k);
            let b = s.kpop_short(&mut k);
            let a = s.kpop_short(&mut k);
            s.push_short(b);
            s.push_short(c);
            s.push_short(a);
        } else {
            let c = s.pop_short();
            let b = s.pop_short();
            let a = s.pop_short();
            s.push_short(b);
            s.push_short(c);
            s.push_short(a);
        }
    } else if keep {
        let mut k = s.ptr;
        let c = s.kpop_byte(&mut k);
        let b = s.kpop_byte(&mut k);
        let a = s.kpop_byte(&mut k);
        s.push_byte(b);
        s.push_byte(c);
        s.push_byte(a);
    } else {
        let c = s.pop_byte();
        let b = s.pop_byte();
        let a = s.pop_byte();
        s.push_byte(b);
        s.push_byte(c);
        s.push_byte(a);
    }
}

fn dup(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        let v = if keep { let mut k = s.ptr; s.kpop_short(&mut k) } else { s.pop_short() };
        s.push_short(v);
        s.push_short(v);
    } else {
        let v = if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() };
        s.push_byte(v);
        s.push_byte(v);
    }
}

fn ovr(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        if keep {
            let mut k = s.ptr;
            let b = s.kpop_short(&mut k);
            let a = s.kpop_short(&mut k);
            s.push_short(a);
            s.push_short(b);
            s.push_short(a);
        } else {
            let b = s.pop_short();
            let a = s.pop_short();
            s.push_short(a);
            s.push_short(b);
            s.push_short(a);
        }
    } else if keep {
        let mut k = s.ptr;
        let b = s.kpop_byte(&mut k);
        let a = s.kpop_byte(&mut k);
        s.push_byte(a);
        s.push_byte(b);
        s.push_byte(a);
    } else {
        let b = s.pop_byte();
        let a = s.pop_byte();
        s.push_byte(a);
        s.push_byte(b);
        s.push_byte(a);
    }
}

fn cmp(uxn: &mut Uxn, keep: bool, ret: bool, short: bool, f: fn(u32, u32) -> bool) {
    let (s, _) = pick(uxn, ret);
    let (a, b) = if short {
        if keep {
            let mut k = s.ptr;
            let b = s.kpop_short(&mut k) as u32;
            let a = s.kpop_short(&mut k) as u32;
            (a, b)
        } else {
            let b = s.pop_short() as u32;
            let a = s.pop_short() as u32;
            (a, b)
        }
    } else if keep {
        let mut k = s.ptr;
        let b = s.kpop_byte(&mut k) as u32;
        let a = s.kpop_byte(&mut k) as u32;
        (a, b)
    } else {
        let b = s.pop_byte() as u32;
        let a = s.pop_byte() as u32;
        (a, b)
    };
    s.push_byte(f(a, b) as u8);
}

fn jmp(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        let addr = if keep { let mut k = s.ptr; s.kpop_short(&mut k) } else { s.pop_short() };
        uxn.pc = addr;
    } else {
        let rel = (if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() }) as i8;
        uxn.pc = uxn.pc.wrapping_add(rel as u16);
    }
}

fn jcn(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    let (cond, target_rel_or_abs) = if short {
        if keep {
            let mut k = s.ptr;
            let addr = s.kpop_short(&mut k);
            let cond = s.kpop_byte(&mut k);
            (cond, addr)
        } else {
            let addr = s.pop_short();
            let cond = s.pop_byte();
            (cond, addr)
        }
    } else if keep {
        let mut k = s.ptr;
        let rel = s.kpop_byte(&mut k);
        let cond = s.kpop_byte(&mut k);
        (cond, rel as u16)
    } else {
        let rel = s.pop_byte();
        let cond = s.pop_byte();
        (cond, rel as u16)
    };
    if cond != 0 {
        if short {
            uxn.pc = target_rel_or_abs;
        } else {
            uxn.pc = uxn.pc.wrapping_add((target_rel_or_abs as u8 as i8) as u16);
        }
    }
}

fn jsr(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let pc = uxn.pc;
    let (s, other) = pick(uxn, ret);
    let target = if short {
        if keep { let mut k = s.ptr; s.kpop_short(&mut k) } else { s.pop_short() }
    } else {
        let rel = (if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() }) as i8;
        pc.wrapping_add(rel as u16)
    };
    other.push_short(pc);
    uxn.pc = target;
}

fn sth(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, other) = pick(uxn, ret);
    if short {
        let v = if keep { let mut k = s.ptr; s.kpop_short(&mut k) } else { s.pop_short() };
        other.push_short(v);
    } else {
        let v = if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() };
        other.push_byte(v);
    }
}

fn ldz(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    let addr = (if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() }) as u16;
    if short {
        let v = uxn.ram.get_short(0, addr);
        let (s, _) = pick(uxn, ret);
        s.push_short(v);
    } else {
        let v = uxn.ram.get(0, addr);
        let (s, _) = pick(uxn, ret);
        s.push_byte(v);
    }
}

fn stz(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        let (addr, val) = if keep {
            let mut k = s.ptr;
            let addr = s.kpop_byte(&mut k) as u16;
            let val = s.kpop_short(&mut k);
            (addr, val)
        } else {
            let addr = s.pop_byte() as u16;
            let val = s.pop_short();
            (addr, val)
        };
        uxn.ram.set_short(0, addr, val);
    } else {
        let (addr, val) = if keep {
            let mut k = s.ptr;
            let addr = s.kpop_byte(&mut k) as u16;
            let val = s.kpop_byte(&mut k);
            (addr, val)
        } else {
            let addr = s.pop_byte() as u16;
            let val = s.pop_byte();
            (addr, val)
        };
        uxn.ram.set(0, addr, val);
    }
}

fn ldr(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let pc = uxn.pc;
    let (s, _) = pick(uxn, ret);
    let rel = (if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() }) as i8;
    let addr = pc.wrapping_add(rel as u16);
    if short {
        let v = uxn.ram.get_short(0, addr);
        let (s, _) = pick(uxn, ret);
        s.push_short(v);
    } else {
        let v = uxn.ram.get(0, addr);
        let (s, _) = pick(uxn, ret);
        s.push_byte(v);
    }
}

fn str_(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let pc = uxn.pc;
    let (s, _) = pick(uxn, ret);
    if short {
        let (rel, val) = if keep {
            let mut k = s.ptr;
            let rel = s.kpop_byte(&mut k) as i8;
            let val = s.kpop_short(&mut k);
            (rel, val)
        } else {
            let rel = s.pop_byte() as i8;
            let val = s.pop_short();
            (rel, val)
        };
        let addr = pc.wrapping_add(rel as u16);
        uxn.ram.set_short(0, addr, val);
    } else {
        let (rel, val) = if keep {
            let mut k = s.ptr;
            let rel = s.kpop_byte(&mut k) as i8;
            let val = s.kpop_byte(&mut k);
            (rel, val)
        } else {
            let rel = s.pop_byte() as i8;
            let val = s.pop_byte();
            (rel, val)
        };
        let addr = pc.wrapping_add(rel as u16);
        uxn.ram.set(0, addr, val);
    }
}

fn lda(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    let addr = if keep { let mut k = s.ptr; s.kpop_short(&mut k) } else { s.pop_short() };
    if short {
        let v = uxn.ram.get_short(0, addr);
        let (s, _) = pick(uxn, ret);
        s.push_short(v);
    } else {
        let v = uxn.ram.get(0, addr);
        let (s, _) = pick(uxn, ret);
        s.push_byte(v);
    }
}

fn sta(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        let (addr, val) = if keep {
            let mut k = s.ptr;
            let addr = s.kpop_short(&mut k);
            let val = s.kpop_short(&mut k);
            (addr, val)
        } else {
            let addr = s.pop_short();
            let val = s.pop_short();
            (addr, val)
        };
        uxn.ram.set_short(0, addr, val);
    } else {
        let (addr, val) = if keep {
            let mut k = s.ptr;
            let addr = s.kpop_short(&mut k);
            let val = s.kpop_byte(&mut k);
            (addr, val)
        } else {
            let addr = s.pop_short();
            let val = s.pop_byte();
            (addr, val)
        };
        uxn.ram.set(0, addr, val);
    }
}

fn dei_op(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    let addr = if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() };
    if short {
        let hi = device::dei(uxn, addr);
        let lo = device::dei(uxn, addr.wrapping_add(1));
        let v = ((hi as u16) << 8) | lo as u16;
        let (s, _) = pick(uxn, ret);
        s.push_short(v);
    } else {
        let v = device::dei(uxn, addr);
        let (s, _) = pick(uxn, ret);
        s.push_byte(v);
    }
}

fn deo_op(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        let (addr, val) = if keep {
            let mut k = s.ptr;
            let addr = s.kpop_byte(&mut k);
            let val = s.kpop_short(&mut k);
            (addr, val)
        } else {
            let addr = s.pop_byte();
            let val = s.pop_short();
            (addr, val)
        };
        device::deo(uxn, addr, (val >> 8) as u8);
        device::deo(uxn, addr.wrapping_add(1), (val & 0xff) as u8);
    } else {
        let (addr, val) = if keep {
            let mut k = s.ptr;
            let addr = s.kpop_byte(&mut k);
            let val = s.kpop_byte(&mut k);
            (addr, val)
        } else {
            let addr = s.pop_byte();
            let val = s.pop_byte();
            (addr, val)
        };
        device::deo(uxn, addr, val);
    }
}

fn arith(uxn: &mut Uxn, keep: bool, ret: bool, short: bool, f: fn(u32, u32) -> u32) {
    let (s, _) = pick(uxn, ret);
    if short {
        let (a, b) = if keep {
            let mut k = s.ptr;
            let b = s.kpop_short(&mut k) as u32;
            let a = s.kpop_short(&mut k) as u32;
            (a, b)
        } else {
            let b = s.pop_short() as u32;
            let a = s.pop_short() as u32;
            (a, b)
        };
        s.push_short(f(a, b) as u16);
    } else {
        let (a, b) = if keep {
            let mut k = s.ptr;
            let b = s.kpop_byte(&mut k) as u32;
            let a = s.kpop_byte(&mut k) as u32;
            (a, b)
        } else {
            let b = s.pop_byte() as u32;
            let a = s.pop_byte() as u32;
            (a, b)
        };
        s.push_byte(f(a, b) as u8);
    }
}

fn divide(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    if short {
        let (a, b) = if keep {
            let mut k = s.ptr;
            let b = s.kpop_short(&mut k);
            let a = s.kpop_short(&mut k);
            (a, b)
        } else {
            let b = s.pop_short();
            let a = s.pop_short();
            (a, b)
        };
        s.push_short(if b == 0 { 0 } else { a / b });
    } else {
        let (a, b) = if keep {
            let mut k = s.ptr;
            let b = s.kpop_byte(&mut k);
            let a = s.kpop_byte(&mut k);
            (a, b)
        } else {
            let b = s.pop_byte();
            let a = s.pop_byte();
            (a, b)
        };
        s.push_byte(if b == 0 { 0 } else { a / b });
    }
}

fn sft(uxn: &mut Uxn, keep: bool, ret: bool, short: bool) {
    let (s, _) = pick(uxn, ret);
    let shift = if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() };
    let right = shift & 0x0f;
    let left = (shift >> 4) & 0x0f;
    if short {
        let v = if keep { let mut k = s.ptr; s.kpop_short(&mut k) } else { s.pop_short() };
        s.push_short((v >> right) << left);
    } else {
        let v = if keep { let mut k = s.ptr; s.kpop_byte(&mut k) } else { s.pop_byte() };
        s.push_byte((v >> right) << left);
    }
}
