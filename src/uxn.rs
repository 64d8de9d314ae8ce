use crate::device::DeviceBus;
use crate::memory::{Ram, PAGE_PROGRAM};
use crate::ops;
use crate::stack::Stack;

/// The whole machine: memory, both stacks, the device page/table, and
/// the program counter. Threaded explicitly through every operation
/// rather than kept as process-wide global state, since there is only
/// ever one instance per process and an explicit value composes better
/// with the host adapters (console, screen, ...) than a static would.
pub struct Uxn {
    pub ram: Ram,
    pub wst: Stack,
    pub rst: Stack,
    pub devices: DeviceBus,
    pub pc: u16,
    pub halt: Option<u8>,
}

impl Uxn {
    pub fn new() -> Self {
        Uxn {
            ram: Ram::new(),
            wst: Stack::new(),
            rst: Stack::new(),
            devices: DeviceBus::new(),
            pc: 0,
            halt: None,
        }
    }

    fn zero(&mut self, soft: bool) {
        self.ram.zero(if soft { PAGE_PROGRAM } else { 0 });
        self.devices.dat = [0; 256];
        self.wst.ptr = 0;
        self.rst.ptr = 0;
    }

    /// Cold boot: zero everything, load `rom` at [`PAGE_PROGRAM`].
    pub fn boot(&mut self, rom: &[u8]) {
        self.zero(false);
        self.ram.load_rom(rom);
        self.halt = None;
    }

    /// Soft reboot: zero the device page and RAM above [`PAGE_PROGRAM`],
    /// reload `rom`, and immediately run the reset vector.
    pub fn reboot(&mut self, rom: &[u8]) {
        self.zero(true);
        self.ram.load_rom(rom);
        self.halt = None;
        self.eval(PAGE_PROGRAM);
    }

    /// Runs from `vector` until BRK or the halt flag (device byte 0x0F)
    /// is set. Returns `false` if `vector` is 0 or the machine is
    /// already halted, matching the host contract that a null vector
    /// means "this device has nothing wired up".
    pub fn eval(&mut self, vector: u16) -> bool {
        if vector == 0 || self.halt.is_some() {
            return false;
        }
        self.pc = vector;
        loop {
            let instr = self.ram.get(0, self.pc);
            self.pc = self.pc.wrapping_add(1);
            if !ops::execute(self, instr) {
                break;
            }
            if self.halt.is_some() {
                break;
            }
        }
        true
    }
}

impl Default for Uxn {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rom: &[u8]) -> Uxn {
        let mut u = Uxn::new();
        u.boot(rom);
        u.eval(PAGE_PROGRAM);
        u
    }

    #[test]
    fn add_literals() {
        let u = run(&[0x80, 0x03, 0x80, 0x04, 0x18, 0x00]);
        assert_eq!(u.wst.ptr, 1);
        assert_eq!(u.wst.dat[0], 7);
    }

    #[test]
    fn add2_literals() {
        let mut u = run(&[0xa0, 0x00, 0x01, 0xa0, 0x00, 0x02, 0x38, 0x00]);
        assert_eq!(u.wst.pop_short(), 3);
    }

    #[test]
    fn divide_by_zero_is_zero() {
        let u = run(&[0x80, 0x00, 0x80, 0xff, 0x1b, 0x00]);
        assert_eq!(u.wst.ptr, 1);
        assert_eq!(u.wst.dat[0], 0);
    }

    #[test]
    fn keep_mode_leaves_operands() {
        // #03 #04 ADDk BRK -> wst: 03 04 07
        let u = run(&[0x80, 0x03, 0x80, 0x04, 0x98, 0x00]);
        assert_eq!(u.wst.ptr, 3);
        assert_eq!(u.wst.dat[0], 3);
        assert_eq!(u.wst.dat[1], 4);
        assert_eq!(u.wst.dat[2], 7);
    }
}
