use crate::device::{Device, DeviceCtx};
use std::io::Write;

/// Port 0x1: stdin is fed in by the host loop writing to port 0x12 and
/// invoking the console vector; DEO to 0x18/0x19 write one byte to
/// stdout/stderr respectively.
pub struct Console;

impl Console {
    pub fn new() -> Box<Self> {
        Box::new(Console)
    }
}

impl Default for Console {
    fn default() -> Self {
        Console
    }
}

impl Device for Console {
    fn dei(&mut self, _ctx: &mut DeviceCtx, port: u8, dat: &[u8; 256]) -> u8 {
        dat[port as usize]
    }

    fn deo(&mut self, _ctx: &mut DeviceCtx, port: u8, dat: &mut [u8; 256]) {
        match port {
            0x18 => {
                print!("{}", dat[0x18] as char);
                let _ = std::io::stdout().flush();
            }
            0x19 => {
                eprint!("{}", dat[0x19] as char);
                let _ = std::io::stderr().flush();
            }
            _ => {}
        }
    }
}
