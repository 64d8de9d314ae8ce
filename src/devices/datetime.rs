use crate::device::{Device, DeviceCtx};
use chrono::{Datelike, Local, Timelike};

/// Port 0xC: read-only wall clock, sampled fresh on every DEI so a
/// program that polls it observes a live clock rather than a value
/// latched at boot.
pub struct DateTime;

impl DateTime {
    pub fn new() -> Box<Self> {
        Box::new(DateTime)
    }
}

impl Default for DateTime {
    fn default() -> Self {
        DateTime
    }
}

impl Device for DateTime {
    fn dei(&mut self, _ctx: &mut DeviceCtx, port: u8, dat: &[u8; 256]) -> u8 {
        let now = Local::now();
        let rel = port & 0x0f;
        match rel {
            0x0 => ((now.year() as u16) >> 8) as u8,
            0x1 => now.year() as u8,
            0x2 => now.month0() as u8,
            0x3 => now.day() as u8,
            0x4 => now.hour() as u8,
            0x5 => now.minute() as u8,
            0x6 => now.second() as u8,
            0x7 => now.weekday().num_days_from_sunday() as u8,
            0x8 => ((now.ordinal0() as u16) >> 8) as u8,
            0x9 => now.ordinal0() as u8,
            _ => dat[port as usize],
        }
    }

    fn deo(&mut self, _ctx: &mut DeviceCtx, _port: u8, _dat: &mut [u8; 256]) {}
}
