use crate::device::{Device, DeviceCtx};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};

/// Ports 0xA/0xB: one instance per file device. The filename is read
/// from a NUL-terminated string in VM memory pointed to by the
/// zero-page address latched at the device's 0x8/0x9 ports; triggering
/// 0xD reads from disk into memory, 0xF writes memory to disk. The
/// first write to a given device truncates; later writes append,
/// tracked with `position`.
pub struct FileDevice {
    position: u64,
}

impl FileDevice {
    pub fn new() -> Box<Self> {
        Box::new(FileDevice { position: 0 })
    }

    fn read_name(ram: &crate::memory::Ram, name_addr: u16) -> String {
        let mut bytes = Vec::new();
        let mut addr = name_addr;
        loop {
            let b = ram.get(0, addr);
            if b == 0 || bytes.len() > 1024 {
                break;
            }
            bytes.push(b);
            addr = addr.wrapping_add(1);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for FileDevice {
    fn default() -> Self {
        FileDevice { position: 0 }
    }
}

impl Device for FileDevice {
    fn dei(&mut self, _ctx: &mut DeviceCtx, port: u8, dat: &[u8; 256]) -> u8 {
        dat[port as usize]
    }

    fn deo(&mut self, ctx: &mut DeviceCtx, port: u8, dat: &mut [u8; 256]) {
        let base = port & 0xf0;
        let rel = port & 0x0f;
        if rel != 0xd && rel != 0xf {
            return;
        }
        let name_addr = ((dat[(base | 0x08) as usize] as u16) << 8) | dat[(base | 0x09) as usize] as u16;
        let name = Self::read_name(ctx.ram, name_addr);
        let length = ((dat[(base | 0x02) as usize] as u16) << 8) | dat[(base | 0x03) as usize] as u16;
        let mem_addr = ((dat[(base | 0x04) as usize] as u16) << 8) | dat[(base | 0x05) as usize] as u16;

        let result = if rel == 0xd {
            self.load(&name, ctx, mem_addr, length)
        } else {
            self.store(&name, ctx, mem_addr, length)
        };
        let n = result.unwrap_or(0) as u16;
        dat[(base | 0x02) as usize] = (n >> 8) as u8;
        dat[(base | 0x03) as usize] = (n & 0xff) as u8;
    }
}

impl FileDevice {
    fn load(&mut self, name: &str, ctx: &mut DeviceCtx, addr: u16, length: u16) -> std::io::Result<u32> {
        let mut f = std::fs::File::open(name)?;
        f.seek(SeekFrom::Start(self.position))?;
        let mut buf = vec![0u8; length as usize];
        let n = f.read(&mut buf)?;
        for (i, b) in buf[..n].iter().enumerate() {
            ctx.ram.set(0, addr.wrapping_add(i as u16), *b);
        }
        self.position += n as u64;
        Ok(n as u32)
    }

    fn store(&mut self, name: &str, ctx: &mut DeviceCtx, addr: u16, length: u16) -> std::io::Result<u32> {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(self.position == 0)
            .append(self.position != 0)
            .open(name)?;
        let mut buf = Vec::with_capacity(length as usize);
        for i in 0..length {
            buf.push(ctx.ram.get(0, addr.wrapping_add(i)));
        }
        f.write_all(&buf)?;
        self.position += buf.len() as u64;
        Ok(buf.len() as u32)
    }
}
