use crate::device::{Device, DeviceCtx};
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::time::Duration;

/// Ports 0x3-0x6 (AUDIO-0..3): a minimal tone generator, not the full
/// ADSR/sample-playback engine the original supports. A non-zero
/// volume write plays a short sine tone at the pitch latched in the
/// device's own pitch port; enough to exercise the port contract
/// without building a sampler.
pub struct Audio {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
}

impl Audio {
    pub fn new() -> Box<Self> {
        let (stream, handle) = OutputStream::try_default().expect("no audio output device");
        Box::new(Audio { _stream: stream, handle, sink: None })
    }

    fn pitch_to_freq(pitch: u8) -> f32 {
        // Pitch 0 is silence in the original device; otherwise treat the
        // low 7 bits as a MIDI-ish note number around A4 (69).
        let note = (pitch & 0x7f) as f32;
        440.0 * 2f32.powf((note - 69.0) / 12.0)
    }
}

impl Device for Audio {
    fn dei(&mut self, _ctx: &mut DeviceCtx, port: u8, dat: &[u8; 256]) -> u8 {
        dat[port as usize]
    }

    fn deo(&mut self, _ctx: &mut DeviceCtx, port: u8, dat: &mut [u8; 256]) {
        let base = port & 0xf0;
        let rel = port & 0x0f;
        if rel != 0x4 {
            return; // only the volume port triggers playback
        }
        let volume = dat[(base | 0x4) as usize];
        if volume == 0 {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            return;
        }
        let pitch = dat[(base | 0x0f) as usize];
        let freq = Self::pitch_to_freq(pitch);
        if let Ok(sink) = Sink::try_new(&self.handle) {
            sink.set_volume(volume as f32 / 255.0);
            let tone = SineWave::new(freq).take_duration(Duration::from_millis(150));
            sink.append(tone);
            self.sink = Some(sink);
        }
    }
}
