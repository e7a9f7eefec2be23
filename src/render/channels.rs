use crate::render::smf::write_vlq;
use std::io::{self, Write};

const PROGRAM_CHANGE: u8 = 0xC0;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    instrument: Option<u32>,
    uses: u32,
}

/// Maps unbounded logical instrument ids onto the 16 physical MIDI channels,
/// evicting the least-used binding when no slot matches.
#[derive(Debug, Default)]
pub struct ChannelMap {
    slots: [Slot; 16],
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unbinds every slot and zeroes the usage counters.
    pub fn reset(&mut self) {
        self.slots = Default::default();
    }

    /// Returns the channel bound to `instrument`, binding one if necessary.
    ///
    /// A fresh binding writes `[VLQ(delta)][0xC0|channel][instrument - 1]`
    /// into `out` before returning, so this must be called in event order
    /// while the track body is being written, never as a pre-pass.
    pub fn resolve<W: Write>(
        &mut self,
        out: &mut W,
        instrument: u32,
        delta: u32,
    ) -> io::Result<u8> {
        let mut chosen = self.slots.len() - 1;
        let mut low = u32::MAX;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.instrument == Some(instrument) {
                slot.uses += 1;
                return Ok(i as u8);
            }
            // Lowest index wins ties under strict less-than.
            if slot.uses < low {
                low = slot.uses;
                chosen = i;
            }
        }

        write_vlq(out, delta)?;
        out.write_all(&[PROGRAM_CHANGE | chosen as u8, (instrument - 1) as u8])?;
        self.slots[chosen] = Slot {
            instrument: Some(instrument),
            uses: 1,
        };

        Ok(chosen as u8)
    }
}
