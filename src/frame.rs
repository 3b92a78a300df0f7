//! DMX512 frame encoding
//!
//! A frame is a fixed-length bit sequence: an extended low "break",
//! a short high "mark after break", then one 11-bit slot per channel
//! (1 low start bit, 8 data bits LSB-first, 2 high stop bits) at
//! 250 kbit/s. The frame is built once at startup with every channel
//! zeroed and then patched in place as channel values change; it is
//! never rebuilt, so a channel update costs O(1).

use dmx_gpio::Level;

use crate::error::ProtocolError;

/// Break length in 4 us bit periods (160 us low)
pub const BREAK_BITS: usize = 40;

/// Mark-after-break length in bit periods (20 us high)
pub const MAB_BITS: usize = 5;

/// Bits per channel slot: 1 start + 8 data + 2 stop
pub const SLOT_BITS: usize = 11;

/// Largest universe DMX512 allows
pub const MAX_CHANNELS: usize = 512;

/// Current value of every addressable channel.
///
/// Fixed size, set at startup and never resized. Index 0 is DMX
/// address 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTable {
    values: Vec<u8>,
}

impl ChannelTable {
    /// All channels zeroed
    pub fn new(channel_count: usize) -> Self {
        Self {
            values: vec![0; channel_count],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        self.values.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }
}

/// One DMX512 frame as levels, ready for the bit-banging loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmxFrame {
    bits: Vec<Level>,
    channel_count: usize,
}

impl DmxFrame {
    /// Build a frame from a channel table.
    ///
    /// Used once at startup (all-zero table) and by tests checking
    /// that patching and rebuilding agree.
    pub fn from_table(table: &ChannelTable) -> Self {
        let channel_count = table.len();
        let mut frame = Self {
            bits: vec![Level::Low; BREAK_BITS + MAB_BITS + channel_count * SLOT_BITS],
            channel_count,
        };
        for bit in frame.bits[BREAK_BITS..BREAK_BITS + MAB_BITS].iter_mut() {
            *bit = Level::High;
        }
        for (index, &value) in table.values().iter().enumerate() {
            // Index and value are both in range by construction.
            frame.write_slot(index, value);
        }
        frame
    }

    /// Break/MAB prefix plus all channels at zero
    pub fn idle(channel_count: usize) -> Self {
        Self::from_table(&ChannelTable::new(channel_count))
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn bits(&self) -> &[Level] {
        &self.bits
    }

    fn slot_start(index: usize) -> usize {
        BREAK_BITS + MAB_BITS + index * SLOT_BITS
    }

    fn write_slot(&mut self, index: usize, value: u8) {
        let start = Self::slot_start(index);
        self.bits[start] = Level::Low;
        for bit in 0..8 {
            self.bits[start + 1 + bit] = Level::from_bit(value & (1 << bit) != 0);
        }
        self.bits[start + 9] = Level::High;
        self.bits[start + 10] = Level::High;
    }

    /// Overwrite exactly the 11 bits of one channel slot.
    ///
    /// `index` is the 0-based table index (DMX address minus one). The
    /// frame is untouched when validation fails.
    pub fn patch_channel(&mut self, index: usize, value: u32) -> Result<(), ProtocolError> {
        if index >= self.channel_count {
            return Err(ProtocolError::InvalidChannel {
                channel: index as u32,
                max: self.channel_count,
            });
        }
        if value > u8::MAX as u32 {
            return Err(ProtocolError::InvalidValue {
                channel: index as u32,
                value,
            });
        }
        self.write_slot(index, value as u8);
        Ok(())
    }

    /// Reconstruct a channel's value from its 8 data bits, LSB first.
    ///
    /// Exact inverse of `patch_channel`.
    pub fn decode_channel(&self, index: usize) -> Result<u8, ProtocolError> {
        if index >= self.channel_count {
            return Err(ProtocolError::InvalidChannel {
                channel: index as u32,
                max: self.channel_count,
            });
        }
        let start = Self::slot_start(index);
        let mut value = 0u8;
        for bit in 0..8 {
            if self.bits[start + 1 + bit].is_high() {
                value |= 1 << bit;
            }
        }
        Ok(value)
    }
}

/// The lighting state a daemon instance owns: the channel table and
/// the frame kept patched to match it.
///
/// Owned by the supervisor and handed to the command listener between
/// transmissions; the single thread is the synchronization mechanism.
#[derive(Debug, Clone)]
pub struct Universe {
    table: ChannelTable,
    frame: DmxFrame,
}

impl Universe {
    pub fn new(channel_count: usize) -> Self {
        let table = ChannelTable::new(channel_count);
        let frame = DmxFrame::from_table(&table);
        Self { table, frame }
    }

    pub fn channel_count(&self) -> usize {
        self.table.len()
    }

    pub fn table(&self) -> &ChannelTable {
        &self.table
    }

    pub fn frame(&self) -> &DmxFrame {
        &self.frame
    }

    /// Apply one parsed command atomically.
    ///
    /// Pairs carry the wire format's 1-based DMX address. Every pair is
    /// validated before any is applied, so a command containing an
    /// out-of-range pair changes nothing.
    pub fn apply_command(&mut self, pairs: &[(u32, u32)]) -> Result<(), ProtocolError> {
        for &(address, value) in pairs {
            if address == 0 || address as usize > self.table.len() {
                return Err(ProtocolError::InvalidChannel {
                    channel: address,
                    max: self.table.len(),
                });
            }
            if value > u8::MAX as u32 {
                return Err(ProtocolError::InvalidValue {
                    channel: address,
                    value,
                });
            }
        }
        for &(address, value) in pairs {
            let index = address as usize - 1;
            self.table.set(index, value as u8);
            self.frame.patch_channel(index, value)?;
        }
        Ok(())
    }
}
