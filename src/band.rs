//! Band, channel and bitrate tables.
//!
//! The decoder and the rate override both resolve hardware rate indices
//! against these tables. All of this state is read-only on the per-packet
//! path and is passed around explicitly through [RadioState], which keeps
//! the descriptor codec testable without a device.

use crate::regs::{MT_PHY_TYPE_CCK, MT_PHY_TYPE_OFDM};

/// Operating band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Band {
    #[default]
    TwoGhz,
    FiveGhz,
}

/// A channel of a supported band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channel {
    /// Channel number.
    pub hw_value: u8,
    /// Center frequency in MHz.
    pub center_freq: u16,
}

impl Channel {
    pub const fn new(hw_value: u8, center_freq: u16) -> Self {
        Self {
            hw_value,
            center_freq,
        }
    }
}

/// A legacy bitrate of a supported band.
///
/// `hw_value` packs the PHY type into the upper byte and the hardware rate
/// index into the lower byte. `hw_value_short` is the short-preamble
/// variant and differs only for CCK rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bitrate {
    /// Nominal rate in units of 100 kbit/s.
    pub bitrate: u16,
    pub hw_value: u16,
    pub hw_value_short: u16,
}

const fn cck_rate(idx: u16, bitrate: u16) -> Bitrate {
    Bitrate {
        bitrate,
        hw_value: ((MT_PHY_TYPE_CCK as u16) << 8) | idx,
        // Short preamble is signaled through bit 2 of the rate index.
        hw_value_short: ((MT_PHY_TYPE_CCK as u16) << 8) | (4 + idx),
    }
}

const fn ofdm_rate(idx: u16, bitrate: u16) -> Bitrate {
    Bitrate {
        bitrate,
        hw_value: ((MT_PHY_TYPE_OFDM as u16) << 8) | idx,
        hw_value_short: ((MT_PHY_TYPE_OFDM as u16) << 8) | idx,
    }
}

/// Legacy rates as reported to the stack: four CCK entries, then the OFDM
/// rates with their standard hardware indices. The 5 GHz table is the OFDM
/// tail of this one.
pub const BITRATES: [Bitrate; 12] = [
    cck_rate(0, 10),
    cck_rate(1, 20),
    cck_rate(2, 55),
    cck_rate(3, 110),
    ofdm_rate(11, 60),
    ofdm_rate(15, 90),
    ofdm_rate(10, 120),
    ofdm_rate(14, 180),
    ofdm_rate(9, 240),
    ofdm_rate(13, 360),
    ofdm_rate(8, 480),
    ofdm_rate(12, 540),
];

pub const CHANNELS_2GHZ: [Channel; 14] = [
    Channel::new(1, 2412),
    Channel::new(2, 2417),
    Channel::new(3, 2422),
    Channel::new(4, 2427),
    Channel::new(5, 2432),
    Channel::new(6, 2437),
    Channel::new(7, 2442),
    Channel::new(8, 2447),
    Channel::new(9, 2452),
    Channel::new(10, 2457),
    Channel::new(11, 2462),
    Channel::new(12, 2467),
    Channel::new(13, 2472),
    Channel::new(14, 2484),
];

pub const CHANNELS_5GHZ: [Channel; 19] = [
    Channel::new(36, 5180),
    Channel::new(40, 5200),
    Channel::new(44, 5220),
    Channel::new(48, 5240),
    Channel::new(52, 5260),
    Channel::new(56, 5280),
    Channel::new(60, 5300),
    Channel::new(64, 5320),
    Channel::new(100, 5500),
    Channel::new(104, 5520),
    Channel::new(108, 5540),
    Channel::new(112, 5560),
    Channel::new(116, 5580),
    Channel::new(132, 5660),
    Channel::new(136, 5680),
    Channel::new(140, 5700),
    Channel::new(149, 5745),
    Channel::new(153, 5765),
    Channel::new(157, 5785),
];

// Promoted slice of the full table, so band constructors can hand out
// 'static subslices.
const ALL_BITRATES: &[Bitrate] = &BITRATES;

/// Channel and bitrate tables of one band.
#[derive(Clone, Copy, Debug)]
pub struct SupportedBand<'a> {
    pub band: Band,
    pub channels: &'a [Channel],
    pub bitrates: &'a [Bitrate],
}

impl SupportedBand<'static> {
    /// The default 2.4 GHz band of the chip.
    pub const fn band_2g() -> Self {
        Self {
            band: Band::TwoGhz,
            channels: &CHANNELS_2GHZ,
            bitrates: ALL_BITRATES,
        }
    }
    /// The default 5 GHz band. CCK entries are omitted.
    pub const fn band_5g() -> Self {
        Self {
            band: Band::FiveGhz,
            channels: &CHANNELS_5GHZ,
            bitrates: ALL_BITRATES.split_at(4).1,
        }
    }
}

/// Read-only per-device state consulted by the descriptor codec.
#[derive(Clone, Copy, Debug)]
pub struct RadioState<'a> {
    pub sband_2g: SupportedBand<'a>,
    pub sband_5g: SupportedBand<'a>,
    /// Band of the currently configured channel, used for transmit rate
    /// resolution.
    pub chandef_band: Band,
    /// Per-chain RSSI calibration offsets.
    pub rssi_offset: [i8; 2],
}

impl RadioState<'static> {
    pub const fn new() -> Self {
        Self {
            sband_2g: SupportedBand::band_2g(),
            sband_5g: SupportedBand::band_5g(),
            chandef_band: Band::TwoGhz,
            rssi_offset: [0; 2],
        }
    }
}

impl Default for RadioState<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RadioState<'a> {
    /// Table of the given band.
    pub fn sband(&self, band: Band) -> &SupportedBand<'a> {
        match band {
            Band::TwoGhz => &self.sband_2g,
            Band::FiveGhz => &self.sband_5g,
        }
    }
}
