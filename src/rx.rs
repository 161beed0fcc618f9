//! Receive descriptor (RXD) decoding.
//!
//! The hardware prepends every received frame with a descriptor chain: a
//! mandatory four-word header, followed by up to four optional groups
//! selected by flags in word 0. Group 3, when present, carries the RX
//! vector with PHY mode, rate and per-chain signal information.
//!
//! [mac_fill_rx] walks this chain, derives a normalized [RxStatus] and
//! returns the buffer with all descriptor bytes (and the optional 2 byte
//! alignment pad) stripped, so only the 802.11 frame remains. Metadata is
//! fully re-derived per frame; the only state consulted is the read-only
//! [RadioState].

use bitfield_struct::bitfield;
use macro_bits::bit;

use crate::{
    band::{Band, RadioState, SupportedBand},
    mac::{MacError, MacResult},
    regs::{MT_PHY_TYPE_CCK, MT_PHY_TYPE_HT, MT_PHY_TYPE_HT_GF, MT_PHY_TYPE_OFDM, MT_PHY_TYPE_VHT},
};

#[bitfield(u32)]
pub struct Rxd0 {
    /// Total length declared by the hardware, including the descriptor.
    pub rx_bytes: u16,
    #[bits(9)]
    __: u16,
    pub group_1: bool,
    pub group_2: bool,
    pub group_3: bool,
    pub group_4: bool,
    #[bits(3)]
    pub pkt_type: u8,
}

#[bitfield(u32)]
pub struct Rxd1 {
    #[bits(8)]
    __: u8,
    /// Channel index shifted left by one, band selector in bit 0.
    pub ch_freq: u8,
    #[bits(6)]
    __: u8,
    /// A 2 byte alignment pad follows the descriptor.
    pub hdr_offset: bool,
    pub hdr_trans: bool,
    #[bits(2)]
    pub payload_format: u8,
    #[bits(6)]
    pub bssid: u8,
}

#[bitfield(u32)]
pub struct Rxd2 {
    #[bits(12)]
    __: u16,
    #[bits(4)]
    pub sec_mode: u8,
    pub sw_bit: bool,
    pub fcs_err: bool,
    /// Cipher mismatch: decryption was suppressed.
    pub cm: bool,
    /// Cipher length mismatch: decryption was suppressed.
    pub clm: bool,
    pub icv_err: bool,
    pub tkip_mic_err: bool,
    pub len_mismatch: bool,
    pub max_len_error: bool,
    #[bits(8)]
    __: u8,
}

/// First word of the RX vector (optional group 3).
#[bitfield(u32)]
pub struct Rxv1 {
    #[bits(7)]
    pub tx_rate: u8,
    #[bits(2)]
    pub ht_stbc: u8,
    pub ht_ad_code: bool,
    #[bits(2)]
    pub ht_ext_ltf: u8,
    #[bits(3)]
    pub tx_mode: u8,
    #[bits(2)]
    pub frame_mode: u8,
    pub vhta1_b22: bool,
    pub ht_aggr: bool,
    pub ht_short_gi: bool,
    pub ht_smooth: bool,
    pub ht_no_sound: bool,
    #[bits(2)]
    pub num_rx: u8,
    #[bits(6)]
    pub vhta2_b8_b3: u8,
    pub acid_det_l: bool,
    pub acid_det_h: bool,
}

/// Fourth word of the RX vector, carrying in-band RSSI.
#[bitfield(u32)]
pub struct Rxv4 {
    pub ib_rssi0: u8,
    pub ib_rssi1: u8,
    pub wb_rssi0: u8,
    pub wb_rssi1: u8,
}

/// Normalized per-frame receive metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RxStatus {
    /// Carrier frequency in MHz, 0 if the channel index was out of range.
    pub freq: u16,
    pub fcs_error: bool,
    pub mic_error: bool,
    /// The frame was decrypted by the hardware.
    pub decrypted: bool,
    pub ht: bool,
    pub vht: bool,
    pub short_gi: bool,
    /// Number of space-time block coded streams.
    pub stbc: u8,
    /// Rate table index for legacy rates, raw MCS index for HT/VHT.
    pub rate_idx: u8,
    /// Bitmask of chains contributing to `chain_signal`.
    pub chains: u8,
    /// Calibrated per-chain signal strength in dBm.
    pub chain_signal: [i8; 2],
    /// Composite signal strength: the strongest chain.
    pub signal: i8,
}

/// Word count of the mandatory header group.
const RXD_HEADER_WORDS: usize = 4;

fn rxd_word(buffer: &[u8], word: usize) -> u32 {
    let offset = word * 4;
    u32::from_le_bytes(buffer[offset..offset + 4].try_into().unwrap())
}

/// Advance past an optional descriptor group. The new position must lie
/// strictly before the end of the buffer, so there is always at least one
/// frame byte left; an exact match is a boundary violation.
fn advance(offset: &mut usize, words: usize, len: usize) -> MacResult<()> {
    *offset += words * 4;
    if *offset >= len {
        Err(MacError::RxdTruncated)
    } else {
        Ok(())
    }
}

fn chain_signal(raw: u8, offset: i8) -> i8 {
    (raw as i16 + offset as i16) as i8
}

/// Resolve a hardware rate index from the RX vector to an index into the
/// band's bitrate table.
///
/// CCK indices carry the short-preamble flag in bit 2, which does not
/// affect the table row. OFDM lookups on 2.4 GHz skip the four leading CCK
/// entries, whose indices overlap the OFDM numbering space. A miss is not
/// fatal; the lowest rate is substituted.
fn legacy_rate_index(sband: &SupportedBand, idx: u8, cck: bool) -> u8 {
    let mut idx = idx;
    let mut offset = 0;
    if cck {
        if sband.band == Band::FiveGhz {
            error!("CCK rate reported on the 5 GHz band");
            return 0;
        }
        idx &= !bit!(2); // short preamble
    } else if sband.band == Band::TwoGhz {
        offset = 4;
    }

    for (i, rate) in sband.bitrates.iter().enumerate().skip(offset) {
        if (rate.hw_value & 0xff) as u16 == idx as u16 {
            return i as u8;
        }
    }

    warn!("no bitrate entry for hardware rate index {}", idx);
    0
}

/// Decode the descriptor chain in front of a received frame.
///
/// Returns the derived [RxStatus] and the buffer advanced past all
/// descriptor bytes. Errors mean the frame must be dropped.
pub fn mac_fill_rx<'a>(state: &RadioState, buffer: &'a [u8]) -> MacResult<(RxStatus, &'a [u8])> {
    let len = buffer.len();
    if len < RXD_HEADER_WORDS * 4 {
        return Err(MacError::RxdTruncated);
    }
    let rxd0 = Rxd0::from_bits(rxd_word(buffer, 0));
    let rxd1 = Rxd1::from_bits(rxd_word(buffer, 1));
    let rxd2 = Rxd2::from_bits(rxd_word(buffer, 2));

    let mut status = RxStatus::default();

    let ch_freq = rxd1.ch_freq();
    let band = if ch_freq & 1 != 0 {
        Band::FiveGhz
    } else {
        Band::TwoGhz
    };
    let sband = state.sband(band);
    if let Some(channel) = sband.channels.get((ch_freq >> 1) as usize) {
        status.freq = channel.center_freq;
    }

    status.fcs_error = rxd2.fcs_err();
    status.mic_error = rxd2.tkip_mic_err();
    status.decrypted = rxd2.sec_mode() != 0 && !rxd2.clm() && !rxd2.cm();

    let remove_pad = rxd1.hdr_offset();

    if rxd2.max_len_error() {
        return Err(MacError::MaxLenError);
    }
    if sband.channels.is_empty() {
        return Err(MacError::NoChannelTable);
    }

    let mut offset = RXD_HEADER_WORDS * 4;
    if rxd0.group_4() {
        advance(&mut offset, 4, len)?;
    }
    if rxd0.group_1() {
        advance(&mut offset, 4, len)?;
    }
    if rxd0.group_2() {
        advance(&mut offset, 2, len)?;
    }
    if rxd0.group_3() {
        // The RX vector is read from the current position, so its six
        // words have to fit before the advance check even runs.
        if offset + 6 * 4 >= len {
            return Err(MacError::RxdTruncated);
        }
        let rxv1 = Rxv1::from_bits(rxd_word(buffer, offset / 4));
        let rxv4 = Rxv4::from_bits(rxd_word(buffer, offset / 4 + 3));

        let mut idx = rxv1.tx_rate();
        match rxv1.tx_mode() {
            MT_PHY_TYPE_CCK | MT_PHY_TYPE_OFDM => {
                let cck = rxv1.tx_mode() == MT_PHY_TYPE_CCK;
                idx = legacy_rate_index(sband, idx, cck);
            }
            MT_PHY_TYPE_HT | MT_PHY_TYPE_HT_GF => status.ht = true,
            MT_PHY_TYPE_VHT => status.vht = true,
            mode => error!("unexpected PHY mode {} in RX vector", mode),
        }

        status.short_gi = rxv1.ht_short_gi();
        status.stbc = rxv1.ht_stbc();
        status.rate_idx = idx;

        status.chains = bit!(0, 1);
        status.chain_signal = [
            chain_signal(rxv4.ib_rssi0(), state.rssi_offset[0]),
            chain_signal(rxv4.ib_rssi1(), state.rssi_offset[1]),
        ];
        status.signal = status.chain_signal[0].max(status.chain_signal[1]);

        advance(&mut offset, 6, len)?;
    }

    let consumed = offset + if remove_pad { 2 } else { 0 };
    if consumed > len {
        return Err(MacError::RxdTruncated);
    }
    trace!("RX descriptor consumed {} bytes", consumed);
    Ok((status, &buffer[consumed..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn push_word(buffer: &mut Vec<u8>, word: u32) {
        buffer.extend_from_slice(&word.to_le_bytes());
    }

    /// Header plus `frame` payload bytes, no optional groups.
    fn header(rxd0: Rxd0, rxd1: Rxd1, rxd2: Rxd2, frame: usize) -> Vec<u8> {
        let mut buffer = Vec::new();
        push_word(&mut buffer, rxd0.into_bits());
        push_word(&mut buffer, rxd1.into_bits());
        push_word(&mut buffer, rxd2.into_bits());
        push_word(&mut buffer, 0);
        buffer.extend(core::iter::repeat(0xaau8).take(frame));
        buffer
    }

    fn ch_freq(index: u8, band: Band) -> u8 {
        (index << 1) | (band == Band::FiveGhz) as u8
    }

    #[test]
    fn truncated_header_fails() {
        let state = RadioState::new();
        assert_eq!(
            mac_fill_rx(&state, &[0u8; 15]),
            Err(MacError::RxdTruncated)
        );
    }

    #[test]
    fn header_only_frame_resolves_frequency() {
        let state = RadioState::new();
        let buffer = header(
            Rxd0::new(),
            Rxd1::new().with_ch_freq(ch_freq(0, Band::TwoGhz)),
            Rxd2::new(),
            3,
        );
        let (status, frame) = mac_fill_rx(&state, &buffer).unwrap();
        assert_eq!(status.freq, 2412);
        assert_eq!(frame, &[0xaa; 3]);
    }

    #[test]
    fn five_ghz_band_selector() {
        let state = RadioState::new();
        let buffer = header(
            Rxd0::new(),
            Rxd1::new().with_ch_freq(ch_freq(2, Band::FiveGhz)),
            Rxd2::new(),
            1,
        );
        let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
        assert_eq!(status.freq, 5220);
    }

    #[test]
    fn out_of_range_channel_leaves_frequency_unset() {
        let state = RadioState::new();
        let buffer = header(
            Rxd0::new(),
            Rxd1::new().with_ch_freq(ch_freq(100, Band::TwoGhz)),
            Rxd2::new(),
            1,
        );
        let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
        assert_eq!(status.freq, 0);
    }

    #[test]
    fn error_and_security_flags() {
        let state = RadioState::new();
        let buffer = header(
            Rxd0::new(),
            Rxd1::new(),
            Rxd2::new()
                .with_fcs_err(true)
                .with_tkip_mic_err(true)
                .with_sec_mode(1),
            1,
        );
        let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
        assert!(status.fcs_error);
        assert!(status.mic_error);
        assert!(status.decrypted);
    }

    #[test]
    fn cipher_mismatch_suppresses_decrypted_flag() {
        let state = RadioState::new();
        for rxd2 in [
            Rxd2::new().with_sec_mode(1).with_cm(true),
            Rxd2::new().with_sec_mode(1).with_clm(true),
            Rxd2::new(), // no security mode at all
        ] {
            let buffer = header(Rxd0::new(), Rxd1::new(), rxd2, 1);
            let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
            assert!(!status.decrypted);
        }
    }

    #[test]
    fn max_len_error_drops_frame() {
        let state = RadioState::new();
        let buffer = header(
            Rxd0::new(),
            Rxd1::new(),
            Rxd2::new().with_max_len_error(true),
            1,
        );
        assert_eq!(mac_fill_rx(&state, &buffer), Err(MacError::MaxLenError));
    }

    #[test]
    fn missing_channel_table_drops_frame() {
        let mut state = RadioState::new();
        state.sband_5g.channels = &[];
        let buffer = header(
            Rxd0::new(),
            Rxd1::new().with_ch_freq(ch_freq(0, Band::FiveGhz)),
            Rxd2::new(),
            1,
        );
        assert_eq!(mac_fill_rx(&state, &buffer), Err(MacError::NoChannelTable));
    }

    #[test]
    fn optional_groups_advance_cursor() {
        let state = RadioState::new();
        // Groups 4, 1 and 2 together add 10 words.
        let rxd0 = Rxd0::new()
            .with_group_4(true)
            .with_group_1(true)
            .with_group_2(true);
        let mut buffer = header(rxd0, Rxd1::new(), Rxd2::new(), 0);
        for _ in 0..10 {
            push_word(&mut buffer, 0);
        }
        // Descriptor fills the whole buffer: boundary violation.
        assert_eq!(mac_fill_rx(&state, &buffer), Err(MacError::RxdTruncated));
        buffer.push(0x42);
        let (_, frame) = mac_fill_rx(&state, &buffer).unwrap();
        assert_eq!(frame, &[0x42]);
    }

    #[test]
    fn pad_flag_strips_two_extra_bytes() {
        let state = RadioState::new();
        let buffer = header(
            Rxd0::new(),
            Rxd1::new().with_hdr_offset(true),
            Rxd2::new(),
            5,
        );
        let (_, frame) = mac_fill_rx(&state, &buffer).unwrap();
        assert_eq!(frame.len(), 3);
    }

    fn with_rx_vector(rxv1: Rxv1, rxv4: Rxv4, frame: usize) -> Vec<u8> {
        let mut buffer = header(Rxd0::new().with_group_3(true), Rxd1::new(), Rxd2::new(), 0);
        push_word(&mut buffer, rxv1.into_bits());
        push_word(&mut buffer, 0);
        push_word(&mut buffer, 0);
        push_word(&mut buffer, rxv4.into_bits());
        push_word(&mut buffer, 0);
        push_word(&mut buffer, 0);
        buffer.extend(core::iter::repeat(0u8).take(frame));
        buffer
    }

    #[test]
    fn cck_short_preamble_resolves_to_same_row() {
        let state = RadioState::new();
        // 2 Mbit/s long preamble (1) and short preamble (5).
        let mut rows = [0u8; 2];
        for (slot, hw_idx) in [1u8, 5u8].into_iter().enumerate() {
            let rxv1 = Rxv1::new()
                .with_tx_mode(MT_PHY_TYPE_CCK)
                .with_tx_rate(hw_idx);
            let buffer = with_rx_vector(rxv1, Rxv4::new(), 1);
            let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
            rows[slot] = status.rate_idx;
        }
        assert_eq!(rows[0], rows[1]);
        assert_eq!(rows[0], 1);
    }

    #[test]
    fn ofdm_lookup_skips_cck_entries_on_2ghz() {
        let state = RadioState::new();
        let rxv1 = Rxv1::new().with_tx_mode(MT_PHY_TYPE_OFDM).with_tx_rate(11);
        let buffer = with_rx_vector(rxv1, Rxv4::new(), 1);
        let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
        // 6 Mbit/s sits right after the four CCK rows.
        assert_eq!(status.rate_idx, 4);
    }

    #[test]
    fn unknown_rate_index_falls_back_to_zero() {
        let state = RadioState::new();
        let rxv1 = Rxv1::new().with_tx_mode(MT_PHY_TYPE_OFDM).with_tx_rate(0x7f);
        let buffer = with_rx_vector(rxv1, Rxv4::new(), 1);
        let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
        assert_eq!(status.rate_idx, 0);
    }

    #[test]
    fn ht_keeps_raw_mcs_index() {
        let state = RadioState::new();
        let rxv1 = Rxv1::new()
            .with_tx_mode(MT_PHY_TYPE_HT)
            .with_tx_rate(7)
            .with_ht_short_gi(true)
            .with_ht_stbc(1);
        let buffer = with_rx_vector(rxv1, Rxv4::new(), 1);
        let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
        assert!(status.ht);
        assert!(!status.vht);
        assert!(status.short_gi);
        assert_eq!(status.stbc, 1);
        assert_eq!(status.rate_idx, 7);
    }

    #[test]
    fn chain_signals_apply_calibration_offsets() {
        let mut state = RadioState::new();
        state.rssi_offset = [3, -4];
        let rxv4 = Rxv4::new().with_ib_rssi0(40).with_ib_rssi1(50);
        let buffer = with_rx_vector(Rxv1::new().with_tx_mode(MT_PHY_TYPE_HT), rxv4, 1);
        let (status, _) = mac_fill_rx(&state, &buffer).unwrap();
        assert_eq!(status.chain_signal, [43, 46]);
        assert_eq!(status.signal, 46);
        assert_eq!(status.chains, 0b11);
    }

    #[test]
    fn rx_vector_must_fit_in_buffer() {
        let state = RadioState::new();
        let mut buffer = header(Rxd0::new().with_group_3(true), Rxd1::new(), Rxd2::new(), 0);
        // Only five of the six RX vector words present.
        for _ in 0..5 {
            push_word(&mut buffer, 0);
        }
        assert_eq!(mac_fill_rx(&state, &buffer), Err(MacError::RxdTruncated));
    }
}
