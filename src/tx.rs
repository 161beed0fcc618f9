//! Transmit descriptor (TXWI) encoding.
//!
//! [mac_write_txwi] builds the fixed eight-word descriptor the hardware
//! expects in front of every outgoing frame: queue mapping, station table
//! reference, ack/retry policy and, when rate control requests a single
//! fixed rate, a forced PHY rate selection. Rate resolution reads the
//! band-wide tables selected by the current channel definition, which is
//! why that step (and only that step) runs inside a critical section.

use bitfield_struct::bitfield;

use crate::{
    band::RadioState,
    mac::{MacError, MacResult},
    regs::{
        MT_HDR_FORMAT_802_11, MT_PHY_TYPE_HT, MT_PHY_TYPE_HT_GF, MT_TXD_SIZE, MT_WTBL_RESERVED,
    },
};

#[bitfield(u32)]
pub struct Txd0 {
    /// Frame length plus descriptor overhead.
    pub tx_bytes: u16,
    #[bits(7)]
    pub eth_type_offset: u8,
    pub ip_sum: bool,
    pub udp_tcp_sum: bool,
    #[bits(5)]
    pub q_idx: u8,
    #[bits(2)]
    pub p_idx: u8,
}

#[bitfield(u32)]
pub struct Txd1 {
    pub wlan_idx: u8,
    /// Header length in units of two bytes.
    #[bits(5)]
    pub hdr_info: u8,
    #[bits(2)]
    pub hdr_format: u8,
    pub long_format: bool,
    #[bits(3)]
    pub hdr_pad: u8,
    pub no_ack: bool,
    #[bits(3)]
    pub tid: u8,
    pub protected: bool,
    #[bits(2)]
    __: u8,
    #[bits(6)]
    pub own_mac: u8,
}

#[bitfield(u32)]
pub struct Txd2 {
    #[bits(2)]
    pub frame_type: u8,
    #[bits(4)]
    pub sub_type: u8,
    pub ndp: bool,
    pub ndpa: bool,
    pub sounding: bool,
    pub rts: bool,
    pub multicast: bool,
    pub bip: bool,
    pub duration: bool,
    pub htc_vld: bool,
    #[bits(2)]
    pub frag: u8,
    #[bits(10)]
    pub max_tx_time: u16,
    #[bits(5)]
    pub power_offset: u8,
    pub ba_disable: bool,
}

#[bitfield(u32)]
pub struct Txd3 {
    #[bits(6)]
    __: u8,
    #[bits(5)]
    pub tx_count: u8,
    #[bits(5)]
    pub rem_tx_count: u8,
    #[bits(12)]
    pub seq: u16,
    #[bits(2)]
    __: u8,
    pub pn_valid: bool,
    pub sn_valid: bool,
}

#[bitfield(u32)]
pub struct Txd5 {
    pub pid: u8,
    pub tx_status_fmt: bool,
    pub tx_status_2_mcu: bool,
    pub tx_status_2_host: bool,
    #[bits(2)]
    __: u8,
    pub sw_power_mgmt: bool,
    #[bits(18)]
    __: u32,
}

#[bitfield(u32)]
pub struct Txd6 {
    pub fixed_rate: bool,
    #[bits(3)]
    __: u8,
    pub ant_id: u8,
    #[bits(2)]
    pub bw: u8,
    pub fixed_bw: bool,
    pub dyn_bw: bool,
    pub e_txbf: bool,
    pub i_txbf: bool,
    #[bits(12)]
    pub tx_rate: u16,
    pub ldpc: bool,
    pub sgi: bool,
}

/// Packed rate value carried in [Txd6::tx_rate].
#[bitfield(u16)]
pub struct TxRateVal {
    #[bits(6)]
    pub idx: u8,
    #[bits(3)]
    pub mode: u8,
    #[bits(2)]
    pub nss: u8,
    pub stbc: bool,
    #[bits(4)]
    __: u8,
}

/// First candidate entry of the rate-control selection for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxRate {
    /// Rate table index (or MCS index). Negative means no selection.
    pub idx: i8,
    /// Retry attempts already spent on this candidate.
    pub count: u8,
    /// The index is an MCS index rather than a legacy table index.
    pub mcs: bool,
    pub green_field: bool,
    pub bw_40mhz: bool,
    pub short_preamble: bool,
    pub short_gi: bool,
}

impl Default for TxRate {
    fn default() -> Self {
        Self {
            idx: -1,
            count: 0,
            mcs: false,
            green_field: false,
            bw_40mhz: false,
            short_preamble: false,
            short_gi: false,
        }
    }
}

/// Per-frame transmit control derived from the stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxControl {
    /// Hardware queue this frame was assigned to.
    pub queue: u8,
    /// QoS traffic identifier.
    pub tid: u8,
    pub no_ack: bool,
    /// Rate control is probing; hardware block-ack must stay out of the
    /// way.
    pub rate_probe: bool,
    pub stbc: bool,
    pub ldpc: bool,
}

const IEEE80211_QOS_CTL_TID_MASK: u8 = 0xf;

const FTYPE_MGMT: u8 = 0;
const FTYPE_CTL: u8 = 1;
const FTYPE_DATA: u8 = 2;
const STYPE_CTS: u8 = 12;
const STYPE_ACK: u8 = 13;

/// 802.11 header length implied by a frame control field.
fn ieee80211_hdrlen(frame_control: u16) -> usize {
    let ftype = ((frame_control >> 2) & 0x3) as u8;
    let stype = ((frame_control >> 4) & 0xf) as u8;
    let to_ds = frame_control & (1 << 8) != 0;
    let from_ds = frame_control & (1 << 9) != 0;
    let order = frame_control & (1 << 15) != 0;

    match ftype {
        FTYPE_DATA => {
            let mut len = 24;
            if to_ds && from_ds {
                len += 6;
            }
            // QoS data frames carry the QoS control field, and an HT
            // control field when the order bit is set.
            if stype & 0x8 != 0 {
                len += 2;
                if order {
                    len += 4;
                }
            }
            len
        }
        FTYPE_CTL => match stype {
            STYPE_CTS | STYPE_ACK => 10,
            _ => 16,
        },
        _ => {
            if ftype == FTYPE_MGMT && order {
                28
            } else {
                24
            }
        }
    }
}

fn txwi_word(txwi: &[u8; MT_TXD_SIZE], word: usize) -> u32 {
    let offset = word * 4;
    u32::from_le_bytes(txwi[offset..offset + 4].try_into().unwrap())
}

fn put_txwi_word(txwi: &mut [u8; MT_TXD_SIZE], word: usize, val: u32) {
    let offset = word * 4;
    txwi[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
}

/// Resolve a rate-control candidate into the hardware rate value, the
/// stream count and the bandwidth selector.
///
/// Legacy rates go through the band's bitrate table; the caller must hold
/// the critical section guarding the channel definition while calling
/// this.
fn mac_tx_rate_val(state: &RadioState, rate: &TxRate) -> (TxRateVal, u8, u8) {
    let mut nss = 1;
    let mut bw = 0;
    let (phy, rate_idx) = if rate.mcs {
        let idx = rate.idx as u8;
        nss = 1 + (idx >> 3);
        let phy = if rate.green_field {
            MT_PHY_TYPE_HT_GF
        } else {
            MT_PHY_TYPE_HT
        };
        if rate.bw_40mhz {
            bw = 1;
        }
        (phy, idx)
    } else {
        let sband = state.sband(state.chandef_band);
        let val = match sband.bitrates.get(rate.idx as usize) {
            Some(bitrate) if rate.short_preamble => bitrate.hw_value_short,
            Some(bitrate) => bitrate.hw_value,
            None => {
                warn!("TX rate index {} outside the band table", rate.idx);
                0
            }
        };
        ((val >> 8) as u8, (val & 0xff) as u8)
    };

    (TxRateVal::new().with_mode(phy).with_idx(rate_idx), nss, bw)
}

/// Build the transmit descriptor for `frame` into `txwi`.
///
/// `wlan_idx` references the station table entry the frame belongs to;
/// `None` selects the reserved broadcast/management entry. Only the first
/// rate-control candidate is consulted: a non-negative index with no spent
/// retries forces that rate, anything else leaves rate selection to the
/// hardware.
pub fn mac_write_txwi(
    state: &RadioState,
    txwi: &mut [u8; MT_TXD_SIZE],
    frame: &[u8],
    wlan_idx: Option<u8>,
    ctl: &TxControl,
    rate: &TxRate,
) -> MacResult<()> {
    let frame_control = match frame.get(0..2) {
        Some(bytes) => u16::from_le_bytes(bytes.try_into().unwrap()),
        None => return Err(MacError::FrameTruncated),
    };
    let frame_type = ((frame_control >> 2) & 0x3) as u8;
    let frame_subtype = ((frame_control >> 4) & 0xf) as u8;
    // Group bit of the first destination address octet.
    let multicast = frame.get(4).is_some_and(|octet| octet & 1 != 0);
    let hdr_len = ieee80211_hdrlen(frame_control);
    let wlan_idx = wlan_idx.unwrap_or(MT_WTBL_RESERVED);

    put_txwi_word(
        txwi,
        0,
        Txd0::new()
            .with_tx_bytes((frame.len() + MT_TXD_SIZE) as u16)
            .with_q_idx(ctl.queue)
            .into_bits(),
    );
    put_txwi_word(
        txwi,
        1,
        Txd1::new()
            .with_long_format(true)
            .with_own_mac(0)
            .with_tid(ctl.tid & IEEE80211_QOS_CTL_TID_MASK & 0x7)
            .with_hdr_format(MT_HDR_FORMAT_802_11)
            .with_hdr_info((hdr_len / 2) as u8)
            .with_wlan_idx(wlan_idx)
            .with_no_ack(ctl.no_ack)
            .into_bits(),
    );
    put_txwi_word(
        txwi,
        2,
        Txd2::new()
            .with_frame_type(frame_type)
            .with_sub_type(frame_subtype)
            .with_multicast(multicast)
            .with_ba_disable(ctl.rate_probe)
            .into_bits(),
    );
    // 0xf tells the hardware to apply its automatic retry policy.
    put_txwi_word(txwi, 3, Txd3::new().with_rem_tx_count(0xf).into_bits());
    put_txwi_word(txwi, 4, 0);
    put_txwi_word(
        txwi,
        5,
        Txd5::new()
            .with_tx_status_2_host(true)
            .with_sw_power_mgmt(true)
            .into_bits(),
    );
    put_txwi_word(txwi, 6, 0);
    put_txwi_word(txwi, 7, 0);

    if rate.idx >= 0 && rate.count == 0 {
        // Rate resolution reads the shared channel definition and band
        // tables, so it must not race a channel switch.
        critical_section::with(|_| {
            let (mut rate_val, nss, bw) = mac_tx_rate_val(state, rate);
            if ctl.stbc && nss == 1 {
                rate_val.set_stbc(true);
            }

            let mut txd6 = Txd6::from_bits(txwi_word(txwi, 6))
                .with_fixed_rate(true)
                .with_fixed_bw(true)
                .with_bw(bw)
                .with_tx_rate(rate_val.into_bits());
            if rate.short_gi {
                txd6.set_sgi(true);
            }
            put_txwi_word(txwi, 6, txd6.into_bits());
        });
    }

    if ctl.ldpc {
        let txd6 = Txd6::from_bits(txwi_word(txwi, 6)).with_ldpc(true);
        put_txwi_word(txwi, 6, txd6.into_bits());
    }

    Ok(())
}
