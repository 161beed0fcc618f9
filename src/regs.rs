//! Register map and descriptor field constants for the MT7603 MAC.
//!
//! These addresses and bit layouts are a fixed binary contract with the
//! hardware. Multi-bit fields are expressed as masks in the
//! `GENMASK(hi, lo)` convention via [genmask]; single bits use
//! [macro_bits::bit].

use macro_bits::bit;

/// Build a contiguous bit mask covering bits `hi..=lo`.
pub const fn genmask(hi: u32, lo: u32) -> u32 {
    ((!0u32) >> (31 - hi)) & ((!0u32) << lo)
}

/// Extract the field described by `mask` from `val`.
pub const fn field_get(mask: u32, val: u32) -> u32 {
    (val & mask) >> mask.trailing_zeros()
}

/// Place `val` into the field described by `mask`.
pub const fn field_prep(mask: u32, val: u32) -> u32 {
    (val << mask.trailing_zeros()) & mask
}

/// Page size of the PSE internal memory, in bytes.
pub const MT_PSE_PAGE_SIZE: u32 = 128;

// WTBL1: primary per-station table.
pub const MT_WTBL1_BASE: u32 = 0x28000;
pub const MT_WTBL1_SIZE: u32 = 8 * 4;

pub const MT_WTBL1_W0_ADDR_HI: u32 = genmask(15, 0);
pub const MT_WTBL1_W0_MUAR_IDX: u32 = genmask(21, 16);
pub const MT_WTBL1_W0_RX_CHECK_A1: u32 = bit!(22);
pub const MT_WTBL1_W0_KEY_VALID: u32 = bit!(23);
pub const MT_WTBL1_W0_RX_CHECK_A2: u32 = bit!(24);
pub const MT_WTBL1_W0_RX_DATA_VALID: u32 = bit!(25);
pub const MT_WTBL1_W0_RX_VALID: u32 = bit!(26);

pub const MT_WTBL1_W1_ADDR_LO: u32 = genmask(31, 0);

pub const MT_WTBL1_W2_ADMISSION_CONTROL: u32 = bit!(6);

pub const MT_WTBL1_W3_WTBL2_FRAME_ID: u32 = genmask(10, 0);
pub const MT_WTBL1_W3_WTBL2_ENTRY_ID: u32 = genmask(17, 11);
pub const MT_WTBL1_W3_WTBL4_FRAME_ID: u32 = genmask(28, 18);

pub const MT_WTBL1_W4_WTBL3_FRAME_ID: u32 = genmask(10, 0);
pub const MT_WTBL1_W4_WTBL3_ENTRY_ID: u32 = genmask(18, 11);
pub const MT_WTBL1_W4_WTBL4_ENTRY_ID: u32 = genmask(25, 19);

/// OR-mask control over WTBL1 writes.
pub const MT_WTBL1_OR: u32 = MT_WTBL1_BASE + 0x2300;
pub const MT_WTBL1_OR_PSM_WRITE: u32 = bit!(31);

// Secondary table regions, addressed through the paged PSE memory.
pub const MT_WTBL2_SIZE: u32 = 16 * 4;
pub const MT_WTBL3_SIZE: u32 = 16 * 4;
pub const MT_WTBL4_SIZE: u32 = 8 * 4;

/// Number of entries in the station table.
pub const MT_WTBL_SIZE: usize = 128;
/// Index used for frames without an associated station.
pub const MT_WTBL_RESERVED: u8 = (MT_WTBL_SIZE - 1) as u8;

/// WTBL2 as seen through the second PCIe remap window.
pub const MT_PCIE_REMAP_BASE_1: u32 = 0x40000;

// WTBL update command register.
pub const MT_WTBL_OFF_BASE: u32 = 0x23400;
pub const MT_WTBL_UPDATE: u32 = MT_WTBL_OFF_BASE + 0x030;
pub const MT_WTBL_UPDATE_WLAN_IDX: u32 = genmask(7, 0);
pub const MT_WTBL_UPDATE_WTBL2: u32 = bit!(11);
pub const MT_WTBL_UPDATE_ADM_COUNT_CLEAR: u32 = bit!(12);
pub const MT_WTBL_UPDATE_RATE_UPDATE: u32 = bit!(13);
pub const MT_WTBL_UPDATE_TX_COUNT_CLEAR: u32 = bit!(14);
pub const MT_WTBL_UPDATE_RX_COUNT_CLEAR: u32 = bit!(15);
pub const MT_WTBL_UPDATE_BUSY: u32 = bit!(31);

// MAC arbiter.
pub const MT_WF_ARB_BASE: u32 = 0x21400;
pub const MT_WF_ARB_RQCR: u32 = MT_WF_ARB_BASE + 0x070;
pub const MT_WF_ARB_RQCR_RX_START: u32 = bit!(0);
pub const MT_WF_ARB_SCR: u32 = MT_WF_ARB_BASE + 0x080;
pub const MT_WF_ARB_TX_DISABLE: u32 = bit!(8);
pub const MT_WF_ARB_RX_DISABLE: u32 = bit!(9);
pub const MT_WF_ARB_TX_START_0: u32 = MT_WF_ARB_BASE + 0x100;
pub const MT_WF_ARB_TX_STOP_0: u32 = MT_WF_ARB_BASE + 0x110;

/// Size of the transmit descriptor (TXWI), in bytes.
pub const MT_TXD_SIZE: usize = 8 * 4;

// PHY modulation classes signaled in descriptors.
pub const MT_PHY_TYPE_CCK: u8 = 0;
pub const MT_PHY_TYPE_OFDM: u8 = 1;
pub const MT_PHY_TYPE_HT: u8 = 2;
pub const MT_PHY_TYPE_HT_GF: u8 = 3;
pub const MT_PHY_TYPE_VHT: u8 = 4;

// Header format field values for TXD word 1.
pub const MT_HDR_FORMAT_802_3: u8 = 0;
pub const MT_HDR_FORMAT_CMD: u8 = 1;
pub const MT_HDR_FORMAT_802_11: u8 = 2;
