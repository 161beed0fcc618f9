//! MAC control path: station table management and arbiter gating.
//!
//! Everything here sequences register writes through a [DeviceBus]; the
//! per-packet descriptor codec lives in [rx](crate::rx) and
//! [tx](crate::tx) and never touches registers.

use macro_bits::{bit, check_bit};

use crate::{
    bus::DeviceBus,
    regs::{
        field_prep, genmask, MT_PCIE_REMAP_BASE_1, MT_PSE_PAGE_SIZE, MT_WF_ARB_RQCR,
        MT_WF_ARB_RQCR_RX_START, MT_WF_ARB_RX_DISABLE, MT_WF_ARB_SCR, MT_WF_ARB_TX_DISABLE,
        MT_WF_ARB_TX_START_0, MT_WF_ARB_TX_STOP_0, MT_WTBL1_BASE, MT_WTBL1_OR,
        MT_WTBL1_OR_PSM_WRITE, MT_WTBL1_SIZE, MT_WTBL1_W0_ADDR_HI, MT_WTBL1_W0_RX_CHECK_A2,
        MT_WTBL1_W0_RX_VALID, MT_WTBL1_W1_ADDR_LO, MT_WTBL1_W2_ADMISSION_CONTROL,
        MT_WTBL1_W3_WTBL2_ENTRY_ID, MT_WTBL1_W3_WTBL2_FRAME_ID, MT_WTBL1_W3_WTBL4_FRAME_ID,
        MT_WTBL1_W4_WTBL3_ENTRY_ID, MT_WTBL1_W4_WTBL3_FRAME_ID, MT_WTBL1_W4_WTBL4_ENTRY_ID,
        MT_WTBL2_SIZE, MT_WTBL3_SIZE, MT_WTBL4_SIZE, MT_WTBL_SIZE, MT_WTBL_UPDATE,
        MT_WTBL_UPDATE_ADM_COUNT_CLEAR, MT_WTBL_UPDATE_BUSY, MT_WTBL_UPDATE_RX_COUNT_CLEAR,
        MT_WTBL_UPDATE_TX_COUNT_CLEAR, MT_WTBL_UPDATE_WLAN_IDX, MT_WTBL_UPDATE_WTBL2,
    },
};

/// Errors of the MAC data plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MacError {
    /// A receive descriptor group reached past the end of the buffer.
    RxdTruncated,
    /// The hardware flagged the frame as exceeding the maximum length.
    MaxLenError,
    /// The selected band has no channel table; device misconfiguration.
    NoChannelTable,
    /// An outgoing frame was too short to carry a frame control field.
    FrameTruncated,
}

pub type MacResult<T> = Result<T, MacError>;

/// Poll budget for WTBL update commands, in microseconds.
const MT_WTBL_UPDATE_TIMEOUT_US: u32 = 5000;

/// Per-access-category bitfield spans of the arbiter TX start/stop
/// registers, indexed by AC bit position. Precomputed so the hot path
/// stays branch-free.
const AC_QUEUE_MASKS: [u32; 4] = [
    genmask(3, 0),
    genmask(8, 5),
    genmask(13, 10),
    genmask(19, 16),
];

/// Expand a 4 bit access-category mask into the arbiter register layout.
fn ac_queue_mask(mask: u8) -> u32 {
    let mut val = 0;
    for (ac, span) in AC_QUEUE_MASKS.iter().copied().enumerate() {
        if check_bit!(mask as u32, bit!(ac)) {
            val |= span;
        }
    }
    val
}

/// Control-path handle over the MAC register space.
pub struct Mac<B> {
    bus: B,
}

impl<B: DeviceBus> Mac<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Access the underlying register space.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Re-admit transmit and receive at the arbiter.
    pub fn start(&self) {
        trace!("Starting MAC TX/RX.");
        self.bus
            .clear(MT_WF_ARB_SCR, MT_WF_ARB_TX_DISABLE | MT_WF_ARB_RX_DISABLE);
        self.bus.write(MT_WF_ARB_TX_START_0, !0);
        self.bus.set(MT_WF_ARB_RQCR, MT_WF_ARB_RQCR_RX_START);
    }

    /// Gate off all transmit and receive admission.
    pub fn stop(&self) {
        trace!("Stopping MAC TX/RX.");
        self.bus
            .set(MT_WF_ARB_SCR, MT_WF_ARB_TX_DISABLE | MT_WF_ARB_RX_DISABLE);
        self.bus.write(MT_WF_ARB_TX_START_0, 0);
        self.bus.clear(MT_WF_ARB_RQCR, MT_WF_ARB_RQCR_RX_START);
    }

    /// Stop the transmit queues of the access categories in `mask`.
    pub fn stop_tx_ac(&self, mask: u8) {
        self.bus.set(MT_WF_ARB_TX_STOP_0, ac_queue_mask(mask));
    }

    /// Restart the transmit queues of the access categories in `mask`.
    pub fn start_tx_ac(&self, mask: u8) {
        self.bus.set(MT_WF_ARB_TX_START_0, ac_queue_mask(mask));
    }

    /// Issue a WTBL update command for the given entry and poll for
    /// completion. Timeouts are logged, not surfaced; all users of this
    /// are best-effort cleanup.
    fn wtbl_update(&self, idx: u8, mask: u32) {
        self.bus.rmw(
            MT_WTBL_UPDATE,
            MT_WTBL_UPDATE_WLAN_IDX,
            field_prep(MT_WTBL_UPDATE_WLAN_IDX, idx as u32) | mask,
        );

        if !self
            .bus
            .poll(MT_WTBL_UPDATE, MT_WTBL_UPDATE_BUSY, 0, MT_WTBL_UPDATE_TIMEOUT_US)
        {
            warn!("WTBL update for entry {} timed out", idx);
        }
    }

    /// Program a station table entry on association.
    ///
    /// The caller guarantees `idx` is valid and was previously reserved.
    pub fn wtbl_init(&self, idx: u8, mac_addr: &[u8; 6]) {
        debug_assert!((idx as usize) < MT_WTBL_SIZE);
        trace!("Initializing WTBL entry {}.", idx);
        let addr = MT_WTBL1_BASE + idx as u32 * MT_WTBL1_SIZE;

        self.bus.set(
            addr,
            field_prep(
                MT_WTBL1_W0_ADDR_HI,
                u16::from_le_bytes(mac_addr[4..6].try_into().unwrap()) as u32,
            ),
        );
        self.bus.set(
            addr + 4,
            field_prep(
                MT_WTBL1_W1_ADDR_LO,
                u32::from_le_bytes(mac_addr[0..4].try_into().unwrap()),
            ),
        );
        self.bus.set(addr + 2 * 4, MT_WTBL1_W2_ADMISSION_CONTROL);
    }

    /// Tear down a station table entry on disassociation.
    ///
    /// Rewrites the primary entry into its vacant state, re-derives the
    /// secondary region coordinates, zeroes the block-ack state in the
    /// WTBL2 mirror and resets all counter groups. The WTBL2 rewrite
    /// happens with the four AC transmit queues stopped, so the hardware
    /// cannot fetch a half-updated entry.
    pub fn wtbl_clear(&self, idx: u8) {
        debug_assert!((idx as usize) < MT_WTBL_SIZE);
        trace!("Clearing WTBL entry {}.", idx);
        let widx = idx as u32;
        let wtbl2_frame = (widx * MT_WTBL2_SIZE) / MT_PSE_PAGE_SIZE;
        let wtbl2_entry = (widx * MT_WTBL2_SIZE) % MT_PSE_PAGE_SIZE;
        let wtbl3_frame = (widx * MT_WTBL3_SIZE) / MT_PSE_PAGE_SIZE;
        let wtbl3_entry = ((widx * MT_WTBL3_SIZE) % MT_PSE_PAGE_SIZE) * 2;
        let wtbl4_frame = (widx * MT_WTBL4_SIZE) / MT_PSE_PAGE_SIZE;
        let wtbl4_entry = (widx * MT_WTBL4_SIZE) % MT_PSE_PAGE_SIZE;
        let addr = MT_WTBL1_BASE + widx * MT_WTBL1_SIZE;

        self.bus
            .write(addr, MT_WTBL1_W0_RX_CHECK_A2 | MT_WTBL1_W0_RX_VALID);
        self.bus.write(addr + 4, 0);
        self.bus.write(addr + 2 * 4, 0);

        // Frame/entry id rewrites go through program mode, so the device
        // never observes a partial update.
        self.bus.set(MT_WTBL1_OR, MT_WTBL1_OR_PSM_WRITE);

        self.bus.write(
            addr + 3 * 4,
            field_prep(MT_WTBL1_W3_WTBL2_FRAME_ID, wtbl2_frame)
                | field_prep(MT_WTBL1_W3_WTBL2_ENTRY_ID, wtbl2_entry)
                | field_prep(MT_WTBL1_W3_WTBL4_FRAME_ID, wtbl4_frame),
        );
        self.bus.write(
            addr + 4 * 4,
            field_prep(MT_WTBL1_W4_WTBL3_FRAME_ID, wtbl3_frame)
                | field_prep(MT_WTBL1_W4_WTBL3_ENTRY_ID, wtbl3_entry)
                | field_prep(MT_WTBL1_W4_WTBL4_ENTRY_ID, wtbl4_entry),
        );

        self.bus.clear(MT_WTBL1_OR, MT_WTBL1_OR_PSM_WRITE);

        // Mapped to WTBL2.
        let addr = MT_PCIE_REMAP_BASE_1 + widx * MT_WTBL2_SIZE;

        // Clear BA information.
        self.bus.write(addr + 15 * 4, 0);

        self.stop_tx_ac(genmask(3, 0) as u8);
        for word in 2..=4 {
            self.bus.write(addr + word * 4, 0);
        }
        self.wtbl_update(idx, MT_WTBL_UPDATE_WTBL2);
        self.start_tx_ac(genmask(3, 0) as u8);

        self.wtbl_update(idx, MT_WTBL_UPDATE_RX_COUNT_CLEAR);
        self.wtbl_update(idx, MT_WTBL_UPDATE_TX_COUNT_CLEAR);
        self.wtbl_update(idx, MT_WTBL_UPDATE_ADM_COUNT_CLEAR);
    }
}
