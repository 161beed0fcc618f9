//! # `mt7603-hal`
//! Data-plane MAC layer for the MediaTek MT7603 Wi-Fi chipset.
//!
//! This crate translates between the device's DMA descriptor formats and a
//! generic 802.11 frame/metadata representation, and sequences the small
//! station-table and arbiter register operations around them. It runs on
//! every packet, so misparses are not an option: every descriptor group
//! boundary is validated and failures surface as explicit drop decisions.
//!
//! ## Hardware overview
//!
//! ### Receive (RX)
//! The hardware prepends each received frame with a descriptor chain: a
//! mandatory four-word header carrying channel, error and security status,
//! followed by up to four optional groups selected by flags in the first
//! word. The last optional group is the RX vector with PHY mode, rate and
//! per-chain RSSI. [mac_fill_rx] parses the chain into an [RxStatus] and
//! strips the descriptor, leaving the bare 802.11 frame.
//!
//! ### Transmit (TX)
//! Outgoing frames get an eight-word descriptor (TXWI) built by
//! [mac_write_txwi]: total length, queue index, station table reference,
//! header geometry, ack/retry policy and, when rate control pins a single
//! rate, a forced PHY rate/bandwidth selection. Everything else is left to
//! the hardware's automatic rate machinery.
//!
//! ### Station table (WTBL)
//! Per-station state lives in a fixed 128-entry hardware table with three
//! secondary regions spread across the paged PSE memory. [Mac::wtbl_init]
//! programs an entry on association; [Mac::wtbl_clear] tears it down,
//! stopping the four AC transmit queues around the region rewrite so the
//! device never fetches a half-updated entry.
//!
//! ### Register access
//! All register traffic goes through the [DeviceBus] trait, so the crate
//! is independent of the bus transport (PCIe, USB shim, test double). DMA
//! ring management, interrupts and firmware load are the caller's
//! business; this crate only fills the buffers handed to it.

#![cfg_attr(not(test), no_std)]
pub(crate) mod fmt;

mod band;
mod bus;
mod mac;
mod regs;
mod rx;
mod tx;

pub use band::{Band, Bitrate, Channel, RadioState, SupportedBand, BITRATES};
pub use bus::DeviceBus;
pub use mac::{Mac, MacError, MacResult};
pub use regs::*;
pub use rx::{mac_fill_rx, RxStatus};
pub use tx::{mac_write_txwi, TxControl, TxRate};
