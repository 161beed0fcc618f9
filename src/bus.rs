//! Register space access.
//!
//! The MAC logic in this crate never touches memory-mapped registers
//! directly. Everything goes through [DeviceBus], so the same code runs
//! over PCIe, USB register shims or a recording test double. The transport
//! is assumed reliable and already synchronized by the caller.

/// Capability for accessing the device register space.
///
/// Implementors provide [read](DeviceBus::read), [write](DeviceBus::write)
/// and [poll](DeviceBus::poll); the read-modify-write combinators are
/// derived from those.
pub trait DeviceBus {
    /// Read a 32 bit register.
    fn read(&self, addr: u32) -> u32;
    /// Write a 32 bit register.
    fn write(&self, addr: u32, val: u32);
    /// Poll `addr` until `value & mask == val`, for at most `timeout_us`
    /// microseconds. Returns whether the condition was met.
    ///
    /// This blocks the calling context. There is no cancellation; a
    /// timeout is simply reported as `false`.
    fn poll(&self, addr: u32, mask: u32, val: u32, timeout_us: u32) -> bool;

    /// Clear the bits in `mask`, then set the bits in `val`.
    ///
    /// Returns the value written back.
    fn rmw(&self, addr: u32, mask: u32, val: u32) -> u32 {
        let val = (self.read(addr) & !mask) | val;
        self.write(addr, val);
        val
    }
    /// Set the given bits.
    fn set(&self, addr: u32, bits: u32) -> u32 {
        self.rmw(addr, 0, bits)
    }
    /// Clear the given bits.
    fn clear(&self, addr: u32, bits: u32) -> u32 {
        self.rmw(addr, bits, 0)
    }
}
