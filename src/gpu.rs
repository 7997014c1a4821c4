//! Hybrid-graphics adapter hints
//!
//! NVIDIA Optimus and AMD PowerXpress drivers look these symbols up in the
//! executable when the process is loaded, before any rendering context
//! exists. A value of 1 asks for the discrete, high-performance adapter.
//! They have to be plain exported data; setting them from code is too late.

/// Read by the NVIDIA Optimus driver.
#[no_mangle]
#[used]
#[allow(non_upper_case_globals)]
pub static NvOptimusEnablement: u32 = 0x0000_0001;

/// Read by the AMD PowerXpress driver.
#[no_mangle]
#[used]
#[allow(non_upper_case_globals)]
pub static AmdPowerXpressRequestHighPerformance: i32 = 0x0000_0001;

/// Snapshot of the hint values as they sit in the process image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuHints {
    pub nv_optimus: u32,
    pub amd_power_xpress: i32,
}

/// Reads both hints back out of the image.
///
/// Volatile loads keep the statics referenced from every binary that links
/// the launcher, so the linker can't discard them.
pub fn declared_hints() -> GpuHints {
    // SAFETY: both are initialized, immutable statics of plain integer type.
    unsafe {
        GpuHints {
            nv_optimus: std::ptr::read_volatile(&NvOptimusEnablement),
            amd_power_xpress: std::ptr::read_volatile(&AmdPowerXpressRequestHighPerformance),
        }
    }
}
