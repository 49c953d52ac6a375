/// Gameplay tuning for machine production and transport.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct MachineTuning {
    /// Powered ticks between miner production events (60 ticks is ~1 Hz).
    pub miner_interval_ticks: u32,

    /// Total quantity a single machine inventory may hold. Belts and inserters
    /// refuse to transfer into a machine at this cap.
    pub inventory_cap: u32,
}

impl Default for MachineTuning {
    fn default() -> Self {
        Self {
            miner_interval_ticks: 60,
            inventory_cap: 10,
        }
    }
}
