//! FFmpeg audio filter definitions.

/// EBU R128 loudness measurement filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EbuR128Filter {
    /// Enable true-peak metering
    pub true_peak: bool,
    /// Meter scale range in LU (9 or 18)
    pub meter: u8,
    /// Treat mono input as dual-mono
    pub dual_mono: bool,
}

impl Default for EbuR128Filter {
    fn default() -> Self {
        Self {
            true_peak: true,
            meter: 18,
            dual_mono: true,
        }
    }
}

impl EbuR128Filter {
    /// Render the filter graph string.
    pub fn to_filter_string(&self) -> String {
        let mut opts = Vec::with_capacity(3);
        if self.true_peak {
            opts.push("peak=true".to_string());
        }
        opts.push(format!("meter={}", self.meter));
        if self.dual_mono {
            opts.push("dualmono=true".to_string());
        }
        format!("ebur128={}", opts.join(":"))
    }
}
