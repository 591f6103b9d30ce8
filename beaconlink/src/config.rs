//! Link configuration: sink addressing and radio identity.
//!
//! Sinks occupy a contiguous block of short addresses, PAN ids and radio
//! channels starting at configured base values, so a sink's index fully
//! determines its radio settings. The defaults reproduce the reference
//! deployment: three sinks based at `0x11`, source address `0x42`.

use core::fmt;

use crate::types::SinkId;

/// Errors detected when validating a [`LinkConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Sink count must be at least one.
    NoSinks,
    /// The sink address block would wrap the 16-bit address space.
    AddressRangeOverflow,
    /// The sink channel block would wrap the 8-bit channel space.
    ChannelRangeOverflow,
    /// The source's own short address falls inside the sink address block,
    /// which would make its transmissions indistinguishable from beacons.
    SourceAddressInSinkRange,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoSinks => write!(f, "sink count must be non-zero"),
            ConfigError::AddressRangeOverflow => {
                write!(f, "sink address block overflows the address space")
            }
            ConfigError::ChannelRangeOverflow => {
                write!(f, "sink channel block overflows the channel space")
            }
            ConfigError::SourceAddressInSinkRange => {
                write!(f, "source address collides with the sink address block")
            }
        }
    }
}

/// Static parameters of one beaconlink deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Number of sink coordinators.
    pub sink_count: u8,
    /// PAN id of sink 0; sink `i` uses `base_pan + i`.
    pub base_pan: u16,
    /// Short address of sink 0; sink `i` uses `base_address + i`.
    pub base_address: u16,
    /// Radio channel of sink 0; sink `i` uses `base_channel + i`.
    pub base_channel: u8,
    /// The source node's PAN id.
    pub source_pan: u16,
    /// The source node's fixed short address.
    pub source_address: u16,
    /// Application payload byte carried by every outbound frame.
    pub payload: u8,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            sink_count: 3,
            base_pan: 0x11,
            base_address: 0x11,
            base_channel: 0,
            source_pan: 0x11,
            source_address: 0x42,
            payload: 0x32,
        }
    }
}

impl LinkConfig {
    /// Validate internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sink_count == 0 {
            return Err(ConfigError::NoSinks);
        }
        let count = self.sink_count as u16;
        let end = self
            .base_address
            .checked_add(count)
            .ok_or(ConfigError::AddressRangeOverflow)?;
        self.base_pan
            .checked_add(count)
            .ok_or(ConfigError::AddressRangeOverflow)?;
        self.base_channel
            .checked_add(self.sink_count)
            .ok_or(ConfigError::ChannelRangeOverflow)?;
        if self.source_address >= self.base_address && self.source_address < end {
            return Err(ConfigError::SourceAddressInSinkRange);
        }
        Ok(())
    }

    /// Iterate all configured sink ids.
    pub fn sinks(&self) -> impl Iterator<Item = SinkId> {
        (0..self.sink_count).map(SinkId::new)
    }

    /// Map a sender's short address to a sink index.
    ///
    /// Addresses outside `[base_address, base_address + sink_count)` are not
    /// sinks and map to `None` with no side effects.
    pub fn sink_index(&self, address: u16) -> Option<SinkId> {
        if address < self.base_address {
            return None;
        }
        let offset = address - self.base_address;
        if offset >= self.sink_count as u16 {
            return None;
        }
        Some(SinkId::new(offset as u8))
    }

    /// Short address of a sink. Inverse of [`sink_index`](Self::sink_index).
    pub fn sink_address(&self, sink: SinkId) -> u16 {
        self.base_address + sink.raw() as u16
    }

    /// PAN id of a sink.
    pub fn sink_pan(&self, sink: SinkId) -> u16 {
        self.base_pan + sink.raw() as u16
    }

    /// Radio channel of a sink.
    pub fn sink_channel(&self, sink: SinkId) -> u8 {
        self.base_channel + sink.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(LinkConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_sink_index_inverts_sink_address() {
        // Exercise several base/count combinations, not just the default.
        for (base, count) in [(0x11u16, 3u8), (0x20, 1), (0x00, 5), (0xfff0, 8)] {
            let cfg = LinkConfig {
                sink_count: count,
                base_address: base,
                ..LinkConfig::default()
            };
            for i in 0..count {
                let sink = SinkId::new(i);
                assert_eq!(cfg.sink_index(cfg.sink_address(sink)), Some(sink));
            }
        }
    }

    #[test]
    fn test_out_of_range_addresses_are_invalid() {
        let cfg = LinkConfig::default();
        assert_eq!(cfg.sink_index(0x10), None); // one below the block
        assert_eq!(cfg.sink_index(0x14), None); // one past the block
        assert_eq!(cfg.sink_index(0x42), None); // the source itself
        assert_eq!(cfg.sink_index(0x0000), None);
        assert_eq!(cfg.sink_index(0xffff), None);

        let wide = LinkConfig {
            sink_count: 8,
            base_address: 0x100,
            ..LinkConfig::default()
        };
        assert_eq!(wide.sink_index(0x0ff), None);
        assert_eq!(wide.sink_index(0x108), None);
        assert_eq!(wide.sink_index(0x107), Some(SinkId::new(7)));
    }

    #[test]
    fn test_validation_rejects_bad_configs() {
        let mut cfg = LinkConfig {
            sink_count: 0,
            ..LinkConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoSinks));

        cfg.sink_count = 3;
        cfg.base_address = 0xfffe;
        assert_eq!(cfg.validate(), Err(ConfigError::AddressRangeOverflow));

        cfg.base_address = 0x40;
        assert_eq!(cfg.validate(), Err(ConfigError::SourceAddressInSinkRange));

        cfg.base_address = 0x11;
        cfg.base_channel = 0xfe;
        assert_eq!(cfg.validate(), Err(ConfigError::ChannelRangeOverflow));
    }
}
