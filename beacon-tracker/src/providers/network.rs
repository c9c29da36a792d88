//! Connectivity and memory-pressure signals reported by the host.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum NetworkState {
    /// The host never reported connectivity. Treated as connected.
    #[default]
    Unknown = 0,
    Disconnected = 1,
    Wifi = 2,
    Cellular = 3,
    Ethernet = 4,
}

impl NetworkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Disconnected => "NONE",
            Self::Wifi => "WIFI",
            Self::Cellular => "CELLULAR",
            Self::Ethernet => "ETHERNET",
        }
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Disconnected,
            2 => Self::Wifi,
            3 => Self::Cellular,
            4 => Self::Ethernet,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Default)]
pub struct NetworkProvider {
    state: AtomicU8,
}

impl NetworkProvider {
    pub fn state(&self) -> NetworkState {
        NetworkState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: NetworkState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    low: AtomicBool,
}

impl MemoryProvider {
    pub fn is_low(&self) -> bool {
        self.low.load(Ordering::Acquire)
    }

    pub fn set_low(&self, low: bool) {
        self.low.store(low, Ordering::Release);
    }
}
