use serde::{Deserialize, Serialize};

/// Width of the band just below capacity in which a container bulges.
pub const DEFAULT_BULGE_MARGIN: f64 = 5.0;

/// Derived load band of a container. Never stored on the item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Normal,
    Bulging,
    Burst,
}

impl LoadState {
    /// Classify `contents` against `capacity`.
    ///
    /// - Burst: contents > capacity
    /// - Bulging: capacity - margin <= contents <= capacity
    /// - Normal: otherwise (including non-finite inputs that compare false)
    pub fn classify(contents: f64, capacity: f64, margin: f64) -> Self {
        if contents > capacity {
            LoadState::Burst
        } else if contents >= capacity - margin && contents <= capacity {
            LoadState::Bulging
        } else {
            LoadState::Normal
        }
    }

    pub fn is_burst(&self) -> bool {
        matches!(self, LoadState::Burst)
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Normal => write!(f, "normal"),
            LoadState::Bulging => write!(f, "bulging"),
            LoadState::Burst => write!(f, "burst"),
        }
    }
}

/// Capacity and live contents weight of a single container.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerLoad {
    pub capacity: f64,
    pub contents: f64,
}

impl ContainerLoad {
    pub fn state(&self, margin: f64) -> LoadState {
        LoadState::classify(self.contents, self.capacity, margin)
    }

    /// contents / capacity, `None` when capacity is not positive.
    pub fn ratio(&self) -> Option<f64> {
        (self.capacity > 0.0).then(|| self.contents / self.capacity)
    }
}
