use std::collections::BTreeMap;

use ndarray::{Array2, Array3};

/// `[t, y, x]` dense real-valued intensity cube. Row-major, contiguous by
/// construction; callers that receive data from elsewhere must call
/// `.as_standard_layout()` before handing it to a compute primitive.
pub type FrameCube = Array3<f32>;

/// `[y, x]` dense array, row-major contiguous.
pub type Map2D<T> = Array2<T>;

/// Wrapped to `[-π, π]` prior to smoothing; unbounded real afterward.
pub type PhaseMap = Map2D<f32>;
/// Values ≥ 0.
pub type MagnitudeMap = Map2D<f32>;
/// Values clamped to `[0, 1]`.
pub type CoherenceMap = Map2D<f32>;
/// Visual angle in degrees.
pub type RetinotopyMap = Map2D<f32>;
/// Values in `[-1, 1]`; masked pixels are exactly `0.0`.
pub type VfsMap = Map2D<f32>;
/// 0 = non-boundary, 1 = boundary.
pub type BoundaryMap = Map2D<u8>;
/// 0 = background/boundary, positive integers = area labels.
pub type AreaMap = Map2D<i32>;

/// One of the four cardinal sweep directions a stimulus can travel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirectionKey {
    /// Left to right.
    Lr,
    /// Right to left.
    Rl,
    /// Top to bottom.
    Tb,
    /// Bottom to top.
    Bt,
}

impl DirectionKey {
    pub const ALL: [DirectionKey; 4] = [
        DirectionKey::Lr,
        DirectionKey::Rl,
        DirectionKey::Tb,
        DirectionKey::Bt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionKey::Lr => "LR",
            DirectionKey::Rl => "RL",
            DirectionKey::Tb => "TB",
            DirectionKey::Bt => "BT",
        }
    }
}

impl std::fmt::Display for DirectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mapping from `DirectionKey` to a per-direction map, holding all four
/// directions or any subset of them (spec §3's `DirectionBundle<M>`).
#[derive(Clone, Debug)]
pub struct DirectionBundle<M> {
    entries: BTreeMap<DirectionKey, M>,
}

impl<M> Default for DirectionBundle<M> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<M> DirectionBundle<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: DirectionKey, value: M) -> Option<M> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: DirectionKey) -> Option<&M> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: DirectionKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.len() == DirectionKey::ALL.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = DirectionKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DirectionKey, &M)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn missing(&self) -> Vec<DirectionKey> {
        DirectionKey::ALL
            .into_iter()
            .filter(|k| !self.contains(*k))
            .collect()
    }
}
