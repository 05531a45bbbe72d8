use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks manager state, recovering the data if a strand unit panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    None,
    Loading,
    Loaded,
    Error,
}

impl LoadState {
    fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Loading => 1,
            Self::Loaded => 2,
            Self::Error => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Loading,
            2 => Self::Loaded,
            3 => Self::Error,
            _ => Self::None,
        }
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::None => "NONE",
            Self::Loading => "LOADING",
            Self::Loaded => "LOADED",
            Self::Error => "ERROR",
        };
        f.write_str(text)
    }
}

/// A [`LoadState`] that any thread may read or write.
#[derive(Debug, Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn get(&self) -> LoadState {
        LoadState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: LoadState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }
}

/// Observable loading state of every scene domain.
#[derive(Debug, Default)]
pub struct SceneStates {
    pub model: StateCell,
    pub ground: StateCell,
    pub light: StateCell,
    pub skybox: StateCell,
    pub shapes: StateCell,
}

impl SceneStates {
    pub fn summary(&self) -> String {
        format!(
            "model={} ground={} light={} skybox={} shapes={}",
            self.model.get(),
            self.ground.get(),
            self.light.get(),
            self.skybox.get(),
            self.shapes.get()
        )
    }
}
