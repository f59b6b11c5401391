use std::sync::atomic::{AtomicU8, Ordering};

/// Setup progress of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SetupState {
    Uninitialized = 0,
    SettingUp = 1,
    Ready = 2,
}

impl SetupState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupState::Uninitialized => "uninitialized",
            SetupState::SettingUp => "setting up",
            SetupState::Ready => "ready",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => SetupState::SettingUp,
            2 => SetupState::Ready,
            _ => SetupState::Uninitialized,
        }
    }
}

/// Atomic holder of a module's setup state.
///
/// Once `Ready` is stored the module never goes back to another state.
#[derive(Debug)]
pub struct SetupStatus {
    state: AtomicU8,
}

impl Default for SetupStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl SetupStatus {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SetupState::Uninitialized as u8),
        }
    }

    pub fn get(&self) -> SetupState {
        SetupState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, state: SetupState) {
        if self.is_ready() {
            return;
        }
        self.state.store(state as u8, Ordering::SeqCst);
        log::debug!("Module setup state: {}", state.as_str());
    }

    pub fn is_ready(&self) -> bool {
        self.get() == SetupState::Ready
    }
}
