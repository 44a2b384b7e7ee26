//! Recording HDMI controller and CRTC

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dig_hw::{Crtc, DisplayMode, FmtDither, HdmiController};

/// A call received by [`SimHdmi`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HdmiCall {
    Enable(bool),
    SetMode(DisplayMode),
    Save,
    Restore,
    Destroy,
}

/// HDMI controller that records its calls
///
/// Clones share the same log, so a test can keep one clone and hand the
/// other to an output.
#[derive(Debug, Clone, Default)]
pub struct SimHdmi {
    calls: Arc<Mutex<Vec<HdmiCall>>>,
}

impl SimHdmi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HdmiCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<HdmiCall> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl HdmiController for SimHdmi {
    fn enable(&mut self, enable: bool) {
        self.lock().push(HdmiCall::Enable(enable));
    }

    fn set_mode(&mut self, mode: &DisplayMode) {
        self.lock().push(HdmiCall::SetMode(mode.clone()));
    }

    fn save(&mut self) {
        self.lock().push(HdmiCall::Save);
    }

    fn restore(&mut self) {
        self.lock().push(HdmiCall::Restore);
    }

    fn destroy(&mut self) {
        self.lock().push(HdmiCall::Destroy);
    }
}

/// CRTC that records dithering requests
#[derive(Debug, Default)]
pub struct SimCrtc {
    id: u8,
    dither: Mutex<Vec<Option<FmtDither>>>,
}

impl SimCrtc {
    pub fn new(id: u8) -> Self {
        Self {
            id,
            dither: Mutex::new(Vec::new()),
        }
    }

    /// Dithering requests in order; `None` means dithering disabled
    pub fn dither_requests(&self) -> Vec<Option<FmtDither>> {
        self.dither
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Crtc for SimCrtc {
    fn id(&self) -> u8 {
        self.id
    }

    fn set_dither(&self, dither: Option<&FmtDither>) {
        self.dither
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dither.copied());
    }
}
