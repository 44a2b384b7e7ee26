//! Display-pipeline collaborators invoked by a DIG output

use crate::types::{DisplayMode, FmtDither};

/// HDMI infoframe / audio controller attached to a TMDS output
pub trait HdmiController: Send {
    fn enable(&mut self, enable: bool);

    fn set_mode(&mut self, mode: &DisplayMode);

    fn save(&mut self);

    fn restore(&mut self);

    fn destroy(&mut self);
}

/// The CRTC currently feeding an output
pub trait Crtc: Send + Sync {
    /// Hardware index of the CRTC (0 or 1)
    fn id(&self) -> u8;

    /// Configure bit depth reduction; `None` disables dithering
    fn set_dither(&self, dither: Option<&FmtDither>);
}
