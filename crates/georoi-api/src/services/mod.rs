mod overlay;
mod roi;

pub use overlay::OverlayService;
pub use roi::RoiService;
