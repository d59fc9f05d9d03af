use tracing::info;

use crate::error::{CanopyError, Result};
use crate::frame::{Frame, FrameCollection};

use super::{QueryControl, RasterQuery, RasterSource};

/// Frames already held in memory.
pub struct MemorySource {
    frames: Vec<Frame>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl RasterSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn query(&self, query: &RasterQuery, control: &QueryControl) -> Result<FrameCollection> {
        let guard = control.start();
        let mut selected = Vec::new();
        for frame in &self.frames {
            guard.check()?;
            if query.matches(&frame.acquired, frame.cloud_cover, &frame.grid().bounds()) {
                selected.push(frame.clone());
            }
        }
        if selected.is_empty() {
            return Err(CanopyError::NoData);
        }
        info!(
            matched = selected.len(),
            total = self.frames.len(),
            "Queried in-memory frames"
        );
        FrameCollection::new(selected)
    }
}
