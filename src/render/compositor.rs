//! CPU compositor for slide stills.
//! Draws the slide image letterboxed over black, applying the entry
//! transition's opacity, horizontal offset and scale.

use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;

use crate::core::time::Time;
use crate::core::MediaRef;
use crate::render::renderer::RenderError;
use crate::render::transition::TransitionState;

/// Output video frame (RGBA8, row-major)
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Time,
}

impl VideoFrame {
    /// Opaque black frame
    pub fn black(width: u32, height: u32, timestamp: Time) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            data,
            width,
            height,
            timestamp,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

/// Produces the picture for a slide. Shared by all render workers.
pub trait VisualSource: Send + Sync {
    /// Whether `visual` can be drawn; missing visuals render black.
    fn has(&self, visual: &MediaRef) -> bool;

    fn render(
        &self,
        visual: &MediaRef,
        transition: &TransitionState,
        width: u32,
        height: u32,
        timestamp: Time,
    ) -> Result<VideoFrame, RenderError>;
}

/// Still images keyed by media handle.
#[derive(Debug, Default)]
pub struct StillCompositor {
    stills: HashMap<MediaRef, RgbaImage>,
}

impl StillCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, visual: MediaRef, image: RgbaImage) {
        self.stills.insert(visual, image);
    }

    /// Decode an image file (PNG or JPEG) for `visual`.
    pub fn load_file(&mut self, visual: MediaRef, path: &Path) -> Result<(), RenderError> {
        let image = image::open(path)?.to_rgba8();
        self.insert(visual, image);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.stills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stills.is_empty()
    }
}

impl VisualSource for StillCompositor {
    fn has(&self, visual: &MediaRef) -> bool {
        self.stills.contains_key(visual)
    }

    fn render(
        &self,
        visual: &MediaRef,
        transition: &TransitionState,
        width: u32,
        height: u32,
        timestamp: Time,
    ) -> Result<VideoFrame, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidFrame(format!(
                "zero output size {}x{}",
                width, height
            )));
        }
        let mut frame = VideoFrame::black(width, height, timestamp);
        let Some(still) = self.stills.get(visual) else {
            return Ok(frame);
        };
        if still.width() == 0 || still.height() == 0 || transition.opacity <= 0.0 {
            return Ok(frame);
        }

        // Fit inside the frame, then apply the transition around the center
        let fit = (width as f32 / still.width() as f32).min(height as f32 / still.height() as f32);
        let scale = fit * transition.scale.max(f32::EPSILON);
        let center_x = width as f32 / 2.0 + transition.offset_x;
        let center_y = height as f32 / 2.0;
        let half_w = still.width() as f32 / 2.0;
        let half_h = still.height() as f32 / 2.0;
        let opacity = transition.opacity.clamp(0.0, 1.0);

        for (y, row) in frame.data.chunks_exact_mut(width as usize * 4).enumerate() {
            let sy = (y as f32 + 0.5 - center_y) / scale + half_h;
            if sy < 0.0 || sy >= still.height() as f32 {
                continue;
            }
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let sx = (x as f32 + 0.5 - center_x) / scale + half_w;
                if sx < 0.0 || sx >= still.width() as f32 {
                    continue;
                }
                let src = still.get_pixel(sx as u32, sy as u32).0;
                let alpha = src[3] as f32 / 255.0 * opacity;
                for c in 0..3 {
                    px[c] = (src[c] as f32 * alpha).round() as u8;
                }
            }
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]))
    }

    fn compositor() -> StillCompositor {
        let mut c = StillCompositor::new();
        c.insert(MediaRef::new("w.png"), white(4, 2));
        c
    }

    #[test]
    fn test_missing_visual_is_black() {
        let c = compositor();
        let frame = c
            .render(&MediaRef::new("nope.png"), &TransitionState::default(), 8, 8, 0)
            .unwrap();
        assert!(!c.has(&MediaRef::new("nope.png")));
        assert_eq!(frame.pixel(4, 4), [0, 0, 0, 255]);
    }

    #[test]
    fn test_letterboxed_still() {
        let c = compositor();
        // 4x2 image into 8x8: fills width, 4 rows tall, centered
        let frame = c
            .render(&MediaRef::new("w.png"), &TransitionState::default(), 8, 8, 0)
            .unwrap();
        assert_eq!(frame.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(frame.pixel(0, 2), [255, 255, 255, 255]);
        assert_eq!(frame.pixel(7, 5), [255, 255, 255, 255]);
        assert_eq!(frame.pixel(7, 6), [0, 0, 0, 255]);
    }

    #[test]
    fn test_opacity_fades_over_black() {
        let c = compositor();
        let state = TransitionState {
            opacity: 0.5,
            ..Default::default()
        };
        let frame = c.render(&MediaRef::new("w.png"), &state, 8, 8, 0).unwrap();
        assert_eq!(frame.pixel(4, 4), [128, 128, 128, 255]);
    }

    #[test]
    fn test_offset_moves_image_right() {
        let c = compositor();
        let state = TransitionState {
            offset_x: 4.0,
            ..Default::default()
        };
        let frame = c.render(&MediaRef::new("w.png"), &state, 8, 8, 0).unwrap();
        assert_eq!(frame.pixel(3, 4), [0, 0, 0, 255]);
        assert_eq!(frame.pixel(4, 4), [255, 255, 255, 255]);
    }

    #[test]
    fn test_zero_size_is_error() {
        let c = compositor();
        assert!(c
            .render(&MediaRef::new("w.png"), &TransitionState::default(), 0, 8, 0)
            .is_err());
    }
}
