// src/renderer/frame.rs - what scripts asked to draw this frame

pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameCommands {
    pub clear_color: [f32; 4],
    pub rects: Vec<Rect>,
}

impl Default for FrameCommands {
    fn default() -> Self {
        Self {
            clear_color: DEFAULT_CLEAR_COLOR,
            rects: Vec::new(),
        }
    }
}

impl FrameCommands {
    /// Queues a rect in view pixels. Negative sizes are flipped so the rect
    /// still covers the area the caller described.
    pub fn push_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: [f32; 4]) {
        let (x, width) = if width < 0.0 { (x + width, -width) } else { (x, width) };
        let (y, height) = if height < 0.0 { (y + height, -height) } else { (y, height) };
        if width == 0.0 || height == 0.0 {
            return;
        }
        self.rects.push(Rect { x, y, width, height, color: clamp_color(color) });
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = clamp_color(color);
    }
}

pub fn clamp_color(color: [f32; 4]) -> [f32; 4] {
    color.map(|c| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rects_are_normalized_and_colors_clamped() {
        let mut frame = FrameCommands::default();
        frame.push_rect(10.0, 10.0, -4.0, 2.0, [2.0, -1.0, 0.5, 1.0]);
        frame.push_rect(0.0, 0.0, 0.0, 5.0, [1.0; 4]);

        assert_eq!(frame.rects.len(), 1);
        let rect = frame.rects[0];
        assert_eq!((rect.x, rect.width), (6.0, 4.0));
        assert_eq!(rect.color, [1.0, 0.0, 0.5, 1.0]);
    }
}
