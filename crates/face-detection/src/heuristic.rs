//! Heuristic detection strategy
//!
//! Cheap pixel analysis for when no model is available: the frame is divided
//! into a coarse grid and each cell is scored for brightness, skin-tone
//! coverage, and motion against the previous frame. Connected skin-toned
//! bright regions approximate faces; bright low-motion spots outside the face
//! approximate device screens. Every cutoff here was tuned against one
//! reference camera and is exposed through [`HeuristicConfig`].

use crate::types::{BoundingBox, DetectedObject, Detection, DeviceClass, Face};
use crate::{DetectError, Detector, DetectorKind};
use camera_stream::VideoFrame;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Heuristic detector tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Grid cells per axis
    pub grid_size: u32,
    /// Minimum mean cell luminance for a lit subject
    pub luma_threshold: f32,
    /// Minimum share of skin-tone pixels marking a face cell
    pub skin_ratio_threshold: f32,
    /// Mean absolute luma delta above which a cell counts as moving
    pub motion_threshold: f32,
    /// Smallest connected region (in cells) treated as a face
    pub min_region_cells: usize,
    /// Grid distance below which two regions are merged into one face
    pub region_separation_cells: f32,
    /// Bright static cells outside the face needed to flag a device
    pub device_spot_cells: usize,
    /// Screen-glow luminance cutoff for device spots
    pub device_luma_threshold: f32,
    /// Confidence reported for heuristic device flags
    pub device_confidence: f32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            grid_size: 8,
            luma_threshold: 60.0,
            skin_ratio_threshold: 0.35,
            motion_threshold: 12.0,
            min_region_cells: 3,
            region_separation_cells: 4.0,
            device_spot_cells: 2,
            device_luma_threshold: 180.0,
            device_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CellStats {
    luma: f32,
    skin_ratio: f32,
    /// `f32::MAX` until a previous frame exists
    motion: f32,
}

/// Grid-region face candidate
#[derive(Debug, Clone)]
struct Region {
    cells: Vec<(u32, u32)>,
}

impl Region {
    fn centroid(&self) -> (f32, f32) {
        let n = self.cells.len() as f32;
        let (sx, sy) = self
            .cells
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x as f32, sy + y as f32));
        (sx / n, sy / n)
    }
}

/// Pixel-heuristic detector. Stateful: keeps the previous frame's luma grid
/// for motion scoring, so one instance serves one session.
pub struct HeuristicDetector {
    config: HeuristicConfig,
    prev_luma: Option<Vec<f32>>,
}

impl HeuristicDetector {
    pub fn new(config: HeuristicConfig) -> Self {
        Self {
            config,
            prev_luma: None,
        }
    }

    fn cell_stats(&self, frame: &VideoFrame) -> Vec<CellStats> {
        let grid = self.config.grid_size;
        let cell_w = (frame.width / grid).max(1);
        let cell_h = (frame.height / grid).max(1);
        let mut stats = vec![CellStats::default(); (grid * grid) as usize];

        for gy in 0..grid {
            for gx in 0..grid {
                let x0 = gx * cell_w;
                let y0 = gy * cell_h;
                let mut skin = 0u32;
                let mut sampled = 0u32;
                // Sample every 4th pixel; full resolution buys nothing here
                let mut y = y0;
                while y < (y0 + cell_h).min(frame.height) {
                    let mut x = x0;
                    while x < (x0 + cell_w).min(frame.width) {
                        if let Some([r, g, b]) = frame.get_pixel(x, y) {
                            if is_skin_tone(r, g, b) {
                                skin += 1;
                            }
                            sampled += 1;
                        }
                        x += 4;
                    }
                    y += 4;
                }

                let idx = (gy * grid + gx) as usize;
                stats[idx].luma = frame.region_mean_luma(x0, y0, cell_w, cell_h);
                stats[idx].skin_ratio = if sampled > 0 {
                    skin as f32 / sampled as f32
                } else {
                    0.0
                };
                stats[idx].motion = match &self.prev_luma {
                    Some(prev) => (stats[idx].luma - prev[idx]).abs(),
                    None => f32::MAX,
                };
            }
        }
        stats
    }

    /// Connected components (4-neighbor) over face-candidate cells
    fn face_regions(&self, stats: &[CellStats]) -> Vec<Region> {
        let grid = self.config.grid_size;
        let is_face_cell = |x: u32, y: u32| {
            let s = &stats[(y * grid + x) as usize];
            s.luma > self.config.luma_threshold && s.skin_ratio > self.config.skin_ratio_threshold
        };

        let mut visited = vec![false; (grid * grid) as usize];
        let mut regions = Vec::new();
        for gy in 0..grid {
            for gx in 0..grid {
                let idx = (gy * grid + gx) as usize;
                if visited[idx] || !is_face_cell(gx, gy) {
                    continue;
                }
                // Flood fill from this seed
                let mut cells = Vec::new();
                let mut stack = vec![(gx, gy)];
                visited[idx] = true;
                while let Some((x, y)) = stack.pop() {
                    cells.push((x, y));
                    let neighbors = [
                        (x.wrapping_sub(1), y),
                        (x + 1, y),
                        (x, y.wrapping_sub(1)),
                        (x, y + 1),
                    ];
                    for (nx, ny) in neighbors {
                        if nx >= grid || ny >= grid {
                            continue;
                        }
                        let nidx = (ny * grid + nx) as usize;
                        if !visited[nidx] && is_face_cell(nx, ny) {
                            visited[nidx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
                if cells.len() >= self.config.min_region_cells {
                    regions.push(Region { cells });
                }
            }
        }

        // Regions closer than the separation distance are one face seen
        // through noise, not two people
        let mut merged: Vec<Region> = Vec::new();
        for region in regions {
            let (cx, cy) = region.centroid();
            let close = merged.iter().position(|m| {
                let (mx, my) = m.centroid();
                let (dx, dy) = (mx - cx, my - cy);
                (dx * dx + dy * dy).sqrt() < self.config.region_separation_cells
            });
            match close {
                Some(i) => merged[i].cells.extend(region.cells),
                None => merged.push(region),
            }
        }
        merged
    }

    fn region_to_face(&self, region: &Region, frame: &VideoFrame) -> Face {
        let grid = self.config.grid_size;
        let cell_w = (frame.width / grid).max(1) as f32;
        let cell_h = (frame.height / grid).max(1) as f32;

        let min_x = region.cells.iter().map(|c| c.0).min().unwrap_or(0) as f32;
        let min_y = region.cells.iter().map(|c| c.1).min().unwrap_or(0) as f32;
        let max_x = region.cells.iter().map(|c| c.0).max().unwrap_or(0) as f32;
        let max_y = region.cells.iter().map(|c| c.1).max().unwrap_or(0) as f32;

        let coverage = region.cells.len() as f32 / (grid * grid) as f32;
        Face {
            bbox: BoundingBox {
                x: min_x * cell_w,
                y: min_y * cell_h,
                width: (max_x - min_x + 1.0) * cell_w,
                height: (max_y - min_y + 1.0) * cell_h,
            },
            confidence: (coverage * 8.0).clamp(0.3, 0.95),
            landmarks: None,
        }
    }

    fn device_spots(&self, stats: &[CellStats], face_regions: &[Region]) -> Vec<DetectedObject> {
        let grid = self.config.grid_size;
        let in_face = |x: u32, y: u32| {
            face_regions
                .iter()
                .any(|r| r.cells.iter().any(|&(cx, cy)| cx == x && cy == y))
        };

        let mut spots = 0usize;
        for gy in 0..grid {
            for gx in 0..grid {
                let s = &stats[(gy * grid + gx) as usize];
                if s.luma > self.config.device_luma_threshold
                    && s.motion < self.config.motion_threshold
                    && !in_face(gx, gy)
                {
                    spots += 1;
                }
            }
        }

        if spots >= self.config.device_spot_cells {
            debug!("heuristic device flag: {} bright static cells", spots);
            vec![DetectedObject {
                class: DeviceClass::Monitor,
                confidence: self.config.device_confidence,
            }]
        } else {
            Vec::new()
        }
    }
}

impl Detector for HeuristicDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Detection, DetectError> {
        let stats = self.cell_stats(frame);
        let regions = self.face_regions(&stats);
        let faces = regions
            .iter()
            .map(|r| self.region_to_face(r, frame))
            .collect();
        let objects = self.device_spots(&stats, &regions);

        self.prev_luma = Some(stats.iter().map(|s| s.luma).collect());
        Ok(Detection { faces, objects })
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::Heuristic
    }
}

/// Classic RGB skin-tone rule; crude but cheap, and only used to find
/// candidate regions rather than to decide anything final
fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i16, g as i16, b as i16);
    r > 95 && g > 40 && b > 20 && r > g && r > b && (r - g) > 15
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_stream::VideoFrame;

    const SKIN: [u8; 3] = [200, 140, 110];
    const DARK: [u8; 3] = [10, 10, 10];
    const GLOW: [u8; 3] = [250, 250, 250];

    /// Frame painted from a grid mask: each mask entry colors one cell
    fn frame_from_mask(mask: &[[u8; 8]; 8]) -> VideoFrame {
        let (w, h) = (64u32, 64u32);
        let mut data = vec![0u8; (w * h * 3) as usize];
        for y in 0..h {
            for x in 0..w {
                let color = match mask[(y / 8) as usize][(x / 8) as usize] {
                    1 => SKIN,
                    2 => GLOW,
                    _ => DARK,
                };
                let idx = ((y * w + x) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&color);
            }
        }
        VideoFrame::new(data, w, h, 0, 0)
    }

    fn face_mask() -> [[u8; 8]; 8] {
        let mut mask = [[0u8; 8]; 8];
        for y in 1..4 {
            for x in 2..5 {
                mask[y][x] = 1;
            }
        }
        mask
    }

    #[test]
    fn test_single_face_region() {
        let mut detector = HeuristicDetector::new(HeuristicConfig::default());
        let detection = detector.detect(&frame_from_mask(&face_mask())).unwrap();
        assert_eq!(detection.faces.len(), 1);
        assert!(detection.faces[0].landmarks.is_none());
        assert!(detection.faces[0].confidence >= 0.3);
    }

    #[test]
    fn test_dark_frame_has_no_faces() {
        let mut detector = HeuristicDetector::new(HeuristicConfig::default());
        let detection = detector.detect(&frame_from_mask(&[[0; 8]; 8])).unwrap();
        assert!(detection.faces.is_empty());
    }

    #[test]
    fn test_two_separated_regions_are_two_faces() {
        let mut mask = [[0u8; 8]; 8];
        // Two 2x2 skin blobs in opposite corners, well past the separation distance
        for y in 0..2 {
            for x in 0..2 {
                mask[y][x] = 1;
                mask[y + 6][x + 6] = 1;
            }
        }
        let mut detector = HeuristicDetector::new(HeuristicConfig {
            min_region_cells: 2,
            ..Default::default()
        });
        let detection = detector.detect(&frame_from_mask(&mask)).unwrap();
        assert_eq!(detection.faces.len(), 2);
    }

    #[test]
    fn test_adjacent_regions_merge_into_one_face() {
        let mut mask = [[0u8; 8]; 8];
        // Two blobs one diagonal cell apart: same face through noise
        mask[1][1] = 1;
        mask[1][2] = 1;
        mask[2][1] = 1;
        mask[3][3] = 1;
        mask[3][4] = 1;
        mask[4][3] = 1;
        let mut detector = HeuristicDetector::new(HeuristicConfig {
            min_region_cells: 3,
            ..Default::default()
        });
        let detection = detector.detect(&frame_from_mask(&mask)).unwrap();
        assert_eq!(detection.faces.len(), 1);
    }

    #[test]
    fn test_bright_static_spots_flag_device_after_motion_baseline() {
        let mut mask = face_mask();
        mask[6][6] = 2;
        mask[6][7] = 2;
        let frame = frame_from_mask(&mask);

        let mut detector = HeuristicDetector::new(HeuristicConfig::default());
        // First frame: no motion baseline, nothing can be "static" yet
        let first = detector.detect(&frame).unwrap();
        assert!(first.objects.is_empty());
        // Second identical frame: the glow cells are bright and motionless
        let second = detector.detect(&frame).unwrap();
        assert_eq!(second.objects.len(), 1);
        assert_eq!(second.objects[0].class, DeviceClass::Monitor);
    }
}
