//! Binary mask operations: blur, dilation, connected components.
//!
//! All of this is deterministic: pixels are visited in row-major order and the
//! flood fill is iterative, so region discovery order is reproducible across
//! runs (required for the detector's ordering guarantees).

use super::result::MotionRegion;

/// 3x3 box blur over a grayscale buffer. Edge pixels average the in-bounds
/// neighborhood only.
pub(crate) fn box_blur(luma: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut out = vec![0u8; luma.len()];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0u32;
            let mut count = 0u32;
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let ny = y as i32 + dy;
                    let nx = x as i32 + dx;
                    if ny >= 0 && ny < h as i32 && nx >= 0 && nx < w as i32 {
                        sum += luma[ny as usize * w + nx as usize] as u32;
                        count += 1;
                    }
                }
            }
            out[y * w + x] = (sum / count) as u8;
        }
    }
    out
}

/// One pass of 3x3 binary dilation: a pixel becomes set if any neighbor is set.
pub(crate) fn dilate(mask: &[bool], width: u32, height: u32) -> Vec<bool> {
    let w = width as usize;
    let h = height as usize;
    let mut out = vec![false; mask.len()];
    for y in 0..h {
        for x in 0..w {
            'neighbors: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let ny = y as i32 + dy;
                    let nx = x as i32 + dx;
                    if ny >= 0
                        && ny < h as i32
                        && nx >= 0
                        && nx < w as i32
                        && mask[ny as usize * w + nx as usize]
                    {
                        out[y * w + x] = true;
                        break 'neighbors;
                    }
                }
            }
        }
    }
    out
}

/// Group set pixels into 8-connected components via iterative flood fill.
///
/// Components are emitted in row-major order of their first-visited pixel, so
/// the output order is deterministic. No area filtering happens here.
pub(crate) fn connected_components(mask: &[bool], width: u32, height: u32) -> Vec<MotionRegion> {
    let w = width as usize;
    let h = height as usize;
    let mut visited = vec![false; mask.len()];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        let mut min_x = w;
        let mut min_y = h;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        let mut area = 0u32;

        visited[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let y = idx / w;
            let x = idx % w;
            area += 1;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let ny = y as i32 + dy;
                    let nx = x as i32 + dx;
                    if ny < 0 || ny >= h as i32 || nx < 0 || nx >= w as i32 {
                        continue;
                    }
                    let nidx = ny as usize * w + nx as usize;
                    if mask[nidx] && !visited[nidx] {
                        visited[nidx] = true;
                        stack.push(nidx);
                    }
                }
            }
        }

        regions.push(MotionRegion {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
            area,
        });
    }
    regions
}
