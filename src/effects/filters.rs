//! Per-frame image transforms.
//!
//! Every function here is pure: it borrows a frame and returns a new frame
//! with the same geometry and pixel format. Frames that fail
//! [`Frame::ensure_processable`] are rejected with `InvalidFrame`.

use crate::effects::error::{EffectError, Result};
use crate::effects::frame::Frame;
use crate::effects::types::EffectKind;

/// Hysteresis thresholds for the edge detector, on the L1 gradient scale.
pub const CANNY_LOW: i32 = 100;
pub const CANNY_HIGH: i32 = 200;

/// Black & White cutoff: values strictly above this become 255.
pub const BW_THRESHOLD: u8 = 127;

/// Gaussian blur kernel support (square, odd).
pub const BLUR_KERNEL_SIZE: usize = 21;

// Fixed-point luma coefficients (Q14) for 0.299 R + 0.587 G + 0.114 B.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Apply `effect` to `frame`.
pub fn apply(effect: EffectKind, frame: &Frame) -> Result<Frame> {
    match effect {
        EffectKind::Normal => {
            frame.ensure_processable()?;
            Ok(frame.clone())
        }
        EffectKind::Grayscale => grayscale(frame),
        EffectKind::CannyEdge => canny_edges(frame, CANNY_LOW, CANNY_HIGH),
        EffectKind::BlackAndWhite => black_and_white(frame, BW_THRESHOLD),
        EffectKind::Blur => gaussian_blur(frame, BLUR_KERNEL_SIZE),
        EffectKind::Invert => invert(frame),
    }
}

/// Single-channel luma plane, one byte per pixel.
pub fn luma(frame: &Frame) -> Result<Vec<u8>> {
    frame.ensure_processable()?;
    let (r, g, b) = frame.format().rgb_offsets().ok_or_else(|| {
        EffectError::InvalidFrame(format!("no luma for {:?} frames", frame.format()))
    })?;
    Ok(frame
        .pixels()
        .map(|px| {
            let y = u32::from(px[r]) * LUMA_R
                + u32::from(px[g]) * LUMA_G
                + u32::from(px[b]) * LUMA_B;
            ((y + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT).min(255) as u8
        })
        .collect())
}

/// Replicate a single-channel plane into the frame's three-channel layout.
fn expand_gray(frame: &Frame, plane: &[u8]) -> Result<Frame> {
    let mut data = Vec::with_capacity(plane.len() * 3);
    for &v in plane {
        data.extend_from_slice(&[v, v, v]);
    }
    frame.derive(data)
}

pub fn grayscale(frame: &Frame) -> Result<Frame> {
    expand_gray(frame, &luma(frame)?)
}

/// Luma followed by a binary threshold at `cutoff` (0 or 255 only).
pub fn black_and_white(frame: &Frame, cutoff: u8) -> Result<Frame> {
    let plane: Vec<u8> = luma(frame)?
        .into_iter()
        .map(|v| if v > cutoff { 255 } else { 0 })
        .collect();
    expand_gray(frame, &plane)
}

/// Per-channel complement.
pub fn invert(frame: &Frame) -> Result<Frame> {
    frame.ensure_processable()?;
    frame.derive(frame.data().iter().map(|&v| 255 - v).collect())
}

/// Sigma derived from kernel width when none is given.
pub fn sigma_for_kernel(ksize: usize) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian kernel. A non-positive `sigma` is derived from
/// `ksize`.
pub fn gaussian_kernel(ksize: usize, sigma: f64) -> Vec<f32> {
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        sigma_for_kernel(ksize)
    };
    let center = (ksize as f64 - 1.0) / 2.0;
    let scale = -0.5 / (sigma * sigma);
    let raw: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - center;
            (scale * d * d).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// Reflect-101 border: `gfedcb|abcdefgh|gfedcba`.
fn reflect_101(mut p: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    loop {
        if p < 0 {
            p = -p;
        } else if p >= len {
            p = 2 * (len - 1) - p;
        } else {
            return p as usize;
        }
    }
}

/// Separable Gaussian smoothing with a `ksize` x `ksize` support. Each
/// channel is filtered independently.
pub fn gaussian_blur(frame: &Frame, ksize: usize) -> Result<Frame> {
    frame.ensure_processable()?;
    if ksize % 2 == 0 {
        return Err(EffectError::InvalidFrame(format!(
            "blur kernel size {ksize} must be odd"
        )));
    }
    let kernel = gaussian_kernel(ksize, 0.0);
    let radius = (ksize / 2) as isize;
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let c = frame.format().channels();
    let src = frame.data();

    let mut horizontal = vec![0f32; src.len()];
    for y in 0..h {
        let row = y * w * c;
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = reflect_101(x as isize + k as isize - radius, w);
                    acc += weight * f32::from(src[row + sx * c + ch]);
                }
                horizontal[row + x * c + ch] = acc;
            }
        }
    }

    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            for ch in 0..c {
                let mut acc = 0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = reflect_101(y as isize + k as isize - radius, h);
                    acc += weight * horizontal[(sy * w + x) * c + ch];
                }
                out[(y * w + x) * c + ch] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    frame.derive(out)
}

/// Canny edge map of the frame's luma, replicated into three channels.
///
/// 3x3 Sobel gradients (replicated border), L1 magnitude, non-maximum
/// suppression along the quantised gradient direction, then hysteresis:
/// pixels above `high` seed edges, pixels above `low` join an edge when
/// 8-connected to one.
pub fn canny_edges(frame: &Frame, low: i32, high: i32) -> Result<Frame> {
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    let gray = luma(frame)?;
    let at = |x: isize, y: isize| -> i32 {
        let cx = x.clamp(0, w as isize - 1) as usize;
        let cy = y.clamp(0, h as isize - 1) as usize;
        i32::from(gray[cy * w + cx])
    };

    let mut gx = vec![0i32; w * h];
    let mut gy = vec![0i32; w * h];
    let mut mag = vec![0i32; w * h];
    for y in 0..h {
        for x in 0..w {
            let (xi, yi) = (x as isize, y as isize);
            let dx = (at(xi + 1, yi - 1) + 2 * at(xi + 1, yi) + at(xi + 1, yi + 1))
                - (at(xi - 1, yi - 1) + 2 * at(xi - 1, yi) + at(xi - 1, yi + 1));
            let dy = (at(xi - 1, yi + 1) + 2 * at(xi, yi + 1) + at(xi + 1, yi + 1))
                - (at(xi - 1, yi - 1) + 2 * at(xi, yi - 1) + at(xi + 1, yi - 1));
            let i = y * w + x;
            gx[i] = dx;
            gy[i] = dy;
            mag[i] = dx.abs() + dy.abs();
        }
    }

    // Magnitude outside the frame counts as zero during suppression.
    let mag_at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    const TAN_22_5: f64 = 0.414_213_562_373_095_1;
    const STRONG: u8 = 2;
    const WEAK: u8 = 1;

    let mut state = vec![0u8; w * h];
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = mag[i];
            if m <= low {
                continue;
            }
            let (xi, yi) = (x as isize, y as isize);
            let xs = f64::from(gx[i].abs());
            let ys = f64::from(gy[i].abs());
            let tg22x = xs * TAN_22_5;
            let is_max = if ys < tg22x {
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else if ys > tg22x + 2.0 * xs {
                m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
            } else {
                let s: isize = if (gx[i] < 0) != (gy[i] < 0) { -1 } else { 1 };
                m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
            };
            if !is_max {
                continue;
            }
            if m > high {
                state[i] = STRONG;
                stack.push(i);
            } else {
                state[i] = WEAK;
            }
        }
    }

    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as isize, (i / w) as isize);
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if state[j] == WEAK {
                    state[j] = STRONG;
                    stack.push(j);
                }
            }
        }
    }

    let plane: Vec<u8> = state
        .into_iter()
        .map(|s| if s == STRONG { 255 } else { 0 })
        .collect();
    expand_gray(frame, &plane)
}
