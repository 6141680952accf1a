//! Xiaolin Wu's variance-minimizing greedy-bipartition color quantizer,
//! plus Floyd–Steinberg dithering.
//!
//! A 33×33×33 histogram of cumulative moments is built and recursively
//! bisected along whichever axis most reduces total variance, then the
//! resulting boxes are turned into a palette and an O(1) nearest-color
//! lookup table.

use crate::error::Status;
use crate::model::{Image, Palette, PixelFormat};

const HIST_SIDE: usize = 33;
const LUT_SIDE: usize = 32;

/// One axis-aligned box in the 33-bucket RGB cube, tracked by its
/// inclusive bucket bounds.
#[derive(Clone, Copy)]
struct Box3 {
    r0: usize,
    r1: usize,
    g0: usize,
    g1: usize,
    b0: usize,
    b1: usize,
}

/// Cumulative moments over the histogram cube: `vwt` (weight), `vmr`/`vmg`/
/// `vmb` (first moments), `m2` (second moment / variance accumulator).
struct Moments {
    vwt: Vec<f64>,
    vmr: Vec<f64>,
    vmg: Vec<f64>,
    vmb: Vec<f64>,
    m2: Vec<f64>,
}

fn idx(r: usize, g: usize, b: usize) -> usize {
    (r * HIST_SIDE + g) * HIST_SIDE + b
}

impl Moments {
    fn build(image: &Image) -> Result<Self, Status> {
        let n = HIST_SIDE * HIST_SIDE * HIST_SIDE;
        let mut raw_wt = vec![0f64; n];
        let mut raw_mr = vec![0f64; n];
        let mut raw_mg = vec![0f64; n];
        let mut raw_mb = vec![0f64; n];
        let mut raw_m2 = vec![0f64; n];

        for_each_rgb8(image, |r, g, b| {
            // Top 5 bits per channel, offset by 1.
            let ri = (r >> 3) as usize + 1;
            let gi = (g >> 3) as usize + 1;
            let bi = (b >> 3) as usize + 1;
            let i = idx(ri, gi, bi);
            raw_wt[i] += 1.0;
            raw_mr[i] += r as f64;
            raw_mg[i] += g as f64;
            raw_mb[i] += b as f64;
            raw_m2[i] += (r as f64).powi(2) + (g as f64).powi(2) + (b as f64).powi(2);
        })?;

        // Convert to cumulative moments along R, then G, then B so that any
        // box's statistics are an O(1) combination of eight corners.
        for r in 1..HIST_SIDE {
            let (mut area_wt, mut area_mr, mut area_mg, mut area_mb, mut area_m2) =
                (vec![0f64; HIST_SIDE], vec![0f64; HIST_SIDE], vec![0f64; HIST_SIDE], vec![0f64; HIST_SIDE], vec![0f64; HIST_SIDE]);
            for g in 1..HIST_SIDE {
                let (mut line_wt, mut line_mr, mut line_mg, mut line_mb, mut line_m2) =
                    (0f64, 0f64, 0f64, 0f64, 0f64);
                for b in 1..HIST_SIDE {
                    let i = idx(r, g, b);
                    line_wt += raw_wt[i];
                    line_mr += raw_mr[i];
                    line_mg += raw_mg[i];
                    line_mb += raw_mb[i];
                    line_m2 += raw_m2[i];

                    area_wt[b] += line_wt;
                    area_mr[b] += line_mr;
                    area_mg[b] += line_mg;
                    area_mb[b] += line_mb;
                    area_m2[b] += line_m2;

                    let prev = idx(r - 1, g, b);
                    raw_wt[i] = raw_wt[prev] + area_wt[b];
                    raw_mr[i] = raw_mr[prev] + area_mr[b];
                    raw_mg[i] = raw_mg[prev] + area_mg[b];
                    raw_mb[i] = raw_mb[prev] + area_mb[b];
                    raw_m2[i] = raw_m2[prev] + area_m2[b];
                }
            }
        }

        Ok(Self {
            vwt: raw_wt,
            vmr: raw_mr,
            vmg: raw_mg,
            vmb: raw_mb,
            m2: raw_m2,
        })
    }

    fn volume(&self, b: &Box3, table: &[f64]) -> f64 {
        table[idx(b.r1, b.g1, b.b1)] - table[idx(b.r1, b.g1, b.b0)]
            - table[idx(b.r1, b.g0, b.b1)] + table[idx(b.r1, b.g0, b.b0)]
            - table[idx(b.r0, b.g1, b.b1)] + table[idx(b.r0, b.g1, b.b0)]
            + table[idx(b.r0, b.g0, b.b1)] - table[idx(b.r0, b.g0, b.b0)]
    }

    fn weight(&self, b: &Box3) -> f64 {
        self.volume(b, &self.vwt)
    }

    fn centroid(&self, b: &Box3) -> (u8, u8, u8) {
        let w = self.weight(b).max(1.0);
        let r = (self.volume(b, &self.vmr) / w).round().clamp(0.0, 255.0) as u8;
        let g = (self.volume(b, &self.vmg) / w).round().clamp(0.0, 255.0) as u8;
        let bch = (self.volume(b, &self.vmb) / w).round().clamp(0.0, 255.0) as u8;
        (r, g, bch)
    }

    /// Variance contribution of this box.
    fn variance(&self, b: &Box3) -> f64 {
        let dr = self.volume(b, &self.vmr);
        let dg = self.volume(b, &self.vmg);
        let db = self.volume(b, &self.vmb);
        let xx = self.volume(b, &self.m2);
        let w = self.weight(b);
        if w <= 0.0 {
            0.0
        } else {
            xx - (dr * dr + dg * dg + db * db) / w
        }
    }

    /// Find the best split position along `axis` within `b`, returning the
    /// cut position that maximizes between-box variance.
    fn best_cut(&self, b: &Box3, axis: Axis) -> Option<usize> {
        let whole_r = self.volume(b, &self.vmr);
        let whole_g = self.volume(b, &self.vmg);
        let whole_b = self.volume(b, &self.vmb);
        let whole_w = self.weight(b);
        if whole_w <= 0.0 {
            return None;
        }

        let (lo, hi) = match axis {
            Axis::R => (b.r0, b.r1),
            Axis::G => (b.g0, b.g1),
            Axis::B => (b.b0, b.b1),
        };
        let mut best_pos = None;
        let mut best_score = 0.0f64;
        for cut in lo + 1..hi {
            let half = split_box(b, axis, cut);
            let w1 = self.weight(&half);
            if w1 <= 0.0 || whole_w - w1 <= 0.0 {
                continue;
            }
            let r1 = self.volume(&half, &self.vmr);
            let g1 = self.volume(&half, &self.vmg);
            let b1 = self.volume(&half, &self.vmb);
            let half_score = (r1 * r1 + g1 * g1 + b1 * b1) / w1;
            let r2 = whole_r - r1;
            let g2 = whole_g - g1;
            let b2 = whole_b - b1;
            let w2 = whole_w - w1;
            let rest_score = (r2 * r2 + g2 * g2 + b2 * b2) / w2;
            let score = half_score + rest_score;
            if score > best_score {
                best_score = score;
                best_pos = Some(cut);
            }
        }
        best_pos
    }
}

#[derive(Clone, Copy)]
enum Axis {
    R,
    G,
    B,
}

fn split_box(b: &Box3, axis: Axis, cut: usize) -> Box3 {
    let mut lower = *b;
    match axis {
        Axis::R => lower.r1 = cut,
        Axis::G => lower.g1 = cut,
        Axis::B => lower.b1 = cut,
    }
    lower
}

fn split_box_upper(b: &Box3, axis: Axis, cut: usize) -> Box3 {
    let mut upper = *b;
    match axis {
        Axis::R => upper.r0 = cut,
        Axis::G => upper.g0 = cut,
        Axis::B => upper.b0 = cut,
    }
    upper
}

/// Iterate every pixel of `image` as 8-bit RGB, converting on the fly from
/// whatever format it's currently in via the general conversion path.
fn for_each_rgb8(image: &Image, mut f: impl FnMut(u8, u8, u8)) -> Result<(), Status> {
    let rgb = if image.pixel_format == PixelFormat::Bpp24Rgb {
        None
    } else {
        Some(crate::convert::convert(
            image,
            PixelFormat::Bpp24Rgb,
            crate::convert::ConvertOptions {
                blend_alpha: true,
                ..Default::default()
            },
        )?)
    };
    let source = rgb.as_ref().unwrap_or(image);
    let width = source.width as usize;
    for y in 0..source.height {
        let row = source.row(y);
        for x in 0..width {
            let p = &row[x * 3..x * 3 + 3];
            f(p[0], p[1], p[2]);
        }
    }
    Ok(())
}

/// Split the whole cube into `k` boxes, each time bisecting the highest
/// remaining-variance box along its best axis.
fn build_boxes(moments: &Moments, k: usize) -> Vec<Box3> {
    let whole = Box3 {
        r0: 0,
        r1: HIST_SIDE - 1,
        g0: 0,
        g1: HIST_SIDE - 1,
        b0: 0,
        b1: HIST_SIDE - 1,
    };
    let mut boxes = vec![whole];
    while boxes.len() < k {
        let (split_idx, axis, cut) = {
            let mut candidates = boxes
                .iter()
                .enumerate()
                .filter_map(|(i, b)| {
                    let best = [Axis::R, Axis::G, Axis::B]
                        .into_iter()
                        .filter_map(|axis| moments.best_cut(b, axis).map(|cut| (axis, cut)))
                        .max_by(|(ax1, c1), (ax2, c2)| {
                            let v1 = moments.variance(&split_box(b, *ax1, *c1));
                            let v2 = moments.variance(&split_box(b, *ax2, *c2));
                            v1.partial_cmp(&v2).unwrap()
                        });
                    best.map(|(axis, cut)| (i, axis, cut, moments.variance(b)))
                })
                .collect::<Vec<_>>();
            if candidates.is_empty() {
                break;
            }
            candidates.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap());
            let (i, axis, cut, _) = candidates[0];
            (i, axis, cut)
        };
        let b = boxes[split_idx];
        let lower = split_box(&b, axis, cut);
        let upper = split_box_upper(&b, axis, cut);
        boxes[split_idx] = lower;
        boxes.push(upper);
    }
    boxes
}

fn target_k(format: PixelFormat) -> Result<usize, Status> {
    match format {
        PixelFormat::Bpp1Indexed => Ok(2),
        PixelFormat::Bpp2Indexed => Ok(4),
        PixelFormat::Bpp4Indexed => Ok(16),
        PixelFormat::Bpp8Indexed => Ok(256),
        _ => Err(Status::UnsupportedPixelFormat),
    }
}

/// Build a 32×32×32 lookup table mapping every quantized RGB bucket to its
/// nearest palette index by squared Euclidean distance.
fn build_lut(palette: &[(u8, u8, u8)]) -> Vec<u8> {
    let mut lut = vec![0u8; LUT_SIDE * LUT_SIDE * LUT_SIDE];
    for r in 0..LUT_SIDE {
        for g in 0..LUT_SIDE {
            for b in 0..LUT_SIDE {
                let (rc, gc, bc) = (
                    (r * 255 / (LUT_SIDE - 1)) as i32,
                    (g * 255 / (LUT_SIDE - 1)) as i32,
                    (b * 255 / (LUT_SIDE - 1)) as i32,
                );
                let mut best = 0usize;
                let mut best_dist = i32::MAX;
                for (i, &(pr, pg, pb)) in palette.iter().enumerate() {
                    let dr = rc - pr as i32;
                    let dg = gc - pg as i32;
                    let db = bc - pb as i32;
                    let dist = dr * dr + dg * dg + db * db;
                    if dist < best_dist {
                        best_dist = dist;
                        best = i;
                    }
                }
                lut[(r * LUT_SIDE + g) * LUT_SIDE + b] = best as u8;
            }
        }
    }
    lut
}

fn lut_lookup(lut: &[u8], r: u8, g: u8, b: u8) -> u8 {
    let idx = |v: u8| (v as usize * (LUT_SIDE - 1) / 255).min(LUT_SIDE - 1);
    lut[(idx(r) * LUT_SIDE + idx(g)) * LUT_SIDE + idx(b)]
}

/// Pack palette index `idx` into `target`'s bit-packed layout at pixel `x`
/// of `row`.
fn pack_index(row: &mut [u8], x: usize, idx: u8, format: PixelFormat) {
    match format {
        PixelFormat::Bpp8Indexed => row[x] = idx,
        PixelFormat::Bpp4Indexed => {
            let byte = x / 2;
            if x % 2 == 0 {
                row[byte] = (row[byte] & 0x0F) | (idx << 4);
            } else {
                row[byte] = (row[byte] & 0xF0) | (idx & 0x0F);
            }
        }
        PixelFormat::Bpp2Indexed => {
            let byte = x / 4;
            let shift = 6 - 2 * (x % 4);
            row[byte] = (row[byte] & !(0b11 << shift)) | ((idx & 0b11) << shift);
        }
        PixelFormat::Bpp1Indexed => {
            let byte = x / 8;
            let shift = 7 - (x % 8);
            row[byte] = (row[byte] & !(1 << shift)) | ((idx & 1) << shift);
        }
        _ => unreachable!("target_k() restricts format to indexed variants"),
    }
}

/// Quantize `image` to `target` (one of the four indexed pixel formats),
/// attaching a 24-bit-RGB palette, with optional Floyd–Steinberg dithering.
pub fn quantize(image: &Image, target: PixelFormat, dither: bool) -> Result<Image, Status> {
    let k = target_k(target)?;
    let moments = Moments::build(image)?;
    let boxes = build_boxes(&moments, k);
    let palette: Vec<(u8, u8, u8)> = boxes
        .iter()
        .filter(|b| moments.weight(b) > 0.0)
        .map(|b| moments.centroid(b))
        .collect();
    let palette = if palette.is_empty() {
        vec![(0, 0, 0)]
    } else {
        palette
    };

    let mut out = Image::skeleton(image.width, image.height, target);
    out.allocate_pixels();
    let mut palette_data = Vec::with_capacity(palette.len() * 3);
    for &(r, g, b) in &palette {
        palette_data.extend_from_slice(&[r, g, b]);
    }
    out.palette = Some(Palette {
        pixel_format: PixelFormat::Bpp24Rgb,
        data: palette_data,
    });

    let rgb_source = if image.pixel_format == PixelFormat::Bpp24Rgb {
        None
    } else {
        Some(crate::convert::convert(
            image,
            PixelFormat::Bpp24Rgb,
            crate::convert::ConvertOptions {
                blend_alpha: true,
                ..Default::default()
            },
        )?)
    };
    let source = rgb_source.as_ref().unwrap_or(image);

    if !dither {
        let width = image.width as usize;
        for y in 0..image.height {
            let src_row = source.row(y);
            for x in 0..width {
                let p = &src_row[x * 3..x * 3 + 3];
                let idx = nearest_index(&palette, p[0], p[1], p[2]);
                let dst_row = out.row_mut(y);
                pack_index(dst_row, x, idx, target);
            }
        }
        return Ok(out);
    }

    let lut = build_lut(&palette);
    let width = source.width as usize;
    let mut cur_err = vec![(0f64, 0f64, 0f64); width + 2];
    let mut next_err = vec![(0f64, 0f64, 0f64); width + 2];
    for y in 0..source.height {
        let src_row = source.row(y).to_vec();
        for x in 0..width {
            let (er, eg, eb) = cur_err[x + 1];
            let r = (src_row[x * 3] as f64 + er).clamp(0.0, 255.0);
            let g = (src_row[x * 3 + 1] as f64 + eg).clamp(0.0, 255.0);
            let b = (src_row[x * 3 + 2] as f64 + eb).clamp(0.0, 255.0);
            let idx = lut_lookup(&lut, r as u8, g as u8, b as u8);
            let (pr, pg, pb) = palette[idx as usize];
            {
                let dst_row = out.row_mut(y);
                pack_index(dst_row, x, idx, target);
            }
            let (dr, dg, db) = (r - pr as f64, g - pg as f64, b - pb as f64);
            cur_err[x + 2].0 += dr * 7.0 / 16.0;
            cur_err[x + 2].1 += dg * 7.0 / 16.0;
            cur_err[x + 2].2 += db * 7.0 / 16.0;
            next_err[x].0 += dr * 3.0 / 16.0;
            next_err[x].1 += dg * 3.0 / 16.0;
            next_err[x].2 += db * 3.0 / 16.0;
            next_err[x + 1].0 += dr * 5.0 / 16.0;
            next_err[x + 1].1 += dg * 5.0 / 16.0;
            next_err[x + 1].2 += db * 5.0 / 16.0;
            next_err[x + 2].0 += dr * 1.0 / 16.0;
            next_err[x + 2].1 += dg * 1.0 / 16.0;
            next_err[x + 2].2 += db * 1.0 / 16.0;
        }
        cur_err = next_err;
        next_err = vec![(0f64, 0f64, 0f64); width + 2];
    }

    Ok(out)
}

fn nearest_index(palette: &[(u8, u8, u8)], r: u8, g: u8, b: u8) -> u8 {
    let mut best = 0usize;
    let mut best_dist = i32::MAX;
    for (i, &(pr, pg, pb)) in palette.iter().enumerate() {
        let dr = r as i32 - pr as i32;
        let dg = g as i32 - pg as i32;
        let db = b as i32 - pb as i32;
        let dist = dr * dr + dg * dg + db * db;
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best as u8
}
