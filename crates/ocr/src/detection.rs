//! Text detection: preprocessing and DB postprocessing
//!
//! The detection model outputs a per-pixel probability map. Postprocessing
//! thresholds it into a binary mask, finds connected regions, scores and
//! expands them, and maps the surviving boxes back to source-image
//! coordinates in reading order.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use ndarray::{Array4, ArrayView2};

use crate::OcrError;

/// Normalization mean, RGB order
const DET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Normalization standard deviation, RGB order
const DET_STD: [f32; 3] = [0.229, 0.224, 0.225];
/// DB box expansion ratio
const UNCLIP_RATIO: f32 = 1.6;
/// Vertical tolerance when grouping boxes into the same text row, in
/// image pixels
const ROW_TOLERANCE: f32 = 10.0;

/// A detected text region in source-image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub score: f32,
}

/// Resize and normalize an image for the detection model
///
/// The model requires both sides to be multiples of 32; the longest side is
/// capped depending on the input size.
pub(crate) fn preprocess(image: &RgbImage) -> Result<Array4<f32>, OcrError> {
    let (width, height) = image.dimensions();
    let max_wh = width.max(height);

    let limit = if max_wh < 960 {
        960.0
    } else if max_wh < 1500 {
        1500.0
    } else {
        2000.0
    };
    let ratio = if max_wh as f32 > limit {
        limit / max_wh as f32
    } else {
        1.0
    };

    let resize_w = (((width as f32 * ratio).round() / 32.0).round() as u32) * 32;
    let resize_h = (((height as f32 * ratio).round() / 32.0).round() as u32) * 32;
    if resize_w == 0 || resize_h == 0 {
        return Err(OcrError::Preprocessing(format!(
            "image {width}x{height} is too small to detect text in"
        )));
    }

    let resized = imageops::resize(image, resize_w, resize_h, FilterType::CatmullRom);

    let mut array = Array4::<f32>::zeros((1, 3, resize_h as usize, resize_w as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            array[[0, c, y as usize, x as usize]] =
                (f32::from(pixel[c]) / 255.0 - DET_MEAN[c]) / DET_STD[c];
        }
    }
    Ok(array)
}

/// Extract text boxes from the detection probability map
///
/// `original` is the source image size the boxes are scaled back to.
pub(crate) fn extract_boxes(
    pred: ArrayView2<'_, f32>,
    original: (u32, u32),
    thresh: f32,
    box_thresh: f32,
) -> Vec<TextBox> {
    let (src_w, src_h) = original;
    let (map_h, map_w) = (pred.shape()[0], pred.shape()[1]);

    let mut mask = GrayImage::new(map_w as u32, map_h as u32);
    for ((y, x), value) in pred.indexed_iter() {
        if *value > thresh {
            mask.put_pixel(x as u32, y as u32, Luma([255u8]));
        }
    }
    let mask = imageproc::morphology::dilate(&mask, imageproc::distance_transform::Norm::L1, 1);

    let mut boxes = Vec::new();
    for contour in imageproc::contours::find_contours::<u32>(&mask) {
        if contour.points.is_empty() {
            continue;
        }

        let min_x = contour.points.iter().map(|p| p.x).min().unwrap_or(0) as f32;
        let max_x = contour.points.iter().map(|p| p.x).max().unwrap_or(0) as f32;
        let min_y = contour.points.iter().map(|p| p.y).min().unwrap_or(0) as f32;
        let max_y = contour.points.iter().map(|p| p.y).max().unwrap_or(0) as f32;
        let width = max_x - min_x;
        let height = max_y - min_y;
        if width.min(height) < 3.0 {
            continue;
        }

        let score = region_score(&pred, min_x, min_y, max_x, max_y);
        if score < box_thresh {
            continue;
        }

        // DB unclip: offset every side outwards by area * ratio / perimeter
        let offset = width * height * UNCLIP_RATIO / (2.0 * (width + height));
        let exp_x = min_x - offset;
        let exp_y = min_y - offset;
        let exp_w = width + 2.0 * offset;
        let exp_h = height + 2.0 * offset;
        if exp_w.min(exp_h) < 5.0 {
            continue;
        }

        let scale_x = src_w as f32 / map_w as f32;
        let scale_y = src_h as f32 / map_h as f32;
        let final_x = (exp_x * scale_x).clamp(0.0, (src_w.saturating_sub(1)) as f32);
        let final_y = (exp_y * scale_y).clamp(0.0, (src_h.saturating_sub(1)) as f32);
        let final_right = ((exp_x + exp_w) * scale_x).clamp(0.0, (src_w.saturating_sub(1)) as f32);
        let final_bottom = ((exp_y + exp_h) * scale_y).clamp(0.0, (src_h.saturating_sub(1)) as f32);
        let final_w = final_right - final_x;
        let final_h = final_bottom - final_y;
        if final_w <= 3.0 || final_h <= 3.0 {
            continue;
        }

        boxes.push(TextBox {
            x: final_x,
            y: final_y,
            width: final_w,
            height: final_h,
            score,
        });
    }

    sort_reading_order(boxes)
}

/// Mean probability over the axis-aligned region
fn region_score(pred: &ArrayView2<'_, f32>, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> f32 {
    let (map_h, map_w) = (pred.shape()[0], pred.shape()[1]);
    let x0 = (min_x.floor().max(0.0) as usize).min(map_w - 1);
    let x1 = (max_x.ceil().max(0.0) as usize).min(map_w - 1);
    let y0 = (min_y.floor().max(0.0) as usize).min(map_h - 1);
    let y1 = (max_y.ceil().max(0.0) as usize).min(map_h - 1);

    let mut sum = 0.0f32;
    let mut count = 0usize;
    for y in y0..=y1 {
        for x in x0..=x1 {
            sum += pred[[y, x]];
            count += 1;
        }
    }
    if count > 0 {
        sum / count as f32
    } else {
        0.0
    }
}

/// Sort boxes top-to-bottom, left-to-right within a row
fn sort_reading_order(mut boxes: Vec<TextBox>) -> Vec<TextBox> {
    if boxes.len() <= 1 {
        return boxes;
    }

    boxes.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    // Neighbors within the row tolerance are ordered by x even when their
    // baselines differ slightly
    let n = boxes.len();
    for i in 0..(n - 1) {
        for j in (0..=i).rev() {
            if j + 1 < n
                && (boxes[j + 1].y - boxes[j].y).abs() < ROW_TOLERANCE
                && boxes[j + 1].x < boxes[j].x
            {
                boxes.swap(j, j + 1);
            } else {
                break;
            }
        }
    }

    boxes
}
