//! Text recognition: region cropping, normalization and CTC decoding

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array3, ArrayView2};
use std::path::Path;

use crate::detection::TextBox;
use crate::OcrError;

/// Fixed input height of the recognition model
pub(crate) const REC_IMAGE_HEIGHT: usize = 48;

/// Column-gap threshold above which a word boundary is inserted
///
/// The CTC output has one column per timestep; characters inside a word sit
/// a few columns apart while word boundaries leave a wider gap.
const WORD_GAP_THRESHOLD: usize = 8;

/// Crop a detected region out of the page image
///
/// With `rotate_vertical` set, crops that are clearly taller than wide are
/// rotated a quarter turn so vertical text lines read horizontally.
pub(crate) fn crop_region(image: &RgbImage, region: &TextBox, rotate_vertical: bool) -> RgbImage {
    let x = region.x.max(0.0) as u32;
    let y = region.y.max(0.0) as u32;
    let width = region.width.max(1.0) as u32;
    let height = region.height.max(1.0) as u32;
    let crop = imageops::crop_imm(image, x, y, width, height).to_image();

    if rotate_vertical && height > width * 2 {
        imageops::rotate90(&crop)
    } else {
        crop
    }
}

/// Resize a cropped region to the model's fixed height and normalize it
///
/// Width follows the crop's aspect ratio, capped at `target_width` (the
/// widest member of the current batch). Pixels are normalized to [-1, 1].
pub(crate) fn normalize_region(img: &RgbImage, target_width: usize) -> Array3<f32> {
    let (w, h) = img.dimensions();
    let ratio = w as f32 / h.max(1) as f32;
    let resized_w = (((REC_IMAGE_HEIGHT as f32) * ratio).ceil() as usize).clamp(1, target_width);
    let resized = imageops::resize(
        img,
        resized_w as u32,
        REC_IMAGE_HEIGHT as u32,
        FilterType::CatmullRom,
    );

    let mut array = Array3::<f32>::zeros((3, REC_IMAGE_HEIGHT, resized_w));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            array[[c, y as usize, x as usize]] = (f32::from(pixel[c]) / 255.0 - 0.5) / 0.5;
        }
    }
    array
}

/// Greedy CTC decode of one region's predictions
///
/// `preds` is `[timesteps, num_classes]`. Repeated argmax indices collapse,
/// blanks (index 0) drop out, and wide column gaps become spaces.
pub(crate) fn ctc_decode(dict: &[String], preds: ArrayView2<'_, f32>) -> (String, f32) {
    let mut chars: Vec<&str> = Vec::new();
    let mut columns: Vec<usize> = Vec::new();
    let mut confidences: Vec<f32> = Vec::new();

    let mut previous = 0usize;
    for (t, row) in preds.outer_iter().enumerate() {
        let (index, prob) = row
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, &v)| {
                if v > best.1 {
                    (i, v)
                } else {
                    best
                }
            });
        let repeated = index == previous;
        previous = index;
        if index == 0 || repeated {
            continue;
        }
        if let Some(ch) = dict.get(index) {
            chars.push(ch.as_str());
            columns.push(t);
            confidences.push(prob);
        }
    }

    let mut text = String::new();
    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && columns[i] - columns[i - 1] > WORD_GAP_THRESHOLD {
            text.push(' ');
        }
        text.push_str(ch);
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    (text, confidence)
}

/// Load the CTC character dictionary
///
/// Index 0 is the CTC blank token and the final entry is the space
/// character, bracketing the characters read from the file.
pub(crate) fn load_character_dict(path: &Path) -> Result<Vec<String>, OcrError> {
    use std::io::{BufRead, BufReader};

    let file = std::fs::File::open(path)
        .map_err(|e| OcrError::ModelLoad(format!("failed to open character dictionary: {e}")))?;
    let reader = BufReader::new(file);

    let mut characters = vec!["blank".to_string()];
    for line in reader.lines() {
        let line =
            line.map_err(|e| OcrError::ModelLoad(format!("failed to read dictionary: {e}")))?;
        let ch = line.trim().to_string();
        if !ch.is_empty() {
            characters.push(ch);
        }
    }
    characters.push(" ".to_string());

    Ok(characters)
}
