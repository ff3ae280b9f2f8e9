/// Pixel comparison on top of the `image` crate
use super::{
    format_percentage, Color, DiffBounds, DiffEngine, DiffError, DiffOptions, DiffOutcome,
    DiffReport, DimensionDifference, ErrorType, OutputOptions, Tolerance,
};
use image::{imageops::FilterType, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::time::Instant;

/// Every `LARGE_IMAGE_SKIP`th row and column is copied instead of compared on large images
const LARGE_IMAGE_SKIP: u32 = 6;

/// Neighbour distance inspected when detecting antialiasing
const ANTIALIAS_DISTANCE: i64 = 1;

/// Diff engine that compares decoded RGBA pixels
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDiffEngine;

impl PixelDiffEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Pixel with derived brightness and hue
#[derive(Debug, Clone, Copy)]
struct Pixel {
    r: f64,
    g: f64,
    b: f64,
    a: f64,
    brightness: f64,
    hue: f64,
}

impl Pixel {
    fn from_rgba(px: &Rgba<u8>) -> Self {
        let [r, g, b, a] = px.0;
        let (r, g, b, a) = (r as f64, g as f64, b as f64, a as f64);
        Self {
            r,
            g,
            b,
            a,
            brightness: 0.3 * r + 0.59 * g + 0.11 * b,
            hue: hue(r, g, b),
        }
    }

    fn same_rgb(&self, other: &Pixel) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }

    fn is_color(&self, color: Color) -> bool {
        self.r == color.red as f64 && self.g == color.green as f64 && self.b == color.blue as f64
    }
}

/// HSL hue normalised to 0..1
fn hue(r: f64, g: f64, b: f64) -> f64 {
    let (r, g, b) = (r / 255.0, g / 255.0, b / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);

    if max == min {
        return 0.0;
    }

    let d = max - min;
    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    h / 6.0
}

fn within(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

fn is_rgb_similar(a: &Pixel, b: &Pixel, tol: &Tolerance) -> bool {
    within(a.r, b.r, tol.red)
        && within(a.g, b.g, tol.green)
        && within(a.b, b.b, tol.blue)
        && within(a.a, b.a, tol.alpha)
}

fn is_brightness_similar(a: &Pixel, b: &Pixel, tol: &Tolerance) -> bool {
    within(a.a, b.a, tol.alpha) && within(a.brightness, b.brightness, tol.min_brightness)
}

/// Heuristic: a pixel sitting on a high-contrast or multi-hue edge, or with
/// fewer than two identical neighbours, is treated as antialiasing.
fn is_antialiased(img: &RgbaImage, x: u32, y: u32, source: &Pixel, tol: &Tolerance) -> bool {
    let (width, height) = img.dimensions();
    let mut high_contrast_siblings = 0;
    let mut equivalent_siblings = 0;
    let mut different_hue_siblings = 0;

    for dy in -ANTIALIAS_DISTANCE..=ANTIALIAS_DISTANCE {
        for dx in -ANTIALIAS_DISTANCE..=ANTIALIAS_DISTANCE {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }

            let target = Pixel::from_rgba(img.get_pixel(nx as u32, ny as u32));

            if (source.brightness - target.brightness).abs() > tol.max_brightness {
                high_contrast_siblings += 1;
            }
            if source.same_rgb(&target) {
                equivalent_siblings += 1;
            }
            if (target.hue - source.hue).abs() > 0.3 {
                different_hue_siblings += 1;
            }

            if different_hue_siblings > 1 || high_contrast_siblings > 1 {
                return true;
            }
        }
    }

    equivalent_siblings < 2
}

fn copy_pixel(p: &Pixel, transparency: f64) -> Rgba<u8> {
    Rgba([p.r as u8, p.g as u8, p.b as u8, (p.a * transparency) as u8])
}

fn copy_gray_pixel(p: &Pixel, transparency: f64) -> Rgba<u8> {
    let gray = p.brightness.clamp(0.0, 255.0) as u8;
    Rgba([gray, gray, gray, (p.a * transparency) as u8])
}

fn error_pixel(second: &Pixel, output: &OutputOptions) -> Rgba<u8> {
    let c = output.error_color;
    match output.error_type {
        ErrorType::Flat => Rgba([c.red, c.green, c.blue, 255]),
        ErrorType::Movement => {
            let blend = |channel: f64, error: u8| {
                let error = error as f64;
                ((channel * (error / 255.0) + error) / 2.0) as u8
            };
            Rgba([
                blend(second.r, c.red),
                blend(second.g, c.green),
                blend(second.b, c.blue),
                second.a as u8,
            ])
        }
    }
}

fn decode(data: &[u8], which: &'static str) -> Result<RgbaImage, DiffError> {
    image::load_from_memory(data)
        .map(|img| img.to_rgba8())
        .map_err(|e| DiffError::Decode {
            which,
            reason: e.to_string(),
        })
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, DiffError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| DiffError::Render(e.to_string()))?;
    Ok(buf)
}

impl DiffEngine for PixelDiffEngine {
    fn compare(
        &self,
        first: &[u8],
        second: &[u8],
        options: &DiffOptions,
    ) -> Result<DiffOutcome, DiffError> {
        let started = Instant::now();

        let first = decode(first, "first")?;
        let mut second = decode(second, "second")?;

        let (w1, h1) = first.dimensions();
        let (w2, h2) = second.dimensions();
        let is_same_dimensions = w1 == w2 && h1 == h2;

        if options.scale_to_same_size && !is_same_dimensions {
            second = image::imageops::resize(&second, w1, h1, FilterType::Triangle);
        }

        // Only the overlapping area is compared when sizes still differ
        let width = w1.min(second.width());
        let height = h1.min(second.height());

        let tol = options.tolerance();
        let output = &options.output;
        let threshold = output.large_image_threshold;
        let sampled = threshold > 0 && (width > threshold || height > threshold);

        let mut rendered = RgbaImage::new(w1, h1);
        let mut mismatch_count: u64 = 0;
        let mut bounds = DiffBounds {
            top: height,
            left: width,
            bottom: 0,
            right: 0,
        };

        for y in 0..height {
            for x in 0..width {
                let p1 = Pixel::from_rgba(first.get_pixel(x, y));

                if sampled && (y % LARGE_IMAGE_SKIP == 0 || x % LARGE_IMAGE_SKIP == 0) {
                    rendered.put_pixel(x, y, copy_pixel(&p1, output.transparency));
                    continue;
                }

                if output
                    .ignore_areas_colored_with
                    .is_some_and(|color| p1.is_color(color))
                {
                    rendered.put_pixel(x, y, copy_gray_pixel(&p1, output.transparency));
                    continue;
                }

                let p2 = Pixel::from_rgba(second.get_pixel(x, y));

                if is_rgb_similar(&p1, &p2, &tol) {
                    rendered.put_pixel(x, y, copy_pixel(&p1, output.transparency));
                    continue;
                }

                let antialiased = options.ignore_antialiasing
                    && (is_antialiased(&first, x, y, &p1, &tol)
                        || is_antialiased(&second, x, y, &p2, &tol));

                if antialiased && is_brightness_similar(&p1, &p2, &tol) {
                    rendered.put_pixel(x, y, copy_gray_pixel(&p1, output.transparency));
                    continue;
                }

                rendered.put_pixel(x, y, error_pixel(&p2, output));
                mismatch_count += 1;
                bounds.left = bounds.left.min(x);
                bounds.right = bounds.right.max(x);
                bounds.top = bounds.top.min(y);
                bounds.bottom = bounds.bottom.max(y);
            }
        }

        let total = width as u64 * height as u64;
        let raw = if total == 0 {
            0.0
        } else {
            mismatch_count as f64 / total as f64 * 100.0
        };

        let image = if output.output_diff {
            encode_png(&rendered)?
        } else {
            Vec::new()
        };

        Ok(DiffOutcome {
            image,
            report: DiffReport {
                is_same_dimensions,
                dimension_difference: DimensionDifference {
                    width: w1 as i64 - w2 as i64,
                    height: h1 as i64 - h2 as i64,
                },
                raw_mis_match_percentage: raw,
                mis_match_percentage: format_percentage(raw),
                diff_bounds: bounds,
                analysis_time: started.elapsed().as_millis() as u64,
            },
        })
    }
}
