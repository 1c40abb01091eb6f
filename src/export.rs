//! Export module.
//! Rasterizes a `ChartView` into one tall image and writes it as a single
//! multi-page A4 PDF. The image is scaled to the page width and embedded once;
//! every page draws it again, shifted up by one page height.
//! Page arithmetic is in millimetres, PDF coordinates in points.

use anyhow::{Context, Result, bail};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect as PdfRect, Ref};
use std::io::Write;
use std::path::PathBuf;

use crate::config::ExportConfig;
use crate::font;
use crate::photo;
use crate::render::{CardView, ChartView, PhotoView};

const CARD_W: u32 = 200;
const CARD_H: u32 = 240;
const GAP: u32 = 20;
const MARGIN: u32 = 30;
const PHOTO: u32 = 120;
const HEADER_H: u32 = 200;
const SECTION_TITLE_H: u32 = 36;
const SECTION_GAP: u32 = 30;
const MAX_PER_ROW: u32 = 5;
const PT_PER_MM: f64 = 72.0 / 25.4;
const IMAGE_NAME: Name<'static> = Name(b"Chart");

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([33, 37, 41, 255]);
const MUTED: Rgba<u8> = Rgba([108, 117, 125, 255]);
const BORDER: Rgba<u8> = Rgba([0, 86, 179, 255]);
const VACANT_BG: Rgba<u8> = Rgba([253, 236, 236, 255]);
const VACANT_BORDER: Rgba<u8> = Rgba([220, 53, 69, 255]);
const PLACEHOLDER_BG: Rgba<u8> = Rgba([206, 212, 218, 255]);

// *************** Rasterization ***************

/// Draws the whole chart: header with the featured photo, then one row of
/// cards per section.
pub fn rasterize(view: &ChartView) -> RgbaImage {
    let width = 2 * MARGIN + MAX_PER_ROW * CARD_W + (MAX_PER_ROW - 1) * GAP;
    let rows: u32 = view
        .sections
        .iter()
        .map(|s| (s.cards.len() as u32).div_ceil(MAX_PER_ROW).max(1))
        .sum();
    let height = HEADER_H
        + view.sections.len() as u32 * (SECTION_TITLE_H + SECTION_GAP)
        + rows * (CARD_H + GAP)
        + MARGIN;

    let mut img = RgbaImage::from_pixel(width, height, WHITE);
    let center = (width / 2) as i32;

    font::draw_text_centered(&mut img, "ORGANOGRAMA", center, MARGIN as i32, width, 4, BORDER);
    draw_photo(&mut img, &view.featured, center - (PHOTO / 2) as i32, MARGIN as i32 + 50);

    let mut y = HEADER_H;
    for section in &view.sections {
        font::draw_text_centered(&mut img, section.title, center, (y + 8) as i32, width, 3, INK);
        y += SECTION_TITLE_H;

        for row in section.cards.chunks(MAX_PER_ROW as usize) {
            let n = row.len() as u32;
            let row_w = n * CARD_W + (n - 1) * GAP;
            let mut x = (width - row_w) / 2;
            for card in row {
                draw_card(&mut img, card, x as i32, y as i32);
                x += CARD_W + GAP;
            }
            y += CARD_H + GAP;
        }
        if section.cards.is_empty() {
            y += CARD_H + GAP;
        }
        y += SECTION_GAP;
    }

    img
}

fn draw_card(img: &mut RgbaImage, card: &CardView, x: i32, y: i32) {
    let (bg, border) = if card.vacant { (VACANT_BG, VACANT_BORDER) } else { (WHITE, BORDER) };
    draw_filled_rect_mut(img, Rect::at(x, y).of_size(CARD_W, CARD_H), bg);
    draw_hollow_rect_mut(img, Rect::at(x, y).of_size(CARD_W, CARD_H), border);
    draw_hollow_rect_mut(img, Rect::at(x + 1, y + 1).of_size(CARD_W - 2, CARD_H - 2), border);

    let cx = x + (CARD_W / 2) as i32;
    let inner = CARD_W - 16;
    draw_photo(img, &card.photo, cx - (PHOTO / 2) as i32, y + 12);

    let name_scale = if font::text_width(font::normalize(&card.name).chars().count(), 2) <= inner { 2 } else { 1 };
    font::draw_text_centered(img, &card.name, cx, y + 146, inner, name_scale, INK);
    font::draw_text_centered(img, card.title, cx, y + 176, inner, 1, MUTED);
    font::draw_text_centered(img, &format!("Nº: {}", card.member_number), cx, y + 200, inner, 2, INK);
}

fn draw_photo(img: &mut RgbaImage, view: &PhotoView, x: i32, y: i32) {
    if let PhotoView::Image(src) = view {
        if let Some(decoded) = decode_photo(src) {
            imageops::overlay(img, &decoded, x as i64, y as i64);
            return;
        }
        tracing::debug!("photo not decodable, drawing placeholder");
    }
    let r = (PHOTO / 2) as i32;
    draw_filled_circle_mut(img, (x + r, y + r), r - 2, PLACEHOLDER_BG);
    font::draw_text_centered(img, "?", x + r, y + r - 21, PHOTO, 6, WHITE);
}

/// Remote URLs are not fetched; only inline data URLs are drawn.
fn decode_photo(src: &str) -> Option<RgbaImage> {
    let bytes = photo::decode_data_url(src)?;
    let decoded = image::load_from_memory(&bytes).ok()?;
    Some(decoded.resize_to_fill(PHOTO, PHOTO, FilterType::Triangle).to_rgba8())
}

// *************** Pagination ***************

/// Vertical offsets (mm, zero or negative) of the image on each page.
pub fn page_offsets(image_height_mm: f64, page_height_mm: f64) -> Vec<f64> {
    let mut offsets = vec![0.0];
    if page_height_mm <= 0.0 {
        return offsets;
    }
    let mut height_left = image_height_mm - page_height_mm;
    while height_left >= 0.0 {
        offsets.push(height_left - image_height_mm);
        height_left -= page_height_mm;
    }
    offsets
}

/// Distance (mm) from the page bottom to the bottom edge of an image of
/// `image_height_mm` whose top edge sits `offset_mm` below the page top.
pub fn image_bottom_mm(offset_mm: f64, image_height_mm: f64, page_height_mm: f64) -> f64 {
    page_height_mm - offset_mm - image_height_mm
}

fn pt(mm: f64) -> f32 {
    (mm * PT_PER_MM) as f32
}

/// Builds the PDF for `chart`: one page per entry of `page_offsets`.
pub fn build_pdf(chart: &RgbaImage, config: &ExportConfig) -> Result<Vec<u8>> {
    if config.page_width_mm <= 0.0 || config.page_height_mm <= 0.0 {
        bail!(
            "Invalid page setup {}x{}mm",
            config.page_width_mm,
            config.page_height_mm
        );
    }
    let (w, h) = chart.dimensions();
    if w == 0 || h == 0 {
        bail!("Chart image is empty");
    }

    let image_height_mm = h as f64 * config.page_width_mm / w as f64;
    let offsets = page_offsets(image_height_mm, config.page_height_mm);

    let rgb = DynamicImage::ImageRgba8(chart.clone()).into_rgb8().into_raw();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&rgb).context("Failed to compress chart image")?;
    let compressed = encoder.finish().context("Failed to compress chart image")?;

    let catalog_id = Ref::new(1);
    let tree_id = Ref::new(2);
    let image_id = Ref::new(3);
    let page_ids: Vec<Ref> = (0..offsets.len() as i32).map(|i| Ref::new(4 + 2 * i)).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    let mut image = pdf.image_xobject(image_id, &compressed);
    image.filter(Filter::FlateDecode);
    image.width(w as i32);
    image.height(h as i32);
    image.color_space().device_rgb();
    image.bits_per_component(8);
    image.finish();

    let media_box = PdfRect::new(0.0, 0.0, pt(config.page_width_mm), pt(config.page_height_mm));
    for (page_id, offset_mm) in page_ids.iter().zip(&offsets) {
        let content_id = Ref::new(page_id.get() + 1);

        let mut page = pdf.page(*page_id);
        page.media_box(media_box);
        page.parent(tree_id);
        page.contents(content_id);
        page.resources().x_objects().pair(IMAGE_NAME, image_id);
        page.finish();

        let bottom = image_bottom_mm(*offset_mm, image_height_mm, config.page_height_mm);
        let mut content = Content::new();
        content.save_state();
        content.transform([pt(config.page_width_mm), 0.0, 0.0, pt(image_height_mm), 0.0, pt(bottom)]);
        content.x_object(IMAGE_NAME);
        content.restore_state();
        pdf.stream(content_id, &content.finish());
    }

    tracing::debug!(pages = offsets.len(), image_height_mm, "pdf built");
    Ok(pdf.finish())
}

/// Rasterizes the view and writes `<stem>.pdf` into the output directory.
pub fn export_chart(view: &ChartView, config: &ExportConfig) -> Result<PathBuf> {
    let chart = rasterize(view);
    let bytes = build_pdf(&chart, config)?;

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create export directory {}", config.output_dir.display()))?;
    let path = config.output_dir.join(format!("{}.pdf", config.file_stem));
    std::fs::write(&path, bytes).with_context(|| format!("Failed to save {}", path.display()))?;

    tracing::info!(path = %path.display(), "chart exported");
    Ok(path)
}
