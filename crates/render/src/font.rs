//! Label font lookup
//!
//! Labels are drawn with a bold sans-serif system face. The font database is
//! loaded once per process; hosts without any usable face still export,
//! with label plates drawn but no glyphs.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use rusttype::{point, Font, Scale};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Width factor used to size label plates when no font is available
const FALLBACK_ADVANCE: f32 = 0.6;

fn db() -> &'static Database {
    static DB: OnceLock<Database> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(), "loaded system font database");
        db
    })
}

/// Bold sans-serif face used for labels, if the system provides one
pub fn label_font() -> Option<&'static Font<'static>> {
    static FONT: OnceLock<Option<Font<'static>>> = OnceLock::new();
    FONT.get_or_init(|| {
        let font = load_system_font(Weight::BOLD).or_else(|| load_system_font(Weight::NORMAL));
        if font.is_none() {
            warn!("no sans-serif system font found; labels will render without glyphs");
        }
        font
    })
    .as_ref()
}

fn load_system_font(weight: Weight) -> Option<Font<'static>> {
    let families = [Family::SansSerif];
    let query = Query {
        families: &families,
        weight,
        stretch: Stretch::Normal,
        style: Style::Normal,
    };

    let id = db().query(&query)?;
    let bytes = db().with_face_data(id, |data, _index| data.to_vec())?;
    Font::try_from_vec(bytes)
}

/// Width and height of `text` at `font_size` pixels
pub fn text_extent(text: &str, font_size: f32) -> (f32, f32) {
    match label_font() {
        Some(font) => {
            let scale = Scale::uniform(font_size);
            let v_metrics = font.v_metrics(scale);
            let width = font
                .layout(text, scale, point(0.0, v_metrics.ascent))
                .last()
                .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
                .unwrap_or(0.0);
            (width, v_metrics.ascent - v_metrics.descent)
        }
        None => (text.chars().count() as f32 * font_size * FALLBACK_ADVANCE, font_size),
    }
}
