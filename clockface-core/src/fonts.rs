//! System font lookup for raster text.
//!
//! Families are CSS-style lists (`"Times New Roman, serif"`). Each list is
//! resolved to a fontdb face id once; each face is parsed once for the life
//! of the process. Hosts without usable fonts get the bundled DejaVu Sans.

use fontdb::{Database, Family, Query, Stretch, Style, Weight, ID};
use rusttype::Font;
use std::{
    collections::HashMap,
    fs,
    sync::{Mutex, OnceLock},
};
use tracing::{debug, warn};

fn db() -> &'static Database {
    static DB: OnceLock<Database> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        debug!(faces = db.len(), "system fonts indexed");
        db
    })
}

/// Face used when nothing on the system matches.
pub fn bundled_font() -> Option<&'static Font<'static>> {
    static FONT: OnceLock<Option<Font<'static>>> = OnceLock::new();
    FONT.get_or_init(|| {
        let font_data = include_bytes!("../assets/fonts/dejavu/DejaVuSans.ttf");
        Font::try_from_bytes(font_data as &[u8])
    })
    .as_ref()
}

/// Resolve the first available face of a CSS family list.
///
/// Falls back to any sans-serif system face, then to [`bundled_font`].
pub fn font_for(family_list: &str) -> Option<&'static Font<'static>> {
    match resolve(family_list).and_then(face) {
        Some(font) => Some(font),
        None => {
            debug!(family_list, "no system face, using bundled font");
            bundled_font()
        }
    }
}

fn resolve(family_list: &str) -> Option<ID> {
    static FAMILIES: OnceLock<Mutex<HashMap<String, Option<ID>>>> = OnceLock::new();
    let families = FAMILIES.get_or_init(|| Mutex::new(HashMap::new()));

    if let Some(hit) = families.lock().unwrap_or_else(|p| p.into_inner()).get(family_list) {
        return *hit;
    }

    let id = query(&parse_families(family_list)).or_else(|| query(&[Family::SansSerif]));
    families
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .insert(family_list.to_string(), id);
    id
}

fn face(id: ID) -> Option<&'static Font<'static>> {
    static FACES: OnceLock<Mutex<HashMap<ID, Option<&'static Font<'static>>>>> = OnceLock::new();
    let mut faces = FACES
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|p| p.into_inner());

    *faces.entry(id).or_insert_with(|| {
        let font = load(id);
        if font.is_none() {
            warn!(?id, "system face could not be parsed");
        }
        font.map(|f| &*Box::leak(Box::new(f)))
    })
}

fn parse_families(list: &str) -> Vec<Family<'_>> {
    list.split(',')
        .map(|name| name.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|name| !name.is_empty())
        .map(|name| match name.to_ascii_lowercase().as_str() {
            "serif" => Family::Serif,
            "sans-serif" | "sans" => Family::SansSerif,
            "monospace" => Family::Monospace,
            "cursive" => Family::Cursive,
            "fantasy" => Family::Fantasy,
            _ => Family::Name(name),
        })
        .collect()
}

fn query(families: &[Family<'_>]) -> Option<ID> {
    if families.is_empty() {
        return None;
    }
    db().query(&Query {
        families,
        weight: Weight::NORMAL,
        stretch: Stretch::Normal,
        style: Style::Normal,
    })
}

fn load(id: ID) -> Option<Font<'static>> {
    let face = db().face(id)?;
    let data = match &face.source {
        fontdb::Source::File(path) => fs::read(path).ok()?,
        fontdb::Source::SharedFile(path, _) => fs::read(path).ok()?,
        fontdb::Source::Binary(bytes) => bytes.as_ref().as_ref().to_vec(),
    };
    Font::try_from_vec_and_index(data, face.index)
}
