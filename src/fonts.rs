// src/fonts.rs
use crate::error::{RenderError, RenderResult};
use crate::labels::TextMeasure;
use ab_glyph::{Font, FontRef, FontVec, GlyphId, PxScale, ScaleFont};
use anyhow::{Context, Result};
use log::{info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Glyph used to check that a face can render Chinese addresses.
const CJK_PROBE: char = '高';

/// Bundled faces, most specific first.
pub const BUNDLED_FONT_NAMES: &[&str] = &[
    "NotoSansCJKtc-Regular.otf",
    "NotoSansCJK-Regular.ttc",
    "NotoSansCJKsc-Regular.otf",
    "NotoSansCJKjp-Regular.otf",
];

/// Something that knows where font files might live.
pub trait FontLocator: Send + Sync {
    /// Candidate files in priority order. Missing files are fine.
    fn candidates(&self) -> Vec<PathBuf>;

    fn describe(&self) -> String;
}

/// A font file shipped with the application.
#[derive(Debug, Clone)]
pub struct BundledAsset {
    pub path: PathBuf,
}

impl BundledAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FontLocator for BundledAsset {
    fn candidates(&self) -> Vec<PathBuf> {
        vec![self.path.clone()]
    }

    fn describe(&self) -> String {
        format!("bundled {}", self.path.display())
    }
}

/// A directory of installed fonts probed for a list of file names.
#[derive(Debug, Clone)]
pub struct OsFontDir {
    pub dir: PathBuf,
    pub file_names: Vec<String>,
}

impl OsFontDir {
    pub fn new(dir: impl Into<PathBuf>, file_names: &[&str]) -> Self {
        Self {
            dir: dir.into(),
            file_names: file_names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FontLocator for OsFontDir {
    fn candidates(&self) -> Vec<PathBuf> {
        self.file_names.iter().map(|n| self.dir.join(n)).collect()
    }

    fn describe(&self) -> String {
        format!("system dir {}", self.dir.display())
    }
}

/// A loaded typeface, shareable across sizes and threads.
#[derive(Clone)]
pub struct FontFace {
    font: Arc<FontVec>,
    source: PathBuf,
    index: u32,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFace")
            .field("source", &self.source)
            .field("index", &self.index)
            .finish()
    }
}

impl FontFace {
    pub fn sized(&self, px: f32) -> SizedFont {
        SizedFont {
            face: self.clone(),
            scale: PxScale::from(px),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn supports_cjk(&self) -> bool {
        self.font.glyph_id(CJK_PROBE).0 != 0
    }
}

/// A face at a fixed pixel size: the handle the drawing code works with.
#[derive(Debug, Clone)]
pub struct SizedFont {
    face: FontFace,
    scale: PxScale,
}

impl SizedFont {
    pub fn font(&self) -> &FontVec {
        &self.face.font
    }

    pub fn scale(&self) -> PxScale {
        self.scale
    }
}

impl TextMeasure for SizedFont {
    fn text_width(&self, text: &str) -> u32 {
        let scaled = self.font().as_scaled(self.scale);
        let mut width = 0.0f32;
        let mut prev: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width.ceil() as u32
    }

    fn line_height(&self) -> u32 {
        self.font().as_scaled(self.scale).height().ceil() as u32
    }
}

/// Walks an injected, ordered list of locators and returns the first face that loads.
#[derive(Default)]
pub struct FontResolver {
    locators: Vec<Box<dyn FontLocator>>,
}

impl FontResolver {
    pub fn new(locators: Vec<Box<dyn FontLocator>>) -> Self {
        Self { locators }
    }

    pub fn push(&mut self, locator: impl FontLocator + 'static) {
        self.locators.push(Box::new(locator));
    }

    pub fn candidates(&self) -> Vec<PathBuf> {
        self.locators.iter().flat_map(|l| l.candidates()).collect()
    }

    /// Load the first usable face.
    ///
    /// A face without CJK glyphs is still returned, with a warning, since
    /// Chinese text would come out as empty boxes.
    pub fn resolve_face(&self) -> RenderResult<FontFace> {
        let mut tried = Vec::new();

        for locator in &self.locators {
            for path in locator.candidates() {
                if !path.is_file() {
                    tried.push(path);
                    continue;
                }
                match load_face(&path) {
                    Ok(face) => {
                        info!(
                            "✓ loaded font {} (index {}, via {})",
                            path.display(),
                            face.index,
                            locator.describe()
                        );
                        if !face.supports_cjk() {
                            warn!(
                                "font {} has no CJK glyphs; Chinese text will render as blank boxes",
                                path.display()
                            );
                        }
                        return Ok(face);
                    }
                    Err(e) => {
                        warn!("✗ cannot load font {}: {e:#}", path.display());
                        tried.push(path);
                    }
                }
            }
        }

        Err(RenderError::FontNotFound { tried })
    }

    pub fn resolve(&self, point_size: f32) -> RenderResult<SizedFont> {
        Ok(self.resolve_face()?.sized(point_size))
    }
}

fn is_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttc" | "otc"))
        .unwrap_or(false)
}

/// Collections try face 0 first, then face 1.
fn load_face(path: &Path) -> Result<FontFace> {
    let data = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;

    let index = match FontRef::try_from_slice_and_index(&data, 0) {
        Ok(_) => 0,
        Err(first) if is_collection(path) => {
            FontRef::try_from_slice_and_index(&data, 1)
                .map_err(|e| anyhow::anyhow!("face 0: {first}; face 1: {e}"))?;
            1
        }
        Err(e) => return Err(anyhow::anyhow!("{e}")),
    };
    let font = FontVec::try_from_vec_and_index(data, index).map_err(|e| anyhow::anyhow!("{e}"))?;

    Ok(FontFace {
        font: Arc::new(font),
        source: path.to_path_buf(),
        index,
    })
}

/// Bundled CJK faces in `bundled_dir`, then the usual OS font folders.
pub fn default_locators(bundled_dir: &Path) -> Vec<Box<dyn FontLocator>> {
    let mut locators: Vec<Box<dyn FontLocator>> = BUNDLED_FONT_NAMES
        .iter()
        .map(|name| Box::new(BundledAsset::new(bundled_dir.join(name))) as Box<dyn FontLocator>)
        .collect();

    for dir in os_font_dirs() {
        locators.push(Box::new(dir));
    }
    locators
}

fn os_font_dirs() -> Vec<OsFontDir> {
    if cfg!(target_os = "windows") {
        const NAMES: &[&str] = &[
            "msjh.ttc",
            "msjhbd.ttc",
            "simsun.ttc",
            "mingliu.ttc",
            "kaiu.ttf",
            "DFKai-SB.ttf",
        ];
        let windir = std::env::var("WINDIR").unwrap_or_else(|_| "C:/Windows".to_string());
        let mut dirs = vec![OsFontDir::new(Path::new(&windir).join("Fonts"), NAMES)];
        if let Ok(local) = std::env::var("LOCALAPPDATA") {
            dirs.push(OsFontDir::new(
                Path::new(&local).join("Microsoft").join("Windows").join("Fonts"),
                NAMES,
            ));
        }
        dirs
    } else if cfg!(target_os = "macos") {
        vec![
            OsFontDir::new(
                "/System/Library/Fonts",
                &["PingFang.ttc", "STHeiti Medium.ttc", "Hiragino Sans GB.ttc"],
            ),
            OsFontDir::new("/Library/Fonts", &["Arial Unicode.ttf"]),
        ]
    } else {
        vec![
            OsFontDir::new("/usr/share/fonts/opentype/noto", &["NotoSansCJK-Regular.ttc"]),
            OsFontDir::new("/usr/share/fonts/noto-cjk", &["NotoSansCJK-Regular.ttc"]),
            OsFontDir::new(
                "/usr/share/fonts/truetype/wqy",
                &["wqy-microhei.ttc", "wqy-zenhei.ttc"],
            ),
            OsFontDir::new("/usr/share/fonts/truetype/droid", &["DroidSansFallbackFull.ttf"]),
            OsFontDir::new("/usr/share/fonts/truetype/dejavu", &["DejaVuSans.ttf"]),
            OsFontDir::new(
                "/usr/share/fonts/truetype/liberation",
                &["LiberationSans-Regular.ttf"],
            ),
        ]
    }
}
