//! Presentation package rendering: [`Deck`] → PPTX bytes.
//!
//! Writes a minimal but complete PresentationML package with one master,
//! one blank layout and a theme, then one slide part per deck slide. Each
//! slide paints its image (if any) as a full-bleed background and carries a
//! single text box. The box is a semi-transparent `333333` band with one
//! centred paragraph per slide line.
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/{core,app}.xml
//! ppt/presentation.xml (+ _rels)
//! ppt/slideMasters/slideMaster1.xml (+ _rels)
//! ppt/slideLayouts/slideLayout1.xml (+ _rels)
//! ppt/theme/theme1.xml
//! ppt/slides/slide{n}.xml (+ _rels)
//! ppt/media/image{n}.{ext}
//! ```
//!
//! Blocking: reads background files from disk. Call from `spawn_blocking`.

use crate::error::DeckError;
use crate::pipeline::assemble::{BoxGeometry, Deck, RenderedSlide, TextOverlay};
use crate::pipeline::segment::LINE_SEPARATOR;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 16:9 slide, 10" × 5.625".
pub const SLIDE_WIDTH_EMU: i64 = 9_144_000;
pub const SLIDE_HEIGHT_EMU: i64 = 5_143_500;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Escape XML special characters. Characters XML 1.0 cannot carry at all
/// (C0 controls other than tab, LF and CR, and U+FFFE/U+FFFF) are dropped.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < '\u{20}' || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

/// A background image to embed, resolved to its package name.
struct Media {
    slide: usize,
    part_name: String,
    extension: &'static str,
    mime: &'static str,
    data: Vec<u8>,
}

/// Render `deck` into the bytes of a `.pptx` file.
pub fn render(deck: &Deck) -> Result<Vec<u8>, DeckError> {
    let media = load_media(deck)?;

    let mut zip = PackageWriter::new();
    zip.xml("[Content_Types].xml", &content_types(deck, &media))?;
    zip.xml("_rels/.rels", &root_rels())?;
    zip.xml("docProps/core.xml", &core_props(&deck.title))?;
    zip.xml("docProps/app.xml", &app_props(deck.slides.len()))?;
    zip.xml("ppt/presentation.xml", &presentation(deck.slides.len()))?;
    zip.xml("ppt/_rels/presentation.xml.rels", &presentation_rels(deck.slides.len()))?;
    zip.xml("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER)?;
    zip.xml(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &rels(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ]),
    )?;
    zip.xml("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT)?;
    zip.xml(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
    )?;
    zip.xml("ppt/theme/theme1.xml", THEME)?;

    for (n, slide) in deck.slides.iter().enumerate() {
        let number = n + 1;
        let image = media.iter().find(|m| m.slide == slide.index);
        zip.xml(
            &format!("ppt/slides/slide{number}.xml"),
            &slide_xml(slide, image.is_some()),
        )?;

        let mut slide_rels = vec![("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml".to_string())];
        if let Some(m) = image {
            slide_rels.push(("rId2", "image", format!("../media/{}", m.part_name)));
        }
        let slide_rels: Vec<(&str, &str, &str)> = slide_rels
            .iter()
            .map(|(id, kind, target)| (*id, *kind, target.as_str()))
            .collect();
        zip.xml(
            &format!("ppt/slides/_rels/slide{number}.xml.rels"),
            &rels(&slide_rels),
        )?;
    }

    for m in &media {
        zip.stored(&format!("ppt/media/{}", m.part_name), &m.data, m.slide)?;
    }

    zip.finish()
}

fn load_media(deck: &Deck) -> Result<Vec<Media>, DeckError> {
    let mut media = Vec::new();
    for slide in &deck.slides {
        let Some(ref bg) = slide.background else {
            continue;
        };
        let data = std::fs::read(&bg.path).map_err(|e| DeckError::RenderFailed {
            slide: slide.index,
            detail: format!("cannot read background '{}': {}", bg.path.display(), e),
        })?;
        let extension = bg.format.extensions_str().first().copied().unwrap_or("png");
        media.push(Media {
            slide: slide.index,
            part_name: format!("image{}.{}", slide.index + 1, extension),
            extension,
            mime: bg.format.to_mime_type(),
            data,
        });
    }
    Ok(media)
}

// ── Zip container ────────────────────────────────────────────────────────

struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl PackageWriter {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn xml(&mut self, name: &str, body: &str) -> Result<(), DeckError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip
            .start_file(name, options)
            .map_err(|e| package_err(name, e))?;
        self.zip
            .write_all(body.as_bytes())
            .map_err(|e| package_err(name, e))
    }

    /// Images are already compressed; store them as-is.
    fn stored(&mut self, name: &str, data: &[u8], slide: usize) -> Result<(), DeckError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.zip
            .start_file(name, options)
            .map_err(|e| DeckError::RenderFailed {
                slide,
                detail: e.to_string(),
            })?;
        self.zip.write_all(data).map_err(|e| DeckError::RenderFailed {
            slide,
            detail: e.to_string(),
        })
    }

    fn finish(self) -> Result<Vec<u8>, DeckError> {
        self.zip
            .finish()
            .map(Cursor::into_inner)
            .map_err(|e| package_err("central directory", e))
    }
}

fn package_err(part: &str, e: impl std::fmt::Display) -> DeckError {
    DeckError::Internal(format!("presentation package part '{}': {}", part, e))
}

// ── Package parts ────────────────────────────────────────────────────────

fn content_types(deck: &Deck, media: &[Media]) -> String {
    let mut xml = String::with_capacity(2048);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);

    let mut seen: Vec<&str> = Vec::new();
    for m in media {
        if !seen.contains(&m.extension) {
            seen.push(m.extension);
            let _ = write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                m.extension, m.mime
            );
        }
    }

    xml.push_str(r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#);
    for n in 1..=deck.slides.len() {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        );
    }
    xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
    xml.push_str(r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#);
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    let _ = write!(xml, r#"<Relationships xmlns="{NS_PKG_RELS}">"#);
    let _ = write!(
        xml,
        r#"<Relationship Id="rId1" Type="{REL_BASE}/officeDocument" Target="ppt/presentation.xml"/>"#
    );
    xml.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
    let _ = write!(
        xml,
        r#"<Relationship Id="rId3" Type="{REL_BASE}/extended-properties" Target="docProps/app.xml"/>"#
    );
    xml.push_str("</Relationships>");
    xml
}

/// Part relationships, `(id, type suffix, target)`.
fn rels(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    let _ = write!(xml, r#"<Relationships xmlns="{NS_PKG_RELS}">"#);
    for (id, kind, target) in entries {
        let _ = write!(
            xml,
            r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#,
            id,
            REL_BASE,
            kind,
            escape_xml(target)
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn core_props(title: &str) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    xml.push_str(r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#);
    let _ = write!(xml, "<dc:title>{}</dc:title>", escape_xml(title));
    xml.push_str("<dc:creator>txt2deck</dc:creator>");
    xml.push_str("</cp:coreProperties>");
    xml
}

fn app_props(slides: usize) -> String {
    let mut xml = String::new();
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#);
    let _ = write!(
        xml,
        "<Application>txt2deck</Application><PresentationFormat>On-screen Show (16:9)</PresentationFormat><Slides>{slides}</Slides>"
    );
    xml.push_str("</Properties>");
    xml
}

/// Relationship ids: `rId1` master, `rId2` theme, `rId{n+2}` slide n.
fn presentation(slides: usize) -> String {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECL);
    let _ = write!(
        xml,
        r#"<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1">"#
    );
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    xml.push_str("<p:sldIdLst>");
    for n in 1..=slides {
        let _ = write!(xml, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2);
    }
    xml.push_str("</p:sldIdLst>");
    let _ = write!(
        xml,
        r#"<p:sldSz cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}"/><p:notesSz cx="6858000" cy="9144000"/>"#
    );
    xml.push_str("</p:presentation>");
    xml
}

fn presentation_rels(slides: usize) -> String {
    let targets: Vec<String> = (1..=slides).map(|n| format!("slides/slide{n}.xml")).collect();
    let ids: Vec<String> = (1..=slides).map(|n| format!("rId{}", n + 2)).collect();

    let mut entries = vec![
        ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        ("rId2", "theme", "theme/theme1.xml"),
    ];
    for (id, target) in ids.iter().zip(&targets) {
        entries.push((id.as_str(), "slide", target.as_str()));
    }
    rels(&entries)
}

// ── Slides ───────────────────────────────────────────────────────────────

fn slide_xml(slide: &RenderedSlide, has_background: bool) -> String {
    let mut xml = String::with_capacity(2048);
    xml.push_str(XML_DECL);
    let _ = write!(xml, r#"<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}">"#);
    xml.push_str("<p:cSld>");

    if has_background {
        xml.push_str("<p:bg><p:bgPr>");
        xml.push_str(r#"<a:blipFill dpi="0" rotWithShape="1"><a:blip r:embed="rId2"/><a:srcRect/><a:stretch><a:fillRect/></a:stretch></a:blipFill>"#);
        xml.push_str("<a:effectLst/></p:bgPr></p:bg>");
    }

    xml.push_str("<p:spTree>");
    xml.push_str(r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#);
    xml.push_str(r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#);
    text_box(&mut xml, &slide.text);
    xml.push_str("</p:spTree>");
    xml.push_str("</p:cSld>");
    xml.push_str(r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#);
    xml.push_str("</p:sld>");
    xml
}

/// Box position and size in EMU.
fn box_emu(g: &BoxGeometry) -> (i64, i64, i64, i64) {
    let w = |pct: f64| (pct / 100.0 * SLIDE_WIDTH_EMU as f64).round() as i64;
    let h = |pct: f64| (pct / 100.0 * SLIDE_HEIGHT_EMU as f64).round() as i64;
    (w(g.x_pct), h(g.y_pct), w(g.w_pct), h(g.h_pct))
}

/// DrawingML alpha for a transparency percentage.
fn alpha(transparency: u8) -> u32 {
    (100 - u32::from(transparency.min(100))) * 1000
}

fn text_box(xml: &mut String, overlay: &TextOverlay) {
    let (x, y, cx, cy) = box_emu(&overlay.geometry);

    xml.push_str("<p:sp>");
    xml.push_str(r#"<p:nvSpPr><p:cNvPr id="2" name="Text 1"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#);
    xml.push_str("<p:spPr>");
    let _ = write!(
        xml,
        r#"<a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#
    );
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
    let _ = write!(
        xml,
        r#"<a:solidFill><a:srgbClr val="{}"><a:alpha val="{}"/></a:srgbClr></a:solidFill>"#,
        overlay.fill_color,
        alpha(overlay.fill_transparency)
    );
    xml.push_str("</p:spPr>");

    xml.push_str("<p:txBody>");
    xml.push_str(r#"<a:bodyPr wrap="square" rtlCol="0" anchor="ctr"/><a:lstStyle/>"#);
    for line in overlay.text.split(LINE_SEPARATOR) {
        xml.push_str(r#"<a:p><a:pPr algn="ctr"/><a:r>"#);
        let _ = write!(
            xml,
            r#"<a:rPr lang="en-US" sz="{}" b="{}" dirty="0">"#,
            overlay.font_size * 100,
            u8::from(overlay.bold)
        );
        let _ = write!(
            xml,
            r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#,
            overlay.color
        );
        let _ = write!(xml, r#"<a:latin typeface="{}"/>"#, escape_xml(&overlay.font_face));
        xml.push_str("</a:rPr>");
        let _ = write!(xml, "<a:t>{}</a:t>", escape_xml(line));
        xml.push_str("</a:r></a:p>");
    }
    xml.push_str("</p:txBody>");
    xml.push_str("</p:sp>");
}

// ── Fixed parts ──────────────────────────────────────────────────────────

const SLIDE_MASTER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
    r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
    r#"<p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="4400"/></a:lvl1pPr></p:titleStyle>"#,
    r#"<p:bodyStyle><a:lvl1pPr><a:defRPr sz="2800"/></a:lvl1pPr></p:bodyStyle>"#,
    r#"<p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle></p:txStyles>"#,
    r#"</p:sldMaster>"#,
);

const SLIDE_LAYOUT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">"#,
    r#"<p:cSld name="Blank"><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#,
    r#"</p:sldLayout>"#,
);

const THEME: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements>"#,
    r#"<a:clrScheme name="Office">"#,
    r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Office">"#,
    r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    r#"</a:fontScheme>"#,
    r#"<a:fmtScheme name="Office">"#,
    r#"<a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst>"#,
    r#"<a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst>"#,
    r#"<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>"#,
    r#"<a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst>"#,
    r#"</a:fmtScheme>"#,
    r#"</a:themeElements></a:theme>"#,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assemble::{Background, TEXT_FILL_COLOR};
    use image::ImageFormat;
    use std::io::Read;
    use zip::ZipArchive;

    fn overlay(text: &str) -> TextOverlay {
        TextOverlay {
            text: text.to_string(),
            font_face: "Arial".into(),
            font_size: 28,
            bold: true,
            color: "FFFFFF".into(),
            fill_color: TEXT_FILL_COLOR.into(),
            fill_transparency: 30,
            geometry: BoxGeometry::for_window(2),
        }
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut s = String::new();
        part.read_to_string(&mut s).unwrap();
        s
    }

    fn deck_with_background(dir: &std::path::Path) -> Deck {
        let img = dir.join("img1.png");
        std::fs::write(&img, b"\x89PNG\r\n\x1a\nnot-really").unwrap();
        Deck {
            title: "R&D <review>".into(),
            slides: vec![
                RenderedSlide {
                    index: 0,
                    background: None,
                    text: overlay("R&D <review>"),
                },
                RenderedSlide {
                    index: 1,
                    background: Some(Background {
                        path: img,
                        format: ImageFormat::Png,
                    }),
                    text: overlay("First line\nSecond line"),
                },
            ],
        }
    }

    #[test]
    fn package_has_every_part() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = render(&deck_with_background(dir.path())).unwrap();
        let archive = ZipArchive::new(Cursor::new(&bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "ppt/presentation.xml",
            "ppt/slideMasters/slideMaster1.xml",
            "ppt/slideLayouts/slideLayout1.xml",
            "ppt/theme/theme1.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/slides/_rels/slide2.xml.rels",
            "ppt/media/image2.png",
        ] {
            assert!(names.contains(&part), "missing {part}");
        }
    }

    #[test]
    fn slides_keep_deck_order_and_escape_text() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = render(&deck_with_background(dir.path())).unwrap();

        let pres = read_part(&bytes, "ppt/presentation.xml");
        assert!(pres.find(r#"r:id="rId3""#).unwrap() < pres.find(r#"r:id="rId4""#).unwrap());
        assert!(pres.contains(r#"<p:sldSz cx="9144000" cy="5143500"/>"#));

        let first = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(first.contains("<a:t>R&amp;D &lt;review&gt;</a:t>"));
        assert!(!first.contains("<p:bg>"));

        let core = read_part(&bytes, "docProps/core.xml");
        assert!(core.contains("<dc:title>R&amp;D &lt;review&gt;</dc:title>"));
    }

    #[test]
    fn multi_line_slide_gets_one_paragraph_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = render(&deck_with_background(dir.path())).unwrap();
        let second = read_part(&bytes, "ppt/slides/slide2.xml");

        assert_eq!(second.matches("<a:p>").count(), 2);
        assert!(second.contains("<a:t>First line</a:t>"));
        assert!(second.contains("<a:t>Second line</a:t>"));
        assert!(second.contains(r#"<a:blip r:embed="rId2"/>"#));
        assert!(second.contains(r#"sz="2800" b="1""#));
        assert!(second.contains(r#"<a:srgbClr val="333333"><a:alpha val="70000"/></a:srgbClr>"#));

        let rels = read_part(&bytes, "ppt/slides/_rels/slide2.xml.rels");
        assert!(rels.contains(r#"Target="../media/image2.png""#));
    }

    #[test]
    fn text_box_is_centred_band() {
        let (x, y, cx, cy) = box_emu(&BoxGeometry::for_window(2));
        assert_eq!((x, cx), (0, SLIDE_WIDTH_EMU));
        assert_eq!(cy, SLIDE_HEIGHT_EMU / 5);
        assert_eq!(y, SLIDE_HEIGHT_EMU * 2 / 5);
    }

    #[test]
    fn transparency_maps_to_alpha() {
        assert_eq!(alpha(0), 100_000);
        assert_eq!(alpha(30), 70_000);
        assert_eq!(alpha(100), 0);
    }

    #[test]
    fn missing_background_file_is_render_error() {
        let deck = Deck {
            title: "T".into(),
            slides: vec![RenderedSlide {
                index: 4,
                background: Some(Background {
                    path: "/nonexistent/img4.png".into(),
                    format: ImageFormat::Png,
                }),
                text: overlay("T"),
            }],
        };
        assert!(matches!(render(&deck), Err(DeckError::RenderFailed { slide: 4, .. })));
    }

    #[test]
    fn control_characters_are_dropped_from_text() {
        assert_eq!(escape_xml("a\u{1}b\u{B}c\u{FFFF}"), "abc");
        assert_eq!(escape_xml("tab\there"), "tab\there");

        let slide = RenderedSlide {
            index: 0,
            background: None,
            text: overlay("bell\u{7} & \u{1B}[1mbold"),
        };
        let xml = slide_xml(&slide, false);
        assert!(xml.contains("<a:t>bell &amp; [1mbold</a:t>"));
        assert!(!xml.chars().any(|c| c < ' '));
    }
}
