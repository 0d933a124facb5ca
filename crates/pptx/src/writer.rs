//! Projection deck writer.
//!
//! Produces a 16:9 deck with one slide per display group: dark background,
//! centered lyric text at the group's estimated size near the top, and the
//! song title as a footer.

use quick_xml::escape::escape;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use setlist_core::clean::xml_safe;
use setlist_core::{ArtifactSink, DisplayGroup, Error, ExtractedSong, Result};
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

/// EMU per inch.
const EMU_PER_INCH: i64 = 914_400;

const SLIDE_WIDTH: i64 = 10 * EMU_PER_INCH;
const SLIDE_HEIGHT: i64 = 5_143_500; // 5.625 in

/// Lyric box: 0.5 in from the left, 0.3 in from the top, 9 in × 3.4 in.
const LYRIC_BOX: Frame = Frame {
    x: EMU_PER_INCH / 2,
    y: 274_320,
    cx: 9 * EMU_PER_INCH,
    cy: 3_108_960,
};

/// Footer box: 5.1 in from the top, 9 in × 0.5 in.
const FOOTER_BOX: Frame = Frame {
    x: EMU_PER_INCH / 2,
    y: 4_663_440,
    cx: 9 * EMU_PER_INCH,
    cy: EMU_PER_INCH / 2,
};

const NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Visual style of the projection deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckStyle {
    /// Typeface for lyrics and footer.
    pub font_face: String,
    /// Slide background, `RRGGBB`.
    #[serde(deserialize_with = "hex_color")]
    pub background: String,
    /// Text color, `RRGGBB`.
    #[serde(deserialize_with = "hex_color")]
    pub text_color: String,
    /// Footer size in points.
    pub footer_size: u32,
    /// Lyric size in points for groups without an estimate.
    pub fallback_size: u32,
}

impl Default for DeckStyle {
    fn default() -> Self {
        Self {
            font_face: "微軟正黑體".to_string(),
            background: "000000".to_string(),
            text_color: "FFFF00".to_string(),
            footer_size: 20,
            fallback_size: 32,
        }
    }
}

impl DeckStyle {
    /// Check that both colors are six hex digits.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("background", &self.background), ("text_color", &self.text_color)] {
            if !is_hex_color(value) {
                return Err(Error::InvalidRequest(format!(
                    "deck {} '{}' is not an RRGGBB color",
                    field, value
                )));
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit())
}

fn hex_color<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let value = String::deserialize(deserializer)?;
    if is_hex_color(&value) {
        Ok(value.to_ascii_uppercase())
    } else {
        Err(D::Error::custom(format!(
            "invalid color '{}', expected RRGGBB",
            value
        )))
    }
}

/// Slide-sink writing the projection deck as PPTX.
#[derive(Debug, Clone)]
pub struct DeckWriter {
    style: DeckStyle,
    file_name: String,
}

impl Default for DeckWriter {
    fn default() -> Self {
        Self {
            style: DeckStyle::default(),
            file_name: Self::DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl DeckWriter {
    /// File name used unless configured otherwise.
    pub const DEFAULT_FILE_NAME: &'static str = "敬拜PPT.pptx";

    /// Create a writer with the default style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the deck style.
    pub fn with_style(mut self, style: DeckStyle) -> Self {
        self.style = style;
        self
    }

    /// Set the output file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Render the deck into a writer, returning the number of slides.
    ///
    /// Songs without display groups contribute no slides.
    pub fn render<W: Write + Seek>(&self, songs: &[ExtractedSong], writer: W) -> Result<usize> {
        self.style.validate()?;
        let mut zip = ZipWriter::new(writer);

        let slides: Vec<String> = songs
            .iter()
            .flat_map(|song| {
                song.groups
                    .iter()
                    .map(move |group| self.slide_xml(&song.title, group))
            })
            .collect();

        add_part(&mut zip, "[Content_Types].xml", &content_types_xml(slides.len()))?;
        add_part(&mut zip, "_rels/.rels", ROOT_RELS)?;
        add_part(&mut zip, "ppt/presentation.xml", &presentation_xml(slides.len()))?;
        add_part(
            &mut zip,
            "ppt/_rels/presentation.xml.rels",
            &presentation_rels_xml(slides.len()),
        )?;
        add_part(&mut zip, "ppt/presProps.xml", &format!("{XML_HEADER}<p:presentationPr {NAMESPACES}/>"))?;
        add_part(&mut zip, "ppt/viewProps.xml", &format!("{XML_HEADER}<p:viewPr {NAMESPACES}/>"))?;
        add_part(&mut zip, "ppt/tableStyles.xml", TABLE_STYLES)?;
        add_part(&mut zip, "ppt/slideMasters/slideMaster1.xml", &slide_master_xml())?;
        add_part(
            &mut zip,
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &relationships(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ]),
        )?;
        add_part(&mut zip, "ppt/slideLayouts/slideLayout1.xml", &slide_layout_xml())?;
        add_part(
            &mut zip,
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        )?;
        add_part(&mut zip, "ppt/theme/theme1.xml", &theme_xml())?;

        let slide_rels = relationships(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]);
        for (idx, slide) in slides.iter().enumerate() {
            let number = idx + 1;
            add_part(&mut zip, &format!("ppt/slides/slide{}.xml", number), slide)?;
            add_part(
                &mut zip,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                &slide_rels,
            )?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish deck: {}", e)))?;

        Ok(slides.len())
    }

    fn slide_xml(&self, title: &str, group: &DisplayGroup) -> String {
        let style = &self.style;
        let size = group.font_size().unwrap_or(style.fallback_size);

        let lyrics: String = group
            .lines()
            .iter()
            .map(|line| self.paragraph_xml(line, size, true))
            .collect();
        let footer = self.paragraph_xml(&format!("《{}》", title), style.footer_size, false);

        format!(
            concat!(
                "{header}<p:sld {ns}><p:cSld>",
                "<p:bg><p:bgPr><a:solidFill><a:srgbClr val=\"{bg}\"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>",
                "<p:spTree>{group}{lyrics}{footer}</p:spTree></p:cSld>",
                "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
            ),
            header = XML_HEADER,
            ns = NAMESPACES,
            bg = style.background,
            group = SP_TREE_HEADER,
            lyrics = text_box_xml(2, "Lyrics", &LYRIC_BOX, &lyrics),
            footer = text_box_xml(3, "Footer", &FOOTER_BOX, &footer),
        )
    }

    fn paragraph_xml(&self, text: &str, size: u32, bold: bool) -> String {
        let face = xml_safe(&self.style.font_face);
        let face = escape(&face);
        format!(
            concat!(
                "<a:p><a:pPr algn=\"ctr\"/><a:r>",
                "<a:rPr lang=\"zh-TW\" altLang=\"en-US\" sz=\"{sz}\" b=\"{b}\" dirty=\"0\">",
                "<a:solidFill><a:srgbClr val=\"{color}\"/></a:solidFill>",
                "<a:latin typeface=\"{face}\"/><a:ea typeface=\"{face}\"/></a:rPr>",
                "<a:t>{text}</a:t></a:r></a:p>"
            ),
            sz = size * 100,
            b = u8::from(bold),
            color = self.style.text_color,
            face = face,
            text = escape(&xml_safe(text)),
        )
    }
}

impl ArtifactSink for DeckWriter {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn write_to(&self, songs: &[ExtractedSong], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let count = self.render(songs, file)?;
        log::info!("Wrote {} slides to {}", count, path.display());
        Ok(())
    }
}

/// Position and extent of a shape, in EMU.
struct Frame {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

fn add_part<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, content: &str) -> Result<()> {
    zip.start_file(name, FileOptions::default())
        .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

const SP_TREE_HEADER: &str = concat!(
    "<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>",
    "<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/>",
    "<a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>"
);

fn text_box_xml(id: u32, name: &str, frame: &Frame, paragraphs: &str) -> String {
    format!(
        concat!(
            "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{name}\"/><p:cNvSpPr txBox=\"1\"/><p:nvPr/></p:nvSpPr>",
            "<p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>",
            "<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom><a:noFill/></p:spPr>",
            "<p:txBody><a:bodyPr wrap=\"square\" rtlCol=\"0\" anchor=\"t\"><a:noAutofit/></a:bodyPr>",
            "<a:lstStyle/>{paragraphs}</p:txBody></p:sp>"
        ),
        id = id,
        name = name,
        x = frame.x,
        y = frame.y,
        cx = frame.cx,
        cy = frame.cy,
        paragraphs = paragraphs,
    )
}

fn content_types_xml(slide_count: usize) -> String {
    const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";
    let mut xml = format!(
        concat!(
            "{header}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
            "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
            "<Override PartName=\"/ppt/presentation.xml\" ContentType=\"{pml}.presentation.main+xml\"/>",
            "<Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"{pml}.slideMaster+xml\"/>",
            "<Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"{pml}.slideLayout+xml\"/>",
            "<Override PartName=\"/ppt/presProps.xml\" ContentType=\"{pml}.presProps+xml\"/>",
            "<Override PartName=\"/ppt/viewProps.xml\" ContentType=\"{pml}.viewProps+xml\"/>",
            "<Override PartName=\"/ppt/tableStyles.xml\" ContentType=\"{pml}.tableStyles+xml\"/>",
            "<Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>"
        ),
        header = XML_HEADER,
        pml = PML,
    );
    for number in 1..=slide_count {
        xml.push_str(&format!(
            "<Override PartName=\"/ppt/slides/slide{}.xml\" ContentType=\"{}.slide+xml\"/>",
            number, PML
        ));
    }
    xml.push_str("</Types>");
    xml
}

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>"#,
    r#"</Relationships>"#
);

/// Slide relationship ids start after the fixed presentation parts.
fn slide_rel_id(idx: usize) -> String {
    format!("rId{}", idx + 6)
}

fn presentation_xml(slide_count: usize) -> String {
    let slide_ids: String = (0..slide_count)
        .map(|idx| format!("<p:sldId id=\"{}\" r:id=\"{}\"/>", 256 + idx, slide_rel_id(idx)))
        .collect();
    let slide_list = if slide_ids.is_empty() {
        String::new()
    } else {
        format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids)
    };

    format!(
        concat!(
            "{header}<p:presentation {ns} saveSubsetFonts=\"1\">",
            "<p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>",
            "{slides}<p:sldSz cx=\"{cx}\" cy=\"{cy}\"/><p:notesSz cx=\"6858000\" cy=\"9144000\"/>",
            "</p:presentation>"
        ),
        header = XML_HEADER,
        ns = NAMESPACES,
        slides = slide_list,
        cx = SLIDE_WIDTH,
        cy = SLIDE_HEIGHT,
    )
}

fn presentation_rels_xml(slide_count: usize) -> String {
    let mut rels: Vec<(String, &str, String)> = vec![
        ("rId1".into(), "slideMaster", "slideMasters/slideMaster1.xml".into()),
        ("rId2".into(), "theme", "theme/theme1.xml".into()),
        ("rId3".into(), "presProps", "presProps.xml".into()),
        ("rId4".into(), "viewProps", "viewProps.xml".into()),
        ("rId5".into(), "tableStyles", "tableStyles.xml".into()),
    ];
    for idx in 0..slide_count {
        rels.push((slide_rel_id(idx), "slide", format!("slides/slide{}.xml", idx + 1)));
    }

    let borrowed: Vec<(&str, &str, &str)> = rels
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    relationships(&borrowed)
}

/// A relationships part; each entry is `(id, type suffix, target)`.
fn relationships(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(
                "<Relationship Id=\"{}\" Type=\"{}/{}\" Target=\"{}\"/>",
                id, REL_NS, kind, target
            )
        })
        .collect();
    format!(
        "{}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}</Relationships>",
        XML_HEADER, body
    )
}

const CLR_MAP: &str = concat!(
    "<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" ",
    "accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>"
);

fn slide_master_xml() -> String {
    format!(
        concat!(
            "{header}<p:sldMaster {ns}><p:cSld>",
            "<p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>",
            "<p:spTree>{tree}</p:spTree></p:cSld>{clr_map}",
            "<p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst>",
            "</p:sldMaster>"
        ),
        header = XML_HEADER,
        ns = NAMESPACES,
        tree = SP_TREE_HEADER,
        clr_map = CLR_MAP,
    )
}

fn slide_layout_xml() -> String {
    format!(
        concat!(
            "{header}<p:sldLayout {ns} type=\"blank\" preserve=\"1\">",
            "<p:cSld name=\"Blank\"><p:spTree>{tree}</p:spTree></p:cSld>",
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
        ),
        header = XML_HEADER,
        ns = NAMESPACES,
        tree = SP_TREE_HEADER,
    )
}

const TABLE_STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:tblStyleLst xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" def="{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}"/>"#
);

fn theme_xml() -> String {
    let colors: String = [
        ("dk1", "000000"),
        ("lt1", "FFFFFF"),
        ("dk2", "1F1F1F"),
        ("lt2", "EEEEEE"),
        ("accent1", "FFFF00"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ]
    .iter()
    .map(|(name, rgb)| format!("<a:{0}><a:srgbClr val=\"{1}\"/></a:{0}>", name, rgb))
    .collect();

    let fonts = "<a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/>";
    let fill = "<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>";
    let line = format!("<a:ln w=\"9525\">{}</a:ln>", fill);
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";

    format!(
        concat!(
            "{header}<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Setlist\">",
            "<a:themeElements><a:clrScheme name=\"Setlist\">{colors}</a:clrScheme>",
            "<a:fontScheme name=\"Setlist\"><a:majorFont>{fonts}</a:majorFont><a:minorFont>{fonts}</a:minorFont></a:fontScheme>",
            "<a:fmtScheme name=\"Setlist\">",
            "<a:fillStyleLst>{fill}{fill}{fill}</a:fillStyleLst>",
            "<a:lnStyleLst>{line}{line}{line}</a:lnStyleLst>",
            "<a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst>",
            "<a:bgFillStyleLst>{fill}{fill}{fill}</a:bgFillStyleLst>",
            "</a:fmtScheme></a:themeElements></a:theme>"
        ),
        header = XML_HEADER,
        colors = colors,
        fonts = fonts,
        fill = fill,
        line = line,
        effect = effect,
    )
}
