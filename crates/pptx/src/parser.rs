//! PPTX song deck parser.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use setlist_core::clean::SOFT_BREAK;
use setlist_core::{Error, Result, SourceDeck, SourceShape, SourceSlide};
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

const PRESENTATION_PATH: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PATH: &str = "ppt/_rels/presentation.xml.rels";

/// Parser for PPTX (Office Open XML) song decks.
pub struct PptxParser;

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a PPTX file from a reader into positioned shapes per slide.
    pub fn parse<R: Read + Seek>(&self, reader: R, filename: &str) -> Result<SourceDeck> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let info = self.read_presentation_info(&mut archive)?;
        let mut deck = SourceDeck::new(filename, info.slide_height);

        let slide_order = self.get_slide_order(&mut archive, &info.slide_rel_ids)?;
        log::debug!("'{}' has {} slides", filename, slide_order.len());

        for (idx, slide_path) in slide_order.iter().enumerate() {
            let slide = self.parse_slide(&mut archive, slide_path, idx + 1)?;
            deck.add_slide(slide);
        }

        Ok(deck)
    }

    /// Read the slide size and the ordered slide relationship ids.
    fn read_presentation_info<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<PresentationInfo> {
        let content = self.read_file_from_archive(archive, PRESENTATION_PATH)?;
        let mut info = PresentationInfo {
            slide_height: SourceDeck::DEFAULT_SLIDE_HEIGHT,
            slide_rel_ids: Vec::new(),
        };

        let mut reader = Reader::from_str(&content);
        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    match local_name(e.name().as_ref()) {
                        b"sldSz" => {
                            if let Some(cy) = attr_value(e, b"cy").and_then(|v| v.parse().ok()) {
                                info.slide_height = cy;
                            }
                        }
                        b"sldId" => {
                            if let Some(rel_id) = relationship_id(e) {
                                info.slide_rel_ids.push(rel_id);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing presentation: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(info)
    }

    /// Get the ordered list of slide paths.
    ///
    /// Follows the presentation's slide id list; decks without one fall back
    /// to the slide numbers in the part names.
    fn get_slide_order<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_rel_ids: &[String],
    ) -> Result<Vec<String>> {
        let rels_content = self.read_file_from_archive(archive, PRESENTATION_RELS_PATH)?;
        let mut targets: HashMap<String, String> = HashMap::new();

        let mut reader = Reader::from_str(&rels_content);
        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let rel_type = attr_value(e, b"Type").unwrap_or_default();
                    if !rel_type.ends_with("/slide") {
                        continue;
                    }
                    if let (Some(id), Some(target)) = (attr_value(e, b"Id"), attr_value(e, b"Target")) {
                        targets.insert(id, resolve_target(&target));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        if !slide_rel_ids.is_empty() {
            return Ok(slide_rel_ids
                .iter()
                .filter_map(|id| {
                    let target = targets.get(id).cloned();
                    if target.is_none() {
                        log::warn!("Slide relationship '{}' has no target", id);
                    }
                    target
                })
                .collect());
        }

        let mut slides: Vec<(String, Option<usize>)> = targets
            .into_values()
            .map(|path| {
                let number = extract_slide_number(&path);
                (path, number)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }

    /// Parse a single slide from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        slide_path: &str,
        slide_number: usize,
    ) -> Result<SourceSlide> {
        let content = self.read_file_from_archive(archive, slide_path)?;
        let mut slide = SourceSlide::new(slide_number);

        slide.shapes = self
            .extract_shapes_from_xml(&content)
            .map_err(|e| Error::PptxParseError(format!("{}: {}", slide_path, e)))?;

        Ok(slide)
    }

    /// Extract text shapes, in document order, from slide XML.
    ///
    /// Paragraphs are joined with `\n`; `<a:br/>` becomes a soft break.
    fn extract_shapes_from_xml(&self, xml_content: &str) -> Result<Vec<SourceShape>> {
        let mut shapes = Vec::new();
        let mut reader = Reader::from_str(xml_content);

        let mut current_shape: Option<ShapeInfo> = None;
        let mut in_text_body = false;
        let mut in_text_run = false;
        let mut paragraphs = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                    b"sp" => {
                        current_shape = Some(ShapeInfo::default());
                    }
                    b"off" => {
                        if let Some(ref mut shape) = current_shape {
                            shape.set_offset(e);
                        }
                    }
                    b"txBody" if current_shape.is_some() => {
                        in_text_body = true;
                        paragraphs = 0;
                    }
                    b"p" if in_text_body => {
                        start_paragraph(&mut current_shape, &mut paragraphs);
                    }
                    b"t" if in_text_body => {
                        in_text_run = true;
                    }
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                    b"off" => {
                        if let Some(ref mut shape) = current_shape {
                            shape.set_offset(e);
                        }
                    }
                    b"br" if in_text_body => {
                        if let Some(ref mut shape) = current_shape {
                            shape.text.push(SOFT_BREAK);
                        }
                    }
                    b"p" if in_text_body => {
                        start_paragraph(&mut current_shape, &mut paragraphs);
                    }
                    _ => {}
                },
                Ok(Event::Text(ref e)) if in_text_run => {
                    let text = e
                        .unescape()
                        .map_err(|e| Error::XmlError(format!("Bad text run: {}", e)))?;
                    if let Some(ref mut shape) = current_shape {
                        shape.text.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                    b"sp" => {
                        if let Some(shape) = current_shape.take() {
                            if !shape.text.trim().is_empty() {
                                shapes.push(shape.into_source_shape());
                            }
                        }
                        in_text_body = false;
                        in_text_run = false;
                    }
                    b"txBody" => {
                        in_text_body = false;
                    }
                    b"t" => {
                        in_text_run = false;
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(shapes)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Values read from `ppt/presentation.xml`.
#[derive(Debug)]
struct PresentationInfo {
    slide_height: f64,
    slide_rel_ids: Vec<String>,
}

/// A shape being collected from slide XML.
#[derive(Debug, Default)]
struct ShapeInfo {
    text: String,
    x: Option<f64>,
    y: Option<f64>,
}

impl ShapeInfo {
    /// Take the shape's own offset; later offsets (of child frames) are ignored.
    fn set_offset(&mut self, e: &BytesStart) {
        if self.y.is_some() {
            return;
        }
        self.x = attr_value(e, b"x").and_then(|v| v.parse().ok());
        self.y = attr_value(e, b"y").and_then(|v| v.parse().ok());
    }

    fn into_source_shape(self) -> SourceShape {
        SourceShape {
            text: self.text,
            y_position: self.y,
            x_position: self.x,
        }
    }
}

fn start_paragraph(shape: &mut Option<ShapeInfo>, paragraphs: &mut usize) {
    if let Some(shape) = shape {
        if *paragraphs > 0 {
            shape.text.push('\n');
        }
    }
    *paragraphs += 1;
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Value of an unprefixed attribute.
fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Value of the namespaced `r:id` attribute of a `sldId`.
fn relationship_id(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| {
            let key = attr.key.as_ref();
            key != b"id" && local_name(key) == b"id"
        })
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Turn a relationship target into an archive path.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    }
}

/// Extract a slide number from a string like "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

    fn text_shape(y: u64, paragraphs: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="t"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="0" y="{}"/><a:ext cx="100" cy="100"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/>{}</p:txBody></p:sp>"#,
            y, paragraphs
        )
    }

    fn slide_xml(shapes: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld {}><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>"#,
            NS,
            shapes.concat()
        )
    }

    /// Build a deck whose presentation lists slides in `order` (1-based part numbers).
    fn build_pptx(slides: &[String], order: &[usize]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let ids: String = order
            .iter()
            .enumerate()
            .map(|(i, n)| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, n + 1))
            .collect();
        zip.start_file(PRESENTATION_PATH, options).unwrap();
        write!(
            zip,
            r#"<p:presentation {}><p:sldIdLst>{}</p:sldIdLst><p:sldSz cx="9144000" cy="1000"/></p:presentation>"#,
            NS, ids
        )
        .unwrap();

        let rels: String = (1..=slides.len())
            .map(|n| {
                format!(
                    r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                    n + 1,
                    n
                )
            })
            .collect();
        zip.start_file(PRESENTATION_RELS_PATH, options).unwrap();
        write!(
            zip,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>{}</Relationships>"#,
            rels
        )
        .unwrap();

        for (i, slide) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(slide.as_bytes()).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_parse_shapes_and_breaks() {
        let slide = slide_xml(&[
            text_shape(
                100,
                "<a:p><a:r><a:t>奇異恩典 </a:t></a:r><a:r><a:t>何等甘甜</a:t></a:r><a:br/><a:r><a:t>我罪已得赦免</a:t></a:r></a:p><a:p><a:r><a:t>Tom &amp; Jerry</a:t></a:r></a:p>",
            ),
            text_shape(950, "<a:p><a:r><a:t>《奇異恩典》</a:t></a:r></a:p>"),
        ]);
        let data = build_pptx(&[slide], &[1]);

        let deck = PptxParser::new()
            .parse(Cursor::new(data), "grace.pptx")
            .unwrap();

        assert_eq!(deck.slide_height, 1000.0);
        assert_eq!(deck.slides.len(), 1);
        let shapes = &deck.slides[0].shapes;
        assert_eq!(shapes.len(), 2);
        assert_eq!(
            shapes[0].text,
            "奇異恩典 何等甘甜\u{000B}我罪已得赦免\nTom & Jerry"
        );
        assert_eq!(shapes[0].y_position, Some(100.0));
        assert_eq!(shapes[1].y_position, Some(950.0));
    }

    #[test]
    fn test_parse_follows_slide_id_list() {
        let first = slide_xml(&[text_shape(0, "<a:p><a:r><a:t>part one</a:t></a:r></a:p>")]);
        let second = slide_xml(&[text_shape(0, "<a:p><a:r><a:t>part two</a:t></a:r></a:p>")]);
        let data = build_pptx(&[first, second], &[2, 1]);

        let deck = PptxParser::new().parse(Cursor::new(data), "x.pptx").unwrap();
        let texts: Vec<&str> = deck
            .slides
            .iter()
            .map(|s| s.shapes[0].text.as_str())
            .collect();
        assert_eq!(texts, vec!["part two", "part one"]);
        assert_eq!(deck.slides[0].number, 1);
    }

    #[test]
    fn test_shape_without_offset_and_empty_shapes() {
        let slide = slide_xml(&[
            r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="ph"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>inherited</a:t></a:r></a:p></p:txBody></p:sp>"#.to_string(),
            text_shape(10, "<a:p/><a:p><a:r><a:t>  </a:t></a:r></a:p>"),
        ]);
        let data = build_pptx(&[slide], &[1]);

        let deck = PptxParser::new().parse(Cursor::new(data), "x.pptx").unwrap();
        let shapes = &deck.slides[0].shapes;
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].text, "inherited");
        assert_eq!(shapes[0].y_position, None);
    }

    #[test]
    fn test_not_a_zip() {
        let result = PptxParser::new().parse(Cursor::new(b"not a deck".to_vec()), "x.pptx");
        assert!(matches!(result, Err(Error::ZipError(_))));
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("ppt/slides/slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("/ppt/slides/slide2.xml"), "ppt/slides/slide2.xml");
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }
}
