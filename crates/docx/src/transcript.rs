//! Lyric transcript writer.
//!
//! Each song becomes a `【title】` heading followed by one paragraph per
//! lyric line. Marker lines are set in bold. Songs without lyrics get a
//! placeholder that tells the reader why.
//!
//! With a template, every part of the template package is carried over and
//! only `word/document.xml` is replaced, so its styles apply.

use quick_xml::escape::escape;
use setlist_core::clean::xml_safe;
use setlist_core::{ArtifactSink, Error, ExtractedSong, MarkerTable, Result, SongStatus};
use std::fs::File;
use std::io::{BufReader, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const TITLE_STYLE: &str = "SongTitle";
const LYRICS_STYLE: &str = "Lyrics";

const DOCUMENT_PART: &str = "word/document.xml";

/// Placeholder texts for songs without lyrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    /// No deck in the library matched.
    pub not_found: String,
    /// The deck is in the legacy binary format.
    pub legacy_format: String,
    /// A deck was found but no lyrics came out.
    pub empty: String,
    /// Lines were supplied but all of them were blank.
    pub no_lyrics: String,
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            not_found: "【警告：在詩歌庫中找不到這首歌的檔案，請檢查歌名是否完全匹配】".to_string(),
            legacy_format: "【注意：此歌曲為舊版.ppt格式，無法自動匯入，請手動處理】".to_string(),
            empty: "【注意：找到了檔案，但未能成功提取任何歌詞】".to_string(),
            no_lyrics: "【無歌詞內容】".to_string(),
        }
    }
}

impl Placeholders {
    /// Placeholder for a song with the given status.
    pub fn for_status(&self, status: SongStatus) -> &str {
        match status {
            SongStatus::NotFound => &self.not_found,
            SongStatus::LegacyFormat => &self.legacy_format,
            SongStatus::Supplied => &self.no_lyrics,
            SongStatus::Extracted | SongStatus::ExtractionFailed => &self.empty,
        }
    }
}

/// Document-sink writing the lyric transcript as DOCX.
#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    markers: MarkerTable,
    placeholders: Placeholders,
    font_face: String,
    file_name: String,
    template: Option<PathBuf>,
}

impl Default for TranscriptWriter {
    fn default() -> Self {
        Self {
            markers: MarkerTable::default(),
            placeholders: Placeholders::default(),
            font_face: "微軟正黑體".to_string(),
            file_name: Self::DEFAULT_FILE_NAME.to_string(),
            template: None,
        }
    }
}

impl TranscriptWriter {
    /// File name used unless configured otherwise.
    pub const DEFAULT_FILE_NAME: &'static str = "敬拜大字報.docx";

    /// Create a writer with default markers and placeholders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the markers whose lines are set in bold.
    pub fn with_markers(mut self, markers: MarkerTable) -> Self {
        self.markers = markers;
        self
    }

    /// Replace the placeholder texts.
    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Set the typeface of the transcript styles.
    pub fn with_font_face(mut self, face: impl Into<String>) -> Self {
        self.font_face = face.into();
        self
    }

    /// Set the output file name.
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Build the transcript on a template `.docx` instead of the built-in styles.
    pub fn with_template(mut self, template: Option<PathBuf>) -> Self {
        self.template = template;
        self
    }

    /// Open the configured template and check it has a document part.
    pub fn check_template(&self) -> Result<()> {
        match &self.template {
            Some(path) => open_template(path).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Build the body XML of the transcript.
    pub fn document_xml(&self, songs: &[ExtractedSong]) -> String {
        let mut body = String::new();

        for (idx, song) in songs.iter().enumerate() {
            if idx > 0 {
                body.push_str("<w:p/>");
            }

            body.push_str(&paragraph(Some(TITLE_STYLE), &format!("【{}】", song.title), false));

            let lines = song.lines();
            if lines.is_empty() {
                let placeholder = self.placeholders.for_status(song.status);
                body.push_str(&paragraph(None, placeholder, true));
                continue;
            }

            for line in lines {
                let bold = self.markers.is_marker(line);
                body.push_str(&paragraph(Some(LYRICS_STYLE), line, bold));
            }
        }

        format!(
            concat!(
                "{header}<w:document xmlns:w=\"{ns}\"><w:body>{body}",
                "<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/>",
                "<w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" ",
                "w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/></w:sectPr>",
                "</w:body></w:document>"
            ),
            header = XML_HEADER,
            ns = WML_NS,
            body = body,
        )
    }

    /// Render the transcript into a writer.
    pub fn render<W: Write + Seek>(&self, songs: &[ExtractedSong], writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);

        match &self.template {
            Some(path) => {
                let mut template = open_template(path)?;
                for idx in 0..template.len() {
                    let part = template
                        .by_index_raw(idx)
                        .map_err(|e| Error::ZipError(format!("Failed to read template: {}", e)))?;
                    if part.name() == DOCUMENT_PART {
                        continue;
                    }
                    let name = part.name().to_string();
                    zip.raw_copy_file(part).map_err(|e| {
                        Error::RenderError(format!("Failed to copy template part '{}': {}", name, e))
                    })?;
                }
            }
            None => {
                add_part(&mut zip, "[Content_Types].xml", CONTENT_TYPES)?;
                add_part(&mut zip, "_rels/.rels", ROOT_RELS)?;
                add_part(&mut zip, "word/_rels/document.xml.rels", DOCUMENT_RELS)?;
                add_part(&mut zip, "word/styles.xml", &self.styles_xml())?;
            }
        }
        add_part(&mut zip, DOCUMENT_PART, &self.document_xml(songs))?;

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish transcript: {}", e)))?;
        Ok(())
    }

    fn styles_xml(&self) -> String {
        let face = xml_safe(&self.font_face);
        let face = escape(&face);
        format!(
            concat!(
                "{header}<w:styles xmlns:w=\"{ns}\">",
                "<w:docDefaults><w:rPrDefault><w:rPr>",
                "<w:rFonts w:ascii=\"{face}\" w:eastAsia=\"{face}\" w:hAnsi=\"{face}\"/>",
                "<w:sz w:val=\"24\"/></w:rPr></w:rPrDefault></w:docDefaults>",
                "<w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/></w:style>",
                "<w:style w:type=\"paragraph\" w:customStyle=\"1\" w:styleId=\"{title}\"><w:name w:val=\"Song Title\"/>",
                "<w:basedOn w:val=\"Normal\"/><w:pPr><w:spacing w:after=\"200\"/></w:pPr>",
                "<w:rPr><w:b/><w:sz w:val=\"36\"/></w:rPr></w:style>",
                "<w:style w:type=\"paragraph\" w:customStyle=\"1\" w:styleId=\"{lyrics}\"><w:name w:val=\"Lyrics\"/>",
                "<w:basedOn w:val=\"Normal\"/><w:pPr><w:spacing w:before=\"0\" w:after=\"0\" w:line=\"360\" w:lineRule=\"auto\"/></w:pPr>",
                "<w:rPr><w:sz w:val=\"28\"/></w:rPr></w:style>",
                "</w:styles>"
            ),
            header = XML_HEADER,
            ns = WML_NS,
            face = face,
            title = TITLE_STYLE,
            lyrics = LYRICS_STYLE,
        )
    }
}

impl ArtifactSink for TranscriptWriter {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn write_to(&self, songs: &[ExtractedSong], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.render(songs, file)?;
        log::info!("Wrote transcript of {} songs to {}", songs.len(), path.display());
        Ok(())
    }
}

fn paragraph(style: Option<&str>, text: &str, bold: bool) -> String {
    let style = style
        .map(|s| format!("<w:pPr><w:pStyle w:val=\"{}\"/></w:pPr>", s))
        .unwrap_or_default();
    let run_props = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    format!(
        "<w:p>{}<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        style,
        run_props,
        escape(&xml_safe(text))
    )
}

fn open_template(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(|e| {
        Error::RenderError(format!("Cannot open template {}: {}", path.display(), e))
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| {
        Error::RenderError(format!("Template {} is not a .docx: {}", path.display(), e))
    })?;
    if archive.by_name(DOCUMENT_PART).is_err() {
        return Err(Error::RenderError(format!(
            "Template {} has no {}",
            path.display(),
            DOCUMENT_PART
        )));
    }
    Ok(archive)
}

fn add_part<W: Write + Seek>(zip: &mut ZipWriter<W>, name: &str, content: &str) -> Result<()> {
    zip.start_file(name, FileOptions::default())
        .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
    r#"</Types>"#
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"</Relationships>"#
);

const DOCUMENT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    r#"</Relationships>"#
);

#[cfg(test)]
mod tests {
    use super::*;
    use setlist_core::DisplayGroup;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    fn extracted(title: &str, lines: &[&str]) -> ExtractedSong {
        let groups = DisplayGroup::from_lines(lines.iter().copied())
            .into_iter()
            .collect();
        ExtractedSong::new(title, SongStatus::Extracted, groups)
    }

    #[test]
    fn test_sections_in_order() {
        let writer = TranscriptWriter::new().with_markers(MarkerTable::new(["c."]));
        let xml = writer.document_xml(&[
            extracted("奇異恩典", &["奇異恩典 何等甘甜", "c. 副歌"]),
            extracted("Grace", &["Amazing grace"]),
        ]);

        let first = xml.find("【奇異恩典】").unwrap();
        let second = xml.find("【Grace】").unwrap();
        assert!(first < second);
        assert!(xml.contains("<w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">c. 副歌</w:t>"));
        assert!(xml.contains("<w:r><w:t xml:space=\"preserve\">奇異恩典 何等甘甜</w:t>"));
    }

    #[test]
    fn test_placeholders_by_status() {
        let writer = TranscriptWriter::new();
        let placeholders = Placeholders::default();
        let xml = writer.document_xml(&[
            ExtractedSong::new("Missing", SongStatus::NotFound, Vec::new()),
            ExtractedSong::new("Old", SongStatus::LegacyFormat, Vec::new()),
            ExtractedSong::new("Broken", SongStatus::ExtractionFailed, Vec::new()),
        ]);

        let not_found = xml.find(&placeholders.not_found).unwrap();
        let legacy = xml.find(&placeholders.legacy_format).unwrap();
        let empty = xml.find(&placeholders.empty).unwrap();
        assert!(not_found < legacy && legacy < empty);
    }

    #[test]
    fn test_text_is_escaped() {
        let xml = TranscriptWriter::new().document_xml(&[extracted("A & B", &["x < y"])]);
        assert!(xml.contains("【A &amp; B】"));
        assert!(xml.contains("x &lt; y"));
    }

    #[test]
    fn test_render_archive_parts() {
        let mut buffer = Cursor::new(Vec::new());
        TranscriptWriter::new()
            .render(&[extracted("Grace", &["line"])], &mut buffer)
            .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(buffer.into_inner())).unwrap();
        for part in ["[Content_Types].xml", "_rels/.rels", "word/styles.xml"] {
            assert!(archive.by_name(part).is_ok(), "missing {}", part);
        }
        let mut document = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut document)
            .unwrap();
        assert!(document.contains("【Grace】"));
    }

    #[test]
    fn test_supplied_without_lines_placeholder() {
        let placeholders = Placeholders::default();
        let xml = TranscriptWriter::new().document_xml(&[ExtractedSong::new(
            "Edited",
            SongStatus::Supplied,
            Vec::new(),
        )]);
        assert!(xml.contains(&placeholders.no_lyrics));
        assert!(!xml.contains(&placeholders.empty));
    }

    #[test]
    fn test_control_characters_dropped() {
        let xml = TranscriptWriter::new()
            .document_xml(&[extracted("T\u{000C}", &["page\u{000C}two", "a\u{000B}b"])]);
        assert!(xml.chars().all(setlist_core::clean::is_xml_char));
        assert!(xml.contains("pagetwo"));
        assert!(xml.contains("【T】"));
    }

    fn write_template(path: &Path, parts: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in parts {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn read_part(data: Vec<u8>, name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn test_template_parts_carried_over() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.docx");
        write_template(
            &template,
            &[
                ("[Content_Types].xml", CONTENT_TYPES),
                ("_rels/.rels", ROOT_RELS),
                ("word/_rels/document.xml.rels", DOCUMENT_RELS),
                ("word/styles.xml", "<w:styles><!-- church styles --></w:styles>"),
                ("word/document.xml", "<w:document><w:body><w:p/></w:body></w:document>"),
                ("docProps/app.xml", "<Properties/>"),
            ],
        );

        let writer = TranscriptWriter::new().with_template(Some(template));
        writer.check_template().unwrap();
        let mut buffer = Cursor::new(Vec::new());
        writer
            .render(&[extracted("Grace", &["line"])], &mut buffer)
            .unwrap();
        let data = buffer.into_inner();

        assert_eq!(
            read_part(data.clone(), "word/styles.xml"),
            "<w:styles><!-- church styles --></w:styles>"
        );
        assert_eq!(read_part(data.clone(), "docProps/app.xml"), "<Properties/>");
        let document = read_part(data.clone(), "word/document.xml");
        assert!(document.contains("【Grace】"));
        assert!(!document.contains("<w:body><w:p/>"));

        let archive = ZipArchive::new(Cursor::new(data)).unwrap();
        assert_eq!(archive.file_names().filter(|n| *n == DOCUMENT_PART).count(), 1);
    }

    #[test]
    fn test_unusable_template_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let missing = TranscriptWriter::new().with_template(Some(dir.path().join("nope.docx")));
        assert!(matches!(missing.check_template(), Err(Error::RenderError(_))));

        let not_zip = dir.path().join("plain.docx");
        std::fs::write(&not_zip, b"not a zip").unwrap();
        let writer = TranscriptWriter::new().with_template(Some(not_zip));
        assert!(matches!(writer.check_template(), Err(Error::RenderError(_))));

        let no_document = dir.path().join("empty.docx");
        write_template(&no_document, &[("word/styles.xml", "<w:styles/>")]);
        let writer = TranscriptWriter::new().with_template(Some(no_document));
        assert!(matches!(
            writer.render(&[], Cursor::new(Vec::new())),
            Err(Error::RenderError(_))
        ));
    }
}
