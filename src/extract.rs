//! Text extraction from uploaded files, dispatched by extension.
//!
//! PDF goes through pdf-extract; docx/pptx/xlsx are OOXML ZIP archives walked
//! with quick-xml; html is stripped of tags; txt/py/csv are UTF-8
//! passthrough. An unsupported extension (including legacy binary `.xls`) is
//! not an error: the batch surfaces a warning and skips the file.

use std::io::Read;

use crate::core::errors::ChatError;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Outcome of extracting one file.
#[derive(Debug)]
pub enum Extracted {
    Text(String),
    /// Extension we have no reader for; carries the lowercased extension.
    Unsupported(String),
}

/// Extract plain text from `bytes`, choosing the reader from the lowercased
/// extension of `file_name`. Parse failures are per-file extraction errors;
/// the ingestion batch skips the file and continues.
pub fn extract(bytes: &[u8], file_name: &str) -> Result<Extracted, ChatError> {
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    let text = match extension.as_str() {
        "pdf" => extract_pdf(bytes)?,
        "doc" | "docx" => extract_docx(bytes)?,
        "pptx" => extract_pptx(bytes)?,
        "xlsx" => extract_xlsx(bytes)?,
        "html" => strip_html_tags(&decode_utf8(bytes)?),
        "txt" | "py" | "csv" => decode_utf8(bytes)?,
        _ => {
            tracing::warn!(
                "File type '.{}' not supported for text extraction. Skipping.",
                extension
            );
            return Ok(Extracted::Unsupported(extension));
        }
    };

    Ok(Extracted::Text(text))
}

fn decode_utf8(bytes: &[u8]) -> Result<String, ChatError> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ChatError::Extraction(format!("invalid UTF-8: {}", e)))
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ChatError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ChatError::Extraction(format!("PDF extraction failed: {}", e)))
}

fn open_archive(bytes: &[u8]) -> Result<zip::ZipArchive<std::io::Cursor<&[u8]>>, ChatError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ChatError::Extraction(format!("OOXML archive unreadable: {}", e)))
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ChatError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ChatError::Extraction(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| ChatError::Extraction(e.to_string()))?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ChatError::Extraction(format!(
            "ZIP entry {} exceeds size limit",
            name
        )));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ChatError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")
        .map_err(|_| ChatError::Extraction("word/document.xml not found".to_string()))?;
    extract_t_elements(&xml, "\n")
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ChatError> {
    let mut archive = open_archive(bytes)?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut out = String::new();
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        let text = extract_t_elements(&xml, "\n")?;
        if !out.is_empty() && !text.is_empty() {
            out.push('\n');
        }
        out.push_str(&text);
    }
    Ok(out)
}

/// Collect the text of every `<t>`-suffixed element (`w:t` in docx, `a:t` in
/// pptx), joined with `sep`.
fn extract_t_elements(xml: &[u8], sep: &str) -> Result<String, ChatError> {
    let mut parts: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        parts.push(te.unescape().unwrap_or_default().into_owned());
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ChatError::Extraction(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(parts.join(sep))
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ChatError> {
    let mut archive = open_archive(bytes)?;
    let shared_strings = read_shared_strings(&mut archive)?;

    let mut sheet_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    sheet_names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut out = String::new();
    for name in sheet_names {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        let cells = extract_sheet_cells(&xml, &shared_strings)?;
        if !out.is_empty() && !cells.is_empty() {
            out.push(' ');
        }
        out.push_str(&cells);
    }
    Ok(out)
}

fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>, ChatError> {
    let xml = match read_zip_entry_bounded(archive, "xl/sharedStrings.xml") {
        Ok(xml) => xml,
        // workbook with no string cells
        Err(_) => return Ok(Vec::new()),
    };

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = true;
                } else if in_si && e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        strings.push(te.unescape().unwrap_or_default().into_owned());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"si" {
                    in_si = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ChatError::Extraction(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

fn extract_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, ChatError> {
    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_v = false;
    let mut cell_is_shared_str = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = e.attributes().any(|a| {
                        a.as_ref()
                            .map(|a| a.key.as_ref() == b"t" && a.value.as_ref() == b"s")
                            .unwrap_or(false)
                    });
                } else if e.local_name().as_ref() == b"v" {
                    in_v = true;
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_v => {
                let v = te.unescape().unwrap_or_default();
                let s = v.trim();
                if !s.is_empty() {
                    if cell_is_shared_str {
                        if let Ok(i) = s.parse::<usize>() {
                            if i < shared_strings.len() {
                                cells.push(shared_strings[i].clone());
                            }
                        }
                    } else {
                        cells.push(s.to_string());
                    }
                }
                in_v = false;
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"v" {
                    in_v = false;
                } else if e.local_name().as_ref() == b"c" {
                    cell_is_shared_str = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ChatError::Extraction(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}

/// Strip HTML tags and script/style bodies, keeping visible text.
pub fn strip_html_tags(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    let chars: Vec<char> = html.chars().collect();
    let chars_lower: Vec<char> = html.to_lowercase().chars().collect();

    let mut i = 0;
    while i < chars.len() {
        if i + 7 <= chars_lower.len() {
            let tag: String = chars_lower[i..(i + 7).min(chars_lower.len())].iter().collect();
            if tag == "<script" {
                in_script = true;
            } else if tag.starts_with("<style") {
                in_style = true;
            }
        }

        if in_script && i + 9 <= chars_lower.len() {
            let tag: String = chars_lower[i..i + 9].iter().collect();
            if tag == "</script>" {
                in_script = false;
                i += 9;
                continue;
            }
        }
        if in_style && i + 8 <= chars_lower.len() {
            let tag: String = chars_lower[i..i + 8].iter().collect();
            if tag == "</style>" {
                in_style = false;
                i += 8;
                continue;
            }
        }

        if in_script || in_style {
            i += 1;
            continue;
        }

        let c = chars[i];
        if c == '<' {
            in_tag = true;
        } else if c == '>' {
            in_tag = false;
        } else if !in_tag {
            result.push(c);
        }

        i += 1;
    }

    let lines: Vec<&str> = result
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    lines.join("\n")
}
