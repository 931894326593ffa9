//! Drawings and images parsing module
//!
//! This module handles parsing of pictures embedded in XLSX files. It parses
//! drawing*.xml files to get picture anchors and references, resolves
//! relationships to find image paths, and reads image data from xl/media/.
//!
//! # XLSX Drawing Structure
//!
//! Drawings are stored in `xl/drawings/drawing*.xml` files. Each sheet can have
//! at most one drawing file, referenced via `xl/worksheets/_rels/sheet*.xml.rels`.
//!
//! The drawing XML contains anchor elements that define positioning:
//! - `twoCellAnchor`: Anchored to two cells (resizes with cells)
//! - `oneCellAnchor`: Anchored to one cell with absolute size
//! - `absoluteAnchor`: Absolute position (not anchored to cells, skipped here)
//!
//! Pictures reference their data via relationship IDs (`r:embed`), which are
//! resolved through `xl/drawings/_rels/drawing*.xml.rels` to paths in `xl/media/`.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use crate::cell_ref::cell_address;
use crate::error::Result;
use crate::parser::relationships::{parse_relationships, Relationship};
use crate::source::Picture;
use crate::types::ImageFormat;
use crate::xml_helpers::{attr_bool, attr_i64, attr_string, attr_string_local};

/// English Metric Units per pixel at 96 DPI.
pub const EMU_PER_PIXEL: i64 = 9525;

/// A picture together with the cell its top-left corner is anchored to.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredPicture {
    pub cell: String,
    pub picture: Picture,
}

/// Picture anchor as read from the drawing XML, before image resolution.
#[derive(Debug, Default)]
struct PictureAnchor {
    one_cell: bool,
    edit_as: Option<String>,
    from_col: u32,
    from_row: u32,
    from_col_off: i64,
    from_row_off: i64,
    /// Anchor-level `<xdr:ext>` (oneCellAnchor)
    extent: Option<(i64, i64)>,
    /// `<a:xfrm><a:ext>` of the picture shape
    xfrm_extent: Option<(i64, i64)>,
    is_picture: bool,
    descr: String,
    embed_id: Option<String>,
    hyperlink_id: Option<String>,
    lock_aspect_ratio: bool,
    prints_with_sheet: Option<bool>,
    locks_with_sheet: Option<bool>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Marker {
    None,
    From,
    To,
}

/// Parse every cell-anchored picture of a drawing part.
///
/// Pictures whose image part cannot be read are skipped with a debug log.
pub fn parse_drawing_pictures<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    drawing_path: &str,
) -> Result<Vec<AnchoredPicture>> {
    let drawing_path = drawing_path.trim_start_matches('/');
    let rels = parse_relationships(archive, drawing_path)?;
    let anchors = parse_anchors(archive, drawing_path)?;

    let mut pictures = Vec::with_capacity(anchors.len());
    for anchor in anchors {
        let Some(image_path) = anchor
            .embed_id
            .as_ref()
            .and_then(|id| rels.iter().find(|r| &r.id == id && r.is("image")))
            .map(|r| r.target.clone())
        else {
            tracing::debug!(drawing = drawing_path, "picture without image relationship");
            continue;
        };
        let Some(file) = read_image(archive, &image_path) else {
            tracing::debug!(path = %image_path, "unreadable image part");
            continue;
        };
        let picture = build_picture(&anchor, &image_path, file, &rels);
        pictures.push(AnchoredPicture {
            cell: cell_address(anchor.from_col, anchor.from_row),
            picture,
        });
    }

    Ok(pictures)
}

fn parse_anchors<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    drawing_path: &str,
) -> Result<Vec<PictureAnchor>> {
    let file = archive.by_name(drawing_path)?;
    let reader = BufReader::new(file);
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut anchors = Vec::new();
    let mut current: Option<PictureAnchor> = None;
    let mut marker = Marker::None;
    let mut in_xfrm = false;
    let mut in_c_nv_pr = false;
    let mut text_target: Option<&'static str> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let event = xml.read_event_into(&mut buf)?;
        let is_start = matches!(event, Event::Start(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"twoCellAnchor" => {
                        current = Some(PictureAnchor {
                            edit_as: attr_string(e, b"editAs"),
                            ..Default::default()
                        });
                    }
                    b"oneCellAnchor" => {
                        current = Some(PictureAnchor {
                            one_cell: true,
                            ..Default::default()
                        });
                    }
                    b"from" if is_start => marker = Marker::From,
                    b"to" if is_start => marker = Marker::To,
                    b"col" | b"colOff" | b"row" | b"rowOff" if is_start => {
                        if marker == Marker::From {
                            text_target = match name.as_ref() {
                                b"col" => Some("col"),
                                b"colOff" => Some("colOff"),
                                b"row" => Some("row"),
                                _ => Some("rowOff"),
                            };
                        }
                    }
                    b"xfrm" if is_start => in_xfrm = true,
                    b"ext" => {
                        if let Some(anchor) = current.as_mut() {
                            let size = read_extent(e);
                            if in_xfrm {
                                anchor.xfrm_extent = size;
                            } else if anchor.extent.is_none() {
                                anchor.extent = size;
                            }
                        }
                    }
                    b"pic" => {
                        if let Some(anchor) = current.as_mut() {
                            anchor.is_picture = true;
                        }
                    }
                    b"cNvPr" => {
                        in_c_nv_pr = is_start;
                        if let Some(anchor) = current.as_mut() {
                            if anchor.is_picture {
                                anchor.descr = attr_string(e, b"descr").unwrap_or_default();
                            }
                        }
                    }
                    b"hlinkClick" if in_c_nv_pr => {
                        if let Some(anchor) = current.as_mut() {
                            anchor.hyperlink_id =
                                attr_string_local(e, b"id").filter(|s| !s.is_empty());
                        }
                    }
                    b"picLocks" => {
                        if let Some(anchor) = current.as_mut() {
                            anchor.lock_aspect_ratio =
                                attr_bool(e, b"noChangeAspect").unwrap_or(false);
                        }
                    }
                    b"blip" => {
                        if let Some(anchor) = current.as_mut() {
                            anchor.embed_id = attr_string_local(e, b"embed");
                        }
                    }
                    b"clientData" => {
                        if let Some(anchor) = current.as_mut() {
                            anchor.prints_with_sheet = attr_bool(e, b"fPrintsWithSheet");
                            anchor.locks_with_sheet = attr_bool(e, b"fLocksWithSheet");
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                if let (Some(target), Some(anchor)) = (text_target, current.as_mut()) {
                    let value: i64 = t.unescape()?.trim().parse().unwrap_or(0);
                    match target {
                        "col" => anchor.from_col = u32::try_from(value).unwrap_or(0),
                        "row" => anchor.from_row = u32::try_from(value).unwrap_or(0),
                        "colOff" => anchor.from_col_off = value,
                        _ => anchor.from_row_off = value,
                    }
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"twoCellAnchor" | b"oneCellAnchor" => {
                    if let Some(anchor) = current.take() {
                        if anchor.is_picture && anchor.embed_id.is_some() {
                            anchors.push(anchor);
                        }
                    }
                }
                b"from" | b"to" => marker = Marker::None,
                b"col" | b"colOff" | b"row" | b"rowOff" => text_target = None,
                b"xfrm" => in_xfrm = false,
                b"cNvPr" => in_c_nv_pr = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(anchors)
}

fn read_extent(e: &BytesStart) -> Option<(i64, i64)> {
    Some((attr_i64(e, b"cx")?, attr_i64(e, b"cy")?))
}

fn build_picture(
    anchor: &PictureAnchor,
    image_path: &str,
    file: Vec<u8>,
    rels: &[Relationship],
) -> Picture {
    let extension = image_path
        .rsplit_once('.')
        .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    let (scale_x, scale_y) = anchor
        .xfrm_extent
        .or(anchor.extent)
        .zip(image_size(&file))
        .map_or((1.0, 1.0), |((cx, cy), (w, h))| {
            (scale(cx, w), scale(cy, h))
        });

    let (hyperlink, hyperlink_type) = anchor
        .hyperlink_id
        .as_ref()
        .and_then(|id| rels.iter().find(|r| &r.id == id && r.is("hyperlink")))
        .map(|r| {
            if r.external {
                (r.target.clone(), "External".to_string())
            } else {
                let loc = r.target.trim_start_matches('#').to_string();
                (loc, "Location".to_string())
            }
        })
        .unwrap_or_default();

    let positioning = if anchor.one_cell {
        "oneCell".to_string()
    } else {
        anchor.edit_as.clone().unwrap_or_default()
    };

    Picture {
        file,
        extension,
        insert_type: 0,
        format: Some(ImageFormat {
            alt_text: anchor.descr.clone(),
            print_object: Some(anchor.prints_with_sheet.unwrap_or(true)),
            locked: Some(anchor.locks_with_sheet.unwrap_or(true)),
            lock_aspect_ratio: anchor.lock_aspect_ratio,
            auto_fit: false,
            auto_fit_ignore_aspect: false,
            offset_x: emu_to_pixels(anchor.from_col_off),
            offset_y: emu_to_pixels(anchor.from_row_off),
            scale_x,
            scale_y,
            hyperlink,
            hyperlink_type,
            positioning,
        }),
    }
}

/// Drawn extent over native size, rounded to 4 decimal places.
#[allow(clippy::cast_precision_loss)]
fn scale(extent_emu: i64, native_px: u32) -> f64 {
    if native_px == 0 || extent_emu <= 0 {
        return 1.0;
    }
    let drawn = extent_emu as f64 / EMU_PER_PIXEL as f64;
    (drawn / f64::from(native_px) * 10_000.0).round() / 10_000.0
}

/// Convert an EMU offset to whole pixels, saturating at the `i32` range.
pub fn emu_to_pixels(emu: i64) -> i32 {
    let px = emu / EMU_PER_PIXEL;
    i32::try_from(px).unwrap_or(if px < 0 { i32::MIN } else { i32::MAX })
}

/// Read image data from the archive. Empty or missing parts yield `None`.
pub fn read_image<R: Read + Seek>(archive: &mut ZipArchive<R>, image_path: &str) -> Option<Vec<u8>> {
    let normalized_path = image_path.trim_start_matches('/');
    let mut file = archive.by_name(normalized_path).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).ok()?;
    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

/// Native pixel size of PNG, GIF and JPEG data, from the file header.
pub fn image_size(data: &[u8]) -> Option<(u32, u32)> {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        let w = u32::from_be_bytes(data.get(16..20)?.try_into().ok()?);
        let h = u32::from_be_bytes(data.get(20..24)?.try_into().ok()?);
        return Some((w, h));
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        let w = u16::from_le_bytes(data.get(6..8)?.try_into().ok()?);
        let h = u16::from_le_bytes(data.get(8..10)?.try_into().ok()?);
        return Some((u32::from(w), u32::from(h)));
    }
    if data.starts_with(&[0xFF, 0xD8]) {
        return jpeg_size(data);
    }
    None
}

/// Walk JPEG segments until a start-of-frame marker.
fn jpeg_size(data: &[u8]) -> Option<(u32, u32)> {
    let mut pos = 2usize;
    loop {
        if *data.get(pos)? != 0xFF {
            return None;
        }
        let marker = *data.get(pos + 1)?;
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let len = usize::from(u16::from_be_bytes(data.get(pos + 2..pos + 4)?.try_into().ok()?));
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let h = u16::from_be_bytes(data.get(pos + 5..pos + 7)?.try_into().ok()?);
            let w = u16::from_be_bytes(data.get(pos + 7..pos + 9)?.try_into().ok()?);
            return Some((u32::from(w), u32::from(h)));
        }
        pos = pos.checked_add(2 + len)?;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn png_header(w: u32, h: u32) -> Vec<u8> {
        let mut data = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
        data.extend_from_slice(&w.to_be_bytes());
        data.extend_from_slice(&h.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        data
    }

    fn archive(files: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        }
        ZipArchive::new(zip.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_image_size_png_gif_jpeg() {
        assert_eq!(image_size(&png_header(120, 40)), Some((120, 40)));
        assert_eq!(
            image_size(b"GIF89a\x10\x00\x20\x00rest"),
            Some((16, 32))
        );
        let jpeg = [
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, // APP0, length 4
            0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x30, 0x00, 0x40, // SOF0 48x64
        ];
        assert_eq!(image_size(&jpeg), Some((64, 48)));
        assert_eq!(image_size(b"BM not supported"), None);
    }

    #[test]
    fn test_emu_to_pixels() {
        assert_eq!(emu_to_pixels(0), 0);
        assert_eq!(emu_to_pixels(95_250), 10);
        assert_eq!(emu_to_pixels(-19_050), -2);
    }

    #[test]
    fn test_parse_two_cell_anchor_picture() {
        let drawing = r#"<xdr:wsDr xmlns:xdr="x" xmlns:a="a" xmlns:r="r">
  <xdr:twoCellAnchor editAs="oneCell">
    <xdr:from><xdr:col>1</xdr:col><xdr:colOff>95250</xdr:colOff><xdr:row>2</xdr:row><xdr:rowOff>19050</xdr:rowOff></xdr:from>
    <xdr:to><xdr:col>4</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>9</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
    <xdr:pic>
      <xdr:nvPicPr>
        <xdr:cNvPr id="2" name="Picture 1" descr="Company logo">
          <a:hlinkClick r:id="rId2"/>
        </xdr:cNvPr>
        <xdr:cNvPicPr><a:picLocks noChangeAspect="1"/></xdr:cNvPicPr>
      </xdr:nvPicPr>
      <xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill>
      <xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="2286000" cy="381000"/></a:xfrm></xdr:spPr>
    </xdr:pic>
    <xdr:clientData fPrintsWithSheet="0"/>
  </xdr:twoCellAnchor>
</xdr:wsDr>"#;
        let rels = r#"<Relationships>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.PNG"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;
        let png = png_header(120, 40);
        let mut ar = archive(&[
            ("xl/drawings/drawing1.xml", drawing.as_bytes()),
            ("xl/drawings/_rels/drawing1.xml.rels", rels.as_bytes()),
            ("xl/media/image1.PNG", &png),
        ]);

        let pictures = parse_drawing_pictures(&mut ar, "xl/drawings/drawing1.xml").unwrap();
        assert_eq!(pictures.len(), 1);
        let p = &pictures[0];
        assert_eq!(p.cell, "B3");
        assert_eq!(p.picture.extension, ".png");
        assert_eq!(p.picture.file, png);
        assert_eq!(p.picture.insert_type, 0);

        let f = p.picture.format.as_ref().unwrap();
        assert_eq!(f.alt_text, "Company logo");
        assert_eq!(f.print_object, Some(false));
        assert_eq!(f.locked, Some(true));
        assert!(f.lock_aspect_ratio);
        assert_eq!(f.offset_x, 10);
        assert_eq!(f.offset_y, 2);
        // 2286000 EMU = 240px over 120px native, 381000 EMU = 40px over 40px
        assert_eq!(f.scale_x, 2.0);
        assert_eq!(f.scale_y, 1.0);
        assert_eq!(f.hyperlink, "https://example.com");
        assert_eq!(f.hyperlink_type, "External");
        assert_eq!(f.positioning, "oneCell");
    }

    #[test]
    fn test_one_cell_anchor_without_image_part_is_skipped() {
        let drawing = r#"<wsDr>
  <oneCellAnchor>
    <from><col>0</col><colOff>0</colOff><row>0</row><rowOff>0</rowOff></from>
    <ext cx="952500" cy="952500"/>
    <pic><nvPicPr><cNvPr id="2" name="p"/></nvPicPr><blipFill><blip r:embed="rId9"/></blipFill></pic>
    <clientData/>
  </oneCellAnchor>
</wsDr>"#;
        let mut ar = archive(&[("xl/drawings/drawing1.xml", drawing.as_bytes())]);
        let pictures = parse_drawing_pictures(&mut ar, "xl/drawings/drawing1.xml").unwrap();
        assert!(pictures.is_empty());
    }
}
