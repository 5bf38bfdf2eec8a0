//! Incremental PDF document writer
//!
//! Emits a paginated document object-by-object to any `io::Write` sink,
//! tracking byte offsets for the cross-reference table as it goes. Pages are
//! flushed downstream as soon as they are written; only the page currently
//! being built and the offset table are held in memory, so document size is
//! unbounded by RAM.
//!
//! No third-party PDF crate is used here: the mainstream writers
//! (`printpdf`, `lopdf`, `pdf-writer`) all materialize the full document
//! before serializing, which this pipeline explicitly must not do. The
//! subset of PDF needed for these sheets is small: base-14 Type1 fonts,
//! uncompressed content streams, and 1-bit DeviceGray image XObjects.

use std::io::{self, Write};

use super::layout;

/// 1-bit packed bitmap for embedding as an image XObject.
///
/// Bit 1 is white, bit 0 is black (DeviceGray sample semantics). Rows are
/// padded to a byte boundary, as PDF image streams require.
#[derive(Debug, Clone)]
pub struct QrBitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl QrBitmap {
    /// Threshold a grayscale image into a packed two-tone bitmap.
    pub fn from_luma(img: &image::GrayImage) -> Self {
        let (width, height) = img.dimensions();
        let row_bytes = (width as usize + 7) / 8;
        let mut data = vec![0u8; row_bytes * height as usize];
        for y in 0..height {
            for x in 0..width {
                if img.get_pixel(x, y)[0] >= 128 {
                    data[y as usize * row_bytes + x as usize / 8] |= 0x80 >> (x % 8);
                }
            }
        }
        QrBitmap {
            width,
            height,
            data,
        }
    }
}

/// One rendered unit: a label plus its QR bitmap, occupying half a page.
#[derive(Debug, Clone)]
pub struct Record {
    pub label: String,
    pub qr: QrBitmap,
}

const CATALOG_ID: u32 = 1;
const PAGES_ID: u32 = 2;
const LABEL_FONT_ID: u32 = 3;
const CAPTION_FONT_ID: u32 = 4;
const FIRST_DYNAMIC_ID: u32 = 5;

/// Streaming writer for one document.
///
/// Usage: `new`, any number of `write_page` calls, then `finish` (which
/// emits the deferred page tree, the xref table and the trailer).
pub struct DocWriter<W: Write> {
    out: W,
    written: u64,
    offsets: Vec<(u32, u64)>,
    next_id: u32,
    page_ids: Vec<u32>,
    caption: String,
}

impl<W: Write> DocWriter<W> {
    /// Start a document, emitting the header, catalog and font objects.
    pub fn new(out: W, caption: impl Into<String>) -> io::Result<Self> {
        let mut writer = DocWriter {
            out,
            written: 0,
            offsets: Vec::new(),
            next_id: FIRST_DYNAMIC_ID,
            page_ids: Vec::new(),
            caption: caption.into(),
        };
        writer.emit(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;

        // The catalog may reference the page tree before it exists in the
        // file; object order is irrelevant once the xref is written.
        writer.begin_obj(CATALOG_ID)?;
        writer.emit(format!("<< /Type /Catalog /Pages {} 0 R >>\n", PAGES_ID).as_bytes())?;
        writer.end_obj()?;

        writer.write_font(LABEL_FONT_ID, "Helvetica-BoldOblique")?;
        writer.write_font(CAPTION_FONT_ID, "Helvetica-Bold")?;
        Ok(writer)
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Write one page holding one or two records (top half first).
    pub fn write_page(&mut self, records: &[Record]) -> io::Result<()> {
        debug_assert!(!records.is_empty() && records.len() <= layout::RECORDS_PER_PAGE);

        let image_ids: Vec<u32> = records.iter().map(|_| self.alloc_id()).collect();
        let content_id = self.alloc_id();
        let page_id = self.alloc_id();

        for (record, &id) in records.iter().zip(&image_ids) {
            self.write_image(id, &record.qr)?;
        }

        let mut content = String::new();
        for (half, record) in records.iter().enumerate() {
            let l = layout::record_layout(&record.label, &self.caption, half);
            content.push_str(&format!(
                "BT /F1 {:.2} Tf {:.2} {:.2} Td ({}) Tj ET\n",
                l.label_size,
                l.label_x,
                l.label_y,
                escape_text(&record.label)
            ));
            content.push_str(&format!(
                "BT /F2 {:.2} Tf {:.2} {:.2} Td ({}) Tj ET\n",
                layout::CAPTION_SIZE,
                l.caption_x,
                l.caption_y,
                escape_text(&self.caption)
            ));
            content.push_str(&format!(
                "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im{} Do Q\n",
                layout::QR_SIZE,
                layout::QR_SIZE,
                l.qr_x,
                l.qr_y,
                half
            ));
        }

        self.begin_obj(content_id)?;
        self.emit(format!("<< /Length {} >>\nstream\n", content.len()).as_bytes())?;
        self.emit(content.as_bytes())?;
        self.emit(b"endstream\n")?;
        self.end_obj()?;

        let mut xobjects = String::new();
        for (i, &id) in image_ids.iter().enumerate() {
            xobjects.push_str(&format!("/Im{} {} 0 R ", i, id));
        }
        self.begin_obj(page_id)?;
        self.emit(
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> /XObject << {}>> >> \
                 /Contents {} 0 R >>\n",
                PAGES_ID,
                layout::PAGE_WIDTH,
                layout::PAGE_HEIGHT,
                LABEL_FONT_ID,
                CAPTION_FONT_ID,
                xobjects,
                content_id
            )
            .as_bytes(),
        )?;
        self.end_obj()?;
        self.page_ids.push(page_id);
        Ok(())
    }

    /// Emit the deferred page tree, xref table and trailer, then flush.
    pub fn finish(mut self) -> io::Result<W> {
        let kids: String = self
            .page_ids
            .iter()
            .map(|id| format!("{} 0 R ", id))
            .collect();
        self.begin_obj(PAGES_ID)?;
        self.emit(
            format!(
                "<< /Type /Pages /Kids [ {}] /Count {} >>\n",
                kids,
                self.page_ids.len()
            )
            .as_bytes(),
        )?;
        self.end_obj()?;

        let xref_offset = self.written;
        let size = self.next_id;
        self.offsets.sort_unstable_by_key(|&(id, _)| id);

        // Each xref entry is exactly 20 bytes.
        let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        for &(_, offset) in &self.offsets {
            tail.push_str(&format!("{:010} 00000 n \n", offset));
        }
        tail.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, CATALOG_ID, xref_offset
        ));
        self.emit(tail.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_font(&mut self, id: u32, base_font: &str) -> io::Result<()> {
        self.begin_obj(id)?;
        self.emit(
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>\n",
                base_font
            )
            .as_bytes(),
        )?;
        self.end_obj()
    }

    fn write_image(&mut self, id: u32, qr: &QrBitmap) -> io::Result<()> {
        self.begin_obj(id)?;
        self.emit(
            format!(
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceGray /BitsPerComponent 1 /Length {} >>\nstream\n",
                qr.width,
                qr.height,
                qr.data.len()
            )
            .as_bytes(),
        )?;
        self.emit(&qr.data)?;
        self.emit(b"\nendstream\n")?;
        self.end_obj()
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn begin_obj(&mut self, id: u32) -> io::Result<()> {
        self.offsets.push((id, self.written));
        self.emit(format!("{} 0 obj\n", id).as_bytes())
    }

    fn end_obj(&mut self) -> io::Result<()> {
        self.emit(b"endobj\n")
    }

    fn emit(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}

/// Escape the characters PDF literal strings reserve.
fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
