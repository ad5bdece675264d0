use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb,
};
use qrcode::{EcLevel, QrCode};

use super::{verification_url, CertificateDocument, CertificateError};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 12.7;
const QR_SIZE: f32 = 22.0;

// Helvetica averages roughly half an em per glyph; close enough to centre short lines.
const AVERAGE_GLYPH_EM: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;

fn primary() -> Color {
    Color::Rgb(Rgb::new(0.05, 0.28, 0.55, None))
}

fn secondary() -> Color {
    Color::Rgb(Rgb::new(0.85, 0.65, 0.13, None))
}

fn success() -> Color {
    Color::Rgb(Rgb::new(0.09, 0.50, 0.24, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn grey() -> Color {
    Color::Rgb(Rgb::new(0.45, 0.45, 0.45, None))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn centered(
    layer: &PdfLayerReference,
    text: &str,
    size: f32,
    center_x: f32,
    y: f32,
    font: &IndirectFontRef,
) {
    let width = text.chars().count() as f32 * size * AVERAGE_GLYPH_EM * PT_TO_MM;
    let x = (center_x - width / 2.0).max(MARGIN);
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

fn draw_border(layer: &PdfLayerReference) {
    layer.set_outline_color(primary());
    layer.set_outline_thickness(3.0);
    layer.add_rect(
        Rect::new(Mm(MARGIN), Mm(MARGIN), Mm(PAGE_WIDTH - MARGIN), Mm(PAGE_HEIGHT - MARGIN))
            .with_mode(PaintMode::Stroke),
    );

    let inner = MARGIN + 2.5;
    layer.set_outline_color(secondary());
    layer.set_outline_thickness(1.0);
    layer.add_rect(
        Rect::new(Mm(inner), Mm(inner), Mm(PAGE_WIDTH - inner), Mm(PAGE_HEIGHT - inner))
            .with_mode(PaintMode::Stroke),
    );
}

/// Dark modules of the QR code as (column, row) pairs, row 0 at the top.
fn qr_modules(data: &str) -> Result<(usize, Vec<(usize, usize)>), CertificateError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| CertificateError::QrCode(e.to_string()))?;
    let width = code.width();
    let dark = code
        .to_colors()
        .into_iter()
        .enumerate()
        .filter(|(_, color)| *color == qrcode::Color::Dark)
        .map(|(i, _)| (i % width, i / width))
        .collect();
    Ok((width, dark))
}

fn draw_qr(layer: &PdfLayerReference, data: &str, x: f32, y: f32) -> Result<(), CertificateError> {
    let (width, dark) = qr_modules(data)?;
    let module = QR_SIZE / width as f32;
    layer.set_fill_color(black());
    for (col, row) in dark {
        let left = x + col as f32 * module;
        let top = y + QR_SIZE - row as f32 * module;
        layer.add_rect(
            Rect::new(Mm(left), Mm(top - module), Mm(left + module), Mm(top))
                .with_mode(PaintMode::Fill),
        );
    }
    Ok(())
}

fn draw_body(layer: &PdfLayerReference, fonts: &Fonts, doc: &CertificateDocument) {
    let center = PAGE_WIDTH / 2.0;

    layer.set_fill_color(primary());
    centered(layer, "SERTIFIKAT", 32.0, center, PAGE_HEIGHT - 38.0, &fonts.bold);

    layer.set_fill_color(black());
    centered(
        layer,
        "COOPERATIVE EDUCATION PROGRAM",
        16.0,
        center,
        PAGE_HEIGHT - 48.0,
        &fonts.regular,
    );
    centered(layer, "Diberikan kepada:", 12.0, center, PAGE_HEIGHT - 58.0, &fonts.regular);

    layer.set_fill_color(primary());
    centered(layer, &doc.student_name, 24.0, center, PAGE_HEIGHT - 74.0, &fonts.bold);

    layer.set_fill_color(black());
    centered(
        layer,
        &format!("NIM: {}", doc.student_number),
        12.0,
        center,
        PAGE_HEIGHT - 84.0,
        &fonts.regular,
    );
    centered(layer, &doc.study_program, 12.0, center, PAGE_HEIGHT - 91.0, &fonts.regular);

    let y = PAGE_HEIGHT - 107.0;
    centered(
        layer,
        "Telah menyelesaikan program Cooperative Education (Coop)",
        11.0,
        center,
        y,
        &fonts.regular,
    );
    centered(layer, &format!("di {}", doc.company_name), 11.0, center, y - 7.5, &fonts.regular);
    centered(layer, &format!("Periode: {}", doc.period), 11.0, center, y - 15.0, &fonts.regular);
    centered(layer, &format!("Posisi: {}", doc.position), 11.0, center, y - 22.5, &fonts.regular);

    layer.set_fill_color(success());
    centered(layer, &format!("Nilai Akhir: {}", doc.grade), 14.0, center, y - 35.0, &fonts.bold);

    // Date on the left, coordinator signature on the right.
    let signature_y = 30.0;
    let left = PAGE_WIDTH / 4.0;
    let right = 3.0 * PAGE_WIDTH / 4.0;
    layer.set_fill_color(black());
    centered(layer, &doc.graduation_date, 10.0, left, signature_y + 18.0, &fonts.regular);
    layer.set_outline_color(black());
    layer.set_outline_thickness(0.8);
    for x in [left, right] {
        layer.add_rect(
            Rect::new(Mm(x - 30.0), Mm(signature_y), Mm(x + 30.0), Mm(signature_y + 0.3))
                .with_mode(PaintMode::Fill),
        );
    }
    centered(layer, "Tanggal", 10.0, left, signature_y - 5.0, &fonts.bold);
    centered(layer, "Koordinator Program Coop", 10.0, right, signature_y - 5.0, &fonts.bold);

    layer.set_fill_color(grey());
    centered(
        layer,
        &format!("Nomor Sertifikat: {}", doc.number),
        7.0,
        center,
        10.0,
        &fonts.regular,
    );
}

/// Renders the certificate and returns the PDF bytes.
pub fn render_pdf(
    doc: &CertificateDocument,
    verification_base: &str,
) -> Result<Vec<u8>, CertificateError> {
    let pdf_err = |e: printpdf::Error| CertificateError::Pdf(e.to_string());

    let (pdf, page, layer) = PdfDocument::new(
        format!("Sertifikat {}", doc.number),
        Mm(PAGE_WIDTH),
        Mm(PAGE_HEIGHT),
        "Certificate",
    );
    let layer = pdf.get_page(page).get_layer(layer);
    let fonts = Fonts {
        regular: pdf.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?,
        bold: pdf.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?,
    };

    draw_border(&layer);
    draw_body(&layer, &fonts, doc);

    let qr_x = PAGE_WIDTH - 38.0;
    let qr_y = 20.0;
    draw_qr(&layer, &verification_url(verification_base, &doc.number), qr_x, qr_y)?;
    layer.set_fill_color(black());
    centered(
        &layer,
        "Scan untuk verifikasi",
        8.0,
        qr_x + QR_SIZE / 2.0,
        qr_y - 5.0,
        &fonts.regular,
    );

    pdf.save_to_bytes().map_err(pdf_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> CertificateDocument {
        CertificateDocument {
            number: "COOP/2026/0001/UTS".into(),
            student_name: "Sari Wulandari".into(),
            student_number: "2210511".into(),
            study_program: "Informatika".into(),
            company_name: "PT Nusantara Data".into(),
            position: "Backend Intern".into(),
            period: "2026-02-01 - 2026-07-31".into(),
            grade: "A (Sangat Baik)".into(),
            graduation_date: "2026-08-03".into(),
        }
    }

    #[test]
    fn renders_a_pdf_document() {
        let bytes = render_pdf(&document(), "https://coop.univ.test/verify").unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn qr_code_is_square_and_has_dark_modules() {
        let (width, dark) =
            qr_modules("https://coop.univ.test/verify/COOP/2026/0001/UTS/").unwrap();
        assert!(width >= 21);
        assert!(!dark.is_empty());
        assert!(dark.iter().all(|(c, r)| *c < width && *r < width));
        // Finder pattern corner is always dark.
        assert!(dark.contains(&(0, 0)));
    }
}
