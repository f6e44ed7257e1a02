//! Document library listing helpers

use crate::api::PdfInfo;

/// Human readable file size: bytes, then KB and MB with one decimal
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Secondary line of a library entry, e.g. `"12 pages · 1.4 MB"`
pub fn entry_details(pdf: &PdfInfo) -> String {
    format!(
        "{} pages · {}",
        pdf.page_count,
        format_file_size(pdf.file_size)
    )
}

/// One printable line per document, most recently opened first
pub fn listing(pdfs: &[PdfInfo]) -> Vec<String> {
    let mut sorted: Vec<&PdfInfo> = pdfs.iter().collect();
    sorted.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));

    sorted
        .into_iter()
        .map(|pdf| {
            let scanned = if pdf.is_scanned { " [scanned]" } else { "" };
            format!(
                "{:>4}  {}{}  ({})",
                pdf.id,
                pdf.original_filename,
                scanned,
                entry_details(pdf)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(id: i64, name: &str, last_accessed: &str) -> PdfInfo {
        PdfInfo {
            id,
            filename: format!("{id}.pdf"),
            original_filename: name.to_string(),
            page_count: 12,
            file_size: 1_468_006,
            is_scanned: false,
            upload_date: "2024-01-01T00:00:00".parse().unwrap(),
            last_accessed: last_accessed.parse().unwrap(),
        }
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_file_size(1_468_006), "1.4 MB");
    }

    #[test]
    fn listing_orders_by_last_access() {
        let pdfs = vec![
            pdf(1, "older.pdf", "2024-02-01T10:00:00"),
            pdf(2, "newer.pdf", "2024-03-01T10:00:00"),
        ];

        let lines = listing(&pdfs);
        assert!(lines[0].contains("newer.pdf"));
        assert!(lines[0].ends_with("(12 pages · 1.4 MB)"));
        assert!(lines[1].contains("older.pdf"));
    }
}
