//! Server-rendered pages.  Every interpolated value goes through
//! [`escape`].

use std::fmt::Write;

use spacexp_common::humanize::humanize_file_size;
use spacexp_common::stats::StatisticsReport;

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{} · SpacExp</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape(title)
    )
}

pub fn index_page(total_size: u64, total_files: u64, last_index: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<h1>SpacExp</h1>\n");
    let _ = writeln!(
        body,
        "<p>Indexed: <strong>{}</strong> files, <strong>{}</strong> in total.</p>",
        total_files,
        escape(&humanize_file_size(total_size))
    );
    if let Some(age) = last_index {
        let _ = writeln!(body, "<p>Last indexed {}.</p>", escape(age));
    }
    body.push_str(
        "<h2>Scan a folder</h2>\n\
         <form method=\"post\" action=\"/api/process-files\">\n\
         <input type=\"text\" name=\"folder_path\" placeholder=\"/path/to/folder\" size=\"60\">\n\
         <button type=\"submit\">Scan</button>\n\
         </form>\n\
         <h2>Upload files</h2>\n\
         <form method=\"post\" action=\"/api/upload\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"files\" multiple>\n\
         <button type=\"submit\">Upload and scan</button>\n\
         </form>\n\
         <p><a href=\"/api/statistics-page\">Statistics</a></p>\n",
    );
    layout("Home", &body)
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        "<h1>Error</h1>\n<p class=\"error\">{}</p>\n<p><a href=\"/\">Back</a></p>",
        escape(message)
    );
    layout("Error", &body)
}

pub fn statistics_page(report: &StatisticsReport) -> String {
    let mut body = String::new();
    body.push_str("<h1>Statistics</h1>\n");
    let _ = writeln!(
        body,
        "<p>Total size: <strong>{}</strong> in {} files.</p>",
        escape(&humanize_file_size(report.summary.total_size)),
        report.summary.total_files
    );

    table(
        &mut body,
        "Files by extension",
        &["Extension", "Count"],
        report
            .file_statistics
            .iter()
            .map(|e| vec![e.extension.clone(), e.count.to_string()]),
    );
    table(
        &mut body,
        "Largest files",
        &["File", "Size"],
        report
            .largest_files
            .iter()
            .map(|f| vec![f.file_name.clone(), humanize_file_size(f.file_size)]),
    );
    table(
        &mut body,
        "Largest images",
        &["File", "Width", "Height", "Area"],
        report.largest_images.iter().map(|i| {
            vec![
                i.file_name.clone(),
                i.width.to_string(),
                i.height.to_string(),
                i.calculated_area.to_string(),
            ]
        }),
    );
    table(
        &mut body,
        "Documents by page count",
        &["File", "Pages"],
        report
            .largest_documents
            .iter()
            .map(|d| vec![d.file_name.clone(), d.page_count.to_string()]),
    );
    body.push_str("<p><a href=\"/\">Back</a></p>\n");
    layout("Statistics", &body)
}

fn table(out: &mut String, title: &str, header: &[&str], rows: impl Iterator<Item = Vec<String>>) {
    let _ = writeln!(out, "<h2>{}</h2>", escape(title));
    let mut rows = rows.peekable();
    if rows.peek().is_none() {
        out.push_str("<p>No data.</p>\n");
        return;
    }
    out.push_str("<table>\n<tr>");
    for h in header {
        let _ = write!(out, "<th>{}</th>", escape(h));
    }
    out.push_str("</tr>\n");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", escape(&cell));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}
