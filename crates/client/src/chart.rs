use spacexp_common::humanize::humanize_file_size;
use spacexp_common::stats::LargestFile;

const BAR_WIDTH: usize = 40;
const NAME_WIDTH: usize = 32;

/// Horizontal bar chart of file sizes, scaled to the largest entry.
pub fn size_chart(files: &[LargestFile]) -> String {
    let max = files.iter().map(|f| f.file_size).max().unwrap_or(0);
    let mut out = String::new();
    for f in files {
        let len = if max == 0 {
            0
        } else {
            ((f.file_size as f64 / max as f64) * BAR_WIDTH as f64).round() as usize
        };
        // Non-empty files always get at least one block.
        let len = if f.file_size > 0 { len.max(1) } else { 0 };
        out.push_str(&format!(
            "{:<width$} {:<bar$} {}\n",
            truncate(&f.file_name, NAME_WIDTH),
            "█".repeat(len),
            humanize_file_size(f.file_size),
            width = NAME_WIDTH,
            bar = BAR_WIDTH,
        ));
    }
    out
}

fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let head: String = name.chars().take(max - 1).collect();
    format!("{head}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64) -> LargestFile {
        LargestFile { file_name: name.into(), file_size: size }
    }

    #[test]
    fn test_bars_scale_to_largest() {
        let chart = size_chart(&[file("big.iso", 4096), file("half.bin", 2048), file("tiny", 1)]);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].matches('█').count(), BAR_WIDTH);
        assert_eq!(lines[1].matches('█').count(), BAR_WIDTH / 2);
        assert_eq!(lines[2].matches('█').count(), 1);
        assert!(lines[0].ends_with("4.00 KB"));
    }

    #[test]
    fn test_empty_and_zero_sizes() {
        assert_eq!(size_chart(&[]), "");
        assert_eq!(size_chart(&[file("empty", 0)]).matches('█').count(), 0);
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = "x".repeat(50);
        let t = truncate(&long, NAME_WIDTH);
        assert_eq!(t.chars().count(), NAME_WIDTH);
        assert!(t.ends_with('…'));
    }
}
