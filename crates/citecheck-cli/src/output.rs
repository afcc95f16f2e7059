use std::io::Write;

use citecheck_core::{Category, ParsedCitations, ProgressEvent, VerificationResult};
use citecheck_ingest::Report;
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn header(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "{}", title)?;
        writeln!(w, "{}", sep)?;
    }
    Ok(())
}

/// Print a real-time progress event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::Checking {
            category,
            index,
            total,
            title,
        } => {
            writeln!(
                w,
                "[{} {}/{}] Checking: \"{}\"",
                category,
                index + 1,
                total,
                truncate(title, 50)
            )?;
        }
        ProgressEvent::Result {
            index,
            total,
            result,
        } => {
            let idx = index + 1;
            let source = result.source.as_deref().unwrap_or("no provider");
            match (result.verified, color.enabled()) {
                (true, true) => writeln!(
                    w,
                    "[{}/{}] -> {} ({})",
                    idx,
                    total,
                    "GENUINE".green(),
                    source
                )?,
                (true, false) => writeln!(w, "[{}/{}] -> GENUINE ({})", idx, total, source)?,
                (false, true) => writeln!(
                    w,
                    "[{}/{}] -> {} ({})",
                    idx,
                    total,
                    "NOT CONFIRMED".yellow(),
                    source
                )?,
                (false, false) => {
                    writeln!(w, "[{}/{}] -> NOT CONFIRMED ({})", idx, total, source)?
                }
            }
        }
    }
    Ok(())
}

/// One conclusion block per category, entries numbered in document order.
pub fn print_conclusions(w: &mut dyn Write, report: &Report, color: ColorMode) -> std::io::Result<()> {
    print_conclusion_block(
        w,
        "Conclusion for research article references",
        &report.research,
        color,
    )?;
    writeln!(w)?;
    print_conclusion_block(w, "Conclusion for web article references", &report.web, color)?;
    Ok(())
}

fn print_conclusion_block(
    w: &mut dyn Write,
    title: &str,
    results: &[VerificationResult],
    color: ColorMode,
) -> std::io::Result<()> {
    header(w, title, color)?;
    if results.is_empty() {
        writeln!(w, "  (none)")?;
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let n = i + 1;
        if result.verified {
            let label = "genuine";
            if color.enabled() {
                writeln!(w, "{}. \"{}\" is {}", n, result.title, label.green())?;
            } else {
                writeln!(w, "{}. \"{}\" is {}", n, result.title, label)?;
            }
            if let Some(ref url) = result.url {
                writeln!(w, "   Link: {}", url)?;
            }
        } else {
            let label = "could not be confirmed";
            if color.enabled() {
                writeln!(w, "{}. \"{}\" {}", n, result.title, label.red())?;
            } else {
                writeln!(w, "{}. \"{}\" {}", n, result.title, label)?;
            }
            match result.url {
                Some(ref url) => {
                    let line = format!("   Nearest match: {}", url);
                    if color.enabled() {
                        writeln!(w, "{}", line.dimmed())?;
                    } else {
                        writeln!(w, "{}", line)?;
                    }
                }
                None => writeln!(w, "   No search provider responded")?,
            }
        }
        if let Some(ref source) = result.source {
            writeln!(w, "   Source: {}", source)?;
        }
    }
    Ok(())
}

/// Print the final counts.
pub fn print_summary(w: &mut dyn Write, report: &Report, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    header(w, "SUMMARY", color)?;

    for (label, results) in [("Research", &report.research), ("Web", &report.web)] {
        let genuine = results.iter().filter(|r| r.verified).count();
        let unreachable = results.iter().filter(|r| r.url.is_none()).count();
        writeln!(w, "  {} references: {}", label, results.len())?;
        if color.enabled() {
            writeln!(w, "    {} {}", "Genuine:".green(), genuine)?;
            writeln!(w, "    {} {}", "Not confirmed:".red(), results.len() - genuine)?;
        } else {
            writeln!(w, "    Genuine: {}", genuine)?;
            writeln!(w, "    Not confirmed: {}", results.len() - genuine)?;
        }
        if unreachable > 0 {
            let msg = format!("No provider response: {}", unreachable);
            if color.enabled() {
                writeln!(w, "    {}", msg.dimmed())?;
            } else {
                writeln!(w, "    {}", msg)?;
            }
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print parsed records without searching.
pub fn print_dry_run(
    w: &mut dyn Write,
    file_name: &str,
    parsed: &ParsedCitations,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} {} ({} citations parsed)\n",
            "DRY RUN:".bold().cyan(),
            file_name.bold(),
            parsed.len()
        )?;
    } else {
        writeln!(w, "DRY RUN: {} ({} citations parsed)\n", file_name, parsed.len())?;
    }

    for (i, c) in parsed.research.iter().enumerate() {
        print_record_header(w, Category::Research, i + 1, &c.raw_citation, color)?;
        writeln!(w, "    Title:     {}", c.title)?;
        writeln!(w, "    Author:    {}", c.author)?;
        writeln!(w, "    Year:      {}", c.year)?;
        writeln!(w, "    Publisher: {}", c.publisher)?;
        writeln!(w)?;
    }
    for (i, c) in parsed.web.iter().enumerate() {
        print_record_header(w, Category::Web, i + 1, &c.raw_citation, color)?;
        writeln!(w, "    Title:     {}", c.title)?;
        writeln!(w, "    Author:    {}", c.author.as_deref().unwrap_or("(none)"))?;
        writeln!(w, "    Year:      {}", c.year)?;
        writeln!(w, "    Publisher: {}", c.publisher)?;
        writeln!(w)?;
    }
    Ok(())
}

fn print_record_header(
    w: &mut dyn Write,
    category: Category,
    n: usize,
    raw: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    let tag = format!("[{} {}]", category, n);
    if color.enabled() {
        writeln!(w, "{} {}", tag.bold(), truncate(raw, 200).dimmed())
    } else {
        writeln!(w, "{} {}", tag, truncate(raw, 200))
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(report: &Report) -> String {
        let mut buf = Vec::new();
        print_conclusions(&mut buf, report, ColorMode(false)).unwrap();
        print_summary(&mut buf, report, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn conclusion_blocks_list_each_category() {
        let report = Report {
            research: vec![
                VerificationResult::verified(
                    "Deep learning",
                    Category::Research,
                    Some("https://dl/".into()),
                    "Google Scholar",
                ),
                VerificationResult::placeholder("Lost paper", Category::Research),
            ],
            web: vec![VerificationResult::unconfirmed(
                "The rise of WeChat",
                Category::Web,
                Some("https://near/".into()),
                "Bing",
            )],
        };
        let out = render(&report);
        assert!(out.contains("Conclusion for research article references"));
        assert!(out.contains("1. \"Deep learning\" is genuine"));
        assert!(out.contains("   Link: https://dl/"));
        assert!(out.contains("2. \"Lost paper\" could not be confirmed"));
        assert!(out.contains("No search provider responded"));
        assert!(out.contains("Conclusion for web article references"));
        assert!(out.contains("Nearest match: https://near/"));
        assert!(out.contains("    Genuine: 1"));
        assert!(out.contains("No provider response: 1"));
    }

    #[test]
    fn empty_category_is_marked() {
        let out = render(&Report::default());
        assert_eq!(out.matches("(none)").count(), 2);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("short", 10), "short");
    }
}
