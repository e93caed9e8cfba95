use crate::models::{ColorInfo, SignalBundle};
use anyhow::{Context, Result};
use colored::*;
use std::fs::File;
use std::io::Write;

pub struct Reporter;

impl Reporter {
    pub fn print_text_report(bundle: &SignalBundle) {
        print!("{}", Self::render_text_report(bundle));
    }

    /// Human-readable rendering of a bundle; colors follow the terminal's
    /// `colored` settings.
    pub fn render_text_report(bundle: &SignalBundle) -> String {
        let mut out = String::new();
        let rule = "=".repeat(80).bright_blue().to_string();

        out.push_str(&format!("\n{}\n", rule));
        out.push_str(&format!("{}\n", "Brandscout - Brand Signals".bright_cyan().bold()));
        out.push_str(&format!("{}\n\n", rule));

        out.push_str(&format!("{}: {}\n", "Seed URL".bright_white().bold(), bundle.seed_url));
        out.push_str(&format!(
            "{}: {}\n",
            "Generated".bright_white().bold(),
            bundle.generated_at
        ));
        if let Some(name) = &bundle.brand_name_hint {
            out.push_str(&format!("{}: {}\n", "Brand".bright_white().bold(), name.bright_green()));
        }
        out.push('\n');

        if bundle.degraded {
            out.push_str(&format!(
                "{}\n\n",
                "No usable pages could be fetched; signals are empty.".bright_red()
            ));
        }

        out.push_str(&format!("{}\n", "Pages".bright_yellow().bold().underline()));
        for summary in &bundle.page_summaries {
            out.push_str(&format!(
                "  [{:<8}] {}\n",
                summary.page_type.as_str().bright_cyan(),
                summary.url
            ));
            if !summary.title.is_empty() {
                out.push_str(&format!("             {}\n", summary.title.bright_white()));
            }
        }
        out.push_str(&format!(
            "  Visited: {}  Unvisited: {}\n\n",
            bundle.visited_urls.len().to_string().bright_green(),
            bundle.unvisited_urls.len()
        ));

        out.push_str(&format!("{}\n", "Palette".bright_yellow().bold().underline()));
        let palette = &bundle.palette;
        for (role, color) in [
            ("Background", &palette.background),
            ("Primary", &palette.primary),
            ("Secondary", &palette.secondary),
            ("Support 1", &palette.support_1),
            ("Support 2", &palette.support_2),
            ("Support 3", &palette.support_3),
            ("Positive", &palette.positive),
        ] {
            out.push_str(&format!("  {:<11} {}\n", role, describe_color(color.as_ref())));
        }
        out.push_str(&format!(
            "  Candidates: {}\n\n",
            bundle
                .colors
                .iter()
                .map(|c| format!("{} (p{})", c.hex, c.priority))
                .collect::<Vec<_>>()
                .join(", ")
        ));

        out.push_str(&format!("{}\n", "Typography".bright_yellow().bold().underline()));
        let typography = &bundle.typography;
        out.push_str(&format!(
            "  Primary:   {}\n",
            typography.primary_font.as_deref().unwrap_or("N/A")
        ));
        out.push_str(&format!(
            "  Secondary: {}\n",
            typography.secondary_font.as_deref().unwrap_or("N/A")
        ));
        out.push_str(&format!(
            "  Families:  {}\n\n",
            typography.font_families.join(", ")
        ));

        out.push_str(&format!(
            "{}: {} chars, {} images\n",
            "Content".bright_yellow().bold(),
            bundle.combined_text.chars().count(),
            bundle.image_urls.len()
        ));
        out.push_str(&format!("\n{}\n", rule));
        out
    }

    pub fn save_json_report(bundle: &SignalBundle, filename: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(bundle)?;
        let mut file = File::create(filename)
            .with_context(|| format!("Failed to create report file: {}", filename))?;
        file.write_all(json.as_bytes())?;
        eprintln!("Report saved to: {}", filename.bright_green());
        Ok(())
    }
}

fn describe_color(color: Option<&ColorInfo>) -> String {
    match color {
        Some(c) => format!("{} ({})", c.hex.bright_white(), c.name),
        None => "N/A".dimmed().to_string(),
    }
}
