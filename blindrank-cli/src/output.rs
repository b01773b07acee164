/// Output formatting: terminal tables, JSON, and CSV export.
use blindrank_core::{Progress, RankedGroup, RankedImage, Summary};
use serde::Serialize;

#[derive(Serialize)]
struct JsonRankedImage {
    rank: usize,
    name: String,
    group: String,
    rating: f64,
    matches: u32,
}

#[derive(Serialize)]
struct JsonRankedGroup {
    rank: usize,
    name: String,
    rating: f64,
    matches: u32,
}

/// Print image rankings as a formatted terminal table.
pub fn print_image_table(ranked: &[RankedImage]) {
    let name_width = ranked.iter().map(|r| r.name.len()).max().unwrap_or(5).max(5);
    let group_width = ranked.iter().map(|r| r.group.len()).max().unwrap_or(5).max(5);

    println!("  # | {:<name_width$} | {:<group_width$} |  Rating | Matches", "Image", "Group");
    println!("----|-{}-|-{}-|---------|--------", "-".repeat(name_width), "-".repeat(group_width));
    for (i, r) in ranked.iter().enumerate() {
        println!(
            "{:>3} | {:<name_width$} | {:<group_width$} | {:>7.1} | {:>7}",
            i + 1, r.name, r.group, r.rating, r.matches,
        );
    }
    println!("\n{} rated images", ranked.len());
}

/// Print group model rankings as a formatted terminal table.
pub fn print_group_table(ranked: &[RankedGroup]) {
    let name_width = ranked.iter().map(|r| r.name.len()).max().unwrap_or(5).max(5);

    println!("  # | {:<name_width$} |  Rating | Matches", "Group");
    println!("----|-{}-|---------|--------", "-".repeat(name_width));
    for (i, r) in ranked.iter().enumerate() {
        println!(
            "{:>3} | {:<name_width$} | {:>7.1} | {:>7}",
            i + 1, r.name, r.rating, r.matches,
        );
    }
    println!("\n{} group models", ranked.len());
}

pub fn print_image_json(ranked: &[RankedImage]) -> anyhow::Result<()> {
    let items: Vec<JsonRankedImage> = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| JsonRankedImage {
            rank: i + 1,
            name: r.name.clone(),
            group: r.group.clone(),
            rating: r.rating,
            matches: r.matches,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

pub fn print_group_json(ranked: &[RankedGroup]) -> anyhow::Result<()> {
    let items: Vec<JsonRankedGroup> = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| JsonRankedGroup {
            rank: i + 1,
            name: r.name.clone(),
            rating: r.rating,
            matches: r.matches,
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

pub fn print_progress(subset: &str, progress: &Progress) {
    println!("Subset {subset}:");
    println!("  images:          {}", progress.total_images);
    println!("  rated:           {}", progress.rated_images);
    println!("  minimal matches: {}", progress.minimal_matches);
}

pub fn print_summary(label: &str, summary: &Summary) {
    println!("{label}:");
    println!("  count:           {}", summary.count);
    println!("  average rating:  {:.1}", summary.average_rating);
    println!("  average matches: {:.1}", summary.average_matches);
}

/// CSV of image rankings: `image,group,rating,matches`.
pub fn image_csv(ranked: &[RankedImage]) -> String {
    let mut lines = vec!["image,group,rating,matches".to_string()];
    lines.extend(ranked.iter().map(|r| {
        format!(
            "{},{},{},{}",
            escape_csv(&r.name),
            escape_csv(&r.group),
            r.rating,
            r.matches,
        )
    }));
    lines.join("\n")
}

/// CSV of group rankings: `group,rating,matches`.
pub fn group_csv(ranked: &[RankedGroup]) -> String {
    let mut lines = vec!["group,rating,matches".to_string()];
    lines.extend(
        ranked
            .iter()
            .map(|r| format!("{},{},{}", escape_csv(&r.name), r.rating, r.matches)),
    );
    lines.join("\n")
}

/// Quote a CSV field when it contains a comma, quote, or newline.
fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
