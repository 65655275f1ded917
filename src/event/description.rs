const BULLET_MARKERS: [&str; 5] = ["- ", "* ", "\u{2022} ", "\u{2013} ", "\u{2014} "];

/// Converts a plain-text spreadsheet description into the minimal HTML the platform renders.
///
/// Blank lines separate paragraphs, single line breaks become `<br/>`, and a
/// paragraph made only of bullet lines becomes a `<ul>`.
pub fn format_description_as_html(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.trim().lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(line.trim_end());
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
        .iter()
        .map(|paragraph| {
            let bullets: Option<Vec<&str>> = paragraph.iter().map(|line| bullet_text(line)).collect();

            match bullets {
                Some(items) => format!(
                    "<ul>{}</ul>",
                    items
                        .iter()
                        .map(|item| format!("<li>{}</li>", escape_html(item)))
                        .collect::<String>()
                ),
                None => format!(
                    "<p>{}</p>",
                    paragraph
                        .iter()
                        .map(|line| escape_html(line.trim()))
                        .collect::<Vec<String>>()
                        .join("<br/>")
                ),
            }
        })
        .collect()
}

fn bullet_text(line: &str) -> Option<&str> {
    let stripped = line.trim_start();

    BULLET_MARKERS
        .iter()
        .find_map(|marker| stripped.strip_prefix(*marker))
        .map(str::trim)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }

    escaped
}
