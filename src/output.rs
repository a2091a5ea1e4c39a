use crate::status::DeadlineStatus;

pub struct Styler {
    color_enabled: bool,
}

impl Styler {
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    fn wrap(&self, code: &str, s: &str) -> String {
        if !self.color_enabled {
            return s.to_string();
        }
        format!("{}{}\u{001b}[0m", code, s)
    }

    pub fn green(&self, s: &str) -> String {
        self.wrap("\u{001b}[32m", s)
    }

    pub fn yellow(&self, s: &str) -> String {
        self.wrap("\u{001b}[33m", s)
    }

    pub fn red(&self, s: &str) -> String {
        self.wrap("\u{001b}[31m", s)
    }

    pub fn gray(&self, s: &str) -> String {
        self.wrap("\u{001b}[90m", s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.wrap("\u{001b}[1m", s)
    }

    /// Colors a deadline cell by urgency: green ok, yellow warning, red expired.
    pub fn deadline(&self, status: DeadlineStatus, s: &str) -> String {
        match status {
            DeadlineStatus::Ok => self.green(s),
            DeadlineStatus::Warning => self.yellow(s),
            DeadlineStatus::Expired => self.red(s),
        }
    }
}

/// Columns a string occupies in a terminal, ignoring ANSI escapes.
/// Wide CJK/emoji characters count as two.
pub fn display_width(s: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
            continue;
        }
        if c == '\u{001b}' {
            in_escape = true;
            continue;
        }
        width += if is_wide_char(c) { 2 } else { 1 };
    }
    width
}

fn is_wide_char(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFF60
        | 0x1F300..=0x1F64F
        | 0x1F680..=0x1F6FF
        | 0x1F900..=0x1F9FF
        | 0x20000..=0x2FFFD)
}

fn pad_right(s: &str, width: usize) -> String {
    let dw = display_width(s);
    if dw >= width {
        return s.to_string();
    }
    format!("{}{}", s, " ".repeat(width - dw))
}

pub fn render_simple_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();

    for row in rows.iter() {
        for (i, cell) in row.iter().enumerate() {
            let w = display_width(cell);
            match widths.get_mut(i) {
                Some(cur) => *cur = (*cur).max(w),
                None => widths.push(w),
            }
        }
    }

    let render_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| pad_right(c, widths[i]))
            .collect::<Vec<String>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers.to_vec())];
    for row in rows.iter() {
        lines.push(render_row(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}
