use fastrand::Rng;

/// Opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS `rgb()` notation, as taken by a canvas fill style.
    pub fn css(self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl From<Rgb> for ratatui::style::Color {
    fn from(c: Rgb) -> Self {
        ratatui::style::Color::Rgb(c.r, c.g, c.b)
    }
}

/// Parse `#rrggbb` or `#rgb`, with or without the leading `#`.
pub fn parse_hex(input: &str) -> Option<Rgb> {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);

    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let digits: Vec<u8> = hex.bytes().map(hex_value).collect();

    match digits.as_slice() {
        &[r, g, b] => Some(Rgb::new(r * 17, g * 17, b * 17)),
        &[r1, r0, g1, g0, b1, b0] => Some(Rgb::new(
            r1 * 16 + r0,
            g1 * 16 + g0,
            b1 * 16 + b0,
        )),
        _ => None,
    }
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Ordered, never-empty list of colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// Invalid entries are dropped. An empty result falls back to white.
    pub fn from_hex_list<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut colors = Vec::with_capacity(entries.len());

        for entry in entries {
            match parse_hex(entry.as_ref()) {
                Some(color) => colors.push(color),
                None => tracing::debug!(entry = entry.as_ref(), "dropping invalid palette entry"),
            }
        }

        Self::from_colors(colors)
    }

    pub fn from_colors(colors: Vec<Rgb>) -> Self {
        if colors.is_empty() {
            tracing::debug!("palette is empty, falling back to white");
            return Self {
                colors: vec![Rgb::WHITE],
            };
        }

        Self { colors }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn pick(&self, rng: &mut Rng) -> Rgb {
        self.colors[rng.usize(..self.colors.len())]
    }
}
