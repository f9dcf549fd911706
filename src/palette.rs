//! Three-color palettes read from host markup.

use std::str::FromStr;

use glam::Vec3;

use crate::error::PaletteError;

/// An sRGB color with channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from a packed `0xRRGGBB` value.
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = PaletteError;

    /// Accepts `#rgb`, `#rrggbb`, `rgb()`/`rgba()` with 0-255 or percentage
    /// channels, `hsl()`/`hsla()`, and the CSS color keywords. Alpha is
    /// parsed but dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PaletteError::Empty);
        }

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| PaletteError::InvalidHex(s.to_string()));
        }

        let lower = s.to_ascii_lowercase();
        if lower.contains('(') {
            return parse_function(&lower).map_err(|kind| kind.with(s));
        }
        if lower.chars().all(|c| c.is_ascii_alphabetic()) {
            return named(&lower).ok_or_else(|| PaletteError::UnknownName(s.to_string()));
        }

        Err(PaletteError::Unsupported(s.to_string()))
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            // #abc expands to #aabbcc
            let v = u32::from_str_radix(hex, 16).ok()?;
            let (r, g, b) = ((v >> 8) & 0xf, (v >> 4) & 0xf, v & 0xf);
            Some(Color::from_hex(((r * 17) << 16) | ((g * 17) << 8) | (b * 17)))
        }
        6 => u32::from_str_radix(hex, 16).ok().map(Color::from_hex),
        _ => None,
    }
}

/// Which functional notation failed; the caller attaches the input.
enum FunctionError {
    Rgb,
    Hsl,
    Unsupported,
}

impl FunctionError {
    fn with(self, input: &str) -> PaletteError {
        let input = input.to_string();
        match self {
            FunctionError::Rgb => PaletteError::InvalidRgb(input),
            FunctionError::Hsl => PaletteError::InvalidHsl(input),
            FunctionError::Unsupported => PaletteError::Unsupported(input),
        }
    }
}

fn parse_function(lower: &str) -> Result<Color, FunctionError> {
    let (name, body) = lower
        .strip_suffix(')')
        .and_then(|rest| rest.split_once('('))
        .ok_or(FunctionError::Unsupported)?;
    let args: Vec<&str> = body.split(',').map(str::trim).collect();

    match name.trim() {
        "rgb" | "rgba" => parse_rgb(&args).ok_or(FunctionError::Rgb),
        "hsl" | "hsla" => parse_hsl(&args).ok_or(FunctionError::Hsl),
        _ => Err(FunctionError::Unsupported),
    }
}

/// Non-negative finite number.
fn number(v: &str) -> Option<f32> {
    v.parse::<f32>().ok().filter(|n| n.is_finite() && *n >= 0.0)
}

/// The three color arguments; an optional fourth (alpha) must still be a number.
fn color_args<'a>(args: &'a [&'a str]) -> Option<&'a [&'a str]> {
    match args.len() {
        3 => Some(args),
        4 => number(args[3]).map(|_| &args[..3]),
        _ => None,
    }
}

/// Channels are all plain (clamped to 255) or all percentages (clamped to 100%).
fn parse_rgb(args: &[&str]) -> Option<Color> {
    let channels = color_args(args)?;
    let percent = channels[0].ends_with('%');
    let mut rgb = [0.0f32; 3];
    for (out, arg) in rgb.iter_mut().zip(channels) {
        *out = match (percent, arg.strip_suffix('%')) {
            (true, Some(v)) => number(v)?.min(100.0) / 100.0,
            (false, None) => number(arg)?.min(255.0) / 255.0,
            _ => return None,
        };
    }
    Some(Color::new(rgb[0], rgb[1], rgb[2]))
}

/// `hsl(h, s%, l%)` with the hue in degrees, wrapping.
fn parse_hsl(args: &[&str]) -> Option<Color> {
    let &[h, s, l] = color_args(args)? else {
        return None;
    };
    let hue = h.parse::<f32>().ok().filter(|h| h.is_finite())?;
    let percent = |v: &str| v.strip_suffix('%').and_then(number).map(|p| p.min(100.0) / 100.0);
    Some(hsl_to_rgb(hue / 360.0, percent(s)?, percent(l)?))
}

/// `h` in turns, `s` and `l` in `[0, 1]`.
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Color {
    let h = h.rem_euclid(1.0) * 6.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Color::new(r + m, g + m, b + m)
}

fn named(name: &str) -> Option<Color> {
    NAMED_COLORS
        .binary_search_by_key(&name, |&(n, _)| n)
        .ok()
        .map(|i| Color::from_hex(NAMED_COLORS[i].1))
}

/// CSS color keywords, sorted by name.
const NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff),
    ("antiquewhite", 0xfaebd7),
    ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4),
    ("azure", 0xf0ffff),
    ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4),
    ("black", 0x000000),
    ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2),
    ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0),
    ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e),
    ("coral", 0xff7f50),
    ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc),
    ("crimson", 0xdc143c),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b),
    ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00),
    ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a),
    ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f),
    ("darkslategrey", 0x2f4f4f),
    ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3),
    ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222),
    ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff),
    ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700),
    ("goldenrod", 0xdaa520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xadff2f),
    ("grey", 0x808080),
    ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4),
    ("indianred", 0xcd5c5c),
    ("indigo", 0x4b0082),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa),
    ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd),
    ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff),
    ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a),
    ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6),
    ("magenta", 0xff00ff),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa),
    ("mediumblue", 0x0000cd),
    ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db),
    ("mediumseagreen", 0x3cb371),
    ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a),
    ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5),
    ("navajowhite", 0xffdead),
    ("navy", 0x000080),
    ("oldlace", 0xfdf5e6),
    ("olive", 0x808000),
    ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500),
    ("orangered", 0xff4500),
    ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa),
    ("palegreen", 0x98fb98),
    ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093),
    ("papayawhip", 0xffefd5),
    ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f),
    ("pink", 0xffc0cb),
    ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f),
    ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072),
    ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee),
    ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f),
    ("steelblue", 0x4682b4),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("thistle", 0xd8bfd8),
    ("tomato", 0xff6347),
    ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee),
    ("wheat", 0xf5deb3),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];

/// Exactly three colors, the only shape the shaders accept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette([Color; 3]);

impl Palette {
    pub const fn new(colors: [Color; 3]) -> Self {
        Self(colors)
    }

    /// Take the first three entries of `entries`.
    ///
    /// Falls back to `default` when fewer than three entries exist or any
    /// of the first three fails to parse; a partial palette is never used.
    pub fn from_entries<I, S>(entries: I, default: Palette) -> Palette
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed: Result<Vec<Color>, PaletteError> = entries
            .into_iter()
            .take(3)
            .map(|entry| entry.as_ref().parse())
            .collect();

        match parsed {
            Ok(colors) => match <[Color; 3]>::try_from(colors) {
                Ok(colors) => Palette(colors),
                Err(colors) => {
                    log::warn!("palette has {} colors, need 3; using default", colors.len());
                    default
                }
            },
            Err(err) => {
                log::warn!("{err}; using default palette");
                default
            }
        }
    }

    /// Parse a comma-separated attribute value such as `#f00,#0f0,#00f`.
    pub fn from_attribute(value: Option<&str>, default: Palette) -> Palette {
        match value {
            Some(value) => Palette::from_entries(value.split(','), default),
            None => default,
        }
    }

    pub fn colors(&self) -> &[Color; 3] {
        &self.0
    }

    /// Flattened `[r, g, b] x 3`, the layout a `vec3[3]` uniform expects.
    pub fn to_uniform_array(&self) -> [f32; 9] {
        let [a, b, c] = self.0;
        [a.r, a.g, a.b, b.r, b.g, b.b, c.r, c.g, c.b]
    }
}

pub const AURORA_DEFAULT: Palette = Palette([
    Color::from_hex(0x7146f2),
    Color::from_hex(0xff6eff),
    Color::from_hex(0x40ffe6),
]);

pub const PARTICLES_DEFAULT: Palette = Palette([
    Color::from_hex(0x303aff),
    Color::from_hex(0xc14fff),
    Color::from_hex(0x9e9065),
]);
