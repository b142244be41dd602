// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Value formatting for terminal output

const ROW: usize = 16;

/// How a value will be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<'a> {
    Text(&'a str),
    Dump(String),
}

/// Values that are valid UTF-8 without NUL bytes print as text; everything
/// else, or everything when `force_hex` is set, as a hex dump.
pub fn render(value: &[u8], force_hex: bool) -> Rendered<'_> {
    if !force_hex {
        if let Ok(text) = std::str::from_utf8(value) {
            if !text.contains('\0') {
                return Rendered::Text(text);
            }
        }
    }
    Rendered::Dump(hex_dump(value))
}

fn gutter_char(byte: u8) -> char {
    if byte == b' ' || byte.is_ascii_graphic() {
        byte as char
    } else {
        '.'
    }
}

/// One line per 16 bytes: offset, hex bytes padded to the full row width, and
/// the printable ASCII gutter.
pub fn hex_dump(value: &[u8]) -> String {
    let mut dump = String::new();
    for (row, chunk) in value.chunks(ROW).enumerate() {
        let hex = chunk
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let gutter: String = chunk.iter().copied().map(gutter_char).collect();
        dump.push_str(&format!(
            "{:04X}   {:<width$}   {}\n",
            row * ROW,
            hex,
            gutter,
            width = ROW * 3
        ));
    }
    dump
}
