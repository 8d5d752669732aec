//! Light and dark palettes plus the style maps derived from them.
//!
//! Every color shown by the dashboard is read from a `Palette`; style maps
//! use CSS property names in camelCase so the page can apply them directly.

use serde::Serialize;
use std::collections::BTreeMap;

/// CSS property name to value.
pub type StyleMap = BTreeMap<&'static str, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: &'static str,
    pub card: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub success: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub border: &'static str,
    pub hover: &'static str,
    pub table_header: &'static str,
    pub table_selected: &'static str,
}

pub const LIGHT: Palette = Palette {
    background: "#f8f9fa",
    card: "#ffffff",
    primary: "#2c3e50",
    secondary: "#3498db",
    accent: "#e74c3c",
    success: "#27ae60",
    text: "#2c3e50",
    text_secondary: "#6c757d",
    border: "#dee2e6",
    hover: "#f1f3f5",
    table_header: "#2c3e50",
    table_selected: "#3498db",
};

pub const DARK: Palette = Palette {
    background: "#1a1a1a",
    card: "#2d2d2d",
    primary: "#5dade2",
    secondary: "#2980b9",
    accent: "#e74c3c",
    success: "#2ecc71",
    text: "#ffffff",
    text_secondary: "#b0b0b0",
    border: "#404040",
    hover: "#3a3a3a",
    table_header: "#1e5a8e",
    table_selected: "#2874a6",
};

pub const LIGHT_MODE_LABEL: &str = "☀️ Light Mode";
pub const DARK_MODE_LABEL: &str = "🌙 Dark Mode";

pub fn palette(dark: bool) -> &'static Palette {
    if dark {
        &DARK
    } else {
        &LIGHT
    }
}

/// Row and cell styles for the record table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStyles {
    pub header: StyleMap,
    pub cell: StyleMap,
    pub odd_row: StyleMap,
    pub even_row: StyleMap,
    pub selected_row: StyleMap,
}

impl TableStyles {
    pub fn for_palette(palette: &Palette) -> Self {
        Self {
            header: style(&[
                ("backgroundColor", palette.table_header),
                ("color", "white"),
                ("fontWeight", "bold"),
            ]),
            cell: style(&[
                ("textAlign", "left"),
                ("padding", "12px"),
                ("fontSize", "13px"),
                ("backgroundColor", palette.card),
                ("color", palette.text),
            ]),
            odd_row: style(&[("backgroundColor", palette.hover), ("color", palette.text)]),
            even_row: style(&[("backgroundColor", palette.card), ("color", palette.text)]),
            selected_row: style(&[
                ("backgroundColor", palette.table_selected),
                ("color", "white"),
            ]),
        }
    }
}

/// Styles for every themed page surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeStyles {
    pub dark: bool,
    /// Label of the toggle names the mode it switches to.
    pub toggle_label: &'static str,
    pub toggle: StyleMap,
    pub main_container: StyleMap,
    pub header: StyleMap,
    pub filters: StyleMap,
    pub table_section: StyleMap,
    pub map_container: StyleMap,
    pub dropdown: StyleMap,
    pub modal_content: StyleMap,
    pub table: TableStyles,
    pub palette: Palette,
}

impl ThemeStyles {
    pub fn for_theme(dark: bool) -> Self {
        let palette = palette(dark);
        let card = card_style(palette);
        let mut header = card.clone();
        header.insert("padding", "30px".to_string());

        Self {
            dark,
            toggle_label: if dark { LIGHT_MODE_LABEL } else { DARK_MODE_LABEL },
            toggle: style(&[
                ("padding", "10px 20px"),
                ("fontSize", "16px"),
                ("border", "none"),
                ("borderRadius", "25px"),
                ("cursor", "pointer"),
                ("fontWeight", "bold"),
                ("boxShadow", "0 2px 4px rgba(0,0,0,0.2)"),
                ("transition", "all 0.3s"),
                ("backgroundColor", palette.accent),
                ("color", "white"),
            ]),
            main_container: style(&[
                ("backgroundColor", palette.background),
                ("minHeight", "100vh"),
                ("padding", "20px"),
                ("color", palette.text),
                ("transition", "all 0.3s"),
            ]),
            header,
            filters: card.clone(),
            table_section: card.clone(),
            map_container: card,
            dropdown: style(&[
                ("backgroundColor", palette.background),
                ("color", palette.text),
            ]),
            modal_content: style(&[
                ("backgroundColor", palette.card),
                ("padding", "30px"),
                ("borderRadius", "10px"),
                ("maxWidth", "600px"),
                ("maxHeight", "80vh"),
                ("overflowY", "auto"),
                ("width", "90%"),
                ("color", palette.text),
                ("boxShadow", "0 4px 20px rgba(0,0,0,0.3)"),
            ]),
            table: TableStyles::for_palette(palette),
            palette: *palette,
        }
    }
}

/// Style of one text input inside the edit form.
pub fn input_style(palette: &Palette) -> StyleMap {
    style(&[
        ("width", "100%"),
        ("padding", "8px"),
        ("borderRadius", "5px"),
        ("border", &format!("1px solid {}", palette.border)),
        ("backgroundColor", palette.background),
        ("color", palette.text),
    ])
}

fn card_style(palette: &Palette) -> StyleMap {
    style(&[
        ("backgroundColor", palette.card),
        ("padding", "20px"),
        ("marginBottom", "20px"),
        ("borderRadius", "10px"),
        ("boxShadow", "0 2px 8px rgba(0,0,0,0.1)"),
        ("color", palette.text),
    ])
}

fn style(pairs: &[(&'static str, &str)]) -> StyleMap {
    pairs
        .iter()
        .map(|(property, value)| (*property, (*value).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{input_style, palette, ThemeStyles, DARK, DARK_MODE_LABEL, LIGHT, LIGHT_MODE_LABEL};

    #[test]
    fn palette_lookup_follows_dark_flag() {
        assert_eq!(palette(false), &LIGHT);
        assert_eq!(palette(true), &DARK);
    }

    #[test]
    fn toggle_label_names_the_other_mode() {
        assert_eq!(ThemeStyles::for_theme(false).toggle_label, DARK_MODE_LABEL);
        assert_eq!(ThemeStyles::for_theme(true).toggle_label, LIGHT_MODE_LABEL);
    }

    #[test]
    fn surfaces_take_colors_from_palette() {
        let styles = ThemeStyles::for_theme(true);
        assert_eq!(styles.main_container["backgroundColor"], DARK.background);
        assert_eq!(styles.filters["backgroundColor"], DARK.card);
        assert_eq!(styles.header["padding"], "30px");
        assert_eq!(styles.table.header["backgroundColor"], DARK.table_header);
        assert_eq!(styles.table.selected_row["backgroundColor"], DARK.table_selected);
        assert_eq!(input_style(&DARK)["border"], "1px solid #404040");
    }
}
