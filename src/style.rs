use kuchiki::NodeRef;
use lightningcss::declaration::DeclarationBlock;
use lightningcss::properties::Property;
use lightningcss::properties::custom::{Token, TokenOrValue};
use lightningcss::properties::display::{Display, DisplayKeyword};
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleAttribute, StyleSheet};
use lightningcss::traits::ToCss;
use lightningcss::values::length::{LengthPercentage, LengthPercentageOrAuto, LengthValue};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Px,
    In,
    Mm,
    Cm,
    Pt,
    Unitless,
}

impl LengthUnit {
    fn parse(raw: &str) -> Option<LengthUnit> {
        match raw.to_ascii_lowercase().as_str() {
            "px" => Some(LengthUnit::Px),
            "in" => Some(LengthUnit::In),
            "mm" => Some(LengthUnit::Mm),
            "cm" => Some(LengthUnit::Cm),
            "pt" => Some(LengthUnit::Pt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssLength {
    pub value: f32,
    pub unit: LengthUnit,
}

impl CssLength {
    pub fn new(value: f32, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub fn px(value: f32) -> Self {
        Self::new(value, LengthUnit::Px)
    }

    /// `unitless` decides how a bare number is read; `--page-margin-in: 0.25`
    /// means inches while `--header-h: 75` means pixels.
    pub fn to_px(self, ppi: f32, unitless: LengthUnit) -> Option<f32> {
        if !self.value.is_finite() {
            return None;
        }
        let unit = match self.unit {
            LengthUnit::Unitless => unitless,
            unit => unit,
        };
        let px = match unit {
            LengthUnit::Px | LengthUnit::Unitless => self.value,
            LengthUnit::In => self.value * ppi,
            LengthUnit::Mm => self.value * ppi / 25.4,
            LengthUnit::Cm => self.value * ppi / 2.54,
            LengthUnit::Pt => self.value * ppi / 72.0,
        };
        Some(px)
    }

    pub fn to_inches(self, ppi: f32, unitless: LengthUnit) -> Option<f32> {
        if ppi <= 0.0 {
            return None;
        }
        self.to_px(ppi, unitless).map(|px| px / ppi)
    }
}

/// Custom properties declared for the document root, keyed without the leading `--`.
#[derive(Debug, Clone, Default)]
pub struct RootVars {
    lengths: HashMap<String, CssLength>,
}

impl RootVars {
    /// `:root` rules of every `<style>` (plus `@media print`), then the root
    /// element's inline style, which wins.
    pub fn from_document(document: &NodeRef) -> Self {
        let mut vars = RootVars::default();
        if let Ok(styles) = document.select("style") {
            for style in styles {
                let css = style.as_node().text_contents();
                vars.absorb_stylesheet(&css);
            }
        }
        if let Ok(root) = document.select_first("html") {
            let inline = root.attributes.borrow().get("style").map(str::to_string);
            if let Some(inline) = inline {
                vars.absorb_inline(&inline);
            }
        }
        vars
    }

    pub fn length(&self, name: &str) -> Option<CssLength> {
        self.lengths.get(&normalize_name(name)).copied()
    }

    pub fn absorb_stylesheet(&mut self, css: &str) {
        if css.trim().is_empty() {
            return;
        }
        let Ok(sheet) = StyleSheet::parse(css, ParserOptions::default()) else {
            return;
        };
        self.absorb_rules(&sheet.rules);
    }

    pub fn absorb_inline(&mut self, style: &str) {
        let Ok(attr) = StyleAttribute::parse(style, ParserOptions::default()) else {
            return;
        };
        self.absorb_declarations(&attr.declarations);
    }

    fn absorb_rules(&mut self, rules: &CssRuleList) {
        for rule in &rules.0 {
            match rule {
                CssRule::Style(style) => {
                    let selectors = style
                        .selectors
                        .to_css_string(PrinterOptions::default())
                        .unwrap_or_default();
                    let targets_root = selectors
                        .split(',')
                        .any(|selector| selector.trim().eq_ignore_ascii_case(":root"));
                    if targets_root {
                        self.absorb_declarations(&style.declarations);
                    }
                }
                CssRule::Media(media) => {
                    let query = media
                        .query
                        .to_css_string(PrinterOptions::default())
                        .unwrap_or_default()
                        .to_ascii_lowercase();
                    if query.contains("print") || query.contains("all") {
                        self.absorb_rules(&media.rules);
                    }
                }
                _ => {}
            }
        }
    }

    fn absorb_declarations(&mut self, declarations: &DeclarationBlock) {
        for prop in declarations
            .declarations
            .iter()
            .chain(declarations.important_declarations.iter())
        {
            let Property::Custom(custom) = prop else {
                continue;
            };
            let name = normalize_name(custom.name.as_ref());
            match tokens_to_length(&custom.value.0) {
                Some(length) => {
                    self.lengths.insert(name, length);
                }
                None => {
                    // calc()/var() values cannot be resolved here; treat as absent.
                    self.lengths.remove(&name);
                }
            }
        }
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches('-').to_ascii_lowercase()
}

fn tokens_to_length(tokens: &[TokenOrValue]) -> Option<CssLength> {
    let mut found = None;
    for token in tokens {
        let length = match token {
            TokenOrValue::Token(Token::WhiteSpace(_)) => continue,
            TokenOrValue::Length(length) => length_value(length)?,
            TokenOrValue::Token(Token::Dimension { value, unit, .. }) => {
                CssLength::new(*value, LengthUnit::parse(unit.as_ref())?)
            }
            TokenOrValue::Token(Token::Number { value, .. }) => {
                CssLength::new(*value, LengthUnit::Unitless)
            }
            _ => return None,
        };
        if found.is_some() {
            return None;
        }
        found = Some(length);
    }
    found
}

fn length_value(length: &LengthValue) -> Option<CssLength> {
    match length {
        LengthValue::Px(v) => Some(CssLength::new(*v, LengthUnit::Px)),
        LengthValue::In(v) => Some(CssLength::new(*v, LengthUnit::In)),
        LengthValue::Mm(v) => Some(CssLength::new(*v, LengthUnit::Mm)),
        LengthValue::Cm(v) => Some(CssLength::new(*v, LengthUnit::Cm)),
        LengthValue::Pt(v) => Some(CssLength::new(*v, LengthUnit::Pt)),
        _ => length.to_px().map(CssLength::px),
    }
}

/// Box properties read from an element's inline `style`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InlineBox {
    pub height: Option<f32>,
    pub margin_bottom: Option<f32>,
    pub hidden: bool,
}

pub fn inline_box(style: Option<&str>) -> InlineBox {
    let mut out = InlineBox::default();
    let Some(style) = style else {
        return out;
    };
    let Ok(attr) = StyleAttribute::parse(style, ParserOptions::default()) else {
        return out;
    };
    for prop in attr
        .declarations
        .declarations
        .iter()
        .chain(attr.declarations.important_declarations.iter())
    {
        match prop {
            Property::Height(size) => {
                out.height = size_to_px(size);
            }
            Property::MarginBottom(value) => {
                out.margin_bottom = lpa_to_px(value);
            }
            Property::Margin(value) => {
                out.margin_bottom = lpa_to_px(&value.bottom);
            }
            Property::Display(Display::Keyword(DisplayKeyword::None)) => {
                out.hidden = true;
            }
            _ => {}
        }
    }
    out
}

fn size_to_px(size: &lightningcss::properties::size::Size) -> Option<f32> {
    match size {
        lightningcss::properties::size::Size::LengthPercentage(LengthPercentage::Dimension(
            length,
        )) => length.to_px(),
        _ => None,
    }
}

fn lpa_to_px(value: &LengthPercentageOrAuto) -> Option<f32> {
    match value {
        LengthPercentageOrAuto::LengthPercentage(LengthPercentage::Dimension(length)) => {
            length.to_px()
        }
        _ => None,
    }
}
