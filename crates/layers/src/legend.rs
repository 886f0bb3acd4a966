use foundation::Rgba;

use crate::html::escape_html;
use crate::symbology::SEVERITY_STOPS;

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgba,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Corner {
    TopLeft,
    TopRight,
    #[default]
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn css_edges(self) -> (&'static str, &'static str) {
        match self {
            Corner::TopLeft => ("top", "left"),
            Corner::TopRight => ("top", "right"),
            Corner::BottomLeft => ("bottom", "left"),
            Corner::BottomRight => ("bottom", "right"),
        }
    }
}

/// Fixed-position overlay keyed by its element id.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub element_id: String,
    pub title: String,
    pub entries: Vec<LegendEntry>,
    pub corner: Corner,
    pub offset_px: u32,
}

impl Legend {
    /// Severity buckets built from the color scale's own stops.
    pub fn severity() -> Self {
        Self {
            element_id: "legend".to_string(),
            title: "Pollution Level".to_string(),
            entries: SEVERITY_STOPS
                .iter()
                .map(|s| LegendEntry {
                    label: s.label.to_string(),
                    color: s.color,
                })
                .collect(),
            corner: Corner::default(),
            offset_px: 10,
        }
    }

    pub fn inner_html(&self) -> String {
        let mut out = format!("<div><strong>{}</strong></div>", escape_html(&self.title));
        for entry in &self.entries {
            out.push_str(&format!(
                "<div><span style=\"display:inline-block;width:12px;height:12px;\
                 margin-right:5px;border-radius:50%;background:{}\"></span> {}</div>",
                entry.color.to_hex(),
                escape_html(&entry.label)
            ));
        }
        out
    }

    /// Inline style of the container element.
    pub fn css_text(&self) -> String {
        let (vertical, horizontal) = self.corner.css_edges();
        format!(
            "position:absolute;{vertical}:{o}px;{horizontal}:{o}px;\
             background:rgba(255,255,255,0.9);padding:10px;border-radius:8px;\
             font-size:12px;box-shadow:0px 0px 10px rgba(0,0,0,0.1)",
            o = self.offset_px
        )
    }
}
