use egui::Color32;

pub(crate) fn with_alpha(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

fn blend(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |c1: u8, c2: u8| -> u8 { ((c1 as f32 * (1.0 - t)) + (c2 as f32 * t)).round() as u8 };
    Color32::from_rgb(lerp(a.r(), b.r()), lerp(a.g(), b.g()), lerp(a.b(), b.b()))
}

/// Parses `#RRGGBB` or `#RGB`.
pub(crate) fn parse_hex_color(value: &str) -> Option<Color32> {
    let hex = value.trim().strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        6 => Some(Color32::from_rgb(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Color32::from_rgb(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

#[derive(Clone, Copy)]
pub struct TimeGridPalette {
    pub background: Color32,
    pub today_background: Color32,
    pub hour_line: Color32,
    pub slot_line: Color32,
    pub header_text: Color32,
    pub label_text: Color32,
    pub appointment_text: Color32,
    pub muted_fill: Color32,
    pub muted_text: Color32,
    pub selection_fill: Color32,
    pub selection_stroke: Color32,
    pub conflict_stroke: Color32,
}

impl TimeGridPalette {
    pub fn from_visuals(visuals: &egui::Visuals) -> Self {
        let background = visuals.extreme_bg_color;
        let text = visuals.text_color();
        let accent = visuals.selection.bg_fill;

        Self {
            background,
            today_background: blend(background, accent, 0.08),
            hour_line: with_alpha(text, 70),
            slot_line: with_alpha(text, 25),
            header_text: text,
            label_text: with_alpha(text, 160),
            appointment_text: Color32::WHITE,
            muted_fill: with_alpha(visuals.weak_text_color(), 60),
            muted_text: visuals.weak_text_color(),
            selection_fill: with_alpha(accent, 90),
            selection_stroke: accent,
            conflict_stroke: Color32::from_rgb(220, 60, 60),
        }
    }

    /// Fill for an appointment box in a room of the given color.
    pub fn appointment_fill(&self, room_color: &str) -> Color32 {
        parse_hex_color(room_color).unwrap_or(self.selection_stroke)
    }
}
