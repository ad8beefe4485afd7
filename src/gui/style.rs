use iced::{Background, Border, Color, Shadow, Theme};
use iced::widget::container::{StyleSheet, Appearance};

/// A disc filled with `fill`, with a ring of `border_width` pixels around it.
pub struct CircleStyleSheet {
    pub border_width: f32,
    pub radius: f32,
}

pub const CIRCLE_FILL: Color = Color::from_rgb(0.11, 0.45, 0.80);
pub const CIRCLE_RING: Color = Color::from_rgb(0.86, 0.88, 0.91);

impl StyleSheet for CircleStyleSheet {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> Appearance {
        Appearance {
            text_color: None,
            background: Some(Background::Color(CIRCLE_FILL)),
            border: Border {
                color: CIRCLE_RING,
                width: self.border_width,
                radius: self.radius.into(),
            },
            shadow: Shadow::default(),
        }
    }
}
