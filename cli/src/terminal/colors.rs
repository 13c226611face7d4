use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 94, g: 200, b: 160 };
pub const ACCENT: Color = Color::TrueColor { r: 236, g: 190, b: 96 };
pub const SEPARATOR: Color = Color::TrueColor { r: 110, g: 110, b: 120 };
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 210, g: 210, b: 215 };

pub const HOST: Color = Color::TrueColor { r: 120, g: 170, b: 255 };
pub const DOMAIN: Color = Color::TrueColor { r: 200, g: 140, b: 255 };
pub const SUBDOMAIN: Color = Color::TrueColor { r: 94, g: 200, b: 160 };
pub const WEBPAGE: Color = Color::TrueColor { r: 160, g: 160, b: 170 };

pub const IN_SCOPE: Color = Color::Green;
pub const OUT_OF_SCOPE: Color = Color::Yellow;
